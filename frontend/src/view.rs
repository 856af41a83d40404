//! Reactive page state and the [`FormView`] implementation over it.
//!
//! [`FormSignals`] is created once when the form mounts. Components read
//! the signals; the orchestrator writes them through [`PageView`].

use std::collections::BTreeMap;

use leptos::*;

use crate::orchestrator::{FormView, Region};
use crate::progress::ProgressReporter;
use crate::services::{scroll_into_view, FileArena};
use crate::types::{Alert, StagedFile};
use crate::validation::{FeedbackUpdate, FieldFeedback, FieldId, ValidationFieldState, ValidationObserver};

#[derive(Clone, Copy)]
pub struct FormSignals {
    pub files: RwSignal<Vec<StagedFile>>,
    pub controls_enabled: RwSignal<bool>,
    pub fields_enabled: RwSignal<bool>,
    pub progress: RwSignal<ProgressReporter>,
    pub alerts: RwSignal<Vec<Alert>>,
    pub success_html: RwSignal<Option<String>>,
    pub drag_hover: RwSignal<bool>,
    pub feedback: RwSignal<BTreeMap<FieldId, FieldFeedback>>,
    pub bot_check_required: RwSignal<bool>,
    pub form_container: NodeRef<html::Div>,
    pub error_container: NodeRef<html::Div>,
}

impl FormSignals {
    pub fn new() -> Self {
        Self {
            files: create_rw_signal(Vec::new()),
            controls_enabled: create_rw_signal(false),
            fields_enabled: create_rw_signal(true),
            progress: create_rw_signal(ProgressReporter::new()),
            alerts: create_rw_signal(Vec::new()),
            success_html: create_rw_signal(None),
            drag_hover: create_rw_signal(false),
            feedback: create_rw_signal(BTreeMap::new()),
            bot_check_required: create_rw_signal(false),
            form_container: create_node_ref::<html::Div>(),
            error_container: create_node_ref::<html::Div>(),
        }
    }

    pub fn apply(&self, update: FeedbackUpdate) {
        match update {
            FeedbackUpdate::Field { field, feedback } => {
                self.feedback.update(|map| {
                    map.insert(field, feedback);
                });
            }
            FeedbackUpdate::BotCheckBanner { visible } => self.bot_check_required.set(visible),
        }
    }

    /// Feedback of one field, tracked reactively.
    pub fn feedback_for(&self, field: &FieldId) -> FieldFeedback {
        self.feedback.with(|map| map.get(field).cloned().unwrap_or_default())
    }
}

impl Default for FormSignals {
    fn default() -> Self {
        Self::new()
    }
}

/// The orchestrator's handle on the page.
pub struct PageView {
    signals: FormSignals,
    arena: FileArena,
}

impl PageView {
    pub fn new(signals: FormSignals, arena: FileArena) -> Self {
        Self { signals, arena }
    }
}

impl ValidationObserver for PageView {
    fn on_field_error(&mut self, field: &FieldId, state: &ValidationFieldState) {
        self.signals.apply(FeedbackUpdate::error(field, state));
    }

    fn on_field_success(&mut self, field: &FieldId) {
        self.signals.apply(FeedbackUpdate::success(field));
    }
}

impl FormView for PageView {
    fn render_files(&mut self, files: &[StagedFile]) {
        let handles: Vec<_> = files.iter().map(|f| f.handle).collect();
        self.arena.retain(&handles);
        self.signals.files.set(files.to_vec());
    }

    fn set_controls_enabled(&mut self, enabled: bool) {
        self.signals.controls_enabled.set(enabled);
    }

    fn set_fields_enabled(&mut self, enabled: bool) {
        self.signals.fields_enabled.set(enabled);
    }

    fn render_progress(&mut self, progress: &ProgressReporter) {
        self.signals.progress.set(progress.clone());
    }

    fn set_alerts(&mut self, alerts: Vec<Alert>) {
        self.signals.alerts.set(alerts);
    }

    fn replace_form(&mut self, html: &str) {
        self.signals.success_html.set(Some(html.to_string()));
    }

    fn scroll_to(&mut self, region: Region) {
        let target = match region {
            Region::FormContainer => self.signals.form_container.get_untracked(),
            Region::ErrorContainer => self.signals.error_container.get_untracked(),
        };
        match target {
            Some(element) => scroll_into_view(&element),
            None => log::warn!("Scroll target {:?} is not mounted", region),
        }
    }

    fn set_drag_hover(&mut self, hover: bool) {
        self.signals.drag_hover.set(hover);
    }
}
