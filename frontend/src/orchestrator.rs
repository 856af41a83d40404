//! Upload form state machine.
//!
//! ```text
//!            file added                 submit + validation ok
//!   Idle ───────────────▶ Staged ─────────────────────────────▶ Submitting
//!    ▲                    │  ▲                                    │    │
//!    └── remove all/reset ┘  └──── Failed ◀── success = false ────┘    │
//!                                  (or transfer failure)               │
//!                                          Succeeded ◀── success = true┘
//! ```
//!
//! The orchestrator owns the staging list, the progress reporter and the
//! validator. It talks to the page only through [`FormView`] and to the
//! network only through [`Transport`], so the whole flow runs without a
//! browser.

use std::rc::Rc;

use crate::config::{UploadConfig, FILE_DESCRIPTION_PARAM, FILE_PARAM_NAME};
use crate::events::UploadEvent;
use crate::progress::ProgressReporter;
use crate::staging::StagingArea;
use crate::types::{
    Alert, AppResult, FileHandle, FileInfo, FormSubmissionResult, StagedFile, SubmissionOutcome,
};
use crate::validation::{FormValues, ValidationObserver, Validator};

/// Shown when submit finds nothing that can be uploaded.
pub const NO_ELIGIBLE_FILES: &str = "Add at least one file that can be uploaded.";

/// Shown when the server refuses without saying why.
pub const UNSPECIFIED_REJECTION: &str = "The submission was not accepted. Please try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Staged,
    Submitting,
    Succeeded,
    Failed,
}

/// Scroll targets on the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    FormContainer,
    ErrorContainer,
}

/// One multipart request.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub url: String,
    pub file_param: &'static str,
    pub description_param: &'static str,
    /// Form fields in name order.
    pub fields: Vec<(String, String)>,
    /// Files in staging order.
    pub files: Vec<FileHandle>,
    /// Index-aligned with `files`.
    pub descriptions: Vec<String>,
}

/// Sends a submission. Progress, completion and failure come back later
/// as [`UploadEvent`]s.
pub trait Transport {
    fn submit(&mut self, submission: Submission) -> AppResult<()>;
}

/// Everything the orchestrator changes on the page.
pub trait FormView: ValidationObserver {
    fn render_files(&mut self, files: &[StagedFile]);
    /// Submit and remove-all buttons.
    fn set_controls_enabled(&mut self, enabled: bool);
    /// Fieldsets, descriptions, per-file remove buttons and the drop area.
    fn set_fields_enabled(&mut self, enabled: bool);
    fn render_progress(&mut self, progress: &ProgressReporter);
    /// Replace every alert in the error region.
    fn set_alerts(&mut self, alerts: Vec<Alert>);
    /// Swap the form for server-rendered HTML.
    fn replace_form(&mut self, html: &str);
    fn scroll_to(&mut self, region: Region);
    fn set_drag_hover(&mut self, hover: bool);
}

pub struct FormOrchestrator<V: FormView, T: Transport> {
    config: Rc<UploadConfig>,
    state: FormState,
    staging: StagingArea,
    progress: ProgressReporter,
    validator: Validator,
    view: V,
    transport: T,
}

impl<V: FormView, T: Transport> FormOrchestrator<V, T> {
    pub fn new(config: Rc<UploadConfig>, validator: Validator, view: V, transport: T) -> Self {
        Self {
            config,
            state: FormState::Idle,
            staging: StagingArea::new(),
            progress: ProgressReporter::new(),
            validator,
            view,
            transport,
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn dispatch(&mut self, event: UploadEvent) {
        let name = event.name();
        let accepted = match event {
            UploadEvent::FileAdded(info) => self.on_file_added(info),
            UploadEvent::FileRemoved(handle) => self.on_file_removed(handle),
            UploadEvent::DescriptionEdited { handle, text } => self.on_description(handle, text),
            UploadEvent::RemoveAllClicked => self.on_remove_all(),
            UploadEvent::Reset => self.on_reset(),
            UploadEvent::SubmitClicked(values) => self.on_submit(values),
            UploadEvent::FieldEdited { field, values } => self.on_field_edited(&field, &values),
            UploadEvent::DragHover(hover) => self.on_drag_hover(hover),
            UploadEvent::UploadProgress(percent) => self.on_progress(percent),
            UploadEvent::TransferFailed(message) => self.on_transfer_failed(&message),
            UploadEvent::ResponseReceived(result) => self.on_response(result),
        };
        if !accepted {
            log::debug!("Ignored {} event in state {:?}", name, self.state);
        }
    }

    fn transition(&mut self, to: FormState) {
        if self.state != to {
            log::debug!("Upload form: {:?} -> {:?}", self.state, to);
            self.state = to;
        }
    }

    fn is_editable(&self) -> bool {
        matches!(self.state, FormState::Idle | FormState::Staged)
    }

    fn on_file_added(&mut self, info: FileInfo) -> bool {
        if !self.is_editable() {
            return false;
        }
        self.staging.add(&self.config, info);
        self.view.render_files(self.staging.files());
        self.view.set_controls_enabled(true);
        self.transition(FormState::Staged);
        true
    }

    fn on_file_removed(&mut self, handle: FileHandle) -> bool {
        if !self.is_editable() || self.staging.remove(handle).is_none() {
            return false;
        }
        if self.staging.is_empty() {
            self.reset();
        } else {
            self.view.render_files(self.staging.files());
        }
        true
    }

    fn on_description(&mut self, handle: FileHandle, text: String) -> bool {
        self.is_editable() && self.staging.set_description(handle, text)
    }

    fn on_remove_all(&mut self) -> bool {
        if !self.is_editable() {
            return false;
        }
        self.reset();
        self.view.scroll_to(Region::FormContainer);
        true
    }

    fn on_reset(&mut self) -> bool {
        if !self.is_editable() {
            return false;
        }
        self.reset();
        true
    }

    /// Empty list, disabled controls, hidden progress.
    fn reset(&mut self) {
        self.staging.clear();
        self.progress.hide();
        self.view.render_files(self.staging.files());
        self.view.set_controls_enabled(false);
        self.view.render_progress(&self.progress);
        self.transition(FormState::Idle);
    }

    fn on_submit(&mut self, values: FormValues) -> bool {
        if self.state != FormState::Staged {
            return false;
        }
        if !self.validator.validate_all(&values, &mut self.view) {
            log::info!("Submission blocked by field validation");
            return true;
        }

        let (files, descriptions): (Vec<_>, Vec<_>) = self
            .staging
            .eligible(self.config.parallel_uploads())
            .into_iter()
            .map(|f| (f.handle, f.description.clone()))
            .unzip();
        if files.is_empty() {
            self.view.set_alerts(vec![Alert::general(NO_ELIGIBLE_FILES)]);
            self.view.scroll_to(Region::ErrorContainer);
            return true;
        }

        let submission = Submission {
            url: self.config.submit_url.clone(),
            file_param: FILE_PARAM_NAME,
            description_param: FILE_DESCRIPTION_PARAM,
            fields: values.into_iter().collect(),
            files,
            descriptions,
        };

        self.staging.mark_uploading(&submission.files);
        self.view.set_alerts(Vec::new());
        self.view.set_fields_enabled(false);
        self.view.set_controls_enabled(false);
        self.view.render_files(self.staging.files());
        self.progress.show();
        self.progress.update(0.0);
        self.view.render_progress(&self.progress);
        self.view.scroll_to(Region::FormContainer);
        self.transition(FormState::Submitting);

        log::info!("Submitting {} file(s) to {}", submission.files.len(), submission.url);
        if let Err(e) = self.transport.submit(submission) {
            self.on_transfer_failed(&e.to_string());
        }
        true
    }

    fn on_field_edited(&mut self, field: &str, values: &FormValues) -> bool {
        if !self.is_editable() {
            return false;
        }
        self.validator.validate_field(field, values, &mut self.view);
        true
    }

    fn on_drag_hover(&mut self, hover: bool) -> bool {
        let hover = hover && self.is_editable();
        self.view.set_drag_hover(hover);
        true
    }

    fn on_progress(&mut self, percent: f64) -> bool {
        if self.state != FormState::Submitting {
            return false;
        }
        self.progress.update(percent);
        self.view.render_progress(&self.progress);
        true
    }

    fn on_transfer_failed(&mut self, message: &str) -> bool {
        if self.state != FormState::Submitting {
            return false;
        }
        log::error!("Upload failed: {}", message);
        self.staging.mark_transfer_failed(message);
        self.transition(FormState::Failed);
        self.recover();
        true
    }

    fn on_response(&mut self, result: FormSubmissionResult) -> bool {
        if self.state != FormState::Submitting {
            return false;
        }
        match result.into_outcome() {
            SubmissionOutcome::Accepted { template } => {
                log::info!("Submission accepted");
                self.staging.mark_submitted();
                self.progress.hide();
                self.view.render_progress(&self.progress);
                self.view.replace_form(&template);
                self.view.scroll_to(Region::FormContainer);
                self.transition(FormState::Succeeded);
            }
            SubmissionOutcome::Rejected { form, files } => {
                log::warn!("Form errors: {:?}", form);
                log::warn!("File errors: {:?}", files);

                let mut alerts: Vec<Alert> = form.iter().map(Alert::field).collect();
                alerts.extend(files.iter().map(Alert::file));
                if alerts.is_empty() {
                    alerts.push(Alert::general(UNSPECIFIED_REJECTION));
                }

                let named: Vec<(String, String)> = files
                    .into_iter()
                    .map(|e| (e.file_name, e.message))
                    .collect();
                self.staging.settle_server_errors(&named);
                self.view.set_alerts(alerts);
                self.transition(FormState::Failed);
                self.recover();
                self.view.scroll_to(Region::ErrorContainer);
            }
        }
        true
    }

    /// Back from `Failed`: hide progress, re-enable the form.
    fn recover(&mut self) {
        self.progress.hide();
        self.view.render_progress(&self.progress);
        self.view.render_files(self.staging.files());
        self.view.set_fields_enabled(true);
        self.view.set_controls_enabled(!self.staging.is_empty());
        if self.staging.is_empty() {
            self.transition(FormState::Idle);
        } else {
            self.transition(FormState::Staged);
        }
    }
}
