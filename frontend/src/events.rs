//! Upload form events and the single dispatcher that delivers them.
//!
//! Every user action and every transport notification becomes an
//! [`UploadEvent`]. The [`Dispatcher`] hands events to one handler (the
//! form orchestrator). An event raised while the handler is running is
//! queued and delivered after the current one finishes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::types::{FileHandle, FileInfo, FormSubmissionResult};
use crate::validation::FormValues;

#[derive(Clone, Debug, PartialEq)]
pub enum UploadEvent {
    /// A file was dropped or picked.
    FileAdded(FileInfo),
    /// The remove button of one preview was pressed.
    FileRemoved(FileHandle),
    /// The description text area of one preview changed.
    DescriptionEdited { handle: FileHandle, text: String },
    RemoveAllClicked,
    /// The staging widget lost all its files by other means.
    Reset,
    /// Submit pressed; carries the field values at that moment.
    SubmitClicked(FormValues),
    /// A field changed; re-validated once validation is armed.
    FieldEdited { field: String, values: FormValues },
    DragHover(bool),
    /// Aggregate upload progress, 0-100.
    UploadProgress(f64),
    /// The request never produced a structured result.
    TransferFailed(String),
    ResponseReceived(FormSubmissionResult),
}

impl UploadEvent {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            UploadEvent::FileAdded(_) => "file-added",
            UploadEvent::FileRemoved(_) => "file-removed",
            UploadEvent::DescriptionEdited { .. } => "description-edited",
            UploadEvent::RemoveAllClicked => "remove-all",
            UploadEvent::Reset => "reset",
            UploadEvent::SubmitClicked(_) => "submit",
            UploadEvent::FieldEdited { .. } => "field-edited",
            UploadEvent::DragHover(_) => "drag-hover",
            UploadEvent::UploadProgress(_) => "upload-progress",
            UploadEvent::TransferFailed(_) => "transfer-failed",
            UploadEvent::ResponseReceived(_) => "response",
        }
    }
}

type Handler = Box<dyn FnMut(UploadEvent)>;

#[derive(Default)]
struct DispatcherInner {
    handler: RefCell<Option<Handler>>,
    pending: RefCell<VecDeque<UploadEvent>>,
}

/// Cheaply clonable entry point for events.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Rc<DispatcherInner>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the handler. Events dispatched before this are delivered now.
    pub fn bind(&self, handler: impl FnMut(UploadEvent) + 'static) {
        *self.inner.handler.borrow_mut() = Some(Box::new(handler));
        self.drain();
    }

    pub fn dispatch(&self, event: UploadEvent) {
        self.inner.pending.borrow_mut().push_back(event);
        self.drain();
    }

    fn drain(&self) {
        // Already draining further up the stack: the outer loop picks it up.
        let Ok(mut guard) = self.inner.handler.try_borrow_mut() else {
            return;
        };
        let Some(handler) = guard.as_mut() else {
            return;
        };
        loop {
            let next = self.inner.pending.borrow_mut().pop_front();
            match next {
                Some(event) => handler(event),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_before_bind_are_delivered() {
        let dispatcher = Dispatcher::new();
        dispatcher.dispatch(UploadEvent::Reset);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        dispatcher.bind(move |ev| sink.borrow_mut().push(ev.name()));
        dispatcher.dispatch(UploadEvent::RemoveAllClicked);

        assert_eq!(*seen.borrow(), vec!["reset", "remove-all"]);
    }

    #[test]
    fn test_nested_dispatch_runs_after_current_event() {
        let dispatcher = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        let inner = dispatcher.clone();
        dispatcher.bind(move |ev| {
            sink.borrow_mut().push(format!("start {}", ev.name()));
            if ev == UploadEvent::RemoveAllClicked {
                inner.dispatch(UploadEvent::Reset);
            }
            sink.borrow_mut().push(format!("end {}", ev.name()));
        });
        dispatcher.dispatch(UploadEvent::RemoveAllClicked);

        assert_eq!(
            *seen.borrow(),
            vec!["start remove-all", "end remove-all", "start reset", "end reset"]
        );
    }
}
