//! Multipart upload over `XMLHttpRequest`.
//!
//! `fetch` has no upload progress, so the request is driven by hand. The
//! request reports back through the [`Dispatcher`]:
//!
//! | XHR event         | Upload event                         |
//! |-------------------|--------------------------------------|
//! | `upload.progress` | `UploadProgress(percent)`            |
//! | `load` (2xx)      | `ResponseReceived(result)`           |
//! | `load` (other)    | `TransferFailed("Server responded…")`|
//! | `error`/`abort`   | `TransferFailed(..)`                 |

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, FormData, ProgressEvent, XmlHttpRequest, XmlHttpRequestResponseType};

use crate::events::{Dispatcher, UploadEvent};
use crate::orchestrator::{Submission, Transport};
use crate::services::files::FileArena;
use crate::types::{AppError, AppResult, FormSubmissionResult};

/// Callbacks of the request in flight. Replaced by the next submission.
struct XhrHandlers {
    _progress: Closure<dyn FnMut(ProgressEvent)>,
    _load: Closure<dyn FnMut(Event)>,
    _error: Closure<dyn FnMut(Event)>,
}

pub struct XhrTransport {
    arena: FileArena,
    dispatcher: Dispatcher,
    in_flight: Option<(XmlHttpRequest, XhrHandlers)>,
}

impl XhrTransport {
    pub fn new(arena: FileArena, dispatcher: Dispatcher) -> Self {
        Self { arena, dispatcher, in_flight: None }
    }

    fn form_data(&self, submission: &Submission) -> AppResult<FormData> {
        let form = FormData::new()
            .map_err(|e| AppError::Upload(format!("Failed to create FormData: {:?}", e)))?;

        for (name, value) in &submission.fields {
            form.append_with_str(name, value)
                .map_err(|e| AppError::Upload(format!("Failed to append {}: {:?}", name, e)))?;
        }
        for (handle, description) in submission.files.iter().zip(&submission.descriptions) {
            let file = self
                .arena
                .file(*handle)
                .ok_or_else(|| AppError::Upload(format!("File {:?} is no longer available", handle)))?;
            form.append_with_blob_and_filename(submission.file_param, &file, &file.name())
                .map_err(|e| AppError::Upload(format!("Failed to append file: {:?}", e)))?;
            form.append_with_str(submission.description_param, description)
                .map_err(|e| AppError::Upload(format!("Failed to append description: {:?}", e)))?;
        }
        Ok(form)
    }
}

fn network_error(e: JsValue) -> AppError {
    let message = js_sys::Reflect::get(&e, &"message".into())
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", e));
    AppError::Network(message)
}

/// Turn a finished request into the event the state machine expects.
fn completion_event(xhr: &XmlHttpRequest) -> UploadEvent {
    let status = xhr.status().unwrap_or(0);
    if !(200..300).contains(&status) {
        return UploadEvent::TransferFailed(format!("Server responded with {}", status));
    }
    let body = match xhr.response() {
        Ok(body) if !body.is_null() && !body.is_undefined() => body,
        _ => return UploadEvent::TransferFailed("Server response was not JSON".to_string()),
    };
    match serde_wasm_bindgen::from_value::<FormSubmissionResult>(body) {
        Ok(result) => UploadEvent::ResponseReceived(result),
        Err(e) => UploadEvent::TransferFailed(format!("Invalid response from server: {}", e)),
    }
}

impl Transport for XhrTransport {
    fn submit(&mut self, submission: Submission) -> AppResult<()> {
        let form = self.form_data(&submission)?;

        let xhr = XmlHttpRequest::new().map_err(network_error)?;
        xhr.open_with_async("POST", &submission.url, true).map_err(network_error)?;
        xhr.set_request_header("Accept", "application/json").map_err(network_error)?;
        xhr.set_request_header("X-Requested-With", "XMLHttpRequest").map_err(network_error)?;
        xhr.set_response_type(XmlHttpRequestResponseType::Json);

        let dispatcher = self.dispatcher.clone();
        let progress = Closure::wrap(Box::new(move |event: ProgressEvent| {
            if event.length_computable() && event.total() > 0.0 {
                dispatcher.dispatch(UploadEvent::UploadProgress(100.0 * event.loaded() / event.total()));
            }
        }) as Box<dyn FnMut(ProgressEvent)>);
        xhr.upload()
            .map_err(network_error)?
            .set_onprogress(Some(progress.as_ref().unchecked_ref()));

        let dispatcher = self.dispatcher.clone();
        let request = xhr.clone();
        let load = Closure::wrap(Box::new(move |_: Event| {
            dispatcher.dispatch(completion_event(&request));
        }) as Box<dyn FnMut(Event)>);
        xhr.set_onload(Some(load.as_ref().unchecked_ref()));

        let dispatcher = self.dispatcher.clone();
        let error = Closure::wrap(Box::new(move |event: Event| {
            dispatcher.dispatch(UploadEvent::TransferFailed(format!("Upload {}", event.type_())));
        }) as Box<dyn FnMut(Event)>);
        xhr.set_onerror(Some(error.as_ref().unchecked_ref()));
        xhr.set_onabort(Some(error.as_ref().unchecked_ref()));

        xhr.send_with_opt_form_data(Some(&form)).map_err(network_error)?;

        self.in_flight = Some((
            xhr,
            XhrHandlers { _progress: progress, _load: load, _error: error },
        ));
        Ok(())
    }
}
