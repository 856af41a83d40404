//! Common types used across the upload form.
//!
//! # Categories
//!
//! - **Staging Types** - files added to the drop area
//! - **API Types** - the server's structured submission result
//! - **Alert Types** - rendered error banners
//! - **Error Types** - frontend error handling

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Staging Types
// =============================================================================

/// Opaque handle into the page-owned file arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileHandle(pub u32);

/// What the browser tells us about a file when it is added.
#[derive(Clone, Debug, PartialEq)]
pub struct FileInfo {
    pub handle: FileHandle,
    pub name: String,
    pub size: u64,
    pub mime: String,
}

/// Preview shown for a staged file.
#[derive(Clone, Debug, PartialEq)]
pub enum Preview {
    /// Image thumbnail generated from the file itself.
    Thumbnail,
    /// Icon id (rendered as `fa fa-{id} fa-5x`).
    Icon(String),
}

/// Why a file was refused when added.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
    TooSmall,
    TooLarge { max_mb: u64 },
    UnsupportedType,
    LimitReached,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::TooSmall => {
                write!(f, "The file's size is too small. It will not be uploaded.")
            }
            RejectReason::TooLarge { max_mb } => {
                write!(f, "File is too big. Max filesize: {}MB.", max_mb)
            }
            RejectReason::UnsupportedType => write!(f, "You can't upload files of this type."),
            RejectReason::LimitReached => write!(f, "You can not upload any more files."),
        }
    }
}

/// Lifecycle of a staged file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FileStatus {
    Queued,
    Uploading,
    Rejected(RejectReason),
    TransferFailed(String),
    ServerRejected(String),
    Submitted,
}

impl FileStatus {
    /// Whether the file goes out with the next submission.
    pub fn is_eligible(&self) -> bool {
        matches!(self, FileStatus::Queued | FileStatus::TransferFailed(_))
    }

    /// Message for the preview's error marker, if any.
    pub fn error_message(&self) -> Option<String> {
        match self {
            FileStatus::Rejected(reason) => Some(reason.to_string()),
            FileStatus::TransferFailed(msg) | FileStatus::ServerRejected(msg) => Some(msg.clone()),
            _ => None,
        }
    }
}

/// A file the user added but has not had confirmed by the server.
#[derive(Clone, Debug, PartialEq)]
pub struct StagedFile {
    pub handle: FileHandle,
    pub name: String,
    pub size: u64,
    pub mime: String,
    pub preview: Preview,
    pub status: FileStatus,
    pub description: String,
}

impl StagedFile {
    pub fn is_errored(&self) -> bool {
        self.status.error_message().is_some()
    }

    /// Human readable size, e.g. `1.5 MB`.
    pub fn display_size(&self) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let mut size = self.size as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} {}", self.size, UNITS[0])
        } else {
            format!("{:.1} {}", size, UNITS[unit])
        }
    }
}

// =============================================================================
// API Response Types
// =============================================================================

/// One message or a list of messages.
///
/// The server may send either `"Required"` or `["Required"]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageList {
    One(String),
    Many(Vec<String>),
}

impl fmt::Display for MessageList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageList::One(msg) => write!(f, "{}", msg),
            MessageList::Many(msgs) => write!(f, "{}", msgs.join(" ")),
        }
    }
}

/// Errors for one file, keyed by form field (normally `file`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileErrorRecord {
    pub file_name: String,
    #[serde(default)]
    pub error: BTreeMap<String, MessageList>,
}

impl FileErrorRecord {
    /// The `file` message, or every message joined when that key is absent.
    pub fn message(&self) -> String {
        if let Some(msg) = self.error.get("file") {
            return msg.to_string();
        }
        self.error
            .values()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Structured response from the submission endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmissionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors_form: BTreeMap<String, MessageList>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors_file: Vec<FileErrorRecord>,
}

/// A form-level error after normalisation.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// A file-level error after normalisation.
#[derive(Clone, Debug, PartialEq)]
pub struct FileError {
    pub file_name: String,
    pub message: String,
}

/// What a response means for the form.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmissionOutcome {
    Accepted { template: String },
    Rejected { form: Vec<FieldError>, files: Vec<FileError> },
}

impl FormSubmissionResult {
    pub fn success(template: impl Into<String>) -> Self {
        Self {
            success: true,
            template: Some(template.into()),
            ..Default::default()
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors_form.is_empty() || !self.errors_file.is_empty()
    }

    /// Interpret the result, tolerating responses that break the
    /// success/errors invariant.
    pub fn into_outcome(self) -> SubmissionOutcome {
        if self.success {
            if self.has_errors() {
                log::warn!(
                    "Successful submission carried errors: form={:?} files={:?}",
                    self.errors_form,
                    self.errors_file
                );
            }
            return SubmissionOutcome::Accepted {
                template: self.template.unwrap_or_default(),
            };
        }

        let form = self
            .errors_form
            .into_iter()
            .map(|(field, msg)| FieldError { field, message: msg.to_string() })
            .collect();
        let files = self
            .errors_file
            .iter()
            .map(|record| FileError {
                file_name: record.file_name.clone(),
                message: record.message(),
            })
            .collect();
        SubmissionOutcome::Rejected { form, files }
    }
}

// =============================================================================
// Alert Types
// =============================================================================

/// Where an alert came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    Field,
    File,
    General,
}

/// A dismissible error banner in the error region.
#[derive(Clone, Debug, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub text: String,
}

impl Alert {
    pub fn field(error: &FieldError) -> Self {
        Self {
            kind: AlertKind::Field,
            text: format!("Error in field {}: {}", error.field, error.message),
        }
    }

    pub fn file(error: &FileError) -> Self {
        Self {
            kind: AlertKind::File,
            text: format!("Error in file {}: {}", error.file_name, error.message),
        }
    }

    pub fn general(text: impl Into<String>) -> Self {
        Self { kind: AlertKind::General, text: text.into() }
    }
}

// =============================================================================
// Error Types
// =============================================================================

/// Frontend application errors.
#[derive(Clone, Debug, PartialEq)]
pub enum AppError {
    /// Building or sending the upload failed.
    Upload(String),
    /// Network/HTTP error.
    Network(String),
    /// Response could not be understood.
    Validation(String),
    /// Page configuration is unusable.
    Config(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Upload(msg) => write!(f, "Upload error: {}", msg),
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Result type alias for frontend operations.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_deserialization() {
        let value = json!({
            "success": false,
            "errorsForm": {"email": "Required", "first_name": ["This field is required."]},
            "errorsFile": [{"file_name": "a.pdf", "error": {"file": ["Corrupt"]}}]
        });
        let result: FormSubmissionResult = serde_json::from_value(value).unwrap();
        assert!(!result.success);
        assert_eq!(result.errors_form.len(), 2);
        assert_eq!(result.errors_file[0].message(), "Corrupt");
    }

    #[test]
    fn test_rejected_outcome_alert_text() {
        let value = json!({
            "success": false,
            "errorsForm": {"email": "Required"},
            "errorsFile": [{"file_name": "a.pdf", "error": {"file": "Corrupt"}}]
        });
        let result: FormSubmissionResult = serde_json::from_value(value).unwrap();
        match result.into_outcome() {
            SubmissionOutcome::Rejected { form, files } => {
                assert_eq!(Alert::field(&form[0]).text, "Error in field email: Required");
                assert_eq!(Alert::file(&files[0]).text, "Error in file a.pdf: Corrupt");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_success_without_template() {
        let result: FormSubmissionResult = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(
            result.into_outcome(),
            SubmissionOutcome::Accepted { template: String::new() }
        );
    }

    #[test]
    fn test_success_omits_empty_errors() {
        let value = serde_json::to_value(FormSubmissionResult::success("<p>Done</p>")).unwrap();
        assert_eq!(value, json!({"success": true, "template": "<p>Done</p>"}));
    }

    #[test]
    fn test_file_error_without_file_key() {
        let record = FileErrorRecord {
            file_name: "b.doc".into(),
            error: [("file_description".to_string(), MessageList::One("Too long".into()))]
                .into_iter()
                .collect(),
        };
        assert_eq!(record.message(), "Too long");
    }

    #[test]
    fn test_status_eligibility() {
        assert!(FileStatus::Queued.is_eligible());
        assert!(FileStatus::TransferFailed("timeout".into()).is_eligible());
        assert!(!FileStatus::Rejected(RejectReason::TooSmall).is_eligible());
        assert!(!FileStatus::ServerRejected("bad".into()).is_eligible());
        assert_eq!(
            FileStatus::Rejected(RejectReason::TooSmall).error_message().as_deref(),
            Some("The file's size is too small. It will not be uploaded.")
        );
    }
}
