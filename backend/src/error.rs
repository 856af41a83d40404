//! Error types for the Keeper submission server.
//!
//! - [`ConfigError`] - bad environment or command-line settings
//! - [`StorageError`] - writing accessions and files to disk
//! - [`CaptchaError`] - talking to the reCAPTCHA verification service
//! - [`ServerError`] - top-level request handling
//!
//! Form and file validation failures are not errors: they travel back to
//! the browser inside the submission result.

use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

// =============================================================================
// Storage Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The uploaded file name has no usable component.
    #[error("Invalid file name: '{0}'")]
    InvalidFileName(String),

    #[error("Accession not found: {0}")]
    NotFound(String),
}

// =============================================================================
// Captcha Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum CaptchaError {
    /// No token was sent with the form.
    #[error("Verification token missing")]
    MissingToken,

    /// The verification service refused the token.
    #[error("Verification failed: {0:?}")]
    Rejected(Vec<String>),

    /// The verification service could not be reached.
    #[error("Verification request failed: {0}")]
    RequestFailed(String),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Whether the client is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServerError::BadRequest(_))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for captcha verification.
pub type CaptchaResult<T> = Result<T, CaptchaError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
