//! # Keeper - donor accession submissions
//!
//! Keeper receives materials donated to the university library's digital
//! collections: a donor's contact details plus any number of files, each
//! with a description.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Multipart  │────▶│   Staging   │────▶│ Validation  │────▶│   Storage   │
//! │  POST form  │     │ (incoming/) │     │ form + file │     │ (uploads/)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                                  { success, template, errorsForm, errorsFile }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keeper::{config::Settings, server::start_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = Settings::from_env().unwrap();
//!     start_server(settings).await.unwrap();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per concern
//! - [`config`] - Settings and accepted file types
//! - [`models`] - Accessions and files
//! - [`validation`] - Form rules and file type sniffing
//! - [`captcha`] - reCAPTCHA verification
//! - [`storage`] - On-disk accession storage
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod config;
pub mod models;

// Validation
pub mod validation;
pub mod captcha;

// Storage
pub mod storage;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CaptchaError,
    ConfigError,
    ServerError,
    StorageError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Accession,
    AccessionForm,
    AccessionStatus,
    Affiliation,
    StoredFile,
    UploadedFile,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    is_accepted_type,
    mime_matches,
    sniff_mime,
    validate_accession,
    validate_file,
    FieldErrors,
};

// =============================================================================
// Re-exports - Storage & API
// =============================================================================

pub use config::Settings;
pub use captcha::RecaptchaVerifier;
pub use storage::AccessionStore;
pub use api::types::{error_response, FileErrorRecord, SubmissionResponse};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
