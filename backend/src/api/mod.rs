//! HTTP API module.
//!
//! This module provides the HTTP server, the wire types shared with the
//! browser form and the server's console logging.

pub mod server;
pub mod types;
pub mod logs;

pub use server::{process_submission, router, start_server, AppState, SubmissionParts};
pub use types::*;
pub use logs::*;
