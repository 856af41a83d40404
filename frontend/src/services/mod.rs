//! Browser services.
//!
//! # Services
//!
//! - [`files`] - arena of browser `File` objects addressed by handle
//! - [`transport`] - multipart upload over `XMLHttpRequest` with progress
//! - [`page`] - page configuration, scrolling and DOM lookups

pub mod files;
pub mod page;
pub mod transport;

pub use files::*;
pub use page::*;
pub use transport::*;
