//! UI Components for the Keeper upload page.
//!
//! # Layout Components
//! - [`Hero`] - Page title and instructions
//! - [`Footer`] - Page footer
//!
//! # Feature Components
//! - [`UploadForm`] - Accession form with drag & drop file staging
//! - [`AccessionFields`] - Donor contact fields with validation feedback
//! - [`BotCheck`] - reCAPTCHA slot and its "required" notice
//! - [`FilePreviews`] - Staged files with thumbnails, errors and descriptions
//! - [`TotalProgress`] - Aggregate upload progress bar
//! - [`AlertList`] - Dismissible server error banners

mod alerts;
mod fields;
mod footer;
mod hero;
mod previews;
mod progress;
mod upload_form;

pub use alerts::*;
pub use fields::*;
pub use footer::*;
pub use hero::*;
pub use previews::*;
pub use progress::*;
pub use upload_form::*;
