//! Keeper - Frontend Rust/Leptos Application
//!
//! A WebAssembly upload form through which donors submit files and
//! contact details to the university library's digital collections.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        App                                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Hero (title, instructions)                                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  UploadForm                                                  │
//! │  ├── AlertList (server errors)                              │
//! │  ├── AccessionFields + BotCheck                             │
//! │  ├── FilePreviews (staged files)                            │
//! │  └── TotalProgress                                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Footer                                                      │
//! └─────────────────────────────────────────────────────────────┘
//!
//!   DOM events ──▶ Dispatcher ──▶ FormOrchestrator ──▶ PageView (signals)
//!                      ▲                 │
//!                      └── XhrTransport ◀┘
//! ```
//!
//! # Modules
//!
//! - [`config`] - Page configuration and accepted file types
//! - [`types`] - Staged files, server results, alerts and errors
//! - [`validation`] - Accession field rules
//! - [`staging`] - Files added to the drop area
//! - [`progress`] - Aggregate transfer progress
//! - [`events`] - Upload events and the dispatcher
//! - [`orchestrator`] - Form state machine
//! - [`view`] - Reactive page state
//! - [`components`] - UI components
//! - [`services`] - Browser services (files, transport, page)

use std::rc::Rc;

use leptos::*;
use leptos_meta::*;
use leptos_router::*;
use wasm_bindgen::prelude::*;

// =============================================================================
// Module declarations
// =============================================================================

pub mod config;
pub mod types;
pub mod validation;
pub mod staging;
pub mod progress;
pub mod events;
pub mod orchestrator;
pub mod view;
pub mod components;
pub mod services;

// =============================================================================
// Re-exports
// =============================================================================

// Configuration
pub use config::*;

// Types
pub use types::{
    // Staging
    FileHandle, FileInfo, FileStatus, Preview, RejectReason, StagedFile,
    // API
    FileErrorRecord, FormSubmissionResult, MessageList, SubmissionOutcome,
    // Alerts
    Alert, AlertKind,
    // Errors
    AppError, AppResult,
};

// State machine
pub use events::{Dispatcher, UploadEvent};
pub use orchestrator::{FormOrchestrator, FormState, FormView, Region, Submission, Transport};
pub use progress::ProgressReporter;
pub use staging::{StagingArea, StagingState};
pub use validation::{FieldId, FieldSpec, FormValues, ValidationFieldState, ValidationObserver, Validator};

// Components
pub use components::*;

// Services
pub use services::*;

// =============================================================================
// Application Entry Point
// =============================================================================

/// WASM entry point - called automatically by trunk.
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    _ = console_log::init_with_level(log::Level::Debug);

    log::info!("Keeper - starting upload form");

    mount_to_body(|| view! { <App/> });
}

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    view! {
        <Title text="Keeper | Submit Materials"/>
        <Router>
            <main>
                <Routes>
                    <Route path="/" view=MainContent/>
                </Routes>
            </main>
        </Router>
    }
}

#[component]
fn MainContent() -> impl IntoView {
    let config = Rc::new(load_config());
    log::debug!(
        "Upload config: {} files max, {} MB each, submit to {}",
        config.max_files,
        config.max_filesize_mb,
        config.submit_url
    );

    view! {
        <div class="container">
            <Hero/>
            <UploadForm config=config/>
        </div>

        <Footer/>
    }
}
