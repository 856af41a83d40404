//! Page-level helpers: configuration, scrolling and DOM lookups.

use wasm_bindgen::JsCast;
use web_sys::{Element, File, FileList, HtmlTextAreaElement, ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition};

use crate::config::{UploadConfig, CONFIG_ELEMENT_ID};
use crate::validation::BOT_CHECK_FIELD;

/// Read the embedded configuration, or fall back to defaults.
pub fn load_config() -> UploadConfig {
    let Some(element) = gloo_utils::document().get_element_by_id(CONFIG_ELEMENT_ID) else {
        log::info!("No #{} element, using default upload configuration", CONFIG_ELEMENT_ID);
        return UploadConfig::default();
    };
    let json = element.text_content().unwrap_or_default();
    match UploadConfig::from_json(&json) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{} - using defaults", e);
            UploadConfig::default()
        }
    }
}

/// Smoothly bring the top of `element` into view.
pub fn scroll_into_view(element: &Element) {
    let options = ScrollIntoViewOptions::new();
    options.set_behavior(ScrollBehavior::Smooth);
    options.set_block(ScrollLogicalPosition::Start);
    element.scroll_into_view_with_scroll_into_view_options(&options);
}

/// Token written by the reCAPTCHA widget, if it has rendered.
pub fn bot_check_value() -> Option<String> {
    gloo_utils::document()
        .get_element_by_id(BOT_CHECK_FIELD)?
        .dyn_into::<HtmlTextAreaElement>()
        .ok()
        .map(|area| area.value())
}

pub fn files_from_list(list: &FileList) -> Vec<File> {
    (0..list.length()).filter_map(|i| list.get(i)).collect()
}
