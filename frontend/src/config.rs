//! Upload form configuration.
//!
//! Defaults live in the constants below. The page can override them by
//! embedding a JSON document in `<script id="keeper-config"
//! type="application/json">`; see [`UploadConfig::from_json`].
//!
//! The configuration is built once at start-up and handed by reference to
//! the components that need it.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{AppError, AppResult};

/// Submission endpoint used when the page does not provide one.
pub const DEFAULT_SUBMIT_URL: &str = "/submit/";

/// Files smaller than this are rejected when added (bytes).
pub const MIN_FILE_SIZE: u64 = 1024;

/// Maximum number of files per submission.
///
/// Also the number of simultaneous transfers, so every file of a
/// submission travels in the same request.
pub const MAX_FILES: usize = 100;

/// Maximum size of a single file (MB).
pub const MAX_FILESIZE_MB: u64 = 4000;

/// Width of generated image thumbnails (px).
pub const THUMBNAIL_WIDTH: u32 = 200;

/// Multipart field name of the repeated file part.
pub const FILE_PARAM_NAME: &str = "file-file";

/// Multipart field name of the per-file description.
pub const FILE_DESCRIPTION_PARAM: &str = "file-file_description";

/// Icon shown when a MIME type matches nothing in the icon map.
pub const FALLBACK_ICON: &str = "file-o";

/// Element id of the embedded configuration document.
pub const CONFIG_ELEMENT_ID: &str = "keeper-config";

/// Accepted MIME patterns and the icon shown for non-image previews.
pub fn default_accepted_file_types() -> BTreeMap<String, String> {
    [
        ("image/*", "file-image"),
        ("video/*", "file-video"),
        ("audio/*", "file-audio"),
        ("application/msword", "file-word"),
        ("application/pdf", "file-pdf"),
        ("text/plain", "file-lines"),
        ("text/html", "file-code"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Mapping from MIME pattern (`type/sub` or `type/*`) to icon id.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct IconMap(BTreeMap<String, String>);

impl IconMap {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self(entries)
    }

    /// Icon for a MIME type: exact match, then `major/*`, then the fallback.
    pub fn icon_for(&self, mime: &str) -> &str {
        if let Some(icon) = self.0.get(mime) {
            return icon;
        }
        let major = mime.split('/').next().unwrap_or_default();
        self.0
            .get(&format!("{}/*", major))
            .map(String::as_str)
            .unwrap_or(FALLBACK_ICON)
    }

    /// The accepted patterns joined the way a file input `accept` wants them.
    pub fn accept_string(&self) -> String {
        self.0.keys().cloned().collect::<Vec<_>>().join(",")
    }
}

/// Parsed accept list: MIME patterns and `.ext` suffixes.
///
/// An empty list accepts every file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AcceptList {
    tokens: Vec<String>,
}

impl AcceptList {
    pub fn parse(raw: &str) -> Self {
        let tokens = raw
            .split(',')
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn as_attribute(&self) -> String {
        self.tokens.join(",")
    }

    pub fn matches(&self, file_name: &str, mime: &str) -> bool {
        if self.tokens.is_empty() {
            return true;
        }
        let name = file_name.to_ascii_lowercase();
        let mime = mime.to_ascii_lowercase();
        let base = mime.split('/').next().unwrap_or_default();

        self.tokens.iter().any(|token| {
            if token.starts_with('.') {
                name.ends_with(token.as_str())
            } else if let Some(major) = token.strip_suffix("/*") {
                base == major
            } else {
                *token == mime
            }
        })
    }
}

/// Shape of the embedded page configuration. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PageConfig {
    accepted_file_types: Option<BTreeMap<String, String>>,
    accepted_files: Option<String>,
    submit_url: Option<String>,
    max_files: Option<usize>,
    max_filesize_mb: Option<u64>,
    recaptcha_site_key: Option<String>,
}

/// Configuration shared by the staging widget, validator and transport.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadConfig {
    pub icons: IconMap,
    pub accept: AcceptList,
    pub submit_url: String,
    pub min_file_size: u64,
    pub max_files: usize,
    pub max_filesize_mb: u64,
    pub thumbnail_width: u32,
    pub recaptcha_site_key: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        let icons = IconMap::new(default_accepted_file_types());
        let accept = AcceptList::parse(&icons.accept_string());
        Self {
            icons,
            accept,
            submit_url: DEFAULT_SUBMIT_URL.to_string(),
            min_file_size: MIN_FILE_SIZE,
            max_files: MAX_FILES,
            max_filesize_mb: MAX_FILESIZE_MB,
            thumbnail_width: THUMBNAIL_WIDTH,
            recaptcha_site_key: None,
        }
    }
}

impl UploadConfig {
    /// Build from the embedded JSON document, falling back to defaults
    /// for every missing key.
    pub fn from_json(json: &str) -> AppResult<Self> {
        let page: PageConfig = serde_json::from_str(json)
            .map_err(|e| AppError::Config(format!("invalid page configuration: {}", e)))?;

        let mut config = Self::default();
        if let Some(types) = page.accepted_file_types {
            config.icons = IconMap::new(types);
            config.accept = AcceptList::parse(&config.icons.accept_string());
        }
        if let Some(accepted) = page.accepted_files {
            config.accept = AcceptList::parse(&accepted);
        }
        if let Some(url) = page.submit_url.filter(|u| !u.is_empty()) {
            config.submit_url = url;
        }
        if let Some(max_files) = page.max_files {
            if max_files == 0 {
                return Err(AppError::Config("maxFiles must be at least 1".to_string()));
            }
            config.max_files = max_files;
        }
        if let Some(mb) = page.max_filesize_mb {
            config.max_filesize_mb = mb;
        }
        config.recaptcha_site_key = page.recaptcha_site_key.filter(|k| !k.is_empty());

        Ok(config)
    }

    /// Simultaneous transfers allowed; equal to the per-submission limit.
    pub fn parallel_uploads(&self) -> usize {
        self.max_files
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_filesize_mb.saturating_mul(1024 * 1024)
    }

    pub fn requires_bot_check(&self) -> bool {
        self.recaptcha_site_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_lookup_order() {
        let icons = IconMap::new(default_accepted_file_types());
        assert_eq!(icons.icon_for("application/pdf"), "file-pdf");
        assert_eq!(icons.icon_for("video/mp4"), "file-video");
        assert_eq!(icons.icon_for("application/zip"), "file-o");
    }

    #[test]
    fn test_exact_match_beats_wildcard() {
        let mut map = BTreeMap::new();
        map.insert("text/*".to_string(), "file-text".to_string());
        map.insert("text/html".to_string(), "file-code".to_string());
        let icons = IconMap::new(map);
        assert_eq!(icons.icon_for("text/html"), "file-code");
        assert_eq!(icons.icon_for("text/csv"), "file-text");
    }

    #[test]
    fn test_accept_list() {
        let accept = AcceptList::parse("image/*, .PDF ,text/plain");
        assert!(accept.matches("scan.png", "image/png"));
        assert!(accept.matches("report.pdf", ""));
        assert!(accept.matches("notes.txt", "text/plain"));
        assert!(!accept.matches("notes.html", "text/html"));
        assert!(AcceptList::parse("").matches("anything.bin", "application/octet-stream"));
    }

    #[test]
    fn test_from_json_overrides() {
        let json = r#"{
            "acceptedFileTypes": {"application/pdf": "file-pdf"},
            "submitUrl": "/keeper/submit/",
            "maxFiles": 5,
            "recaptchaSiteKey": "site-key"
        }"#;
        let config = UploadConfig::from_json(json).unwrap();
        assert_eq!(config.submit_url, "/keeper/submit/");
        assert_eq!(config.parallel_uploads(), 5);
        assert!(config.accept.matches("a.pdf", "application/pdf"));
        assert!(!config.accept.matches("a.png", "image/png"));
        assert!(config.requires_bot_check());
        assert_eq!(config.min_file_size, MIN_FILE_SIZE);
    }

    #[test]
    fn test_from_json_rejects_zero_files() {
        assert!(UploadConfig::from_json(r#"{"maxFiles": 0}"#).is_err());
        assert!(UploadConfig::from_json("not json").is_err());
    }
}
