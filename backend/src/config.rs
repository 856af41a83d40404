//! Server settings and the accepted file type table.
//!
//! Settings come from the environment (a `.env` file is loaded first by
//! the CLI) and can be overridden by command-line flags.

use std::env;
use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};

/// Port used when `KEEPER_PORT` is not set.
pub const DEFAULT_PORT: u16 = 3000;

/// Root of accession storage when `KEEPER_UPLOAD_DIR` is not set.
pub const DEFAULT_UPLOAD_DIR: &str = "media";

/// Built frontend assets when `KEEPER_STATIC_DIR` is not set.
pub const DEFAULT_STATIC_DIR: &str = "frontend/dist";

/// Largest accepted file: 4 GB.
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// MIME pattern to icon id. Patterns may end in `/*`.
pub const ACCEPTED_FILE_TYPES: &[(&str, &str)] = &[
    ("image/*", "file-image"),
    ("video/*", "file-video"),
    ("audio/*", "file-audio"),
    ("application/msword", "file-word"),
    ("application/pdf", "file-pdf"),
    ("text/plain", "file-lines"),
    ("text/html", "file-code"),
];

/// Icon for files whose type has no entry.
pub const FALLBACK_ICON: &str = "file-o";

/// Icon for a content type: exact entry, then `major/*`, then the fallback.
pub fn icon_for(content_type: &str) -> &'static str {
    if let Some((_, icon)) = ACCEPTED_FILE_TYPES.iter().find(|(p, _)| *p == content_type) {
        return icon;
    }
    let major = content_type.split('/').next().unwrap_or_default();
    let wildcard = format!("{}/*", major);
    ACCEPTED_FILE_TYPES
        .iter()
        .find(|(p, _)| *p == wildcard)
        .map(|(_, icon)| *icon)
        .unwrap_or(FALLBACK_ICON)
}

/// Runtime settings of the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    /// Per-file size limit in bytes.
    pub max_upload_size: u64,
    pub recaptcha_secret: Option<String>,
    /// Skips bot verification.
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            recaptcha_secret: None,
            debug: false,
        }
    }
}

impl Settings {
    /// Read `KEEPER_*` variables from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup, defaulting missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut settings = Self::default();

        if let Some(port) = lookup("KEEPER_PORT") {
            settings.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key: "KEEPER_PORT", value: port })?;
        }
        if let Some(dir) = lookup("KEEPER_UPLOAD_DIR").filter(|d| !d.is_empty()) {
            settings.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("KEEPER_STATIC_DIR").filter(|d| !d.is_empty()) {
            settings.static_dir = PathBuf::from(dir);
        }
        if let Some(size) = lookup("KEEPER_MAX_UPLOAD_SIZE") {
            settings.max_upload_size = size.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "KEEPER_MAX_UPLOAD_SIZE",
                value: size,
            })?;
        }
        settings.recaptcha_secret = lookup("KEEPER_RECAPTCHA_SECRET").filter(|s| !s.is_empty());
        if let Some(debug) = lookup("KEEPER_DEBUG") {
            settings.debug = parse_flag(&debug)
                .ok_or(ConfigError::InvalidValue { key: "KEEPER_DEBUG", value: debug })?;
        }

        Ok(settings)
    }

    /// Whether submissions must carry a verified reCAPTCHA token.
    pub fn captcha_enabled(&self) -> bool {
        !self.debug && self.recaptcha_secret.is_some()
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
