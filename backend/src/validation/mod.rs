//! Server-side validation of accession forms and uploaded files.
//!
//! The browser validates too, but nothing it sends is trusted. Failures
//! here are data, not errors: they are collected per field and per file
//! and returned to the browser in the submission result.
//!
//! # Form rules
//!
//! | Field               | Rules                                 |
//! |---------------------|---------------------------------------|
//! | `first_name`        | required, at most 100 characters      |
//! | `last_name`         | required, at most 100 characters      |
//! | `email_address`     | required, email, at most 254          |
//! | `phone_number`      | optional, at most 25 characters       |
//! | `affiliation`       | required, one of `STU FAC STA ALU OTH`|
//! | `organization_name` | optional, at most 255 characters      |
//! | `description`       | optional                              |
//!
//! # File rules
//!
//! - the name must keep a usable component once paths and reserved
//!   characters are stripped
//! - the type is sniffed from the first bytes, never taken from the
//!   browser, and must match an entry of
//!   [`ACCEPTED_FILE_TYPES`](crate::config::ACCEPTED_FILE_TYPES)
//!   (`type/*` wildcards allowed)
//! - the size must not exceed the configured limit
//!
//! # Example
//!
//! ```rust,ignore
//! use keeper::validation::{sniff_mime, mime_matches};
//!
//! assert_eq!(sniff_mime(b"%PDF-1.7"), "application/pdf");
//! assert!(mime_matches("image/png", "image/*"));
//! ```

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ACCEPTED_FILE_TYPES;
use crate::models::{AccessionForm, Affiliation, UploadedFile};
use crate::storage::sanitize_filename;

/// Messages per field or per file key.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const EMPTY_FILE: &str = "The submitted file is empty.";
pub const INVALID_FILE_NAME: &str = "No file was submitted. Check the encoding type on the form.";

/// Bytes kept from the start of each file for sniffing.
pub const SNIFF_LEN: usize = 8192;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("Invalid email pattern")
});

static ACCEPTED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ACCEPTED_FILE_TYPES
        .iter()
        .map(|(pattern, _)| glob_regex(pattern).expect("Invalid accepted type pattern"))
        .collect()
});

// =============================================================================
// Accession form
// =============================================================================

/// Validate the donor fields (keys without the `accession-` prefix).
pub fn validate_accession(values: &BTreeMap<String, String>) -> Result<AccessionForm, FieldErrors> {
    let mut errors = FieldErrors::new();
    let get = |key: &str| values.get(key).map(|v| v.trim().to_string()).unwrap_or_default();

    let first_name = get("first_name");
    check_text(&mut errors, "first_name", &first_name, true, 100);

    let last_name = get("last_name");
    check_text(&mut errors, "last_name", &last_name, true, 100);

    let email_address = get("email_address");
    check_text(&mut errors, "email_address", &email_address, true, 254);
    if !email_address.is_empty() && !EMAIL_RE.is_match(&email_address) {
        push(&mut errors, "email_address", INVALID_EMAIL);
    }

    let phone_number = get("phone_number");
    check_text(&mut errors, "phone_number", &phone_number, false, 25);

    let organization_name = get("organization_name");
    check_text(&mut errors, "organization_name", &organization_name, false, 255);

    let raw_affiliation = get("affiliation");
    let affiliation = if raw_affiliation.is_empty() {
        push(&mut errors, "affiliation", REQUIRED);
        None
    } else {
        let parsed = Affiliation::from_code(&raw_affiliation);
        if parsed.is_none() {
            push(
                &mut errors,
                "affiliation",
                &format!("Select a valid choice. {} is not one of the available choices.", raw_affiliation),
            );
        }
        parsed
    };

    match affiliation {
        Some(affiliation) if errors.is_empty() => Ok(AccessionForm {
            first_name,
            last_name,
            email_address,
            phone_number,
            affiliation,
            organization_name,
            description: get("description"),
        }),
        _ => Err(errors),
    }
}

fn check_text(errors: &mut FieldErrors, field: &str, value: &str, required: bool, max: usize) {
    if value.is_empty() {
        if required {
            push(errors, field, REQUIRED);
        }
        return;
    }
    let len = value.chars().count();
    if len > max {
        push(
            errors,
            field,
            &format!("Ensure this value has at most {} characters (it has {}).", max, len),
        );
    }
}

fn push(errors: &mut FieldErrors, field: &str, message: &str) {
    errors.entry(field.to_string()).or_default().push(message.to_string());
}

// =============================================================================
// File type detection
// =============================================================================

/// Magic byte signatures at offset 0
const MAGIC_SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF", "application/pdf"),
    (&[0xD0, 0xCF, 0x11, 0xE0], "application/msword"), // OLE container
    (&[0x50, 0x4B, 0x03, 0x04], "application/zip"),
    (&[0xFF, 0xD8, 0xFF], "image/jpeg"),
    (&[0x89, 0x50, 0x4E, 0x47], "image/png"),
    (b"GIF8", "image/gif"),
    (b"II*\0", "image/tiff"),
    (b"MM\0*", "image/tiff"),
    (b"BM", "image/bmp"),
    (b"ID3", "audio/mpeg"),
    (&[0xFF, 0xFB], "audio/mpeg"),
    (&[0xFF, 0xFA], "audio/mpeg"),
    (b"OggS", "audio/ogg"),
    (b"fLaC", "audio/flac"),
    (&[0x1A, 0x45, 0xDF, 0xA3], "video/webm"),
    (&[0x1F, 0x8B], "application/gzip"),
    (b"Rar!", "application/vnd.rar"),
    (&[0x37, 0x7A, 0xBC, 0xAF], "application/x-7z-compressed"),
];

/// Detect a content type from the first bytes of a file.
pub fn sniff_mime(head: &[u8]) -> &'static str {
    if head.len() >= 12 && head.starts_with(b"RIFF") {
        return match &head[8..12] {
            b"WEBP" => "image/webp",
            b"WAVE" => "audio/x-wav",
            b"AVI " => "video/x-msvideo",
            _ => "application/octet-stream",
        };
    }
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return match &head[8..12] {
            b"M4A " => "audio/mp4",
            b"qt  " => "video/quicktime",
            _ => "video/mp4",
        };
    }
    if let Some((_, mime)) = MAGIC_SIGNATURES.iter().find(|(sig, _)| head.starts_with(sig)) {
        return mime;
    }
    if looks_like_text(head) {
        let start = String::from_utf8_lossy(&head[..head.len().min(64)])
            .trim_start()
            .to_ascii_lowercase();
        if start.starts_with("<!doctype html") || start.starts_with("<html") {
            return "text/html";
        }
        return "text/plain";
    }
    "application/octet-stream"
}

fn looks_like_text(head: &[u8]) -> bool {
    if head.is_empty() || head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte character cut off by the sniff window.
        Err(e) => e.error_len().is_none() && head.len() - e.valid_up_to() < 4,
    }
}

/// Shell-style pattern (`*`, `?`) to an anchored regex.
fn glob_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re)
}

/// Whether `mime` matches a pattern such as `image/*`.
pub fn mime_matches(mime: &str, pattern: &str) -> bool {
    glob_regex(pattern).map(|re| re.is_match(mime)).unwrap_or(false)
}

pub fn is_accepted_type(mime: &str) -> bool {
    ACCEPTED_PATTERNS.iter().any(|re| re.is_match(mime))
}

// =============================================================================
// File validation
// =============================================================================

/// "File size must be no more than {n} GB", `n` in gigabytes.
pub fn size_limit_message(max_size: u64) -> String {
    let gb = max_size as f64 / 1024.0 / 1024.0 / 1024.0;
    if gb.fract() == 0.0 {
        format!("File size must be no more than {:.1} GB", gb)
    } else {
        format!("File size must be no more than {} GB", gb)
    }
}

/// Check one file. Returns the sniffed type, or the messages for its
/// `file` key.
pub fn validate_file(file: &UploadedFile, max_size: u64) -> Result<&'static str, Vec<String>> {
    if sanitize_filename(&file.file_name).is_err() {
        return Err(vec![INVALID_FILE_NAME.to_string()]);
    }
    if file.size == 0 {
        return Err(vec![EMPTY_FILE.to_string()]);
    }

    let mut messages = Vec::new();
    let mime = sniff_mime(&file.head);
    if !is_accepted_type(mime) {
        messages.push(format!("File type {} not supported.", mime));
    }
    if file.size > max_size {
        messages.push(size_limit_message(max_size));
    }

    if messages.is_empty() {
        Ok(mime)
    } else {
        Err(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn form(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn upload(head: &[u8], size: u64) -> UploadedFile {
        UploadedFile {
            file_name: "upload.bin".into(),
            declared_type: "application/octet-stream".into(),
            size,
            head: head.to_vec(),
            staged_path: PathBuf::from("/tmp/none"),
            description: String::new(),
        }
    }

    #[test]
    fn test_valid_accession() {
        let donor = validate_accession(&form(&[
            ("first_name", " Ada "),
            ("last_name", "Lovelace"),
            ("email_address", "ada@example.edu"),
            ("affiliation", "FAC"),
        ]))
        .unwrap();
        assert_eq!(donor.first_name, "Ada");
        assert_eq!(donor.affiliation, Affiliation::Faculty);
    }

    #[test]
    fn test_missing_required_fields() {
        let errors = validate_accession(&form(&[("first_name", "Ada")])).unwrap_err();
        let keys: Vec<_> = errors.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["affiliation", "email_address", "last_name"]);
        assert_eq!(errors["last_name"], vec![REQUIRED.to_string()]);
    }

    #[test]
    fn test_field_rules() {
        let long_phone = "5".repeat(26);
        let errors = validate_accession(&form(&[
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
            ("email_address", "not-an-email"),
            ("phone_number", &long_phone),
            ("affiliation", "XYZ"),
        ]))
        .unwrap_err();
        assert_eq!(errors["email_address"], vec![INVALID_EMAIL.to_string()]);
        assert_eq!(
            errors["phone_number"],
            vec!["Ensure this value has at most 25 characters (it has 26).".to_string()]
        );
        assert!(errors["affiliation"][0].contains("XYZ is not one of the available choices"));
    }

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(sniff_mime(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]), "image/png");
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(b"\0\0\0\x18ftypmp42"), "video/mp4");
        assert_eq!(sniff_mime(b"Dear archivist,\n"), "text/plain");
        assert_eq!(sniff_mime(b"  <!DOCTYPE html><html>"), "text/html");
        assert_eq!(sniff_mime(&[0x4D, 0x5A, 0x90, 0x00]), "application/octet-stream");
    }

    #[test]
    fn test_text_cut_mid_character() {
        // "é" is 0xC3 0xA9; the window ends after the first byte.
        assert_eq!(sniff_mime(&[b'c', b'a', b'f', 0xC3]), "text/plain");
    }

    #[test]
    fn test_mime_patterns() {
        assert!(mime_matches("image/png", "image/*"));
        assert!(mime_matches("application/pdf", "application/pdf"));
        assert!(!mime_matches("application/pdfx", "application/pdf"));
        assert!(is_accepted_type("audio/flac"));
        assert!(!is_accepted_type("application/zip"));
    }

    #[test]
    fn test_validate_file() {
        assert_eq!(validate_file(&upload(b"%PDF-1.4", 2048), 4096), Ok("application/pdf"));

        let errors = validate_file(&upload(&[0x50, 0x4B, 0x03, 0x04], 2048), 4096).unwrap_err();
        assert_eq!(errors, vec!["File type application/zip not supported.".to_string()]);

        let errors = validate_file(&upload(b"%PDF-1.4", 8192), 4096).unwrap_err();
        assert!(errors[0].starts_with("File size must be no more than"));

        let errors = validate_file(&upload(b"", 0), 4096).unwrap_err();
        assert_eq!(errors, vec![EMPTY_FILE.to_string()]);
    }

    #[test]
    fn test_unusable_file_name() {
        for name in ["", "..", "uploads/", " "] {
            let mut file = upload(b"%PDF-1.4", 8);
            file.file_name = name.to_string();
            assert_eq!(
                validate_file(&file, 1024),
                Err(vec![INVALID_FILE_NAME.to_string()]),
                "name {:?}",
                name
            );
        }
    }

    #[test]
    fn test_size_limit_message() {
        assert_eq!(
            size_limit_message(4 * 1024 * 1024 * 1024),
            "File size must be no more than 4.0 GB"
        );
        assert_eq!(
            size_limit_message(4 * 1024 * 1024),
            "File size must be no more than 0.00390625 GB"
        );
    }
}
