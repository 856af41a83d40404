//! Domain models for accessions.
//!
//! - [`Accession`] - one donor submission and its stored files
//! - [`Affiliation`] - the donor's relationship to the university
//! - [`AccessionStatus`] - review state set by archivists
//! - [`UploadedFile`] - a file received in a request, not yet kept
//! - [`StoredFile`] - a file kept under the accession's directory

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::icon_for;

// =============================================================================
// Affiliation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Affiliation {
    #[serde(rename = "STU")]
    Student,
    #[serde(rename = "FAC")]
    Faculty,
    #[serde(rename = "STA")]
    Staff,
    #[serde(rename = "ALU")]
    Alumni,
    #[serde(rename = "OTH")]
    Other,
}

impl Affiliation {
    pub const ALL: [Affiliation; 5] = [
        Affiliation::Student,
        Affiliation::Faculty,
        Affiliation::Staff,
        Affiliation::Alumni,
        Affiliation::Other,
    ];

    /// Parse the form code (`STU`, `FAC`, ...).
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.code() == code)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Affiliation::Student => "STU",
            Affiliation::Faculty => "FAC",
            Affiliation::Staff => "STA",
            Affiliation::Alumni => "ALU",
            Affiliation::Other => "OTH",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Affiliation::Student => "Student",
            Affiliation::Faculty => "Faculty",
            Affiliation::Staff => "Staff",
            Affiliation::Alumni => "Alumni",
            Affiliation::Other => "Other",
        }
    }
}

// =============================================================================
// Accession Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccessionStatus {
    #[default]
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "REV")]
    UnderReview,
    #[serde(rename = "ACC")]
    Accepted,
    #[serde(rename = "REJ")]
    Rejected,
}

// =============================================================================
// Accession
// =============================================================================

/// Donor details that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessionForm {
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    #[serde(default)]
    pub phone_number: String,
    pub affiliation: Affiliation,
    #[serde(default)]
    pub organization_name: String,
    #[serde(default)]
    pub description: String,
}

/// One submission as stored in `accession.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accession {
    pub id: Uuid,
    pub date_submitted: DateTime<Utc>,
    pub date_last_updated: DateTime<Utc>,
    #[serde(flatten)]
    pub donor: AccessionForm,
    #[serde(default)]
    pub admin_notes: String,
    #[serde(default)]
    pub accession_status: AccessionStatus,
    #[serde(default)]
    pub files: Vec<StoredFile>,
}

impl Accession {
    pub fn new(donor: AccessionForm) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            date_submitted: now,
            date_last_updated: now,
            donor,
            admin_notes: String::new(),
            accession_status: AccessionStatus::New,
            files: Vec::new(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.donor.first_name, self.donor.last_name)
    }
}

// =============================================================================
// Files
// =============================================================================

/// A file part streamed to a staging path during the request.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    /// Name as sent by the browser.
    pub file_name: String,
    /// Content type declared by the browser.
    pub declared_type: String,
    pub size: u64,
    /// First bytes of the file, for type sniffing.
    pub head: Vec<u8>,
    /// Where the bytes were staged.
    pub staged_path: PathBuf,
    pub description: String,
}

/// A file kept with an accession.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub file_name: String,
    /// Path relative to the storage root, e.g. `uploads/{id}/scan.pdf`.
    pub path: PathBuf,
    #[serde(default)]
    pub file_description: String,
    /// Type detected from the content.
    pub content_type: String,
    pub size: u64,
    pub date_file_submitted: DateTime<Utc>,
}

impl StoredFile {
    pub fn icon(&self) -> &'static str {
        icon_for(&self.content_type)
    }
}

// =============================================================================
// Tests
// =============================================================================
