//! REST API types shared with the browser form.
//!
//! The submission result is what the frontend's `FormSubmissionResult`
//! deserialises: `success`, the success `template` fragment, and the
//! form and file errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::Accession;
use crate::validation::FieldErrors;

/// Errors of one rejected file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileErrorRecord {
    pub file_name: String,
    /// Messages keyed by form field, normally `file`.
    pub error: BTreeMap<String, Vec<String>>,
}

impl FileErrorRecord {
    pub fn new(file_name: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            file_name: file_name.into(),
            error: BTreeMap::from([("file".to_string(), messages)]),
        }
    }
}

/// Response to `POST /submit/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors_form: FieldErrors,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors_file: Vec<FileErrorRecord>,
}

impl SubmissionResponse {
    pub fn accepted(accession: &Accession) -> Self {
        Self {
            success: true,
            template: Some(render_results(accession)),
            ..Default::default()
        }
    }

    pub fn rejected(errors_form: FieldErrors, errors_file: Vec<FileErrorRecord>) -> Self {
        Self {
            success: false,
            template: None,
            errors_form,
            errors_file,
        }
    }
}

/// The fragment that replaces the form after a successful submission.
pub fn render_results(accession: &Accession) -> String {
    let files: String = accession
        .files
        .iter()
        .map(|f| {
            format!(
                "<li><i class=\"fa fa-{}\"></i> {}</li>",
                f.icon(),
                escape_html(&f.file_name)
            )
        })
        .collect();

    format!(
        concat!(
            "<div class=\"results\">",
            "<h2>Thank you, {name}!</h2>",
            "<p>Your submission was received. Library staff will review it and contact you at {email}.</p>",
            "<ul class=\"results__files\">{files}</ul>",
            "<p class=\"results__reference\">Reference: {id}</p>",
            "<p><a href=\"/\" class=\"btn btn-primary\">Submit more materials</a></p>",
            "</div>"
        ),
        name = escape_html(&accession.donor.first_name),
        email = escape_html(&accession.donor.email_address),
        files = files,
        id = accession.id,
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "success": false,
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccessionForm, Affiliation};

    #[test]
    fn test_rejected_wire_format() {
        let mut form = FieldErrors::new();
        form.insert("last_name".into(), vec!["This field is required.".into()]);
        let response = SubmissionResponse::rejected(
            form,
            vec![FileErrorRecord::new("a.zip", vec!["File type application/zip not supported.".into()])],
        );

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], json!(false));
        assert!(value.get("template").is_none());
        assert_eq!(value["errorsForm"]["last_name"][0], json!("This field is required."));
        assert_eq!(value["errorsFile"][0]["file_name"], json!("a.zip"));
        assert_eq!(
            value["errorsFile"][0]["error"]["file"][0],
            json!("File type application/zip not supported.")
        );
    }

    #[test]
    fn test_results_fragment_is_escaped() {
        let accession = Accession::new(AccessionForm {
            first_name: "<b>Ada</b>".into(),
            last_name: "Lovelace".into(),
            email_address: "ada@example.edu".into(),
            phone_number: String::new(),
            affiliation: Affiliation::Other,
            organization_name: String::new(),
            description: String::new(),
        });
        let response = SubmissionResponse::accepted(&accession);
        let html = response.template.unwrap();
        assert!(html.contains("Thank you, &lt;b&gt;Ada&lt;/b&gt;!"));
        assert!(html.contains(&accession.id.to_string()));
        assert!(response.errors_form.is_empty());
    }

    #[test]
    fn test_error_response_shape() {
        let value = error_response("Multipart error");
        assert_eq!(value, json!({"success": false, "error": "Multipart error"}));
    }
}
