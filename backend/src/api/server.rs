//! HTTP server for Keeper.
//!
//! Accepts accession submissions from the browser form and serves the
//! built frontend.
//!
//! # API Endpoints
//!
//! | Method | Path        | Description                                 |
//! |--------|-------------|---------------------------------------------|
//! | GET    | `/health`   | Health check                                |
//! | GET    | `/stats`    | Stored accession and file counts            |
//! | POST   | `/submit/`  | Multipart accession submission              |
//! | GET    | `/*`        | Static frontend assets                      |

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use super::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use super::types::{error_response, FileErrorRecord, SubmissionResponse};
use crate::captcha::{self, RecaptchaVerifier};
use crate::config::Settings;
use crate::error::{ServerError, ServerResult, StorageError};
use crate::models::UploadedFile;
use crate::storage::AccessionStore;
use crate::validation::{self, FieldErrors, SNIFF_LEN};

/// Multipart names used by the form.
pub const FIELD_PREFIX: &str = "accession-";
pub const CAPTCHA_FIELD: &str = "g-recaptcha-response";
pub const FILE_FIELD: &str = "file-file";
pub const FILE_DESCRIPTION_FIELD: &str = "file-file_description";

/// Shared state of every request.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: AccessionStore,
    pub captcha: RecaptchaVerifier,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let captcha = match &settings.recaptcha_secret {
            Some(secret) if settings.captcha_enabled() => RecaptchaVerifier::new(secret.clone()),
            _ => RecaptchaVerifier::disabled(),
        };
        Self {
            store: AccessionStore::new(&settings.upload_dir),
            settings: Arc::new(settings),
            captcha,
        }
    }
}

/// A submission read off the wire, files already staged on disk.
#[derive(Debug, Default)]
pub struct SubmissionParts {
    /// Donor fields without the `accession-` prefix.
    pub fields: BTreeMap<String, String>,
    pub captcha_token: Option<String>,
    pub files: Vec<UploadedFile>,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::HeaderName::from_static("x-requested-with")])
        .expose_headers([header::CONTENT_TYPE]);

    let static_files = ServeDir::new(&state.settings.static_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/submit/", post(submit))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let port = settings.port;
    let state = AppState::new(settings);
    state.store.ensure_dirs().await?;

    if !state.captcha.is_enabled() {
        log_warning("reCAPTCHA verification is disabled");
    }

    let app = router(state.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Keeper server running on http://localhost:{}", port);
    println!("   POST /submit/ - Accession submission");
    println!("   GET  /stats   - Stored accession counts");
    println!("   GET  /health  - Health check");
    println!();
    println!("📁 Storage: {}", state.store.root().display());
    println!("🌐 Static:  {}", state.settings.static_dir.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "keeper",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "submit": "POST /submit/",
            "stats": "GET /stats"
        }
    }))
}

async fn stats(State(state): State<AppState>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let stats = state.store.stats().await.map_err(|e| {
        log_error(format!("Stats failed: {}", e));
        (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response(&e.to_string())))
    })?;
    Ok(Json(json!(stats)))
}

/// Submission endpoint
async fn submit(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    multipart: Multipart,
) -> Result<Json<SubmissionResponse>, (StatusCode, Json<Value>)> {
    let into_response = |e: ServerError| {
        let status = if e.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        log_error(e.to_string());
        (status, Json(error_response(&e.to_string())))
    };

    let parts = read_submission(&state, multipart).await.map_err(into_response)?;
    let remote_ip = remote.ip().to_string();
    let response = process_submission(&state, parts, Some(&remote_ip))
        .await
        .map_err(into_response)?;
    Ok(Json(response))
}

/// Read every part, streaming files to the staging area. Staged files
/// are removed again if the body turns out to be malformed.
pub async fn read_submission(state: &AppState, mut multipart: Multipart) -> ServerResult<SubmissionParts> {
    let mut parts = SubmissionParts::default();
    let mut descriptions = Vec::new();

    let result = read_parts(state, &mut multipart, &mut parts, &mut descriptions).await;
    if let Err(e) = result {
        state.store.discard(&parts.files).await;
        return Err(e);
    }

    assign_descriptions(&mut parts.files, descriptions);
    Ok(parts)
}

async fn read_parts(
    state: &AppState,
    multipart: &mut Multipart,
    parts: &mut SubmissionParts,
    descriptions: &mut Vec<String>,
) -> ServerResult<()> {
    let bad_request = |e: axum::extract::multipart::MultipartError| {
        ServerError::BadRequest(format!("Multipart error: {}", e))
    };

    while let Some(mut field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let declared_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let (staged_path, mut out) = state.store.stage().await?;
            parts.files.push(UploadedFile {
                file_name,
                declared_type,
                size: 0,
                head: Vec::new(),
                staged_path,
                description: String::new(),
            });
            let Some(upload) = parts.files.last_mut() else {
                return Err(ServerError::Internal("staged file vanished".to_string()));
            };

            // Oversized files are drained but not written.
            while let Some(chunk) = field.chunk().await.map_err(bad_request)? {
                if upload.head.len() < SNIFF_LEN {
                    let take = (SNIFF_LEN - upload.head.len()).min(chunk.len());
                    upload.head.extend_from_slice(&chunk[..take]);
                }
                upload.size += chunk.len() as u64;
                if upload.size <= state.settings.max_upload_size {
                    out.write_all(&chunk).await.map_err(StorageError::from)?;
                }
            }
            out.flush().await.map_err(StorageError::from)?;
            continue;
        }

        let value = field.text().await.map_err(bad_request)?;
        if name == FILE_DESCRIPTION_FIELD {
            descriptions.push(value);
        } else if name == CAPTCHA_FIELD {
            parts.captcha_token = Some(value);
        } else if let Some(key) = name.strip_prefix(FIELD_PREFIX) {
            parts.fields.insert(key.to_string(), value);
        }
    }
    Ok(())
}

/// Descriptions arrive index-aligned with the file parts.
fn assign_descriptions(files: &mut [UploadedFile], descriptions: Vec<String>) {
    for (file, description) in files.iter_mut().zip(descriptions) {
        file.description = description;
    }
}

/// Validate a submission and keep it if everything passes. Rejected
/// submissions leave nothing behind.
pub async fn process_submission(
    state: &AppState,
    parts: SubmissionParts,
    remote_ip: Option<&str>,
) -> ServerResult<SubmissionResponse> {
    println!("\n{}", "=".repeat(70));
    println!(
        "📨 NEW SUBMISSION: {} file(s), {} bytes",
        parts.files.len(),
        parts.files.iter().map(|f| f.size).sum::<u64>()
    );
    println!("{}\n", "=".repeat(70));

    let (donor, mut errors_form) = match validation::validate_accession(&parts.fields) {
        Ok(donor) => (Some(donor), FieldErrors::new()),
        Err(errors) => (None, errors),
    };

    if state.captcha.is_enabled() {
        if let Err(e) = state.captcha.verify(parts.captcha_token.as_deref(), remote_ip).await {
            log_warning(format!("Bot check failed: {}", e));
            errors_form
                .entry("captcha".to_string())
                .or_default()
                .push(captcha::form_message(&e).to_string());
        }
    }

    let mut accepted = Vec::new();
    let mut errors_file = Vec::new();
    for upload in &parts.files {
        match validation::validate_file(upload, state.settings.max_upload_size) {
            Ok(mime) => {
                log_info_indent(
                    format!("{} → {} (declared {})", upload.file_name, mime, upload.declared_type),
                    1,
                );
                accepted.push(mime.to_string());
            }
            Err(messages) => {
                log_warning(format!("{}: {}", upload.file_name, messages.join(" ")));
                errors_file.push(FileErrorRecord::new(upload.file_name.clone(), messages));
            }
        }
    }

    let donor = match donor {
        Some(donor) if errors_form.is_empty() && errors_file.is_empty() => donor,
        _ => {
            for (field, messages) in &errors_form {
                log_warning(format!("{}: {}", field, messages.join(" ")));
            }
            state.store.discard(&parts.files).await;
            return Ok(SubmissionResponse::rejected(errors_form, errors_file));
        }
    };

    let files = parts.files.into_iter().zip(accepted).collect();
    let accession = state.store.save(donor, files).await?;
    log_info(format!("Saved accession for {}", accession.full_name()));
    log_success(format!("Accession {} stored with {} file(s)", accession.id, accession.files.len()));

    Ok(SubmissionResponse::accepted(&accession))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const BOUNDARY: &str = "keeper-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(file_name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n",
                            FILE_FIELD, file_name
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn donor_parts() -> Vec<Part<'static>> {
        vec![
            Part::Text("accession-first_name", "Ada"),
            Part::Text("accession-last_name", "Lovelace"),
            Part::Text("accession-email_address", "ada@example.edu"),
            Part::Text("accession-affiliation", "ALU"),
        ]
    }

    async fn post_submit(state: AppState, body: Vec<u8>) -> (StatusCode, Value) {
        let app = router(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/submit/")
                    .header("Content-Type", format!("multipart/form-data; boundary={}", BOUNDARY))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn incoming_count(root: &std::path::Path) -> usize {
        std::fs::read_dir(root.join("incoming")).unwrap().count()
    }

    fn state(root: &std::path::Path) -> AppState {
        AppState::new(Settings {
            upload_dir: root.to_path_buf(),
            max_upload_size: 1024 * 1024,
            ..Settings::default()
        })
    }

    fn donor_fields() -> BTreeMap<String, String> {
        [
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
            ("email_address", "ada@example.edu"),
            ("affiliation", "ALU"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    async fn staged(state: &AppState, name: &str, bytes: &[u8]) -> UploadedFile {
        let (path, mut file) = state.store.stage().await.unwrap();
        file.write_all(bytes).await.unwrap();
        file.flush().await.unwrap();
        UploadedFile {
            file_name: name.into(),
            declared_type: "application/octet-stream".into(),
            size: bytes.len() as u64,
            head: bytes.iter().take(SNIFF_LEN).copied().collect(),
            staged_path: path,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_valid_submission_is_stored() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path());
        let parts = SubmissionParts {
            fields: donor_fields(),
            captcha_token: None,
            files: vec![
                staged(&state, "letter.pdf", b"%PDF-1.4 letter").await,
                staged(&state, "notes.txt", b"Box 3, folder 2").await,
            ],
        };

        let response = process_submission(&state, parts, None).await.unwrap();
        assert!(response.success);
        assert!(response.template.unwrap().contains("Thank you, Ada!"));

        let uploads = tmp.path().join("uploads");
        let dirs: Vec<_> = std::fs::read_dir(&uploads).unwrap().flatten().collect();
        assert_eq!(dirs.len(), 1);
        let dir = dirs[0].path();
        assert!(dir.join("letter.pdf").exists());
        assert!(dir.join("notes.txt").exists());
        assert!(dir.join("accession.json").exists());
    }

    #[tokio::test]
    async fn test_missing_fields_reject_and_discard() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path());
        let upload = staged(&state, "letter.pdf", b"%PDF-1.4").await;
        let staged_path = upload.staged_path.clone();

        let mut fields = donor_fields();
        fields.remove("last_name");
        let parts = SubmissionParts { fields, captcha_token: None, files: vec![upload] };

        let response = process_submission(&state, parts, None).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.errors_form["last_name"], vec!["This field is required.".to_string()]);
        assert!(response.errors_file.is_empty());
        assert!(!staged_path.exists());
        assert_eq!(state.store.stats().await.unwrap().accession_count, 0);
    }

    #[tokio::test]
    async fn test_unsupported_file_is_named() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path());
        let parts = SubmissionParts {
            fields: donor_fields(),
            captcha_token: None,
            files: vec![
                staged(&state, "letter.pdf", b"%PDF-1.4").await,
                staged(&state, "tool.exe", &[0x4D, 0x5A, 0x90, 0x00, 0x03]).await,
            ],
        };

        let response = process_submission(&state, parts, None).await.unwrap();
        assert!(!response.success);
        assert!(response.errors_form.is_empty());
        assert_eq!(response.errors_file.len(), 1);
        assert_eq!(response.errors_file[0].file_name, "tool.exe");
        assert_eq!(
            response.errors_file[0].error["file"],
            vec!["File type application/octet-stream not supported.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_captcha_required_when_enabled() {
        let tmp = tempfile::tempdir().unwrap();
        let mut state = state(tmp.path());
        state.captcha = RecaptchaVerifier::new("secret".into()).with_endpoint("http://127.0.0.1:9/siteverify");

        let parts = SubmissionParts { fields: donor_fields(), captcha_token: None, files: vec![] };
        let response = process_submission(&state, parts, None).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.errors_form["captcha"], vec![captcha::CAPTCHA_REQUIRED.to_string()]);
    }

    #[tokio::test]
    async fn test_unusable_file_name_rejected_before_saving() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path());
        let parts = SubmissionParts {
            fields: donor_fields(),
            captcha_token: None,
            files: vec![
                staged(&state, "good.pdf", b"%PDF-1.4 good").await,
                staged(&state, "", b"%PDF-1.4 nameless").await,
                staged(&state, "later.pdf", b"%PDF-1.4 later").await,
            ],
        };

        let response = process_submission(&state, parts, None).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.errors_file.len(), 1);
        assert_eq!(response.errors_file[0].file_name, "");
        assert_eq!(
            response.errors_file[0].error["file"],
            vec![validation::INVALID_FILE_NAME.to_string()]
        );
        assert_eq!(incoming_count(tmp.path()), 0);
        assert_eq!(state.store.stats().await.unwrap().accession_count, 0);
    }

    #[tokio::test]
    async fn test_submit_route_stores_fields_and_descriptions() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path());
        let store = state.store.clone();

        let mut parts = donor_parts();
        parts.extend([
            Part::File("letter.pdf", b"%PDF-1.4 letter"),
            Part::File("notes.txt", b"Box 3, folder 2"),
            Part::Text(FILE_DESCRIPTION_FIELD, "Letter to the dean"),
            Part::Text(FILE_DESCRIPTION_FIELD, "Finding aid notes"),
            Part::Text("unrelated", "ignored"),
        ]);
        let (status, body) = post_submit(state, multipart_body(&parts)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert!(body.get("errorsForm").is_none());

        let dir = std::fs::read_dir(store.uploads_dir()).unwrap().next().unwrap().unwrap();
        let id = dir.file_name().to_string_lossy().parse().unwrap();
        let accession = store.load(id).await.unwrap();
        assert_eq!(accession.full_name(), "Ada Lovelace");
        let described: Vec<_> = accession
            .files
            .iter()
            .map(|f| (f.file_name.as_str(), f.file_description.as_str()))
            .collect();
        assert_eq!(
            described,
            vec![("letter.pdf", "Letter to the dean"), ("notes.txt", "Finding aid notes")]
        );
        assert_eq!(incoming_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_submit_route_rejects_oversized_file_without_keeping_it() {
        let tmp = tempfile::tempdir().unwrap();
        let state = AppState::new(Settings {
            upload_dir: tmp.path().to_path_buf(),
            max_upload_size: 16,
            ..Settings::default()
        });

        let mut content = b"%PDF-1.4 ".to_vec();
        content.resize(4096, b'x');
        let mut parts = donor_parts();
        parts.push(Part::File("scan.pdf", &content));
        let (status, body) = post_submit(state, multipart_body(&parts)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["errorsFile"][0]["file_name"], json!("scan.pdf"));
        let message = body["errorsFile"][0]["error"]["file"][0].as_str().unwrap();
        assert!(message.starts_with("File size must be no more than"));
        assert_eq!(incoming_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_submit_route_reports_form_errors_without_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path());

        let parts = vec![
            Part::Text("accession-first_name", "Ada"),
            Part::Text("accession-email_address", "not-an-address"),
            Part::Text("accession-affiliation", "ALU"),
        ];
        let (status, body) = post_submit(state, multipart_body(&parts)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["errorsForm"]["last_name"], json!([validation::REQUIRED]));
        assert_eq!(body["errorsForm"]["email_address"], json!([validation::INVALID_EMAIL]));
    }

    #[tokio::test]
    async fn test_truncated_multipart_is_bad_request() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path());
        state.store.ensure_dirs().await.unwrap();

        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"accession-first_name\"\r\n\r\nAda\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"a.pdf\"\r\n\r\n%PDF-1.4 cut",
            b = BOUNDARY,
            f = FILE_FIELD
        );
        let (status, body) = post_submit(state, body.into_bytes()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert!(body["error"].as_str().unwrap().contains("Multipart error"));
        assert_eq!(incoming_count(tmp.path()), 0);
    }

    #[test]
    fn test_descriptions_align_with_files() {
        let file = |name: &str| UploadedFile {
            file_name: name.into(),
            declared_type: String::new(),
            size: 1,
            head: vec![],
            staged_path: std::path::PathBuf::new(),
            description: String::new(),
        };
        let mut files = vec![file("a"), file("b")];
        assign_descriptions(&mut files, vec!["first".into()]);
        assert_eq!(files[0].description, "first");
        assert_eq!(files[1].description, "");
    }

    #[test]
    fn test_debug_settings_disable_captcha() {
        let state = AppState::new(Settings {
            recaptcha_secret: Some("secret".into()),
            debug: true,
            ..Settings::default()
        });
        assert!(!state.captcha.is_enabled());
    }
}
