//! reCAPTCHA verification against Google's `siteverify` endpoint.

use serde::Deserialize;

use crate::api::logs::{log_info_indent, log_warning};
use crate::error::{CaptchaError, CaptchaResult};

pub const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Form error shown when the token is missing.
pub const CAPTCHA_REQUIRED: &str = "This field is required.";

/// Form error shown when verification fails.
pub const CAPTCHA_FAILED: &str = "Error verifying reCAPTCHA, please try again.";

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Verifies bot-check tokens. Disabled verifiers accept everything.
#[derive(Debug, Clone)]
pub struct RecaptchaVerifier {
    secret: Option<String>,
    endpoint: String,
    client: reqwest::Client,
}

impl RecaptchaVerifier {
    pub fn new(secret: String) -> Self {
        Self {
            secret: Some(secret),
            endpoint: SITEVERIFY_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// A verifier that skips the check (debug mode).
    pub fn disabled() -> Self {
        Self {
            secret: None,
            endpoint: SITEVERIFY_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at another verification endpoint
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Check a token sent as `g-recaptcha-response`.
    pub async fn verify(&self, token: Option<&str>, remote_ip: Option<&str>) -> CaptchaResult<()> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };
        let token = token.map(str::trim).filter(|t| !t.is_empty()).ok_or(CaptchaError::MissingToken)?;

        log_info_indent("Verifying reCAPTCHA token...", 1);
        let mut params = vec![("secret", secret.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            params.push(("remoteip", ip));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| CaptchaError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptchaError::RequestFailed(format!("HTTP {}", status)));
        }

        let body: SiteVerifyResponse = response
            .json()
            .await
            .map_err(|e| CaptchaError::RequestFailed(e.to_string()))?;

        if body.success {
            Ok(())
        } else {
            log_warning(format!("reCAPTCHA rejected: {:?}", body.error_codes));
            Err(CaptchaError::Rejected(body.error_codes))
        }
    }
}

/// Message for the `captcha` form key.
pub fn form_message(err: &CaptchaError) -> &'static str {
    match err {
        CaptchaError::MissingToken => CAPTCHA_REQUIRED,
        CaptchaError::Rejected(_) | CaptchaError::RequestFailed(_) => CAPTCHA_FAILED,
    }
}
