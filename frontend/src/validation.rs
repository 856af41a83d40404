//! Client-side field validation.
//!
//! The [`Validator`] is the gate in front of every submission: it checks
//! all registered fields synchronously and reports each outcome through a
//! [`ValidationObserver`]. Nothing here touches the network.
//!
//! Optional fields skip every rule except [`Rule::Required`] while empty.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::UploadConfig;

/// Name of the bot-verification field written by the reCAPTCHA widget.
pub const BOT_CHECK_FIELD: &str = "g-recaptcha-response";

/// Prefix of the accession form fields.
pub const FIELD_PREFIX: &str = "accession-";

/// Donor affiliation choices: (code, label).
pub const AFFILIATION_CHOICES: [(&str, &str); 5] = [
    ("STU", "Student"),
    ("FAC", "Faculty"),
    ("STA", "Staff"),
    ("ALU", "Alumni"),
    ("OTH", "Other"),
];

/// Current field values keyed by field name.
pub type FormValues = BTreeMap<String, String>;

/// Field identifier: the form field's `name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(String);

impl FieldId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Field of the accession form, e.g. `accession-email_address`.
    pub fn accession(name: &str) -> Self {
        Self(format!("{}{}", FIELD_PREFIX, name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_bot_check(&self) -> bool {
        self.0 == BOT_CHECK_FIELD
    }
}

/// A single validation rule.
#[derive(Clone, Debug)]
pub enum Rule {
    Required,
    Email,
    MinLength(usize),
    MaxLength(usize),
    OneOf(Vec<String>),
    Pattern(Regex),
}

impl Rule {
    /// Error message when `value` breaks the rule.
    fn check(&self, value: &str) -> Option<String> {
        let value = value.trim();
        match self {
            Rule::Required => value
                .is_empty()
                .then(|| "This value is required.".to_string()),
            _ if value.is_empty() => None,
            Rule::Email => (!EMAIL_RE.is_match(value))
                .then(|| "This value should be a valid email.".to_string()),
            Rule::MinLength(min) => (value.chars().count() < *min).then(|| {
                format!("This value is too short. It should have {} characters or more.", min)
            }),
            Rule::MaxLength(max) => (value.chars().count() > *max).then(|| {
                format!("This value is too long. It should have {} characters or fewer.", max)
            }),
            Rule::OneOf(choices) => (!choices.iter().any(|c| c == value))
                .then(|| "This value is not a valid choice.".to_string()),
            Rule::Pattern(re) => (!re.is_match(value))
                .then(|| "This value seems to be invalid.".to_string()),
        }
    }
}

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"));

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+().\-\s]+$").expect("static phone pattern"));

/// A registered field and its rules.
#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub id: FieldId,
    pub label: String,
    pub rules: Vec<Rule>,
}

impl FieldSpec {
    pub fn new(id: FieldId, label: &str, rules: Vec<Rule>) -> Self {
        Self { id, label: label.to_string(), rules }
    }

    pub fn is_required(&self) -> bool {
        self.rules.iter().any(|r| matches!(r, Rule::Required))
    }
}

/// Per-field validation state.
///
/// Failing exactly when it carries messages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationFieldState {
    messages: Vec<String>,
}

impl ValidationFieldState {
    pub fn passing() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<String>) -> Self {
        Self { messages }
    }

    pub fn is_passing(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// Receives the per-field outcome of every validation run.
pub trait ValidationObserver {
    fn on_field_error(&mut self, field: &FieldId, state: &ValidationFieldState);
    fn on_field_success(&mut self, field: &FieldId);
}

/// Visual state of a regular field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FieldFeedback {
    #[default]
    Untouched,
    Passing,
    /// Failing marker plus tooltip text.
    Failing(Vec<String>),
}

/// What a validation callback changes on the page.
///
/// The bot-verification field has no tooltip anchor; it toggles its own
/// visible "required" region instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedbackUpdate {
    Field { field: FieldId, feedback: FieldFeedback },
    BotCheckBanner { visible: bool },
}

impl FeedbackUpdate {
    pub fn error(field: &FieldId, state: &ValidationFieldState) -> Self {
        if field.is_bot_check() {
            FeedbackUpdate::BotCheckBanner { visible: true }
        } else {
            FeedbackUpdate::Field {
                field: field.clone(),
                feedback: FieldFeedback::Failing(state.messages().to_vec()),
            }
        }
    }

    pub fn success(field: &FieldId) -> Self {
        if field.is_bot_check() {
            FeedbackUpdate::BotCheckBanner { visible: false }
        } else {
            FeedbackUpdate::Field { field: field.clone(), feedback: FieldFeedback::Passing }
        }
    }
}

/// The validation gate.
#[derive(Clone, Debug, Default)]
pub struct Validator {
    fields: Vec<FieldSpec>,
    armed: bool,
}

impl Validator {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields, armed: false }
    }

    /// Rules of the donor accession form.
    pub fn accession_form(config: &UploadConfig) -> Self {
        let choices = AFFILIATION_CHOICES.iter().map(|(code, _)| code.to_string()).collect();
        let mut fields = vec![
            FieldSpec::new(
                FieldId::accession("first_name"),
                "First name",
                vec![Rule::Required, Rule::MaxLength(100)],
            ),
            FieldSpec::new(
                FieldId::accession("last_name"),
                "Last name",
                vec![Rule::Required, Rule::MaxLength(100)],
            ),
            FieldSpec::new(
                FieldId::accession("email_address"),
                "Email address",
                vec![Rule::Required, Rule::Email, Rule::MaxLength(254)],
            ),
            FieldSpec::new(
                FieldId::accession("phone_number"),
                "Phone number",
                vec![Rule::Pattern(PHONE_RE.clone()), Rule::MinLength(10), Rule::MaxLength(25)],
            ),
            FieldSpec::new(
                FieldId::accession("affiliation"),
                "Affiliation",
                vec![Rule::Required, Rule::OneOf(choices)],
            ),
            FieldSpec::new(FieldId::accession("description"), "Description", vec![]),
        ];
        if config.requires_bot_check() {
            fields.push(FieldSpec::new(
                FieldId::new(BOT_CHECK_FIELD),
                "Verification",
                vec![Rule::Required],
            ));
        }
        Self::new(fields)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.id.name() == name)
    }

    /// True once a full validation has run.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn check(&self, spec: &FieldSpec, values: &FormValues) -> ValidationFieldState {
        let value = values.get(spec.id.name()).map(String::as_str).unwrap_or_default();
        let messages = spec.rules.iter().filter_map(|rule| rule.check(value)).collect();
        ValidationFieldState::from_messages(messages)
    }

    /// Validate every field, reporting each one to `observer`.
    pub fn validate_all(&mut self, values: &FormValues, observer: &mut dyn ValidationObserver) -> bool {
        self.armed = true;
        let mut passed = true;
        for spec in &self.fields {
            let state = self.check(spec, values);
            if state.is_passing() {
                observer.on_field_success(&spec.id);
            } else {
                passed = false;
                observer.on_field_error(&spec.id, &state);
            }
        }
        passed
    }

    /// Re-validate one edited field. Returns `None` before the first full
    /// validation or for unknown fields.
    pub fn validate_field(
        &self,
        name: &str,
        values: &FormValues,
        observer: &mut dyn ValidationObserver,
    ) -> Option<bool> {
        if !self.armed {
            return None;
        }
        let spec = self.field(name)?;
        let state = self.check(spec, values);
        if state.is_passing() {
            observer.on_field_success(&spec.id);
            Some(true)
        } else {
            observer.on_field_error(&spec.id, &state);
            Some(false)
        }
    }
}
