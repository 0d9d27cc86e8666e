//! Contact form parsing, sanitization and validation
//!
//! The request body is read as a JSON object when it parses as one and as
//! `application/x-www-form-urlencoded` otherwise. Every text field is
//! sanitized before validation, so validation and the e-mail templates only
//! ever see escaped text.

use chrono::{DateTime, Local};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]{1,64}@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .unwrap()
});

/// Display labels for the `contactType` select box
const CONTACT_TYPE_LABELS: &[(&str, &str)] = &[
    ("general", "Allgemeine Anfrage"),
    ("consultation", "Beratungswunsch"),
    ("application", "Bewerbung"),
    ("other", "Sonstiges"),
];

/// Unsanitized request fields
#[derive(Debug, Clone, Default)]
pub struct RawSubmission {
    fields: HashMap<String, String>,
    privacy: bool,
}

impl RawSubmission {
    pub fn parse(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => {
                let privacy = map
                    .get("privacy")
                    .is_some_and(|v| !matches!(v, Value::Null | Value::Bool(false)));
                let fields = map
                    .into_iter()
                    .filter_map(|(k, v)| match v {
                        Value::String(s) => Some((k, s)),
                        Value::Number(n) => Some((k, n.to_string())),
                        Value::Bool(b) => Some((k, b.to_string())),
                        _ => None,
                    })
                    .collect();
                Self { fields, privacy }
            }
            _ => {
                // later duplicates win, like a PHP `$_POST` array
                let pairs: Vec<(String, String)> =
                    serde_urlencoded::from_bytes(body).unwrap_or_default();
                let privacy = pairs.iter().any(|(k, _)| k == "privacy");
                Self {
                    fields: pairs.into_iter().collect(),
                    privacy,
                }
            }
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn text(&self, name: &str) -> &str {
        self.field(name).unwrap_or_default()
    }
}

/// Per-field maximum lengths in bytes
#[derive(Debug, Clone, Copy)]
pub struct FieldLimits {
    pub name: usize,
    pub email: usize,
    pub phone: usize,
    pub message: usize,
}

/// Sanitized submission, alive for one request only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub contact_type: String,
    pub message: String,
    /// Hidden `website` field, filled in only by bots
    pub honeypot: String,
    pub privacy: bool,
    pub timestamp: String,
}

impl Submission {
    pub fn from_raw(raw: &RawSubmission, limits: &FieldLimits, now: DateTime<Local>) -> Self {
        Self {
            name: sanitize(raw.text("name"), Some(limits.name)),
            email: sanitize(raw.text("email"), Some(limits.email)),
            phone: sanitize(raw.text("phone"), Some(limits.phone)),
            contact_type: sanitize(raw.text("contactType"), None),
            message: sanitize(raw.text("message"), Some(limits.message)),
            honeypot: sanitize(raw.text("website"), None),
            privacy: raw.privacy,
            timestamp: now.format("%d.%m.%Y %H:%M:%S").to_string(),
        }
    }

    pub fn contact_type_label(&self) -> &str {
        contact_type_label(&self.contact_type)
    }

    /// Check every rule and collect all failures
    pub fn validate(&self, limits: &FieldLimits) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.is_empty() {
            errors.push("Name ist erforderlich");
        } else if self.name.len() > limits.name {
            errors.push("Name ist zu lang");
        }

        if self.email.is_empty() {
            errors.push("E-Mail ist erforderlich");
        } else if !is_valid_email(&self.email) {
            errors.push("Ungültige E-Mail-Adresse");
        } else if self.email.len() > limits.email {
            errors.push("E-Mail-Adresse ist zu lang");
        }

        if self.message.is_empty() {
            errors.push("Nachricht ist erforderlich");
        } else if self.message.len() > limits.message {
            errors.push("Nachricht ist zu lang");
        }

        if self.contact_type.is_empty() {
            errors.push("Kontaktart ist erforderlich");
        }

        if self.phone.len() > limits.phone {
            errors.push("Telefonnummer ist zu lang");
        }

        if !self.honeypot.is_empty() {
            errors.push("Spam erkannt");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into_iter().map(String::from).collect())
        }
    }
}

/// Map a contact type to its display label, falling back to the raw value
pub fn contact_type_label(contact_type: &str) -> &str {
    CONTACT_TYPE_LABELS
        .iter()
        .find(|(key, _)| *key == contact_type)
        .map_or(contact_type, |(_, label)| label)
}

fn is_valid_email(email: &str) -> bool {
    let local = email.split('@').next().unwrap_or_default();
    EMAIL_RE.is_match(email)
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
}

/// Trim, strip backslash escapes, HTML-escape, then truncate to `max_len` bytes
pub fn sanitize(input: &str, max_len: Option<usize>) -> String {
    let unslashed = strip_slashes(input.trim());
    let escaped = html_escape::encode_quoted_attribute(&unslashed);
    match max_len {
        Some(max) => truncate(&escaped, max).trim_end().to_string(),
        None => escaped.into_owned(),
    }
}

/// `\x` becomes `x`, a trailing lone backslash is dropped
fn strip_slashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Cut at a char boundary without leaving a partial `&entity;` behind
fn truncate(input: &str, max: usize) -> &str {
    if input.len() <= max {
        return input;
    }
    let mut end = max;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    let cut = &input[..end];
    match cut.rfind('&') {
        Some(amp) if !cut[amp..].contains(';') => &cut[..amp],
        _ => cut,
    }
}
