//! Contact form submission parsing and sanitization
//!
//! Every field goes through the same steps: coerce to text, trim, truncate.
//! The email field is additionally shape-checked and blanked when it does not
//! look like `local@domain.tld`.
//!
//! Whitespace means the ECMAScript set (`String.prototype.trim`, regex `\s`),
//! which differs from [`char::is_whitespace`]: it includes U+FEFF and excludes
//! U+0085.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::config::ValidationPolicy;
use crate::error::InputError;

pub const MAX_NAME: usize = 120;
pub const MAX_EMAIL: usize = 254;
pub const MAX_MESSAGE: usize = 4000;
pub const MAX_HONEYPOT: usize = 200;

/// Regex class body for the ECMAScript whitespace set
const WHITESPACE_CLASS: &str =
    r"\t\n\x0B\x0C\r \x{A0}\x{1680}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}\x{FEFF}";

lazy_static! {
    static ref EMAIL_SHAPE: Regex = Regex::new(&format!(
        "^[^{ws}@]+@[^{ws}@]+\\.[^{ws}@]+$",
        ws = WHITESPACE_CLASS
    ))
    .unwrap();
}

/// ECMAScript whitespace, stripped from both ends of every field
pub fn is_form_whitespace(c: char) -> bool {
    match c {
        '\u{FEFF}' => true,
        '\u{0085}' => false,
        c => c.is_whitespace(),
    }
}

/// Sanitized contact form fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    /// `naam`
    pub name: String,

    /// `email`, empty unless it has a valid shape
    pub email: String,

    /// `vraag`
    pub message: String,

    /// `honey`, hidden from humans
    pub honeypot: String,
}

impl Submission {
    /// Parse a raw request body; anything that is not a JSON object yields an
    /// empty submission
    pub fn from_body(body: &[u8]) -> Self {
        Self::from_value(&parse_body(body))
    }

    /// Build from an already-parsed JSON value
    pub fn from_value(value: &Value) -> Self {
        let field = |key: &str| value.get(key);

        Self {
            name: as_text(field("naam"), MAX_NAME),
            email: as_email(field("email")),
            message: as_text(field("vraag"), MAX_MESSAGE),
            honeypot: as_text(field("honey"), MAX_HONEYPOT),
        }
    }

    /// Presumed bot submission
    pub fn is_spam(&self) -> bool {
        !self.honeypot.is_empty()
    }

    /// Check required fields, stopping at the first missing one
    pub fn validate(&self, policy: &ValidationPolicy) -> Result<(), InputError> {
        if self.message.is_empty() {
            return Err(InputError::MissingMessage);
        }
        if policy.require_name && self.name.is_empty() {
            return Err(InputError::MissingName);
        }
        if policy.require_email && self.email.is_empty() {
            return Err(InputError::InvalidEmail);
        }
        Ok(())
    }
}

/// Decode a JSON body; empty or malformed input becomes an empty object
pub fn parse_body(body: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::Object(Default::default()),
    }
}

/// Coerce, trim and truncate to `max_len` characters
pub fn as_text(value: Option<&Value>, max_len: usize) -> String {
    match value {
        Some(Value::String(s)) => s
            .trim_matches(is_form_whitespace)
            .chars()
            .take(max_len)
            .collect(),
        _ => String::new(),
    }
}

/// Sanitized email, or empty when the shape check fails
pub fn as_email(value: Option<&Value>) -> String {
    let email = as_text(value, MAX_EMAIL);
    if is_valid_email(&email) {
        email
    } else {
        String::new()
    }
}

/// `local@domain.tld` with no whitespace and a single `@`
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email)
}
