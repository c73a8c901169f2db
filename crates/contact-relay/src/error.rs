//! Error types for the contact relay
//!
//! Every error maps to an HTTP status and a public message. Transport details
//! stay in the logs.

use lambda_http::http::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed.";
pub const MISSING_MESSAGE_MESSAGE: &str = "Vul je vraag in.";
pub const MISSING_NAME_MESSAGE: &str = "Vul je naam in.";
pub const INVALID_EMAIL_MESSAGE: &str = "Vul een geldig e-mailadres in.";
pub const CONFIGURATION_MESSAGE: &str =
    "Mailserver is niet geconfigureerd. Zet SMTP_USER en SMTP_PASS in Vercel.";
pub const AUTHENTICATED_FAILURE_MESSAGE: &str =
    "Verzenden mislukt. Controleer SMTP-instellingen of mailboxrechten.";
pub const DIRECT_FAILURE_MESSAGE: &str =
    "Verzenden mislukt via directe mailroute. Zet SMTP_USER en SMTP_PASS in Vercel als fallback.";

/// Missing or invalid form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Missing required field: vraag")]
    MissingMessage,

    #[error("Missing required field: naam")]
    MissingName,

    #[error("Missing or invalid field: email")]
    InvalidEmail,
}

impl InputError {
    pub fn public_message(&self) -> &'static str {
        match self {
            InputError::MissingMessage => MISSING_MESSAGE_MESSAGE,
            InputError::MissingName => MISSING_NAME_MESSAGE,
            InputError::InvalidEmail => INVALID_EMAIL_MESSAGE,
        }
    }
}

/// Failure while building or sending the outgoing email
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Invalid {role} address {address:?}: {reason}")]
    Address {
        role: &'static str,
        address: String,
        reason: String,
    },

    #[error("Failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("TLS setup failed: {0}")]
    Tls(#[source] lettre::transport::smtp::Error),

    #[error("Server does not offer STARTTLS")]
    StartTlsUnavailable,

    #[error("SMTP {stage} failed: {source}")]
    Smtp {
        stage: &'static str,
        #[source]
        source: lettre::transport::smtp::Error,
    },

    #[error("SMTP {stage} timed out after {limit:?}")]
    Timeout {
        stage: &'static str,
        limit: Duration,
    },
}

/// Structured fields logged for a failed delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    pub message: String,
    pub code: &'static str,
    pub response: Option<String>,
    pub response_code: Option<String>,
    /// Session stage that failed: `build`, `tls`, `connect` (greeting and
    /// EHLO), `starttls`, `auth` or `send` (MAIL/RCPT/DATA)
    pub command: &'static str,
}

impl DeliveryError {
    pub fn diagnostics(&self) -> Diagnostics {
        let message = self.to_string();
        match self {
            DeliveryError::Address { .. } => Diagnostics {
                message,
                code: "EENVELOPE",
                response: None,
                response_code: None,
                command: "build",
            },
            DeliveryError::Build(_) => Diagnostics {
                message,
                code: "EMESSAGE",
                response: None,
                response_code: None,
                command: "build",
            },
            DeliveryError::Tls(e) => Diagnostics {
                message,
                code: "ETLS",
                response: None,
                response_code: e.status().map(|c| c.to_string()),
                command: "tls",
            },
            DeliveryError::StartTlsUnavailable => Diagnostics {
                message,
                code: "ETLS",
                response: None,
                response_code: None,
                command: "starttls",
            },
            DeliveryError::Smtp { stage, source: e } => {
                let code = if e.is_timeout() {
                    "ETIMEDOUT"
                } else if e.is_tls() {
                    "ETLS"
                } else if *stage == "auth" && (e.is_permanent() || e.is_transient()) {
                    "EAUTH"
                } else if e.is_permanent() || e.is_transient() {
                    "EPROTOCOL"
                } else if e.is_response() || e.is_client() {
                    "EMESSAGE"
                } else {
                    "ECONNECTION"
                };
                Diagnostics {
                    message,
                    code,
                    response: e.status().map(|_| e.to_string()),
                    response_code: e.status().map(|c| c.to_string()),
                    command: *stage,
                }
            }
            DeliveryError::Timeout { stage, .. } => Diagnostics {
                message,
                code: "ETIMEDOUT",
                response: None,
                response_code: None,
                command: *stage,
            },
        }
    }
}

/// Request-level failure
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Invalid submission: {0}")]
    Input(#[from] InputError),

    #[error("SMTP credentials are not configured")]
    Configuration,

    #[error("Delivery failed (authenticated: {authenticated}): {source}")]
    Delivery {
        authenticated: bool,
        #[source]
        source: DeliveryError,
    },
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::Input(_) => StatusCode::BAD_REQUEST,
            RelayError::Configuration | RelayError::Delivery { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the client
    pub fn public_message(&self) -> &'static str {
        match self {
            RelayError::MethodNotAllowed(_) => METHOD_NOT_ALLOWED_MESSAGE,
            RelayError::Input(e) => e.public_message(),
            RelayError::Configuration => CONFIGURATION_MESSAGE,
            RelayError::Delivery {
                authenticated: true,
                ..
            } => AUTHENTICATED_FAILURE_MESSAGE,
            RelayError::Delivery {
                authenticated: false,
                ..
            } => DIRECT_FAILURE_MESSAGE,
        }
    }

    pub fn log(&self) {
        match self {
            RelayError::MethodNotAllowed(method) => {
                warn!(method = %method, "Rejected non-POST request");
            }
            RelayError::Input(e) => {
                warn!(error = %e, "Rejected contact form submission");
            }
            RelayError::Configuration => {
                error!("SMTP_USER and SMTP_PASS are required but not configured");
            }
            RelayError::Delivery {
                authenticated,
                source,
            } => {
                let d = source.diagnostics();
                error!(
                    authenticated,
                    message = %d.message,
                    code = d.code,
                    response = ?d.response,
                    response_code = ?d.response_code,
                    command = d.command,
                    "contact form send failed"
                );
            }
        }
    }
}
