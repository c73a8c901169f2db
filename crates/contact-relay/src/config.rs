//! Relay configuration
//!
//! Configuration is read through a [`ConfigSource`] on every request so the
//! handler never caches process-wide state and tests never have to touch the
//! real environment.

use std::collections::HashMap;
use tracing::warn;

pub const DEFAULT_SMTP_HOST: &str = "smtp.ionos.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_CONTACT_TO: &str = "info@linszorgt.nl";
pub const DEFAULT_DIRECT_FROM: &str = "formulier@mailer.local";
/// IONOS MX over IPv6, accepts mail for the contact domain without auth
pub const DEFAULT_DIRECT_SMTP_HOST: &str = "2a01:238:20a:202:50f0::2097";
pub const DEFAULT_DIRECT_SMTP_PORT: u16 = 25;
/// EHLO identity announced on the direct route
pub const DIRECT_CLIENT_NAME: &str = "linszorgt.nl";

/// Read-only key/value lookup for configuration
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// Which fields and settings a request must satisfy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Reject submissions without a name
    pub require_name: bool,

    /// Reject submissions without a valid email address
    pub require_email: bool,

    /// Fail with a configuration error instead of falling back to direct delivery
    pub require_smtp_auth: bool,
}

/// Configuration for one request
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,

    /// Recipient of every submission
    pub contact_to: String,

    /// Overrides the from address on both routes
    pub contact_from: Option<String>,

    pub direct_host: String,
    pub direct_port: u16,

    pub policy: ValidationPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_user: None,
            smtp_pass: None,
            contact_to: DEFAULT_CONTACT_TO.to_string(),
            contact_from: None,
            direct_host: DEFAULT_DIRECT_SMTP_HOST.to_string(),
            direct_port: DEFAULT_DIRECT_SMTP_PORT,
            policy: ValidationPolicy::default(),
        }
    }
}

impl RelayConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self::load(&EnvSource)
    }

    /// Load from any source; blank values count as absent
    pub fn load<S: ConfigSource + ?Sized>(source: &S) -> Self {
        let text = |key: &str| {
            source
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let port = |key: &str, default: u16| match text(key) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(key, value = %raw, default, "Invalid port, using default");
                default
            }),
            None => default,
        };
        let flag = |key: &str| {
            text(key)
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(false)
        };

        Self {
            smtp_host: text("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            smtp_port: port("SMTP_PORT", DEFAULT_SMTP_PORT),
            smtp_user: text("SMTP_USER"),
            smtp_pass: text("SMTP_PASS"),
            contact_to: text("CONTACT_TO").unwrap_or_else(|| DEFAULT_CONTACT_TO.to_string()),
            contact_from: text("CONTACT_FROM"),
            direct_host: text("DIRECT_SMTP_HOST")
                .unwrap_or_else(|| DEFAULT_DIRECT_SMTP_HOST.to_string()),
            direct_port: port("DIRECT_SMTP_PORT", DEFAULT_DIRECT_SMTP_PORT),
            policy: ValidationPolicy {
                require_name: flag("CONTACT_REQUIRE_NAME"),
                require_email: flag("CONTACT_REQUIRE_EMAIL"),
                require_smtp_auth: flag("CONTACT_REQUIRE_SMTP_AUTH"),
            },
        }
    }

    /// Both username and password are configured
    pub fn has_credentials(&self) -> bool {
        self.smtp_user.is_some() && self.smtp_pass.is_some()
    }
}
