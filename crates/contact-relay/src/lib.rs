//! Contact Relay Lambda - contact form submissions relayed over SMTP
//!
//! Accepts a JSON contact form POST, sanitizes the fields, and forwards the
//! submission as a plaintext email to a fixed recipient.
//!
//! ## Delivery routes
//!
//! - **Authenticated**: `SMTP_USER` and `SMTP_PASS` are set. Submission relay
//!   with STARTTLS (or implicit TLS on port 465) and credentials.
//! - **Direct**: credentials absent. Plaintext, unauthenticated delivery
//!   straight to the recipient's mail exchanger.
//!
//! ## Spam
//!
//! The hidden `honey` field is a honeypot. When it is filled in the request is
//! answered with success and nothing is sent.
//!
//! ## Architecture
//!
//! ```text
//! Browser → Function URL / API Gateway → Lambda (this) → SMTP → Recipient
//! ```
//!
//! ## Environment
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SMTP_HOST` | `smtp.ionos.com` |
//! | `SMTP_PORT` | `587` |
//! | `SMTP_USER` / `SMTP_PASS` | unset (direct route) |
//! | `CONTACT_TO` | `info@linszorgt.nl` |
//! | `CONTACT_FROM` | SMTP user, or `formulier@mailer.local` on the direct route |
//! | `DIRECT_SMTP_HOST` | `2a01:238:20a:202:50f0::2097` |
//! | `DIRECT_SMTP_PORT` | `25` |
//! | `CONTACT_REQUIRE_NAME` | `false` |
//! | `CONTACT_REQUIRE_EMAIL` | `false` |
//! | `CONTACT_REQUIRE_SMTP_AUTH` | `false` |

pub mod config;
pub mod error;
pub mod mailer;
pub mod message;
pub mod relay;
pub mod submission;
pub mod transport;

pub use config::{ConfigSource, EnvSource, RelayConfig, ValidationPolicy};
pub use error::{DeliveryError, InputError, RelayError};
pub use mailer::{Mailer, SmtpMailer};
pub use relay::{ContactRelay, RelayResult};
pub use submission::Submission;
pub use transport::{Route, Timeouts};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
