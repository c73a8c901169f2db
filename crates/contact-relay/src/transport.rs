//! SMTP route selection
//!
//! A submission goes out through exactly one of two routes: the authenticated
//! relay when credentials are configured, or straight to the recipient's mail
//! exchanger when they are not.
//!
//! Sessions are driven stage by stage so every server reply is read under a
//! limit: connect, greeting and EHLO under connection + greeting, then each
//! later command under the socket limit.

use lettre::transport::smtp::{
    authentication::{Credentials, Mechanism},
    client::{AsyncSmtpConnection, TlsParameters},
    extension::ClientId,
};
use std::future::Future;
use std::time::Duration;

use crate::config::{RelayConfig, DEFAULT_DIRECT_FROM, DIRECT_CLIENT_NAME};
use crate::error::DeliveryError;

/// Display name on the from mailbox
pub const FROM_NAME: &str = "LinsZorgt formulier";

/// Per-stage limits for one SMTP session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connection: Duration,
    pub greeting: Duration,
    pub socket: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connection: Duration::from_secs(10),
            greeting: Duration::from_secs(10),
            socket: Duration::from_secs(15),
        }
    }
}

impl Timeouts {
    /// Budget for TCP connect, server greeting and EHLO
    pub fn handshake(&self) -> Duration {
        self.connection + self.greeting
    }
}

/// Where and how the email is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Submission relay with username/password and TLS
    Authenticated {
        host: String,
        port: u16,
        user: String,
        pass: String,
    },

    /// Unauthenticated plaintext delivery to the recipient's MX
    Direct {
        host: String,
        port: u16,
        client_name: String,
    },
}

impl Route {
    /// Pick the route for the current configuration
    pub fn select(config: &RelayConfig) -> Self {
        match (&config.smtp_user, &config.smtp_pass) {
            (Some(user), Some(pass)) => Route::Authenticated {
                host: config.smtp_host.clone(),
                port: config.smtp_port,
                user: user.clone(),
                pass: pass.clone(),
            },
            _ => Route::Direct {
                host: config.direct_host.clone(),
                port: config.direct_port,
                client_name: DIRECT_CLIENT_NAME.to_string(),
            },
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Route::Authenticated { .. })
    }

    /// Implicit TLS (SMTPS) instead of STARTTLS
    pub fn is_secure(&self) -> bool {
        matches!(self, Route::Authenticated { port: 465, .. })
    }

    pub fn host(&self) -> &str {
        match self {
            Route::Authenticated { host, .. } | Route::Direct { host, .. } => host,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Route::Authenticated { port, .. } | Route::Direct { port, .. } => *port,
        }
    }

    /// Envelope sender address for this route
    pub fn from_address(&self, config: &RelayConfig) -> String {
        if let Some(from) = &config.contact_from {
            return from.clone();
        }
        match self {
            Route::Authenticated { user, .. } => user.clone(),
            Route::Direct { .. } => DEFAULT_DIRECT_FROM.to_string(),
        }
    }

    /// Open an SMTP session ready for `MAIL FROM`
    ///
    /// Connect, greeting and EHLO share the connection + greeting budget;
    /// STARTTLS and AUTH each get the socket budget.
    pub async fn open(&self, timeouts: &Timeouts) -> Result<AsyncSmtpConnection, DeliveryError> {
        match self {
            Route::Authenticated {
                host,
                port,
                user,
                pass,
            } => {
                let hello_name = ClientId::default();
                let tls_parameters =
                    TlsParameters::new(host.clone()).map_err(DeliveryError::Tls)?;

                let implicit_tls = self.is_secure().then(|| tls_parameters.clone());
                let mut connection = within(
                    "connect",
                    timeouts.handshake(),
                    AsyncSmtpConnection::connect_tokio1(
                        (host.as_str(), *port),
                        Some(timeouts.connection),
                        &hello_name,
                        implicit_tls,
                        None,
                    ),
                )
                .await?;

                if !self.is_secure() {
                    if !connection.can_starttls() {
                        return Err(DeliveryError::StartTlsUnavailable);
                    }
                    within(
                        "starttls",
                        timeouts.socket,
                        connection.starttls(tls_parameters, &hello_name),
                    )
                    .await?;
                }

                let credentials = Credentials::new(user.clone(), pass.clone());
                within(
                    "auth",
                    timeouts.socket,
                    connection.auth(&[Mechanism::Plain, Mechanism::Login], &credentials),
                )
                .await?;

                Ok(connection)
            }
            Route::Direct {
                host,
                port,
                client_name,
            } => {
                within(
                    "connect",
                    timeouts.handshake(),
                    AsyncSmtpConnection::connect_tokio1(
                        (host.as_str(), *port),
                        Some(timeouts.connection),
                        &ClientId::Domain(client_name.clone()),
                        None,
                        None,
                    ),
                )
                .await
            }
        }
    }
}

/// Run one SMTP stage under `limit`
pub(crate) async fn within<T>(
    stage: &'static str,
    limit: Duration,
    step: impl Future<Output = Result<T, lettre::transport::smtp::Error>>,
) -> Result<T, DeliveryError> {
    tokio::time::timeout(limit, step)
        .await
        .map_err(|_| DeliveryError::Timeout { stage, limit })?
        .map_err(|source| DeliveryError::Smtp { stage, source })
}
