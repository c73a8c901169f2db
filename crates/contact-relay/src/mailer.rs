//! Mail delivery
//!
//! [`Mailer`] is the seam between the request pipeline and the network.
//! [`SmtpMailer`] opens one SMTP session per call and never retries.

use lettre::Message;
use std::future::Future;
use tracing::{debug, info, instrument};

use crate::error::DeliveryError;
use crate::transport::{within, Route, Timeouts};

/// Sends a composed message over a route
pub trait Mailer: Send + Sync {
    fn send(
        &self,
        route: &Route,
        message: Message,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// lettre-backed SMTP mailer
#[derive(Debug, Clone, Default)]
pub struct SmtpMailer {
    timeouts: Timeouts,
}

impl SmtpMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeouts(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }
}

impl Mailer for SmtpMailer {
    #[instrument(skip(self, route, message), fields(host = %route.host(), port = route.port(), authenticated = route.is_authenticated()))]
    async fn send(&self, route: &Route, message: Message) -> Result<(), DeliveryError> {
        let envelope = message.envelope().clone();
        let raw = message.formatted();

        let mut connection = route.open(&self.timeouts).await?;
        let response = within(
            "send",
            self.timeouts.socket,
            connection.send(&envelope, &raw),
        )
        .await?;
        info!(code = %response.code(), "Email accepted by SMTP server");

        // Already delivered; a slow or failed QUIT does not change the outcome
        if let Err(e) = within("quit", self.timeouts.socket, connection.quit()).await {
            debug!(error = %e, "QUIT failed after delivery");
        }
        Ok(())
    }
}
