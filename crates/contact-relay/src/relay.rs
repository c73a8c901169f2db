//! Contact form request pipeline
//!
//! method check → parse → sanitize → honeypot → required fields →
//! configuration → route → compose → send

use lambda_http::{http::Method, http::StatusCode, Body, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::config::{ConfigSource, RelayConfig};
use crate::error::RelayError;
use crate::mailer::Mailer;
use crate::message::compose;
use crate::submission::{parse_body, Submission};
use crate::transport::Route;

/// JSON response body plus HTTP status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip)]
    pub status: u16,
}

impl RelayResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            status: StatusCode::OK.as_u16(),
        }
    }

    pub fn is_method_not_allowed(&self) -> bool {
        self.status == StatusCode::METHOD_NOT_ALLOWED.as_u16()
    }

    /// Convert into a Lambda HTTP response
    pub fn into_response(self) -> Response<Body> {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = Response::builder()
            .status(status)
            .header("Content-Type", "application/json");
        if self.is_method_not_allowed() {
            builder = builder.header("Allow", "POST");
        }

        let body = serde_json::to_string(&self)
            .unwrap_or_else(|_| r#"{"success":false}"#.to_string());
        builder
            .body(Body::from(body))
            .unwrap_or_else(|_| Response::new(Body::Empty))
    }
}

impl From<RelayError> for RelayResult {
    fn from(error: RelayError) -> Self {
        Self {
            success: false,
            message: Some(error.public_message().to_string()),
            status: error.status().as_u16(),
        }
    }
}

/// Validates contact form submissions and relays them by email
pub struct ContactRelay<S, M> {
    config: S,
    mailer: M,
}

impl<S: ConfigSource, M: Mailer> ContactRelay<S, M> {
    pub fn new(config: S, mailer: M) -> Self {
        Self { config, mailer }
    }

    #[cfg(test)]
    pub(crate) fn mailer(&self) -> &M {
        &self.mailer
    }

    /// Handle one request given its method and raw body
    #[instrument(skip(self, body), fields(method = %method, body_len = body.len()))]
    pub async fn handle(&self, method: &Method, body: &[u8]) -> RelayResult {
        if *method != Method::POST {
            let error = RelayError::MethodNotAllowed(method.to_string());
            error.log();
            return error.into();
        }
        self.handle_value(&parse_body(body)).await
    }

    /// Handle an already-parsed POST body
    pub async fn handle_value(&self, body: &Value) -> RelayResult {
        match self.process(Submission::from_value(body)).await {
            Ok(()) => RelayResult::ok(),
            Err(error) => {
                error.log();
                error.into()
            }
        }
    }

    async fn process(&self, submission: Submission) -> Result<(), RelayError> {
        // Accept silently so bots cannot tell they were caught
        if submission.is_spam() {
            info!("Honeypot filled, dropping submission");
            return Ok(());
        }

        let config = RelayConfig::load(&self.config);
        submission.validate(&config.policy)?;

        if config.policy.require_smtp_auth && !config.has_credentials() {
            return Err(RelayError::Configuration);
        }

        let route = Route::select(&config);
        let authenticated = route.is_authenticated();
        let delivery = |source| RelayError::Delivery {
            authenticated,
            source,
        };

        let message = compose(
            &submission,
            &route.from_address(&config),
            &config.contact_to,
        )
        .map_err(delivery)?;

        self.mailer.send(&route, message).await.map_err(delivery)?;

        info!(authenticated, "Contact form submission relayed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{
        DeliveryError, InputError, AUTHENTICATED_FAILURE_MESSAGE, CONFIGURATION_MESSAGE,
        DIRECT_FAILURE_MESSAGE,
    };
    use lettre::Message;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records sends instead of talking to a server
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(Route, String)>>,
        fail: bool,
    }

    impl RecordingMailer {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<(Route, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Mailer for RecordingMailer {
        async fn send(&self, route: &Route, message: Message) -> Result<(), DeliveryError> {
            let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
            self.sent.lock().unwrap().push((route.clone(), raw));
            if self.fail {
                Err(DeliveryError::Timeout {
                    stage: "send",
                    limit: Duration::from_secs(15),
                })
            } else {
                Ok(())
            }
        }
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn relay(pairs: &[(&str, &str)]) -> ContactRelay<HashMap<String, String>, RecordingMailer> {
        ContactRelay::new(env(pairs), RecordingMailer::default())
    }

    const JAN: &[u8] = br#"{"naam":"Jan","email":"jan@example.com","vraag":"Hallo"}"#;

    #[tokio::test]
    async fn test_rejects_non_post() {
        let relay = relay(&[]);
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let result = relay.handle(&method, JAN).await;
            assert_eq!(result.status, 405);
            assert!(!result.success);
            assert_eq!(result.message.as_deref(), Some("Method not allowed."));

            let response = result.into_response();
            assert_eq!(response.headers().get("Allow").unwrap(), "POST");
        }
        assert!(relay.mailer().sent().is_empty());
    }

    #[tokio::test]
    async fn test_valid_submission_is_sent() {
        let relay = relay(&[]);
        let result = relay.handle(&Method::POST, JAN).await;
        assert_eq!(result, RelayResult::ok());

        let sent = relay.mailer().sent();
        assert_eq!(sent.len(), 1);
        let (route, raw) = &sent[0];
        assert!(!route.is_authenticated());

        let name = raw.find("Naam: Jan").unwrap();
        let email = raw.find("E-mail: jan@example.com").unwrap();
        let question = raw.find("Hallo").unwrap();
        assert!(name < email && email < question);
    }

    #[tokio::test]
    async fn test_honeypot_accepts_without_sending() {
        let relay = relay(&[]);
        let result = relay
            .handle(&Method::POST, br#"{"vraag":"","honey":"gotcha"}"#)
            .await;
        assert_eq!(result, RelayResult::ok());
        assert!(relay.mailer().sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_message() {
        let relay = relay(&[]);
        let result = relay
            .handle(&Method::POST, br#"{"naam":"Jan","vraag":"   "}"#)
            .await;
        assert_eq!(result.status, 400);
        assert_eq!(result.message.as_deref(), Some("Vul je vraag in."));
        assert!(relay.mailer().sent().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_failure() {
        let relay = relay(&[]);
        let result = relay.handle(&Method::POST, b"{{{").await;
        assert_eq!(result.status, 400);
        assert_eq!(result.message.as_deref(), Some("Vul je vraag in."));
    }

    #[tokio::test]
    async fn test_permissive_allows_blank_name_and_email() {
        let relay = relay(&[]);
        let result = relay
            .handle(&Method::POST, br#"{"email":"nope","vraag":"Hallo"}"#)
            .await;
        assert_eq!(result, RelayResult::ok());

        let (_, raw) = &relay.mailer().sent()[0];
        assert!(raw.contains("Naam: (niet ingevuld)"));
        assert!(raw.contains("E-mail: (niet ingevuld)"));
        assert!(!raw.contains("Reply-To"));
    }

    #[tokio::test]
    async fn test_strict_requires_name_then_email() {
        let relay = relay(&[
            ("CONTACT_REQUIRE_NAME", "true"),
            ("CONTACT_REQUIRE_EMAIL", "true"),
        ]);

        let result = relay.handle(&Method::POST, br#"{"vraag":"Hallo"}"#).await;
        assert_eq!(result.message.as_deref(), Some("Vul je naam in."));

        let result = relay
            .handle(&Method::POST, br#"{"naam":"Jan","email":"user@","vraag":"Hallo"}"#)
            .await;
        assert_eq!(result.status, 400);
        assert_eq!(
            result.message.as_deref(),
            Some("Vul een geldig e-mailadres in.")
        );
        assert!(relay.mailer().sent().is_empty());
    }

    #[tokio::test]
    async fn test_strict_missing_credentials_is_configuration_error() {
        let relay = relay(&[("CONTACT_REQUIRE_SMTP_AUTH", "true")]);
        let result = relay.handle(&Method::POST, JAN).await;
        assert_eq!(result.status, 500);
        assert_eq!(result.message.as_deref(), Some(CONFIGURATION_MESSAGE));
        assert!(relay.mailer().sent().is_empty());
    }

    #[tokio::test]
    async fn test_credentials_select_authenticated_route() {
        let relay = relay(&[
            ("SMTP_USER", "mailer@linszorgt.nl"),
            ("SMTP_PASS", "hunter2"),
            ("SMTP_PORT", "465"),
            ("CONTACT_REQUIRE_SMTP_AUTH", "true"),
        ]);
        let result = relay.handle(&Method::POST, JAN).await;
        assert_eq!(result, RelayResult::ok());

        let (route, raw) = &relay.mailer().sent()[0];
        assert!(route.is_authenticated());
        assert!(route.is_secure());
        assert!(raw.contains("<mailer@linszorgt.nl>"));
    }

    #[tokio::test]
    async fn test_delivery_failure_messages() {
        let direct = ContactRelay::new(env(&[]), RecordingMailer::failing());
        let result = direct.handle(&Method::POST, JAN).await;
        assert_eq!(result.status, 500);
        assert_eq!(result.message.as_deref(), Some(DIRECT_FAILURE_MESSAGE));

        let authenticated = ContactRelay::new(
            env(&[("SMTP_USER", "u@linszorgt.nl"), ("SMTP_PASS", "p")]),
            RecordingMailer::failing(),
        );
        let result = authenticated.handle(&Method::POST, JAN).await;
        assert_eq!(result.status, 500);
        assert_eq!(
            result.message.as_deref(),
            Some(AUTHENTICATED_FAILURE_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_invalid_from_override_is_delivery_error() {
        let relay = relay(&[("CONTACT_FROM", "not an address")]);
        let result = relay.handle(&Method::POST, JAN).await;
        assert_eq!(result.status, 500);
        assert_eq!(result.message.as_deref(), Some(DIRECT_FAILURE_MESSAGE));
        assert!(relay.mailer().sent().is_empty());
    }

    #[tokio::test]
    async fn test_handle_value_accepts_parsed_body() {
        let relay = relay(&[]);
        let result = relay
            .handle_value(&json!({ "naam": "Jan", "vraag": "Hallo" }))
            .await;
        assert_eq!(result, RelayResult::ok());
    }

    #[test]
    fn test_response_body_shape() {
        let response = RelayResult::ok().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("Allow").is_none());
        match response.body() {
            Body::Text(text) => assert_eq!(text, r#"{"success":true}"#),
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_error_responses_are_json() {
        for (error, status) in [
            (
                RelayError::from(InputError::MissingMessage),
                StatusCode::BAD_REQUEST,
            ),
            (RelayError::Configuration, StatusCode::INTERNAL_SERVER_ERROR),
        ] {
            let message = error.public_message();
            let response = RelayResult::from(error).into_response();
            assert_eq!(response.status(), status);
            assert_eq!(
                response.headers().get("Content-Type").unwrap(),
                "application/json"
            );
            assert!(response.headers().get("Allow").is_none());
            match response.body() {
                Body::Text(text) => {
                    let body: serde_json::Value = serde_json::from_str(text).unwrap();
                    assert_eq!(body, json!({ "success": false, "message": message }));
                }
                other => panic!("unexpected body: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_delivery_failure_response_is_json() {
        let relay = ContactRelay::new(env(&[]), RecordingMailer::failing());
        let response = relay.handle(&Method::POST, JAN).await.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }
}
