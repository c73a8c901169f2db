//! AWS Lambda handler for the contact relay
//!
//! Handles `POST` with a JSON contact form body. Every other method gets a
//! `405` with `Allow: POST`.
//!
//! ## Deployment
//!
//! ```bash
//! # Install cargo-lambda
//! cargo install cargo-lambda
//!
//! # Build for ARM64
//! cargo lambda build --release --arm64
//!
//! # Deploy
//! cargo lambda deploy --iam-role arn:aws:iam::ACCOUNT:role/contact-relay-lambda
//! ```

use contact_relay::{ContactRelay, EnvSource, SmtpMailer};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Local runs only; Lambda provides the environment
    dotenvy::dotenv().ok();

    // CloudWatch-optimized logging
    tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_current_span(false)
        .without_time()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("contact_relay=info".parse()?),
        )
        .init();

    info!(
        version = contact_relay::VERSION,
        "Starting contact relay Lambda"
    );

    // Configuration is re-read from the environment on every request
    let relay = ContactRelay::new(EnvSource, SmtpMailer::new());
    let relay = &relay;

    run(service_fn(move |event: Request| async move {
        handler(relay, event).await
    }))
    .await
}

async fn handler(
    relay: &ContactRelay<EnvSource, SmtpMailer>,
    event: Request,
) -> Result<Response<Body>, Error> {
    let result = relay.handle(event.method(), event.body().as_ref()).await;
    Ok(result.into_response())
}
