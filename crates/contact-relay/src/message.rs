//! Outgoing email composition

use lettre::message::{header::ContentType, Mailbox};
use lettre::{Address, Message};
use tracing::warn;

use crate::error::DeliveryError;
use crate::submission::Submission;
use crate::transport::FROM_NAME;

pub const SUBJECT: &str = "Nieuwe vraag via linszorgt.nl";
pub const NOT_FILLED_IN: &str = "(niet ingevuld)";

/// Plaintext body: header, name, email, separator, message verbatim
pub fn render_body(submission: &Submission) -> String {
    let or_placeholder = |value: &str| {
        if value.is_empty() {
            NOT_FILLED_IN.to_string()
        } else {
            value.to_string()
        }
    };

    [
        SUBJECT.to_string(),
        String::new(),
        format!("Naam: {}", or_placeholder(&submission.name)),
        format!("E-mail: {}", or_placeholder(&submission.email)),
        String::new(),
        "Vraag:".to_string(),
        submission.message.clone(),
    ]
    .join("\n")
}

fn parse_address(role: &'static str, address: &str) -> Result<Address, DeliveryError> {
    address.parse().map_err(|e: lettre::address::AddressError| {
        DeliveryError::Address {
            role,
            address: address.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Build the email sent to the contact address
pub fn compose(submission: &Submission, from: &str, to: &str) -> Result<Message, DeliveryError> {
    let from = Mailbox::new(Some(FROM_NAME.to_string()), parse_address("from", from)?);
    let to = Mailbox::new(None, parse_address("to", to)?);

    let mut builder = Message::builder().from(from).to(to).subject(SUBJECT);

    if !submission.email.is_empty() {
        match submission.email.parse::<Address>() {
            Ok(reply_to) => builder = builder.reply_to(Mailbox::new(None, reply_to)),
            // The shape check is looser than RFC 5322; skip the header instead
            // of losing the submission
            Err(e) => warn!(error = %e, "Omitting unparseable Reply-To address"),
        }
    }

    Ok(builder
        .header(ContentType::TEXT_PLAIN)
        .body(render_body(submission))?)
}
