//! Send pipeline: validate, check the server, render once, deliver to each
//! recipient in turn and report.

use std::sync::Arc;

use lettre::Address;
use lettre::message::Mailbox;
use tracing::{info, warn};

use super::address::validate_recipients;
use super::report::{DeliveryReport, DeliveryResult};
use super::transport::{MailTransport, OutgoingMessage};
use crate::compose::render;
use crate::error::{ConfigError, Error, ValidationError};

/// Longest subject accepted for sending.
pub const MAX_SUBJECT_CHARS: usize = 200;

/// Display name used when a request names no sender.
pub const DEFAULT_SENDER_NAME: &str = "AI Email Assistant";

/// A request to send one email to a list of recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub sender_name: Option<String>,
}

pub struct EmailOrchestrator {
    transport: Arc<dyn MailTransport>,
    from_address: Address,
    default_sender_name: String,
}

impl EmailOrchestrator {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        from_address: &str,
        default_sender_name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let from_address =
            from_address
                .trim()
                .parse::<Address>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "SMTP_FROM_ADDRESS".to_string(),
                    message: e.to_string(),
                })?;
        let default_sender_name = default_sender_name.into();
        Ok(Self {
            transport,
            from_address,
            default_sender_name: if default_sender_name.trim().is_empty() {
                DEFAULT_SENDER_NAME.to_string()
            } else {
                default_sender_name
            },
        })
    }

    /// Send `request.body` to every recipient.
    ///
    /// Validation and connectivity failures abort before anything is sent.
    /// Per-recipient failures are recorded in the report and never abort
    /// the remaining deliveries.
    pub async fn send_email(&self, request: SendRequest) -> Result<DeliveryReport, Error> {
        let recipients = validate_recipients(&request.recipients)?;
        let subject = validate_subject(&request.subject)?;

        self.transport.verify_connectivity().await.inspect_err(|e| {
            warn!(transport = self.transport.name(), error = %e, "Mail server check failed");
        })?;

        let rendered = render(&request.body);
        let from = Mailbox::new(
            Some(self.sender_name(request.sender_name.as_deref())),
            self.from_address.clone(),
        );

        let mut results = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let message = OutgoingMessage {
                from: from.clone(),
                to: recipient.clone(),
                subject: subject.clone(),
                html: rendered.html.clone(),
                text: rendered.text.clone(),
            };

            match self.transport.deliver(&message).await {
                Ok(receipt) => {
                    info!(recipient = %recipient, message_id = %receipt.message_id, "Email sent");
                    results.push(DeliveryResult::sent(recipient, receipt.message_id));
                }
                Err(e) => {
                    warn!(recipient = %recipient, error = %e, "Email delivery failed");
                    results.push(DeliveryResult::failed(recipient, e.to_string()));
                }
            }
        }

        let report = DeliveryReport::from_results(results);
        info!(
            total = report.total_recipients,
            successful = report.successful,
            failed = report.failed,
            "Send complete"
        );
        Ok(report)
    }

    fn sender_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(self.default_sender_name.as_str())
            .chars()
            .filter(|c| *c != '\r' && *c != '\n')
            .collect()
    }
}

fn validate_subject(subject: &str) -> Result<String, ValidationError> {
    let subject = subject.trim();
    if subject.is_empty() {
        return Err(ValidationError::EmptySubject);
    }
    if subject.chars().count() > MAX_SUBJECT_CHARS {
        return Err(ValidationError::InvalidField {
            field: "subject".to_string(),
            reason: format!("must be at most {MAX_SUBJECT_CHARS} characters"),
        });
    }
    Ok(subject.to_string())
}
