//! SMTP transport via lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use uuid::Uuid;

use super::transport::{DeliveryReceipt, MailTransport, OutgoingMessage};
use crate::error::TransportError;

/// SMTP connection settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Address every message is sent from.
    pub from_address: String,
    /// Display name used when a send request names none.
    pub from_name: String,
    /// STARTTLS when true, plaintext otherwise (local relays, test servers).
    pub tls: bool,
    pub timeout: Duration,
}

/// lettre-backed [`MailTransport`].
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, TransportError> {
        info!(
            host = %config.host,
            port = config.port,
            tls = config.tls,
            from = %config.from_address,
            "SMTP init"
        );

        let builder = if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host).map_err(|e| {
                TransportError::Connection {
                    reason: format!("invalid relay host {}: {e}", config.host),
                }
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port).timeout(Some(config.timeout));
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            mailer: builder.build(),
            host: config.host.clone(),
        })
    }

    /// Build the MIME message. Kept apart from I/O so it can be tested.
    fn build_message(message: &OutgoingMessage) -> Result<(Message, String), TransportError> {
        // Strip CR/LF to prevent header injection
        let mut subject = message.subject.clone();
        subject.retain(|c| c != '\r' && c != '\n');

        let to: Mailbox = message
            .to
            .trim()
            .parse()
            .map_err(|e| TransportError::InvalidMessage {
                reason: format!("Invalid to address {}: {e}", message.to),
            })?;

        let message_id = format!("<{}@{}>", Uuid::new_v4(), message.from.email.domain());

        let email = Message::builder()
            .from(message.from.clone())
            .to(to)
            .subject(subject)
            .message_id(Some(message_id.clone()))
            .multipart(MultiPart::alternative_plain_html(
                message.text.clone(),
                message.html.clone(),
            ))
            .map_err(|e| TransportError::InvalidMessage {
                reason: format!("Failed to build email: {e}"),
            })?;

        Ok((email, message_id))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn verify_connectivity(&self) -> Result<(), TransportError> {
        match self.mailer.test_connection().await {
            Ok(true) => {
                debug!(host = %self.host, "SMTP connectivity verified");
                Ok(())
            }
            Ok(false) => Err(TransportError::Connection {
                reason: format!("{} did not accept the connection", self.host),
            }),
            Err(e) => Err(classify_smtp_error(&e)),
        }
    }

    async fn deliver(&self, message: &OutgoingMessage) -> Result<DeliveryReceipt, TransportError> {
        let (email, message_id) = Self::build_message(message)?;
        self.mailer
            .send(email)
            .await
            .map_err(|e| classify_smtp_error(&e))?;
        Ok(DeliveryReceipt { message_id })
    }
}

fn classify_smtp_error(err: &lettre::transport::smtp::Error) -> TransportError {
    let code = err.status().map(|c| c.to_string());
    classify_smtp_failure(code.as_deref(), err.is_client(), err.to_string())
}

/// Map an SMTP failure onto authentication / connection / other.
///
/// `code` is the server's reply code, absent when no reply was received.
fn classify_smtp_failure(code: Option<&str>, is_client: bool, reason: String) -> TransportError {
    match code {
        Some(c) if c.starts_with("53") => TransportError::AuthFailed { reason },
        Some("421") => TransportError::Connection { reason },
        Some(_) => TransportError::SendFailed { reason },
        None if is_client => TransportError::SendFailed { reason },
        None => TransportError::Connection { reason },
    }
}
