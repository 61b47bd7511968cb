use async_trait::async_trait;
use lettre::message::Mailbox;

use crate::error::TransportError;

/// A fully rendered message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: Mailbox,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// What the transport hands back for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: String,
}

/// Port for delivering mail.
///
/// Implementations must be `Send + Sync` so a single handle can be shared
/// across requests behind an `Arc`. Recipient validation is not their
/// concern; callers validate before delivering.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Check the server is reachable and accepts our credentials.
    async fn verify_connectivity(&self) -> Result<(), TransportError>;

    /// Deliver one message to its single recipient.
    async fn deliver(&self, message: &OutgoingMessage) -> Result<DeliveryReceipt, TransportError>;
}
