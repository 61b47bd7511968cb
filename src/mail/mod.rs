//! Mail delivery: address validation, the transport port, SMTP and the
//! per-recipient send orchestration.

pub mod address;
pub mod orchestrator;
pub mod report;
pub mod smtp;
pub mod transport;

pub use address::{AddressCheck, MAX_RECIPIENTS, check_addresses, is_valid_email, validate_recipients};
pub use orchestrator::{DEFAULT_SENDER_NAME, EmailOrchestrator, MAX_SUBJECT_CHARS, SendRequest};
pub use report::{DeliveryReport, DeliveryResult, DeliveryStatus};
pub use smtp::{SmtpConfig, SmtpMailer};
pub use transport::{DeliveryReceipt, MailTransport, OutgoingMessage};
