//! Error types for the mailer service.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Bad input shape or addresses. Always raised before any external call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("At least one recipient is required")]
    NoRecipients,

    #[error("Invalid email address(es): {}", .0.join(", "))]
    InvalidRecipients(Vec<String>),

    #[error("Too many recipients: {count} (max {max})")]
    TooManyRecipients { count: usize, max: usize },

    #[error("Subject must not be empty")]
    EmptySubject,

    #[error("Field {field} is invalid: {reason}")]
    InvalidField { field: String, reason: String },
}

impl ValidationError {
    /// The offending entries, for the `details` part of an API error.
    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::InvalidRecipients(invalid) => serde_json::json!({ "invalidEmails": invalid }),
            Self::TooManyRecipients { count, max } => {
                serde_json::json!({ "count": count, "max": max })
            }
            Self::InvalidField { field, reason } => {
                serde_json::json!({ "field": field, "reason": reason })
            }
            Self::NoRecipients => serde_json::json!({ "field": "recipients" }),
            Self::EmptySubject => serde_json::json!({ "field": "subject" }),
        }
    }
}

/// Coarse classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    QuotaExceeded,
    InvalidCredential,
    Other,
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} quota exceeded: {reason}")]
    QuotaExceeded { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl LlmError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::QuotaExceeded { .. } => ProviderErrorKind::QuotaExceeded,
            Self::AuthFailed { .. } => ProviderErrorKind::InvalidCredential,
            Self::RequestFailed { .. } | Self::InvalidResponse { .. } => ProviderErrorKind::Other,
        }
    }

    /// Message safe to show to an API caller.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ProviderErrorKind::QuotaExceeded => {
                "AI service quota exceeded. Please try again later."
            }
            ProviderErrorKind::InvalidCredential => {
                "AI service is not configured correctly (invalid API key)."
            }
            ProviderErrorKind::Other => "Failed to generate email content.",
        }
    }
}

/// Coarse classification of an SMTP failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Authentication,
    Connection,
    Other,
}

/// Mail transport errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("SMTP authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("SMTP server unreachable: {reason}")]
    Connection { reason: String },

    #[error("Failed to build message: {reason}")]
    InvalidMessage { reason: String },

    #[error("SMTP send failed: {reason}")]
    SendFailed { reason: String },
}

impl TransportError {
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::AuthFailed { .. } => TransportErrorKind::Authentication,
            Self::Connection { .. } => TransportErrorKind::Connection,
            Self::InvalidMessage { .. } | Self::SendFailed { .. } => TransportErrorKind::Other,
        }
    }

    /// Message safe to show to an API caller.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            TransportErrorKind::Authentication => {
                "Email service authentication failed. Check SMTP credentials."
            }
            TransportErrorKind::Connection => "Could not connect to the email server.",
            TransportErrorKind::Other => "Failed to send email.",
        }
    }
}
