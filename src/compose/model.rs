//! Draft request and generated email types.

use serde::{Deserialize, Serialize};

/// Subject used when none can be recovered from a model response.
pub const DEFAULT_SUBJECT: &str = "Generated Email";

/// A clean subject/body pair.
///
/// Built by the normalizer, so `subject` is never empty and `body` never
/// carries a serialized `{subject, body}` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedEmail {
    pub subject: String,
    pub body: String,
}

impl GeneratedEmail {
    /// Create an email, falling back to [`DEFAULT_SUBJECT`] for a blank subject.
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        let subject = subject.into();
        let subject = if subject.trim().is_empty() {
            DEFAULT_SUBJECT.to_string()
        } else {
            subject.trim().to_string()
        };
        Self {
            subject,
            body: body.into(),
        }
    }
}

/// Requested tone of the drafted email.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Formal,
    Casual,
    Persuasive,
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Professional => write!(f, "professional"),
            Self::Friendly => write!(f, "friendly"),
            Self::Formal => write!(f, "formal"),
            Self::Casual => write!(f, "casual"),
            Self::Persuasive => write!(f, "persuasive"),
        }
    }
}

/// Kind of email being drafted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailType {
    #[default]
    General,
    Business,
    Marketing,
    #[serde(alias = "follow-up")]
    FollowUp,
    Announcement,
    Invitation,
    #[serde(alias = "thank-you")]
    ThankYou,
}

impl std::fmt::Display for EmailType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::Business => write!(f, "business"),
            Self::Marketing => write!(f, "marketing"),
            Self::FollowUp => write!(f, "follow-up"),
            Self::Announcement => write!(f, "announcement"),
            Self::Invitation => write!(f, "invitation"),
            Self::ThankYou => write!(f, "thank-you"),
        }
    }
}

/// What the caller wants drafted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRequest {
    pub prompt: String,
    pub tone: Tone,
    pub email_type: EmailType,
}

impl DraftRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            tone: Tone::default(),
            email_type: EmailType::default(),
        }
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_email_type(mut self, email_type: EmailType) -> Self {
        self.email_type = email_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_subject_gets_placeholder() {
        let email = GeneratedEmail::new("   ", "body");
        assert_eq!(email.subject, DEFAULT_SUBJECT);
        assert_eq!(email.body, "body");
    }

    #[test]
    fn subject_is_trimmed() {
        assert_eq!(GeneratedEmail::new("  Hi \n", "").subject, "Hi");
    }

    #[test]
    fn tone_and_type_deserialize_snake_case() {
        let tone: Tone = serde_json::from_str("\"persuasive\"").unwrap();
        assert_eq!(tone, Tone::Persuasive);
        let kind: EmailType = serde_json::from_str("\"follow_up\"").unwrap();
        assert_eq!(kind, EmailType::FollowUp);
        assert_eq!(kind.to_string(), "follow-up");
        let kind: EmailType = serde_json::from_str("\"thank-you\"").unwrap();
        assert_eq!(kind, EmailType::ThankYou);
    }

    #[test]
    fn draft_request_builder_defaults() {
        let req = DraftRequest::new("Invite the team").with_tone(Tone::Casual);
        assert_eq!(req.tone, Tone::Casual);
        assert_eq!(req.email_type, EmailType::General);
    }
}
