//! Per-recipient delivery outcomes.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// Outcome of delivering to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub recipient: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl DeliveryResult {
    pub fn sent(recipient: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            status: DeliveryStatus::Sent,
            message_id: Some(message_id.into()),
            error: None,
            attempted_at: Utc::now(),
        }
    }

    pub fn failed(recipient: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            status: DeliveryStatus::Failed,
            message_id: None,
            error: Some(error.into()),
            attempted_at: Utc::now(),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.status == DeliveryStatus::Sent
    }
}

/// Aggregate of one send call.
///
/// `successful + failed == total_recipients == results.len()` holds for
/// every report built through [`DeliveryReport::from_results`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub total_recipients: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<DeliveryResult>,
}

impl DeliveryReport {
    pub fn from_results(results: Vec<DeliveryResult>) -> Self {
        let successful = results.iter().filter(|r| r.is_sent()).count();
        Self {
            total_recipients: results.len(),
            successful,
            failed: results.len() - successful,
            results,
        }
    }

    /// True when at least one recipient was reached.
    pub fn any_sent(&self) -> bool {
        self.successful > 0
    }
}
