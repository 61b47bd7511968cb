//! Request handlers.

use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use super::error::ApiError;
use crate::compose::{DraftRequest, EmailType, MAX_PROMPT_CHARS, Tone, coerce_body};
use crate::error::ValidationError;
use crate::mail::{AddressCheck, DeliveryReport, SendRequest, check_addresses, validate_recipients};

/// Success body: `{success, message, data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data,
        })
    }
}

// ── Health ──────────────────────────────────────────────────────────────

pub(super) async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "ai-mailer"
    }))
}

// ── Generate ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub prompt: String,
    pub recipients: Option<Vec<String>>,
    pub tone: Option<Tone>,
    pub email_type: Option<EmailType>,
}

#[derive(Debug, Serialize)]
pub struct GenerateData {
    pub subject: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<String>>,
}

pub(super) async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateBody>,
) -> Result<Json<ApiResponse<GenerateData>>, ApiError> {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(invalid_field("prompt", "must not be empty").into());
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(invalid_field(
            "prompt",
            &format!("must be at most {MAX_PROMPT_CHARS} characters"),
        )
        .into());
    }
    let recipients = match req.recipients {
        Some(list) if !list.is_empty() => Some(validate_recipients(&list)?),
        _ => None,
    };

    let request = DraftRequest::new(prompt)
        .with_tone(req.tone.unwrap_or_default())
        .with_email_type(req.email_type.unwrap_or_default());
    let email = state.drafter.draft(&request).await?;

    Ok(ApiResponse::ok(
        "Email generated successfully",
        GenerateData {
            subject: email.subject,
            body: email.body,
            recipients,
        },
    ))
}

// ── Send ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBody {
    pub recipients: Vec<String>,
    pub subject: String,
    /// Usually a string; other shapes are coerced once here.
    pub body: serde_json::Value,
    pub sender_name: Option<String>,
}

pub(super) async fn send(
    State(state): State<AppState>,
    Json(req): Json<SendBody>,
) -> Result<Json<ApiResponse<DeliveryReport>>, ApiError> {
    let request = SendRequest {
        recipients: req.recipients,
        subject: req.subject,
        body: coerce_body(req.body),
        sender_name: req.sender_name,
    };

    let report = state.orchestrator.send_email(request).await?;
    let message = if report.failed == 0 {
        format!("Email sent to {} recipient(s)", report.successful)
    } else if report.any_sent() {
        format!(
            "Email sent to {} of {} recipient(s)",
            report.successful, report.total_recipients
        )
    } else {
        "Failed to send email to any recipient".to_string()
    };
    info!(
        successful = report.successful,
        failed = report.failed,
        "Send request handled"
    );

    Ok(Json(ApiResponse {
        success: report.any_sent(),
        message,
        data: report,
    }))
}

// ── Validate ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ValidateBody {
    pub emails: Vec<String>,
}

pub(super) async fn validate(Json(req): Json<ValidateBody>) -> Json<ApiResponse<AddressCheck>> {
    let check = check_addresses(&req.emails);
    let message = if check.all_valid {
        "All email addresses are valid".to_string()
    } else if check.invalid.is_empty() {
        "No email addresses provided".to_string()
    } else {
        format!("{} invalid email address(es)", check.invalid.len())
    };
    ApiResponse::ok(message, check)
}

fn invalid_field(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
