//! Error responses for the HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{
    Error, LlmError, ProviderErrorKind, TransportError, TransportErrorKind, ValidationError,
};

/// Failure body: `{success: false, message, details?}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Any error a handler can return.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] Error);

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        Self(err.into())
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Llm(e) => match e.kind() {
                ProviderErrorKind::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
                ProviderErrorKind::InvalidCredential => StatusCode::INTERNAL_SERVER_ERROR,
                ProviderErrorKind::Other => StatusCode::BAD_GATEWAY,
            },
            Error::Transport(e) => match e.kind() {
                TransportErrorKind::Authentication => StatusCode::INTERNAL_SERVER_ERROR,
                TransportErrorKind::Connection => StatusCode::SERVICE_UNAVAILABLE,
                TransportErrorKind::Other => StatusCode::BAD_GATEWAY,
            },
        }
    }

    /// Caller-facing body. Provider and transport details stay in the logs.
    fn body(&self) -> ErrorBody {
        let (message, details) = match &self.0 {
            Error::Validation(e) => (e.to_string(), Some(e.details())),
            Error::Llm(e) => (e.user_message().to_string(), None),
            Error::Transport(e) => (e.user_message().to_string(), None),
        };
        ErrorBody {
            success: false,
            message,
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "Request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
