//! HTTP API: generate, send and validate endpoints plus health.

pub mod error;
mod handlers;

pub use error::{ApiError, ErrorBody};
pub use handlers::{ApiResponse, GenerateBody, GenerateData, SendBody, ValidateBody};

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::compose::EmailDrafter;
use crate::mail::EmailOrchestrator;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub drafter: Arc<EmailDrafter>,
    pub orchestrator: Arc<EmailOrchestrator>,
}

/// Build the router with CORS and request tracing.
pub fn api_routes(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/email/generate", post(handlers::generate))
        .route("/api/email/send", post(handlers::send))
        .route("/api/email/validate", post(handlers::validate))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

/// `*` allows any origin; otherwise only the listed ones.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
