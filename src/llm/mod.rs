//! Drafting model backends (Anthropic, OpenAI) behind [`LlmProvider`].

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use rig::providers::{anthropic, openai};
use secrecy::ExposeSecret;
use tracing::info;

use crate::error::{ConfigError, LlmError};

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl LlmBackend {
    /// Provider label used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::OpenAi => "gpt-4o-mini",
        }
    }

    /// Environment variable holding this backend's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl std::str::FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" | "open_ai" | "gpt" => Ok(Self::OpenAi),
            other => Err(ConfigError::InvalidValue {
                key: "AI_MAILER_LLM_BACKEND".to_string(),
                message: format!("unknown backend '{other}' (expected anthropic or openai)"),
            }),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Build the completion provider for the configured backend.
///
/// Clients are created offline; a bad key only surfaces on the first request.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = config.backend.name();
    let key = config.api_key.expose_secret();

    let llm: Arc<dyn LlmProvider> = match config.backend {
        LlmBackend::Anthropic => {
            let client: rig::client::Client<anthropic::client::AnthropicExt> =
                anthropic::Client::new(key).map_err(|e| client_error(provider, e))?;
            let model = client.completion_model(&config.model);
            Arc::new(RigAdapter::new(model, &config.model, provider))
        }
        LlmBackend::OpenAi => {
            let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
                openai::Client::new(key).map_err(|e| client_error(provider, e))?;
            let model = client.completion_model(&config.model);
            Arc::new(RigAdapter::new(model, &config.model, provider))
        }
    };

    info!(provider, model = %config.model, "LLM provider ready");
    Ok(llm)
}

fn client_error(provider: &str, err: impl std::fmt::Display) -> LlmError {
    LlmError::RequestFailed {
        provider: provider.to_string(),
        reason: format!("client setup failed: {err}"),
    }
}
