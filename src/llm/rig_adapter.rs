//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionModel};

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};

/// `LlmProvider` backed by any rig completion model.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
}

impl<M> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &'static str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut builder = self.model.completion_request(request.user_prompt());
        if let Some(preamble) = request.system_prompt() {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_failure(self.provider, e.to_string()))?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|part| match part {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.provider.to_string(),
                reason: "completion contained no text".to_string(),
            });
        }

        let output_tokens = u32::try_from(response.usage.output_tokens).unwrap_or(u32::MAX);
        Ok(CompletionResponse {
            content,
            input_tokens: u32::try_from(response.usage.input_tokens).unwrap_or(u32::MAX),
            output_tokens,
            finish_reason: finish_reason(output_tokens, request.max_tokens),
        })
    }
}

/// rig does not surface the stop reason, so infer truncation from usage.
fn finish_reason(output_tokens: u32, max_tokens: Option<u32>) -> FinishReason {
    match max_tokens {
        Some(max) if output_tokens >= max => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

/// Map a provider failure message onto quota / credential / other.
pub(crate) fn classify_failure(provider: &str, reason: String) -> LlmError {
    let lower = reason.to_lowercase();

    if ["429", "quota", "rate limit", "rate_limit", "insufficient_quota"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        tracing::warn!(provider, "LLM provider quota exceeded");
        return LlmError::QuotaExceeded {
            provider: provider.to_string(),
            reason,
        };
    }

    if [
        "401",
        "unauthorized",
        "authentication",
        "invalid api key",
        "invalid x-api-key",
        "invalid_api_key",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
    {
        tracing::error!(provider, "LLM provider rejected credentials");
        return LlmError::AuthFailed {
            provider: provider.to_string(),
        };
    }

    tracing::error!(provider, reason = %reason, "LLM request failed");
    LlmError::RequestFailed {
        provider: provider.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;

    #[test]
    fn finish_reason_flags_token_limit() {
        assert_eq!(finish_reason(1024, Some(1024)), FinishReason::Length);
        assert_eq!(finish_reason(300, Some(1024)), FinishReason::Stop);
        assert_eq!(finish_reason(5000, None), FinishReason::Stop);
    }

    #[test]
    fn quota_messages_classify_as_quota() {
        let err = classify_failure("openai", "ProviderError: 429 Too Many Requests".into());
        assert_eq!(err.kind(), ProviderErrorKind::QuotaExceeded);
        let err = classify_failure("openai", "You exceeded your current quota".into());
        assert_eq!(err.kind(), ProviderErrorKind::QuotaExceeded);
    }

    #[test]
    fn auth_messages_classify_as_credential() {
        let err = classify_failure("anthropic", "authentication_error: invalid x-api-key".into());
        assert_eq!(err.kind(), ProviderErrorKind::InvalidCredential);
        let err = classify_failure("openai", "HTTP 401 Unauthorized".into());
        assert_eq!(err.kind(), ProviderErrorKind::InvalidCredential);
    }

    #[test]
    fn other_messages_classify_as_other() {
        let err = classify_failure("anthropic", "connection reset by peer".into());
        assert_eq!(err.kind(), ProviderErrorKind::Other);
        assert!(err.to_string().contains("connection reset"));
    }
}
