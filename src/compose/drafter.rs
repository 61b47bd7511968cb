//! Email drafter: asks the LLM for an email and normalizes the answer.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, FinishReason, LlmProvider};

use super::model::{DraftRequest, GeneratedEmail};
use super::normalizer::normalize_with_context;
use super::prompts::{build_system_prompt, build_user_prompt};

/// Configuration for drafting.
#[derive(Debug, Clone)]
pub struct DraftConfig {
    /// LLM temperature for drafting.
    pub temperature: f32,
    /// Max tokens for the LLM response.
    pub max_tokens: u32,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

/// Drafts emails from natural-language prompts.
pub struct EmailDrafter {
    llm: Arc<dyn LlmProvider>,
    config: DraftConfig,
}

impl EmailDrafter {
    pub fn new(llm: Arc<dyn LlmProvider>, config: DraftConfig) -> Self {
        Self { llm, config }
    }

    /// Draft an email. Provider failures abort; malformed answers never do.
    pub async fn draft(&self, request: &DraftRequest) -> Result<GeneratedEmail, LlmError> {
        info!(
            model = self.llm.model_name(),
            tone = %request.tone,
            email_type = %request.email_type,
            "Drafting email"
        );

        let completion = CompletionRequest::new(vec![
            ChatMessage::system(build_system_prompt()),
            ChatMessage::user(build_user_prompt(request)),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        let response = self.llm.complete(completion).await?;
        if response.finish_reason == FinishReason::Length {
            warn!(
                max_tokens = self.config.max_tokens,
                output_tokens = response.output_tokens,
                "Completion hit the token limit; body may be cut short"
            );
        }

        let (email, ctx) = normalize_with_context(&response.content);
        if ctx.defect {
            warn!(
                output_tokens = response.output_tokens,
                "Drafted email needed scrubbing; model output was malformed"
            );
        }

        info!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            json_parsed = ctx.json_parsed,
            subject = %email.subject,
            "Drafted email"
        );

        Ok(email)
    }
}
