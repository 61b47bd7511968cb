//! Email composition: drafting via the LLM, response normalization and
//! body rendering.

pub mod artifacts;
pub mod drafter;
pub mod model;
pub mod normalizer;
pub mod prompts;
pub mod render;

pub use drafter::{DraftConfig, EmailDrafter};
pub use model::{DEFAULT_SUBJECT, DraftRequest, EmailType, GeneratedEmail, Tone};
pub use normalizer::{NormalizationContext, NormalizationStage, normalize, normalize_with_context};
pub use prompts::MAX_PROMPT_CHARS;
pub use render::{RenderedBody, coerce_body, render};
