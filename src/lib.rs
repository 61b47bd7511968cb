//! AI Mailer: LLM-drafted email generation and SMTP delivery.

pub mod api;
pub mod compose;
pub mod config;
pub mod error;
pub mod llm;
pub mod mail;
