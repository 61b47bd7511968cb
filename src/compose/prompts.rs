//! Prompt construction for email drafting.

use super::model::{DraftRequest, EmailType, Tone};

/// Maximum prompt characters forwarded to the model.
pub const MAX_PROMPT_CHARS: usize = 2000;

/// Build the drafting system prompt.
pub fn build_system_prompt() -> String {
    "You are an expert email copywriter. Write one complete email from the user's request.\n\n\
     Respond with ONLY a JSON object of exactly this shape:\n\
     {\"subject\": \"...\", \"body\": \"...\"}\n\n\
     Rules:\n\
     - No markdown code fences, no text before or after the JSON\n\
     - \"subject\" is a single line, under 80 characters\n\
     - \"body\" is plain text; separate paragraphs with a blank line (\\n\\n)\n\
     - Do not put JSON, field names or a subject line inside the body\n\
     - Include a greeting and a sign-off appropriate to the tone"
        .to_string()
}

/// Build the user prompt from a draft request.
pub fn build_user_prompt(request: &DraftRequest) -> String {
    let mut prompt = String::with_capacity(256);

    prompt.push_str(&format!("Email type: {}\n", request.email_type));
    prompt.push_str(&format!("Tone: {} ({})\n", request.tone, tone_guidance(request.tone)));
    if let Some(hint) = type_guidance(request.email_type) {
        prompt.push_str(&format!("Guidance: {hint}\n"));
    }

    let content: String = request.prompt.trim().chars().take(MAX_PROMPT_CHARS).collect();
    prompt.push_str(&format!("\nRequest:\n{content}"));

    prompt
}

fn tone_guidance(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => "clear, courteous and concise",
        Tone::Friendly => "warm and approachable, first names are fine",
        Tone::Formal => "polished and respectful, no contractions",
        Tone::Casual => "relaxed and conversational",
        Tone::Persuasive => "confident, benefit-focused, with a clear call to action",
    }
}

fn type_guidance(email_type: EmailType) -> Option<&'static str> {
    match email_type {
        EmailType::General => None,
        EmailType::Business => Some("state the purpose in the first paragraph"),
        EmailType::Marketing => Some("lead with the main benefit and end with a call to action"),
        EmailType::FollowUp => Some("reference the earlier conversation and propose a next step"),
        EmailType::Announcement => Some("put the news first, details after"),
        EmailType::Invitation => Some("include what, when, where and how to RSVP"),
        EmailType::ThankYou => Some("be specific about what you are thankful for"),
    }
}
