//! Response normalizer: turns a raw model completion into a clean
//! [`GeneratedEmail`].
//!
//! The model is told to answer with a bare `{"subject": ..., "body": ...}`
//! object but routinely wraps it in code fences, adds prose around it,
//! escapes it twice or nests one envelope inside another. Stages run from
//! most to least structured and stop at the first clean result:
//!
//! 1. strip code fences
//! 2. bound the text to the outermost `{ ... }`, decoding envelopes that
//!    were escaped one level too many
//! 3. strict JSON parse (guarded against nested envelopes)
//! 4. regex field extraction
//! 5. plain-text `Subject:` line fallback
//!
//! Normalization never fails. A body that still carries envelope keys after
//! every stage is logged as a defect and scrubbed.

use tracing::{debug, warn};

use super::artifacts::{
    self, EnvelopeField, MAX_UNWRAP_DEPTH, bound_braces, decode_escaped_envelope,
    extract_quoted_field, extract_unterminated_body, has_body_key, has_envelope_residue,
    mentions_envelope_keys, parse_envelope, strip_code_fences, strip_wrapping_quotes,
    take_quoted_field, unescape_newlines,
};
use super::model::GeneratedEmail;

/// Stage a normalization run has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationStage {
    FenceStripping,
    BraceBounding,
    StrictParse,
    FieldExtraction,
    PlainText,
    Complete,
}

/// Diagnostics for a single normalization call.
#[derive(Debug, Clone)]
pub struct NormalizationContext {
    /// The completion as received.
    pub raw: String,
    pub stage: NormalizationStage,
    /// Escaping levels removed before the envelope would parse.
    pub escape_levels_removed: usize,
    /// The bounded text parsed as a JSON envelope.
    pub json_parsed: bool,
    /// Fields had to be pulled out with regexes.
    pub manual_extraction: bool,
    /// A parsed body still mentioned envelope keys and was not trusted.
    pub recursion_guard_tripped: bool,
    /// No `"body"` key existed; the `Subject:` line fallback was used.
    pub plain_text_fallback: bool,
    /// The final body still carried envelope keys and had to be scrubbed.
    pub defect: bool,
}

impl NormalizationContext {
    fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            stage: NormalizationStage::FenceStripping,
            escape_levels_removed: 0,
            json_parsed: false,
            manual_extraction: false,
            recursion_guard_tripped: false,
            plain_text_fallback: false,
            defect: false,
        }
    }

    fn enter(&mut self, stage: NormalizationStage) {
        self.stage = stage;
    }
}

/// Normalize a raw completion into a clean subject/body pair.
pub fn normalize(raw: &str) -> GeneratedEmail {
    normalize_with_context(raw).0
}

/// Like [`normalize`], also returning what happened along the way.
pub fn normalize_with_context(raw: &str) -> (GeneratedEmail, NormalizationContext) {
    let mut ctx = NormalizationContext::new(raw);

    let mut cleaned = strip_code_fences(raw);

    ctx.enter(NormalizationStage::BraceBounding);
    for _ in 0..MAX_UNWRAP_DEPTH {
        if bound_braces(&cleaned).and_then(parse_envelope).is_some() {
            break;
        }
        let Some(decoded) = decode_escaped_envelope(&cleaned) else {
            break;
        };
        ctx.escape_levels_removed += 1;
        cleaned = decoded;
    }
    let bounded = bound_braces(&cleaned);

    ctx.enter(NormalizationStage::StrictParse);
    if let Some(envelope) = bounded.and_then(parse_envelope) {
        ctx.json_parsed = true;
        let body = clean_body(envelope.body.as_deref().unwrap_or_default());

        if !mentions_envelope_keys(&body) {
            let email = GeneratedEmail::new(clean_subject(envelope.subject.as_deref()), body);
            return finish(email, ctx);
        }

        ctx.recursion_guard_tripped = true;
        debug!("Parsed body still mentions envelope keys; re-extracting from raw text");
    }

    let email = if has_body_key(&cleaned) {
        ctx.enter(NormalizationStage::FieldExtraction);
        ctx.manual_extraction = true;
        extract_fields(&cleaned, 0)
    } else {
        ctx.enter(NormalizationStage::PlainText);
        ctx.plain_text_fallback = true;
        plain_text_fallback(&cleaned)
    };

    finish(email, ctx)
}

/// Regex extraction of `"subject"` / `"body"`, unwrapping nested envelopes.
fn extract_fields(text: &str, depth: usize) -> GeneratedEmail {
    let subject = extract_quoted_field(text, EnvelopeField::Subject);
    let body = extract_quoted_field(text, EnvelopeField::Body)
        .or_else(|| extract_unterminated_body(text));

    let Some(body) = body else {
        return plain_text_fallback(text);
    };
    let body = clean_body(&body);

    if depth < MAX_UNWRAP_DEPTH && has_body_key(&body) {
        let inner = extract_fields(&body, depth + 1);
        let subject = match subject {
            Some(s) if !s.trim().is_empty() => clean_subject(Some(&s)),
            _ => inner.subject,
        };
        return GeneratedEmail::new(subject, inner.body);
    }

    GeneratedEmail::new(clean_subject(subject.as_deref()), body)
}

/// A quoted `"subject": "..."` field if present, else a `subject:` line;
/// everything else is the body.
fn plain_text_fallback(text: &str) -> GeneratedEmail {
    const TOKEN: &str = "subject:";

    let (mut subject, rest) = match take_quoted_field(text, EnvelopeField::Subject) {
        Some((value, rest)) => (Some(clean_subject(Some(&value))), rest),
        None => (None, text.to_string()),
    };
    let mut lines = Vec::new();

    for line in rest.lines() {
        if subject.is_none()
            && let Some(pos) = line.to_ascii_lowercase().find(TOKEN)
        {
            subject = Some(clean_subject(Some(&line[pos + TOKEN.len()..])));
            continue;
        }
        if is_json_punctuation(line) {
            continue;
        }
        lines.push(line);
    }

    let body = lines.join("\n");
    let body = body
        .trim()
        .trim_matches(|c: char| matches!(c, '{' | '}' | '"' | ',') || c.is_whitespace());

    GeneratedEmail::new(subject.unwrap_or_default(), unescape_newlines(body))
}

/// A line made only of braces, brackets and commas.
fn is_json_punctuation(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| matches!(c, '{' | '}' | '[' | ']' | ','))
}

fn clean_subject(subject: Option<&str>) -> String {
    let Some(subject) = subject else {
        return String::new();
    };
    let subject = subject.trim().trim_end_matches(',');
    strip_wrapping_quotes(subject)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn clean_body(body: &str) -> String {
    unescape_newlines(strip_wrapping_quotes(body))
}

fn finish(
    mut email: GeneratedEmail,
    mut ctx: NormalizationContext,
) -> (GeneratedEmail, NormalizationContext) {
    ctx.enter(NormalizationStage::Complete);

    if has_envelope_residue(&email.body) {
        ctx.defect = true;
        warn!(
            raw_len = ctx.raw.len(),
            json_parsed = ctx.json_parsed,
            manual_extraction = ctx.manual_extraction,
            recursion_guard = ctx.recursion_guard_tripped,
            "Normalization defect: body still carries envelope keys after every stage"
        );
        email.body = artifacts::scrub_envelope_residue(&email.body);
    }

    debug!(
        json_parsed = ctx.json_parsed,
        escape_levels_removed = ctx.escape_levels_removed,
        manual_extraction = ctx.manual_extraction,
        plain_text = ctx.plain_text_fallback,
        subject_len = email.subject.len(),
        body_len = email.body.len(),
        "Normalized model response"
    );

    (email, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::model::DEFAULT_SUBJECT;

    #[test]
    fn clean_json_parses_directly() {
        let (email, ctx) = normalize_with_context(r#"{"subject":"Hi","body":"Line1\nLine2"}"#);
        assert_eq!(email.subject, "Hi");
        assert_eq!(email.body, "Line1\nLine2");
        assert!(ctx.json_parsed);
        assert!(!ctx.manual_extraction);
        assert_eq!(ctx.stage, NormalizationStage::Complete);
    }

    #[test]
    fn double_escaped_newlines_are_unescaped() {
        let email = normalize(r#"{"subject":"Hi","body":"Line1\\nLine2"}"#);
        assert_eq!(email.body, "Line1\nLine2");
    }

    #[test]
    fn code_fences_are_stripped() {
        let email = normalize("```json\n{\"subject\":\"S\",\"body\":\"B\"}\n```");
        assert_eq!(email, GeneratedEmail::new("S", "B"));
    }

    #[test]
    fn prose_around_json_is_discarded() {
        let raw = "Sure! Here is your email:\n{\"subject\": \"Launch\", \"body\": \"We ship today.\"}\nLet me know if you need changes.";
        let email = normalize(raw);
        assert_eq!(email.subject, "Launch");
        assert_eq!(email.body, "We ship today.");
    }

    #[test]
    fn missing_subject_gets_placeholder() {
        let email = normalize(r#"{"body": "Just the body"}"#);
        assert_eq!(email.subject, DEFAULT_SUBJECT);
        assert_eq!(email.body, "Just the body");
    }

    #[test]
    fn non_string_subject_gets_placeholder() {
        let email = normalize(r#"{"subject": 42, "body": "Text"}"#);
        assert_eq!(email.subject, DEFAULT_SUBJECT);
    }

    #[test]
    fn wrapping_quotes_are_removed_from_fields() {
        let email = normalize(r#"{"subject": "\"Quoted\"", "body": "\"Hello\""}"#);
        assert_eq!(email.subject, "Quoted");
        assert_eq!(email.body, "Hello");
    }

    #[test]
    fn nested_envelope_trips_guard_and_unwraps() {
        let raw = r#"{"subject":"Outer","body":"{\"subject\":\"Inner\",\"body\":\"Real body\"}"}"#;
        let (email, ctx) = normalize_with_context(raw);
        assert!(ctx.json_parsed);
        assert!(ctx.recursion_guard_tripped);
        assert!(ctx.manual_extraction);
        assert_eq!(email.subject, "Outer");
        assert_eq!(email.body, "Real body");
    }

    #[test]
    fn nested_envelope_without_outer_subject_uses_inner() {
        let raw = r#"{"body":"{\"subject\":\"Inner\",\"body\":\"Real body\"}"}"#;
        let email = normalize(raw);
        assert_eq!(email.subject, "Inner");
        assert_eq!(email.body, "Real body");
    }

    #[test]
    fn malformed_json_falls_back_to_regex() {
        // Trailing comma and unquoted key make this invalid JSON.
        let raw = r#"{"subject": "Update", "body": "Hi \"team\",\nSee below.", extra: 1,}"#;
        let (email, ctx) = normalize_with_context(raw);
        assert!(!ctx.json_parsed);
        assert!(ctx.manual_extraction);
        assert_eq!(email.subject, "Update");
        assert_eq!(email.body, "Hi \"team\",\nSee below.");
    }

    #[test]
    fn truncated_completion_keeps_partial_body() {
        let raw = r#"{"subject": "Status", "body": "Hi all,\n\nProgress is good and"#;
        let email = normalize(raw);
        assert_eq!(email.subject, "Status");
        assert_eq!(email.body, "Hi all,\n\nProgress is good and");
    }

    #[test]
    fn plain_text_subject_line() {
        let (email, ctx) =
            normalize_with_context("Subject: Hello\nHi Bob,\n\nSee you soon.\nAlice");
        assert!(ctx.plain_text_fallback);
        assert_eq!(email.subject, "Hello");
        assert_eq!(email.body, "Hi Bob,\n\nSee you soon.\nAlice");
    }

    #[test]
    fn plain_text_subject_is_case_insensitive() {
        let email = normalize("Dear team,\nSUBJECT: Quarterly review\nPlease read.");
        assert_eq!(email.subject, "Quarterly review");
        assert_eq!(email.body, "Dear team,\nPlease read.");
    }

    #[test]
    fn plain_text_without_subject_keeps_text() {
        let email = normalize("Just a note to say thanks.");
        assert_eq!(email.subject, DEFAULT_SUBJECT);
        assert_eq!(email.body, "Just a note to say thanks.");
    }

    #[test]
    fn plain_text_strips_json_punctuation() {
        let email = normalize("{\n\"Subject: Hi\",\nSome text\n}");
        assert_eq!(email.subject, "Hi");
        assert_eq!(email.body, "Some text");
    }

    #[test]
    fn envelope_escaped_as_string_literal_is_decoded() {
        let (email, ctx) = normalize_with_context(r#""{\"subject\":\"S\",\"body\":\"B\"}""#);
        assert_eq!(ctx.escape_levels_removed, 1);
        assert!(ctx.json_parsed);
        assert!(!ctx.plain_text_fallback);
        assert_eq!(email, GeneratedEmail::new("S", "B"));
    }

    #[test]
    fn bare_over_escaped_envelope_is_decoded() {
        let raw = r#"{\"subject\": \"Meeting\", \"body\": \"Hi team,\\nSee you.\"}"#;
        let (email, ctx) = normalize_with_context(raw);
        assert_eq!(ctx.escape_levels_removed, 1);
        assert_eq!(email.subject, "Meeting");
        assert_eq!(email.body, "Hi team,\nSee you.");
    }

    #[test]
    fn doubly_over_escaped_envelope_is_decoded() {
        let envelope = serde_json::json!({"subject": "Deep", "body": "Two levels"}).to_string();
        let once = serde_json::to_string(&envelope).unwrap();
        let raw = serde_json::to_string(&once).unwrap();
        let (email, ctx) = normalize_with_context(&raw);
        assert_eq!(ctx.escape_levels_removed, 2);
        assert_eq!(email, GeneratedEmail::new("Deep", "Two levels"));
    }

    #[test]
    fn lone_quoted_subject_field_is_kept() {
        let (email, ctx) = normalize_with_context(r#""subject": "Hi""#);
        assert!(ctx.plain_text_fallback);
        assert_eq!(email.subject, "Hi");
        assert_eq!(email.body, "");
    }

    #[test]
    fn quoted_subject_field_with_trailing_text() {
        let email = normalize("{\"subject\": \"Weekly sync\",\nAgenda attached.\n}");
        assert_eq!(email.subject, "Weekly sync");
        assert_eq!(email.body, "Agenda attached.");
    }

    #[test]
    fn empty_input_still_has_subject() {
        let email = normalize("");
        assert_eq!(email.subject, DEFAULT_SUBJECT);
        assert_eq!(email.body, "");
    }

    #[test]
    fn body_key_without_string_value_is_scrubbed() {
        let (email, ctx) = normalize_with_context(r#"prefix "body": [1, 2 trailing"#);
        assert!(ctx.defect);
        assert!(!email.body.contains("\"body\":"));
        assert!(!email.subject.is_empty());
    }

    #[test]
    fn never_returns_envelope_residue() {
        let inputs = [
            "",
            "{",
            "}",
            "```",
            r#"{"subject":"#,
            r#"{"body":"#,
            r#""subject": "x", "body": "#,
            r#"{"subject":"a","body":"{\"subject\":\"b\",\"body\":\"{\\\"subject\\\":\\\"c\\\",\\\"body\\\":\\\"d\\\"}\"}"}"#,
            "random text with \"body\": inside and subject: line",
        ];
        for raw in inputs {
            let email = normalize(raw);
            assert!(!email.subject.is_empty(), "empty subject for {raw:?}");
            assert!(!email.body.contains("\"subject\":"), "residue for {raw:?}");
            assert!(!email.body.contains("\"body\":"), "residue for {raw:?}");
        }
    }
}
