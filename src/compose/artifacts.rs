//! Detection and extraction of JSON artifacts in model output.
//!
//! Model completions and caller-supplied bodies both arrive with the same
//! kinds of debris: code fences, prose around the JSON, wrapping quotes,
//! literal `\n` escapes and envelopes nested inside envelopes. Every check
//! for that debris lives here so the normalizer and the renderer agree on
//! what "clean" means.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Maximum number of nested envelopes unwrapped from a single value.
pub const MAX_UNWRAP_DEPTH: usize = 3;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:json)?").expect("code fence regex"));

static ENVELOPE_RESIDUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(?:subject|body)"\s*:"#).expect("residue regex"));

static SUBJECT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"subject"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("subject field regex")
});

static BODY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"body"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("body field regex")
});

static OPEN_BODY_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"body"\s*:\s*"(.*)"#).expect("open body field regex"));

/// A key of the `{subject, body}` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeField {
    Subject,
    Body,
}

impl EnvelopeField {
    fn pattern(self) -> &'static Regex {
        match self {
            Self::Subject => &SUBJECT_FIELD,
            Self::Body => &BODY_FIELD,
        }
    }

    fn quoted_key(self) -> &'static str {
        match self {
            Self::Subject => "\"subject\"",
            Self::Body => "\"body\"",
        }
    }
}

/// Fields recovered from a strictly parsed JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// `None` when absent or not a string.
    pub subject: Option<String>,
    /// Non-string values are kept as their JSON text; `None` when absent or null.
    pub body: Option<String>,
}

/// Remove every ```` ```json ```` and ```` ``` ```` marker.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").into_owned()
}

/// Slice from the first `{` to the last `}`, if both exist in order.
pub fn bound_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Whether the trimmed text is shaped like a JSON object.
pub fn looks_like_json_object(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with('{') && trimmed.ends_with('}')
}

/// Whether the text mentions an envelope key at all (`"subject"` or `"body"`).
pub fn mentions_envelope_keys(text: &str) -> bool {
    text.contains(EnvelopeField::Subject.quoted_key())
        || text.contains(EnvelopeField::Body.quoted_key())
}

/// Whether the text has an envelope key followed by a colon.
pub fn has_envelope_residue(text: &str) -> bool {
    ENVELOPE_RESIDUE.is_match(text)
}

/// Whether a `"body"` key appears anywhere in the text.
pub fn has_body_key(text: &str) -> bool {
    text.contains(EnvelopeField::Body.quoted_key())
}

/// Whether envelope keys appear in escaped form (`\"subject\"`, `\"body\"`),
/// i.e. the envelope was serialized one level too many.
pub fn has_escaped_envelope_keys(text: &str) -> bool {
    text.contains(r#"\"subject\"#) || text.contains(r#"\"body\"#)
}

/// Remove one level of JSON string escaping from an over-escaped envelope.
///
/// Accepts the envelope as a quoted JSON string literal
/// (`"{\"subject\": ...}"`) or as the bare escaped object, possibly with
/// prose around it. Returns `None` unless the keys appear only in escaped
/// form, so a nested escaped envelope inside a plain one is left alone.
pub fn decode_escaped_envelope(text: &str) -> Option<String> {
    if !has_escaped_envelope_keys(text) || mentions_envelope_keys(text) {
        return None;
    }
    let trimmed = text.trim();
    if let Ok(Value::String(inner)) = serde_json::from_str::<Value>(trimmed) {
        return Some(inner);
    }
    let span = bound_braces(trimmed).unwrap_or(trimmed);
    Some(unescape_json_string(span))
}

/// Remove every `"subject":` / `"body":` marker.
pub fn scrub_envelope_residue(text: &str) -> String {
    let mut scrubbed = text.to_string();
    // Removing one marker can splice two fragments into a new one.
    while ENVELOPE_RESIDUE.is_match(&scrubbed) {
        scrubbed = ENVELOPE_RESIDUE.replace_all(&scrubbed, "").into_owned();
    }
    scrubbed.trim().to_string()
}

/// Trim whitespace and any run of double quotes at either end.
pub fn strip_wrapping_quotes(text: &str) -> &str {
    text.trim().trim_matches('"').trim()
}

/// Turn literal `\n` (and `\r\n`) escape sequences into line breaks.
pub fn unescape_newlines(text: &str) -> String {
    text.replace("\\r\\n", "\n").replace("\\n", "\n")
}

/// Decode a JSON string literal's contents (without the outer quotes).
///
/// Falls back to a lenient decoder when the value is not valid JSON,
/// e.g. a stray backslash the model emitted.
pub fn unescape_json_string(raw: &str) -> String {
    if let Ok(decoded) = serde_json::from_str::<String>(&format!("\"{raw}\"")) {
        return decoded;
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => {}
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Strictly parse `text` as a JSON object carrying `subject` and/or `body`.
///
/// Returns `None` when the text is not a JSON object or has neither key.
pub fn parse_envelope(text: &str) -> Option<Envelope> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    let object = value.as_object()?;
    if !object.contains_key("subject") && !object.contains_key("body") {
        return None;
    }

    let subject = object
        .get("subject")
        .and_then(Value::as_str)
        .map(str::to_string);
    let body = match object.get("body") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    Some(Envelope { subject, body })
}

/// Extract the quoted string value following `"subject"` or `"body"`.
///
/// Escaped interior quotes are part of the value; the result is un-escaped.
pub fn extract_quoted_field(text: &str, field: EnvelopeField) -> Option<String> {
    let captures = field.pattern().captures(text)?;
    let raw = captures.get(1)?.as_str();
    Some(unescape_json_string(raw))
}

/// Like [`extract_quoted_field`], also returning `text` with the whole
/// `"key": "value"` span cut out.
pub fn take_quoted_field(text: &str, field: EnvelopeField) -> Option<(String, String)> {
    let captures = field.pattern().captures(text)?;
    let span = captures.get(0)?;
    let value = unescape_json_string(captures.get(1)?.as_str());
    let rest = format!("{}{}", &text[..span.start()], &text[span.end()..]);
    Some((value, rest))
}

/// Extract a `"body"` value whose closing quote never arrived.
///
/// Completions cut off by the token limit end mid-string; everything after
/// the opening quote is taken, minus trailing `"`/`}` debris.
pub fn extract_unterminated_body(text: &str) -> Option<String> {
    let captures = OPEN_BODY_FIELD.captures(text)?;
    let raw = captures
        .get(1)?
        .as_str()
        .trim_end()
        .trim_end_matches(|c: char| c == '}' || c == '"' || c.is_whitespace());
    Some(unescape_json_string(raw))
}

/// Reduce a body value that may still be JSON-wrapped to its plain text.
///
/// A JSON object with a `body` field is replaced by that field (repeatedly,
/// up to [`MAX_UNWRAP_DEPTH`]); anything else keeps its literal text minus
/// wrapping quotes. Literal `\n` escapes become line breaks either way.
pub fn unwrap_body(body: &str) -> String {
    let mut current = body.trim().to_string();

    for _ in 0..MAX_UNWRAP_DEPTH {
        if !looks_like_json_object(&current) {
            break;
        }
        match parse_envelope(&current).and_then(|envelope| envelope.body) {
            Some(inner) => current = inner.trim().to_string(),
            None => break,
        }
    }

    unescape_newlines(strip_wrapping_quotes(&current))
}
