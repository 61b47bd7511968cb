//! Body renderer: plain body text to HTML plus a plain-text alternative.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::artifacts::unwrap_body;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));

static LINE_BREAK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("line break regex"));

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</p>\s*<p>").expect("paragraph break regex"));

/// Both representations of an email body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedBody {
    pub html: String,
    pub text: String,
}

/// Render a body into HTML and plain text.
///
/// The body may have skipped normalization on its way here, so JSON
/// wrapping, wrapping quotes and literal `\n` escapes are removed first.
pub fn render(body: &str) -> RenderedBody {
    let plain = unwrap_body(body).replace("\r\n", "\n");
    let html = to_html(plain.trim());
    let text = html_to_text(&html);
    RenderedBody { html, text }
}

/// Convert an externally supplied body value into a string.
///
/// Strings pass through; an object with a `body` field yields that field;
/// anything else is an upstream defect and becomes its JSON text.
pub fn coerce_body(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Object(mut map) if map.contains_key("body") => {
            coerce_body(map.remove("body").unwrap_or(Value::Null))
        }
        Value::Null => {
            warn!("Email body was null; using empty body");
            String::new()
        }
        other => {
            warn!(kind = value_kind(&other), "Email body was not a string; coercing");
            other.to_string()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `\n\n` → paragraph boundary, `\n` → `<br>`, wrapped in `<p>`, empty
/// paragraphs dropped.
fn to_html(text: &str) -> String {
    let inner = text.replace("\n\n", "</p><p>").replace('\n', "<br>");
    format!("<p>{inner}</p>").replace("<p></p>", "")
}

/// Strip markup for clients that cannot render HTML.
fn html_to_text(html: &str) -> String {
    let text = PARAGRAPH_BREAK.replace_all(html, "\n\n");
    let text = LINE_BREAK_TAG.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    text.replace("&nbsp;", " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_and_text() {
        let rendered = render("Para one.\n\nPara two.");
        assert_eq!(rendered.html, "<p>Para one.</p><p>Para two.</p>");
        assert_eq!(rendered.text, "Para one.\n\nPara two.");
    }

    #[test]
    fn single_newline_becomes_br() {
        let rendered = render("Hi Bob,\nThanks!");
        assert_eq!(rendered.html, "<p>Hi Bob,<br>Thanks!</p>");
        assert_eq!(rendered.text, "Hi Bob,\nThanks!");
    }

    #[test]
    fn empty_paragraphs_are_removed() {
        let rendered = render("A\n\n\n\nB");
        assert_eq!(rendered.html, "<p>A</p><p>B</p>");
        assert_eq!(render("").html, "");
        assert_eq!(render("").text, "");
    }

    #[test]
    fn json_wrapped_body_is_unwrapped() {
        let rendered = render(r#"{"subject": "S", "body": "Hello\n\nWorld"}"#);
        assert_eq!(rendered.html, "<p>Hello</p><p>World</p>");
    }

    #[test]
    fn quoted_escaped_body_is_cleaned() {
        let rendered = render("\"Line1\\nLine2\"");
        assert_eq!(rendered.html, "<p>Line1<br>Line2</p>");
    }

    #[test]
    fn unparseable_json_like_body_renders_literally() {
        let rendered = render("{not json}");
        assert_eq!(rendered.html, "<p>{not json}</p>");
    }

    #[test]
    fn crlf_is_normalized() {
        assert_eq!(render("A\r\n\r\nB").html, "<p>A</p><p>B</p>");
    }

    #[test]
    fn text_strips_inline_markup_and_nbsp() {
        let rendered = render("<b>Bold</b>&nbsp;move");
        assert_eq!(rendered.html, "<p><b>Bold</b>&nbsp;move</p>");
        assert_eq!(rendered.text, "Bold move");
    }

    #[test]
    fn render_of_text_is_idempotent() {
        for body in ["Para one.\n\nPara two.", "Hi,\nline\n\nBye", "single"] {
            let first = render(body);
            let second = render(&first.text);
            assert_eq!(first, second, "not idempotent for {body:?}");
        }
    }

    #[test]
    fn coerce_body_variants() {
        assert_eq!(coerce_body(Value::String("x".into())), "x");
        assert_eq!(coerce_body(serde_json::json!({"body": "inner"})), "inner");
        assert_eq!(coerce_body(serde_json::json!(42)), "42");
        assert_eq!(coerce_body(Value::Null), "");
        assert_eq!(coerce_body(serde_json::json!(["a"])), r#"["a"]"#);
    }
}
