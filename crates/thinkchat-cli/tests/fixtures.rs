//! SSE fixture helpers for integration tests.

#![allow(dead_code)]

use wiremock::ResponseTemplate;

// Load fixture templates at compile time
pub const SSE_TEXT: &str = include_str!("fixtures/gemini_text.sse");
pub const SSE_CHUNKED: &str = include_str!("fixtures/gemini_chunked.sse");
pub const SSE_ERROR: &str = include_str!("fixtures/gemini_error.sse");

/// Create a single-chunk text SSE response with the given content.
pub fn text_sse(text: &str) -> String {
    SSE_TEXT.replace("{{TEXT}}", &escape_json(text))
}

/// Create a two-chunk text SSE response.
pub fn chunked_sse(first: &str, second: &str) -> String {
    SSE_CHUNKED
        .replace("{{TEXT_A}}", &escape_json(first))
        .replace("{{TEXT_B}}", &escape_json(second))
}

/// Wrap SSE body string in a ResponseTemplate.
pub fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body.to_string())
}

/// Convenience: text SSE wrapped in ResponseTemplate.
pub fn text_response(text: &str) -> ResponseTemplate {
    sse_response(&text_sse(text))
}

/// Convenience: mid-stream API error wrapped in ResponseTemplate.
pub fn error_response() -> ResponseTemplate {
    sse_response(SSE_ERROR)
}

/// Escape special characters for JSON string embedding.
fn escape_json(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_sse_substitution() {
        let result = text_sse("Hello, world!");
        assert!(result.contains(r#""text":"Hello, world!""#));
        assert!(result.contains(r#""finishReason":"STOP""#));
    }

    #[test]
    fn test_chunked_sse_substitution() {
        let result = chunked_sse("Hel", "lo");
        assert!(result.contains(r#""text":"Hel""#));
        assert!(result.contains(r#""text":"lo""#));
    }
}
