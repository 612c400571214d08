//! Incremental HTML Extraction
//!
//! Pulls the best-available HTML document out of a (possibly still growing)
//! model response. [`extract_html`] is called on every new prefix of the same
//! response, so it is pure and keeps no history: before a fence closes it may
//! return the loose text, and it switches to the exact fenced payload once the
//! closing fence arrives.

use std::sync::LazyLock;

use base64::Engine;
use regex::Regex;

/// Doctype declaration that marks the start of an HTML document
static DOCTYPE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<!doctype\s+html").expect("valid doctype regex"));

/// A closed fenced block with an optional language tag.
///
/// The tag, the newline after the opening fence and the newline before the
/// closing fence belong to the delimiters, not the payload.
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_+.-]*)[ \t]*\r?\n?(.*?)\r?\n?```")
        .expect("valid fence regex")
});

/// Whether the text contains an HTML document marker
#[must_use]
pub fn has_html_marker(text: &str) -> bool {
    DOCTYPE_MARKER.is_match(text)
}

/// Extract the HTML payload from accumulated response text
///
/// Returns `None` until the doctype marker appears. Afterwards returns, in
/// order of preference:
/// 1. the interior of the first closed fenced block containing the marker
/// 2. the interior of the first closed block tagged `html`
/// 3. the whole accumulated text (the stream may be mid-fence)
#[must_use]
pub fn extract_html(accumulated: &str) -> Option<String> {
    if !has_html_marker(accumulated) {
        return None;
    }

    let mut first_tagged: Option<&str> = None;
    for caps in FENCED_BLOCK.captures_iter(accumulated) {
        let Some(body) = caps.get(2) else { continue };
        let body = body.as_str();
        if has_html_marker(body) {
            return Some(body.to_string());
        }
        let tagged_html = caps
            .get(1)
            .is_some_and(|tag| tag.as_str().eq_ignore_ascii_case("html"));
        if first_tagged.is_none() && tagged_html {
            first_tagged = Some(body);
        }
    }

    Some(first_tagged.unwrap_or(accumulated).to_string())
}

/// Encode an HTML document as a `data:` URL for an iframe preview
#[must_use]
pub fn to_data_url(html: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(html.as_bytes());
    format!("data:text/html;charset=utf-8;base64,{encoded}")
}
