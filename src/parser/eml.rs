//! Parser for individual RFC 5322 messages (`.eml` files, or raw segments
//! produced by the mbox splitter).

use crate::model::message::{Body, HeaderMap, Message};
use crate::parser::header;

/// A text-bearing leaf part collected from a message, in document order.
///
/// The payload is still in its transfer encoding; decoding is the caller's
/// concern (the date fixer runs its own charset chain).
#[derive(Debug, Clone)]
pub struct TextPart {
    /// Lowercased MIME type (`text/plain`, `text/html`).
    pub content_type: String,
    /// Declared charset parameter, if any.
    pub charset: Option<String>,
    /// Content-Transfer-Encoding header value, if any.
    pub transfer_encoding: Option<String>,
    /// Raw payload text.
    pub raw: String,
}

/// Parse raw message text into a [`Message`].
///
/// Headers end at the first blank line; if no blank line exists the whole
/// input is treated as headers (mirroring lenient RFC 5322 parsers). A
/// `multipart/*` Content-Type with a boundary parameter yields a
/// [`Body::Multipart`] whose payload is stored verbatim.
pub fn parse_message(text: &str) -> Message {
    let (header_text, body_text) = split_header_body(text);
    let headers = header::unfold_headers(header_text);

    let body = match multipart_boundary(&headers) {
        Some(boundary) => Body::Multipart {
            boundary,
            raw: body_text.to_string(),
        },
        None => Body::Single(body_text.to_string()),
    };

    Message { headers, body }
}

/// Collect all `text/plain` and `text/html` leaf parts in document order.
///
/// Single-part messages yield one part when their type is textual (an absent
/// Content-Type defaults to `text/plain`). Nested multiparts are descended
/// recursively; non-text leaves (attachments, images) are skipped.
pub fn walk_text_parts(msg: &Message) -> Vec<TextPart> {
    let mut parts = Vec::new();
    collect_text_parts(msg, &mut parts, 0);
    parts
}

/// Recursion guard for pathological nesting.
const MAX_DEPTH: usize = 10;

fn collect_text_parts(msg: &Message, out: &mut Vec<TextPart>, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }

    match &msg.body {
        Body::Single(raw) => {
            let content_type = mime_type(msg.headers.get("Content-Type"));
            if content_type == "text/plain" || content_type == "text/html" {
                out.push(TextPart {
                    content_type,
                    charset: content_type_param(msg.headers.get("Content-Type"), "charset"),
                    transfer_encoding: msg
                        .headers
                        .get("Content-Transfer-Encoding")
                        .map(str::to_string),
                    raw: raw.clone(),
                });
            }
        }
        Body::Multipart { boundary, raw } => {
            for segment in split_multipart(raw, boundary) {
                let sub = parse_message(segment);
                collect_text_parts(&sub, out, depth + 1);
            }
        }
    }
}

/// Split a multipart payload into its sub-part texts.
///
/// Segments are delimited by `--boundary` lines; the preamble (before the
/// first delimiter) and everything after the `--boundary--` terminator are
/// discarded.
fn split_multipart<'a>(raw: &'a str, boundary: &str) -> Vec<&'a str> {
    let delimiter = format!("--{boundary}");
    let terminator = format!("--{boundary}--");

    let mut segments = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut offset = 0;

    for line in raw.split_inclusive('\n') {
        let trimmed = line.trim_end();
        let line_start = offset;
        offset += line.len();

        if trimmed == terminator {
            if let Some(start) = current_start.take() {
                segments.push(&raw[start..line_start]);
            }
            break;
        }
        if trimmed == delimiter {
            if let Some(start) = current_start.take() {
                segments.push(&raw[start..line_start]);
            }
            current_start = Some(offset);
        }
    }

    // Unterminated final part (truncated archives)
    if let Some(start) = current_start {
        segments.push(&raw[start..]);
    }

    segments
}

/// Split raw message text at the first blank line.
fn split_header_body(text: &str) -> (&str, &str) {
    if let Some(pos) = text.find("\r\n\r\n") {
        if text.find("\n\n").map_or(true, |p| pos + 1 <= p) {
            return (&text[..pos], &text[pos + 4..]);
        }
    }
    if let Some(pos) = text.find("\n\n") {
        return (&text[..pos], &text[pos + 2..]);
    }
    (text, "")
}

/// Lowercased MIME type (the part of Content-Type before the first `;`).
///
/// Defaults to `text/plain` when the header is missing.
pub fn mime_type(content_type: Option<&str>) -> String {
    content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "text/plain".to_string())
}

/// Extract a named parameter from a Content-Type header value.
///
/// Handles both quoted and bare forms: `boundary="xyz"` and `boundary=xyz`.
pub fn content_type_param(content_type: Option<&str>, name: &str) -> Option<String> {
    let ct = content_type?;
    for segment in ct.split(';').skip(1) {
        let segment = segment.trim();
        if let Some((key, value)) = segment.split_once('=') {
            if key.trim().eq_ignore_ascii_case(name) {
                let value = value.trim().trim_matches('"').to_string();
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// The multipart boundary, if this message declares one.
fn multipart_boundary(headers: &HeaderMap) -> Option<String> {
    let ct = headers.get("Content-Type")?;
    if !mime_type(Some(ct)).starts_with("multipart/") {
        return None;
    }
    content_type_param(Some(ct), "boundary")
}
