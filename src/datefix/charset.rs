//! Charset decoding chain for message payloads.
//!
//! This function is total: it always returns text. Unrecoverable bytes become
//! U+FFFD replacement characters, whose count later feeds the deduplicator's
//! selection rule.

use tracing::debug;

/// Byte that marks a Latin-1-family payload: `ø` in ISO-8859-1.
///
/// Archives migrated through clients that mislabeled Norwegian text are the
/// motivating corpus; when this byte is present the declared charset is not
/// to be trusted.
const LATIN1_MARKER: u8 = 0xF8;

/// Decode payload bytes to text.
///
/// Chain, first success wins:
/// 1. payload contains 0xF8 → total Latin-1 decode
/// 2. declared charset (via encoding_rs label lookup), strict
/// 3. strict UTF-8
/// 4. windows-1252, then windows-1250, strict
/// 5. Latin-1
/// 6. lossy UTF-8 as last resort
pub fn decode_with_fallback(raw: &[u8], declared_charset: Option<&str>) -> String {
    if raw.contains(&LATIN1_MARKER) {
        debug!("Found 0xF8 byte, forcing Latin-1 decode");
        return decode_latin1(raw);
    }

    if let Some(label) = declared_charset {
        if let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes()) {
            let (decoded, _, had_errors) = encoding.decode(raw);
            if !had_errors {
                return decoded.into_owned();
            }
            debug!(charset = label, "Declared charset failed, trying fallbacks");
        } else {
            debug!(charset = label, "Unknown declared charset label");
        }
    }

    if let Ok(s) = std::str::from_utf8(raw) {
        return s.to_string();
    }

    for encoding in [encoding_rs::WINDOWS_1252, encoding_rs::WINDOWS_1250] {
        let (decoded, _, had_errors) = encoding.decode(raw);
        if !had_errors {
            return decoded.into_owned();
        }
    }

    // Latin-1 maps every byte, so this never fails. Lossy UTF-8 stays as the
    // formal last resort for the empty-input edge.
    if !raw.is_empty() {
        return decode_latin1(raw);
    }
    String::from_utf8_lossy(raw).into_owned()
}

/// Total single-byte Latin-1 decode (every byte maps to U+0000..U+00FF).
fn decode_latin1(raw: &[u8]) -> String {
    raw.iter().map(|&b| b as char).collect()
}

/// Count Unicode replacement characters in already-decoded text.
///
/// The deduplicator compares this first when choosing which duplicate to keep.
pub fn replacement_count(text: &str) -> usize {
    text.matches('\u{FFFD}').count()
}
