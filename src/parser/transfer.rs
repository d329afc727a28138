//! Content-Transfer-Encoding decoding.
//!
//! Payloads are decoded to raw bytes here; charset decoding happens in
//! [`crate::datefix::charset`].

/// Decode a payload according to its Content-Transfer-Encoding header value.
///
/// `7bit`, `8bit`, `binary`, and unknown encodings pass the bytes through
/// unchanged.
pub fn decode_payload(body: &str, transfer_encoding: Option<&str>) -> Vec<u8> {
    match transfer_encoding
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        Some("base64") => decode_base64(body.as_bytes()),
        Some("quoted-printable") => decode_quoted_printable(body),
        _ => body.as_bytes().to_vec(),
    }
}

/// Minimal base64 decoder, tolerant of embedded whitespace and line breaks.
///
/// Invalid characters decode as zero rather than failing; a corrupt payload
/// must degrade, not abort the message.
pub fn decode_base64(input: &[u8]) -> Vec<u8> {
    fn val(c: u8) -> Option<u8> {
        match c {
            b'A'..=b'Z' => Some(c - b'A'),
            b'a'..=b'z' => Some(c - b'a' + 26),
            b'0'..=b'9' => Some(c - b'0' + 52),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }

    let mut out = Vec::with_capacity(input.len() / 4 * 3);
    let mut quad = [0u8; 4];
    let mut qi = 0;
    let mut pad = 0;

    for &b in input {
        if b.is_ascii_whitespace() {
            continue;
        }
        if b == b'=' {
            quad[qi] = 0;
            qi += 1;
            pad += 1;
        } else if let Some(v) = val(b) {
            quad[qi] = v;
            qi += 1;
        } else {
            // Skip stray bytes (corrupted archives)
            continue;
        }

        if qi == 4 {
            out.push((quad[0] << 2) | (quad[1] >> 4));
            if pad < 2 {
                out.push((quad[1] << 4) | (quad[2] >> 2));
            }
            if pad < 1 {
                out.push((quad[2] << 6) | quad[3]);
            }
            qi = 0;
            pad = 0;
        }
    }

    out
}

/// Decode quoted-printable (RFC 2045 §6.7).
///
/// Handles soft line breaks (`=\n` and `=\r\n`) and leaves malformed escape
/// sequences in place.
pub fn decode_quoted_printable(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'=' {
            // Soft line break
            if bytes.get(i + 1) == Some(&b'\n') {
                i += 2;
                continue;
            }
            if bytes.get(i + 1) == Some(&b'\r') && bytes.get(i + 2) == Some(&b'\n') {
                i += 3;
                continue;
            }
            if i + 2 < bytes.len() {
                if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                    if let Ok(byte) = u8::from_str_radix(hex, 16) {
                        out.push(byte);
                        i += 3;
                        continue;
                    }
                }
            }
            out.push(b'=');
            i += 1;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    out
}
