//! Stage 1: split an mbox file into individual `.eml` files.
//!
//! The whole archive is read into memory (inputs are bounded personal
//! archives), split at `From ` separator lines, and each message is written
//! verbatim to a filename derived from its date, subject, and a per-run
//! counter.

use std::path::Path;
use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;
use tracing::{info, warn};

use crate::error::{MendError, Result};
use crate::parser::{eml, header};

/// The canonical mbox message boundary: a line beginning `From ` followed by
/// a sender token and date string, recognized only at start-of-line. Body
/// lines that would collide were `>`-escaped by the assembler.
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^From [^\n]*\n").expect("valid regex"));

/// Maximum length of the sanitized subject portion of a filename.
const MAX_SUBJECT_LEN: usize = 50;

/// Outcome counters for one split run.
#[derive(Debug, Default, serde::Serialize)]
pub struct SplitStats {
    /// Messages found in the mbox.
    pub total: usize,
    /// Messages written as `.eml` files.
    pub written: usize,
    /// Messages that could not be written.
    pub failed: usize,
}

/// Split `mbox_path` into one `.eml` file per message under `output_dir`.
///
/// Malformed or unsplittable input yields zero messages, which is reported
/// as success with a zero count. The progress callback receives
/// `(current, total)`.
pub fn split_mbox_file(
    mbox_path: &Path,
    output_dir: &Path,
    progress: &dyn Fn(usize, usize),
) -> Result<SplitStats> {
    if !mbox_path.exists() {
        return Err(MendError::InputNotFound(mbox_path.to_path_buf()));
    }

    let bytes = std::fs::read(mbox_path).map_err(|e| MendError::io(mbox_path, e))?;
    let content = String::from_utf8_lossy(&bytes);
    let messages = split_messages(&content);

    std::fs::create_dir_all(output_dir).map_err(|e| MendError::io(output_dir, e))?;

    let mut stats = SplitStats {
        total: messages.len(),
        ..SplitStats::default()
    };

    for (i, raw) in messages.iter().enumerate() {
        progress(i, messages.len());
        let counter = i + 1;

        let filename = message_filename(raw, counter);
        let path = output_dir.join(&filename);
        match std::fs::write(&path, raw) {
            Ok(()) => stats.written += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to write message");
                stats.failed += 1;
            }
        }
    }
    progress(messages.len(), messages.len());

    info!(
        total = stats.total,
        written = stats.written,
        failed = stats.failed,
        "Split pass complete"
    );
    Ok(stats)
}

/// Split mbox text into trimmed, non-empty raw message texts.
pub fn split_messages(content: &str) -> Vec<&str> {
    SEPARATOR
        .split(content)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Derive the output filename for one raw message.
///
/// `<YYYYMMDD_HHMMSS>[_<sanitized-subject>]_<counter>.eml`, where the date
/// comes from the Date header (current local time when missing or broken)
/// and the subject is dropped when it sanitizes to nothing.
fn message_filename(raw: &str, counter: usize) -> String {
    let msg = eml::parse_message(raw);

    let stamp = match msg.headers.get("Date").and_then(header::parse_date) {
        Some(dt) => dt.format("%Y%m%d_%H%M%S").to_string(),
        // Current time is acceptable here: this only names the file, it
        // never becomes the message's date.
        None => Local::now().format("%Y%m%d_%H%M%S").to_string(),
    };

    let subject = msg
        .headers
        .get("Subject")
        .map(header::decode_encoded_words)
        .unwrap_or_default();
    let safe_subject = sanitize_subject(&subject);

    if safe_subject.is_empty() {
        format!("{stamp}_{counter}.eml")
    } else {
        format!("{stamp}_{safe_subject}_{counter}.eml")
    }
}

/// Replace filesystem-hostile characters with `_`, trim, and cap the length.
fn sanitize_subject(subject: &str) -> String {
    let safe: String = subject
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_SUBJECT_LEN)
        .collect();
    safe.trim().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MBOX: &str = concat!(
        "From alice@example.com Thu Jan 01 00:00:00 2024\n",
        "From: alice@example.com\n",
        "Subject: First\n",
        "Date: Thu, 04 Jan 2024 10:00:00 +0000\n",
        "\n",
        "Hello\n",
        ">From the body, escaped\n",
        "\n",
        "From bob@example.com Fri Jan 02 00:00:00 2024\n",
        "From: bob@example.com\n",
        "Subject: Second\n",
        "\n",
        "World\n",
    );

    #[test]
    fn test_split_messages_count() {
        let messages = split_messages(MBOX);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("From: alice@example.com"));
        assert!(messages[1].starts_with("From: bob@example.com"));
    }

    #[test]
    fn test_split_keeps_escaped_from_lines() {
        let messages = split_messages(MBOX);
        assert!(messages[0].contains(">From the body, escaped"));
    }

    #[test]
    fn test_split_empty_input() {
        assert!(split_messages("").is_empty());
        assert!(split_messages("   \n\n  ").is_empty());
    }

    #[test]
    fn test_separator_only_at_line_start() {
        let text = "From a@b.com Thu Jan 01 00:00:00 2024\nbody mentions From someone here\nmore\n";
        let messages = split_messages(text);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("body mentions From someone"));
    }

    #[test]
    fn test_sanitize_subject() {
        assert_eq!(sanitize_subject("Hello: world!"), "Hello__world_");
        assert_eq!(sanitize_subject("Møte på fredag"), "Møte_på_fredag");
        assert_eq!(sanitize_subject("///"), "___");
        assert_eq!(sanitize_subject(""), "");
    }

    #[test]
    fn test_message_filename_with_date() {
        let raw = "Subject: Hei\nDate: Thu, 04 Jan 2024 10:00:00 +0000\n\nBody\n";
        let name = message_filename(raw, 7);
        assert_eq!(name, "20240104_100000_Hei_7.eml");
    }

    #[test]
    fn test_message_filename_counter_guarantees_uniqueness() {
        let raw = "Subject: Same\nDate: Thu, 04 Jan 2024 10:00:00 +0000\n\nBody\n";
        assert_ne!(message_filename(raw, 1), message_filename(raw, 2));
    }
}
