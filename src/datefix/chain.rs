//! The date-recovery fallback chain.
//!
//! An ordered list of strategies, each a pure function
//! `(&Message, filename) -> Option<DateTime<FixedOffset>>`, composed
//! left-to-right with short-circuit on first success. The order is the
//! trust order: declared header, then body text, then auxiliary headers,
//! then the filename.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use crate::datefix::{charset, patterns};
use crate::model::message::Message;
use crate::parser::{eml, header, transfer};

/// Auxiliary headers scanned in step 3, in order.
const SCAN_HEADERS: [&str; 3] = ["Subject", "Message-ID", "X-Mail-Created-Date"];

type Strategy = fn(&Message, &str) -> Option<DateTime<FixedOffset>>;

/// The chain, in precedence order.
const CHAIN: [(&str, Strategy); 4] = [
    ("date-header", from_date_header),
    ("body-scan", from_body),
    ("header-scan", from_headers),
    ("filename-scan", from_filename),
];

/// Resolve the single authoritative timestamp for a message.
///
/// Returns `None` only when every strategy fails; the caller reports that as
/// a per-file failure rather than inventing a date.
pub fn resolve_date(msg: &Message, filename: &str) -> Option<DateTime<FixedOffset>> {
    for (name, strategy) in CHAIN {
        if let Some(dt) = strategy(msg, filename) {
            debug!(strategy = name, date = %dt.to_rfc3339(), "Resolved date");
            return Some(dt);
        }
    }
    None
}

/// Step 1: the declared Date header, parsed strictly then leniently.
fn from_date_header(msg: &Message, _filename: &str) -> Option<DateTime<FixedOffset>> {
    header::parse_date(msg.headers.get("Date")?)
}

/// Step 2: scan all text parts, in part order, for date-like substrings.
fn from_body(msg: &Message, _filename: &str) -> Option<DateTime<FixedOffset>> {
    for part in eml::walk_text_parts(msg) {
        let raw = transfer::decode_payload(&part.raw, part.transfer_encoding.as_deref());
        let text = charset::decode_with_fallback(&raw, part.charset.as_deref());
        if let Some(dt) = patterns::scan_text(&text) {
            return Some(as_utc(dt));
        }
    }
    None
}

/// Step 3: scan Subject, Message-ID, and the vendor creation-date header.
fn from_headers(msg: &Message, _filename: &str) -> Option<DateTime<FixedOffset>> {
    for name in SCAN_HEADERS {
        if let Some(value) = msg.headers.get(name) {
            if let Some(dt) = patterns::scan_text(value) {
                return Some(as_utc(dt));
            }
        }
    }
    None
}

/// Step 4: scan the filename with the tighter filename pattern sets.
fn from_filename(_msg: &Message, filename: &str) -> Option<DateTime<FixedOffset>> {
    patterns::scan_filename(filename).map(as_utc)
}

/// Scanned dates carry no zone; fix them at +00:00 so the rebuilt Date
/// header is unambiguous.
fn as_utc(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    Utc.from_utc_datetime(&naive).fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::eml::parse_message;

    #[test]
    fn test_valid_header_short_circuits() {
        // Body and filename both contain unrelated dates; the header wins.
        let msg = parse_message(
            "Date: Thu, 04 Jan 2024 10:00:00 +0000\nSubject: x\n\nsent 1 November 2021 20:00\n",
        );
        let dt = resolve_date(&msg, "20190715_000000_x_1.eml").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-04");
    }

    #[test]
    fn test_body_precedes_filename() {
        let msg = parse_message("Subject: x\n\nsent 1 November 2021 20:00\n");
        let dt = resolve_date(&msg, "20190715_000000_x_1.eml").unwrap();
        assert_eq!(
            dt.format("%Y-%m-%d %H:%M").to_string(),
            "2021-11-01 20:00"
        );
    }

    #[test]
    fn test_header_scan_after_body() {
        let msg = parse_message("Subject: statusrapport 24.12.2020\n\nno dates in the body\n");
        let dt = resolve_date(&msg, "nodate.eml").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2020-12-24");
    }

    #[test]
    fn test_filename_last_resort() {
        let msg = parse_message("Subject: hei\n\nno dates anywhere\n");
        let dt = resolve_date(&msg, "backup-2021-11-01.eml").unwrap();
        assert_eq!(
            dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2021-11-01 00:00:00"
        );
    }

    #[test]
    fn test_total_failure() {
        let msg = parse_message("Subject: hei\n\nnothing datelike\n");
        assert!(resolve_date(&msg, "untitled.eml").is_none());
    }

    #[test]
    fn test_determinism() {
        let msg = parse_message("Subject: x\n\nmøte 17. mai 2015 14:30 og 3 Mar 2019\n");
        let first = resolve_date(&msg, "x.eml").unwrap();
        for _ in 0..3 {
            assert_eq!(resolve_date(&msg, "x.eml").unwrap(), first);
        }
    }

    #[test]
    fn test_multipart_body_scan_in_part_order() {
        let raw = concat!(
            "Content-Type: multipart/alternative; boundary=bb\n",
            "\n",
            "--bb\n",
            "Content-Type: text/plain\n",
            "\n",
            "ingen dato her\n",
            "--bb\n",
            "Content-Type: text/html\n",
            "\n",
            "<p>sendt 5 June 2020</p>\n",
            "--bb--\n",
        );
        let msg = parse_message(raw);
        let dt = resolve_date(&msg, "x.eml").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2020-06-05");
    }
}
