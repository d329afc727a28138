//! Rebuild a message around its resolved date with a standardized header set.
//!
//! Heterogeneous historical sources (different clients, different decades)
//! leave archives with wildly different header shapes. This stage keeps only
//! a minimal core set, replaces the Date header with the canonical resolved
//! form, and attaches a deterministic synthetic relay chain so downstream
//! mail systems accept the message as properly received.

use chrono::{DateTime, FixedOffset};

use crate::datefix::charset;
use crate::model::message::{Body, HeaderMap, Message};
use crate::parser::{eml, transfer};

/// Content-Type applied when a single-part message declared none.
const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=\"UTF-8\"";

/// Build the standardized replacement for `msg`, dated `resolved`.
///
/// Kept headers: From, To, Subject, Message-ID, Date (canonical), Content-Type
/// (verbatim original, including any multipart boundary), MIME-Version and
/// Content-Transfer-Encoding, followed by the synthetic provenance block.
/// A multipart payload is copied through unchanged; a single-part payload is
/// transfer-decoded and charset-decoded to text.
pub fn rebuild_message(msg: &Message, resolved: DateTime<FixedOffset>) -> Message {
    let formatted_date = resolved.to_rfc2822();

    let mut headers = HeaderMap::new();
    headers.push("From", msg.headers.get("From").unwrap_or_default());
    headers.push("To", msg.headers.get("To").unwrap_or_default());
    headers.push("Subject", msg.headers.get("Subject").unwrap_or_default());
    headers.push(
        "Message-ID",
        msg.headers.get("Message-ID").unwrap_or_default(),
    );
    headers.push("Date", formatted_date.clone());
    headers.push(
        "Content-Type",
        msg.headers.get("Content-Type").unwrap_or(DEFAULT_CONTENT_TYPE),
    );
    headers.push("MIME-Version", "1.0");
    headers.push(
        "Content-Transfer-Encoding",
        msg.headers.get("Content-Transfer-Encoding").unwrap_or("7bit"),
    );

    push_provenance_headers(&mut headers, msg, resolved, &formatted_date);

    let body = match &msg.body {
        Body::Multipart { boundary, raw } => Body::Multipart {
            boundary: boundary.clone(),
            raw: raw.clone(),
        },
        Body::Single(raw) => {
            let decoded = transfer::decode_payload(
                raw,
                msg.headers.get("Content-Transfer-Encoding"),
            );
            let charset_param =
                eml::content_type_param(msg.headers.get("Content-Type"), "charset");
            Body::Single(charset::decode_with_fallback(
                &decoded,
                charset_param.as_deref(),
            ))
        }
    };

    Message { headers, body }
}

/// The synthetic Exchange provenance block: directionality markers plus a
/// three-hop Received chain, all stamped with the resolved date.
fn push_provenance_headers(
    headers: &mut HeaderMap,
    msg: &Message,
    resolved: DateTime<FixedOffset>,
    formatted_date: &str,
) {
    headers.push(
        "X-MS-Exchange-Organization-MessageDirectionality",
        "Incoming",
    );
    headers.push("X-MS-Exchange-Organization-AuthAs", "Internal");
    headers.push(
        "X-MS-Exchange-Organization-AuthSource",
        "mail.protection.outlook.com",
    );
    headers.push(
        "X-MS-Exchange-Organization-Network-Message-Id",
        format!(
            "{}-{}",
            resolved.format("%Y%m%d%H%M%S"),
            msg.headers.get("Message-ID").unwrap_or("unknown")
        ),
    );

    // Continuation lines are pre-folded (leading space after each newline).
    headers.push(
        "Received",
        format!(
            "from mail.protection.outlook.com (2603:10a6:e10:20::12)\n by mailbox.outlook.com with HTTPS;\n {formatted_date}"
        ),
    );
    headers.push(
        "Received",
        format!(
            "from exchange.outlook.com (2603:10a6:e10:39::20)\n by mail.protection.outlook.com with Microsoft SMTP Server (version=TLS1_2);\n {formatted_date}"
        ),
    );
    headers.push(
        "Received",
        format!(
            "from smtp.original.com by exchange.outlook.com with Microsoft SMTP Server id 15.20.8272.18;\n {formatted_date}"
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::eml::parse_message;
    use chrono::TimeZone;

    fn resolved() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2021, 11, 1, 20, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_rebuild_header_set() {
        let msg = parse_message(
            "From: a@b.com\nTo: c@d.com\nSubject: Hei\nMessage-ID: <m1@x>\nX-Junk: drop me\nDate: garbage\n\nBody\n",
        );
        let rebuilt = rebuild_message(&msg, resolved());

        assert_eq!(rebuilt.headers.get("From"), Some("a@b.com"));
        assert_eq!(rebuilt.headers.get("Subject"), Some("Hei"));
        assert_eq!(rebuilt.headers.get("X-Junk"), None);
        assert_eq!(rebuilt.headers.get("MIME-Version"), Some("1.0"));
        assert_eq!(rebuilt.headers.get("Content-Transfer-Encoding"), Some("7bit"));
        assert_eq!(
            rebuilt.headers.get("Date"),
            Some("Mon, 1 Nov 2021 20:00:00 +0000")
        );
        assert_eq!(rebuilt.headers.get_all("Received").count(), 3);
        assert_eq!(
            rebuilt.headers.get("X-MS-Exchange-Organization-Network-Message-Id"),
            Some("20211101200000-<m1@x>")
        );
    }

    #[test]
    fn test_rebuild_multipart_payload_untouched() {
        let raw = concat!(
            "From: a@b.com\n",
            "Content-Type: multipart/mixed; boundary=zz\n",
            "\n",
            "--zz\n",
            "Content-Type: text/plain\n",
            "\n",
            "hello\n",
            "--zz--\n",
        );
        let msg = parse_message(raw);
        let rebuilt = rebuild_message(&msg, resolved());

        assert_eq!(
            rebuilt.headers.get("Content-Type"),
            Some("multipart/mixed; boundary=zz")
        );
        assert_eq!(rebuilt.body, msg.body);
    }

    #[test]
    fn test_rebuild_single_part_decoded() {
        let msg = parse_message(
            "From: a@b.com\nContent-Type: text/plain; charset=iso-8859-1\nContent-Transfer-Encoding: quoted-printable\n\nbl=E5b=E6r\n",
        );
        let rebuilt = rebuild_message(&msg, resolved());
        match &rebuilt.body {
            Body::Single(text) => assert_eq!(text, "blåbær\n"),
            other => panic!("expected single body, got {other:?}"),
        }
    }

    #[test]
    fn test_rebuild_defaults() {
        let msg = parse_message("Subject: bare\n\nBody\n");
        let rebuilt = rebuild_message(&msg, resolved());
        assert_eq!(
            rebuilt.headers.get("Content-Type"),
            Some(DEFAULT_CONTENT_TYPE)
        );
        assert_eq!(rebuilt.headers.get("From"), Some(""));
        assert!(rebuilt
            .headers
            .get("X-MS-Exchange-Organization-Network-Message-Id")
            .unwrap()
            .ends_with("-unknown"));
    }
}
