//! Integration tests for the four-stage pipeline: split, fix, dedup, assemble.

use std::path::Path;

use assert_fs::prelude::*;
use predicates::prelude::*;

use mboxmend::parser::eml::parse_message;
use mboxmend::split::split_messages;
use mboxmend::{assemble, datefix, dedup, split};

/// No-op progress callback for batch runs.
fn no_progress() -> impl Fn(usize, usize) {
    |_, _| {}
}

fn write_eml(dir: &assert_fs::TempDir, name: &str, content: &str) {
    dir.child(name).write_str(content).unwrap();
}

// ─── Split / assemble round-trip ────────────────────────────────────

#[test]
fn test_assemble_then_split_round_trips() {
    let input = assert_fs::TempDir::new().unwrap();
    let originals = [
        (
            "a.eml",
            "From: alice@example.com\nTo: bob@example.com\nSubject: First\nDate: Thu, 04 Jan 2024 10:00:00 +0000\nMessage-ID: <m1@x>\n\nHello world\n",
        ),
        (
            "b.eml",
            "From: bob@example.com\nSubject: Second\nDate: Fri, 05 Jan 2024 09:00:00 +0000\n\nFrom here on, everything changed\nplain line\n",
        ),
        (
            "c.eml",
            "From: carol@example.com\nSubject: Third\nDate: Sat, 06 Jan 2024 08:00:00 +0000\n\nSiste melding\n",
        ),
    ];
    for (name, content) in &originals {
        write_eml(&input, name, content);
    }

    let mbox_path = input.path().join("out.mbox");
    let stats = assemble::assemble_directory(input.path(), &mbox_path, &no_progress()).unwrap();
    assert_eq!(stats.written, 3);

    let mbox_text = std::fs::read_to_string(&mbox_path).unwrap();
    let segments = split_messages(&mbox_text);
    assert_eq!(segments.len(), 3);

    // Messages come back in date order; compare against the originals with
    // the symmetric `From ` escaping applied.
    for ((_, original), segment) in originals.iter().zip(&segments) {
        let escaped: String = original
            .lines()
            .map(|line| {
                if line.starts_with("From ") {
                    format!(">{line}\n")
                } else {
                    format!("{line}\n")
                }
            })
            .collect();
        assert_eq!(segment.trim_end(), escaped.trim_end());
    }
}

#[test]
fn test_split_writes_counter_suffixed_files() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let mbox = tmp.child("archive.mbox");
    mbox.write_str(concat!(
        "From alice@example.com Thu Jan 04 10:00:00 2024\n",
        "From: alice@example.com\n",
        "Subject: Hei\n",
        "Date: Thu, 04 Jan 2024 10:00:00 +0000\n",
        "\n",
        "Body one\n",
        "\n",
        "From bob@example.com Fri Jan 05 09:00:00 2024\n",
        "From: bob@example.com\n",
        "Subject: Hei\n",
        "Date: Fri, 05 Jan 2024 09:00:00 +0000\n",
        "\n",
        "Body two\n",
    ))
    .unwrap();

    let out = tmp.child("out");
    let stats = split::split_mbox_file(mbox.path(), out.path(), &no_progress()).unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.written, 2);

    out.child("20240104_100000_Hei_1.eml")
        .assert(predicate::path::exists());
    out.child("20240105_090000_Hei_2.eml")
        .assert(predicate::path::exists());
}

#[test]
fn test_split_unsplittable_input_yields_zero() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let mbox = tmp.child("junk.mbox");
    mbox.write_str("no separators in here\njust text\n").unwrap();

    let out = tmp.child("out");
    let stats = split::split_mbox_file(mbox.path(), out.path(), &no_progress()).unwrap();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.written, 0);
}

// ─── Date fixer ─────────────────────────────────────────────────────

#[test]
fn test_fix_recovers_body_date_over_filename() {
    let input = assert_fs::TempDir::new().unwrap();
    // Broken Date header, body date, and an unrelated filename date: the
    // body must win.
    write_eml(
        &input,
        "20190715_000000_x_1.eml",
        "From: a@b.com\nSubject: x\nDate: not a date\n\nsent 1 November 2021 20:00\n",
    );

    let output = assert_fs::TempDir::new().unwrap();
    let stats = datefix::fix_directory(input.path(), output.path(), &no_progress()).unwrap();
    assert_eq!(stats.processed, 1);
    assert!(stats.failed.is_empty());

    let fixed = std::fs::read_to_string(output.path().join("20190715_000000_x_1.eml")).unwrap();
    let msg = parse_message(&fixed);
    assert_eq!(
        msg.headers.get("Date"),
        Some("Mon, 1 Nov 2021 20:00:00 +0000")
    );
    // The synthetic provenance chain is present
    assert_eq!(msg.headers.get_all("Received").count(), 3);
}

#[test]
fn test_fix_valid_header_passes_through_exactly() {
    let input = assert_fs::TempDir::new().unwrap();
    write_eml(
        &input,
        "m.eml",
        "From: a@b.com\nSubject: x\nDate: Thu, 04 Jan 2024 10:00:00 +0100\n\nbody says 1 November 2021\n",
    );

    let output = assert_fs::TempDir::new().unwrap();
    datefix::fix_directory(input.path(), output.path(), &no_progress()).unwrap();

    let fixed = std::fs::read_to_string(output.path().join("m.eml")).unwrap();
    let msg = parse_message(&fixed);
    assert_eq!(
        msg.headers.get("Date"),
        Some("Thu, 4 Jan 2024 10:00:00 +0100")
    );
}

#[test]
fn test_fix_unresolvable_file_fails_without_aborting_batch() {
    let input = assert_fs::TempDir::new().unwrap();
    write_eml(&input, "hopeless.eml", "Subject: hei\n\nnothing datelike\n");
    write_eml(
        &input,
        "fine.eml",
        "Subject: ok\nDate: Thu, 04 Jan 2024 10:00:00 +0000\n\nbody\n",
    );

    let output = assert_fs::TempDir::new().unwrap();
    let stats = datefix::fix_directory(input.path(), output.path(), &no_progress()).unwrap();

    assert_eq!(stats.processed, 1);
    assert_eq!(stats.failed.len(), 1);
    assert_eq!(stats.failed[0].0, Path::new("hopeless.eml"));
    output.child("fine.eml").assert(predicate::path::exists());
    output
        .child("hopeless.eml")
        .assert(predicate::path::missing());
}

#[test]
fn test_fix_preserves_multipart_structure() {
    let input = assert_fs::TempDir::new().unwrap();
    let payload = concat!(
        "--bb\n",
        "Content-Type: text/plain\n",
        "\n",
        "del en\n",
        "--bb\n",
        "Content-Type: application/pdf\n",
        "Content-Transfer-Encoding: base64\n",
        "\n",
        "JVBERi0=\n",
        "--bb--\n",
    );
    write_eml(
        &input,
        "m.eml",
        &format!(
            "From: a@b.com\nDate: Thu, 04 Jan 2024 10:00:00 +0000\nContent-Type: multipart/mixed; boundary=bb\n\n{payload}"
        ),
    );

    let output = assert_fs::TempDir::new().unwrap();
    datefix::fix_directory(input.path(), output.path(), &no_progress()).unwrap();

    let fixed = std::fs::read_to_string(output.path().join("m.eml")).unwrap();
    // Payload is copied through verbatim, boundary included.
    assert!(fixed.ends_with(payload));
    assert!(fixed.contains("Content-Type: multipart/mixed; boundary=bb\n"));
}

// ─── Deduplicator ───────────────────────────────────────────────────

#[test]
fn test_dedup_same_message_id_different_bodies() {
    let input = assert_fs::TempDir::new().unwrap();
    write_eml(
        &input,
        "a.eml",
        "From: a@b.com\nMessage-ID: <m@x>\n\nbody with blåbær\n",
    );
    write_eml(
        &input,
        "b.eml",
        "From: a@b.com\nMessage-ID: <M@X>\n\nre-encoded body, bl?b?r\n",
    );

    let output = assert_fs::TempDir::new().unwrap();
    let stats = dedup::dedup_directory(input.path(), output.path(), &no_progress()).unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.kept, 1);
    assert_eq!(stats.duplicates_removed, 1);
    assert_eq!(stats.groups.len(), 1);
}

#[test]
fn test_dedup_composite_key_without_message_id() {
    let input = assert_fs::TempDir::new().unwrap();
    let headers = "From: a@b.com\nTo: c@d.com\nDate: Thu, 04 Jan 2024 10:00:00 +0000\n";
    write_eml(&input, "a.eml", &format!("{headers}\nfirst copy\n"));
    write_eml(&input, "b.eml", &format!("{headers}\nsecond copy\n"));
    write_eml(
        &input,
        "c.eml",
        "From: other@b.com\nTo: c@d.com\nDate: Thu, 04 Jan 2024 10:00:00 +0000\n\nnot a duplicate\n",
    );

    let output = assert_fs::TempDir::new().unwrap();
    let stats = dedup::dedup_directory(input.path(), output.path(), &no_progress()).unwrap();

    assert_eq!(stats.kept, 2);
    assert_eq!(stats.duplicates_removed, 1);
}

#[test]
fn test_dedup_prefers_clean_decode_over_short_path() {
    let input = assert_fs::TempDir::new().unwrap();
    // Corrupted copy at a short path, clean copy at a much longer one.
    write_eml(
        &input,
        "a.eml",
        "Message-ID: <m@x>\n\nbody \u{FFFD}\u{FFFD}\u{FFFD}\n",
    );
    input
        .child("deep/nested/folder/with/a/very/long/name/clean-copy-of-message.eml")
        .write_str("Message-ID: <m@x>\n\nbody intact\n")
        .unwrap();

    let output = assert_fs::TempDir::new().unwrap();
    let stats = dedup::dedup_directory(input.path(), output.path(), &no_progress()).unwrap();

    assert_eq!(stats.kept, 1);
    output
        .child("deep/nested/folder/with/a/very/long/name/clean-copy-of-message.eml")
        .assert(predicate::path::exists());
    output.child("a.eml").assert(predicate::path::missing());
}

#[test]
fn test_dedup_is_idempotent() {
    let input = assert_fs::TempDir::new().unwrap();
    write_eml(&input, "a.eml", "Message-ID: <m1@x>\n\none\n");
    write_eml(&input, "b.eml", "Message-ID: <m1@x>\n\ntwo\n");
    write_eml(&input, "c.eml", "Message-ID: <m2@x>\n\nthree\n");

    let first = assert_fs::TempDir::new().unwrap();
    let stats1 = dedup::dedup_directory(input.path(), first.path(), &no_progress()).unwrap();
    assert_eq!(stats1.kept, 2);

    let second = assert_fs::TempDir::new().unwrap();
    let stats2 = dedup::dedup_directory(first.path(), second.path(), &no_progress()).unwrap();
    assert_eq!(stats2.total, 2);
    assert_eq!(stats2.kept, 2);
    assert_eq!(stats2.duplicates_removed, 0);
    assert!(stats2.groups.is_empty());
}

#[test]
fn test_dedup_copies_winner_byte_for_byte() {
    let input = assert_fs::TempDir::new().unwrap();
    let content = "Message-ID: <m@x>\nContent-Transfer-Encoding: base64\n\nSGVsbG8=\n";
    write_eml(&input, "a.eml", content);

    let output = assert_fs::TempDir::new().unwrap();
    dedup::dedup_directory(input.path(), output.path(), &no_progress()).unwrap();

    let copied = std::fs::read_to_string(output.path().join("a.eml")).unwrap();
    assert_eq!(copied, content);
}

// ─── Assembler ordering ─────────────────────────────────────────────

#[test]
fn test_assemble_orders_by_date_ascending() {
    let input = assert_fs::TempDir::new().unwrap();
    write_eml(
        &input,
        "newest.eml",
        "From: a@b.com\nSubject: s2021\nDate: Mon, 01 Mar 2021 12:00:00 +0000\n\nx\n",
    );
    write_eml(
        &input,
        "oldest.eml",
        "From: a@b.com\nSubject: s2019\nDate: Mon, 15 Jul 2019 12:00:00 +0000\n\nx\n",
    );
    write_eml(
        &input,
        "middle.eml",
        "From: a@b.com\nSubject: s2020\nDate: Wed, 01 Jan 2020 12:00:00 +0000\n\nx\n",
    );

    let mbox_path = input.path().join("out.mbox");
    assemble::assemble_directory(input.path(), &mbox_path, &no_progress()).unwrap();

    let text = std::fs::read_to_string(&mbox_path).unwrap();
    let p2019 = text.find("Subject: s2019").unwrap();
    let p2020 = text.find("Subject: s2020").unwrap();
    let p2021 = text.find("Subject: s2021").unwrap();
    assert!(p2019 < p2020 && p2020 < p2021);
}

#[test]
fn test_assemble_uses_sentinel_for_missing_from() {
    let input = assert_fs::TempDir::new().unwrap();
    write_eml(
        &input,
        "m.eml",
        "Subject: no sender\nDate: Thu, 04 Jan 2024 10:00:00 +0000\n\nx\n",
    );

    let mbox_path = input.path().join("out.mbox");
    assemble::assemble_directory(input.path(), &mbox_path, &no_progress()).unwrap();

    let text = std::fs::read_to_string(&mbox_path).unwrap();
    assert!(text.starts_with("From unknown@unknown.com "));
}
