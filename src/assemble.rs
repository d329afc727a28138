//! Stage 4: reassemble a directory of `.eml` files into one mbox stream.
//!
//! Messages are sorted ascending by date — the one place the pipeline
//! guarantees a global order — and each is written behind a synthesized
//! `From ` separator line. Body lines that themselves start with `From `
//! are `>`-escaped so a later split pass round-trips cleanly.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::datefix;
use crate::error::{MendError, Result};
use crate::model::address::EmailAddress;
use crate::parser::{eml, header};

/// Outcome counters for one assemble run.
#[derive(Debug, Default, serde::Serialize)]
pub struct AssembleStats {
    /// `.eml` files found under the input tree.
    pub total: usize,
    /// Messages written to the mbox.
    pub written: usize,
    /// Files skipped (unreadable).
    pub failed: usize,
    /// Size of the finished mbox in bytes.
    pub output_size: u64,
}

struct PendingMessage {
    date: DateTime<Utc>,
    from_address: String,
    path: PathBuf,
    content: String,
}

/// Assemble every `.eml` file under `input_dir` into `output_mbox`.
///
/// The progress callback receives `(current, total)`.
pub fn assemble_directory(
    input_dir: &Path,
    output_mbox: &Path,
    progress: &dyn Fn(usize, usize),
) -> Result<AssembleStats> {
    if !input_dir.exists() {
        return Err(MendError::InputNotFound(input_dir.to_path_buf()));
    }

    let files = datefix::collect_eml_files(input_dir);
    let mut stats = AssembleStats {
        total: files.len(),
        ..AssembleStats::default()
    };

    let mut pending: Vec<PendingMessage> = Vec::with_capacity(files.len());
    for path in &files {
        match load_message(path) {
            Ok(msg) => pending.push(msg),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping message");
                stats.failed += 1;
            }
        }
    }

    // Global ordering guarantee: ascending by date, path as a deterministic
    // secondary key.
    pending.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));

    if let Some(parent) = output_mbox.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MendError::io(parent, e))?;
    }
    let mut out =
        std::fs::File::create(output_mbox).map_err(|e| MendError::io(output_mbox, e))?;

    for (i, msg) in pending.iter().enumerate() {
        progress(i, pending.len());
        write_message(&mut out, msg).map_err(|e| MendError::io(output_mbox, e))?;
        stats.written += 1;
    }
    progress(pending.len(), pending.len());

    stats.output_size = std::fs::metadata(output_mbox)
        .map(|m| m.len())
        .unwrap_or(0);

    info!(
        written = stats.written,
        failed = stats.failed,
        output_size = stats.output_size,
        "Assemble pass complete"
    );
    Ok(stats)
}

/// Read one message and extract what the separator line needs.
fn load_message(path: &Path) -> Result<PendingMessage> {
    let bytes = std::fs::read(path).map_err(|e| MendError::io(path, e))?;
    let content = String::from_utf8_lossy(&bytes).into_owned();
    let msg = eml::parse_message(&content);

    let date = msg
        .headers
        .get("Date")
        .and_then(header::parse_date)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| file_mtime(path))
        .unwrap_or(DateTime::UNIX_EPOCH);

    let from_address = EmailAddress::parse(msg.headers.get("From").unwrap_or(""))
        .separator_address()
        .to_string();

    Ok(PendingMessage {
        date,
        from_address,
        path: path.to_path_buf(),
        content,
    })
}

/// Filesystem modification time, the fallback when the Date header is
/// missing or unparsable.
fn file_mtime(path: &Path) -> Option<DateTime<Utc>> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}

/// Write one separator-prefixed message, `>`-escaping body `From ` lines.
fn write_message(out: &mut impl Write, msg: &PendingMessage) -> std::io::Result<()> {
    writeln!(out, "{}", separator_line(&msg.from_address, msg.date))?;
    for line in msg.content.lines() {
        if line.starts_with("From ") {
            writeln!(out, ">{line}")?;
        } else {
            writeln!(out, "{line}")?;
        }
    }
    writeln!(out)?;
    Ok(())
}

/// The mbox separator: `From <address> Www Mmm dd HH:MM:SS yyyy`.
///
/// chrono's `%a`/`%b` emit fixed English abbreviations, so the line is
/// locale-independent.
fn separator_line(address: &str, date: DateTime<Utc>) -> String {
    format!("From {address} {}", date.format("%a %b %d %H:%M:%S %Y"))
}
