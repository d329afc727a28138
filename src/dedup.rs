//! Stage 3: remove duplicate messages.
//!
//! Messages are grouped by an identity key that deliberately ignores the
//! body: the same logical email re-encoded by two clients differs in body
//! bytes but not in Message-ID or in its From/To/Date tuple. Within a group
//! the cleanest copy (fewest replacement characters) survives.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::datefix::{self, charset};
use crate::error::{MendError, Result};
use crate::model::message::Message;
use crate::parser::eml;

/// A message file competing within a duplicate group.
#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    rel: PathBuf,
    /// U+FFFD count in the file content, the decode-quality signal.
    replacements: usize,
}

/// One group of duplicates, reported in the run summary.
#[derive(Debug, serde::Serialize)]
pub struct DuplicateGroup {
    /// The shared identity key.
    pub key: String,
    /// Path of the surviving copy.
    pub kept: PathBuf,
    /// Paths of the dropped copies.
    pub dropped: Vec<PathBuf>,
}

/// Outcome counters for one deduplication run.
#[derive(Debug, Default, serde::Serialize)]
pub struct DedupStats {
    /// Total `.eml` files examined.
    pub total: usize,
    /// Files that could not be read or keyed.
    pub failed: usize,
    /// Files copied to the output tree (one per group).
    pub kept: usize,
    /// Copies dropped as duplicates.
    pub duplicates_removed: usize,
    /// Detail for every group that had more than one member.
    pub groups: Vec<DuplicateGroup>,
}

/// Deduplicate every `.eml` file under `input_dir` into `output_dir`.
///
/// The winner of each group is copied byte-for-byte to the same relative
/// path it held in the input tree. The progress callback receives
/// `(current, total)`.
pub fn dedup_directory(
    input_dir: &Path,
    output_dir: &Path,
    progress: &dyn Fn(usize, usize),
) -> Result<DedupStats> {
    if !input_dir.exists() {
        return Err(MendError::InputNotFound(input_dir.to_path_buf()));
    }

    let files = datefix::collect_eml_files(input_dir);
    let mut stats = DedupStats {
        total: files.len(),
        ..DedupStats::default()
    };

    // Group in first-seen key order so summaries are deterministic.
    let mut key_order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Candidate>> = HashMap::new();

    for (i, path) in files.iter().enumerate() {
        progress(i, files.len());

        let content = match std::fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read message");
                stats.failed += 1;
                continue;
            }
        };

        let msg = eml::parse_message(&content);
        let key = identity_key(&msg);
        let rel = path.strip_prefix(input_dir).unwrap_or(path).to_path_buf();
        let candidate = Candidate {
            path: path.clone(),
            rel,
            replacements: charset::replacement_count(&content),
        };

        if !groups.contains_key(&key) {
            key_order.push(key.clone());
        }
        groups.entry(key).or_default().push(candidate);
    }
    progress(files.len(), files.len());

    for key in key_order {
        let members = &groups[&key];
        let winner = select_best(members);

        if members.len() > 1 {
            debug!(
                key = %key,
                copies = members.len(),
                kept = %winner.path.display(),
                "Duplicate group"
            );
            stats.duplicates_removed += members.len() - 1;
            stats.groups.push(DuplicateGroup {
                key: key.clone(),
                kept: winner.rel.clone(),
                dropped: members
                    .iter()
                    .filter(|c| c.path != winner.path)
                    .map(|c| c.rel.clone())
                    .collect(),
            });
        }

        let dest = output_dir.join(&winner.rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MendError::io(parent, e))?;
        }
        // Byte-for-byte copy: the winner is never re-parsed or re-encoded.
        std::fs::copy(&winner.path, &dest).map_err(|e| MendError::io(&winner.path, e))?;
        stats.kept += 1;
    }

    info!(
        total = stats.total,
        kept = stats.kept,
        duplicates_removed = stats.duplicates_removed,
        "Dedup pass complete"
    );
    Ok(stats)
}

/// Identity key for grouping: lowercased Message-ID when present, otherwise
/// the `from|to|date` composite. Body content never participates.
pub fn identity_key(msg: &Message) -> String {
    let message_id = msg.headers.get("Message-ID").unwrap_or("").trim();
    if !message_id.is_empty() {
        return message_id.to_lowercase();
    }

    let from = msg.headers.get("From").unwrap_or("").trim().to_lowercase();
    let to = msg.headers.get("To").unwrap_or("").trim().to_lowercase();
    let date = msg.headers.get("Date").unwrap_or("").trim();
    format!("{from}|{to}|{date}")
}

/// Pick the group member with the fewest replacement characters, then the
/// shortest path, then the lexicographically smallest path. Total order, so
/// the choice is deterministic regardless of discovery order.
fn select_best(members: &[Candidate]) -> &Candidate {
    members
        .iter()
        .min_by_key(|c| {
            let path = c.path.to_string_lossy();
            (c.replacements, path.len(), path.into_owned())
        })
        .expect("group is never empty")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::eml::parse_message;

    fn candidate(path: &str, replacements: usize) -> Candidate {
        Candidate {
            path: PathBuf::from(path),
            rel: PathBuf::from(path),
            replacements,
        }
    }

    #[test]
    fn test_key_prefers_message_id() {
        let msg = parse_message("Message-ID: <ABC@x.com>\nFrom: a@b.com\n\nbody\n");
        assert_eq!(identity_key(&msg), "<abc@x.com>");
    }

    #[test]
    fn test_key_composite_fallback() {
        let msg = parse_message(
            "From: Alice <A@B.com>\nTo: C@D.com\nDate: Thu, 04 Jan 2024 10:00:00 +0000\n\nbody\n",
        );
        assert_eq!(
            identity_key(&msg),
            "alice <a@b.com>|c@d.com|Thu, 04 Jan 2024 10:00:00 +0000"
        );
    }

    #[test]
    fn test_key_ignores_body() {
        let a = parse_message("Message-ID: <m@x>\n\nbody one\n");
        let b = parse_message("Message-ID: <m@x>\n\nentirely different body\n");
        assert_eq!(identity_key(&a), identity_key(&b));
    }

    #[test]
    fn test_select_replacements_before_path_length() {
        let members = vec![
            candidate("short.eml", 3),
            candidate(
                "a/very/long/path/that/is/much/longer/than/the/other/one.eml",
                0,
            ),
        ];
        let winner = select_best(&members);
        assert_eq!(winner.replacements, 0);
    }

    #[test]
    fn test_select_path_length_tiebreak() {
        let members = vec![candidate("aa/bb/cc.eml", 1), candidate("aa.eml", 1)];
        assert_eq!(select_best(&members).path, PathBuf::from("aa.eml"));
    }

    #[test]
    fn test_select_lexicographic_final_tiebreak() {
        let members = vec![candidate("b.eml", 0), candidate("a.eml", 0)];
        assert_eq!(select_best(&members).path, PathBuf::from("a.eml"));
    }
}
