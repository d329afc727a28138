//! Stage 2: date recovery and header standardization.
//!
//! For every `.eml` file under the input tree, resolve one authoritative
//! timestamp via the fallback chain in [`chain`], rebuild the message with a
//! minimal standardized header set ([`rebuild`]), and write it to the same
//! relative path under the output tree. A single bad file never aborts the
//! batch.

pub mod chain;
pub mod charset;
pub mod patterns;
pub mod rebuild;

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{MendError, Result};
use crate::parser::eml;

/// Outcome counters for one fixer run.
#[derive(Debug, Default, serde::Serialize)]
pub struct FixStats {
    /// Total `.eml` files found under the input tree.
    pub total: usize,
    /// Files rebuilt and written successfully.
    pub processed: usize,
    /// Per-file failures: relative path and reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// Run the fixer over every `.eml` file under `input_dir`, writing rebuilt
/// messages to the same relative paths under `output_dir`.
///
/// The progress callback receives `(current, total)`.
pub fn fix_directory(
    input_dir: &Path,
    output_dir: &Path,
    progress: &dyn Fn(usize, usize),
) -> Result<FixStats> {
    if !input_dir.exists() {
        return Err(MendError::InputNotFound(input_dir.to_path_buf()));
    }

    let files = collect_eml_files(input_dir);
    let mut stats = FixStats {
        total: files.len(),
        ..FixStats::default()
    };

    for (i, path) in files.iter().enumerate() {
        progress(i, files.len());

        let rel = path.strip_prefix(input_dir).unwrap_or(path);
        match fix_file(path, &output_dir.join(rel)) {
            Ok(()) => stats.processed += 1,
            Err(e) => {
                warn!(path = %rel.display(), error = %e, "Failed to fix message");
                stats.failed.push((rel.to_path_buf(), e.to_string()));
            }
        }
    }
    progress(files.len(), files.len());

    info!(
        processed = stats.processed,
        failed = stats.failed.len(),
        "Fixer pass complete"
    );
    Ok(stats)
}

/// Fix a single message file: resolve its date, rebuild, write.
pub fn fix_file(input: &Path, output: &Path) -> Result<()> {
    let bytes = std::fs::read(input).map_err(|e| MendError::io(input, e))?;
    // Invalid UTF-8 degrades to replacement characters; the dedup stage
    // later uses their count as the quality signal.
    let content = String::from_utf8_lossy(&bytes);

    let msg = eml::parse_message(&content);

    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let resolved = chain::resolve_date(&msg, &filename)
        .ok_or_else(|| MendError::DateUnresolved(input.to_path_buf()))?;

    let rebuilt = rebuild::rebuild_message(&msg, resolved);

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MendError::io(parent, e))?;
    }
    std::fs::write(output, rebuilt.to_text()).map_err(|e| MendError::io(output, e))?;
    Ok(())
}

/// Enumerate `.eml` files under a directory tree, sorted for determinism.
pub fn collect_eml_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("eml"))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
