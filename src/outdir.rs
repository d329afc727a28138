//! Output-location derivation for each stage.
//!
//! Every stage writes to a fresh location derived from the input folder name
//! under a stage-numbered prefix directory, with ` (2)`, ` (3)`… suffixing
//! when the target already exists. Inputs are never mutated, so re-running a
//! stage is always safe.

use std::path::{Path, PathBuf};

/// Stage prefix directories, by pipeline position.
pub const STAGE_SPLIT: &str = "0-originals";
pub const STAGE_FIX: &str = "1-fixed";
pub const STAGE_DEDUP: &str = "2-deduplicated";
pub const STAGE_ASSEMBLE: &str = "3-mbox";

/// Default output directory for a stage: `./<stage>/<input-folder-name>`,
/// made unique against existing directories.
pub fn stage_output_dir(input: &Path, stage: &str) -> PathBuf {
    let name = folder_name(input);
    unique_path(&PathBuf::from(stage).join(name))
}

/// Default output file for the assembler: `./3-mbox/<input-folder-name>.mbox`.
pub fn default_mbox_path(input: &Path) -> PathBuf {
    let name = folder_name(input);
    unique_path(&PathBuf::from(STAGE_ASSEMBLE).join(format!("{name}.mbox")))
}

/// Input folder (or file stem) name used to label the output.
fn folder_name(input: &Path) -> String {
    if input.is_file() {
        input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string())
    } else {
        input
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string())
    }
}

/// Append ` (2)`, ` (3)`… until the path no longer exists.
///
/// For files the counter goes before the extension:
/// `2006.mbox` → `2006 (2).mbox`.
pub fn unique_path(base: &Path) -> PathBuf {
    if !base.exists() {
        return base.to_path_buf();
    }

    let parent = base.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = base.extension().map(|e| e.to_string_lossy().into_owned());

    let mut counter = 2;
    loop {
        let candidate_name = match &extension {
            Some(ext) => format!("{stem} ({counter}).{ext}"),
            None => format!("{stem} ({counter})"),
        };
        let candidate = parent.join(candidate_name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
