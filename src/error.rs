//! Centralized error types for mboxmend.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxmend library.
#[derive(Error, Debug)]
pub enum MendError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The input path (mbox file or .eml directory) does not exist.
    #[error("Input path not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// A message could not be parsed as an RFC 2822 message.
    #[error("Parse error in '{}': {reason}", path.display())]
    ParseError { path: PathBuf, reason: String },

    /// Every step of the date fallback chain failed for this message.
    #[error("Could not recover a date for '{}'", .0.display())]
    DateUnresolved(PathBuf),

    /// The mbox file produced no messages and does not look like an mbox.
    #[error("File does not appear to be a valid mbox: {}", .0.display())]
    InvalidMbox(PathBuf),
}

/// Convenience alias for `Result<T, MendError>`.
pub type Result<T> = std::result::Result<T, MendError>;

impl MendError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `MendError`
/// when no path context is available (rare — prefer `MendError::io`).
impl From<std::io::Error> for MendError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
