//! Error types for scanning

use rgscan_loudness::LoudnessError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for scan operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Per-track and tag-write failures
///
/// None of these abort a job; they are recorded on the track and counted.
#[derive(Error, Debug)]
pub enum ScanError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Container could not be probed or holds no audio track
    #[error("Unreadable file {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// Codec or container not supported by the decoding backend
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoding error
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// The stream ended before any frame was decoded
    #[error("No decodable audio frames in {0}")]
    NoFrames(PathBuf),

    /// Loudness measurement failed
    #[error(transparent)]
    Loudness(#[from] LoudnessError),

    /// Operation called in the wrong track state
    #[error("Invalid track state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    /// Tag reading error
    #[error("Failed to read audio tags: {0}")]
    TagReadError(String),

    /// Tag writing error
    #[error("Failed to write audio tags: {0}")]
    TagWriteError(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<symphonia::core::errors::Error> for ScanError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        use symphonia::core::errors::Error as SymphoniaError;
        match err {
            SymphoniaError::Unsupported(what) => Self::UnsupportedFormat(what.to_string()),
            SymphoniaError::IoError(e) => Self::Io(e),
            other => Self::DecodeError(other.to_string()),
        }
    }
}

impl From<lofty::error::LoftyError> for ScanError {
    fn from(err: lofty::error::LoftyError) -> Self {
        Self::TagReadError(err.to_string())
    }
}
