//! Error types for session persistence.

use thiserror::Error;

use crate::matching::MatchError;

/// Errors that can occur while reading or writing session files.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `.npy` decoding error
    #[error("npy read error: {0}")]
    NpyRead(#[from] ndarray_npy::ReadNpyError),

    /// `.npy` encoding error
    #[error("npy write error: {0}")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),

    /// Array could not take the requested shape
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Preview image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid format structure or content
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },

    /// A line of a text table could not be used
    #[error("Invalid row at line {line}: {message}")]
    InvalidRow {
        /// 1-based line number
        line: usize,
        message: String,
    },

    /// The engine refused the operation
    #[error(transparent)]
    Match(#[from] MatchError),
}

impl FormatError {
    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create an invalid row error.
    pub fn invalid_row(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidRow {
            line,
            message: message.into(),
        }
    }

    /// Whether this error is a missing-volume refusal from the engine.
    pub fn is_prerequisite_missing(&self) -> bool {
        matches!(self, Self::Match(MatchError::PrerequisiteMissing { .. }))
    }
}
