//! Error types for the command-line front end.

use thiserror::Error;

/// Errors that can occur while splitting or rendering.
#[derive(Debug, Error)]
pub enum CliError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed request file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The script is not valid UTF-8.
    #[error("Invalid UTF-8 at byte {0}")]
    InvalidUtf8(usize),

    /// The script ends inside a quote or block comment.
    #[error("Unterminated statement at byte {offset}: {preview}")]
    Unterminated {
        /// Absolute offset of the unparsed tail.
        offset: usize,
        /// Start of the tail.
        preview: String,
    },

    /// A request produced no SQL.
    #[error("Nothing to render: {0}")]
    NothingToRender(String),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
