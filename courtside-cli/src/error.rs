//! Error types for the Courtside CLI.

use courtside_push::PushError;
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types.
#[derive(Debug, Error)]
pub enum CliError {
    /// Push subsystem error (configuration, keys, delivery setup)
    #[error("{0}")]
    Push(#[from] PushError),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON input
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        /// File being read
        path: String,
        /// Parser error
        source: serde_json::Error,
    },

    /// Output could not be encoded
    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
