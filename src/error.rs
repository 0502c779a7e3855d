use std::io;
use thiserror::Error;

/// Errors that can occur while running git or interpreting its output
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepository,

    #[error("Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command '{command}' failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Command '{command}' timed out")]
    Timeout { command: String },

    #[error("Invocation was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Per-line failures from the status parser
///
/// These accumulate alongside whatever parsed cleanly; a single bad line
/// never aborts a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unrecognized status code '{code}' in line: {line}")]
    UnrecognizedStatus { code: String, line: String },

    #[error("Malformed status line: {0}")]
    MalformedLine(String),
}

/// Result type for git operations
pub type Result<T> = std::result::Result<T, GitError>;
