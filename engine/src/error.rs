//! Error types for the Arca engine.

use std::path::PathBuf;
use thiserror::Error;

/// All possible errors from the Arca engine.
#[derive(Debug, Error)]
pub enum Error {
    // Addressing errors
    #[error("invalid {expected} path: '{path}'")]
    InvalidPath {
        /// What the path was expected to address ("collection" or "document")
        expected: &'static str,
        path: String,
    },

    #[error("invalid path segment: '{0}'")]
    InvalidSegment(String),

    // Store errors
    #[error("batch of {0} operations exceeds the commit limit")]
    BatchLimitExceeded(usize),

    #[error("commit {commit} aborted after {applied} applied operations: {source}")]
    CommitFailed {
        /// Zero-based index of the failing commit within the run
        commit: usize,
        /// Operations applied by earlier commits before the abort
        applied: usize,
        /// Run-level index of the rejected operation, when the store names it
        op: Option<usize>,
        source: Box<Error>,
    },

    #[error("store rejected operation on '{path}': {reason}")]
    StoreRejected { path: String, reason: String },

    // Backup unit errors
    #[error("missing backup artifact: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("malformed backup artifact {}: {reason}", path.display())]
    MalformedArtifact { path: PathBuf, reason: String },

    // Environment errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
