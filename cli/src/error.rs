//! Unified error handling for the CLI.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("engine error: {0}")]
    Engine(#[from] arca_engine::Error),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("no backup units found under {}", .0.display())]
    NoBackupUnits(PathBuf),

    #[error("backup unit {} does not exist", .0.display())]
    UnitNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}
