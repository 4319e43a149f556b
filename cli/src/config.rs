//! Configuration for the CLI, resolved from flags and environment variables.

use std::env;
use std::path::PathBuf;

pub const ENV_DATA_DIR: &str = "ARCA_DATA_DIR";
pub const ENV_PRODUCTION_DATA_DIR: &str = "ARCA_PRODUCTION_DATA_DIR";
pub const ENV_BACKUPS_DIR: &str = "ARCA_BACKUPS_DIR";
pub const ENV_PROJECT_ID: &str = "ARCA_PROJECT_ID";

/// Resolved invocation configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the store image and user directory
    pub data_dir: PathBuf,
    /// Directory holding backup units
    pub backups_dir: PathBuf,
    /// Project identifier stamped into backup metadata
    pub project_id: String,
    /// Whether the production data directory is targeted
    pub production: bool,
    /// Walk every step without writing anywhere
    pub dry_run: bool,
}

impl Config {
    /// Resolve configuration: flags win over environment variables, which
    /// win over defaults. Targeting production requires an explicit
    /// directory; there is no production default to fall into by accident.
    pub fn resolve(
        production: bool,
        dry_run: bool,
        data_dir_flag: Option<PathBuf>,
        backups_dir_flag: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let data_dir = match data_dir_flag {
            Some(dir) => dir,
            None if production => env::var(ENV_PRODUCTION_DATA_DIR)
                .map(PathBuf::from)
                .map_err(|_| ConfigError::MissingProductionDataDir)?,
            None => env::var(ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
        };

        let backups_dir = backups_dir_flag
            .or_else(|| env::var(ENV_BACKUPS_DIR).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("backups"));

        let project_id = env::var(ENV_PROJECT_ID).unwrap_or_else(|_| "arca-local".to_string());

        Ok(Self {
            data_dir,
            backups_dir,
            project_id,
            production,
            dry_run,
        })
    }

    /// The persisted document-store image.
    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }

    /// The persisted user directory.
    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ARCA_PRODUCTION_DATA_DIR environment variable is required with --production")]
    MissingProductionDataDir,
}
