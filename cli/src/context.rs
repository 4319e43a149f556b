//! Locally persisted store state.
//!
//! The CLI runs the engine against an in-memory store loaded from plain
//! JSON files under the data directory: the document tree as a store image
//! in `store.json` and the user directory as a flat list in `users.json`.
//! Commands that mutate the store persist both files back when they finish
//! a live run.

use crate::config::Config;
use crate::error::CliError;
use arca_engine::{MemoryAuthStore, MemoryStore, StoreImage, UserRecord};
use std::path::PathBuf;
use std::sync::Arc;

pub struct StoreContext {
    store: Arc<MemoryStore>,
    auth: Arc<MemoryAuthStore>,
    store_file: PathBuf,
    users_file: PathBuf,
}

impl StoreContext {
    /// Load the store image and user directory. Missing files mean an
    /// empty store, not an error.
    pub fn load(config: &Config) -> Result<Self, CliError> {
        let store_file = config.store_file();
        let store = if store_file.is_file() {
            let image = StoreImage::from_json(&std::fs::read_to_string(&store_file)?)?;
            MemoryStore::from_image(&image)?
        } else {
            MemoryStore::new()
        };

        let users_file = config.users_file();
        let auth = if users_file.is_file() {
            let users: Vec<UserRecord> =
                serde_json::from_str(&std::fs::read_to_string(&users_file)?)?;
            MemoryAuthStore::from_users(users)
        } else {
            MemoryAuthStore::new()
        };

        Ok(Self {
            store: Arc::new(store),
            auth: Arc::new(auth),
            store_file,
            users_file,
        })
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        self.store.clone()
    }

    pub fn auth(&self) -> Arc<MemoryAuthStore> {
        self.auth.clone()
    }

    /// Write the current store image and user directory back to disk.
    pub fn persist(&self) -> Result<(), CliError> {
        if let Some(parent) = self.store_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.store_file, self.store.to_image().to_json_pretty()?)?;
        std::fs::write(
            &self.users_file,
            serde_json::to_string_pretty(&self.auth.to_users())?,
        )?;
        Ok(())
    }
}
