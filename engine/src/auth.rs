//! Authentication-store export and import.
//!
//! The user directory lives outside the document store; backups carry it as
//! a flat `users.json`. Like the document store, the auth store is an
//! explicit handle so tests and the emulator mode can substitute an
//! in-memory implementation.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One account in the authentication store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            disabled: false,
            created_at: None,
        }
    }
}

/// Interface to the authentication store.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    /// Upsert users by uid; returns how many records were written.
    async fn import_users(&self, users: &[UserRecord]) -> Result<usize>;
}

/// In-memory auth store for the emulator mode and tests.
#[derive(Debug, Default)]
pub struct MemoryAuthStore {
    users: RwLock<BTreeMap<String, UserRecord>>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_users(users: Vec<UserRecord>) -> Self {
        let users = users.into_iter().map(|u| (u.uid.clone(), u)).collect();
        Self {
            users: RwLock::new(users),
        }
    }

    /// Snapshot of all users, ordered by uid. Used for local persistence.
    pub fn to_users(&self) -> Vec<UserRecord> {
        self.users.read().values().cloned().collect()
    }
}

#[async_trait]
impl AuthStore for MemoryAuthStore {
    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        Ok(self.to_users())
    }

    async fn import_users(&self, users: &[UserRecord]) -> Result<usize> {
        let mut map = self.users.write();
        for user in users {
            map.insert(user.uid.clone(), user.clone());
        }
        Ok(users.len())
    }
}
