//! Migration from legacy flat collections into the owner-scoped layout.
//!
//! Legacy layouts kept `directories`, `documents` and `quizzes` as flat
//! top-level collections with an owner field on every document. The current
//! layout nests them per owner: `owners/{owner}/{collection}/{id}`. The
//! migrator copies documents across, field maps unchanged, and can delete
//! the originals once the copies for a collection have committed.
//!
//! Collections migrate in a fixed order because later ones may reference the
//! owner scope established by earlier ones. One collection's failure never
//! aborts the run; every run reports per-collection counts for all
//! configured collections.

use crate::batch::BatchExecutor;
use crate::error::Result;
use crate::path::{CollectionPath, DocumentPath};
use crate::store::{DocumentStore, WriteOp};
use serde::Serialize;
use std::sync::Arc;

/// Source collections, in dependency order.
pub const MIGRATION_ORDER: [&str; 3] = ["directories", "documents", "quizzes"];

/// Top-level collection that scopes migrated data per owner.
pub const OWNERS_COLLECTION: &str = "owners";

/// Per-source-collection counters for one migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    pub collection: String,
    pub total: usize,
    pub migrated: usize,
    pub errors: usize,
}

/// Counters for every configured collection, in migration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSummary {
    pub records: Vec<MigrationRecord>,
}

impl MigrationSummary {
    pub fn total_migrated(&self) -> usize {
        self.records.iter().map(|r| r.migrated).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.records.iter().map(|r| r.errors).sum()
    }
}

/// Copies flat collections into the owner-scoped layout.
pub struct Migrator {
    store: Arc<dyn DocumentStore>,
    executor: BatchExecutor,
}

impl Migrator {
    pub fn new(store: Arc<dyn DocumentStore>, dry_run: bool) -> Self {
        let executor = BatchExecutor::new(store.clone(), dry_run);
        Self { store, executor }
    }

    /// Migrate every collection in [`MIGRATION_ORDER`].
    pub async fn migrate_all(
        &self,
        owner_field: &str,
        delete_originals: bool,
    ) -> MigrationSummary {
        let mut records = Vec::with_capacity(MIGRATION_ORDER.len());
        for collection in MIGRATION_ORDER {
            records.push(
                self.migrate_collection(collection, owner_field, delete_originals)
                    .await,
            );
        }
        MigrationSummary { records }
    }

    /// Migrate one source collection.
    ///
    /// A document without the owner field is skipped and counted as an
    /// error. A failure that prevents the collection from migrating at all
    /// (listing or committing) is logged and reported as a single error so
    /// the run can continue with the remaining collections.
    pub async fn migrate_collection(
        &self,
        collection: &str,
        owner_field: &str,
        delete_originals: bool,
    ) -> MigrationRecord {
        match self
            .try_migrate_collection(collection, owner_field, delete_originals)
            .await
        {
            Ok(record) => record,
            Err(err) => {
                tracing::error!(collection, error = %err, "collection migration failed");
                MigrationRecord {
                    collection: collection.to_string(),
                    total: 0,
                    migrated: 0,
                    errors: 1,
                }
            }
        }
    }

    async fn try_migrate_collection(
        &self,
        collection: &str,
        owner_field: &str,
        delete_originals: bool,
    ) -> Result<MigrationRecord> {
        let source = CollectionPath::new(collection)?;
        let docs = self.store.list_documents(&source).await?;

        let mut errors = 0;
        let mut copies = Vec::new();
        let mut originals = Vec::new();

        for doc in &docs {
            let owner = doc.fields.get(owner_field).and_then(|v| v.as_str());
            let Some(owner) = owner else {
                tracing::warn!(collection, id = %doc.id, owner_field, "missing owner field, skipping");
                errors += 1;
                continue;
            };
            let dest = match self.destination(owner, collection, &doc.id) {
                Ok(dest) => dest,
                Err(err) => {
                    tracing::warn!(collection, id = %doc.id, error = %err, "unusable owner value, skipping");
                    errors += 1;
                    continue;
                }
            };
            copies.push(WriteOp::Set {
                path: dest,
                fields: doc.fields.clone(),
            });
            originals.push(WriteOp::Delete {
                path: source.document(&doc.id)?,
            });
        }

        let migrated = copies.len();
        self.executor.execute(&copies).await?;

        if delete_originals {
            // Originals go only after every copy for this collection has
            // committed.
            self.executor.execute(&originals).await?;
        }

        tracing::info!(
            collection,
            total = docs.len(),
            migrated,
            errors,
            dry_run = self.executor.dry_run(),
            "collection migrated"
        );

        Ok(MigrationRecord {
            collection: collection.to_string(),
            total: docs.len(),
            migrated,
            errors,
        })
    }

    fn destination(&self, owner: &str, collection: &str, id: &str) -> Result<DocumentPath> {
        CollectionPath::new(OWNERS_COLLECTION)?
            .document(owner)?
            .subcollection(collection)?
            .document(id)
    }
}
