//! Owner-scoped recursive deletion.
//!
//! Deletes a chosen set of subcollections under every owner document,
//! depth-first: a child document's own subcollections are deleted before the
//! child itself, so no delete ever orphans reachable descendants. The
//! confirmation gate in front of this tool lives in the CLI; the engine side
//! only distinguishes dry-run from live execution via the batch executor.

use crate::batch::BatchExecutor;
use crate::error::Result;
use crate::path::CollectionPath;
use crate::store::{DocumentStore, WriteOp};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Counts from one clear run. Dry runs report the same numbers without
/// mutating anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Owner documents visited
    pub owners: usize,
    /// Documents deleted (or, in dry-run mode, that would be deleted)
    pub deleted: usize,
}

/// Deletes owner-scoped subcollections.
pub struct Clearer {
    store: Arc<dyn DocumentStore>,
    executor: BatchExecutor,
}

impl Clearer {
    pub fn new(store: Arc<dyn DocumentStore>, dry_run: bool) -> Self {
        let executor = BatchExecutor::new(store.clone(), dry_run);
        Self { store, executor }
    }

    /// Delete every named subcollection under every document of
    /// `owner_collection`. The owner documents themselves are kept.
    pub async fn clear_owner_scoped(
        &self,
        owner_collection: &str,
        subcollection_names: &[String],
    ) -> Result<ClearReport> {
        let owner_path = CollectionPath::new(owner_collection)?;
        // Owner documents may exist only as anchors for their
        // subcollections, so missing ids are owners too.
        let mut owner_ids: Vec<String> = self
            .store
            .list_documents(&owner_path)
            .await?
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        owner_ids.extend(self.store.list_missing_documents(&owner_path).await?);
        owner_ids.sort();

        let mut report = ClearReport {
            owners: owner_ids.len(),
            ..ClearReport::default()
        };
        for owner in &owner_ids {
            let doc_path = owner_path.document(owner)?;
            for name in subcollection_names {
                let deleted = self
                    .delete_collection(doc_path.subcollection(name)?)
                    .await?;
                report.deleted += deleted;
            }
            tracing::info!(owner = %owner, dry_run = self.executor.dry_run(), "owner scope cleared");
        }
        Ok(report)
    }

    /// Depth-first recursive deletion of one collection.
    fn delete_collection(&self, path: CollectionPath) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move {
            let docs = self.store.list_documents(&path).await?;

            let mut deleted = 0;
            let mut ops = Vec::with_capacity(docs.len());
            for doc in &docs {
                let doc_path = path.document(&doc.id)?;
                // Descendants first, then the document itself.
                for name in self.store.list_subcollections(&doc_path).await? {
                    deleted += self
                        .delete_collection(doc_path.subcollection(&name)?)
                        .await?;
                }
                ops.push(WriteOp::Delete { path: doc_path });
            }

            // Missing parents have nothing to delete themselves, but their
            // descendants do.
            for id in self.store.list_missing_documents(&path).await? {
                let doc_path = path.document(&id)?;
                for name in self.store.list_subcollections(&doc_path).await? {
                    deleted += self
                        .delete_collection(doc_path.subcollection(&name)?)
                        .await?;
                }
            }

            self.executor.execute(&ops).await?;
            Ok(deleted + ops.len())
        })
    }
}
