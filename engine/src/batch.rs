//! Batched mutation execution.
//!
//! Applies an ordered operation list against the store, split into commits
//! of at most [`BATCH_LIMIT`] operations. Commits run strictly sequentially
//! and in input order; callers that size their batches around the
//! parent-before-child invariant can rely on earlier operations being
//! durable before later ones start.

use crate::error::{Error, Result};
use crate::store::{DocumentStore, WriteOp, BATCH_LIMIT};
use std::sync::Arc;

/// Outcome of an executor run. Dry runs produce the same counts as live
/// runs over the same input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Operations in the input
    pub attempted: usize,
    /// Operations applied (or, in dry-run mode, that would have applied)
    pub applied: usize,
    /// Commits issued (or counted, in dry-run mode)
    pub commits: usize,
}

/// Executes operation lists in bounded, ordered commits.
#[derive(Clone)]
pub struct BatchExecutor {
    store: Arc<dyn DocumentStore>,
    dry_run: bool,
}

impl BatchExecutor {
    pub fn new(store: Arc<dyn DocumentStore>, dry_run: bool) -> Self {
        Self { store, dry_run }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Apply `ops` in `ceil(len / BATCH_LIMIT)` commits.
    ///
    /// The first failing commit aborts the run; the returned error carries
    /// the commit index, how many operations earlier commits had already
    /// applied and, when the store names the rejected operation, its
    /// run-level index. Commits are atomic, so no partially-applied commit
    /// is left behind.
    pub async fn execute(&self, ops: &[WriteOp]) -> Result<BatchReport> {
        let mut report = BatchReport {
            attempted: ops.len(),
            ..BatchReport::default()
        };

        for (index, chunk) in ops.chunks(BATCH_LIMIT).enumerate() {
            if !self.dry_run {
                self.store.commit(chunk).await.map_err(|source| {
                    let op = match &source {
                        Error::StoreRejected { path, .. } => chunk
                            .iter()
                            .position(|candidate| candidate.path().as_str() == path)
                            .map(|offset| report.applied + offset),
                        _ => None,
                    };
                    Error::CommitFailed {
                        commit: index,
                        applied: report.applied,
                        op,
                        source: Box::new(source),
                    }
                })?;
            }
            report.applied += chunk.len();
            report.commits += 1;
            tracing::debug!(
                commit = index,
                ops = chunk.len(),
                dry_run = self.dry_run,
                "batch committed"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StoredDocument;
    use crate::path::{CollectionPath, DocumentPath};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    /// Store double that rejects any commit touching one path.
    struct RejectingStore {
        inner: MemoryStore,
        reject: &'static str,
    }

    #[async_trait]
    impl DocumentStore for RejectingStore {
        async fn list_root_collections(&self) -> Result<Vec<String>> {
            self.inner.list_root_collections().await
        }

        async fn list_documents(&self, path: &CollectionPath) -> Result<Vec<StoredDocument>> {
            self.inner.list_documents(path).await
        }

        async fn get_document(&self, path: &DocumentPath) -> Result<Option<StoredDocument>> {
            self.inner.get_document(path).await
        }

        async fn list_subcollections(&self, path: &DocumentPath) -> Result<Vec<String>> {
            self.inner.list_subcollections(path).await
        }

        async fn list_missing_documents(&self, path: &CollectionPath) -> Result<Vec<String>> {
            self.inner.list_missing_documents(path).await
        }

        async fn commit(&self, ops: &[WriteOp]) -> Result<()> {
            if let Some(op) = ops.iter().find(|op| op.path().as_str() == self.reject) {
                return Err(Error::StoreRejected {
                    path: op.path().as_str().to_string(),
                    reason: "unwritable".into(),
                });
            }
            self.inner.commit(ops).await
        }
    }

    fn deletes(n: usize) -> Vec<WriteOp> {
        (0..n)
            .map(|i| WriteOp::Delete {
                path: DocumentPath::new(format!("notes/doc{i}")).unwrap(),
            })
            .collect()
    }

    #[tokio::test]
    async fn splits_into_bounded_commits() {
        let store = Arc::new(MemoryStore::new());
        let executor = BatchExecutor::new(store, false);

        // 1,200 deletes -> exactly three commits of 500/500/200.
        let report = executor.execute(&deletes(1200)).await.unwrap();
        assert_eq!(report.attempted, 1200);
        assert_eq!(report.applied, 1200);
        assert_eq!(report.commits, 3);
    }

    #[tokio::test]
    async fn empty_input_is_a_noop() {
        let store = Arc::new(MemoryStore::new());
        let executor = BatchExecutor::new(store, false);
        let report = executor.execute(&[]).await.unwrap();
        assert_eq!(report, BatchReport::default());
    }

    #[tokio::test]
    async fn exact_multiple_of_limit() {
        let store = Arc::new(MemoryStore::new());
        let executor = BatchExecutor::new(store, false);
        let report = executor.execute(&deletes(1000)).await.unwrap();
        assert_eq!(report.commits, 2);
        assert_eq!(report.applied, 1000);
    }

    #[tokio::test]
    async fn rejected_operation_is_indexed_across_commits() {
        let store = Arc::new(RejectingStore {
            inner: MemoryStore::new(),
            reject: "notes/doc0610",
        });
        let notes = CollectionPath::new("notes").unwrap();
        let ops: Vec<WriteOp> = (0..700)
            .map(|i| WriteOp::Set {
                path: notes.document(&format!("doc{i:04}")).unwrap(),
                fields: BTreeMap::new(),
            })
            .collect();

        let err = BatchExecutor::new(store, false)
            .execute(&ops)
            .await
            .unwrap_err();
        match err {
            Error::CommitFailed {
                commit,
                applied,
                op,
                source,
            } => {
                assert_eq!(commit, 1);
                assert_eq!(applied, 500);
                assert_eq!(op, Some(610));
                assert!(matches!(*source, Error::StoreRejected { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn dry_run_counts_match_live_counts() {
        let store = Arc::new(MemoryStore::new());
        let notes = CollectionPath::new("notes").unwrap();
        let ops: Vec<WriteOp> = (0..750)
            .map(|i| WriteOp::Set {
                path: notes.document(&format!("doc{i}")).unwrap(),
                fields: BTreeMap::new(),
            })
            .collect();

        let dry = BatchExecutor::new(store.clone(), true)
            .execute(&ops)
            .await
            .unwrap();
        assert!(store
            .list_documents(&notes)
            .await
            .unwrap()
            .is_empty());

        let live = BatchExecutor::new(store.clone(), false)
            .execute(&ops)
            .await
            .unwrap();
        assert_eq!(dry, live);
        assert_eq!(store.list_documents(&notes).await.unwrap().len(), 750);
    }
}
