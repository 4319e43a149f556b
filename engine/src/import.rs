//! Recursive document tree import.
//!
//! Replays an exported tree back into the store. Within each page the parent
//! documents are written and flushed through the batch executor first; only
//! once those sets are committed does the importer descend into the page's
//! subcollections. A child document is therefore never written before its
//! parent exists.
//!
//! Import is idempotent: every write is a full-document overwrite keyed by
//! id, so re-running an import converges instead of duplicating records.

use crate::batch::BatchExecutor;
use crate::document::DocumentBackup;
use crate::error::Result;
use crate::path::CollectionPath;
use crate::store::{WriteOp, BATCH_LIMIT};
use crate::value;
use futures::future::BoxFuture;

/// Counts from one import run. `written` includes nested documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Documents written, at every nesting level
    pub written: usize,
    /// Documents that carried at least one subcollection
    pub with_subcollections: usize,
}

impl ImportReport {
    fn absorb(&mut self, other: ImportReport) {
        self.written += other.written;
        self.with_subcollections += other.with_subcollections;
    }
}

/// Replays exported trees into a target collection.
#[derive(Clone)]
pub struct Importer {
    executor: BatchExecutor,
}

impl Importer {
    pub fn new(executor: BatchExecutor) -> Self {
        Self { executor }
    }

    /// Import `docs` under `target`, subcollections included.
    pub async fn import_collection(
        &self,
        docs: &[DocumentBackup],
        target: &CollectionPath,
    ) -> Result<ImportReport> {
        self.import_inner(docs, target.clone()).await
    }

    fn import_inner<'a>(
        &'a self,
        docs: &'a [DocumentBackup],
        target: CollectionPath,
    ) -> BoxFuture<'a, Result<ImportReport>> {
        Box::pin(async move {
            let mut report = ImportReport::default();

            for page in docs.chunks(BATCH_LIMIT) {
                // Placeholder parents are never written; the store recreates
                // them implicitly once their descendants land.
                let mut ops = Vec::with_capacity(page.len());
                for doc in page.iter().filter(|doc| !doc.missing) {
                    ops.push(WriteOp::Set {
                        path: target.document(&doc.id)?,
                        fields: value::from_portable_fields(&doc.data)?,
                    });
                }
                self.executor.execute(&ops).await?;
                report.written += ops.len();

                // Parents of this page are committed; now their children.
                for doc in page {
                    let Some(subs) = &doc.subcollections else {
                        continue;
                    };
                    if subs.is_empty() {
                        continue;
                    }
                    report.with_subcollections += 1;
                    let doc_path = target.document(&doc.id)?;
                    for (name, sub_docs) in subs {
                        let sub_report = self
                            .import_inner(sub_docs, doc_path.subcollection(name)?)
                            .await?;
                        report.absorb(sub_report);
                    }
                }
            }

            Ok(report)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryStore};
    use crate::value::Value;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn tree() -> Vec<DocumentBackup> {
        let mut a = DocumentBackup::new(
            "a",
            BTreeMap::from([("title".to_string(), serde_json::json!("Hi"))]),
        );
        a.subcollections = Some(BTreeMap::from([(
            "comments".to_string(),
            vec![DocumentBackup::new(
                "c1",
                BTreeMap::from([("text".to_string(), serde_json::json!("ok"))]),
            )],
        )]));
        vec![a]
    }

    #[tokio::test]
    async fn imports_nested_tree() {
        let store = Arc::new(MemoryStore::new());
        let importer = Importer::new(BatchExecutor::new(store.clone(), false));
        let target = CollectionPath::new("notes").unwrap();

        let report = importer.import_collection(&tree(), &target).await.unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.with_subcollections, 1);

        let c1 = store
            .get_document(&crate::path::DocumentPath::new("notes/a/comments/c1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(c1.fields.get("text"), Some(&Value::string("ok")));
    }

    #[tokio::test]
    async fn placeholder_parents_are_not_written() {
        let store = Arc::new(MemoryStore::new());
        let importer = Importer::new(BatchExecutor::new(store.clone(), false));
        let target = CollectionPath::new("notes").unwrap();

        let ghost = DocumentBackup::placeholder(
            "ghost",
            BTreeMap::from([(
                "comments".to_string(),
                vec![DocumentBackup::new(
                    "c1",
                    BTreeMap::from([("text".to_string(), serde_json::json!("ok"))]),
                )],
            )]),
        );

        let report = importer.import_collection(&[ghost], &target).await.unwrap();
        assert_eq!(report.written, 1);

        // The child exists; the placeholder does not.
        assert!(store
            .get_document(&crate::path::DocumentPath::new("notes/ghost").unwrap())
            .await
            .unwrap()
            .is_none());
        assert!(store
            .get_document(&crate::path::DocumentPath::new("notes/ghost/comments/c1").unwrap())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn reimport_converges() {
        let store = Arc::new(MemoryStore::new());
        let importer = Importer::new(BatchExecutor::new(store.clone(), false));
        let target = CollectionPath::new("notes").unwrap();

        let first = importer.import_collection(&tree(), &target).await.unwrap();
        let second = importer.import_collection(&tree(), &target).await.unwrap();
        assert_eq!(first, second);

        let docs = store.list_documents(&target).await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn dry_run_writes_nothing_but_counts_everything() {
        let store = Arc::new(MemoryStore::new());
        let importer = Importer::new(BatchExecutor::new(store.clone(), true));
        let target = CollectionPath::new("notes").unwrap();

        let report = importer.import_collection(&tree(), &target).await.unwrap();
        assert_eq!(report.written, 2);
        assert!(store.list_documents(&target).await.unwrap().is_empty());
    }
}
