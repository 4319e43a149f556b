//! Shared test doubles and seed helpers.
#![allow(dead_code)]

use arca_engine::{
    CollectionPath, DocumentPath, DocumentStore, MemoryStore, Result, StoredDocument, Value,
    WriteOp,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// One operation as seen by the store, flattened for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedOp {
    pub delete: bool,
    pub path: String,
}

/// Store double that records every committed batch in order while
/// delegating to a real in-memory store.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    commits: Mutex<Vec<Vec<RecordedOp>>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Batches in commit order, each batch in operation order.
    pub fn commits(&self) -> Vec<Vec<RecordedOp>> {
        self.commits.lock().unwrap().clone()
    }

    /// All recorded operations, flattened across commits.
    pub fn flattened(&self) -> Vec<RecordedOp> {
        self.commits().into_iter().flatten().collect()
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
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
        self.commits.lock().unwrap().push(
            ops.iter()
                .map(|op| RecordedOp {
                    delete: op.is_delete(),
                    path: op.path().as_str().to_string(),
                })
                .collect(),
        );
        self.inner.commit(ops).await
    }
}

/// Write a document with plain string fields.
pub async fn seed_doc(store: &dyn DocumentStore, path: &str, fields: &[(&str, &str)]) {
    let op = WriteOp::Set {
        path: DocumentPath::new(path).unwrap(),
        fields: fields
            .iter()
            .map(|(k, v)| (k.to_string(), Value::string(*v)))
            .collect(),
    };
    store.commit(&[op]).await.unwrap();
}

/// Write a document with arbitrary values.
pub async fn seed_doc_values(store: &dyn DocumentStore, path: &str, fields: BTreeMap<String, Value>) {
    let op = WriteOp::Set {
        path: DocumentPath::new(path).unwrap(),
        fields,
    };
    store.commit(&[op]).await.unwrap();
}
