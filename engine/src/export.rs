//! Recursive document tree export.
//!
//! Walks a collection, marshaling every document's fields and descending
//! into its subcollections, producing the nested [`DocumentBackup`] tree the
//! backup format stores on disk. Documents are processed in bounded
//! concurrent pages: each page fans out, completes, and only then does the
//! next page start, which bounds memory and concurrent store reads.

use crate::document::{count_documents, DocumentBackup, StoredDocument};
use crate::error::Result;
use crate::path::{CollectionPath, DocumentPath};
use crate::store::DocumentStore;
use crate::value;
use futures::future::{self, BoxFuture};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Concurrent fan-out width within one page of documents.
pub const EXPORT_PAGE_SIZE: usize = 50;

/// Exports collection trees from a store.
#[derive(Clone)]
pub struct Exporter {
    store: Arc<dyn DocumentStore>,
}

impl Exporter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Export one collection, subcollections included.
    ///
    /// An empty or unknown collection exports as an empty vec.
    pub async fn export_collection(&self, path: &CollectionPath) -> Result<Vec<DocumentBackup>> {
        self.export_collection_inner(path.clone()).await
    }

    /// Export every top-level collection, keyed by name.
    pub async fn export_all(&self) -> Result<BTreeMap<String, Vec<DocumentBackup>>> {
        let mut out = BTreeMap::new();
        for name in self.store.list_root_collections().await? {
            let path = CollectionPath::new(&name)?;
            let docs = self.export_collection(&path).await?;
            tracing::info!(
                collection = %name,
                documents = count_documents(&docs),
                "exported collection"
            );
            out.insert(name, docs);
        }
        Ok(out)
    }

    fn export_collection_inner(
        &self,
        path: CollectionPath,
    ) -> BoxFuture<'_, Result<Vec<DocumentBackup>>> {
        Box::pin(async move {
            let docs = self.store.list_documents(&path).await?;
            let mut out = Vec::with_capacity(docs.len());
            for page in docs.chunks(EXPORT_PAGE_SIZE) {
                let exported =
                    future::try_join_all(page.iter().map(|doc| self.export_document(&path, doc)))
                        .await?;
                out.extend(exported);
            }

            // Ids that anchor nested documents without existing themselves
            // (deleted parents). Skipping them would drop whole subtrees.
            for id in self.store.list_missing_documents(&path).await? {
                let doc_path = path.document(&id)?;
                let subcollections = self.export_subcollections(&doc_path).await?;
                if !subcollections.is_empty() {
                    out.push(DocumentBackup::placeholder(id, subcollections));
                }
            }
            Ok(out)
        })
    }

    async fn export_subcollections(
        &self,
        doc_path: &DocumentPath,
    ) -> Result<BTreeMap<String, Vec<DocumentBackup>>> {
        let mut subcollections = BTreeMap::new();
        for name in self.store.list_subcollections(doc_path).await? {
            let sub_path = doc_path.subcollection(&name)?;
            let sub_docs = self.export_collection_inner(sub_path).await?;
            if !sub_docs.is_empty() {
                subcollections.insert(name, sub_docs);
            }
        }
        Ok(subcollections)
    }

    async fn export_document(
        &self,
        parent: &CollectionPath,
        doc: &StoredDocument,
    ) -> Result<DocumentBackup> {
        let doc_path = parent.document(&doc.id)?;
        let subcollections = self.export_subcollections(&doc_path).await?;

        Ok(DocumentBackup {
            id: doc.id.clone(),
            data: value::to_portable_fields(&doc.fields),
            create_time: doc.create_time,
            update_time: doc.update_time,
            subcollections: (!subcollections.is_empty()).then_some(subcollections),
            missing: false,
        })
    }
}
