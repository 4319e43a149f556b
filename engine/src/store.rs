//! The document store interface and the in-memory implementation.
//!
//! Every tool in this crate talks to the store through [`DocumentStore`], an
//! explicit handle passed into each component constructor. There is no
//! ambient store singleton; tests substitute doubles freely and the CLI
//! decides which backing to wire in.

use crate::document::{DocumentBackup, StoredDocument};
use crate::error::{Error, Result};
use crate::path::{CollectionPath, DocumentPath};
use crate::value::{self, Value};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hard ceiling on operations per committed batch, matching the store's
/// transactional limit.
pub const BATCH_LIMIT: usize = 500;

/// A single write or delete against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Full-document overwrite at `path`. Creates the document if absent.
    Set {
        path: DocumentPath,
        fields: BTreeMap<String, Value>,
    },
    /// Delete the document at `path`. Subcollections are left in place,
    /// which is why recursive deletion must walk children explicitly.
    Delete { path: DocumentPath },
}

impl WriteOp {
    pub fn path(&self) -> &DocumentPath {
        match self {
            WriteOp::Set { path, .. } => path,
            WriteOp::Delete { path } => path,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, WriteOp::Delete { .. })
    }
}

/// Interface to the hierarchical document store.
///
/// `commit` applies a batch atomically and must reject batches larger than
/// [`BATCH_LIMIT`]; callers go through the batch executor, which never
/// assembles an oversized batch in the first place. A backing that refuses
/// an individual operation reports it as [`Error::StoreRejected`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Names of the top-level collections that currently hold documents.
    async fn list_root_collections(&self) -> Result<Vec<String>>;

    /// All documents in a collection. An unknown or empty collection yields
    /// an empty vec, not an error.
    async fn list_documents(&self, path: &CollectionPath) -> Result<Vec<StoredDocument>>;

    /// A single document, if it exists.
    async fn get_document(&self, path: &DocumentPath) -> Result<Option<StoredDocument>>;

    /// Names of the subcollections under a document that hold documents
    /// (directly or through nested descendants).
    async fn list_subcollections(&self, path: &DocumentPath) -> Result<Vec<String>>;

    /// Ids in a collection that hold no document of their own but anchor
    /// nested documents (deleted or never-written parents).
    async fn list_missing_documents(&self, path: &CollectionPath) -> Result<Vec<String>>;

    /// Atomically apply a batch of operations, in order.
    async fn commit(&self, ops: &[WriteOp]) -> Result<()>;
}

/// One document node in the in-memory tree.
///
/// A node can exist purely as an ancestor of nested documents (`exists ==
/// false`), mirroring the provider: deleting a parent document does not
/// delete its subcollections.
#[derive(Debug, Clone, Default)]
struct DocNode {
    exists: bool,
    fields: BTreeMap<String, Value>,
    create_time: Option<DateTime<Utc>>,
    update_time: Option<DateTime<Utc>>,
    /// subcollection name -> document id -> node
    children: BTreeMap<String, BTreeMap<String, DocNode>>,
}

impl DocNode {
    fn has_content(&self) -> bool {
        self.exists || self.children.values().any(|c| c.values().any(DocNode::has_content))
    }
}

type CollectionMap = BTreeMap<String, BTreeMap<String, DocNode>>;

/// In-memory store used by the emulator mode of the CLI and by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    root: RwLock<CollectionMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a serialized image.
    pub fn from_image(image: &StoreImage) -> Result<Self> {
        let store = Self::new();
        {
            let mut root = store.root.write();
            for (name, docs) in &image.collections {
                let collection = root.entry(name.clone()).or_default();
                for doc in docs {
                    insert_backup(collection, doc)?;
                }
            }
        }
        Ok(store)
    }

    /// Serialize the full tree into an image suitable for local persistence.
    pub fn to_image(&self) -> StoreImage {
        let root = self.root.read();
        let collections = root
            .iter()
            .map(|(name, docs)| (name.clone(), collection_to_backups(docs)))
            .filter(|(_, docs)| !docs.is_empty())
            .collect();
        StoreImage { collections }
    }

    fn resolve<'a>(root: &'a CollectionMap, path: &DocumentPath) -> Option<&'a DocNode> {
        let mut segments = path.segments();
        let collection = segments.next()?;
        let id = segments.next()?;
        let mut node = root.get(collection)?.get(id)?;
        while let Some(collection) = segments.next() {
            let id = segments.next()?;
            node = node.children.get(collection)?.get(id)?;
        }
        Some(node)
    }

    fn apply(root: &mut CollectionMap, op: &WriteOp) -> Result<()> {
        match op {
            WriteOp::Set { path, fields } => {
                let node = Self::node_mut(root, path);
                let now = Utc::now();
                if !node.exists {
                    node.create_time = Some(now);
                }
                node.exists = true;
                node.update_time = Some(now);
                node.fields = fields.clone();
            }
            WriteOp::Delete { path } => {
                if let Some(node) = Self::node_mut_existing(root, path) {
                    node.exists = false;
                    node.fields.clear();
                    node.create_time = None;
                    node.update_time = None;
                }
            }
        }
        Ok(())
    }

    fn node_mut<'a>(root: &'a mut CollectionMap, path: &DocumentPath) -> &'a mut DocNode {
        let mut segments = path.segments();
        // A DocumentPath always has at least one collection/id pair.
        let collection = segments.next().unwrap_or_default();
        let id = segments.next().unwrap_or_default();
        let mut node = root
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();
        while let Some(collection) = segments.next() {
            let id = segments.next().unwrap_or_default();
            node = node
                .children
                .entry(collection.to_string())
                .or_default()
                .entry(id.to_string())
                .or_default();
        }
        node
    }

    fn node_mut_existing<'a>(
        root: &'a mut CollectionMap,
        path: &DocumentPath,
    ) -> Option<&'a mut DocNode> {
        let mut segments = path.segments();
        let collection = segments.next()?;
        let id = segments.next()?;
        let mut node = root.get_mut(collection)?.get_mut(id)?;
        while let Some(collection) = segments.next() {
            let id = segments.next()?;
            node = node.children.get_mut(collection)?.get_mut(id)?;
        }
        Some(node)
    }
}

fn stored_document(id: &str, node: &DocNode) -> StoredDocument {
    StoredDocument {
        id: id.to_string(),
        fields: node.fields.clone(),
        create_time: node.create_time,
        update_time: node.update_time,
    }
}

fn insert_backup(collection: &mut BTreeMap<String, DocNode>, doc: &DocumentBackup) -> Result<()> {
    let node = collection.entry(doc.id.clone()).or_default();
    if !doc.missing {
        node.exists = true;
        node.fields = value::from_portable_fields(&doc.data)?;
        node.create_time = doc.create_time;
        node.update_time = doc.update_time;
    }
    if let Some(subs) = &doc.subcollections {
        for (name, sub_docs) in subs {
            let child = node.children.entry(name.clone()).or_default();
            for sub_doc in sub_docs {
                insert_backup(child, sub_doc)?;
            }
        }
    }
    Ok(())
}

fn collection_to_backups(collection: &BTreeMap<String, DocNode>) -> Vec<DocumentBackup> {
    collection
        .iter()
        .filter(|(_, node)| node.has_content())
        .map(|(id, node)| {
            let subcollections: BTreeMap<String, Vec<DocumentBackup>> = node
                .children
                .iter()
                .map(|(name, docs)| (name.clone(), collection_to_backups(docs)))
                .filter(|(_, docs)| !docs.is_empty())
                .collect();
            DocumentBackup {
                id: id.clone(),
                data: value::to_portable_fields(&node.fields),
                create_time: node.create_time,
                update_time: node.update_time,
                subcollections: (!subcollections.is_empty()).then_some(subcollections),
                missing: !node.exists,
            }
        })
        .collect()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_root_collections(&self) -> Result<Vec<String>> {
        let root = self.root.read();
        Ok(root
            .iter()
            .filter(|(_, docs)| docs.values().any(DocNode::has_content))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn list_documents(&self, path: &CollectionPath) -> Result<Vec<StoredDocument>> {
        let root = self.root.read();
        let collection = match Self::collection_at(&root, path) {
            Some(collection) => collection,
            None => return Ok(Vec::new()),
        };
        Ok(collection
            .iter()
            .filter(|(_, node)| node.exists)
            .map(|(id, node)| stored_document(id, node))
            .collect())
    }

    async fn get_document(&self, path: &DocumentPath) -> Result<Option<StoredDocument>> {
        let root = self.root.read();
        Ok(Self::resolve(&root, path)
            .filter(|node| node.exists)
            .map(|node| stored_document(path.id(), node)))
    }

    async fn list_subcollections(&self, path: &DocumentPath) -> Result<Vec<String>> {
        let root = self.root.read();
        let node = match Self::resolve(&root, path) {
            Some(node) => node,
            None => return Ok(Vec::new()),
        };
        Ok(node
            .children
            .iter()
            .filter(|(_, docs)| docs.values().any(DocNode::has_content))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn list_missing_documents(&self, path: &CollectionPath) -> Result<Vec<String>> {
        let root = self.root.read();
        let collection = match Self::collection_at(&root, path) {
            Some(collection) => collection,
            None => return Ok(Vec::new()),
        };
        Ok(collection
            .iter()
            .filter(|(_, node)| !node.exists && node.has_content())
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn commit(&self, ops: &[WriteOp]) -> Result<()> {
        if ops.len() > BATCH_LIMIT {
            return Err(Error::BatchLimitExceeded(ops.len()));
        }
        let mut root = self.root.write();
        for op in ops {
            Self::apply(&mut root, op)?;
        }
        Ok(())
    }
}

impl MemoryStore {
    fn collection_at<'a>(
        root: &'a CollectionMap,
        path: &CollectionPath,
    ) -> Option<&'a BTreeMap<String, DocNode>> {
        match path.parent() {
            None => root.get(path.name()),
            Some(parent) => Self::resolve(root, &parent)?.children.get(path.name()),
        }
    }
}

/// Serializable image of a whole store, used by the CLI for local
/// persistence. Structurally this is just a full-tree export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreImage {
    pub collections: BTreeMap<String, Vec<DocumentBackup>>,
}

impl StoreImage {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
