//! Policy-text artifact export and import.
//!
//! Grading policies are kept as documents in the top-level `policies`
//! collection, the human-readable text under a `text` field. Backups carry
//! them as plain `.txt` files next to an `index.json`, so operators can read
//! and diff policies without tooling. Restore merges each file back into the
//! `text` field of its document, leaving every other field in place.

use crate::batch::BatchExecutor;
use crate::error::{Error, Result};
use crate::path::CollectionPath;
use crate::store::{DocumentStore, WriteOp};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Collection holding policy documents.
pub const POLICIES_COLLECTION: &str = "policies";

/// Field holding the policy text.
pub const POLICY_TEXT_FIELD: &str = "text";

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEntry {
    pub id: String,
    pub file: String,
}

/// Index of exported policy files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyIndex {
    pub policies: Vec<PolicyEntry>,
}

/// Counts from one policy export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyExportReport {
    pub exported: usize,
    /// Policy documents without a string `text` field
    pub skipped: usize,
}

/// Export all policy texts into `dir` (created if needed).
pub async fn export_policies(
    store: &Arc<dyn DocumentStore>,
    dir: &Path,
) -> Result<PolicyExportReport> {
    std::fs::create_dir_all(dir)?;

    let collection = CollectionPath::new(POLICIES_COLLECTION)?;
    let docs = store.list_documents(&collection).await?;

    let mut report = PolicyExportReport::default();
    let mut index = PolicyIndex::default();
    for doc in &docs {
        let Some(text) = doc.fields.get(POLICY_TEXT_FIELD).and_then(Value::as_str) else {
            tracing::warn!(id = %doc.id, "policy document has no text field, skipping");
            report.skipped += 1;
            continue;
        };
        let file = format!("{}.txt", doc.id);
        std::fs::write(dir.join(&file), text)?;
        index.policies.push(PolicyEntry {
            id: doc.id.clone(),
            file,
        });
        report.exported += 1;
    }

    let index_json = serde_json::to_string_pretty(&index)?;
    std::fs::write(dir.join(INDEX_FILE), index_json)?;
    Ok(report)
}

/// Replay exported policy texts back into the store via `executor`.
///
/// Each text merges into the current field map of its document, so a replay
/// never drops fields written by an earlier document-tree restore. A missing
/// index or a missing file named by the index is a hard error.
pub async fn import_policies(executor: &BatchExecutor, dir: &Path) -> Result<usize> {
    let index_path = dir.join(INDEX_FILE);
    if !index_path.is_file() {
        return Err(Error::MissingArtifact(index_path));
    }
    let index: PolicyIndex = serde_json::from_str(&std::fs::read_to_string(&index_path)?)?;

    let collection = CollectionPath::new(POLICIES_COLLECTION)?;
    let mut ops = Vec::with_capacity(index.policies.len());
    for entry in &index.policies {
        let file = dir.join(&entry.file);
        if !file.is_file() {
            return Err(Error::MissingArtifact(file));
        }
        let text = std::fs::read_to_string(&file)?;
        let path = collection.document(&entry.id)?;
        let mut fields = match executor.store().get_document(&path).await? {
            Some(doc) => doc.fields,
            None => BTreeMap::new(),
        };
        fields.insert(POLICY_TEXT_FIELD.to_string(), Value::string(text));
        ops.push(WriteOp::Set { path, fields });
    }

    let report = executor.execute(&ops).await?;
    Ok(report.applied)
}
