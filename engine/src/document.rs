//! Document shapes: the live-store view and the on-disk backup form.

use crate::value::Value;
use crate::DocumentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A document as read from the live store: unmarshaled fields plus the
/// system timestamps the store maintains.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub fields: BTreeMap<String, Value>,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl StoredDocument {
    pub fn new(id: impl Into<DocumentId>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
            create_time: None,
            update_time: None,
        }
    }
}

/// A document in a backup unit: portable field data plus all nested
/// subcollections.
///
/// `subcollections` is omitted entirely (not serialized as an empty map)
/// when a document has none, to keep exported files minimal. Uses BTreeMap
/// for deterministic serialization order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBackup {
    /// Document id, unique within its collection
    pub id: DocumentId,
    /// Portable (JSON-safe) field data
    pub data: BTreeMap<String, serde_json::Value>,
    /// System creation time, if the store reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    /// System update time, if the store reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    /// Nested subcollections, keyed by name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcollections: Option<BTreeMap<String, Vec<DocumentBackup>>>,
    /// True for placeholder parents: ids that hold no document of their
    /// own but anchor nested subcollections (a deleted or never-written
    /// parent). Restore descends into them without writing the id itself.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub missing: bool,
}

impl DocumentBackup {
    pub fn new(id: impl Into<DocumentId>, data: BTreeMap<String, serde_json::Value>) -> Self {
        Self {
            id: id.into(),
            data,
            create_time: None,
            update_time: None,
            subcollections: None,
            missing: false,
        }
    }

    /// A placeholder parent carrying only subcollections.
    pub fn placeholder(
        id: impl Into<DocumentId>,
        subcollections: BTreeMap<String, Vec<DocumentBackup>>,
    ) -> Self {
        Self {
            id: id.into(),
            data: BTreeMap::new(),
            create_time: None,
            update_time: None,
            subcollections: Some(subcollections),
            missing: true,
        }
    }

    pub fn has_subcollections(&self) -> bool {
        self.subcollections.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// Count every document in an exported tree, nested subcollections
/// included. Placeholder parents anchor the tree but are not documents, so
/// they do not count.
pub fn count_documents(docs: &[DocumentBackup]) -> usize {
    docs.iter()
        .map(|doc| {
            usize::from(!doc.missing)
                + doc
                    .subcollections
                    .iter()
                    .flat_map(|subs| subs.values())
                    .map(|sub_docs| count_documents(sub_docs))
                    .sum::<usize>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backup(id: &str) -> DocumentBackup {
        DocumentBackup::new(id, BTreeMap::from([("title".to_string(), json!("Hi"))]))
    }

    #[test]
    fn subcollections_key_omitted_when_absent() {
        let doc = backup("a");
        let json = serde_json::to_string(&doc).unwrap();
        assert!(!json.contains("subcollections"));
        assert!(!json.contains("createTime"));
    }

    #[test]
    fn camel_case_on_disk() {
        let mut doc = backup("a");
        doc.create_time = Some(chrono::Utc::now());
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"createTime\""));
    }

    #[test]
    fn serde_roundtrip_with_nesting() {
        let mut parent = backup("a");
        parent.subcollections =
            Some(BTreeMap::from([("comments".to_string(), vec![backup("c1")])]));

        let json = serde_json::to_string(&parent).unwrap();
        let parsed: DocumentBackup = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, parent);
        assert!(parsed.has_subcollections());
    }

    #[test]
    fn deep_count() {
        let mut a = backup("a");
        let mut c1 = backup("c1");
        c1.subcollections = Some(BTreeMap::from([("replies".to_string(), vec![backup("r1")])]));
        a.subcollections = Some(BTreeMap::from([(
            "comments".to_string(),
            vec![c1, backup("c2")],
        )]));

        assert_eq!(count_documents(&[a, backup("b")]), 5);
        assert_eq!(count_documents(&[]), 0);
    }

    #[test]
    fn placeholders_anchor_but_do_not_count() {
        let parent = DocumentBackup::placeholder(
            "ghost",
            BTreeMap::from([("comments".to_string(), vec![backup("c1")])]),
        );
        assert_eq!(count_documents(&[parent.clone()]), 1);

        let json = serde_json::to_string(&parent).unwrap();
        assert!(json.contains("\"missing\":true"));
        let parsed: DocumentBackup = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, parent);

        // Regular documents never serialize the flag.
        let plain = serde_json::to_string(&backup("a")).unwrap();
        assert!(!plain.contains("missing"));
    }
}
