//! Slash-separated paths into the document store.
//!
//! A path alternates collection and document segments. An odd number of
//! segments addresses a collection (`notes`, `owners/u1/notes`), an even
//! number addresses a document (`notes/a`, `owners/u1/notes/a`). The two
//! newtypes make it impossible to hand a collection address to an operation
//! that needs a document, which is what keeps parent-before-child traversal
//! honest throughout the engine.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

fn validated_segments(path: &str) -> Option<Vec<&str>> {
    if path.is_empty() {
        return None;
    }
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains('/')
}

/// Address of a collection or subcollection (odd segment count).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Parse a collection path, rejecting empty segments and document-shaped
    /// (even segment count) paths.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        match validated_segments(&path) {
            Some(segments) if segments.len() % 2 == 1 => Ok(Self(path)),
            _ => Err(Error::InvalidPath {
                expected: "collection",
                path,
            }),
        }
    }

    /// The collection name (last segment).
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Whether this is a top-level collection.
    pub fn is_root(&self) -> bool {
        !self.0.contains('/')
    }

    /// Address a document inside this collection.
    pub fn document(&self, id: &str) -> Result<DocumentPath> {
        if !valid_segment(id) {
            return Err(Error::InvalidSegment(id.to_string()));
        }
        Ok(DocumentPath(format!("{}/{}", self.0, id)))
    }

    /// The parent document, if this is a subcollection.
    pub fn parent(&self) -> Option<DocumentPath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| DocumentPath(parent.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CollectionPath {
    type Error = Error;

    fn try_from(path: String) -> Result<Self> {
        Self::new(path)
    }
}

impl From<CollectionPath> for String {
    fn from(path: CollectionPath) -> Self {
        path.0
    }
}

/// Address of a single document (even segment count).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Parse a document path, rejecting empty segments and collection-shaped
    /// (odd segment count) paths.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        match validated_segments(&path) {
            Some(segments) if segments.len() % 2 == 0 => Ok(Self(path)),
            _ => Err(Error::InvalidPath {
                expected: "document",
                path,
            }),
        }
    }

    /// The document id (last segment).
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The collection containing this document.
    pub fn parent(&self) -> CollectionPath {
        // Always well-formed: stripping the id leaves an odd segment count.
        let (parent, _) = self.0.rsplit_once('/').unwrap_or(("", &self.0));
        CollectionPath(parent.to_string())
    }

    /// Address a subcollection nested under this document.
    pub fn subcollection(&self, name: &str) -> Result<CollectionPath> {
        if !valid_segment(name) {
            return Err(Error::InvalidSegment(name.to_string()));
        }
        Ok(CollectionPath(format!("{}/{}", self.0, name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentPath {
    type Error = Error;

    fn try_from(path: String) -> Result<Self> {
        Self::new(path)
    }
}

impl From<DocumentPath> for String {
    fn from(path: DocumentPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_path_parity() {
        assert!(CollectionPath::new("notes").is_ok());
        assert!(CollectionPath::new("owners/u1/notes").is_ok());
        assert!(CollectionPath::new("notes/a").is_err());
        assert!(CollectionPath::new("").is_err());
        assert!(CollectionPath::new("notes//a").is_err());
    }

    #[test]
    fn document_path_parity() {
        assert!(DocumentPath::new("notes/a").is_ok());
        assert!(DocumentPath::new("owners/u1/notes/a").is_ok());
        assert!(DocumentPath::new("notes").is_err());
        assert!(DocumentPath::new("notes/a/").is_err());
    }

    #[test]
    fn navigation() {
        let notes = CollectionPath::new("notes").unwrap();
        let doc = notes.document("a").unwrap();
        assert_eq!(doc.as_str(), "notes/a");
        assert_eq!(doc.id(), "a");
        assert_eq!(doc.parent(), notes);

        let comments = doc.subcollection("comments").unwrap();
        assert_eq!(comments.as_str(), "notes/a/comments");
        assert_eq!(comments.name(), "comments");
        assert!(!comments.is_root());
        assert_eq!(comments.parent(), Some(doc));

        assert!(notes.is_root());
        assert_eq!(notes.parent(), None);
    }

    #[test]
    fn rejects_slash_in_segment() {
        let notes = CollectionPath::new("notes").unwrap();
        assert!(notes.document("a/b").is_err());
        assert!(notes.document("").is_err());

        let doc = notes.document("a").unwrap();
        assert!(doc.subcollection("x/y").is_err());
    }

    #[test]
    fn serde_as_plain_string() {
        let doc = DocumentPath::new("notes/a").unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, "\"notes/a\"");

        let parsed: DocumentPath = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);

        // Parity is enforced on the way back in.
        assert!(serde_json::from_str::<DocumentPath>("\"notes\"").is_err());
    }
}
