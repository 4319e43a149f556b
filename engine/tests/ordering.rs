//! Ordering guarantees across the traversal and batching layers.
//!
//! These tests watch the store through a recording double and assert on the
//! shape and order of committed batches rather than on final store state.

mod common;

use arca_engine::{
    BatchExecutor, Clearer, CollectionPath, DocumentBackup, DocumentPath, DocumentStore, Importer,
    WriteOp, BATCH_LIMIT,
};
use common::{seed_doc, RecordingStore};
use std::collections::BTreeMap;

fn backup_doc(id: &str) -> DocumentBackup {
    DocumentBackup::new(
        id,
        BTreeMap::from([("name".to_string(), serde_json::json!(id))]),
    )
}

/// Index of the first commit whose batch contains `path`.
fn commit_index(commits: &[Vec<common::RecordedOp>], path: &str) -> Option<usize> {
    commits
        .iter()
        .position(|batch| batch.iter().any(|op| op.path == path))
}

// ============================================================
// Import: parents commit before children
// ============================================================

#[tokio::test]
async fn import_commits_parents_before_children() {
    let mut a = backup_doc("a");
    a.subcollections = Some(BTreeMap::from([(
        "comments".to_string(),
        vec![backup_doc("c1"), backup_doc("c2")],
    )]));
    let mut c2 = backup_doc("c2");
    c2.subcollections = Some(BTreeMap::from([(
        "reactions".to_string(),
        vec![backup_doc("r1")],
    )]));
    if let Some(subs) = a.subcollections.as_mut() {
        subs.insert("replies".to_string(), vec![c2]);
    }
    let docs = vec![a, backup_doc("b")];

    let store = RecordingStore::new();
    let importer = Importer::new(BatchExecutor::new(store.clone(), false));
    importer
        .import_collection(&docs, &CollectionPath::new("notes").unwrap())
        .await
        .unwrap();

    let commits = store.commits();
    // Every nested document lands in a strictly later commit than the
    // document it nests under.
    for (child, parent) in [
        ("notes/a/comments/c1", "notes/a"),
        ("notes/a/comments/c2", "notes/a"),
        ("notes/a/replies/c2", "notes/a"),
        ("notes/a/replies/c2/reactions/r1", "notes/a/replies/c2"),
    ] {
        let child_commit = commit_index(&commits, child).unwrap();
        let parent_commit = commit_index(&commits, parent).unwrap();
        assert!(
            parent_commit < child_commit,
            "{parent} committed at {parent_commit}, {child} at {child_commit}"
        );
    }
}

// ============================================================
// Executor: bounded commits, input order preserved
// ============================================================

#[tokio::test]
async fn executor_splits_batches_and_preserves_input_order() {
    let notes = CollectionPath::new("notes").unwrap();
    let ops: Vec<WriteOp> = (0..1200)
        .map(|i| WriteOp::Set {
            path: notes.document(&format!("doc{i:04}")).unwrap(),
            fields: BTreeMap::new(),
        })
        .collect();

    let store = RecordingStore::new();
    let executor = BatchExecutor::new(store.clone(), false);
    let report = executor.execute(&ops).await.unwrap();
    assert_eq!(report.commits, 3);

    let commits = store.commits();
    let sizes: Vec<usize> = commits.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![BATCH_LIMIT, BATCH_LIMIT, 200]);

    let recorded: Vec<String> = store.flattened().into_iter().map(|op| op.path).collect();
    let expected: Vec<String> = ops
        .iter()
        .map(|op| op.path().as_str().to_string())
        .collect();
    assert_eq!(recorded, expected);
}

#[tokio::test]
async fn dry_run_executor_never_touches_the_store() {
    let notes = CollectionPath::new("notes").unwrap();
    let ops: Vec<WriteOp> = (0..750)
        .map(|i| WriteOp::Set {
            path: notes.document(&format!("doc{i}")).unwrap(),
            fields: BTreeMap::new(),
        })
        .collect();

    let store = RecordingStore::new();
    let dry = BatchExecutor::new(store.clone(), true)
        .execute(&ops)
        .await
        .unwrap();
    assert!(store.commits().is_empty());

    let live = BatchExecutor::new(store.clone(), false)
        .execute(&ops)
        .await
        .unwrap();
    assert_eq!(dry, live);
}

// ============================================================
// Clear: children deleted before their parent document
// ============================================================

#[tokio::test]
async fn clear_deletes_descendants_before_ancestors() {
    let store = RecordingStore::new();
    for path in [
        "owners/u1",
        "owners/u1/documents/d1",
        "owners/u1/documents/d1/revisions/r1",
        "owners/u1/documents/d1/revisions/r2",
    ] {
        seed_doc(store.as_ref(), path, &[("name", path)]).await;
    }

    let before = store.commits().len();
    let report = Clearer::new(store.clone(), false)
        .clear_owner_scoped("owners", &["documents".to_string()])
        .await
        .unwrap();
    assert_eq!(report.deleted, 3);

    let commits = &store.commits()[before..];
    let deletes: Vec<String> = commits
        .iter()
        .flatten()
        .filter(|op| op.delete)
        .map(|op| op.path.clone())
        .collect();
    // Revisions flush in their own commit before the parent document's.
    assert_eq!(
        deletes,
        vec![
            "owners/u1/documents/d1/revisions/r1".to_string(),
            "owners/u1/documents/d1/revisions/r2".to_string(),
            "owners/u1/documents/d1".to_string(),
        ]
    );
    let revision_commit = commit_index(commits, "owners/u1/documents/d1/revisions/r1").unwrap();
    let parent_commit = commit_index(commits, "owners/u1/documents/d1").unwrap();
    assert!(revision_commit < parent_commit);

    // The owner document itself was never deleted.
    assert!(store
        .get_document(&DocumentPath::new("owners/u1").unwrap())
        .await
        .unwrap()
        .is_some());
}
