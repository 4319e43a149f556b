//! # Arca Engine
//!
//! Backup, restore and migration engine for hierarchical document stores.
//!
//! The store is a multi-tenant tree: top-level collections hold documents,
//! documents hold subcollections, recursively. This crate exports that tree
//! to a portable on-disk format, restores it bit-faithfully, migrates data
//! between schema layouts and destructively clears owner-scoped subsets,
//! all against a remote store that bounds transaction size and exposes
//! provider-specific value types.
//!
//! ## Design Principles
//!
//! - **Explicit handles**: every component takes an `Arc<dyn DocumentStore>`;
//!   there is no ambient store singleton
//! - **Parent before child**: no write for a nested document is issued until
//!   its parent document's write has committed
//! - **Bounded commits**: no commit ever exceeds the store's 500-operation
//!   transactional limit
//! - **Dry-run parity**: dry runs walk the same control flow as live runs
//!   and report identical counts
//!
//! ## Core Concepts
//!
//! ### Values
//!
//! Field values are a tagged variant ([`Value`]): plain JSON, timestamps,
//! geographic points and document references. Backups marshal them into a
//! JSON-safe portable form and reconstruct them on restore ([`value`]).
//!
//! ### Traversal
//!
//! The [`Exporter`] walks collection trees into nested [`DocumentBackup`]
//! records; the [`Importer`] replays them through the [`BatchExecutor`],
//! which splits any operation list into ordered commits of at most
//! [`BATCH_LIMIT`] operations.
//!
//! ### Units
//!
//! The [`Orchestrator`] sequences an auth-store export, a document-tree
//! export and the policy-text artifacts into one timestamped backup unit
//! with a manifest, and selects the most recent unit by parsing timestamps
//! out of unit names ([`backup::find_latest_unit`]).

pub mod auth;
pub mod backup;
pub mod batch;
pub mod clear;
pub mod document;
pub mod error;
pub mod export;
pub mod import;
pub mod migrate;
pub mod path;
pub mod policy;
pub mod store;
pub mod value;

// Re-export main types at crate root
pub use auth::{AuthStore, MemoryAuthStore, UserRecord};
pub use backup::{BackupManifest, Orchestrator, RestoreReport, BACKUP_VERSION};
pub use batch::{BatchExecutor, BatchReport};
pub use clear::{ClearReport, Clearer};
pub use document::{count_documents, DocumentBackup, StoredDocument};
pub use error::{Error, Result};
pub use export::{Exporter, EXPORT_PAGE_SIZE};
pub use import::{ImportReport, Importer};
pub use migrate::{MigrationRecord, MigrationSummary, Migrator, MIGRATION_ORDER};
pub use path::{CollectionPath, DocumentPath};
pub use store::{DocumentStore, MemoryStore, StoreImage, WriteOp, BATCH_LIMIT};
pub use value::Value;

/// Type aliases for clarity
pub type DocumentId = String;
pub type CollectionName = String;
