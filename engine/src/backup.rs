//! Backup unit orchestration.
//!
//! A backup unit is one timestamped directory holding a full export: the
//! authentication store, the document tree and the policy-text artifacts,
//! each in its own subdirectory, topped by a manifest. Units are never
//! mutated after creation; restore reads them back in the same order.
//!
//! ```text
//! backup-2024-01-01T00-00-00/
//!   auth/metadata.json        auth/users.json
//!   documents/metadata.json   documents/collections/<name>.json
//!   documents/statistics.json
//!   policies/index.json       policies/<id>.txt
//!   backup-report.json        (restore adds restore-report.json)
//! ```

use crate::auth::{AuthStore, UserRecord};
use crate::batch::BatchExecutor;
use crate::document::{count_documents, DocumentBackup};
use crate::error::{Error, Result};
use crate::export::Exporter;
use crate::import::Importer;
use crate::path::CollectionPath;
use crate::policy;
use crate::store::DocumentStore;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Unit directory names: `backup-` followed by this timestamp format.
pub const UNIT_PREFIX: &str = "backup-";
pub const UNIT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Version stamp written into every metadata file.
pub const BACKUP_VERSION: u32 = 1;

const AUTH_DIR: &str = "auth";
const DOCUMENTS_DIR: &str = "documents";
const COLLECTIONS_DIR: &str = "collections";
const POLICIES_DIR: &str = "policies";
const USERS_FILE: &str = "users.json";
const METADATA_FILE: &str = "metadata.json";
const STATISTICS_FILE: &str = "statistics.json";
const BACKUP_REPORT_FILE: &str = "backup-report.json";
const RESTORE_REPORT_FILE: &str = "restore-report.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthMetadata {
    pub timestamp: DateTime<Utc>,
    pub total_users: usize,
    pub project_id: String,
    pub backup_version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeMetadata {
    pub timestamp: DateTime<Utc>,
    pub total_documents: usize,
    pub project_id: String,
    pub backup_version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub name: String,
    pub documents: usize,
}

/// Per-collection document counts for the document-tree step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub collections: Vec<CollectionStats>,
    pub total_documents: usize,
}

/// Top-level summary of a completed backup, written as
/// `backup-report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    pub timestamp: DateTime<Utc>,
    pub unit: String,
    pub project_id: String,
    pub backup_version: u32,
    pub users: usize,
    pub documents: usize,
    pub policies: usize,
    pub policies_skipped: usize,
}

/// One sequenced step of a restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreStep {
    pub name: String,
    pub ok: bool,
    pub restored: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a restore, written as `restore-report.json` in live mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub timestamp: DateTime<Utc>,
    pub unit: String,
    pub dry_run: bool,
    pub steps: Vec<RestoreStep>,
}

impl RestoreReport {
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.ok)
    }

    pub fn total_restored(&self) -> usize {
        self.steps.iter().map(|s| s.restored).sum()
    }
}

/// Sequences full backups and restores over a store and auth-store pair.
pub struct Orchestrator {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthStore>,
    project_id: String,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthStore>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            auth,
            project_id: project_id.into(),
        }
    }

    /// Run a full backup into a new timestamped unit under `backups_root`.
    pub async fn run_backup(&self, backups_root: &Path) -> Result<BackupManifest> {
        let started = Utc::now();
        let unit_name = format!("{UNIT_PREFIX}{}", started.format(UNIT_TIMESTAMP_FORMAT));
        let unit = backups_root.join(&unit_name);
        tracing::info!(unit = %unit.display(), "starting backup");

        // Auth store first; user records scope everything else.
        let users = self.auth.list_users().await?;
        let auth_dir = unit.join(AUTH_DIR);
        std::fs::create_dir_all(&auth_dir)?;
        write_json(&auth_dir.join(USERS_FILE), &users)?;
        write_json(
            &auth_dir.join(METADATA_FILE),
            &AuthMetadata {
                timestamp: started,
                total_users: users.len(),
                project_id: self.project_id.clone(),
                backup_version: BACKUP_VERSION,
            },
        )?;

        // Document tree.
        let tree = Exporter::new(self.store.clone()).export_all().await?;
        let documents_dir = unit.join(DOCUMENTS_DIR);
        let collections_dir = documents_dir.join(COLLECTIONS_DIR);
        std::fs::create_dir_all(&collections_dir)?;
        let mut statistics = Statistics::default();
        for (name, docs) in &tree {
            write_json(&collections_dir.join(format!("{name}.json")), docs)?;
            let documents = count_documents(docs);
            statistics.collections.push(CollectionStats {
                name: name.clone(),
                documents,
            });
            statistics.total_documents += documents;
        }
        write_json(&documents_dir.join(STATISTICS_FILE), &statistics)?;
        write_json(
            &documents_dir.join(METADATA_FILE),
            &TreeMetadata {
                timestamp: started,
                total_documents: statistics.total_documents,
                project_id: self.project_id.clone(),
                backup_version: BACKUP_VERSION,
            },
        )?;

        // Policy texts.
        let policy_report =
            policy::export_policies(&self.store, &unit.join(POLICIES_DIR)).await?;

        let manifest = BackupManifest {
            timestamp: started,
            unit: unit_name,
            project_id: self.project_id.clone(),
            backup_version: BACKUP_VERSION,
            users: users.len(),
            documents: statistics.total_documents,
            policies: policy_report.exported,
            policies_skipped: policy_report.skipped,
        };
        write_json(&unit.join(BACKUP_REPORT_FILE), &manifest)?;

        tracing::info!(
            users = manifest.users,
            documents = manifest.documents,
            policies = manifest.policies,
            "backup complete"
        );
        Ok(manifest)
    }

    /// Restore a unit, mirroring the backup order.
    ///
    /// In live mode the first failing step aborts the run. In dry-run mode a
    /// step failure is recorded in the report and the remaining steps are
    /// still previewed.
    pub async fn run_restore(&self, unit: &Path, dry_run: bool) -> Result<RestoreReport> {
        let unit_name = unit
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| unit.display().to_string());
        tracing::info!(unit = %unit_name, dry_run, "starting restore");

        let mut report = RestoreReport {
            timestamp: Utc::now(),
            unit: unit_name,
            dry_run,
            steps: Vec::with_capacity(3),
        };

        let steps: [(&str, StepKind); 3] = [
            ("auth", StepKind::Auth),
            ("documents", StepKind::Documents),
            ("policies", StepKind::Policies),
        ];
        for (name, kind) in steps {
            match self.restore_step(kind, unit, dry_run).await {
                Ok(restored) => report.steps.push(RestoreStep {
                    name: name.to_string(),
                    ok: true,
                    restored,
                    error: None,
                }),
                Err(err) if dry_run => {
                    tracing::warn!(step = name, error = %err, "dry-run step failed, continuing");
                    report.steps.push(RestoreStep {
                        name: name.to_string(),
                        ok: false,
                        restored: 0,
                        error: Some(err.to_string()),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        if !dry_run {
            write_json(&unit.join(RESTORE_REPORT_FILE), &report)?;
        }
        tracing::info!(restored = report.total_restored(), "restore complete");
        Ok(report)
    }

    async fn restore_step(&self, kind: StepKind, unit: &Path, dry_run: bool) -> Result<usize> {
        match kind {
            StepKind::Auth => self.restore_auth(unit, dry_run).await,
            StepKind::Documents => self.restore_documents(unit, dry_run).await,
            StepKind::Policies => {
                let executor = BatchExecutor::new(self.store.clone(), dry_run);
                policy::import_policies(&executor, &unit.join(POLICIES_DIR)).await
            }
        }
    }

    async fn restore_auth(&self, unit: &Path, dry_run: bool) -> Result<usize> {
        let users_path = unit.join(AUTH_DIR).join(USERS_FILE);
        let users: Vec<UserRecord> = read_json(&users_path)?;
        if dry_run {
            return Ok(users.len());
        }
        self.auth.import_users(&users).await
    }

    async fn restore_documents(&self, unit: &Path, dry_run: bool) -> Result<usize> {
        let documents_dir = unit.join(DOCUMENTS_DIR);
        // The metadata file is the marker that the tree step ran; its
        // absence means the unit is incomplete.
        let metadata_path = documents_dir.join(METADATA_FILE);
        if !metadata_path.is_file() {
            return Err(Error::MissingArtifact(metadata_path));
        }

        let collections_dir = documents_dir.join(COLLECTIONS_DIR);
        if !collections_dir.is_dir() {
            return Err(Error::MissingArtifact(collections_dir));
        }

        let importer = Importer::new(BatchExecutor::new(self.store.clone(), dry_run));
        let mut written = 0;
        for (name, file) in collection_files(&collections_dir)? {
            let docs: Vec<DocumentBackup> = read_json(&file)?;
            let target = CollectionPath::new(name)?;
            let report = importer.import_collection(&docs, &target).await?;
            written += report.written;
        }
        Ok(written)
    }
}

enum StepKind {
    Auth,
    Documents,
    Policies,
}

/// Collection files in deterministic (name) order.
fn collection_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        if !path.is_file() || !is_json {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

/// Find the most recent backup unit under `root`.
///
/// Subdirectory names that do not carry a parsable timestamp are skipped.
/// Two units parsing to the same instant are broken by name, largest
/// lexicographic wins.
pub fn find_latest_unit(root: &Path) -> Result<Option<PathBuf>> {
    if !root.is_dir() {
        return Ok(None);
    }

    let mut latest: Option<(NaiveDateTime, String, PathBuf)> = None;
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(parsed) = parse_unit_timestamp(&name) else {
            tracing::debug!(name, "skipping non-unit directory");
            continue;
        };
        let candidate = (parsed, name, entry.path());
        if latest.as_ref().is_none_or(|current| candidate > *current) {
            latest = Some(candidate);
        }
    }
    Ok(latest.map(|(_, _, path)| path))
}

/// Parse the timestamp out of a unit directory name.
pub fn parse_unit_timestamp(name: &str) -> Option<NaiveDateTime> {
    let rest = name.strip_prefix(UNIT_PREFIX)?;
    NaiveDateTime::parse_from_str(rest, UNIT_TIMESTAMP_FORMAT).ok()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(Error::MissingArtifact(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|err| Error::MalformedArtifact {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}
