//! Storage layer for crew
//!
//! A file-backed document store. Every team, project and task is one JSON
//! document; the activity log is append-only (see `activity`).
//!
//! # Directory Structure
//!
//! ```text
//! <root>/
//!   .crew.toml                  # Optional configuration
//!   session                     # Persisted caller identity
//!   teams/<id>.json             # Team documents (members embedded)
//!   projects/<id>.json          # Project documents
//!   tasks/<id>.json             # Task documents
//!   activity/                   # Audit trail
//!     <timestamp>-<id>.json     # One immutable entry per reassignment
//!   locks/<team-id>.lock        # Per-team exclusive scope
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::lock::{self, FileLock};

const TEAMS_DIR: &str = "teams";
const PROJECTS_DIR: &str = "projects";
const TASKS_DIR: &str = "tasks";
const ACTIVITY_DIR: &str = "activity";
const LOCKS_DIR: &str = "locks";
const SESSION_FILE: &str = "session";

/// A persisted top-level record.
///
/// Every document belongs to exactly one user; lookups through
/// [`Storage::find_owned`] and [`Storage::list_owned`] never cross owners.
pub trait Document: Serialize + DeserializeOwned {
    /// Human name used in errors ("team", "task", ...)
    const KIND: &'static str;
    /// Directory under the store root
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
    fn owner(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

/// Storage manager for crew state
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    lock_timeout_ms: u64,
}

impl Storage {
    pub fn new(root: PathBuf, lock_timeout_ms: u64) -> Self {
        Self {
            root,
            lock_timeout_ms,
        }
    }

    /// Open a store, taking the lock timeout from its configuration
    pub fn open(root: PathBuf) -> Self {
        let config = Config::load_from_root(&root);
        Self::new(root, config.store.lock_timeout_ms)
    }

    /// Platform data directory used when no root is given
    pub fn default_root() -> Result<PathBuf> {
        directories::ProjectDirs::from("dev", "crew", "crew")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| {
                Error::InvalidConfig(
                    "no home directory found; pass --store or set CREW_STORE".to_string(),
                )
            })
    }

    /// Resolve the store root from an explicit path or the platform default
    pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::default_root(),
        }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn lock_timeout_ms(&self) -> u64 {
        self.lock_timeout_ms
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn session_file(&self) -> PathBuf {
        self.root.join(SESSION_FILE)
    }

    pub fn collection_dir<T: Document>(&self) -> PathBuf {
        self.root.join(T::COLLECTION)
    }

    pub fn document_path<T: Document>(&self, id: &str) -> PathBuf {
        self.collection_dir::<T>().join(format!("{id}.json"))
    }

    pub fn activity_dir(&self) -> PathBuf {
        self.root.join(ACTIVITY_DIR)
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join(LOCKS_DIR)
    }

    pub fn team_lock_file(&self, team_id: &str) -> PathBuf {
        self.locks_dir().join(format!("{team_id}.lock"))
    }

    pub fn config(&self) -> Config {
        Config::load_from_root(&self.root)
    }

    // =========================================================================
    // Directory initialization
    // =========================================================================

    pub fn init(&self) -> Result<()> {
        for dir in [TEAMS_DIR, PROJECTS_DIR, TASKS_DIR, ACTIVITY_DIR, LOCKS_DIR] {
            fs::create_dir_all(self.root.join(dir))?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.root.join(TEAMS_DIR).is_dir()
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Write JSON atomically (temp + rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(data)?;
        lock::write_atomic(path, &json)
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// Load a document by id regardless of owner
    pub fn load<T: Document>(&self, id: &str) -> Result<Option<T>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        self.read_if_present(&self.document_path::<T>(id))
    }

    /// Read a document that may have been removed since it was listed
    fn read_if_present<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Load a document owned by `owner`; anything else is NotFound
    pub fn find_owned<T: Document>(&self, owner: &str, id: &str) -> Result<T> {
        match self.load::<T>(id)? {
            Some(doc) if doc.owner() == owner => Ok(doc),
            _ => Err(Error::not_found(T::KIND, id)),
        }
    }

    /// All documents owned by `owner`, oldest first
    pub fn list_owned<T: Document>(&self, owner: &str) -> Result<Vec<T>> {
        let dir = self.collection_dir::<T>();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut docs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match self.read_if_present::<T>(&path)? {
                Some(doc) if doc.owner() == owner => docs.push(doc),
                _ => {}
            }
        }

        docs.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(docs)
    }

    /// Insert a new document; fails if the id is taken
    pub fn insert<T: Document>(&self, doc: &T) -> Result<()> {
        let path = self.checked_path::<T>(doc.id())?;
        if path.exists() {
            return Err(Error::OperationFailed(format!(
                "{} already exists: {}",
                T::KIND,
                doc.id()
            )));
        }
        self.write_json(&path, doc)
    }

    /// Replace a document in place
    pub fn save<T: Document>(&self, doc: &T) -> Result<()> {
        let path = self.checked_path::<T>(doc.id())?;
        self.write_json(&path, doc)
    }

    /// Delete a document; returns whether it existed
    pub fn remove<T: Document>(&self, id: &str) -> Result<bool> {
        if !is_valid_id(id) {
            return Ok(false);
        }
        let path = self.document_path::<T>(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Error::Io(err)),
        }
    }

    // =========================================================================
    // Team scope
    // =========================================================================

    /// Enter the exclusive scope for a team's counters
    pub fn lock_team(&self, team_id: &str) -> Result<FileLock> {
        if !is_valid_id(team_id) {
            return Err(Error::not_found("team", team_id));
        }
        FileLock::acquire(self.team_lock_file(team_id), self.lock_timeout_ms)
    }

    fn checked_path<T: Document>(&self, id: &str) -> Result<PathBuf> {
        if !is_valid_id(id) {
            return Err(Error::Validation(format!("invalid {} id: {id:?}", T::KIND)));
        }
        Ok(self.document_path::<T>(id))
    }
}

/// Generate a new prefixed document id (`team-01j...`)
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", ulid::Ulid::new().to_string().to_lowercase())
}

/// Ids become file names, so only a conservative charset is accepted.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}
