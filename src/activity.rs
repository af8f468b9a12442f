//! Reassignment audit trail.
//!
//! Entries are append-only: one immutable JSON file per reassignment under
//! `<store>/activity/`, named so that a directory listing sorts by time.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock};
use crate::storage::{new_id, Storage};
use crate::task::Task;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberRef {
    pub name: String,
}

/// One reassignment: which task moved, from whom, to whom
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityLog {
    pub id: String,
    pub task: String,
    pub task_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_member: Option<MemberRef>,
    pub to_member: MemberRef,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    pub fn new(
        task: &Task,
        from: Option<String>,
        to: impl Into<String>,
        owner: impl Into<String>,
    ) -> Result<Self> {
        let to = to.into();
        if to.trim().is_empty() {
            return Err(Error::Validation("to member name is required".to_string()));
        }
        if task.title.trim().is_empty() {
            return Err(Error::Validation("task title is required".to_string()));
        }
        Ok(Self {
            id: new_id("act"),
            task: task.id.clone(),
            task_title: task.title.clone(),
            from_member: from.map(|name| MemberRef { name }),
            to_member: MemberRef { name: to },
            owner: owner.into(),
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ActivityLogStore {
    dir: PathBuf,
    lock_timeout_ms: u64,
}

impl ActivityLogStore {
    pub fn new(dir: PathBuf, lock_timeout_ms: u64) -> Self {
        Self {
            dir,
            lock_timeout_ms,
        }
    }

    pub fn for_storage(storage: &Storage) -> Self {
        Self::new(storage.activity_dir(), storage.lock_timeout_ms())
    }

    /// Append an entry; existing entries are never rewritten
    pub fn append(&self, entry: &ActivityLog) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let _lock = FileLock::acquire(activity_lock_path(&self.dir), self.lock_timeout_ms)?;

        let path = self.dir.join(entry_filename(entry));
        if path.exists() {
            return Err(Error::OperationFailed(format!(
                "activity entry already exists: {}",
                path.display()
            )));
        }

        let json = serde_json::to_vec_pretty(entry)?;
        lock::write_atomic(&path, &json)?;
        tracing::debug!(task = %entry.task, to = %entry.to_member.name, "activity recorded");
        Ok(path)
    }

    /// Every entry, oldest first
    pub fn read_all(&self) -> Result<Vec<ActivityLog>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect();
        paths.sort();

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs::read_to_string(&path)?;
            entries.push(serde_json::from_str(&content)?);
        }
        Ok(entries)
    }

    /// The caller's newest `limit` entries, newest first
    pub fn recent(&self, owner: &str, limit: usize) -> Result<Vec<ActivityLog>> {
        let mut entries: Vec<ActivityLog> = self
            .read_all()?
            .into_iter()
            .filter(|entry| entry.owner == owner)
            .collect();
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        entries.truncate(limit);
        Ok(entries)
    }

    /// Entries for one task, oldest first
    pub fn for_task(&self, owner: &str, task_id: &str) -> Result<Vec<ActivityLog>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|entry| entry.owner == owner && entry.task == task_id)
            .collect())
    }
}

pub fn format_entry(entry: &ActivityLog) -> String {
    let from = entry
        .from_member
        .as_ref()
        .map(|member| member.name.as_str())
        .unwrap_or("-");
    format!(
        "{ts} \"{title}\" {from} -> {to} (task {task})",
        ts = entry.created_at.to_rfc3339(),
        title = entry.task_title,
        to = entry.to_member.name,
        task = entry.task
    )
}

fn activity_lock_path(dir: &Path) -> PathBuf {
    dir.join("activity.lock")
}

fn entry_filename(entry: &ActivityLog) -> String {
    let ts = entry.created_at.format("%Y%m%dT%H%M%S%.6fZ");
    format!("{}-{}.json", ts, entry.id)
}
