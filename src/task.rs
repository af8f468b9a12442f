//! Tasks and their assignment.
//!
//! Every assignee change runs inside the owning team's [`TeamScope`]: the task
//! is re-read under the lock, counters move through
//! [`load::apply_assignment_change`], then the team and the task are written
//! (team first). A failed task write rolls the counters back.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::load::{self, LoadChange};
use crate::project::Project;
use crate::storage::{new_id, Document, Storage};
use crate::team::{optional_text, required, Member, TeamScope, TeamStore};

/// Name snapshot stored on tasks without an assignee
pub const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Low and Medium tasks may be moved by bulk reassignment
    pub fn is_movable(self) -> bool {
        matches!(self, Priority::Low | Priority::Medium)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(Error::Validation(format!(
                "invalid priority '{s}': must be Low, Medium, or High"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "InProgress",
            TaskStatus::Done => "Done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|ch| !matches!(ch, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "inprogress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(Error::Validation(format!(
                "invalid status '{s}': must be Pending, InProgress, or Done"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignedMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    pub name: String,
}

impl AssignedMember {
    pub fn unassigned() -> Self {
        Self {
            member_id: None,
            name: UNASSIGNED.to_string(),
        }
    }

    pub fn to(member: &Member) -> Self {
        Self {
            member_id: Some(member.id.clone()),
            name: member.name.clone(),
        }
    }
}

impl Default for AssignedMember {
    fn default() -> Self {
        Self::unassigned()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub project: String,
    #[serde(default)]
    pub assigned_member: AssignedMember,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Task {
    const KIND: &'static str = "task";
    const COLLECTION: &'static str = "tasks";

    fn id(&self) -> &str {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.owner
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Input for [`TaskStore::create`]
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub project: String,
    pub member: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignee {
    Member(String),
    Unassigned,
}

/// Partial update for [`TaskStore::edit`]; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub assignee: Option<Assignee>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub project: Option<String>,
    pub member: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(project) = &self.project {
            if &task.project != project {
                return false;
            }
        }
        if let Some(member) = &self.member {
            if task.assigned_member.member_id.as_ref() != Some(member) {
                return false;
            }
        }
        true
    }
}

/// Tasks of one project
pub fn tasks_for_project(storage: &Storage, owner: &str, project_id: &str) -> Result<Vec<Task>> {
    Ok(storage
        .list_owned::<Task>(owner)?
        .into_iter()
        .filter(|task| task.project == project_id)
        .collect())
}

/// Tasks of every project that uses `team_id`
pub fn tasks_for_team(storage: &Storage, owner: &str, team_id: &str) -> Result<Vec<Task>> {
    let projects: HashSet<String> = storage
        .list_owned::<Project>(owner)?
        .into_iter()
        .filter(|project| project.team == team_id)
        .map(|project| project.id)
        .collect();
    Ok(storage
        .list_owned::<Task>(owner)?
        .into_iter()
        .filter(|task| projects.contains(&task.project))
        .collect())
}

/// Write the team, then the task; undo the counters if the task write fails
pub(crate) fn commit_assignment(
    storage: &Storage,
    scope: &mut TeamScope<'_>,
    change: &LoadChange,
    task: &Task,
) -> Result<()> {
    if !change.is_empty() {
        scope.commit()?;
    }
    if let Err(err) = storage.save(task) {
        if !change.is_empty() {
            load::revert_assignment_change(scope.team_mut(), change);
            if let Err(revert_err) = scope.commit() {
                tracing::error!(task = %task.id, error = %revert_err, "failed to roll back member counters");
            }
        }
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    storage: Storage,
}

impl TaskStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Tasks matching `filter`, newest first
    pub fn list(&self, owner: &str, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .storage
            .list_owned::<Task>(owner)?
            .into_iter()
            .filter(|task| filter.matches(task))
            .collect();
        tasks.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(tasks)
    }

    pub fn get(&self, owner: &str, task_id: &str) -> Result<Task> {
        self.storage.find_owned(owner, task_id)
    }

    pub fn create(&self, owner: &str, input: NewTask) -> Result<Task> {
        let title = required(&input.title, "task title")?;
        let project_id = required(&input.project, "task project")?;

        let teams = TeamStore::new(self.storage.clone());
        let (project, mut scope) = teams.scope_for_project(owner, &project_id)?;

        let now = Utc::now();
        let mut task = Task {
            id: new_id("tsk"),
            title,
            description: optional_text(input.description),
            project: project.id.clone(),
            assigned_member: AssignedMember::unassigned(),
            priority: input.priority.unwrap_or_default(),
            status: input.status.unwrap_or_default(),
            owner: owner.to_string(),
            created_at: now,
            updated_at: now,
        };

        let change = match input.member.as_deref() {
            Some(member_id) => {
                task.assigned_member = AssignedMember::to(scope.team().require_member(member_id)?);
                load::apply_assignment_change(scope.team_mut(), None, Some(member_id))
            }
            None => LoadChange::default(),
        };
        commit_assignment(&self.storage, &mut scope, &change, &task)?;
        tracing::info!(
            task = %task.id,
            project = %task.project,
            member = input.member.as_deref().unwrap_or("-"),
            "task created"
        );
        Ok(task)
    }

    pub fn edit(&self, owner: &str, task_id: &str, patch: TaskPatch) -> Result<Task> {
        let title = patch
            .title
            .map(|title| required(&title, "task title"))
            .transpose()?;

        let current = self.get(owner, task_id)?;
        let teams = TeamStore::new(self.storage.clone());
        let (_, mut scope) = teams.scope_for_project(owner, &current.project)?;
        // Re-read under the team lock; a concurrent edit may have moved it.
        let mut task = self.get(owner, task_id)?;
        let old = task.assigned_member.member_id.clone();

        let change = match &patch.assignee {
            Some(assignee) => {
                let assigned = match assignee {
                    Assignee::Member(id) if old.as_deref() == Some(id.as_str()) => {
                        task.assigned_member.clone()
                    }
                    Assignee::Member(id) => AssignedMember::to(scope.team().require_member(id)?),
                    Assignee::Unassigned => AssignedMember::unassigned(),
                };
                let change = load::apply_assignment_change(
                    scope.team_mut(),
                    old.as_deref(),
                    assigned.member_id.as_deref(),
                );
                task.assigned_member = assigned;
                change
            }
            None => LoadChange::default(),
        };

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = optional_text(Some(description));
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        task.updated_at = Utc::now();

        commit_assignment(&self.storage, &mut scope, &change, &task)?;
        if !change.is_empty() {
            tracing::info!(
                task = %task.id,
                from = old.as_deref().unwrap_or("-"),
                to = task.assigned_member.member_id.as_deref().unwrap_or("-"),
                "task reassigned"
            );
        }
        Ok(task)
    }

    /// Delete a task, releasing its assignee's load
    pub fn delete(&self, owner: &str, task_id: &str) -> Result<Task> {
        let current = self.get(owner, task_id)?;
        let teams = TeamStore::new(self.storage.clone());
        let (_, mut scope) = teams.scope_for_project(owner, &current.project)?;
        // A concurrent delete that won the lock leaves nothing to release.
        let task = self.get(owner, task_id)?;
        remove_in_scope(&self.storage, &mut scope, &task)?;
        tracing::info!(task = %task.id, "task deleted");
        Ok(task)
    }
}

/// Release the task's counter, then remove its document; the counter is
/// restored if the removal fails
pub(crate) fn remove_in_scope(storage: &Storage, scope: &mut TeamScope<'_>, task: &Task) -> Result<()> {
    let change = load::apply_assignment_change(
        scope.team_mut(),
        task.assigned_member.member_id.as_deref(),
        None,
    );
    if !change.is_empty() {
        scope.commit()?;
    }
    if let Err(err) = storage.remove::<Task>(&task.id) {
        if !change.is_empty() {
            load::revert_assignment_change(scope.team_mut(), &change);
            if let Err(revert_err) = scope.commit() {
                tracing::error!(task = %task.id, error = %revert_err, "failed to roll back member counters");
            }
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parsing_and_order() {
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
        assert_eq!(" HIGH ".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert!(!Priority::High.is_movable());
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn status_parsing_accepts_separators() {
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("In Progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("done".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!("blocked".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn task_json_defaults_to_unassigned() {
        let json = r#"{
            "id": "tsk-1",
            "title": "Write docs",
            "project": "prj-1",
            "owner": "alice",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.assigned_member, AssignedMember::unassigned());
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn failed_task_write_rolls_back_counters() {
        use crate::team::Team;

        let temp = tempfile::TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf(), 1000);
        storage.init().unwrap();
        let team = TeamStore::new(storage.clone())
            .create("alice", "Core", None, vec!["Ada:eng".parse().unwrap()], 3)
            .unwrap();

        let now = Utc::now();
        let task = Task {
            id: new_id("tsk"),
            title: "t".into(),
            description: None,
            project: "prj-1".into(),
            assigned_member: AssignedMember::to(&team.members[0]),
            priority: Priority::Low,
            status: TaskStatus::Pending,
            owner: "alice".into(),
            created_at: now,
            updated_at: now,
        };
        // A directory in place of the task file makes the rename fail.
        std::fs::create_dir_all(storage.document_path::<Task>(&task.id)).unwrap();

        let teams = TeamStore::new(storage.clone());
        let mut scope = teams.scope("alice", &team.id).unwrap();
        let member_id = team.members[0].id.clone();
        let change = load::apply_assignment_change(scope.team_mut(), None, Some(member_id.as_str()));
        assert_eq!(scope.team().members[0].current_tasks, 1);

        assert!(commit_assignment(&storage, &mut scope, &change, &task).is_err());
        assert_eq!(scope.team().members[0].current_tasks, 0);
        drop(scope);

        let persisted: Team = storage.find_owned("alice", &team.id).unwrap();
        assert_eq!(persisted.members[0].current_tasks, 0);
        assert!(persisted.version > team.version);
    }

    #[test]
    fn failed_removal_keeps_counter() {
        use crate::team::Team;

        let temp = tempfile::TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf(), 1000);
        storage.init().unwrap();
        let team = TeamStore::new(storage.clone())
            .create("alice", "Core", None, vec!["Ada:eng".parse().unwrap()], 3)
            .unwrap();
        let mut loaded = team.clone();
        loaded.members[0].current_tasks = 1;
        storage.save(&loaded).unwrap();

        let now = Utc::now();
        let task = Task {
            id: new_id("tsk"),
            title: "t".into(),
            description: None,
            project: "prj-1".into(),
            assigned_member: AssignedMember::to(&team.members[0]),
            priority: Priority::Low,
            status: TaskStatus::Pending,
            owner: "alice".into(),
            created_at: now,
            updated_at: now,
        };
        // remove_file refuses a directory.
        std::fs::create_dir_all(storage.document_path::<Task>(&task.id)).unwrap();

        let teams = TeamStore::new(storage.clone());
        let mut scope = teams.scope("alice", &team.id).unwrap();
        assert!(remove_in_scope(&storage, &mut scope, &task).is_err());
        drop(scope);

        let persisted: Team = storage.find_owned("alice", &team.id).unwrap();
        assert_eq!(persisted.members[0].current_tasks, 1);
    }

    #[test]
    fn filter_matches_project_and_member() {
        let now = Utc::now();
        let task = Task {
            id: "tsk-1".into(),
            title: "t".into(),
            description: None,
            project: "prj-1".into(),
            assigned_member: AssignedMember {
                member_id: Some("mbr-a".into()),
                name: "A".into(),
            },
            priority: Priority::Low,
            status: TaskStatus::Pending,
            owner: "alice".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(TaskFilter::default().matches(&task));
        assert!(TaskFilter {
            project: Some("prj-1".into()),
            member: Some("mbr-a".into()),
        }
        .matches(&task));
        assert!(!TaskFilter {
            project: None,
            member: Some("mbr-b".into()),
        }
        .matches(&task));
    }
}
