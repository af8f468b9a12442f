//! Teams and their embedded members.
//!
//! A team document carries every member together with the member's live load
//! counter (`current_tasks`). All writes go through [`TeamScope`], which holds
//! the team's file lock and performs a version-checked save.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::load::{self, RecountChange};
use crate::lock::FileLock;
use crate::project::Project;
use crate::storage::{new_id, Document, Storage};
use crate::task;

pub const MIN_CAPACITY: u32 = 0;
pub const MAX_CAPACITY: u32 = 5;
pub const DEFAULT_CAPACITY: u32 = 3;

/// Times a project's team is re-locked when the project keeps moving
const PROJECT_LOCK_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub current_tasks: u32,
}

fn default_capacity() -> u32 {
    DEFAULT_CAPACITY
}

impl Member {
    pub fn new(name: impl Into<String>, role: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: new_id("mbr"),
            name: name.into(),
            role: role.into(),
            capacity,
            current_tasks: 0,
        }
    }

    pub fn is_overloaded(&self) -> bool {
        self.current_tasks > self.capacity
    }

    pub fn has_room(&self) -> bool {
        self.current_tasks < self.capacity
    }

    /// Tasks above capacity; zero when not overloaded
    pub fn excess(&self) -> u32 {
        self.current_tasks.saturating_sub(self.capacity)
    }

    /// `current_tasks / capacity`, or `None` for a zero-capacity member
    pub fn load_ratio(&self) -> Option<f64> {
        if self.capacity == 0 {
            None
        } else {
            Some(f64::from(self.current_tasks) / f64::from(self.capacity))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner: String,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn member(&self, member_id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == member_id)
    }

    pub fn member_mut(&mut self, member_id: &str) -> Option<&mut Member> {
        self.members.iter_mut().find(|member| member.id == member_id)
    }

    pub fn require_member(&self, member_id: &str) -> Result<&Member> {
        self.member(member_id)
            .ok_or_else(|| Error::not_found("member", member_id))
    }

    pub fn total_load(&self) -> u32 {
        self.members.iter().map(|member| member.current_tasks).sum()
    }
}

impl Document for Team {
    const KIND: &'static str = "team";
    const COLLECTION: &'static str = "teams";

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

/// Member description given on the command line: `name:role[:capacity]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSpec {
    pub name: String,
    pub role: String,
    pub capacity: Option<u32>,
}

impl FromStr for MemberSpec {
    type Err = Error;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
        let (name, role, capacity) = match parts.as_slice() {
            [name, role] => (*name, *role, None),
            [name, role, capacity] => {
                let capacity = capacity.parse::<u32>().map_err(|_| {
                    Error::Validation(format!("invalid capacity in member '{raw}'"))
                })?;
                (*name, *role, Some(capacity))
            }
            _ => {
                return Err(Error::Validation(format!(
                    "invalid member '{raw}': expected name:role[:capacity]"
                )))
            }
        };
        Ok(MemberSpec {
            name: required(name, "member name")?,
            role: required(role, "member role")?,
            capacity,
        })
    }
}

pub fn validate_capacity(capacity: u32) -> Result<u32> {
    if (MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
        Ok(capacity)
    } else {
        Err(Error::Validation(format!(
            "capacity must be between {MIN_CAPACITY} and {MAX_CAPACITY}, got {capacity}"
        )))
    }
}

pub(crate) fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Exclusive, version-checked access to one team.
///
/// The lock is held until the scope is dropped; [`TeamScope::commit`] may be
/// called any number of times in between.
pub struct TeamScope<'a> {
    storage: &'a Storage,
    team: Team,
    _lock: FileLock,
}

impl<'a> TeamScope<'a> {
    pub fn team(&self) -> &Team {
        &self.team
    }

    pub fn team_mut(&mut self) -> &mut Team {
        &mut self.team
    }

    /// Persist the team if nobody wrote it since it was read
    pub fn commit(&mut self) -> Result<()> {
        save_versioned(self.storage, &mut self.team)
    }

    pub fn into_team(self) -> Team {
        self.team
    }
}

fn save_versioned(storage: &Storage, team: &mut Team) -> Result<()> {
    let persisted: Team = storage
        .load(&team.id)?
        .ok_or_else(|| Error::not_found("team", team.id.clone()))?;
    if persisted.version != team.version {
        return Err(Error::Conflict {
            kind: "team",
            id: team.id.clone(),
            expected: team.version,
            found: persisted.version,
        });
    }
    team.version += 1;
    if let Err(err) = storage.save(team) {
        team.version -= 1;
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct RecountReport {
    pub team_id: String,
    pub assigned_tasks: usize,
    pub changes: Vec<RecountChange>,
}

#[derive(Debug, Clone)]
pub struct TeamStore {
    storage: Storage,
}

impl TeamStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Lock the team and load it for `owner`
    pub fn scope(&self, owner: &str, team_id: &str) -> Result<TeamScope<'_>> {
        // Ownership check before touching the lock file.
        self.storage.find_owned::<Team>(owner, team_id)?;
        let lock = self.storage.lock_team(team_id)?;
        let team = self.storage.find_owned::<Team>(owner, team_id)?;
        Ok(TeamScope {
            storage: &self.storage,
            team,
            _lock: lock,
        })
    }

    /// Lock the team a project currently belongs to.
    ///
    /// The project is re-read under the lock; if it moved to another team in
    /// the meantime the lock is released and the new team is tried instead.
    pub fn scope_for_project(&self, owner: &str, project_id: &str) -> Result<(Project, TeamScope<'_>)> {
        let (project, mut scopes) = self.lock_project_teams(owner, project_id, None)?;
        let scope = scopes
            .pop()
            .ok_or_else(|| Error::not_found("team", project.team.clone()))?;
        Ok((project, scope))
    }

    /// Lock both the project's current team and `target`, in id order
    pub fn scope_for_move(
        &self,
        owner: &str,
        project_id: &str,
        target: &str,
    ) -> Result<(Project, Vec<TeamScope<'_>>)> {
        self.lock_project_teams(owner, project_id, Some(target))
    }

    fn lock_project_teams(
        &self,
        owner: &str,
        project_id: &str,
        target: Option<&str>,
    ) -> Result<(Project, Vec<TeamScope<'_>>)> {
        let mut team_id = self.storage.find_owned::<Project>(owner, project_id)?.team;
        for _ in 0..PROJECT_LOCK_ATTEMPTS {
            let mut ids: Vec<&str> = std::iter::once(team_id.as_str()).chain(target).collect();
            ids.sort_unstable();
            ids.dedup();
            let scopes = ids
                .into_iter()
                .map(|id| self.scope(owner, id))
                .collect::<Result<Vec<_>>>()?;

            let project = self.storage.find_owned::<Project>(owner, project_id)?;
            if project.team == team_id {
                return Ok((project, scopes));
            }
            tracing::debug!(project = %project_id, from = %team_id, to = %project.team, "project moved while locking");
            team_id = project.team;
        }
        Err(Error::Relocated {
            kind: "project",
            id: project_id.to_string(),
        })
    }

    pub fn list(&self, owner: &str) -> Result<Vec<Team>> {
        self.storage.list_owned(owner)
    }

    pub fn get(&self, owner: &str, team_id: &str) -> Result<Team> {
        self.storage.find_owned(owner, team_id)
    }

    pub fn create(
        &self,
        owner: &str,
        name: &str,
        description: Option<String>,
        members: Vec<MemberSpec>,
        default_capacity: u32,
    ) -> Result<Team> {
        let name = required(name, "team name")?;
        let members = members
            .into_iter()
            .map(|spec| {
                let capacity = validate_capacity(spec.capacity.unwrap_or(default_capacity))?;
                Ok(Member::new(spec.name, spec.role, capacity))
            })
            .collect::<Result<Vec<_>>>()?;

        let team = Team {
            id: new_id("team"),
            name,
            description: optional_text(description),
            owner: owner.to_string(),
            members,
            version: 0,
            created_at: Utc::now(),
        };
        self.storage.insert(&team)?;
        tracing::info!(team = %team.id, members = team.members.len(), "team created");
        Ok(team)
    }

    pub fn edit(
        &self,
        owner: &str,
        team_id: &str,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Team> {
        let mut scope = self.scope(owner, team_id)?;
        if let Some(name) = name {
            scope.team_mut().name = required(&name, "team name")?;
        }
        if let Some(description) = description {
            scope.team_mut().description = optional_text(Some(description));
        }
        scope.commit()?;
        Ok(scope.into_team())
    }

    /// Delete a team that no project references
    pub fn delete(&self, owner: &str, team_id: &str) -> Result<()> {
        let scope = self.scope(owner, team_id)?;
        let referencing: Vec<Project> = self
            .storage
            .list_owned::<Project>(owner)?
            .into_iter()
            .filter(|project| project.team == team_id)
            .collect();
        if !referencing.is_empty() {
            return Err(Error::Validation(format!(
                "team {team_id} is used by {} project(s); delete or move them first",
                referencing.len()
            )));
        }
        self.storage.remove::<Team>(team_id)?;
        drop(scope);
        tracing::info!(team = %team_id, "team deleted");
        Ok(())
    }

    pub fn add_member(
        &self,
        owner: &str,
        team_id: &str,
        name: &str,
        role: &str,
        capacity: Option<u32>,
        default_capacity: u32,
    ) -> Result<(Team, String)> {
        let member = Member::new(
            required(name, "member name")?,
            required(role, "member role")?,
            validate_capacity(capacity.unwrap_or(default_capacity))?,
        );
        let member_id = member.id.clone();

        let mut scope = self.scope(owner, team_id)?;
        scope.team_mut().members.push(member);
        scope.commit()?;
        tracing::info!(team = %team_id, member = %member_id, "member added");
        Ok((scope.into_team(), member_id))
    }

    pub fn edit_member(
        &self,
        owner: &str,
        team_id: &str,
        member_id: &str,
        name: Option<String>,
        role: Option<String>,
        capacity: Option<u32>,
    ) -> Result<Team> {
        let name = name.map(|value| required(&value, "member name")).transpose()?;
        let role = role.map(|value| required(&value, "member role")).transpose()?;
        let capacity = capacity.map(validate_capacity).transpose()?;

        let mut scope = self.scope(owner, team_id)?;
        let member = scope
            .team_mut()
            .member_mut(member_id)
            .ok_or_else(|| Error::not_found("member", member_id))?;
        if let Some(name) = name {
            member.name = name;
        }
        if let Some(role) = role {
            member.role = role;
        }
        if let Some(capacity) = capacity {
            member.capacity = capacity;
        }
        scope.commit()?;
        Ok(scope.into_team())
    }

    /// Remove a member that has no assigned tasks
    pub fn remove_member(&self, owner: &str, team_id: &str, member_id: &str) -> Result<Team> {
        let mut scope = self.scope(owner, team_id)?;
        scope.team().require_member(member_id)?;

        let assigned = task::tasks_for_team(&self.storage, owner, team_id)?
            .into_iter()
            .filter(|task| task.assigned_member.member_id.as_deref() == Some(member_id))
            .count();
        if assigned > 0 {
            return Err(Error::Validation(format!(
                "member {member_id} still has {assigned} assigned task(s); reassign them first"
            )));
        }

        scope.team_mut().members.retain(|member| member.id != member_id);
        scope.commit()?;
        tracing::info!(team = %team_id, member = %member_id, "member removed");
        Ok(scope.into_team())
    }

    /// Re-derive every member counter from the tasks assigned to it
    pub fn recount(&self, owner: &str, team_id: &str) -> Result<RecountReport> {
        let mut scope = self.scope(owner, team_id)?;
        let tasks = task::tasks_for_team(&self.storage, owner, team_id)?;
        let report = recount_in_scope(&mut scope, &tasks)?;
        Ok(report)
    }
}

/// Recount inside an already held scope (used by `reassign --recount`)
pub(crate) fn recount_in_scope(
    scope: &mut TeamScope<'_>,
    tasks: &[task::Task],
) -> Result<RecountReport> {
    let assigned_tasks = tasks
        .iter()
        .filter(|task| task.assigned_member.member_id.is_some())
        .count();
    let changes = load::recount(scope.team_mut(), tasks);
    if !changes.is_empty() {
        scope.commit()?;
        tracing::info!(team = %scope.team().id, changed = changes.len(), "member counters recounted");
    }
    Ok(RecountReport {
        team_id: scope.team().id.clone(),
        assigned_tasks,
        changes,
    })
}
