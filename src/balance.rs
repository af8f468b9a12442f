//! Load balancing across team members.
//!
//! Two operations:
//!
//! - [`Balancer::reassign`] walks every team of the caller and moves excess
//!   Low/Medium tasks away from overloaded members to members with spare
//!   capacity, recording each move in the activity log.
//! - [`Balancer::auto_assign`] hands one task to the member with the lowest
//!   load ratio.
//!
//! Each team is processed inside its [`TeamScope`](crate::team::TeamScope).
//! Every move is committed on its own (team, then task, then the activity
//! entry) so a failure stops the run without leaving counters, assignments
//! and the log out of step.

use chrono::Utc;
use serde::Serialize;

use crate::activity::{ActivityLog, ActivityLogStore};
use crate::config::BalanceConfig;
use crate::error::{Error, Result};
use crate::load;
use crate::project::Project;
use crate::storage::Storage;
use crate::task::{self, AssignedMember, Task};
use crate::team::{self, RecountReport, Team, TeamScope, TeamStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    pub task_id: String,
    pub task_title: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReassignReport {
    pub message: String,
    pub reassigned_tasks: Vec<Reassignment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recounted: Vec<RecountReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoAssignOutcome {
    pub message: String,
    pub task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    pub changed: bool,
}

/// Tasks of `member_id` that bulk reassignment may move, Low before Medium,
/// then oldest first, at most `limit`.
pub fn movable_tasks(tasks: Vec<Task>, member_id: &str, limit: usize) -> Vec<Task> {
    let mut eligible: Vec<Task> = tasks
        .into_iter()
        .filter(|task| {
            task.priority.is_movable()
                && task.assigned_member.member_id.as_deref() == Some(member_id)
        })
        .collect();
    eligible.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    eligible.truncate(limit);
    eligible
}

#[derive(Debug, Clone)]
pub struct Balancer {
    storage: Storage,
    config: BalanceConfig,
}

impl Balancer {
    pub fn new(storage: Storage) -> Self {
        let config = storage.config().balance;
        Self::with_config(storage, config)
    }

    pub fn with_config(storage: Storage, config: BalanceConfig) -> Self {
        Self { storage, config }
    }

    fn activity(&self) -> ActivityLogStore {
        ActivityLogStore::for_storage(&self.storage)
    }

    /// Relieve every overloaded member of the caller's teams.
    ///
    /// With `recount`, member counters are first re-derived from the tasks.
    pub fn reassign(&self, owner: &str, recount: bool) -> Result<ReassignReport> {
        let teams: Vec<Team> = self.storage.list_owned(owner)?;
        let team_store = TeamStore::new(self.storage.clone());
        let activity = self.activity();

        let mut reassigned = Vec::new();
        let mut recounted = Vec::new();

        for team in teams {
            let mut scope = match team_store.scope(owner, &team.id) {
                Ok(scope) => scope,
                Err(Error::NotFound { kind: "team", .. }) => continue,
                Err(err) => return Err(err),
            };
            // Projects only join or leave a team while its lock is held.
            let team_projects: Vec<Project> = self
                .storage
                .list_owned::<Project>(owner)?
                .into_iter()
                .filter(|project| project.team == team.id)
                .collect();
            if team_projects.is_empty() {
                continue;
            }

            if recount {
                let tasks = task::tasks_for_team(&self.storage, owner, &team.id)?;
                let report = team::recount_in_scope(&mut scope, &tasks)?;
                if !report.changes.is_empty() {
                    recounted.push(report);
                }
            }

            for project in &team_projects {
                let overloaded: Vec<String> = scope
                    .team()
                    .members
                    .iter()
                    .filter(|member| member.is_overloaded())
                    .map(|member| member.id.clone())
                    .collect();

                for member_id in overloaded {
                    let excess = scope
                        .team()
                        .member(&member_id)
                        .map(|member| member.excess())
                        .unwrap_or(0) as usize;
                    if excess == 0 {
                        continue;
                    }

                    let tasks = task::tasks_for_project(&self.storage, owner, &project.id)?;
                    for mut task in movable_tasks(tasks, &member_id, excess) {
                        let Some(target) = load::relief_target(scope.team(), &member_id) else {
                            tracing::debug!(task = %task.id, member = %member_id, "no member with spare capacity");
                            continue;
                        };
                        let target_id = target.id.clone();
                        let target_name = target.name.clone();

                        let previous = task.assigned_member.clone();
                        let from = previous.name.clone();
                        let entry = ActivityLog::new(&task, Some(from.clone()), target_name.clone(), owner)?;

                        let change = load::apply_assignment_change(
                            scope.team_mut(),
                            Some(member_id.as_str()),
                            Some(target_id.as_str()),
                        );
                        task.assigned_member = AssignedMember {
                            member_id: Some(target_id),
                            name: target_name.clone(),
                        };
                        task.updated_at = Utc::now();
                        task::commit_assignment(&self.storage, &mut scope, &change, &task)?;

                        if let Err(err) = activity.append(&entry) {
                            undo_move(&self.storage, &mut scope, &mut task, previous);
                            return Err(err);
                        }
                        tracing::info!(
                            task = %task.id,
                            project = %project.id,
                            from = %from,
                            to = %target_name,
                            "task reassigned"
                        );
                        reassigned.push(Reassignment {
                            task_id: task.id.clone(),
                            task_title: task.title.clone(),
                            from,
                            to: target_name,
                        });
                    }
                }
            }
        }

        Ok(ReassignReport {
            message: format!("Successfully reassigned {} tasks", reassigned.len()),
            reassigned_tasks: reassigned,
            recounted,
        })
    }

    /// Give one task to the member with the lowest load ratio
    pub fn auto_assign(&self, owner: &str, task_id: &str) -> Result<AutoAssignOutcome> {
        let current: Task = self.storage.find_owned(owner, task_id)?;
        let team_store = TeamStore::new(self.storage.clone());
        let (project, mut scope) = team_store.scope_for_project(owner, &current.project)?;
        let mut task: Task = self.storage.find_owned(owner, task_id)?;

        let selected = load::least_loaded(scope.team())
            .ok_or_else(|| Error::NoAvailableMembers(project.team.clone()))?;
        let assigned = AssignedMember::to(selected);

        let previous = task.assigned_member.clone();
        let changed = previous.member_id != assigned.member_id;
        let previous_name = previous.member_id.as_ref().map(|_| previous.name.clone());

        if !changed {
            repair_own_counter(&mut scope, assigned.member_id.as_deref())?;
            tracing::info!(task = %task.id, to = %assigned.name, "task already with least loaded member");
            return Ok(AutoAssignOutcome {
                message: "Task auto-assigned successfully".to_string(),
                task,
                previous: previous_name,
                changed,
            });
        }

        let entry = if self.config.audit_auto_assign {
            Some(ActivityLog::new(
                &task,
                previous_name.clone(),
                assigned.name.clone(),
                owner,
            )?)
        } else {
            None
        };

        let change = load::apply_assignment_change(
            scope.team_mut(),
            previous.member_id.as_deref(),
            assigned.member_id.as_deref(),
        );
        task.assigned_member = assigned;
        task.updated_at = Utc::now();
        task::commit_assignment(&self.storage, &mut scope, &change, &task)?;

        if let Some(entry) = entry {
            if let Err(err) = self.activity().append(&entry) {
                undo_move(&self.storage, &mut scope, &mut task, previous);
                return Err(err);
            }
        }
        tracing::info!(
            task = %task.id,
            to = %task.assigned_member.name,
            "task auto-assigned"
        );

        Ok(AutoAssignOutcome {
            message: "Task auto-assigned successfully".to_string(),
            task,
            previous: previous_name,
            changed,
        })
    }
}

/// Put a committed move back when its activity entry could not be written
fn undo_move(storage: &Storage, scope: &mut TeamScope<'_>, task: &mut Task, previous: AssignedMember) {
    let undo = load::apply_assignment_change(
        scope.team_mut(),
        task.assigned_member.member_id.as_deref(),
        previous.member_id.as_deref(),
    );
    task.assigned_member = previous;
    task.updated_at = Utc::now();
    if let Err(err) = task::commit_assignment(storage, scope, &undo, task) {
        tracing::error!(task = %task.id, error = %err, "failed to undo unrecorded move");
    }
}

/// A task kept by its assignee still counts once, even if the counter drifted
fn repair_own_counter(scope: &mut TeamScope<'_>, member_id: Option<&str>) -> Result<()> {
    let Some(member) = member_id.and_then(|id| scope.team_mut().member_mut(id)) else {
        return Ok(());
    };
    if member.current_tasks > 0 {
        return Ok(());
    }
    member.current_tasks = 1;
    tracing::warn!(member = %member.id, "repaired zero counter of current assignee");
    scope.commit()
}
