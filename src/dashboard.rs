//! Caller-scoped overview: counts, per-member load, latest reassignments.

use serde::Serialize;

use crate::activity::{ActivityLog, ActivityLogStore};
use crate::error::Result;
use crate::project::Project;
use crate::storage::Storage;
use crate::task::Task;
use crate::team::{Member, Team};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberSummary {
    pub member_id: String,
    pub name: String,
    pub role: String,
    pub current_tasks: u32,
    pub capacity: u32,
    pub is_overloaded: bool,
}

impl From<&Member> for MemberSummary {
    fn from(member: &Member) -> Self {
        Self {
            member_id: member.id.clone(),
            name: member.name.clone(),
            role: member.role.clone(),
            current_tasks: member.current_tasks,
            capacity: member.capacity,
            is_overloaded: member.is_overloaded(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamSummary {
    pub team_id: String,
    pub team_name: String,
    pub members: Vec<MemberSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_projects: usize,
    pub total_tasks: usize,
    pub team_summary: Vec<TeamSummary>,
    pub recent_logs: Vec<ActivityLog>,
}

impl DashboardStats {
    pub fn overloaded_members(&self) -> impl Iterator<Item = &MemberSummary> {
        self.team_summary
            .iter()
            .flat_map(|team| team.members.iter())
            .filter(|member| member.is_overloaded)
    }
}

/// Build the dashboard for `owner`, keeping the `recent` newest log entries.
///
/// Counters are reported as stored; nothing is recomputed here.
pub fn stats(storage: &Storage, owner: &str, recent: usize) -> Result<DashboardStats> {
    let projects: Vec<Project> = storage.list_owned(owner)?;
    let tasks: Vec<Task> = storage.list_owned(owner)?;
    let teams: Vec<Team> = storage.list_owned(owner)?;

    let team_summary = teams
        .iter()
        .map(|team| TeamSummary {
            team_id: team.id.clone(),
            team_name: team.name.clone(),
            members: team.members.iter().map(MemberSummary::from).collect(),
        })
        .collect();

    let recent_logs = ActivityLogStore::for_storage(storage).recent(owner, recent)?;

    Ok(DashboardStats {
        total_projects: projects.len(),
        total_tasks: tasks.len(),
        team_summary,
        recent_logs,
    })
}
