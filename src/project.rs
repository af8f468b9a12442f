//! Projects.
//!
//! A project groups tasks and points at exactly one team; that team's members
//! are the only valid assignees for the project's tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::{new_id, Document, Storage};
use crate::task::{self, Task};
use crate::team::{optional_text, required, Team, TeamStore};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub team: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

impl Document for Project {
    const KIND: &'static str = "project";
    const COLLECTION: &'static str = "projects";

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

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDeleteReport {
    pub project_id: String,
    pub deleted_tasks: usize,
}

#[derive(Debug, Clone)]
pub struct ProjectStore {
    storage: Storage,
}

impl ProjectStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn list(&self, owner: &str) -> Result<Vec<Project>> {
        self.storage.list_owned(owner)
    }

    pub fn get(&self, owner: &str, project_id: &str) -> Result<Project> {
        self.storage.find_owned(owner, project_id)
    }

    /// The project together with its team
    pub fn get_with_team(&self, owner: &str, project_id: &str) -> Result<(Project, Team)> {
        let project = self.get(owner, project_id)?;
        let team = self.storage.find_owned::<Team>(owner, &project.team)?;
        Ok((project, team))
    }

    pub fn create(
        &self,
        owner: &str,
        name: &str,
        description: Option<String>,
        team_id: &str,
    ) -> Result<Project> {
        let name = required(name, "project name")?;
        let team_id = required(team_id, "project team")?;
        // Held so the team cannot be deleted before the project lands.
        let teams = TeamStore::new(self.storage.clone());
        let _scope = teams.scope(owner, &team_id)?;

        let project = Project {
            id: new_id("prj"),
            name,
            description: optional_text(description),
            team: team_id,
            owner: owner.to_string(),
            created_at: Utc::now(),
        };
        self.storage.insert(&project)?;
        tracing::info!(project = %project.id, team = %project.team, "project created");
        Ok(project)
    }

    pub fn edit(
        &self,
        owner: &str,
        project_id: &str,
        name: Option<String>,
        description: Option<String>,
        team_id: Option<String>,
    ) -> Result<Project> {
        let name = name
            .map(|value| required(&value, "project name"))
            .transpose()?;
        let team_id = team_id
            .map(|value| required(&value, "project team"))
            .transpose()?;

        let teams = TeamStore::new(self.storage.clone());
        // Holding the current team keeps tasks from being assigned while the
        // project moves; holding the target keeps it from being deleted.
        let (mut project, _scopes) = match team_id.as_deref() {
            Some(target) => teams.scope_for_move(owner, project_id, target)?,
            None => {
                let (project, scope) = teams.scope_for_project(owner, project_id)?;
                (project, vec![scope])
            }
        };

        if let Some(name) = name {
            project.name = name;
        }
        if let Some(description) = description {
            project.description = optional_text(Some(description));
        }
        if let Some(team_id) = team_id {
            if team_id != project.team {
                let assigned = task::tasks_for_project(&self.storage, owner, &project.id)?
                    .iter()
                    .filter(|task| task.assigned_member.member_id.is_some())
                    .count();
                if assigned > 0 {
                    return Err(Error::Validation(format!(
                        "project {} has {assigned} assigned task(s); unassign them before changing team",
                        project.id
                    )));
                }
                tracing::info!(project = %project.id, from = %project.team, to = %team_id, "project moved");
                project.team = team_id;
            }
        }

        self.storage.save(&project)?;
        Ok(project)
    }

    /// Delete a project and its tasks, releasing the members' load
    pub fn delete(&self, owner: &str, project_id: &str) -> Result<ProjectDeleteReport> {
        let teams = TeamStore::new(self.storage.clone());
        let (project, deleted_tasks) = match teams.scope_for_project(owner, project_id) {
            Ok((project, mut scope)) => {
                let tasks = task::tasks_for_project(&self.storage, owner, &project.id)?;
                for task in &tasks {
                    task::remove_in_scope(&self.storage, &mut scope, task)?;
                }
                self.storage.remove::<Project>(&project.id)?;
                (project, tasks.len())
            }
            // Team already gone: no counters left to release.
            Err(Error::NotFound { kind: "team", .. }) => {
                let project = self.get(owner, project_id)?;
                let tasks = task::tasks_for_project(&self.storage, owner, &project.id)?;
                for task in &tasks {
                    self.storage.remove::<Task>(&task.id)?;
                }
                self.storage.remove::<Project>(&project.id)?;
                (project, tasks.len())
            }
            Err(err) => return Err(err),
        };

        tracing::info!(project = %project.id, tasks = deleted_tasks, "project deleted");
        Ok(ProjectDeleteReport {
            project_id: project.id,
            deleted_tasks,
        })
    }
}
