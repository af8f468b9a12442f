//! crew project command implementations.

use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::project::{Project, ProjectStore};
use crate::task::{self, Task};
use crate::team::Team;

use super::GlobalOptions;

pub struct NewOptions {
    pub name: String,
    pub team: String,
    pub description: Option<String>,
}

pub struct EditOptions {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub team: Option<String>,
}

#[derive(serde::Serialize)]
struct ProjectListOutput {
    total: usize,
    projects: Vec<Project>,
}

#[derive(serde::Serialize)]
struct ProjectShowOutput {
    #[serde(flatten)]
    project: Project,
    team_name: String,
    tasks: Vec<Task>,
}

pub fn run_new(globals: &GlobalOptions, options: NewOptions) -> Result<()> {
    let ctx = globals.context()?;
    let project = ProjectStore::new(ctx.storage).create(
        &ctx.user,
        &options.name,
        options.description,
        &options.team,
    )?;

    let mut human = project_human(format!("crew project new: {}", project.name), &project);
    human.push_next_step(format!(
        "crew task new <title> --project {} [--member <id>]",
        project.id
    ));
    emit_success(ctx.output, "project new", &project, Some(&human))
}

pub fn run_list(globals: &GlobalOptions) -> Result<()> {
    let ctx = globals.context()?;
    let projects = ProjectStore::new(ctx.storage).list(&ctx.user)?;

    let mut human = HumanOutput::new(format!(
        "crew project list: {} project(s)",
        projects.len()
    ));
    for project in &projects {
        human.push_detail(format!("{} {} (team {})", project.id, project.name, project.team));
    }

    let output = ProjectListOutput {
        total: projects.len(),
        projects,
    };
    emit_success(ctx.output, "project list", &output, Some(&human))
}

pub fn run_show(globals: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = globals.context()?;
    let store = ProjectStore::new(ctx.storage.clone());
    let (project, team): (Project, Team) = store.get_with_team(&ctx.user, id)?;
    let tasks = task::tasks_for_project(&ctx.storage, &ctx.user, &project.id)?;

    let mut human = project_human(format!("crew project show: {}", project.name), &project);
    human.push_summary("team name", team.name.clone());
    human.push_summary("tasks", tasks.len().to_string());
    for task in &tasks {
        human.push_detail(format!(
            "{} [{}] {} -> {}",
            task.id, task.priority, task.title, task.assigned_member.name
        ));
    }

    let output = ProjectShowOutput {
        project,
        team_name: team.name,
        tasks,
    };
    emit_success(ctx.output, "project show", &output, Some(&human))
}

pub fn run_edit(globals: &GlobalOptions, options: EditOptions) -> Result<()> {
    let ctx = globals.context()?;
    let project = ProjectStore::new(ctx.storage).edit(
        &ctx.user,
        &options.id,
        options.name,
        options.description,
        options.team,
    )?;
    let human = project_human(format!("crew project edit: {}", project.name), &project);
    emit_success(ctx.output, "project edit", &project, Some(&human))
}

pub fn run_rm(globals: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = globals.context()?;
    let report = ProjectStore::new(ctx.storage).delete(&ctx.user, id)?;

    let mut human = HumanOutput::new(format!("crew project rm: deleted {}", report.project_id));
    human.push_summary("deleted tasks", report.deleted_tasks.to_string());
    emit_success(ctx.output, "project rm", &report, Some(&human))
}

fn project_human(header: String, project: &Project) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("id", project.id.clone());
    human.push_summary("name", project.name.clone());
    if let Some(description) = &project.description {
        human.push_summary("description", description.clone());
    }
    human.push_summary("team", project.team.clone());
    human
}
