//! crew task command implementations.

use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::task::{Assignee, NewTask, Priority, Task, TaskFilter, TaskPatch, TaskStatus, TaskStore};

use super::GlobalOptions;

pub struct NewOptions {
    pub title: String,
    pub project: String,
    pub description: Option<String>,
    pub member: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
}

pub struct ListOptions {
    pub project: Option<String>,
    pub member: Option<String>,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub member: Option<String>,
    pub unassign: bool,
}

#[derive(serde::Serialize)]
struct TaskListOutput {
    total: usize,
    tasks: Vec<Task>,
}

pub fn run_new(globals: &GlobalOptions, options: NewOptions) -> Result<()> {
    let ctx = globals.context()?;
    let task = TaskStore::new(ctx.storage).create(
        &ctx.user,
        NewTask {
            title: options.title,
            description: options.description,
            project: options.project,
            member: options.member,
            priority: options.priority,
            status: options.status,
        },
    )?;

    let mut human = task_human(format!("crew task new: {}", task.title), &task);
    if task.assigned_member.member_id.is_none() {
        human.push_next_step(format!("crew task auto-assign {}", task.id));
    }
    emit_success(ctx.output, "task new", &task, Some(&human))
}

pub fn run_list(globals: &GlobalOptions, options: ListOptions) -> Result<()> {
    let ctx = globals.context()?;
    let filter = TaskFilter {
        project: options.project,
        member: options.member,
    };
    let tasks = TaskStore::new(ctx.storage).list(&ctx.user, &filter)?;

    let mut human = HumanOutput::new(format!("crew task list: {} task(s)", tasks.len()));
    for task in &tasks {
        human.push_detail(task_line(task));
    }

    let output = TaskListOutput {
        total: tasks.len(),
        tasks,
    };
    emit_success(ctx.output, "task list", &output, Some(&human))
}

pub fn run_show(globals: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = globals.context()?;
    let task = TaskStore::new(ctx.storage).get(&ctx.user, id)?;
    let human = task_human(format!("crew task show: {}", task.title), &task);
    emit_success(ctx.output, "task show", &task, Some(&human))
}

pub fn run_edit(globals: &GlobalOptions, options: EditOptions) -> Result<()> {
    let ctx = globals.context()?;
    let assignee = if options.unassign {
        Some(Assignee::Unassigned)
    } else {
        options.member.map(Assignee::Member)
    };
    let patch = TaskPatch {
        title: options.title,
        description: options.description,
        priority: options.priority,
        status: options.status,
        assignee,
    };
    let task = TaskStore::new(ctx.storage).edit(&ctx.user, &options.id, patch)?;
    let human = task_human(format!("crew task edit: {}", task.title), &task);
    emit_success(ctx.output, "task edit", &task, Some(&human))
}

pub fn run_rm(globals: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = globals.context()?;
    let task = TaskStore::new(ctx.storage).delete(&ctx.user, id)?;
    let human = task_human(format!("crew task rm: deleted {}", task.id), &task);
    emit_success(ctx.output, "task rm", &task, Some(&human))
}

fn task_line(task: &Task) -> String {
    format!(
        "{} [{}/{}] {} -> {}",
        task.id, task.priority, task.status, task.title, task.assigned_member.name
    )
}

pub(super) fn task_human(header: String, task: &Task) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("id", task.id.clone());
    human.push_summary("title", task.title.clone());
    if let Some(description) = &task.description {
        human.push_summary("description", description.clone());
    }
    human.push_summary("project", task.project.clone());
    human.push_summary("assigned", task.assigned_member.name.clone());
    human.push_summary("priority", task.priority.to_string());
    human.push_summary("status", task.status.to_string());
    human
}
