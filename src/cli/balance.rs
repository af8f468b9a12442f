//! crew reassign, auto-assign, dashboard, and activity commands.

use crate::activity::{format_entry, ActivityLog, ActivityLogStore};
use crate::balance::Balancer;
use crate::dashboard;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

use super::task::task_human;
use super::GlobalOptions;

#[derive(serde::Serialize)]
struct ActivityOutput {
    total: usize,
    entries: Vec<ActivityLog>,
}

pub fn run_reassign(globals: &GlobalOptions, recount: bool) -> Result<()> {
    let ctx = globals.context()?;
    let report = Balancer::new(ctx.storage).reassign(&ctx.user, recount)?;

    let mut human = HumanOutput::new(format!("crew reassign: {}", report.message));
    for recounted in &report.recounted {
        for change in &recounted.changes {
            human.push_warning(format!(
                "recounted {} in {}: {} -> {}",
                change.name, recounted.team_id, change.before, change.after
            ));
        }
    }
    for moved in &report.reassigned_tasks {
        human.push_detail(format!(
            "{} \"{}\" {} -> {}",
            moved.task_id, moved.task_title, moved.from, moved.to
        ));
    }
    if !report.reassigned_tasks.is_empty() {
        human.push_next_step("crew dashboard");
    }
    emit_success(ctx.output, "reassign", &report, Some(&human))
}

pub fn run_auto_assign(globals: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = globals.context()?;
    let outcome = Balancer::new(ctx.storage).auto_assign(&ctx.user, id)?;

    let mut human = task_human(
        format!("crew task auto-assign: {}", outcome.message),
        &outcome.task,
    );
    if !outcome.changed {
        human.push_warning("task already belongs to the least loaded member");
    }
    emit_success(ctx.output, "task auto-assign", &outcome, Some(&human))
}

pub fn run_dashboard(globals: &GlobalOptions) -> Result<()> {
    let ctx = globals.context()?;
    let recent = ctx.storage.config().dashboard.recent_activity;
    let stats = dashboard::stats(&ctx.storage, &ctx.user, recent)?;

    let mut human = HumanOutput::new("crew dashboard");
    human.push_summary("projects", stats.total_projects.to_string());
    human.push_summary("tasks", stats.total_tasks.to_string());
    for team in &stats.team_summary {
        human.push_detail(format!("{} {}", team.team_id, team.team_name));
        for member in &team.members {
            let flag = if member.is_overloaded { " OVERLOADED" } else { "" };
            human.push_detail(format!(
                "  {} ({}) {}/{}{}",
                member.name, member.role, member.current_tasks, member.capacity, flag
            ));
        }
    }
    for entry in &stats.recent_logs {
        human.push_detail(format_entry(entry));
    }
    if stats.overloaded_members().next().is_some() {
        human.push_warning("some members are over capacity");
        human.push_next_step("crew reassign");
    }
    emit_success(ctx.output, "dashboard", &stats, Some(&human))
}

pub fn run_activity(globals: &GlobalOptions, limit: usize, task: Option<&str>) -> Result<()> {
    let ctx = globals.context()?;
    let log = ActivityLogStore::for_storage(&ctx.storage);
    let entries = match task {
        Some(task_id) => {
            let mut entries = log.for_task(&ctx.user, task_id)?;
            entries.reverse();
            entries.truncate(limit);
            entries
        }
        None => log.recent(&ctx.user, limit)?,
    };

    let mut human = HumanOutput::new(format!("crew activity: {} entr(ies)", entries.len()));
    for entry in &entries {
        human.push_detail(format_entry(entry));
    }

    let output = ActivityOutput {
        total: entries.len(),
        entries,
    };
    emit_success(ctx.output, "activity", &output, Some(&human))
}
