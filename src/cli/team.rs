//! crew team command implementations.

use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::team::{Member, MemberSpec, RecountReport, Team, TeamStore};

use super::GlobalOptions;

pub struct NewOptions {
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<MemberSpec>,
}

pub struct EditOptions {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

pub struct MemberAddOptions {
    pub team: String,
    pub name: String,
    pub role: String,
    pub capacity: Option<u32>,
}

pub struct MemberEditOptions {
    pub team: String,
    pub member: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub capacity: Option<u32>,
}

#[derive(serde::Serialize)]
struct TeamListOutput {
    total: usize,
    teams: Vec<Team>,
}

#[derive(serde::Serialize)]
struct TeamDeleteOutput {
    id: String,
    deleted: bool,
}

#[derive(serde::Serialize)]
struct MemberAddOutput {
    member_id: String,
    team: Team,
}

#[derive(serde::Serialize)]
struct MemberRemoveOutput {
    member_id: String,
    team: Team,
}

pub fn run_new(globals: &GlobalOptions, options: NewOptions) -> Result<()> {
    let ctx = globals.context()?;
    let default_capacity = ctx.storage.config().members.default_capacity;
    let store = TeamStore::new(ctx.storage);
    let team = store.create(
        &ctx.user,
        &options.name,
        options.description,
        options.members,
        default_capacity,
    )?;

    let mut human = team_human(format!("crew team new: {}", team.name), &team);
    for member in team.members.iter().filter(|member| member.capacity == 0) {
        human.push_warning(format!(
            "{} has capacity 0 and will never receive tasks",
            member.name
        ));
    }
    human.push_next_step(format!("crew project new <name> --team {}", team.id));
    emit_success(ctx.output, "team new", &team, Some(&human))
}

pub fn run_list(globals: &GlobalOptions) -> Result<()> {
    let ctx = globals.context()?;
    let teams = TeamStore::new(ctx.storage).list(&ctx.user)?;

    let mut human = HumanOutput::new(format!("crew team list: {} team(s)", teams.len()));
    for team in &teams {
        let overloaded = team
            .members
            .iter()
            .filter(|member| member.is_overloaded())
            .count();
        let mut line = format!("{} {} ({} members)", team.id, team.name, team.members.len());
        if overloaded > 0 {
            line.push_str(&format!(", {overloaded} overloaded"));
        }
        human.push_detail(line);
    }
    if teams.is_empty() {
        human.push_next_step("crew team new <name> --member <name:role[:capacity]>");
    }

    let output = TeamListOutput {
        total: teams.len(),
        teams,
    };
    emit_success(ctx.output, "team list", &output, Some(&human))
}

pub fn run_show(globals: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = globals.context()?;
    let team = TeamStore::new(ctx.storage).get(&ctx.user, id)?;
    let human = team_human(format!("crew team show: {}", team.name), &team);
    emit_success(ctx.output, "team show", &team, Some(&human))
}

pub fn run_edit(globals: &GlobalOptions, options: EditOptions) -> Result<()> {
    let ctx = globals.context()?;
    let team = TeamStore::new(ctx.storage).edit(
        &ctx.user,
        &options.id,
        options.name,
        options.description,
    )?;
    let human = team_human(format!("crew team edit: {}", team.name), &team);
    emit_success(ctx.output, "team edit", &team, Some(&human))
}

pub fn run_rm(globals: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = globals.context()?;
    TeamStore::new(ctx.storage).delete(&ctx.user, id)?;

    let human = HumanOutput::new(format!("crew team rm: deleted {id}"));
    let output = TeamDeleteOutput {
        id: id.to_string(),
        deleted: true,
    };
    emit_success(ctx.output, "team rm", &output, Some(&human))
}

pub fn run_recount(globals: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = globals.context()?;
    let report = TeamStore::new(ctx.storage).recount(&ctx.user, id)?;
    let human = recount_human(&report);
    emit_success(ctx.output, "team recount", &report, Some(&human))
}

pub fn run_member_add(globals: &GlobalOptions, options: MemberAddOptions) -> Result<()> {
    let ctx = globals.context()?;
    let default_capacity = ctx.storage.config().members.default_capacity;
    let (team, member_id) = TeamStore::new(ctx.storage).add_member(
        &ctx.user,
        &options.team,
        &options.name,
        &options.role,
        options.capacity,
        default_capacity,
    )?;

    let mut human = team_human(format!("crew team member add: {}", options.name), &team);
    human.push_summary("member", member_id.clone());
    let output = MemberAddOutput { member_id, team };
    emit_success(ctx.output, "team member add", &output, Some(&human))
}

pub fn run_member_edit(globals: &GlobalOptions, options: MemberEditOptions) -> Result<()> {
    let ctx = globals.context()?;
    let team = TeamStore::new(ctx.storage).edit_member(
        &ctx.user,
        &options.team,
        &options.member,
        options.name,
        options.role,
        options.capacity,
    )?;

    let mut human = team_human(format!("crew team member edit: {}", options.member), &team);
    if let Some(member) = team.member(&options.member) {
        if member.is_overloaded() {
            human.push_warning(format!(
                "{} is now over capacity ({}/{})",
                member.name, member.current_tasks, member.capacity
            ));
            human.push_next_step("crew reassign");
        }
    }
    emit_success(ctx.output, "team member edit", &team, Some(&human))
}

pub fn run_member_rm(globals: &GlobalOptions, team_id: &str, member_id: &str) -> Result<()> {
    let ctx = globals.context()?;
    let team = TeamStore::new(ctx.storage).remove_member(&ctx.user, team_id, member_id)?;
    let human = team_human(format!("crew team member rm: {member_id}"), &team);
    let output = MemberRemoveOutput {
        member_id: member_id.to_string(),
        team,
    };
    emit_success(ctx.output, "team member rm", &output, Some(&human))
}

fn team_human(header: String, team: &Team) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("id", team.id.clone());
    human.push_summary("name", team.name.clone());
    if let Some(description) = &team.description {
        human.push_summary("description", description.clone());
    }
    human.push_summary("members", team.members.len().to_string());
    for member in &team.members {
        human.push_detail(member_line(member));
    }
    human
}

fn member_line(member: &Member) -> String {
    let flag = if member.is_overloaded() {
        " OVERLOADED"
    } else {
        ""
    };
    format!(
        "{} {} ({}) {}/{}{}",
        member.id, member.name, member.role, member.current_tasks, member.capacity, flag
    )
}

fn recount_human(report: &RecountReport) -> HumanOutput {
    let mut human = HumanOutput::new(format!("crew team recount: {}", report.team_id));
    human.push_summary("assigned tasks", report.assigned_tasks.to_string());
    human.push_summary("changed", report.changes.len().to_string());
    for change in &report.changes {
        human.push_detail(format!(
            "{} {}: {} -> {}",
            change.member_id, change.name, change.before, change.after
        ));
    }
    human
}
