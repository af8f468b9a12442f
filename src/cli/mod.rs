//! Command-line interface for crew
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::output::OutputOptions;
use crate::storage::Storage;
use crate::task::{Priority, TaskStatus};
use crate::team::MemberSpec;

mod balance;
mod init;
mod project;
mod task;
mod team;
mod user;

/// crew - team task tracking with load balancing
///
/// Manage teams, projects and tasks, keep every member's workload within
/// capacity, and audit each reassignment.
#[derive(Parser, Debug)]
#[command(name = "crew")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the data store (defaults to the platform data directory)
    #[arg(long, global = true, env = "CREW_STORE")]
    pub store: Option<PathBuf>,

    /// User identity for this invocation
    #[arg(long, global = true, env = "CREW_USER")]
    pub user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the data store
    Init,

    /// Set or show the user identity
    #[command(subcommand)]
    User(UserCommands),

    /// Team and member management
    #[command(subcommand)]
    Team(TeamCommands),

    /// Project management
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Move excess Low/Medium tasks off overloaded members
    Reassign {
        /// Re-derive member counters from tasks before balancing
        #[arg(long)]
        recount: bool,
    },

    /// Show counts, member load, and recent reassignments
    Dashboard,

    /// Show the reassignment history
    Activity {
        /// Number of entries to show (newest first)
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,

        /// Only entries for this task
        #[arg(long)]
        task: Option<String>,
    },
}

/// User identity subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Persist the user identity for later invocations
    Set {
        /// User name
        name: String,
    },

    /// Show the resolved user identity
    Show,

    /// Forget the persisted user identity
    Clear,
}

/// Team subcommands
#[derive(Subcommand, Debug)]
pub enum TeamCommands {
    /// Create a team
    New {
        /// Team name
        name: String,

        /// Team description
        #[arg(long)]
        description: Option<String>,

        /// Member as name:role[:capacity] (repeatable)
        #[arg(short, long = "member")]
        members: Vec<MemberSpec>,
    },

    /// List teams
    List,

    /// Show a team and its members
    Show {
        /// Team ID
        id: String,
    },

    /// Edit team name or description
    Edit {
        /// Team ID
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a team no project uses
    Rm {
        /// Team ID
        id: String,
    },

    /// Recompute member counters from assigned tasks
    Recount {
        /// Team ID
        id: String,
    },

    /// Member management
    #[command(subcommand)]
    Member(MemberCommands),
}

/// Team member subcommands
#[derive(Subcommand, Debug)]
pub enum MemberCommands {
    /// Add a member to a team
    Add {
        /// Team ID
        team: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        role: String,

        /// Maximum concurrent tasks (0-5)
        #[arg(long)]
        capacity: Option<u32>,
    },

    /// Edit a member's name, role, or capacity
    Edit {
        /// Team ID
        team: String,

        /// Member ID
        member: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        capacity: Option<u32>,
    },

    /// Remove a member without assigned tasks
    Rm {
        /// Team ID
        team: String,

        /// Member ID
        member: String,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project for a team
    New {
        /// Project name
        name: String,

        /// Team ID
        #[arg(long)]
        team: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// List projects
    List,

    /// Show a project
    Show {
        /// Project ID
        id: String,
    },

    /// Edit a project
    Edit {
        /// Project ID
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Move the project to another team (no assigned tasks allowed)
        #[arg(long)]
        team: Option<String>,
    },

    /// Delete a project and its tasks
    Rm {
        /// Project ID
        id: String,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    New {
        /// Task title
        title: String,

        /// Project ID
        #[arg(long)]
        project: String,

        #[arg(long)]
        description: Option<String>,

        /// Assign to this member of the project's team
        #[arg(long)]
        member: Option<String>,

        /// Low, Medium, or High
        #[arg(long)]
        priority: Option<Priority>,

        /// Pending, InProgress, or Done
        #[arg(long)]
        status: Option<TaskStatus>,
    },

    /// List tasks (newest first)
    List {
        /// Only tasks of this project
        #[arg(long)]
        project: Option<String>,

        /// Only tasks assigned to this member
        #[arg(long)]
        member: Option<String>,
    },

    /// Show a task
    Show {
        /// Task ID
        id: String,
    },

    /// Edit a task
    Edit {
        /// Task ID
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long)]
        status: Option<TaskStatus>,

        /// Reassign to this member
        #[arg(long, conflicts_with = "unassign")]
        member: Option<String>,

        /// Clear the assignee
        #[arg(long)]
        unassign: bool,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: String,
    },

    /// Assign a task to the least loaded member of its team
    AutoAssign {
        /// Task ID
        id: String,
    },
}

/// Flags shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub store: Option<PathBuf>,
    pub user: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Open the store, creating it on first use
    pub fn open_storage(&self) -> Result<Storage> {
        let root = Storage::resolve_root(self.store.as_deref())?;
        let storage = Storage::open(root);
        storage.init()?;
        Ok(storage)
    }

    /// Open the store and resolve the calling user
    pub fn context(&self) -> Result<Context> {
        let storage = self.open_storage()?;
        let user = crate::user::resolve_user(&storage, self.user.as_deref())?;
        tracing::debug!(user = %user, store = %storage.root().display(), "context loaded");
        Ok(Context {
            storage,
            user,
            output: self.output(),
        })
    }
}

/// Store, caller, and output settings for one command
pub struct Context {
    pub storage: Storage,
    pub user: String,
    pub output: OutputOptions,
}

impl Cli {
    fn globals(&self) -> GlobalOptions {
        GlobalOptions {
            store: self.store.clone(),
            user: self.user.clone(),
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = self.globals();
        match self.command {
            Commands::Init => init::run(&globals),
            Commands::User(cmd) => match cmd {
                UserCommands::Set { name } => user::run_set(&globals, &name),
                UserCommands::Show => user::run_show(&globals),
                UserCommands::Clear => user::run_clear(&globals),
            },
            Commands::Team(cmd) => match cmd {
                TeamCommands::New {
                    name,
                    description,
                    members,
                } => team::run_new(
                    &globals,
                    team::NewOptions {
                        name,
                        description,
                        members,
                    },
                ),
                TeamCommands::List => team::run_list(&globals),
                TeamCommands::Show { id } => team::run_show(&globals, &id),
                TeamCommands::Edit {
                    id,
                    name,
                    description,
                } => team::run_edit(
                    &globals,
                    team::EditOptions {
                        id,
                        name,
                        description,
                    },
                ),
                TeamCommands::Rm { id } => team::run_rm(&globals, &id),
                TeamCommands::Recount { id } => team::run_recount(&globals, &id),
                TeamCommands::Member(cmd) => match cmd {
                    MemberCommands::Add {
                        team,
                        name,
                        role,
                        capacity,
                    } => team::run_member_add(
                        &globals,
                        team::MemberAddOptions {
                            team,
                            name,
                            role,
                            capacity,
                        },
                    ),
                    MemberCommands::Edit {
                        team,
                        member,
                        name,
                        role,
                        capacity,
                    } => team::run_member_edit(
                        &globals,
                        team::MemberEditOptions {
                            team,
                            member,
                            name,
                            role,
                            capacity,
                        },
                    ),
                    MemberCommands::Rm { team, member } => {
                        team::run_member_rm(&globals, &team, &member)
                    }
                },
            },
            Commands::Project(cmd) => match cmd {
                ProjectCommands::New {
                    name,
                    team,
                    description,
                } => project::run_new(
                    &globals,
                    project::NewOptions {
                        name,
                        team,
                        description,
                    },
                ),
                ProjectCommands::List => project::run_list(&globals),
                ProjectCommands::Show { id } => project::run_show(&globals, &id),
                ProjectCommands::Edit {
                    id,
                    name,
                    description,
                    team,
                } => project::run_edit(
                    &globals,
                    project::EditOptions {
                        id,
                        name,
                        description,
                        team,
                    },
                ),
                ProjectCommands::Rm { id } => project::run_rm(&globals, &id),
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::New {
                    title,
                    project,
                    description,
                    member,
                    priority,
                    status,
                } => task::run_new(
                    &globals,
                    task::NewOptions {
                        title,
                        project,
                        description,
                        member,
                        priority,
                        status,
                    },
                ),
                TaskCommands::List { project, member } => {
                    task::run_list(&globals, task::ListOptions { project, member })
                }
                TaskCommands::Show { id } => task::run_show(&globals, &id),
                TaskCommands::Edit {
                    id,
                    title,
                    description,
                    priority,
                    status,
                    member,
                    unassign,
                } => task::run_edit(
                    &globals,
                    task::EditOptions {
                        id,
                        title,
                        description,
                        priority,
                        status,
                        member,
                        unassign,
                    },
                ),
                TaskCommands::Rm { id } => task::run_rm(&globals, &id),
                TaskCommands::AutoAssign { id } => balance::run_auto_assign(&globals, &id),
            },
            Commands::Reassign { recount } => balance::run_reassign(&globals, recount),
            Commands::Dashboard => balance::run_dashboard(&globals),
            Commands::Activity { limit, task } => {
                balance::run_activity(&globals, limit, task.as_deref())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_member_command() {
        let cli = Cli::try_parse_from([
            "crew", "team", "member", "add", "team-1", "--name", "Ada", "--role", "eng",
            "--capacity", "4",
        ])
        .unwrap();
        match cli.command {
            Commands::Team(TeamCommands::Member(MemberCommands::Add { capacity, .. })) => {
                assert_eq!(capacity, Some(4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_member_specs_and_priority() {
        let cli = Cli::try_parse_from([
            "crew", "team", "new", "Core", "-m", "Ada:eng:2", "-m", "Bo:design",
        ])
        .unwrap();
        let Commands::Team(TeamCommands::New { members, .. }) = cli.command else {
            panic!("expected team new");
        };
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].capacity, Some(2));

        let cli = Cli::try_parse_from([
            "crew", "task", "new", "Docs", "--project", "prj-1", "--priority", "high",
        ])
        .unwrap();
        let Commands::Task(TaskCommands::New { priority, .. }) = cli.command else {
            panic!("expected task new");
        };
        assert_eq!(priority, Some(Priority::High));

        assert!(Cli::try_parse_from(["crew", "task", "edit", "t", "--member", "m", "--unassign"])
            .is_err());
    }
}
