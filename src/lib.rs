//! crew - team task tracking with load balancing
//!
//! This library provides the core functionality for the crew CLI tool:
//! per-user teams, projects and tasks, with a live workload counter on every
//! team member that stays equal to the number of tasks assigned to it.
//!
//! # Core Concepts
//!
//! - **Teams**: members with a role, a capacity (0-5), and a load counter
//! - **Projects**: belong to one team; its members are the valid assignees
//! - **Tasks**: priority, status, and at most one assigned member
//! - **Balancing**: bulk reassignment away from overloaded members, and
//!   auto-assignment to the least loaded member
//! - **Activity log**: append-only audit trail of reassignments
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.crew.toml`
//! - `error`: Error types and result aliases
//! - `storage`: File-backed document store
//! - `lock`: File locking and atomic writes for concurrency safety
//! - `team`, `project`, `task`: entities and their CRUD
//! - `load`: member counter bookkeeping and member selection
//! - `balance`: reassignment and auto-assignment
//! - `activity`: reassignment audit trail
//! - `dashboard`: caller-scoped overview
//! - `user`: caller identity resolution

pub mod activity;
pub mod balance;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod load;
pub mod lock;
pub mod output;
pub mod project;
pub mod storage;
pub mod task;
pub mod team;
pub mod user;

pub use error::{Error, Result};
