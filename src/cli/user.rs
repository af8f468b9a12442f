//! crew user command implementation
//!
//! Provides user identity helpers (set/show/clear).

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::user;

use super::GlobalOptions;

#[derive(serde::Serialize)]
struct UserSetReport {
    user: String,
    path: PathBuf,
}

#[derive(serde::Serialize)]
struct UserShowReport {
    user: Option<String>,
}

#[derive(serde::Serialize)]
struct UserClearReport {
    cleared: bool,
}

pub fn run_set(globals: &GlobalOptions, name: &str) -> Result<()> {
    let storage = globals.open_storage()?;
    let user_name = user::persist_user(&storage, name)?;
    let path = storage.session_file();

    let report = UserSetReport {
        user: user_name.clone(),
        path: path.clone(),
    };

    let mut human = HumanOutput::new(format!("crew user set: {user_name}"));
    human.push_summary("user", user_name);
    human.push_summary("path", path.display().to_string());
    human.push_next_step("crew team list");

    emit_success(globals.output(), "user set", &report, Some(&human))
}

pub fn run_show(globals: &GlobalOptions) -> Result<()> {
    let storage = globals.open_storage()?;
    let resolved = match user::resolve_user(&storage, globals.user.as_deref()) {
        Ok(name) => Some(name),
        Err(Error::Unauthorized(_)) => None,
        Err(err) => return Err(err),
    };

    let header = match &resolved {
        Some(name) => format!("crew user: {name}"),
        None => "crew user: not set".to_string(),
    };
    let mut human = HumanOutput::new(header);
    match &resolved {
        Some(name) => human.push_summary("user", name.clone()),
        None => {
            human.push_warning("no identity; commands will be rejected");
            human.push_next_step("crew user set <name>");
        }
    }

    let report = UserShowReport { user: resolved };
    emit_success(globals.output(), "user show", &report, Some(&human))
}

pub fn run_clear(globals: &GlobalOptions) -> Result<()> {
    let storage = globals.open_storage()?;
    let cleared = user::clear_session(&storage)?;

    let header = if cleared {
        "crew user clear: session removed"
    } else {
        "crew user clear: no session"
    };
    let human = HumanOutput::new(header);
    emit_success(
        globals.output(),
        "user clear",
        &UserClearReport { cleared },
        Some(&human),
    )
}
