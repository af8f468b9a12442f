#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub struct TestStore {
    dir: TempDir,
}

impl TestStore {
    pub fn init() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(".crew.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn activity_entries(&self) -> std::io::Result<usize> {
        let dir = self.dir.path().join("activity");
        if !dir.exists() {
            return Ok(0);
        }
        Ok(fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("json"))
            .count())
    }
}

/// The crew binary pointed at `store`, with no ambient identity
pub fn crew_cmd(store: &TestStore) -> Command {
    let mut cmd = Command::cargo_bin("crew").expect("crew binary");
    cmd.env("CREW_STORE", store.path());
    cmd.env_remove("CREW_USER");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// The crew binary acting as `user`
pub fn crew_as(store: &TestStore, user: &str) -> Command {
    let mut cmd = crew_cmd(store);
    cmd.env("CREW_USER", user);
    cmd
}

/// Run a `--json` command that must succeed and return its `data`
pub fn json_data(mut cmd: Command, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
    let output = cmd.args(args).arg("--json").output()?;
    if !output.status.success() {
        return Err(format!(
            "crew {:?} failed: {}{}",
            args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
        .into());
    }
    let value: Value = serde_json::from_slice(&output.stdout)?;
    Ok(value["data"].clone())
}

pub fn str_field<'a>(value: &'a Value, field: &str) -> Result<&'a str, Box<dyn std::error::Error>> {
    value[field]
        .as_str()
        .ok_or_else(|| format!("missing string field {field} in {value}").into())
}

/// Create a team `Core` with the given `name:role:capacity` members
pub fn create_team(store: &TestStore, user: &str, members: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
    let mut args = vec!["team", "new", "Core"];
    for member in members {
        args.push("--member");
        args.push(member);
    }
    json_data(crew_as(store, user), &args)
}

pub fn create_project(store: &TestStore, user: &str, team_id: &str) -> Result<String, Box<dyn std::error::Error>> {
    let project = json_data(
        crew_as(store, user),
        &["project", "new", "Launch", "--team", team_id],
    )?;
    Ok(str_field(&project, "id")?.to_string())
}

pub fn create_task(
    store: &TestStore,
    user: &str,
    project_id: &str,
    title: &str,
    member: Option<&str>,
    priority: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut args = vec!["task", "new", title, "--project", project_id, "--priority", priority];
    if let Some(member) = member {
        args.push("--member");
        args.push(member);
    }
    let task = json_data(crew_as(store, user), &args)?;
    Ok(str_field(&task, "id")?.to_string())
}

/// `current_tasks` of every member, in team order
pub fn member_loads(store: &TestStore, user: &str, team_id: &str) -> Result<Vec<u64>, Box<dyn std::error::Error>> {
    let team = json_data(crew_as(store, user), &["team", "show", team_id])?;
    let members = team["members"].as_array().cloned().unwrap_or_default();
    Ok(members
        .iter()
        .map(|member| member["current_tasks"].as_u64().unwrap_or(0))
        .collect())
}
