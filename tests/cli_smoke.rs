mod support;

use assert_cmd::Command;
use predicates::str::contains;

use support::{crew_as, crew_cmd, TestStore};

#[test]
fn help_lists_command_groups() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("crew")?
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("team"))
        .stdout(contains("reassign"))
        .stdout(contains("dashboard"));
    Ok(())
}

#[test]
fn init_creates_store_and_config() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::init()?;

    crew_cmd(&store)
        .arg("init")
        .assert()
        .success()
        .stdout(contains("crew init: initialized"));

    assert!(store.path().join(".crew.toml").exists());
    assert!(store.path().join("teams").is_dir());
    assert!(store.path().join("activity").is_dir());

    crew_cmd(&store)
        .arg("init")
        .assert()
        .success()
        .stdout(contains("already initialized"));
    Ok(())
}

#[test]
fn json_envelope_has_schema_and_command() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::init()?;

    let output = crew_as(&store, "alice")
        .args(["team", "list", "--json"])
        .output()?;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["schema_version"], "crew.v1");
    assert_eq!(value["command"], "team list");
    assert_eq!(value["status"], "success");
    assert_eq!(value["data"]["total"], 0);
    Ok(())
}

#[test]
fn quiet_suppresses_human_output() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::init()?;

    crew_as(&store, "alice")
        .args(["team", "list", "--quiet"])
        .assert()
        .success()
        .stdout("");
    Ok(())
}
