mod support;

use predicates::str::contains;

use support::{
    create_project, create_task, create_team, crew_as, json_data, member_loads, str_field,
    TestStore,
};

#[test]
fn team_crud_and_member_management() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::init()?;
    let team = create_team(&store, "alice", &["Ada:eng:2", "Bo:design"])?;
    let team_id = str_field(&team, "id")?.to_string();
    assert_eq!(team["members"][0]["capacity"], 2);
    assert_eq!(team["members"][1]["capacity"], 3);
    assert_eq!(team["members"][1]["current_tasks"], 0);

    let added = json_data(
        crew_as(&store, "alice"),
        &["team", "member", "add", &team_id, "--name", "Cy", "--role", "qa", "--capacity", "1"],
    )?;
    let member_id = str_field(&added, "member_id")?.to_string();
    assert_eq!(added["team"]["members"].as_array().map(Vec::len), Some(3));

    let edited = json_data(
        crew_as(&store, "alice"),
        &["team", "member", "edit", &team_id, &member_id, "--role", "lead"],
    )?;
    assert_eq!(edited["members"][2]["role"], "lead");

    json_data(
        crew_as(&store, "alice"),
        &["team", "member", "rm", &team_id, &member_id],
    )?;

    let renamed = json_data(
        crew_as(&store, "alice"),
        &["team", "edit", &team_id, "--name", "Platform"],
    )?;
    assert_eq!(renamed["name"], "Platform");

    let list = json_data(crew_as(&store, "alice"), &["team", "list"])?;
    assert_eq!(list["total"], 1);

    json_data(crew_as(&store, "alice"), &["team", "rm", &team_id])?;
    crew_as(&store, "alice")
        .args(["team", "show", &team_id])
        .assert()
        .code(3)
        .stderr(contains("team not found"));
    Ok(())
}

#[test]
fn capacity_out_of_range_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::init()?;
    crew_as(&store, "alice")
        .args(["team", "new", "Core", "--member", "Ada:eng:6"])
        .assert()
        .code(2)
        .stderr(contains("capacity must be between 0 and 5"));

    crew_as(&store, "alice")
        .args(["team", "new", "Core", "--member", "Ada"])
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn records_are_invisible_to_other_users() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::init()?;
    let team = create_team(&store, "alice", &["Ada:eng:2"])?;
    let team_id = str_field(&team, "id")?.to_string();
    let project_id = create_project(&store, "alice", &team_id)?;
    let task_id = create_task(&store, "alice", &project_id, "Docs", None, "Low")?;

    for args in [
        vec!["team", "show", team_id.as_str()],
        vec!["project", "show", project_id.as_str()],
        vec!["task", "show", task_id.as_str()],
        vec!["task", "rm", task_id.as_str()],
        vec!["task", "auto-assign", task_id.as_str()],
    ] {
        crew_as(&store, "bob").args(&args).assert().code(3);
    }

    crew_as(&store, "bob")
        .args(["project", "new", "Mine", "--team", &team_id])
        .assert()
        .code(3);

    let list = json_data(crew_as(&store, "bob"), &["task", "list"])?;
    assert_eq!(list["total"], 0);
    Ok(())
}

#[test]
fn task_lifecycle_keeps_counters_in_step() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::init()?;
    let team = create_team(&store, "alice", &["Ada:eng:3", "Bo:eng:3"])?;
    let team_id = str_field(&team, "id")?.to_string();
    let ada = str_field(&team["members"][0], "id")?.to_string();
    let bo = str_field(&team["members"][1], "id")?.to_string();
    let project_id = create_project(&store, "alice", &team_id)?;

    let task_id = create_task(&store, "alice", &project_id, "Docs", Some(&ada), "Medium")?;
    assert_eq!(member_loads(&store, "alice", &team_id)?, vec![1, 0]);

    let task = json_data(
        crew_as(&store, "alice"),
        &["task", "edit", &task_id, "--member", &bo, "--status", "in-progress"],
    )?;
    assert_eq!(task["assigned_member"]["name"], "Bo");
    assert_eq!(task["status"], "InProgress");
    assert_eq!(member_loads(&store, "alice", &team_id)?, vec![0, 1]);

    json_data(
        crew_as(&store, "alice"),
        &["task", "edit", &task_id, "--member", &bo, "--title", "Docs v2"],
    )?;
    assert_eq!(member_loads(&store, "alice", &team_id)?, vec![0, 1]);

    let task = json_data(crew_as(&store, "alice"), &["task", "edit", &task_id, "--unassign"])?;
    assert_eq!(task["assigned_member"]["name"], "Unassigned");
    assert_eq!(member_loads(&store, "alice", &team_id)?, vec![0, 0]);

    json_data(
        crew_as(&store, "alice"),
        &["task", "edit", &task_id, "--member", &ada],
    )?;
    json_data(crew_as(&store, "alice"), &["task", "rm", &task_id])?;
    assert_eq!(member_loads(&store, "alice", &team_id)?, vec![0, 0]);
    Ok(())
}

#[test]
fn task_member_must_belong_to_project_team() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::init()?;
    let core = create_team(&store, "alice", &["Ada:eng:3"])?;
    let other = create_team(&store, "alice", &["Zed:eng:3"])?;
    let project_id = create_project(&store, "alice", str_field(&core, "id")?)?;
    let zed = str_field(&other["members"][0], "id")?;

    crew_as(&store, "alice")
        .args(["task", "new", "Docs", "--project", &project_id, "--member", zed])
        .assert()
        .code(3)
        .stderr(contains("member not found"));

    crew_as(&store, "alice")
        .args(["task", "new", "Docs", "--project", &project_id, "--priority", "urgent"])
        .assert()
        .code(2);

    let list = json_data(crew_as(&store, "alice"), &["task", "list"])?;
    assert_eq!(list["total"], 0);
    Ok(())
}

#[test]
fn task_list_filters_and_orders_newest_first() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::init()?;
    let team = create_team(&store, "alice", &["Ada:eng:3"])?;
    let team_id = str_field(&team, "id")?.to_string();
    let ada = str_field(&team["members"][0], "id")?.to_string();
    let first = create_project(&store, "alice", &team_id)?;
    let second = create_project(&store, "alice", &team_id)?;

    let older = create_task(&store, "alice", &first, "older", Some(&ada), "Low")?;
    let newer = create_task(&store, "alice", &first, "newer", None, "Low")?;
    create_task(&store, "alice", &second, "elsewhere", None, "High")?;

    let list = json_data(crew_as(&store, "alice"), &["task", "list", "--project", &first])?;
    assert_eq!(list["total"], 2);
    assert_eq!(list["tasks"][0]["id"], newer.as_str());
    assert_eq!(list["tasks"][1]["id"], older.as_str());

    let mine = json_data(crew_as(&store, "alice"), &["task", "list", "--member", &ada])?;
    assert_eq!(mine["total"], 1);
    assert_eq!(mine["tasks"][0]["id"], older.as_str());
    Ok(())
}

#[test]
fn referential_rules_guard_deletes() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::init()?;
    let team = create_team(&store, "alice", &["Ada:eng:3"])?;
    let team_id = str_field(&team, "id")?.to_string();
    let ada = str_field(&team["members"][0], "id")?.to_string();
    let project_id = create_project(&store, "alice", &team_id)?;
    create_task(&store, "alice", &project_id, "a", Some(&ada), "Low")?;
    create_task(&store, "alice", &project_id, "b", Some(&ada), "High")?;

    crew_as(&store, "alice")
        .args(["team", "rm", &team_id])
        .assert()
        .code(2)
        .stderr(contains("used by 1 project"));

    crew_as(&store, "alice")
        .args(["team", "member", "rm", &team_id, &ada])
        .assert()
        .code(2)
        .stderr(contains("assigned task"));

    let other = create_team(&store, "alice", &["Zed:eng:3"])?;
    crew_as(&store, "alice")
        .args(["project", "edit", &project_id, "--team", str_field(&other, "id")?])
        .assert()
        .code(2);

    let report = json_data(crew_as(&store, "alice"), &["project", "rm", &project_id])?;
    assert_eq!(report["deleted_tasks"], 2);
    assert_eq!(member_loads(&store, "alice", &team_id)?, vec![0]);

    json_data(crew_as(&store, "alice"), &["team", "rm", &team_id])?;
    Ok(())
}

#[test]
fn project_show_includes_team_and_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::init()?;
    let team = create_team(&store, "alice", &["Ada:eng:3"])?;
    let project_id = create_project(&store, "alice", str_field(&team, "id")?)?;
    create_task(&store, "alice", &project_id, "Docs", None, "Low")?;

    let shown = json_data(crew_as(&store, "alice"), &["project", "show", &project_id])?;
    assert_eq!(shown["id"], project_id.as_str());
    assert_eq!(shown["team_name"], "Core");
    assert_eq!(shown["tasks"].as_array().map(Vec::len), Some(1));
    Ok(())
}
