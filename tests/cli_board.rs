mod support;

use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

use support::TestBoard;

fn task_id(data: &Value) -> String {
    data["task"]["id"].as_str().expect("task id").to_string()
}

#[test]
fn new_tasks_go_to_the_front_of_the_column() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;

    let first = board.json(&["task", "new", "--title", "First"]);
    assert_eq!(first["ops"], serde_json::json!(["create_task", "reorder_tasks", "update_task"]));
    board.json(&["task", "new", "--column", "to do", "--title", "Second", "--priority", "high"]);
    let untitled = board.json(&["task", "new", "--column", "Done"]);

    assert_eq!(untitled["task"]["title"], "New Issue");
    assert_eq!(untitled["task"]["priority"], "Medium");
    assert_eq!(board.titles(0), vec!["Second", "First"]);
    assert_eq!(board.titles(2), vec!["New Issue"]);
    Ok(())
}

#[test]
fn move_task_between_columns() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    let a = task_id(&board.json(&["task", "new", "--title", "A"]));
    board.json(&["task", "new", "--title", "B"]);

    let moved = board.json(&["task", "mv", &a, "--to", "In Progress", "--index", "0"]);
    assert_eq!(moved["moved"], true);
    assert_eq!(moved["index"], 0);
    assert_eq!(board.titles(0), vec!["B"]);
    assert_eq!(board.titles(1), vec!["A"]);

    // dropping where it already is changes nothing
    let again = board.json(&["task", "mv", &a[..8], "--to", "In Progress", "--index", "0"]);
    assert_eq!(again["moved"], false);

    // out-of-range index lands at the end
    let b = board.json(&["show"])["columns"][0]["tasks"][0]["id"]
        .as_str()
        .expect("id")
        .to_string();
    let moved = board.json(&["task", "mv", &b, "--to", "In Progress", "--index", "99"]);
    assert_eq!(moved["index"], 1);
    assert_eq!(board.titles(1), vec!["A", "B"]);
    assert!(board.titles(0).is_empty());
    Ok(())
}

#[test]
fn edit_and_delete_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    let a = task_id(&board.json(&["task", "new", "--title", "A"]));
    let b = task_id(&board.json(&["task", "new", "--title", "B"]));
    let c = task_id(&board.json(&["task", "new", "--title", "C"]));

    let edited = board.json(&[
        "task", "edit", &a, "--title", "Alpha", "--tag", "ui", "--tag", "bug", "--points", "5",
        "--done",
    ]);
    assert_eq!(edited["task"]["title"], "Alpha");
    assert_eq!(edited["task"]["tags"], serde_json::json!(["ui", "bug"]));
    assert_eq!(edited["task"]["story_points"], 5);
    assert_eq!(edited["task"]["is_completed"], true);

    let unchanged = board.json(&["task", "edit", &a, "--title", "Alpha"]);
    assert_eq!(unchanged["ops"], serde_json::json!([]));

    board.json(&["task", "rm", &b, &c]);
    assert_eq!(board.titles(0), vec!["Alpha"]);

    board
        .cmd()
        .args(["task", "edit", &a, "--points", "0"])
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn column_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;

    let resized = board.json(&["column", "resize", "To Do", "50"]);
    assert_eq!(resized["width"], 250);
    let resized = board.json(&["column", "resize", "To Do", "10000"]);
    assert_eq!(resized["width"], 800);

    let renamed = board.json(&["column", "rename", "To Do", "Backlog"]);
    assert_eq!(renamed["title"], "Backlog");
    let unchanged = board.json(&["column", "rename", "Backlog", "  "]);
    assert_eq!(unchanged["changed"], false);
    assert_eq!(unchanged["title"], "Backlog");

    let created = board.json(&["column", "new", "QA"]);
    assert_eq!(created["width"], 320);
    let qa = created["column_id"].as_str().expect("id").to_string();
    assert_eq!(board.column_ids().last(), Some(&qa));

    let order = board.json(&["column", "mv", "QA", "0"]);
    assert_eq!(order["column_ids"][0], qa.as_str());
    assert_eq!(board.column_ids()[0], qa);

    board.json(&["task", "new", "--column", "QA", "--title", "Verify"]);
    board.json(&["task", "new", "--column", "QA", "--title", "Sign off"]);
    board.json(&["column", "rm", "QA"]);
    assert_eq!(board.column_ids().len(), 3);

    let stored: Value = serde_json::from_str(&std::fs::read_to_string(board.store_path())?)?;
    assert!(stored["tasks"].as_array().expect("rows").is_empty());
    Ok(())
}

#[test]
fn naive_import_appends_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    board.json(&["task", "new", "--title", "Existing"]);

    let imported = board.json(&["import", "To Do", "- Fix bug\n1. Write tests\n\nPolish UI"]);
    assert_eq!(imported["task_ids"].as_array().expect("ids").len(), 3);
    assert_eq!(
        board.titles(0),
        vec!["Existing", "Fix bug", "Write tests", "Polish UI"]
    );

    let empty = board.json(&["import", "To Do", "   "]);
    assert!(empty["task_ids"].as_array().expect("ids").is_empty());
    assert_eq!(board.titles(0).len(), 4);
    Ok(())
}

#[test]
fn settings_and_search() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    board.json(&["task", "new", "--title", "Fix login", "--description", "OAuth loop"]);
    board.json(&["task", "new", "--title", "Write docs", "--tag", "docs"]);

    board
        .cmd()
        .arg("show")
        .assert()
        .success()
        .stdout(contains("OAuth loop"));

    let settings = board.json(&["settings", "--condensed", "true"]);
    assert_eq!(settings["is_condensed"], true);
    board
        .cmd()
        .arg("show")
        .assert()
        .success()
        .stdout(contains("Fix login"))
        .stdout(contains("OAuth loop").not());

    let hits = board.json(&["show", "--search", "DOCS"]);
    assert_eq!(hits["columns"][0]["tasks"].as_array().expect("tasks").len(), 1);
    assert_eq!(hits["columns"][0]["tasks"][0]["title"], "Write docs");

    let check = board.json(&["check"]);
    assert_eq!(check["ok"], true);
    Ok(())
}

#[test]
fn events_are_written_as_json_lines() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    let events = board.path().join("events.jsonl");
    let events_arg = events.to_string_lossy().to_string();

    board.json(&["--events", &events_arg, "task", "new", "--title", "Evented"]);
    board.json(&["--events", &events_arg, "column", "new", "Later"]);

    let lines: Vec<Value> = std::fs::read_to_string(&events)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"], "task_created");
    assert_eq!(lines[0]["user"], "tester");
    assert_eq!(lines[1]["event"], "column_created");
    Ok(())
}

#[test]
fn boards_are_per_user() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    board.json(&["task", "new", "--title", "Mine"]);

    let other = board
        .cmd()
        .args(["--json", "--user", "someone-else", "show"])
        .output()?;
    assert!(other.status.success());
    let envelope: Value = serde_json::from_slice(&other.stdout)?;
    assert!(envelope["data"]["columns"][0]["tasks"]
        .as_array()
        .expect("tasks")
        .is_empty());
    assert_eq!(board.titles(0), vec!["Mine"]);
    Ok(())
}
