mod support;

use assert_cmd::Command;
use predicates::str::contains;

use support::TestBoard;

#[test]
fn genboard_help_works() {
    Command::cargo_bin("genboard")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Kanban board"));
}

#[test]
fn subcommand_help_works() {
    let subcommands: [&[&str]; 8] = [
        &["show"],
        &["check"],
        &["import"],
        &["settings"],
        &["task"],
        &["task", "mv"],
        &["column"],
        &["column", "resize"],
    ];

    for cmd in subcommands {
        Command::cargo_bin("genboard")
            .expect("binary")
            .args(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn show_renders_default_board() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;

    board
        .cmd()
        .arg("show")
        .assert()
        .success()
        .stdout(contains("== To Do (0) [320px] =="))
        .stdout(contains("== In Progress (0) [320px] =="))
        .stdout(contains("== Done (0) [320px] =="));

    assert!(board.store_path().exists());
    Ok(())
}

#[test]
fn unknown_task_is_a_user_error() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;

    board
        .cmd()
        .args(["task", "rm", "does-not-exist"])
        .assert()
        .code(2)
        .stderr(contains("Task not found"));

    board
        .cmd()
        .args(["--json", "task", "edit", "nope", "--title", "x"])
        .assert()
        .code(2)
        .stdout(contains("\"kind\": \"user_error\""))
        .stdout(contains("\"command\": \"task edit\""));
    Ok(())
}

#[test]
fn enhance_without_api_key_fails_with_generation_code() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::with_config("[generator]\napi_key_env = \"GENBOARD_TEST_MISSING_KEY\"\n")?;
    let created = board.json(&["task", "new", "--title", "Draft"]);
    let id = created["task"]["id"].as_str().expect("id").to_string();

    board
        .cmd()
        .env_remove("GENBOARD_TEST_MISSING_KEY")
        .args(["task", "enhance", &id])
        .assert()
        .code(5)
        .stderr(contains("GENBOARD_TEST_MISSING_KEY"));

    assert_eq!(board.titles(0), vec!["Draft".to_string()]);
    Ok(())
}
