use std::fs;

use genboard::config::{Config, CONFIG_FILE};

#[test]
fn config_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::load_from_dir(dir.path());

    assert_eq!(config.board.title, "My Board");
    assert_eq!(config.board.default_columns.len(), 3);
    assert_eq!(config.board.default_width, 320);
    assert_eq!(config.board.new_task_title, "New Issue");
    assert_eq!(config.generator.api_key_env, "GEMINI_API_KEY");
    assert!(config.storage.path.is_none());
}

#[test]
fn config_overrides_from_toml() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let toml = r#"
[board]
title = "Sprint"
default_columns = ["Backlog", "Doing"]
default_width = 300
min_width = 200
max_width = 600

[generator]
model = "gemini-2.0-flash"
api_key_env = "MY_KEY"

[storage]
path = "data/board.json"
"#;
    fs::write(dir.path().join(CONFIG_FILE), toml)?;

    let config = Config::load_from_dir(dir.path());
    assert_eq!(config.board.title, "Sprint");
    assert_eq!(config.board.default_columns, vec!["Backlog", "Doing"]);
    assert_eq!(config.board.clamp_width(100), 200);
    assert_eq!(config.board.clamp_width(900), 600);
    assert_eq!(config.board.new_task_title, "New Issue");
    assert_eq!(config.generator.model, "gemini-2.0-flash");
    assert_eq!(config.generator.api_key_env, "MY_KEY");
    assert_eq!(
        config.storage.board_path(dir.path()),
        dir.path().join("data/board.json")
    );
    Ok(())
}

#[test]
fn invalid_config_is_an_error_but_dir_load_falls_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(CONFIG_FILE);
    fs::write(&path, "[board]\nmin_width = 900\nmax_width = 100\n")?;

    let err = Config::load(&path).expect_err("min above max");
    assert_eq!(err.exit_code(), 2);

    let config = Config::load_from_dir(dir.path());
    assert_eq!(config.board.min_width, 250);
    Ok(())
}

#[test]
fn saved_config_loads_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(CONFIG_FILE);
    let mut config = Config::default();
    config.board.title = "Saved".to_string();
    config.save(&path)?;

    let loaded = Config::load(&path)?;
    assert_eq!(loaded.board.title, "Saved");
    assert_eq!(loaded.generator.endpoint, config.generator.endpoint);
    Ok(())
}
