#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A scratch working directory with a `.genboard.toml` pointing the file
/// backend at `board.json` inside it.
pub struct TestBoard {
    dir: TempDir,
}

impl TestBoard {
    pub fn init() -> std::io::Result<Self> {
        Self::with_config("")
    }

    /// Extra TOML is appended after the storage section.
    pub fn with_config(extra: &str) -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let config = format!("[storage]\npath = \"board.json\"\n\n{extra}");
        fs::write(dir.path().join(".genboard.toml"), config)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("board.json")
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("genboard").expect("binary");
        cmd.current_dir(self.path())
            .env_remove("GENBOARD_DIR")
            .env("GENBOARD_USER", "tester")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run with `--json` and return the `data` payload of the envelope.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .output()
            .expect("run genboard");
        assert!(
            output.status.success(),
            "genboard {args:?} failed: {}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let envelope: Value = serde_json::from_slice(&output.stdout).expect("json envelope");
        assert_eq!(envelope["status"], "success");
        envelope["data"].clone()
    }

    /// Column ids in display order.
    pub fn column_ids(&self) -> Vec<String> {
        self.json(&["show"])["columns"]
            .as_array()
            .expect("columns")
            .iter()
            .map(|c| c["id"].as_str().expect("id").to_string())
            .collect()
    }

    /// Task titles of the column at `index`, in order.
    pub fn titles(&self, index: usize) -> Vec<String> {
        self.json(&["show"])["columns"][index]["tasks"]
            .as_array()
            .expect("tasks")
            .iter()
            .map(|t| t["title"].as_str().expect("title").to_string())
            .collect()
    }
}
