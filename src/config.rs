//! Configuration loading and management
//!
//! Handles parsing of `.genboard.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = ".genboard.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Board defaults and column width limits
    #[serde(default)]
    pub board: BoardConfig,

    /// Generative text service
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Local storage for the file backend
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Board-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Title of boards created on first load
    #[serde(default = "default_board_title")]
    pub title: String,

    /// Columns of a freshly created board, in order
    #[serde(default = "default_columns")]
    pub default_columns: Vec<String>,

    /// Width given to new columns
    #[serde(default = "default_width")]
    pub default_width: u32,

    /// Lower bound for column resizing
    #[serde(default = "default_min_width")]
    pub min_width: u32,

    /// Upper bound for column resizing
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    /// Title of tasks created from the board
    #[serde(default = "default_new_task_title")]
    pub new_task_title: String,
}

fn default_board_title() -> String {
    "My Board".to_string()
}

fn default_columns() -> Vec<String> {
    vec![
        "To Do".to_string(),
        "In Progress".to_string(),
        "Done".to_string(),
    ]
}

fn default_width() -> u32 {
    320
}

fn default_min_width() -> u32 {
    250
}

fn default_max_width() -> u32 {
    800
}

fn default_new_task_title() -> String {
    "New Issue".to_string()
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            title: default_board_title(),
            default_columns: default_columns(),
            default_width: default_width(),
            min_width: default_min_width(),
            max_width: default_max_width(),
            new_task_title: default_new_task_title(),
        }
    }
}

impl BoardConfig {
    /// Clamp a requested column width into `[min_width, max_width]`.
    pub fn clamp_width(&self, width: u32) -> u32 {
        width.clamp(self.min_width, self.max_width)
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.title.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "board.title cannot be empty".to_string(),
            ));
        }
        for column in &self.default_columns {
            if column.trim().is_empty() {
                return Err(crate::error::Error::InvalidConfig(
                    "board.default_columns cannot include empty entries".to_string(),
                ));
            }
        }
        if self.min_width == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "board.min_width must be > 0".to_string(),
            ));
        }
        if self.min_width > self.max_width {
            return Err(crate::error::Error::InvalidConfig(format!(
                "board.min_width ({}) must be <= board.max_width ({})",
                self.min_width, self.max_width
            )));
        }
        if self.default_width < self.min_width || self.default_width > self.max_width {
            return Err(crate::error::Error::InvalidConfig(format!(
                "board.default_width ({}) must be within [{}, {}]",
                self.default_width, self.min_width, self.max_width
            )));
        }
        if self.new_task_title.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "board.new_task_title cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Generative text configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Base URL of the generative language API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl GeneratorConfig {
    fn validate(&self) -> crate::error::Result<()> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(crate::error::Error::InvalidConfig(format!(
                "generator.endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }
        if self.model.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "generator.model cannot be empty".to_string(),
            ));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "generator.api_key_env cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Board document path; relative paths resolve against the working dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Where the file backend keeps its rows.
    pub fn board_path(&self, dir: &Path) -> PathBuf {
        match &self.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => dir.join(path),
            None => directories::ProjectDirs::from("", "", "genboard")
                .map(|dirs| dirs.data_dir().join("board.json"))
                .unwrap_or_else(|| dir.join(".genboard").join("board.json")),
        }
    }
}

impl Config {
    /// Load configuration from a `.genboard.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        self.board.validate()?;
        self.generator.validate()?;
        Ok(())
    }
}
