//! Persistence gateway.
//!
//! [`BoardBackend`] is the seam to the hosted store. Every remote write is a
//! discrete call; nothing is batched. Two implementations ship with the crate:
//! [`FileBackend`] keeps the rows in a locked JSON document on disk and
//! [`MemoryBackend`] keeps them in memory with failure injection for tests.

mod file;
mod memory;
mod rows;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use rows::{BoardRow, ColumnRow, Tables, TaskRow};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::BoardConfig;
use crate::error::Result;
use crate::model::{Board, BoardSettings, Column, Task};

/// Partial column update. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

impl ColumnPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            width: None,
        }
    }

    pub fn width(width: u32) -> Self {
        Self {
            title: None,
            width: Some(width),
        }
    }
}

/// A user's board as loaded from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardSnapshot {
    pub board_id: String,
    pub board: Board,
}

/// What a freshly created board looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardDefaults {
    pub title: String,
    pub columns: Vec<String>,
    pub width: u32,
}

impl Default for BoardDefaults {
    fn default() -> Self {
        Self::from_config(&BoardConfig::default())
    }
}

impl BoardDefaults {
    pub fn from_config(config: &BoardConfig) -> Self {
        Self {
            title: config.title.clone(),
            columns: config.default_columns.clone(),
            width: config.default_width,
        }
    }
}

/// Remote operations against the hosted store.
#[async_trait]
pub trait BoardBackend: Send + Sync {
    /// Load the user's board, creating a default one first if none exists.
    async fn load_board(&self, user_id: &str) -> Result<BoardSnapshot>;

    async fn create_task(&self, column_id: &str, task: &Task, position: usize) -> Result<()>;

    async fn update_task(&self, task: &Task) -> Result<()>;

    async fn delete_task(&self, task_id: &str) -> Result<()>;

    async fn delete_tasks(&self, task_ids: &[String]) -> Result<()>;

    async fn create_column(&self, board_id: &str, column: &Column, position: usize) -> Result<()>;

    async fn update_column(&self, column_id: &str, patch: &ColumnPatch) -> Result<()>;

    async fn delete_column(&self, column_id: &str) -> Result<()>;

    /// Rewrite position and column membership of every listed task.
    async fn reorder_tasks(&self, column_id: &str, task_ids: &[String]) -> Result<()>;

    /// Set one task's column membership and position.
    async fn move_task(&self, task_id: &str, column_id: &str, position: usize) -> Result<()>;

    async fn reorder_columns(&self, column_ids: &[String]) -> Result<()>;

    async fn update_board_settings(&self, board_id: &str, settings: &BoardSettings) -> Result<()>;
}
