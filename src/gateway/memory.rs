//! In-memory backend with a call log and failure injection.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BoardBackend, BoardDefaults, BoardSnapshot, ColumnPatch, Tables};
use crate::error::{Error, Result};
use crate::model::{BoardSettings, Column, Task};

#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    defaults: BoardDefaults,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryBackend {
    pub fn new(defaults: BoardDefaults) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    /// Make every future call to `op` (e.g. `"move_task"`) fail.
    pub fn fail_on(&self, op: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(op.to_string());
        }
    }

    /// Names of the calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn tables(&self) -> Tables {
        self.tables.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn run<T, F>(&self, op: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Tables) -> Result<T>,
    {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(op.to_string());
        }
        let should_fail = self
            .failing
            .lock()
            .map(|failing| failing.contains(op))
            .unwrap_or(false);
        if should_fail {
            return Err(Error::Backend {
                op: op.to_string(),
                message: "injected failure".to_string(),
            });
        }
        let mut tables = self.tables.lock().map_err(|_| Error::Backend {
            op: op.to_string(),
            message: "table lock poisoned".to_string(),
        })?;
        f(&mut tables)
    }
}

#[async_trait]
impl BoardBackend for MemoryBackend {
    async fn load_board(&self, user_id: &str) -> Result<BoardSnapshot> {
        let defaults = self.defaults.clone();
        self.run("load_board", |t| Ok(t.load_board(user_id, &defaults).0))
    }

    async fn create_task(&self, column_id: &str, task: &Task, position: usize) -> Result<()> {
        self.run("create_task", |t| t.create_task(column_id, task, position))
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        self.run("update_task", |t| t.update_task(task))
    }

    async fn delete_task(&self, task_id: &str) -> Result<()> {
        self.run("delete_task", |t| t.delete_tasks(&[task_id.to_string()]))
    }

    async fn delete_tasks(&self, task_ids: &[String]) -> Result<()> {
        self.run("delete_tasks", |t| t.delete_tasks(task_ids))
    }

    async fn create_column(&self, board_id: &str, column: &Column, position: usize) -> Result<()> {
        self.run("create_column", |t| t.create_column(board_id, column, position))
    }

    async fn update_column(&self, column_id: &str, patch: &ColumnPatch) -> Result<()> {
        self.run("update_column", |t| t.update_column(column_id, patch))
    }

    async fn delete_column(&self, column_id: &str) -> Result<()> {
        self.run("delete_column", |t| t.delete_column(column_id))
    }

    async fn reorder_tasks(&self, column_id: &str, task_ids: &[String]) -> Result<()> {
        self.run("reorder_tasks", |t| t.reorder_tasks(column_id, task_ids))
    }

    async fn move_task(&self, task_id: &str, column_id: &str, position: usize) -> Result<()> {
        self.run("move_task", |t| t.move_task(task_id, column_id, position))
    }

    async fn reorder_columns(&self, column_ids: &[String]) -> Result<()> {
        self.run("reorder_columns", |t| t.reorder_columns(column_ids))
    }

    async fn update_board_settings(&self, board_id: &str, settings: &BoardSettings) -> Result<()> {
        self.run("update_board_settings", |t| {
            t.update_board_settings(board_id, settings)
        })
    }
}
