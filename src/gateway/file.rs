//! File-backed store: every row lives in one JSON document.
//!
//! Writes from this process are queued and applied in batches: whoever holds
//! the writer gate takes every queued write, applies them in arrival order
//! under the sidecar lock and rewrites the document once. The sidecar lock
//! only has to arbitrate between processes. File work runs on the blocking
//! pool so the dispatcher's tasks never hold a runtime worker while waiting.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{BoardBackend, BoardDefaults, BoardSnapshot, ColumnPatch, Tables};
use crate::error::{Error, Result};
use crate::lock::{lock_path_for, write_atomic, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::model::{BoardSettings, Column, Task};

type Change = Box<dyn FnOnce(&mut Tables) -> Result<()> + Send>;

/// A queued write and the channel its outcome goes back on.
struct PendingWrite {
    change: Change,
    done: oneshot::Sender<Result<()>>,
}

#[derive(Clone)]
pub struct FileBackend {
    path: PathBuf,
    defaults: BoardDefaults,
    queue: Arc<Mutex<Vec<PendingWrite>>>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBackend")
            .field("path", &self.path)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

fn file_error(message: impl fmt::Display) -> Error {
    Error::Backend {
        op: "file".to_string(),
        message: message.to_string(),
    }
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>, defaults: BoardDefaults) -> Self {
        Self {
            path: path.into(),
            defaults,
            queue: Arc::new(Mutex::new(Vec::new())),
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current rows without locking.
    pub fn read_tables(&self) -> Result<Tables> {
        read_tables(&self.path)
    }

    /// Run `f` alone against the document, holding the writer gate.
    async fn with_tables<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Tables) -> Result<(T, bool)> + Send + 'static,
    {
        let _gate = self.gate.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let _lock = FileLock::acquire(lock_path_for(&path), DEFAULT_LOCK_TIMEOUT_MS)?;
            let mut tables = read_tables(&path)?;
            let (value, dirty) = f(&mut tables)?;
            if dirty {
                let json = serde_json::to_vec_pretty(&tables)?;
                write_atomic(&path, &json)?;
            }
            Ok(value)
        })
        .await
        .map_err(file_error)?
    }

    /// Queue a change and wait until a batch containing it is on disk.
    async fn write<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Tables) -> Result<()> + Send + 'static,
    {
        let (done, outcome) = oneshot::channel();
        self.queue
            .lock()
            .map_err(|_| file_error("write queue poisoned"))?
            .push(PendingWrite {
                change: Box::new(f),
                done,
            });

        {
            let _gate = self.gate.lock().await;
            let batch = std::mem::take(
                &mut *self
                    .queue
                    .lock()
                    .map_err(|_| file_error("write queue poisoned"))?,
            );
            // An earlier holder may already have written ours.
            if !batch.is_empty() {
                let path = self.path.clone();
                tokio::task::spawn_blocking(move || apply_batch(&path, batch))
                    .await
                    .map_err(file_error)?;
            }
        }

        outcome
            .await
            .map_err(|_| file_error("queued write was dropped"))?
    }
}

/// Apply queued changes in order and write the document once. Each change
/// gets its own outcome; a failure to lock, read or write fails them all.
fn apply_batch(path: &Path, batch: Vec<PendingWrite>) {
    let loaded = FileLock::acquire(lock_path_for(path), DEFAULT_LOCK_TIMEOUT_MS)
        .and_then(|lock| Ok((lock, read_tables(path)?)));
    let (_lock, mut tables) = match loaded {
        Ok(loaded) => loaded,
        Err(err) => {
            let message = err.to_string();
            for pending in batch {
                let _ = pending.done.send(Err(file_error(&message)));
            }
            return;
        }
    };

    let mut outcomes = Vec::with_capacity(batch.len());
    let mut dirty = false;
    for pending in batch {
        let outcome = (pending.change)(&mut tables);
        dirty |= outcome.is_ok();
        outcomes.push((pending.done, outcome));
    }
    tracing::debug!(path = %path.display(), writes = outcomes.len(), "applying write batch");

    let written = if dirty {
        serde_json::to_vec_pretty(&tables)
            .map_err(Error::from)
            .and_then(|json| write_atomic(path, &json))
    } else {
        Ok(())
    };
    match written {
        Ok(()) => {
            for (done, outcome) in outcomes {
                let _ = done.send(outcome);
            }
        }
        Err(err) => {
            let message = err.to_string();
            for (done, _) in outcomes {
                let _ = done.send(Err(file_error(&message)));
            }
        }
    }
}

fn read_tables(path: &Path) -> Result<Tables> {
    if !path.exists() {
        return Ok(Tables::default());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Tables::default());
    }
    Ok(serde_json::from_str(&content)?)
}

#[async_trait]
impl BoardBackend for FileBackend {
    async fn load_board(&self, user_id: &str) -> Result<BoardSnapshot> {
        let user_id = user_id.to_string();
        let defaults = self.defaults.clone();
        let snapshot = self
            .with_tables(move |tables| Ok(tables.load_board(&user_id, &defaults)))
            .await?;
        tracing::info!(
            path = %self.path.display(),
            board_id = %snapshot.board_id,
            columns = snapshot.board.column_order.len(),
            tasks = snapshot.board.tasks.len(),
            "board loaded"
        );
        Ok(snapshot)
    }

    async fn create_task(&self, column_id: &str, task: &Task, position: usize) -> Result<()> {
        let column_id = column_id.to_string();
        let task = task.clone();
        self.write(move |t| t.create_task(&column_id, &task, position))
            .await
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        let task = task.clone();
        self.write(move |t| t.update_task(&task)).await
    }

    async fn delete_task(&self, task_id: &str) -> Result<()> {
        let ids = vec![task_id.to_string()];
        self.write(move |t| t.delete_tasks(&ids)).await
    }

    async fn delete_tasks(&self, task_ids: &[String]) -> Result<()> {
        let ids = task_ids.to_vec();
        self.write(move |t| t.delete_tasks(&ids)).await
    }

    async fn create_column(&self, board_id: &str, column: &Column, position: usize) -> Result<()> {
        let board_id = board_id.to_string();
        let column = column.clone();
        self.write(move |t| t.create_column(&board_id, &column, position))
            .await
    }

    async fn update_column(&self, column_id: &str, patch: &ColumnPatch) -> Result<()> {
        let column_id = column_id.to_string();
        let patch = patch.clone();
        self.write(move |t| t.update_column(&column_id, &patch))
            .await
    }

    async fn delete_column(&self, column_id: &str) -> Result<()> {
        let column_id = column_id.to_string();
        self.write(move |t| t.delete_column(&column_id)).await
    }

    async fn reorder_tasks(&self, column_id: &str, task_ids: &[String]) -> Result<()> {
        let column_id = column_id.to_string();
        let ids = task_ids.to_vec();
        self.write(move |t| t.reorder_tasks(&column_id, &ids))
            .await
    }

    async fn move_task(&self, task_id: &str, column_id: &str, position: usize) -> Result<()> {
        let task_id = task_id.to_string();
        let column_id = column_id.to_string();
        self.write(move |t| t.move_task(&task_id, &column_id, position))
            .await
    }

    async fn reorder_columns(&self, column_ids: &[String]) -> Result<()> {
        let ids = column_ids.to_vec();
        self.write(move |t| t.reorder_columns(&ids)).await
    }

    async fn update_board_settings(&self, board_id: &str, settings: &BoardSettings) -> Result<()> {
        let board_id = board_id.to_string();
        let settings = settings.clone();
        self.write(move |t| t.update_board_settings(&board_id, &settings))
            .await
    }
}
