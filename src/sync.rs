//! Remote sync instructions and their dispatch.
//!
//! Local board mutations are optimistic: the board is published first and the
//! matching [`SyncOp`]s are handed to the [`SyncDispatcher`] afterwards. Each
//! op runs as its own tokio task against the backend. Outcomes never touch
//! the local board; they are logged and reported on a channel so callers can
//! observe divergence.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use ulid::Ulid;

use crate::gateway::{BoardBackend, ColumnPatch};
use crate::model::{BoardSettings, Column, Task};
use crate::session::Session;

/// A single remote write, in the shape the backend understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SyncOp {
    CreateTask {
        column_id: String,
        task: Task,
        position: usize,
    },
    UpdateTask {
        task: Task,
    },
    DeleteTask {
        task_id: String,
    },
    DeleteTasks {
        task_ids: Vec<String>,
    },
    CreateColumn {
        column: Column,
        position: usize,
    },
    UpdateColumn {
        column_id: String,
        patch: ColumnPatch,
    },
    DeleteColumn {
        column_id: String,
    },
    ReorderTasks {
        column_id: String,
        task_ids: Vec<String>,
    },
    MoveTask {
        task_id: String,
        column_id: String,
        position: usize,
    },
    ReorderColumns {
        column_ids: Vec<String>,
    },
    UpdateBoardSettings {
        settings: BoardSettings,
    },
}

impl SyncOp {
    pub fn name(&self) -> &'static str {
        match self {
            SyncOp::CreateTask { .. } => "create_task",
            SyncOp::UpdateTask { .. } => "update_task",
            SyncOp::DeleteTask { .. } => "delete_task",
            SyncOp::DeleteTasks { .. } => "delete_tasks",
            SyncOp::CreateColumn { .. } => "create_column",
            SyncOp::UpdateColumn { .. } => "update_column",
            SyncOp::DeleteColumn { .. } => "delete_column",
            SyncOp::ReorderTasks { .. } => "reorder_tasks",
            SyncOp::MoveTask { .. } => "move_task",
            SyncOp::ReorderColumns { .. } => "reorder_columns",
            SyncOp::UpdateBoardSettings { .. } => "update_board_settings",
        }
    }

    /// Perform this op against `backend`.
    pub async fn apply(
        &self,
        backend: &dyn BoardBackend,
        session: &Session,
    ) -> crate::Result<()> {
        match self {
            SyncOp::CreateTask {
                column_id,
                task,
                position,
            } => backend.create_task(column_id, task, *position).await,
            SyncOp::UpdateTask { task } => backend.update_task(task).await,
            SyncOp::DeleteTask { task_id } => backend.delete_task(task_id).await,
            SyncOp::DeleteTasks { task_ids } => {
                if task_ids.is_empty() {
                    return Ok(());
                }
                backend.delete_tasks(task_ids).await
            }
            SyncOp::CreateColumn { column, position } => {
                backend
                    .create_column(&session.board_id, column, *position)
                    .await
            }
            SyncOp::UpdateColumn { column_id, patch } => {
                backend.update_column(column_id, patch).await
            }
            SyncOp::DeleteColumn { column_id } => backend.delete_column(column_id).await,
            SyncOp::ReorderTasks {
                column_id,
                task_ids,
            } => backend.reorder_tasks(column_id, task_ids).await,
            SyncOp::MoveTask {
                task_id,
                column_id,
                position,
            } => backend.move_task(task_id, column_id, *position).await,
            SyncOp::ReorderColumns { column_ids } => backend.reorder_columns(column_ids).await,
            SyncOp::UpdateBoardSettings { settings } => {
                backend
                    .update_board_settings(&session.board_id, settings)
                    .await
            }
        }
    }
}

/// Outcome of one dispatched op.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub id: String,
    /// Issue order within the dispatcher, starting at 0.
    pub seq: u64,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Issues sync ops to the backend without blocking the caller.
pub struct SyncDispatcher {
    backend: Arc<dyn BoardBackend>,
    session: Session,
    reports: mpsc::UnboundedSender<SyncReport>,
    in_flight: Vec<JoinHandle<()>>,
    next_seq: u64,
}

impl SyncDispatcher {
    /// Create a dispatcher and the receiving end of its report channel.
    pub fn new(
        backend: Arc<dyn BoardBackend>,
        session: Session,
    ) -> (Self, mpsc::UnboundedReceiver<SyncReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                backend,
                session,
                reports: tx,
                in_flight: Vec::new(),
                next_seq: 0,
            },
            rx,
        )
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn backend(&self) -> Arc<dyn BoardBackend> {
        Arc::clone(&self.backend)
    }

    /// Spawn one task per op, in the given order. Must be called from within
    /// a tokio runtime.
    pub fn issue(&mut self, ops: Vec<SyncOp>) {
        self.in_flight.retain(|handle| !handle.is_finished());
        for op in ops {
            let seq = self.next_seq;
            self.next_seq += 1;
            let id = Ulid::new().to_string();
            let backend = Arc::clone(&self.backend);
            let session = self.session.clone();
            let reports = self.reports.clone();
            tracing::debug!(seq, op = op.name(), "issuing sync op");

            self.in_flight.push(tokio::spawn(async move {
                let result = op.apply(backend.as_ref(), &session).await;
                let error = match result {
                    Ok(()) => None,
                    Err(err) => {
                        tracing::warn!(seq, op = op.name(), error = %err, "sync op failed; local state kept");
                        Some(err.to_string())
                    }
                };
                // Nobody listening is fine.
                let _ = reports.send(SyncReport {
                    id,
                    seq,
                    op: op.name(),
                    error,
                });
            }));
        }
    }

    /// Number of ops issued so far.
    pub fn issued(&self) -> u64 {
        self.next_seq
    }

    /// Wait for every in-flight op to finish.
    pub async fn drain(&mut self) {
        for handle in self.in_flight.drain(..) {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "sync task aborted");
            }
        }
    }
}
