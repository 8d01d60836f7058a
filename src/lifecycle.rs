//! Task and column lifecycle.
//!
//! [`BoardController`] is the single entry point for board edits. Each
//! operation computes the next board, publishes it through the
//! [`BoardStore`] and hands the matching sync ops to the dispatcher. The
//! caller never waits on the backend, and a failed op never rolls the local
//! board back.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::board::BoardStore;
use crate::config::BoardConfig;
use crate::error::Result;
use crate::gateway::{BoardBackend, ColumnPatch};
use crate::generator::TextGenerator;
use crate::import::{self, ImportMode, TaskDraft};
use crate::model::{Board, BoardSettings, Column, Task};
use crate::reorder::{self, DropResult, ReorderOutcome};
use crate::session::Session;
use crate::sync::{SyncDispatcher, SyncOp, SyncReport};

/// A published edit and the ops issued for it.
#[derive(Debug, Clone)]
pub struct Applied {
    pub board: Arc<Board>,
    pub ops: Vec<SyncOp>,
}

/// Tasks of one column that matched a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit<'a> {
    pub column: &'a Column,
    pub tasks: Vec<&'a Task>,
}

pub struct BoardController {
    store: BoardStore,
    dispatcher: SyncDispatcher,
    config: BoardConfig,
    last_timestamp: i64,
}

impl BoardController {
    /// Load the user's board (creating the default one if needed) and wire
    /// up the dispatcher. Returns the receiving end of the sync report
    /// channel alongside the controller.
    pub async fn open(
        backend: Arc<dyn BoardBackend>,
        user_id: &str,
        config: BoardConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SyncReport>)> {
        let snapshot = backend.load_board(user_id).await?;
        let session = Session::new(user_id, snapshot.board_id);
        let (dispatcher, reports) = SyncDispatcher::new(backend, session);
        let last_timestamp = snapshot
            .board
            .tasks
            .values()
            .map(|t| t.created_at)
            .max()
            .unwrap_or(0);
        Ok((
            Self {
                store: BoardStore::new(snapshot.board),
                dispatcher,
                config,
                last_timestamp,
            },
            reports,
        ))
    }

    pub fn board(&self) -> Arc<Board> {
        self.store.current()
    }

    pub fn session(&self) -> &Session {
        self.dispatcher.session()
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Number of sync ops issued since the controller was opened.
    pub fn issued(&self) -> u64 {
        self.dispatcher.issued()
    }

    /// Wait for every issued op to reach the backend.
    pub async fn drain(&mut self) {
        self.dispatcher.drain().await;
    }

    /// Milliseconds since the epoch, strictly increasing across calls.
    fn next_timestamp(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_timestamp = now.max(self.last_timestamp + 1);
        self.last_timestamp
    }

    fn commit(&mut self, next: Board, ops: Vec<SyncOp>) -> Applied {
        let board = self.store.replace(next);
        self.dispatcher.issue(ops.clone());
        Applied { board, ops }
    }

    /// Add a default task at the front of `column_id`.
    pub fn create_task(&mut self, column_id: &str) -> Option<Applied> {
        let Some(column) = self.store.board().columns.get(column_id).cloned() else {
            tracing::debug!(column_id, "create_task: unknown column");
            return None;
        };
        let task = Task::new(self.config.new_task_title.clone(), self.next_timestamp());

        let mut column = column;
        column.task_ids.insert(0, task.id.clone());
        let next = self
            .store
            .board()
            .with_task(task.clone())
            .with_column(column.clone());
        let ops = vec![
            SyncOp::CreateTask {
                column_id: column.id.clone(),
                task,
                position: 0,
            },
            SyncOp::ReorderTasks {
                column_id: column.id,
                task_ids: column.task_ids,
            },
        ];
        Some(self.commit(next, ops))
    }

    /// Replace a task by id.
    pub fn update_task(&mut self, task: Task) -> Option<Applied> {
        if !self.store.board().tasks.contains_key(&task.id) {
            tracing::debug!(task_id = %task.id, "update_task: unknown task");
            return None;
        }
        let next = self.store.board().with_task(task.clone());
        Some(self.commit(next, vec![SyncOp::UpdateTask { task }]))
    }

    pub fn delete_task(&mut self, task_id: &str) -> Option<Applied> {
        let board = self.store.board();
        if !board.tasks.contains_key(task_id) && board.column_of(task_id).is_none() {
            tracing::debug!(task_id, "delete_task: unknown task");
            return None;
        }
        let next = board.without_tasks(&[task_id.to_string()]);
        Some(self.commit(
            next,
            vec![SyncOp::DeleteTask {
                task_id: task_id.to_string(),
            }],
        ))
    }

    /// Remove several tasks at once. Unknown ids are dropped from the request.
    pub fn delete_tasks(&mut self, task_ids: &[String]) -> Option<Applied> {
        let board = self.store.board();
        let mut seen = HashSet::new();
        let known: Vec<String> = task_ids
            .iter()
            .filter(|id| board.tasks.contains_key(*id) || board.column_of(id).is_some())
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        if known.is_empty() {
            return None;
        }
        let next = board.without_tasks(&known);
        Some(self.commit(next, vec![SyncOp::DeleteTasks { task_ids: known }]))
    }

    /// Append an empty column with the default width.
    pub fn create_column(&mut self, title: &str) -> Option<Applied> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let column = Column::new(title, self.config.default_width);
        let position = self.store.board().column_order.len();
        let next = self.store.board().with_column(column.clone());
        Some(self.commit(next, vec![SyncOp::CreateColumn { column, position }]))
    }

    /// Rename a column. An empty title leaves it alone.
    pub fn rename_column(&mut self, column_id: &str, title: &str) -> Option<Applied> {
        let title = title.trim();
        if title.is_empty() {
            tracing::debug!(column_id, "rename_column: empty title ignored");
            return None;
        }
        let mut column = self.store.board().columns.get(column_id).cloned()?;
        column.title = title.to_string();
        let next = self.store.board().with_column(column);
        Some(self.commit(
            next,
            vec![SyncOp::UpdateColumn {
                column_id: column_id.to_string(),
                patch: ColumnPatch::title(title),
            }],
        ))
    }

    /// Set a column's width, clamped to the configured bounds.
    pub fn resize_column(&mut self, column_id: &str, width: u32) -> Option<Applied> {
        let mut column = self.store.board().columns.get(column_id).cloned()?;
        let width = self.config.clamp_width(width);
        column.width = Some(width);
        let next = self.store.board().with_column(column);
        Some(self.commit(
            next,
            vec![SyncOp::UpdateColumn {
                column_id: column_id.to_string(),
                patch: ColumnPatch::width(width),
            }],
        ))
    }

    /// Remove a column together with its tasks.
    pub fn delete_column(&mut self, column_id: &str) -> Option<Applied> {
        if !self.store.board().columns.contains_key(column_id) {
            tracing::debug!(column_id, "delete_column: unknown column");
            return None;
        }
        let next = self.store.board().without_column(column_id);
        Some(self.commit(
            next,
            vec![SyncOp::DeleteColumn {
                column_id: column_id.to_string(),
            }],
        ))
    }

    /// Apply a completed drag.
    pub fn move_task(&mut self, drop: &DropResult) -> Option<Applied> {
        match reorder::apply_drop(self.store.board(), drop) {
            ReorderOutcome::Unchanged => None,
            ReorderOutcome::Moved { board, ops } => Some(self.commit(board, ops)),
        }
    }

    pub fn reorder_columns(&mut self, from: usize, to: usize) -> Option<Applied> {
        let (order, op) = reorder::move_column(self.store.board(), from, to)?;
        let next = self.store.board().with_column_order(order);
        Some(self.commit(next, vec![op]))
    }

    pub fn update_settings(&mut self, settings: BoardSettings) -> Option<Applied> {
        if self.store.board().settings == settings {
            return None;
        }
        let next = self.store.board().with_settings(settings.clone());
        Some(self.commit(next, vec![SyncOp::UpdateBoardSettings { settings }]))
    }

    /// Append drafts to the end of a column, one create per draft.
    pub fn import_tasks(&mut self, column_id: &str, drafts: Vec<TaskDraft>) -> Option<Applied> {
        if drafts.is_empty() {
            return None;
        }
        let mut column = self.store.board().columns.get(column_id).cloned()?;
        let start = column.task_ids.len();

        let mut next = self.store.board().clone();
        let mut ops = Vec::with_capacity(drafts.len());
        for (i, draft) in drafts.into_iter().enumerate() {
            let task = draft.into_task(self.next_timestamp());
            column.task_ids.push(task.id.clone());
            next.tasks.insert(task.id.clone(), task.clone());
            ops.push(SyncOp::CreateTask {
                column_id: column_id.to_string(),
                task,
                position: start + i,
            });
        }
        let next = next.with_column(column);
        tracing::debug!(column_id, count = ops.len(), "importing tasks");
        Some(self.commit(next, ops))
    }

    /// Draft tasks from text and append them to a column. A generator
    /// failure leaves the board untouched.
    pub async fn import_text(
        &mut self,
        column_id: &str,
        text: &str,
        mode: ImportMode,
        generator: Option<&dyn TextGenerator>,
    ) -> Result<Option<Applied>> {
        if !self.store.board().columns.contains_key(column_id) {
            tracing::debug!(column_id, "import: unknown column");
            return Ok(None);
        }
        let drafts = import::draft_tasks(text, mode, generator).await?;
        Ok(self.import_tasks(column_id, drafts))
    }

    /// Ask the generator to improve a task and apply the result.
    pub async fn enhance_task(
        &mut self,
        task_id: &str,
        generator: &dyn TextGenerator,
    ) -> Result<Option<Applied>> {
        let Some(task) = self.store.board().tasks.get(task_id).cloned() else {
            tracing::debug!(task_id, "enhance_task: unknown task");
            return Ok(None);
        };
        let enhancement = generator.enhance(&task.title, &task.description).await?;

        let mut task = task;
        task.title = enhancement.improved_title;
        task.description = enhancement.improved_description;
        task.acceptance_criteria = Some(enhancement.acceptance_criteria);
        task.story_points = Some(enhancement.estimated_story_points);
        for tag in enhancement.suggested_tags {
            let tag = tag.trim();
            if !tag.is_empty() && !task.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                task.tags.push(tag.to_string());
            }
        }
        Ok(self.update_task(task))
    }

    /// Visible tasks matching `query`, grouped by column in display order.
    /// Columns without a match are left out.
    pub fn search(&self, query: &str) -> Vec<SearchHit<'_>> {
        let board = self.store.board();
        board
            .ordered_columns()
            .into_iter()
            .filter_map(|column| {
                let tasks: Vec<&Task> = board
                    .tasks_in(&column.id)
                    .into_iter()
                    .filter(|task| task.matches(query))
                    .collect();
                (!tasks.is_empty()).then_some(SearchHit { column, tasks })
            })
            .collect()
    }
}
