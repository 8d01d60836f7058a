//! Reorder engine.
//!
//! Turns a drop (task dragged from one list position to another) into the
//! next board and the sync ops that bring the backend in line with it.
//! Indices from the gesture source are clamped, never trusted.

use serde::{Deserialize, Serialize};

use crate::model::Board;
use crate::sync::SyncOp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropLocation {
    pub column_id: String,
    pub index: usize,
}

impl DropLocation {
    pub fn new(column_id: impl Into<String>, index: usize) -> Self {
        Self {
            column_id: column_id.into(),
            index,
        }
    }
}

/// A completed drag: which task moved, from where, to where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropResult {
    pub task_id: String,
    pub source: DropLocation,
    pub destination: DropLocation,
}

impl DropResult {
    pub fn new(task_id: impl Into<String>, source: DropLocation, destination: DropLocation) -> Self {
        Self {
            task_id: task_id.into(),
            source,
            destination,
        }
    }

    fn is_noop(&self) -> bool {
        self.source == self.destination
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Nothing to do; the board stays as it is and nothing is synced.
    Unchanged,
    Moved { board: Board, ops: Vec<SyncOp> },
}

/// Compute the board after `drop` and the ops to persist it.
///
/// Same column: one `ReorderTasks`. Across columns: `ReorderTasks` for the
/// source, `ReorderTasks` for the destination, then `MoveTask` for the task.
pub fn apply_drop(board: &Board, drop: &DropResult) -> ReorderOutcome {
    if drop.is_noop() {
        return ReorderOutcome::Unchanged;
    }

    let (Some(source), Some(destination)) = (
        board.columns.get(&drop.source.column_id),
        board.columns.get(&drop.destination.column_id),
    ) else {
        tracing::debug!(?drop, "drop references an unknown column");
        return ReorderOutcome::Unchanged;
    };

    let Some(from) = locate(&source.task_ids, &drop.task_id, drop.source.index) else {
        tracing::debug!(?drop, "dragged task is not in the source column");
        return ReorderOutcome::Unchanged;
    };

    if source.id == destination.id {
        let mut task_ids = source.task_ids.clone();
        let moved = task_ids.remove(from);
        let to = drop.destination.index.min(task_ids.len());
        if to == from {
            return ReorderOutcome::Unchanged;
        }
        task_ids.insert(to, moved);

        let mut column = source.clone();
        column.task_ids = task_ids.clone();
        let ops = vec![SyncOp::ReorderTasks {
            column_id: column.id.clone(),
            task_ids,
        }];
        return ReorderOutcome::Moved {
            board: board.with_column(column),
            ops,
        };
    }

    let mut source_ids = source.task_ids.clone();
    let moved = source_ids.remove(from);

    let mut destination_ids = destination.task_ids.clone();
    destination_ids.retain(|id| id != &moved);
    let to = drop.destination.index.min(destination_ids.len());
    destination_ids.insert(to, moved.clone());

    let mut new_source = source.clone();
    new_source.task_ids = source_ids.clone();
    let mut new_destination = destination.clone();
    new_destination.task_ids = destination_ids.clone();

    let ops = vec![
        SyncOp::ReorderTasks {
            column_id: new_source.id.clone(),
            task_ids: source_ids,
        },
        SyncOp::ReorderTasks {
            column_id: new_destination.id.clone(),
            task_ids: destination_ids,
        },
        SyncOp::MoveTask {
            task_id: moved,
            column_id: new_destination.id.clone(),
            position: to,
        },
    ];

    ReorderOutcome::Moved {
        board: board.with_column(new_source).with_column(new_destination),
        ops,
    }
}

/// Index of `task_id` in `ids`, preferring the (clamped) hint.
fn locate(ids: &[String], task_id: &str, hint: usize) -> Option<usize> {
    if ids.is_empty() {
        return None;
    }
    let hint = hint.min(ids.len() - 1);
    if ids[hint] == task_id {
        return Some(hint);
    }
    ids.iter().position(|id| id == task_id)
}

/// Move the column at `from` to `to` in the display order.
///
/// Returns the new order and its `ReorderColumns` op, or `None` when the
/// order would not change.
pub fn move_column(board: &Board, from: usize, to: usize) -> Option<(Vec<String>, SyncOp)> {
    let mut order = board.column_order.clone();
    if order.is_empty() {
        return None;
    }
    let from = from.min(order.len() - 1);
    let to = to.min(order.len() - 1);
    if from == to {
        return None;
    }
    let column_id = order.remove(from);
    order.insert(to, column_id);
    let op = SyncOp::ReorderColumns {
        column_ids: order.clone(),
    };
    Some((order, op))
}
