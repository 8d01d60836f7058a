//! Row tables shared by the file and memory backends.
//!
//! Rows mirror the hosted schema: a board per user, columns with a
//! `position`, tasks with a `column_id` and a `position`. On load the column
//! lists are rebuilt from task positions.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{BoardDefaults, BoardSnapshot, ColumnPatch};
use crate::error::{Error, Result};
use crate::model::{new_id, Board, BoardSettings, Column, Priority, Task};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub settings: BoardSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRow {
    pub id: String,
    pub board_id: String,
    pub title: String,
    pub width: u32,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub column_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<Vec<String>>,
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl TaskRow {
    fn from_task(column_id: &str, task: &Task, position: usize) -> Self {
        Self {
            id: task.id.clone(),
            column_id: column_id.to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            tags: task.tags.clone(),
            story_points: task.story_points,
            acceptance_criteria: task.acceptance_criteria.clone(),
            position,
            is_completed: task.is_completed,
            created_at: millis_to_datetime(task.created_at),
        }
    }

    fn to_task(&self) -> Task {
        Task {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            tags: self.tags.clone(),
            story_points: self.story_points,
            acceptance_criteria: self.acceptance_criteria.clone(),
            is_completed: self.is_completed,
            created_at: self.created_at.timestamp_millis(),
        }
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
}

fn rejected(op: &str, message: impl Into<String>) -> Error {
    Error::Backend {
        op: op.to_string(),
        message: message.into(),
    }
}

/// All rows of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub boards: Vec<BoardRow>,
    #[serde(default)]
    pub columns: Vec<ColumnRow>,
    #[serde(default)]
    pub tasks: Vec<TaskRow>,
}

impl Tables {
    /// Find or create the user's board, then assemble it.
    ///
    /// Returns whether rows were created so callers know to persist.
    pub fn load_board(
        &mut self,
        user_id: &str,
        defaults: &BoardDefaults,
    ) -> (BoardSnapshot, bool) {
        let mut created = false;
        let board_id = match self.boards.iter().find(|b| b.user_id == user_id) {
            Some(row) => row.id.clone(),
            None => {
                let board_id = new_id();
                self.boards.push(BoardRow {
                    id: board_id.clone(),
                    user_id: user_id.to_string(),
                    title: defaults.title.clone(),
                    settings: BoardSettings::default(),
                });
                for (position, title) in defaults.columns.iter().enumerate() {
                    self.columns.push(ColumnRow {
                        id: new_id(),
                        board_id: board_id.clone(),
                        title: title.clone(),
                        width: defaults.width,
                        position,
                    });
                }
                created = true;
                board_id
            }
        };

        (self.assemble(&board_id), created)
    }

    fn assemble(&self, board_id: &str) -> BoardSnapshot {
        let mut board = Board::default();
        if let Some(row) = self.boards.iter().find(|b| b.id == board_id) {
            board.settings = row.settings.clone();
        }

        let mut columns: Vec<&ColumnRow> = self
            .columns
            .iter()
            .filter(|c| c.board_id == board_id)
            .collect();
        columns.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        for row in columns {
            board.column_order.push(row.id.clone());
            board.columns.insert(
                row.id.clone(),
                Column {
                    id: row.id.clone(),
                    title: row.title.clone(),
                    task_ids: Vec::new(),
                    width: Some(row.width),
                },
            );
        }

        let mut tasks: Vec<&TaskRow> = self
            .tasks
            .iter()
            .filter(|t| board.columns.contains_key(&t.column_id))
            .collect();
        tasks.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        for row in tasks {
            if let Some(column) = board.columns.get_mut(&row.column_id) {
                column.task_ids.push(row.id.clone());
            }
            board.tasks.insert(row.id.clone(), row.to_task());
        }

        BoardSnapshot {
            board_id: board_id.to_string(),
            board,
        }
    }

    pub fn create_task(&mut self, column_id: &str, task: &Task, position: usize) -> Result<()> {
        if !self.columns.iter().any(|c| c.id == column_id) {
            return Err(rejected(
                "create_task",
                format!("column {column_id} does not exist"),
            ));
        }
        if self.tasks.iter().any(|t| t.id == task.id) {
            return Err(rejected(
                "create_task",
                format!("duplicate task id {}", task.id),
            ));
        }
        self.tasks.push(TaskRow::from_task(column_id, task, position));
        Ok(())
    }

    /// Update editable fields; position and column are untouched.
    pub fn update_task(&mut self, task: &Task) -> Result<()> {
        if let Some(row) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            row.title = task.title.clone();
            row.description = task.description.clone();
            row.priority = task.priority;
            row.tags = task.tags.clone();
            row.story_points = task.story_points;
            row.acceptance_criteria = task.acceptance_criteria.clone();
            row.is_completed = task.is_completed;
        }
        Ok(())
    }

    pub fn delete_tasks(&mut self, task_ids: &[String]) -> Result<()> {
        let affected: HashSet<String> = self
            .tasks
            .iter()
            .filter(|t| task_ids.contains(&t.id))
            .map(|t| t.column_id.clone())
            .collect();
        self.tasks.retain(|t| !task_ids.contains(&t.id));
        for column_id in &affected {
            self.compact_tasks(column_id);
        }
        Ok(())
    }

    /// Renumber a column's task positions to `0..n`, keeping their order.
    fn compact_tasks(&mut self, column_id: &str) {
        let mut rows: Vec<&mut TaskRow> = self
            .tasks
            .iter_mut()
            .filter(|t| t.column_id == column_id)
            .collect();
        rows.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        for (position, row) in rows.into_iter().enumerate() {
            row.position = position;
        }
    }

    fn compact_columns(&mut self, board_id: &str) {
        let mut rows: Vec<&mut ColumnRow> = self
            .columns
            .iter_mut()
            .filter(|c| c.board_id == board_id)
            .collect();
        rows.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        for (position, row) in rows.into_iter().enumerate() {
            row.position = position;
        }
    }

    pub fn create_column(&mut self, board_id: &str, column: &Column, position: usize) -> Result<()> {
        if !self.boards.iter().any(|b| b.id == board_id) {
            return Err(rejected(
                "create_column",
                format!("board {board_id} does not exist"),
            ));
        }
        if self.columns.iter().any(|c| c.id == column.id) {
            return Err(rejected(
                "create_column",
                format!("duplicate column id {}", column.id),
            ));
        }
        let width = column.width.unwrap_or_else(|| BoardDefaults::default().width);
        self.columns.push(ColumnRow {
            id: column.id.clone(),
            board_id: board_id.to_string(),
            title: column.title.clone(),
            width,
            position,
        });
        Ok(())
    }

    pub fn update_column(&mut self, column_id: &str, patch: &ColumnPatch) -> Result<()> {
        if let Some(row) = self.columns.iter_mut().find(|c| c.id == column_id) {
            if let Some(title) = &patch.title {
                row.title = title.clone();
            }
            if let Some(width) = patch.width {
                row.width = width;
            }
        }
        Ok(())
    }

    /// Delete a column and, by cascade, its tasks.
    pub fn delete_column(&mut self, column_id: &str) -> Result<()> {
        let board_id = self
            .columns
            .iter()
            .find(|c| c.id == column_id)
            .map(|c| c.board_id.clone());
        self.columns.retain(|c| c.id != column_id);
        self.tasks.retain(|t| t.column_id != column_id);
        if let Some(board_id) = board_id {
            self.compact_columns(&board_id);
        }
        Ok(())
    }

    pub fn reorder_tasks(&mut self, column_id: &str, task_ids: &[String]) -> Result<()> {
        for (position, task_id) in task_ids.iter().enumerate() {
            self.move_task(task_id, column_id, position)?;
        }
        Ok(())
    }

    pub fn move_task(&mut self, task_id: &str, column_id: &str, position: usize) -> Result<()> {
        if let Some(row) = self.tasks.iter_mut().find(|t| t.id == task_id) {
            row.column_id = column_id.to_string();
            row.position = position;
        }
        Ok(())
    }

    pub fn reorder_columns(&mut self, column_ids: &[String]) -> Result<()> {
        for (position, column_id) in column_ids.iter().enumerate() {
            if let Some(row) = self.columns.iter_mut().find(|c| &c.id == column_id) {
                row.position = position;
            }
        }
        Ok(())
    }

    pub fn update_board_settings(&mut self, board_id: &str, settings: &BoardSettings) -> Result<()> {
        match self.boards.iter_mut().find(|b| b.id == board_id) {
            Some(row) => {
                row.settings = settings.clone();
                Ok(())
            }
            None => Err(rejected(
                "update_board_settings",
                format!("board {board_id} does not exist"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> (Tables, BoardSnapshot) {
        let mut tables = Tables::default();
        let (snapshot, created) = tables.load_board("alice", &BoardDefaults::default());
        assert!(created);
        (tables, snapshot)
    }

    #[test]
    fn first_load_creates_default_board() {
        let (mut tables, snapshot) = loaded();
        let titles: Vec<&str> = snapshot
            .board
            .ordered_columns()
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(titles, vec!["To Do", "In Progress", "Done"]);
        assert!(snapshot
            .board
            .ordered_columns()
            .iter()
            .all(|c| c.width == Some(320)));

        let (again, created) = tables.load_board("alice", &BoardDefaults::default());
        assert!(!created);
        assert_eq!(again.board_id, snapshot.board_id);
        assert_eq!(tables.boards.len(), 1);
    }

    #[test]
    fn column_lists_are_rebuilt_from_positions() {
        let (mut tables, snapshot) = loaded();
        let todo = snapshot.board.column_order[0].clone();
        let doing = snapshot.board.column_order[1].clone();

        let a = Task::new("A", 1);
        let b = Task::new("B", 2);
        let c = Task::new("C", 3);
        tables.create_task(&todo, &a, 0).unwrap();
        tables.create_task(&todo, &b, 1).unwrap();
        tables.create_task(&todo, &c, 2).unwrap();

        tables
            .reorder_tasks(&todo, &[c.id.clone(), a.id.clone()])
            .unwrap();
        tables.move_task(&b.id, &doing, 0).unwrap();

        let (reloaded, _) = tables.load_board("alice", &BoardDefaults::default());
        assert_eq!(reloaded.board.columns[&todo].task_ids, vec![c.id.clone(), a.id.clone()]);
        assert_eq!(reloaded.board.columns[&doing].task_ids, vec![b.id.clone()]);
        assert!(reloaded.board.check_invariants().is_empty());
    }

    #[test]
    fn create_task_in_missing_column_is_rejected() {
        let (mut tables, _) = loaded();
        let err = tables
            .create_task("nope", &Task::new("A", 1), 0)
            .expect_err("missing column");
        assert!(matches!(err, Error::Backend { .. }));
    }

    #[test]
    fn delete_column_cascades_rows() {
        let (mut tables, snapshot) = loaded();
        let todo = snapshot.board.column_order[0].clone();
        tables.create_task(&todo, &Task::new("A", 1), 0).unwrap();
        tables.delete_column(&todo).unwrap();
        assert!(tables.tasks.is_empty());
        assert_eq!(tables.columns.len(), 2);
    }

    #[test]
    fn task_fields_survive_a_round_trip() {
        let (mut tables, snapshot) = loaded();
        let todo = snapshot.board.column_order[0].clone();
        let mut task = Task::new("Ship", 1_700_000_000_000);
        task.priority = Priority::High;
        task.tags = vec!["release".to_string()];
        task.story_points = Some(5);
        tables.create_task(&todo, &task, 0).unwrap();

        task.is_completed = Some(true);
        task.acceptance_criteria = Some(vec!["Tagged".to_string()]);
        tables.update_task(&task).unwrap();

        let (reloaded, _) = tables.load_board("alice", &BoardDefaults::default());
        let stored = &reloaded.board.tasks[&task.id];
        assert_eq!(stored.priority, Priority::High);
        assert_eq!(stored.story_points, Some(5));
        assert_eq!(stored.created_at, 1_700_000_000_000);
        assert!(stored.is_completed());
        assert_eq!(stored.acceptance_criteria, Some(vec!["Tagged".to_string()]));
    }

    #[test]
    fn deletes_close_position_gaps() {
        let (mut tables, snapshot) = loaded();
        let board_id = snapshot.board_id.clone();
        let todo = snapshot.board.column_order[0].clone();
        let a = Task::new("A", 1);
        let b = Task::new("B", 2);
        let c = Task::new("C", 3);
        tables.create_task(&todo, &a, 0).unwrap();
        tables.create_task(&todo, &b, 1).unwrap();
        tables.create_task(&todo, &c, 2).unwrap();

        tables.delete_column(&todo).unwrap();
        let review = Column::new("Review", 320);
        tables.create_column(&board_id, &review, 2).unwrap();
        let mut kept = snapshot.board.column_order[1..].to_vec();
        kept.push(review.id.clone());

        let (reloaded, _) = tables.load_board("alice", &BoardDefaults::default());
        assert_eq!(reloaded.board.column_order, kept);

        let (mut tables, snapshot) = loaded();
        let todo = snapshot.board.column_order[0].clone();
        for (i, task) in [&a, &b, &c].into_iter().enumerate() {
            tables.create_task(&todo, task, i).unwrap();
        }
        tables.delete_tasks(&[a.id.clone()]).unwrap();
        let d = Task::new("D", 0);
        tables.create_task(&todo, &d, 2).unwrap();
        let (reloaded, _) = tables.load_board("alice", &BoardDefaults::default());
        assert_eq!(
            reloaded.board.columns[&todo].task_ids,
            vec![b.id.clone(), c.id.clone(), d.id.clone()]
        );
    }

    #[test]
    fn untouched_task_reloads_unchanged() {
        let (mut tables, snapshot) = loaded();
        let todo = snapshot.board.column_order[0].clone();
        let task = Task::new("Plain", 1_700_000_000_000);
        tables.create_task(&todo, &task, 0).unwrap();

        let (reloaded, _) = tables.load_board("alice", &BoardDefaults::default());
        let stored = &reloaded.board.tasks[&task.id];
        assert_eq!(stored, &task);
        assert_eq!(
            serde_json::to_value(stored).unwrap(),
            serde_json::to_value(&task).unwrap()
        );

        let json = serde_json::to_value(&tables.tasks[0]).unwrap();
        assert!(json.get("acceptance_criteria").is_none());
        assert!(json.get("is_completed").is_none());
    }
}
