//! Board data model: tasks, columns, and the board that orders them.
//!
//! Tasks are owned by exactly one column at a time and referenced by id
//! only. A column's `task_ids` is the authoritative order of its tasks.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Title given to tasks created without one.
pub const UNTITLED_TASK: &str = "Untitled Task";

/// Task priority, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Priority::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown priority '{trimmed}' (expected Low|Medium|High|Critical)"
                ))
            })
    }
}

/// Generate a fresh opaque identifier for a task or column.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A unit of work on the board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl Task {
    /// A task with default fields: Medium priority, no tags, no description.
    pub fn new(title: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            tags: Vec::new(),
            story_points: None,
            acceptance_criteria: None,
            is_completed: None,
            created_at,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed.unwrap_or(false)
    }

    /// Case-insensitive match against title, description and tags.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&query))
    }
}

/// A named, ordered bucket of task references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub task_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

impl Column {
    pub fn new(title: impl Into<String>, width: u32) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            task_ids: Vec::new(),
            width: Some(width),
        }
    }

    pub fn position_of(&self, task_id: &str) -> Option<usize> {
        self.task_ids.iter().position(|id| id == task_id)
    }
}

/// Board-level display settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardSettings {
    #[serde(default)]
    pub is_condensed: bool,
}

/// Columns, their display order, and the tasks they reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Board {
    #[serde(default)]
    pub tasks: HashMap<String, Task>,
    #[serde(default)]
    pub columns: HashMap<String, Column>,
    #[serde(default)]
    pub column_order: Vec<String>,
    #[serde(default)]
    pub settings: BoardSettings,
}

/// A broken board invariant, reported by [`Board::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvariantViolation {
    /// A task id is listed by more than one column, or twice in one column.
    DuplicateTaskReference { task_id: String, columns: Vec<String> },
    /// The column order names a column that does not exist.
    UnknownColumnInOrder { column_id: String },
    /// A column is missing from the column order.
    ColumnNotOrdered { column_id: String },
    /// The column order lists the same column twice.
    DuplicateColumnInOrder { column_id: String },
}

impl Board {
    /// Columns in display order, skipping ids with no column behind them.
    pub fn ordered_columns(&self) -> Vec<&Column> {
        self.column_order
            .iter()
            .filter_map(|id| self.columns.get(id))
            .collect()
    }

    /// Tasks of a column in order. Dangling ids are skipped.
    pub fn tasks_in(&self, column_id: &str) -> Vec<&Task> {
        self.columns
            .get(column_id)
            .map(|column| {
                column
                    .task_ids
                    .iter()
                    .filter_map(|id| self.tasks.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The column currently listing `task_id`.
    pub fn column_of(&self, task_id: &str) -> Option<&Column> {
        self.column_order
            .iter()
            .filter_map(|id| self.columns.get(id))
            .chain(
                self.columns
                    .values()
                    .filter(|c| !self.column_order.contains(&c.id)),
            )
            .find(|column| column.task_ids.iter().any(|id| id == task_id))
    }

    /// Number of task references across all columns.
    pub fn placed_task_count(&self) -> usize {
        self.columns.values().map(|c| c.task_ids.len()).sum()
    }

    pub fn with_task(&self, task: Task) -> Board {
        let mut next = self.clone();
        next.tasks.insert(task.id.clone(), task);
        next
    }

    /// Insert or replace a column. New columns are appended to the order.
    pub fn with_column(&self, column: Column) -> Board {
        let mut next = self.clone();
        if !next.column_order.contains(&column.id) {
            next.column_order.push(column.id.clone());
        }
        next.columns.insert(column.id.clone(), column);
        next
    }

    /// Remove tasks from the collection and from every column list.
    pub fn without_tasks(&self, task_ids: &[String]) -> Board {
        let doomed: HashSet<&str> = task_ids.iter().map(String::as_str).collect();
        let mut next = self.clone();
        next.tasks.retain(|id, _| !doomed.contains(id.as_str()));
        for column in next.columns.values_mut() {
            column.task_ids.retain(|id| !doomed.contains(id.as_str()));
        }
        next
    }

    /// Remove a column and every task it lists.
    pub fn without_column(&self, column_id: &str) -> Board {
        let mut next = self.clone();
        if let Some(column) = next.columns.remove(column_id) {
            for task_id in &column.task_ids {
                next.tasks.remove(task_id);
            }
        }
        next.column_order.retain(|id| id != column_id);
        next
    }

    pub fn with_column_order(&self, order: Vec<String>) -> Board {
        let mut next = self.clone();
        next.column_order = order;
        next
    }

    pub fn with_settings(&self, settings: BoardSettings) -> Board {
        let mut next = self.clone();
        next.settings = settings;
        next
    }

    /// Check that every task id sits in at most one column list and that the
    /// column order is a permutation of the column keys.
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        let mut owners: HashMap<&str, Vec<String>> = HashMap::new();
        let mut column_ids: Vec<&String> = self.columns.keys().collect();
        column_ids.sort();
        for column_id in column_ids {
            let column = &self.columns[column_id];
            for task_id in &column.task_ids {
                owners
                    .entry(task_id.as_str())
                    .or_default()
                    .push(column.id.clone());
            }
        }
        let mut duplicated: Vec<(&str, Vec<String>)> = owners
            .into_iter()
            .filter(|(_, columns)| columns.len() > 1)
            .collect();
        duplicated.sort_by(|a, b| a.0.cmp(b.0));
        for (task_id, columns) in duplicated {
            violations.push(InvariantViolation::DuplicateTaskReference {
                task_id: task_id.to_string(),
                columns,
            });
        }

        let mut seen = HashSet::new();
        for column_id in &self.column_order {
            if !seen.insert(column_id.as_str()) {
                violations.push(InvariantViolation::DuplicateColumnInOrder {
                    column_id: column_id.clone(),
                });
            } else if !self.columns.contains_key(column_id) {
                violations.push(InvariantViolation::UnknownColumnInOrder {
                    column_id: column_id.clone(),
                });
            }
        }
        let mut unordered: Vec<&String> = self
            .columns
            .keys()
            .filter(|id| !seen.contains(id.as_str()))
            .collect();
        unordered.sort();
        for column_id in unordered {
            violations.push(InvariantViolation::ColumnNotOrdered {
                column_id: column_id.clone(),
            });
        }

        violations
    }
}
