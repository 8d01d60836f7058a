//! Plain-text and JSON views of a board.
//!
//! Both views resolve column lists through [`Board::tasks_in`], so task ids
//! with no task behind them never reach the output.

use serde::Serialize;

use crate::model::{Board, Column, Task};

const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// One line per task; overrides the board setting when set.
    pub condensed: Option<bool>,
    pub show_ids: bool,
}

/// First characters of an id, enough to tell tasks apart on screen.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

fn task_line(task: &Task, show_ids: bool) -> String {
    let mut line = String::new();
    if task.is_completed() {
        line.push_str("[x] ");
    }
    line.push_str(&format!("[{}] {}", task.priority, task.title));
    if let Some(points) = task.story_points {
        line.push_str(&format!(" ({points} pts)"));
    }
    for tag in &task.tags {
        line.push_str(&format!(" #{tag}"));
    }
    if show_ids {
        line.push_str(&format!("  {}", short_id(&task.id)));
    }
    line
}

fn column_header(column: &Column, count: usize) -> String {
    match column.width {
        Some(width) => format!("== {} ({count}) [{width}px] ==", column.title),
        None => format!("== {} ({count}) ==", column.title),
    }
}

/// Render the board column by column.
pub fn render_board(board: &Board, options: RenderOptions) -> String {
    render_tasks(board, options, |_| true)
}

/// Render only tasks accepted by `keep`. Columns are always listed.
pub fn render_tasks<F>(board: &Board, options: RenderOptions, keep: F) -> String
where
    F: Fn(&Task) -> bool,
{
    let condensed = options.condensed.unwrap_or(board.settings.is_condensed);
    let mut lines = Vec::new();

    for column in board.ordered_columns() {
        let tasks: Vec<&Task> = board
            .tasks_in(&column.id)
            .into_iter()
            .filter(|task| keep(*task))
            .collect();
        if !lines.is_empty() {
            lines.push(String::new());
        }
        let mut header = column_header(column, tasks.len());
        if options.show_ids {
            header.push_str(&format!("  {}", short_id(&column.id)));
        }
        lines.push(header);

        if tasks.is_empty() {
            lines.push("  (empty)".to_string());
            continue;
        }
        for task in tasks {
            lines.push(format!("  {}", task_line(task, options.show_ids)));
            if condensed {
                continue;
            }
            if let Some(first) = task.description.lines().find(|l| !l.trim().is_empty()) {
                lines.push(format!("      {}", first.trim()));
            }
            if let Some(criteria) = &task.acceptance_criteria {
                for item in criteria {
                    lines.push(format!("      - {item}"));
                }
            }
        }
    }

    if lines.is_empty() {
        lines.push("(no columns)".to_string());
    }
    lines.join("\n")
}

/// Serializable board with columns in display order and tasks resolved.
#[derive(Debug, Clone, Serialize)]
pub struct BoardView<'a> {
    pub is_condensed: bool,
    pub columns: Vec<ColumnView<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnView<'a> {
    pub id: &'a str,
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    pub tasks: Vec<&'a Task>,
}

impl<'a> BoardView<'a> {
    pub fn new(board: &'a Board) -> Self {
        Self::filtered(board, |_| true)
    }

    pub fn filtered<F>(board: &'a Board, keep: F) -> Self
    where
        F: Fn(&Task) -> bool,
    {
        Self {
            is_condensed: board.settings.is_condensed,
            columns: board
                .ordered_columns()
                .into_iter()
                .map(|column| ColumnView {
                    id: &column.id,
                    title: &column.title,
                    width: column.width,
                    tasks: board
                        .tasks_in(&column.id)
                        .into_iter()
                        .filter(|task| keep(*task))
                        .collect(),
                })
                .collect(),
        }
    }
}
