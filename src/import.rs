//! Free text to task drafts.
//!
//! Naive mode splits on lines and strips list markers. Delegated mode hands
//! the text to a [`TextGenerator`] and accepts only well-formed replies.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::generator::{DraftSpec, TextGenerator};
use crate::model::{Priority, Task, UNTITLED_TASK};

/// A task about to be created by an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_points: Option<u32>,
}

impl TaskDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Materialize the draft as a task with a fresh id.
    pub fn into_task(self, created_at: i64) -> Task {
        let mut task = Task::new(self.title, created_at);
        task.description = self.description;
        task.priority = self.priority;
        task.tags = self.tags;
        task.story_points = self.story_points;
        task
    }
}

impl From<DraftSpec> for TaskDraft {
    fn from(spec: DraftSpec) -> Self {
        let title = if spec.title.trim().is_empty() {
            UNTITLED_TASK.to_string()
        } else {
            spec.title
        };
        Self {
            title,
            description: spec.description.unwrap_or_default(),
            priority: spec.priority.unwrap_or_default(),
            tags: spec.tags.unwrap_or_default(),
            story_points: spec.story_points,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    #[default]
    Naive,
    Delegated,
}

fn is_list_marker(ch: char) -> bool {
    matches!(ch, '-' | '*' | '•' | '.') || ch.is_ascii_digit()
}

/// Strip a leading run of list markers when whitespace follows it.
fn strip_marker(line: &str) -> &str {
    let rest = line.trim_start_matches(is_list_marker);
    if rest.len() == line.len() {
        return line;
    }
    match rest.chars().next() {
        Some(ch) if ch.is_whitespace() => rest.trim_start(),
        _ => line,
    }
}

/// One draft per non-empty line, list markers removed.
pub fn parse_lines(text: &str) -> Vec<TaskDraft> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(strip_marker)
        .filter(|title| !title.is_empty())
        .map(TaskDraft::titled)
        .collect()
}

/// Draft tasks from `text`. Empty input yields no drafts without consulting
/// the generator.
pub async fn draft_tasks(
    text: &str,
    mode: ImportMode,
    generator: Option<&dyn TextGenerator>,
) -> Result<Vec<TaskDraft>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    match mode {
        ImportMode::Naive => Ok(parse_lines(text)),
        ImportMode::Delegated => {
            let generator = generator.ok_or_else(|| {
                Error::Generation("delegated import needs a text generator".to_string())
            })?;
            let specs = generator.draft_tasks(text).await?;
            tracing::debug!(drafts = specs.len(), "generator drafted tasks");
            Ok(specs.into_iter().map(TaskDraft::from).collect())
        }
    }
}
