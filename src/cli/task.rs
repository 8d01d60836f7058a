//! genboard task command implementations.

use serde_json::json;

use super::{Context, GlobalOptions};
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::generator::GeminiGenerator;
use crate::model::{Priority, Task};
use crate::output::{emit_success, HumanOutput};
use crate::reorder::{DropLocation, DropResult};
use crate::render::short_id;

pub struct NewOptions {
    pub column: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub points: Option<u32>,
    pub completed: Option<bool>,
}

pub struct MoveOptions {
    pub id: String,
    pub to: Option<String>,
    pub index: Option<usize>,
}

#[derive(serde::Serialize)]
struct TaskOutput<'a> {
    column_id: Option<&'a str>,
    task: &'a Task,
    ops: Vec<&'static str>,
}

#[derive(serde::Serialize)]
struct MoveOutput {
    task_id: String,
    column_id: String,
    index: usize,
    moved: bool,
}

#[derive(serde::Serialize)]
struct RemoveOutput {
    removed: Vec<String>,
}

/// Apply the optional field edits to `task`. Returns whether anything changed.
fn apply_edits(
    task: &mut Task,
    title: Option<String>,
    description: Option<String>,
    priority: Option<Priority>,
    tags: Option<Vec<String>>,
) -> Result<bool> {
    let before = task.clone();
    if let Some(title) = title {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidArgument("task title cannot be empty".to_string()));
        }
        task.title = title.to_string();
    }
    if let Some(description) = description {
        task.description = description;
    }
    if let Some(priority) = priority {
        task.priority = priority;
    }
    if let Some(tags) = tags {
        let mut cleaned: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.trim();
            if !tag.is_empty() && !cleaned.iter().any(|t| t == tag) {
                cleaned.push(tag.to_string());
            }
        }
        task.tags = cleaned;
    }
    Ok(*task != before)
}

fn task_human(header: &str, task: &Task, column_title: Option<&str>) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    if let Some(column) = column_title {
        human.push_summary("Column", column.to_string());
    }
    human.push_summary("Priority", task.priority.to_string());
    if !task.tags.is_empty() {
        human.push_summary("Tags", task.tags.join(", "));
    }
    if let Some(points) = task.story_points {
        human.push_summary("Story points", points.to_string());
    }
    human
}

pub async fn run_new(global: &GlobalOptions, options: NewOptions) -> Result<()> {
    let mut ctx = Context::open(global).await?;
    let column_id = ctx.resolve_column_or_first(options.column.as_deref())?;

    let applied = ctx
        .controller
        .create_task(&column_id)
        .ok_or_else(|| Error::ColumnNotFound(column_id.clone()))?;
    let mut ops: Vec<&'static str> = applied.ops.iter().map(|op| op.name()).collect();
    let task_id = applied.board.columns[&column_id].task_ids[0].clone();

    // The row has to exist before the field update lands.
    ctx.controller.drain().await;
    let mut task = applied.board.tasks[&task_id].clone();
    let tags = (!options.tags.is_empty()).then_some(options.tags);
    if apply_edits(&mut task, options.title, options.description, options.priority, tags)? {
        if let Some(updated) = ctx.controller.update_task(task) {
            ops.extend(updated.ops.iter().map(|op| op.name()));
        }
    }

    let board = ctx.board();
    let task = &board.tasks[&task_id];
    let mut human = task_human("Task created", task, Some(board.columns[&column_id].title.as_str()));
    let output = TaskOutput {
        column_id: Some(column_id.as_str()),
        task,
        ops,
    };
    let data = json!({ "task_id": task_id, "column_id": column_id });
    ctx.finish(Some(&applied), EventKind::TaskCreated, data, &mut human)
        .await?;
    emit_success(ctx.output, "task new", &output, Some(&human))
}

pub async fn run_edit(global: &GlobalOptions, options: EditOptions) -> Result<()> {
    let mut ctx = Context::open(global).await?;
    let task_id = ctx.resolve_task(&options.id)?;
    let mut task = ctx.board().tasks[&task_id].clone();

    let mut changed = apply_edits(
        &mut task,
        options.title,
        options.description,
        options.priority,
        options.tags,
    )?;
    if let Some(points) = options.points {
        if points == 0 {
            return Err(Error::InvalidArgument(
                "story points must be a positive integer".to_string(),
            ));
        }
        changed |= task.story_points != Some(points);
        task.story_points = Some(points);
    }
    if let Some(completed) = options.completed {
        changed |= task.is_completed() != completed;
        task.is_completed = Some(completed);
    }

    let applied = if changed {
        ctx.controller.update_task(task)
    } else {
        None
    };
    let board = ctx.board();
    let task = &board.tasks[&task_id];
    let header = if applied.is_some() {
        "Task updated"
    } else {
        "No task changes"
    };
    let column = board.column_of(&task_id);
    let mut human = task_human(header, task, column.map(|c| c.title.as_str()));
    let output = TaskOutput {
        column_id: column.map(|c| c.id.as_str()),
        task,
        ops: applied
            .as_ref()
            .map(|a| a.ops.iter().map(|op| op.name()).collect())
            .unwrap_or_default(),
    };
    ctx.finish(
        applied.as_ref(),
        EventKind::TaskUpdated,
        json!({ "task_id": task_id }),
        &mut human,
    )
    .await?;
    emit_success(ctx.output, "task edit", &output, Some(&human))
}

pub async fn run_rm(global: &GlobalOptions, ids: Vec<String>) -> Result<()> {
    let mut ctx = Context::open(global).await?;
    let mut resolved = Vec::with_capacity(ids.len());
    for id in &ids {
        let task_id = ctx.resolve_task(id)?;
        if !resolved.contains(&task_id) {
            resolved.push(task_id);
        }
    }

    let (applied, kind) = if let [single] = resolved.as_slice() {
        (ctx.controller.delete_task(single), EventKind::TaskDeleted)
    } else {
        (ctx.controller.delete_tasks(&resolved), EventKind::TasksDeleted)
    };

    let mut human = HumanOutput::new(if resolved.len() == 1 {
        "Task deleted".to_string()
    } else {
        format!("{} tasks deleted", resolved.len())
    });
    for id in &resolved {
        human.push_detail(short_id(id).to_string());
    }
    ctx.finish(
        applied.as_ref(),
        kind,
        json!({ "task_ids": resolved }),
        &mut human,
    )
    .await?;
    emit_success(
        ctx.output,
        "task rm",
        &RemoveOutput { removed: resolved },
        Some(&human),
    )
}

pub async fn run_mv(global: &GlobalOptions, options: MoveOptions) -> Result<()> {
    let mut ctx = Context::open(global).await?;
    let task_id = ctx.resolve_task(&options.id)?;
    let board = ctx.board();
    let source = board
        .column_of(&task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.clone()))?;
    let from = source.position_of(&task_id).unwrap_or_default();

    let destination_id = match options.to.as_deref() {
        Some(to) => ctx.resolve_column(to)?,
        None => source.id.clone(),
    };
    let destination_len = board.columns[&destination_id].task_ids.len();
    let index = options.index.unwrap_or(if destination_id == source.id {
        destination_len.saturating_sub(1)
    } else {
        destination_len
    });

    let drop = DropResult::new(
        task_id.clone(),
        DropLocation::new(source.id.clone(), from),
        DropLocation::new(destination_id.clone(), index),
    );
    let applied = ctx.controller.move_task(&drop);
    let board = ctx.board();
    let final_index = board.columns[&destination_id]
        .position_of(&task_id)
        .unwrap_or(index);

    let mut human = HumanOutput::new(if applied.is_some() {
        "Task moved"
    } else {
        "Task already in place"
    });
    human.push_summary("ID", task_id.clone());
    human.push_summary("Column", board.columns[&destination_id].title.clone());
    human.push_summary("Index", final_index.to_string());

    let output = MoveOutput {
        task_id: task_id.clone(),
        column_id: destination_id.clone(),
        index: final_index,
        moved: applied.is_some(),
    };
    ctx.finish(
        applied.as_ref(),
        EventKind::TaskMoved,
        json!({ "task_id": task_id, "column_id": destination_id, "index": final_index }),
        &mut human,
    )
    .await?;
    emit_success(ctx.output, "task mv", &output, Some(&human))
}

pub async fn run_enhance(global: &GlobalOptions, id: String) -> Result<()> {
    let mut ctx = Context::open(global).await?;
    let task_id = ctx.resolve_task(&id)?;
    let generator = GeminiGenerator::from_config(&ctx.config.generator)?;

    let applied = ctx.controller.enhance_task(&task_id, &generator).await?;
    let board = ctx.board();
    let task = &board.tasks[&task_id];
    let column = board.column_of(&task_id);
    let mut human = task_human("Task enhanced", task, column.map(|c| c.title.as_str()));
    if let Some(criteria) = &task.acceptance_criteria {
        for item in criteria {
            human.push_detail(item.clone());
        }
    }
    let output = TaskOutput {
        column_id: column.map(|c| c.id.as_str()),
        task,
        ops: applied
            .as_ref()
            .map(|a| a.ops.iter().map(|op| op.name()).collect())
            .unwrap_or_default(),
    };
    ctx.finish(
        applied.as_ref(),
        EventKind::TaskEnhanced,
        json!({ "task_id": task_id }),
        &mut human,
    )
    .await?;
    emit_success(ctx.output, "task enhance", &output, Some(&human))
}
