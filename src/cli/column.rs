//! genboard column command implementations.

use serde_json::json;

use super::{Context, GlobalOptions};
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::lifecycle::Applied;
use crate::output::{emit_success, HumanOutput};

#[derive(serde::Serialize)]
struct ColumnOutput {
    column_id: String,
    title: Option<String>,
    width: Option<u32>,
    changed: bool,
}

#[derive(serde::Serialize)]
struct ColumnOrderOutput {
    column_ids: Vec<String>,
    changed: bool,
}

async fn report(
    mut ctx: Context,
    command: &str,
    column_id: String,
    applied: Option<Applied>,
    kind: EventKind,
    mut human: HumanOutput,
) -> Result<()> {
    let board = ctx.board();
    let column = board.columns.get(&column_id);
    let output = ColumnOutput {
        column_id: column_id.clone(),
        title: column.map(|c| c.title.clone()),
        width: column.and_then(|c| c.width),
        changed: applied.is_some(),
    };
    if let Some(column) = column {
        human.push_summary("Title", column.title.clone());
        if let Some(width) = column.width {
            human.push_summary("Width", width.to_string());
        }
    }
    human.push_summary("ID", column_id.clone());
    ctx.finish(
        applied.as_ref(),
        kind,
        json!({ "column_id": column_id }),
        &mut human,
    )
    .await?;
    emit_success(ctx.output, command, &output, Some(&human))
}

pub async fn run_new(global: &GlobalOptions, title: String) -> Result<()> {
    let mut ctx = Context::open(global).await?;
    if title.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "column title cannot be empty".to_string(),
        ));
    }
    let applied = ctx.controller.create_column(&title);
    let column_id = ctx
        .board()
        .column_order
        .last()
        .cloned()
        .unwrap_or_default();
    let human = HumanOutput::new("Column created");
    report(ctx, "column new", column_id, applied, EventKind::ColumnCreated, human).await
}

pub async fn run_rename(global: &GlobalOptions, column: String, title: String) -> Result<()> {
    let mut ctx = Context::open(global).await?;
    let column_id = ctx.resolve_column(&column)?;
    let applied = ctx.controller.rename_column(&column_id, &title);
    let human = HumanOutput::new(if applied.is_some() {
        "Column renamed"
    } else {
        "Column unchanged (empty title)"
    });
    report(ctx, "column rename", column_id, applied, EventKind::ColumnRenamed, human).await
}

pub async fn run_resize(global: &GlobalOptions, column: String, width: u32) -> Result<()> {
    let mut ctx = Context::open(global).await?;
    let column_id = ctx.resolve_column(&column)?;
    let applied = ctx.controller.resize_column(&column_id, width);
    let mut human = HumanOutput::new("Column resized");
    let clamped = ctx.controller.config().clamp_width(width);
    if clamped != width {
        human.push_warning(format!(
            "width {width} clamped to {clamped} (allowed {}-{})",
            ctx.controller.config().min_width,
            ctx.controller.config().max_width
        ));
    }
    report(ctx, "column resize", column_id, applied, EventKind::ColumnResized, human).await
}

pub async fn run_rm(global: &GlobalOptions, column: String) -> Result<()> {
    let mut ctx = Context::open(global).await?;
    let column_id = ctx.resolve_column(&column)?;
    let removed_tasks = ctx.board().columns[&column_id].task_ids.len();
    let applied = ctx.controller.delete_column(&column_id);
    let mut human = HumanOutput::new("Column deleted");
    if removed_tasks > 0 {
        human.push_summary("Tasks removed", removed_tasks.to_string());
    }
    report(ctx, "column rm", column_id, applied, EventKind::ColumnDeleted, human).await
}

pub async fn run_mv(global: &GlobalOptions, column: String, index: usize) -> Result<()> {
    let mut ctx = Context::open(global).await?;
    let column_id = ctx.resolve_column(&column)?;
    let board = ctx.board();
    let from = board
        .column_order
        .iter()
        .position(|id| *id == column_id)
        .ok_or_else(|| Error::ColumnNotFound(column_id.clone()))?;

    let applied = ctx.controller.reorder_columns(from, index);
    let board = ctx.board();
    let mut human = HumanOutput::new(if applied.is_some() {
        "Columns reordered"
    } else {
        "Column already in place"
    });
    for column in board.ordered_columns() {
        human.push_detail(column.title.clone());
    }
    let output = ColumnOrderOutput {
        column_ids: board.column_order.clone(),
        changed: applied.is_some(),
    };
    ctx.finish(
        applied.as_ref(),
        EventKind::ColumnsReordered,
        json!({ "column_ids": board.column_order }),
        &mut human,
    )
    .await?;
    emit_success(ctx.output, "column mv", &output, Some(&human))
}
