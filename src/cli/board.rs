//! genboard board-level commands: show, check, import, settings.

use std::io::Read;
use std::path::PathBuf;

use serde_json::json;

use super::{Context, GlobalOptions};
use crate::error::Result;
use crate::events::EventKind;
use crate::generator::{GeminiGenerator, TextGenerator};
use crate::import::ImportMode;
use crate::model::{BoardSettings, InvariantViolation, Task};
use crate::output::{emit_success, HumanOutput};
use crate::render::{render_tasks, BoardView, RenderOptions};
use crate::sync::SyncOp;

pub struct ShowOptions {
    pub search: Option<String>,
    pub ids: bool,
    pub condensed: Option<bool>,
}

pub struct ImportOptions {
    pub column: String,
    pub text: Option<String>,
    pub file: Option<PathBuf>,
    pub mode: ImportMode,
}

#[derive(serde::Serialize)]
struct CheckOutput {
    ok: bool,
    violations: Vec<InvariantViolation>,
}

#[derive(serde::Serialize)]
struct ImportOutput {
    column_id: String,
    task_ids: Vec<String>,
}

pub async fn run_show(global: &GlobalOptions, options: ShowOptions) -> Result<()> {
    let ctx = Context::open(global).await?;
    let board = ctx.board();
    let query = options.search.unwrap_or_default();
    let keep = |task: &Task| task.matches(&query);

    if ctx.output.json {
        let view = BoardView::filtered(&board, keep);
        return emit_success(ctx.output, "show", &view, None);
    }
    if ctx.output.quiet {
        return Ok(());
    }

    if !query.trim().is_empty() {
        let hits: usize = ctx
            .controller
            .search(&query)
            .iter()
            .map(|hit| hit.tasks.len())
            .sum();
        println!("{hits} matching task(s) for '{}'\n", query.trim());
    }
    let text = render_tasks(
        &board,
        RenderOptions {
            condensed: options.condensed,
            show_ids: options.ids,
        },
        keep,
    );
    println!("{text}");
    Ok(())
}

pub async fn run_check(global: &GlobalOptions) -> Result<()> {
    let ctx = Context::open(global).await?;
    let violations = ctx.board().check_invariants();
    let mut human = HumanOutput::new(if violations.is_empty() {
        "Board is consistent"
    } else {
        "Board has invariant violations"
    });
    for violation in &violations {
        human.push_warning(describe(violation));
    }
    let output = CheckOutput {
        ok: violations.is_empty(),
        violations,
    };
    emit_success(ctx.output, "check", &output, Some(&human))
}

fn describe(violation: &InvariantViolation) -> String {
    match violation {
        InvariantViolation::DuplicateTaskReference { task_id, columns } => {
            format!("task {task_id} listed by {}", columns.join(", "))
        }
        InvariantViolation::UnknownColumnInOrder { column_id } => {
            format!("column order names unknown column {column_id}")
        }
        InvariantViolation::ColumnNotOrdered { column_id } => {
            format!("column {column_id} missing from column order")
        }
        InvariantViolation::DuplicateColumnInOrder { column_id } => {
            format!("column {column_id} listed twice in column order")
        }
    }
}

fn read_import_text(options: &ImportOptions) -> Result<String> {
    if let Some(text) = &options.text {
        return Ok(text.clone());
    }
    if let Some(path) = &options.file {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    Ok(text)
}

pub async fn run_import(global: &GlobalOptions, options: ImportOptions) -> Result<()> {
    let mut ctx = Context::open(global).await?;
    let column_id = ctx.resolve_column(&options.column)?;
    let text = read_import_text(&options)?;

    let generator = match options.mode {
        ImportMode::Naive => None,
        ImportMode::Delegated if text.trim().is_empty() => None,
        ImportMode::Delegated => Some(GeminiGenerator::from_config(&ctx.config.generator)?),
    };
    let applied = ctx
        .controller
        .import_text(
            &column_id,
            &text,
            options.mode,
            generator.as_ref().map(|g| g as &dyn TextGenerator),
        )
        .await?;

    let task_ids: Vec<String> = applied
        .as_ref()
        .map(|a| {
            a.ops
                .iter()
                .filter_map(|op| match op {
                    SyncOp::CreateTask { task, .. } => Some(task.id.clone()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let board = ctx.board();
    let mut human = HumanOutput::new(if task_ids.is_empty() {
        "Nothing to import".to_string()
    } else {
        format!("Imported {} tasks", task_ids.len())
    });
    human.push_summary("Column", board.columns[&column_id].title.clone());
    for id in &task_ids {
        if let Some(task) = board.tasks.get(id) {
            human.push_detail(task.title.clone());
        }
    }
    ctx.finish(
        applied.as_ref(),
        EventKind::TasksImported,
        json!({ "column_id": column_id, "task_ids": task_ids }),
        &mut human,
    )
    .await?;
    emit_success(
        ctx.output,
        "import",
        &ImportOutput {
            column_id,
            task_ids,
        },
        Some(&human),
    )
}

pub async fn run_settings(global: &GlobalOptions, condensed: Option<bool>) -> Result<()> {
    let mut ctx = Context::open(global).await?;
    let current = ctx.board().settings.clone();
    let next = BoardSettings {
        is_condensed: condensed.unwrap_or(current.is_condensed),
    };
    let applied = ctx.controller.update_settings(next);
    let settings = ctx.board().settings.clone();

    let mut human = HumanOutput::new(if applied.is_some() {
        "Settings updated"
    } else {
        "Settings"
    });
    human.push_summary("Condensed", settings.is_condensed.to_string());
    ctx.finish(
        applied.as_ref(),
        EventKind::SettingsUpdated,
        json!({ "settings": settings }),
        &mut human,
    )
    .await?;
    emit_success(ctx.output, "settings", &settings, Some(&human))
}
