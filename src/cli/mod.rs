//! Command-line interface for genboard
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{Event, EventDestination, EventKind, EventSink};
use crate::gateway::{BoardDefaults, FileBackend};
use crate::import::ImportMode;
use crate::lifecycle::{Applied, BoardController};
use crate::model::{Board, Priority};
use crate::output::{HumanOutput, OutputOptions};
use crate::session::resolve_user;
use crate::sync::SyncReport;

mod board;
mod column;
mod task;

/// genboard - Kanban board with optimistic sync
///
/// Organize tasks into ordered columns, move them around, and draft or
/// enhance them with a generative text service.
#[derive(Parser, Debug)]
#[command(name = "genboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Working directory holding `.genboard.toml` (defaults to current directory)
    #[arg(long, global = true, env = "GENBOARD_DIR")]
    pub dir: Option<PathBuf>,

    /// User whose board is opened
    #[arg(long, global = true, env = "GENBOARD_USER")]
    pub user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit board events as JSON lines to a file, or `-` for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the board
    Show {
        /// Only list tasks whose title, description or tags contain this text
        #[arg(short, long)]
        search: Option<String>,

        /// Print task and column ids
        #[arg(long)]
        ids: bool,

        /// One line per task regardless of the board setting
        #[arg(long, conflicts_with = "expanded")]
        condensed: bool,

        /// Show descriptions regardless of the board setting
        #[arg(long)]
        expanded: bool,
    },

    /// Check board invariants
    Check,

    /// Task commands
    #[command(subcommand)]
    Task(TaskCommands),

    /// Column commands
    #[command(subcommand)]
    Column(ColumnCommands),

    /// Create tasks from free text
    Import {
        /// Target column (id, id prefix or title)
        column: String,

        /// Text to import; read from --file or stdin when omitted
        text: Option<String>,

        /// Read text from a file
        #[arg(short = 'F', long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// How the text is split into tasks
        #[arg(long, value_enum, default_value_t = ModeArg::Naive)]
        mode: ModeArg,
    },

    /// Change board settings
    Settings {
        /// Show one line per task
        #[arg(long)]
        condensed: Option<bool>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task at the front of a column
    New {
        /// Column (id, id prefix or title); defaults to the first column
        #[arg(short, long)]
        column: Option<String>,

        /// Title (defaults to the configured new task title)
        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Low, Medium, High or Critical
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Edit task fields
    Edit {
        /// Task id or unique id prefix
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        priority: Option<Priority>,

        /// Replace tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Remove all tags
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,

        /// Story points
        #[arg(long)]
        points: Option<u32>,

        /// Mark completed
        #[arg(long, conflicts_with = "undone")]
        done: bool,

        /// Mark not completed
        #[arg(long)]
        undone: bool,
    },

    /// Delete one or more tasks
    Rm {
        /// Task ids or unique id prefixes
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Move a task to a column position
    Mv {
        /// Task id or unique id prefix
        id: String,

        /// Destination column (defaults to the task's own column)
        #[arg(long)]
        to: Option<String>,

        /// Destination index (defaults to the end of the column)
        #[arg(long)]
        index: Option<usize>,
    },

    /// Improve a task with the generative text service
    Enhance {
        /// Task id or unique id prefix
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ColumnCommands {
    /// Append a column
    New {
        title: String,
    },

    /// Rename a column
    Rename {
        column: String,
        title: String,
    },

    /// Set a column's width in pixels
    Resize {
        column: String,
        width: u32,
    },

    /// Delete a column and its tasks
    Rm {
        column: String,
    },

    /// Move a column to a display index
    Mv {
        column: String,
        index: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// One task per line
    Naive,
    /// Let the generative text service split the text
    Delegated,
}

impl From<ModeArg> for ImportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Naive => ImportMode::Naive,
            ModeArg::Delegated => ImportMode::Delegated,
        }
    }
}

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub(crate) struct GlobalOptions {
    pub dir: Option<PathBuf>,
    pub user: Option<String>,
    pub json: bool,
    pub quiet: bool,
    pub events: Option<String>,
}

/// An opened board plus everything a command needs to report on it.
pub(crate) struct Context {
    pub controller: BoardController,
    pub config: Config,
    pub output: OutputOptions,
    reports: mpsc::UnboundedReceiver<SyncReport>,
    events: Option<EventSink>,
}

impl Context {
    pub async fn open(global: &GlobalOptions) -> Result<Self> {
        let dir = match &global.dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let config = Config::load_from_dir(&dir);
        let path = config.storage.board_path(&dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let backend = FileBackend::new(path, BoardDefaults::from_config(&config.board));
        let user = resolve_user(global.user.as_deref());
        let (controller, reports) =
            BoardController::open(std::sync::Arc::new(backend), &user, config.board.clone())
                .await?;

        let events = match EventDestination::parse(global.events.as_deref()) {
            Some(destination) => Some(destination.open()?),
            None => None,
        };
        let events_to_stdout = matches!(
            EventDestination::parse(global.events.as_deref()),
            Some(EventDestination::Stdout)
        );

        Ok(Self {
            controller,
            config,
            output: OutputOptions {
                json: global.json && !events_to_stdout,
                quiet: global.quiet || events_to_stdout,
            },
            reports,
            events,
        })
    }

    pub fn board(&self) -> std::sync::Arc<Board> {
        self.controller.board()
    }

    pub fn resolve_task(&self, query: &str) -> Result<String> {
        let board = self.board();
        resolve_id(board.tasks.keys(), query)?
            .ok_or_else(|| Error::TaskNotFound(query.to_string()))
    }

    /// Resolve a column by id, unique id prefix or case-insensitive title.
    pub fn resolve_column(&self, query: &str) -> Result<String> {
        let board = self.board();
        if let Some(id) = resolve_id(board.columns.keys(), query)? {
            return Ok(id);
        }
        let by_title: Vec<&String> = board
            .column_order
            .iter()
            .filter(|id| {
                board
                    .columns
                    .get(*id)
                    .map(|c| c.title.eq_ignore_ascii_case(query.trim()))
                    .unwrap_or(false)
            })
            .collect();
        match by_title.as_slice() {
            [id] => Ok((*id).clone()),
            [] => Err(Error::ColumnNotFound(query.to_string())),
            _ => Err(Error::InvalidArgument(format!(
                "column title '{query}' is ambiguous; use an id"
            ))),
        }
    }

    /// Resolve an optional column, defaulting to the first one.
    pub fn resolve_column_or_first(&self, query: Option<&str>) -> Result<String> {
        match query {
            Some(query) => self.resolve_column(query),
            None => self
                .board()
                .column_order
                .first()
                .cloned()
                .ok_or_else(|| Error::ColumnNotFound("(board has no columns)".to_string())),
        }
    }

    /// Wait for sync, emit events and fold failures into `human` warnings.
    pub async fn finish(
        &mut self,
        applied: Option<&Applied>,
        kind: EventKind,
        data: serde_json::Value,
        human: &mut HumanOutput,
    ) -> Result<Vec<SyncReport>> {
        self.controller.drain().await;
        let mut reports = Vec::new();
        while let Ok(report) = self.reports.try_recv() {
            reports.push(report);
        }
        reports.sort_by_key(|report| report.seq);
        let failed: Vec<SyncReport> = reports.into_iter().filter(|r| !r.is_ok()).collect();

        let user = Some(self.controller.session().user_id.clone());
        if let Some(sink) = self.events.as_mut() {
            if applied.is_some() {
                sink.emit(&Event::new(kind, user.clone()).with_data(&data)?)?;
            }
            for report in &failed {
                sink.emit(&Event::new(EventKind::SyncFailed, user.clone()).with_data(report)?)?;
            }
        }

        for report in &failed {
            human.push_warning(format!(
                "sync {} failed: {}",
                report.op,
                report.error.as_deref().unwrap_or("unknown error")
            ));
        }
        Ok(failed)
    }
}

/// Exact id match, else a unique prefix match.
fn resolve_id<'a, I>(ids: I, query: &str) -> Result<Option<String>>
where
    I: Iterator<Item = &'a String>,
{
    let query = query.trim();
    if query.is_empty() {
        return Ok(None);
    }
    let mut matches = Vec::new();
    for id in ids {
        if id == query {
            return Ok(Some(id.clone()));
        }
        if id.starts_with(query) {
            matches.push(id.clone());
        }
    }
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        n => Err(Error::InvalidArgument(format!(
            "id prefix '{query}' matches {n} entries"
        ))),
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run_async())
    }

    async fn run_async(self) -> Result<()> {
        let global = GlobalOptions {
            dir: self.dir,
            user: self.user,
            json: self.json,
            quiet: self.quiet,
            events: self.events,
        };

        match self.command {
            Commands::Show {
                search,
                ids,
                condensed,
                expanded,
            } => {
                let condensed = match (condensed, expanded) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                };
                board::run_show(
                    &global,
                    board::ShowOptions {
                        search,
                        ids,
                        condensed,
                    },
                )
                .await
            }
            Commands::Check => board::run_check(&global).await,
            Commands::Import {
                column,
                text,
                file,
                mode,
            } => {
                board::run_import(
                    &global,
                    board::ImportOptions {
                        column,
                        text,
                        file,
                        mode: mode.into(),
                    },
                )
                .await
            }
            Commands::Settings { condensed } => board::run_settings(&global, condensed).await,
            Commands::Task(cmd) => match cmd {
                TaskCommands::New {
                    column,
                    title,
                    description,
                    priority,
                    tags,
                } => {
                    task::run_new(
                        &global,
                        task::NewOptions {
                            column,
                            title,
                            description,
                            priority,
                            tags,
                        },
                    )
                    .await
                }
                TaskCommands::Edit {
                    id,
                    title,
                    description,
                    priority,
                    tags,
                    clear_tags,
                    points,
                    done,
                    undone,
                } => {
                    let tags = if clear_tags {
                        Some(Vec::new())
                    } else if tags.is_empty() {
                        None
                    } else {
                        Some(tags)
                    };
                    let completed = match (done, undone) {
                        (true, _) => Some(true),
                        (_, true) => Some(false),
                        _ => None,
                    };
                    task::run_edit(
                        &global,
                        task::EditOptions {
                            id,
                            title,
                            description,
                            priority,
                            tags,
                            points,
                            completed,
                        },
                    )
                    .await
                }
                TaskCommands::Rm { ids } => task::run_rm(&global, ids).await,
                TaskCommands::Mv { id, to, index } => {
                    task::run_mv(&global, task::MoveOptions { id, to, index }).await
                }
                TaskCommands::Enhance { id } => task::run_enhance(&global, id).await,
            },
            Commands::Column(cmd) => match cmd {
                ColumnCommands::New { title } => column::run_new(&global, title).await,
                ColumnCommands::Rename { column, title } => {
                    column::run_rename(&global, column, title).await
                }
                ColumnCommands::Resize { column, width } => {
                    column::run_resize(&global, column, width).await
                }
                ColumnCommands::Rm { column } => column::run_rm(&global, column).await,
                ColumnCommands::Mv { column, index } => {
                    column::run_mv(&global, column, index).await
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn resolve_id_prefers_exact_then_unique_prefix() {
        let all = ids(&["abc123", "abd456", "abc"]);
        assert_eq!(resolve_id(all.iter(), "abc").unwrap(), Some("abc".to_string()));
        assert_eq!(resolve_id(all.iter(), "abd").unwrap(), Some("abd456".to_string()));
        assert_eq!(resolve_id(all.iter(), "zzz").unwrap(), None);
        assert!(resolve_id(all.iter(), "ab").is_err());
        assert_eq!(resolve_id(all.iter(), " ").unwrap(), None);
    }

    #[test]
    fn cli_parses_task_edit() {
        let cli = Cli::try_parse_from([
            "genboard", "--json", "task", "edit", "abc", "--priority", "high", "--tag", "ui",
            "--tag", "bug", "--done",
        ])
        .expect("parse");
        assert!(cli.json);
        match cli.command {
            Commands::Task(TaskCommands::Edit {
                priority,
                tags,
                done,
                ..
            }) => {
                assert_eq!(priority, Some(Priority::High));
                assert_eq!(tags, vec!["ui".to_string(), "bug".to_string()]);
                assert!(done);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_priority_and_conflicts() {
        assert!(Cli::try_parse_from(["genboard", "task", "edit", "a", "--priority", "asap"]).is_err());
        assert!(Cli::try_parse_from(["genboard", "task", "edit", "a", "--done", "--undone"]).is_err());
        assert!(Cli::try_parse_from(["genboard", "show", "--condensed", "--expanded"]).is_err());
    }
}
