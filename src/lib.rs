//! genboard - Kanban board library
//!
//! This library provides the core of the genboard CLI: a board of ordered
//! columns holding tasks, edited optimistically and synced to a backend in
//! the background.
//!
//! # Core Concepts
//!
//! - **Board store**: copy-on-write `Arc<Board>`; every edit publishes a new value
//! - **Sync ops**: one backend call per change, fired without waiting
//! - **Reorder engine**: drag-and-drop resolved into list edits and sync ops
//! - **Import**: free text split into task drafts, optionally by a generator
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.genboard.toml`
//! - `error`: Error types and result aliases
//! - `model`: Tasks, columns, board and invariant checks
//! - `board`: Board state store
//! - `reorder`: Drag-and-drop reorder engine
//! - `lifecycle`: `BoardController`, the entry point for board edits
//! - `sync`: Sync ops and their dispatcher
//! - `gateway`: Backend trait with file and in-memory implementations
//! - `generator`: Generative text client and response validation
//! - `import`: Text-to-task drafting
//! - `render`: Plain-text and JSON board views
//! - `session`: User and board identity
//! - `lock`: File locking and atomic writes for the file backend
//! - `events`, `output`: JSONL events and CLI output envelopes

pub mod board;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod generator;
pub mod import;
pub mod lifecycle;
pub mod lock;
pub mod model;
pub mod output;
pub mod render;
pub mod reorder;
pub mod session;
pub mod sync;

pub use error::{Error, Result};
