//! Error types for genboard
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task or column, bad config)
//! - 4: Operation failed (backend, I/O, lock)
//! - 5: Generative text failure (request error, malformed response)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the genboard CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
    pub const GENERATION_FAILED: i32 = 5;
}

/// Main error type for genboard operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Backend rejected {op}: {message}")]
    Backend { op: String, message: String },

    // Generative text failures (exit code 5)
    #[error("Text generation failed: {0}")]
    Generation(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TaskNotFound(_)
            | Error::ColumnNotFound(_) => exit_codes::USER_ERROR,

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::Backend { .. } => exit_codes::OPERATION_FAILED,

            Error::Generation(_) => exit_codes::GENERATION_FAILED,
        }
    }

    /// Structured details for JSON output, when the variant carries any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::TaskNotFound(id) => Some(serde_json::json!({ "task_id": id })),
            Error::ColumnNotFound(id) => Some(serde_json::json!({ "column_id": id })),
            Error::Backend { op, .. } => Some(serde_json::json!({ "op": op })),
            _ => None,
        }
    }
}

/// Result type alias for genboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
