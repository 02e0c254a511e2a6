// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    /// The module has no readable / parseable `package.json`.
    #[error("module contains no package.json at {path:?}: {reason}")]
    NoManifest { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// An external tool exited unsuccessfully.
    #[error("{tool} failed (exit code {code:?}): {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The script compiler service reported an error.
    #[error("compile error: {0}")]
    Compile(String),

    /// A member of a task batch failed; `source` carries the underlying detail.
    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<BuildError>,
    },

    #[error("task '{task}' panicked: {message}")]
    TaskPanicked { task: String, message: String },

    /// A builder operation broke the task contract. This is a bug in the
    /// builder, never a runtime condition.
    #[error("task contract violation: {0}")]
    ContractViolation(String),

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuildError {
    /// Name of the batch member that failed, if this error came out of a batch.
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            BuildError::TaskFailed { task, .. } | BuildError::TaskPanicked { task, .. } => {
                Some(task)
            }
            _ => None,
        }
    }

    /// Innermost error, unwrapping any `TaskFailed` layers.
    pub fn root_cause(&self) -> &BuildError {
        match self {
            BuildError::TaskFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildError>;
