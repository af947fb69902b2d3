//! Error types for the multi-task environment core

use thiserror::Error;

/// Core error type for multi-task environment operations
#[derive(Error, Debug)]
pub enum EnvError {
    /// Environment stream used before `seed` was called
    #[error("environment seed is not set, call `seed` first")]
    EnvSeedNotSet,

    /// Task stream used before `seed_task` was called
    #[error("task seed is not set, call `seed_task` first")]
    TaskSeedNotSet,

    /// Task accessor used before any task was made active
    #[error("no task is active, call `set_task_state` or `reset_task_state` first")]
    TaskNotSet,

    /// `step` called on an episode that was never started
    #[error("`step` called before `reset`")]
    StepBeforeReset,

    /// Invalid action
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Invalid constructor or operation argument
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation the environment does not provide
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for environment operations
pub type Result<T> = std::result::Result<T, EnvError>;
