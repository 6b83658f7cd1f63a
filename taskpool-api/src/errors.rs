//! # Tagged Task Errors
//!
//! The error type carried inside failed task results. It deliberately stays a
//! plain tagged record rather than an enum: callers on the other side of the
//! pool boundary only ever inspect the message, the numeric status and the
//! name, and the orchestrator's richer internal error enums convert into it
//! at the boundary.

use thiserror::Error;

/// Status attached to task-level errors when no other status applies.
pub const DEFAULT_ERROR_STATUS: u16 = 500;

/// Status attached to errors originating inside the pool itself
/// (lease exhaustion, growth failure, dispatch failure).
pub const POOL_ERROR_STATUS: u16 = 300;

/// Tagged error carried in failed task results.
///
/// Shape: a human-readable message, a numeric status (500 unless the pool
/// produced it, then 300) and a stable name identifying the error family.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TaskError {
    /// Human-readable description of the failure.
    pub message: String,

    /// Numeric status, [`DEFAULT_ERROR_STATUS`] unless overridden.
    pub status: u16,

    /// Stable name of the error family.
    pub name: &'static str,
}

impl TaskError {
    /// Creates a task-level error with the default status.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: DEFAULT_ERROR_STATUS,
            name: "TaskError",
        }
    }

    /// Creates a task-level error with an explicit status.
    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status,
            name: "TaskError",
        }
    }

    /// Creates a pool-originated error (status 300).
    pub fn pool(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: POOL_ERROR_STATUS,
            name: "PoolError",
        }
    }
}
