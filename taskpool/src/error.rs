use taskpool_api::errors::{TaskError, POOL_ERROR_STATUS};
use thiserror::Error;

/// Errors related to pool lifecycle and growth.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Maximum unit limit reached (capacity: {capacity})")]
    Exhausted { capacity: usize },
    #[error("Failed to spawn execution unit: {0}")]
    SpawnFailed(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Pool is shutting down")]
    ShuttingDown,
    #[error("Internal pool error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Errors related to a single dispatch round trip.
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    #[error("Failed to deliver request to unit {unit_id}: channel closed")]
    SendFailed { unit_id: String },
    #[error("Unit {unit_id} dropped the reply channel before responding")]
    ReplyDropped { unit_id: String },
}

// Conversions at the caller boundary: internal enums flatten into the tagged
// error shape, pool-originated failures always at status 300.

impl From<PoolError> for TaskError {
    fn from(err: PoolError) -> Self {
        TaskError::pool(err.to_string())
    }
}

impl From<DispatchError> for TaskError {
    fn from(err: DispatchError) -> Self {
        TaskError {
            message: err.to_string(),
            status: POOL_ERROR_STATUS,
            name: "DispatchError",
        }
    }
}
