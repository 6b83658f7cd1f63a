// Integration tests for error types and their conversion into the tagged
// caller-facing shape.

use anyhow::anyhow;

use taskpool::error::{DispatchError, PoolError};
use taskpool_api::errors::TaskError;

#[test]
fn test_pool_error_display() {
    assert_eq!(
        PoolError::Exhausted { capacity: 8 }.to_string(),
        "Maximum unit limit reached (capacity: 8)"
    );
    assert_eq!(
        PoolError::SpawnFailed("no threads left".to_string()).to_string(),
        "Failed to spawn execution unit: no threads left"
    );
    assert_eq!(
        PoolError::InvalidConfig("max_units must be at least 1".to_string()).to_string(),
        "Invalid configuration: max_units must be at least 1"
    );
    assert_eq!(PoolError::ShuttingDown.to_string(), "Pool is shutting down");
    let other = PoolError::Other(anyhow!("some internal issue"));
    assert!(other.to_string().contains("some internal issue"));
}

#[test]
fn test_dispatch_error_display() {
    assert_eq!(
        DispatchError::SendFailed {
            unit_id: "unit-3".to_string()
        }
        .to_string(),
        "Failed to deliver request to unit unit-3: channel closed"
    );
    assert_eq!(
        DispatchError::ReplyDropped {
            unit_id: "unit-3".to_string()
        }
        .to_string(),
        "Unit unit-3 dropped the reply channel before responding"
    );
}

#[test]
fn test_pool_error_converts_at_status_300() {
    let tagged = TaskError::from(PoolError::Exhausted { capacity: 2 });
    assert_eq!(tagged.status, 300);
    assert_eq!(tagged.name, "PoolError");
    assert_eq!(tagged.message, "Maximum unit limit reached (capacity: 2)");
}

#[test]
fn test_dispatch_error_converts_at_status_300() {
    let tagged = TaskError::from(DispatchError::ReplyDropped {
        unit_id: "unit-1".to_string(),
    });
    assert_eq!(tagged.status, 300);
    assert_eq!(tagged.name, "DispatchError");
}
