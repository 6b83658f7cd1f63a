// Integration tests for the result and completion contract types.

use taskpool_api::errors::TaskError;
use taskpool_api::types::{
    CompletionHandle, Task, TaskPayload, TaskResult, STATUS_COMPLETED, STATUS_FAILED,
    STATUS_QUEUED,
};

#[test]
fn test_status_contract_values() {
    assert_eq!(STATUS_COMPLETED, 200);
    assert_eq!(STATUS_QUEUED, 202);
    assert_eq!(STATUS_FAILED, 300);
}

#[test]
fn test_completed_result_shape() {
    let result = TaskResult::completed(Box::new("value") as TaskPayload, Some("unit-1".into()));

    assert!(result.is_completed());
    assert!(!result.is_queued());
    assert!(!result.is_failed());
    assert_eq!(result.status, 200);
    assert_eq!(result.value::<&str>(), Some(&"value"));
    assert_eq!(result.unit.as_deref(), Some("unit-1"));
    assert!(result.err.is_none());
    assert!(result.completion.is_none());
}

#[test]
fn test_failed_result_shape() {
    let result = TaskResult::failed(TaskError::new("boom"), None);

    assert!(result.is_failed());
    assert_eq!(result.status, 300);
    assert!(result.result.is_none());
    assert_eq!(result.err.as_ref().map(|e| e.message.as_str()), Some("boom"));
}

#[test]
fn test_queued_result_carries_completion() {
    let (_sender, handle) = CompletionHandle::channel();
    let result = TaskResult::queued(handle);

    assert!(result.is_queued());
    assert_eq!(result.status, 202);
    assert!(result.completion.is_some());
}

#[test]
fn test_value_downcast_mismatch_is_none() {
    let result = TaskResult::completed(Box::new(42u32) as TaskPayload, None);
    assert_eq!(result.value::<u32>(), Some(&42));
    assert!(result.value::<String>().is_none());
}

#[tokio::test]
async fn test_completion_resolves_with_terminal_result() {
    let (sender, handle) = CompletionHandle::channel();
    sender
        .send(TaskResult::completed(Box::new(5i32) as TaskPayload, None))
        .ok();

    let result = handle.wait().await;
    assert_eq!(result.status, STATUS_COMPLETED);
    assert_eq!(result.value::<i32>(), Some(&5));
}

#[tokio::test]
async fn test_dropped_sender_resolves_to_failure() {
    let (sender, handle) = CompletionHandle::channel();
    drop(sender);

    let result = handle.wait().await;
    assert_eq!(result.status, STATUS_FAILED);
    let err = result.err.unwrap();
    assert_eq!(err.status, 300);
    assert!(err.message.contains("dropped before completion"));
}

#[test]
fn test_from_fn_boxes_the_payload() {
    let task = Task::from_fn(|| Ok::<_, TaskError>(vec![1u8, 2, 3]));
    let payload = (task.job)().unwrap();
    assert_eq!(payload.downcast_ref::<Vec<u8>>(), Some(&vec![1u8, 2, 3]));
}

#[test]
fn test_from_fn_propagates_task_errors() {
    let task = Task::from_fn(|| -> Result<(), TaskError> { Err(TaskError::new("nope")) });
    let err = (task.job)().unwrap_err();
    assert_eq!(err.message, "nope");
    assert_eq!(err.status, 500);
}
