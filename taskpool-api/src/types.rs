//! Task, payload, result and completion types shared between callers and the
//! orchestrator.

use std::any::Any;
use std::fmt;

use tokio::sync::oneshot;

use crate::errors::TaskError;

// Type aliases for common types
pub type TaskPayload = Box<dyn Any + Send>;
pub type TaskFn = Box<dyn FnOnce() -> Result<TaskPayload, TaskError> + Send>;

/// Status of a task that completed with a value.
pub const STATUS_COMPLETED: u16 = 200;

/// Status of a task that was accepted and queued for a free unit.
pub const STATUS_QUEUED: u16 = 202;

/// Status of a task that failed (lease exhaustion, dispatch failure, or a
/// unit-level error).
pub const STATUS_FAILED: u16 = 300;

/// A unit of work submitted to the pool.
///
/// The pool treats the callable as fully opaque: it is moved to an execution
/// unit, invoked exactly once, and its outcome travels back as the single
/// response of that round trip.
pub struct Task {
    /// The callable an execution unit runs.
    pub job: TaskFn,
}

impl Task {
    /// Wraps an already type-erased callable.
    pub fn new(job: TaskFn) -> Self {
        Self { job }
    }

    /// Wraps a typed closure, boxing its output into a [`TaskPayload`].
    pub fn from_fn<F, T>(f: F) -> Self
    where
        F: FnOnce() -> Result<T, TaskError> + Send + 'static,
        T: Send + 'static,
    {
        Self {
            job: Box::new(move || f().map(|value| Box::new(value) as TaskPayload)),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

/// Sending half used by the orchestrator to resolve a queued task.
pub type CompletionSender = oneshot::Sender<TaskResult>;

/// Awaitable handle for a queued (202) task.
///
/// The 202 acknowledgment is not the final answer: once the queued task is
/// serviced against a freed unit, its terminal result (200 or 300) is
/// delivered through this handle.
pub struct CompletionHandle {
    receiver: oneshot::Receiver<TaskResult>,
}

impl CompletionHandle {
    /// Creates a connected sender/handle pair.
    pub fn channel() -> (CompletionSender, CompletionHandle) {
        let (sender, receiver) = oneshot::channel();
        (sender, CompletionHandle { receiver })
    }

    /// Waits for the terminal result of the queued task.
    ///
    /// If the pool drops the pending task without servicing it, a failed
    /// (300) result is returned instead of hanging forever.
    pub async fn wait(self) -> TaskResult {
        self.receiver.await.unwrap_or_else(|_| {
            TaskResult::failed(
                TaskError::pool("queued task was dropped before completion"),
                None,
            )
        })
    }
}

impl fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle").finish_non_exhaustive()
    }
}

/// Outcome of a task submission.
///
/// The three status values are part of the public contract:
/// [`STATUS_COMPLETED`] carries `result`, [`STATUS_QUEUED`] carries
/// `completion`, [`STATUS_FAILED`] carries `err`. `unit` is populated only
/// when the pool is configured to report unit ids.
pub struct TaskResult {
    /// One of [`STATUS_COMPLETED`], [`STATUS_QUEUED`], [`STATUS_FAILED`].
    pub status: u16,

    /// Value produced by a completed task.
    pub result: Option<TaskPayload>,

    /// Error describing a failed task.
    pub err: Option<TaskError>,

    /// Id of the unit that served the task, when reporting is enabled.
    pub unit: Option<String>,

    /// Handle resolving to the terminal result of a queued task.
    pub completion: Option<CompletionHandle>,
}

impl TaskResult {
    /// A task that completed with a value.
    pub fn completed(result: TaskPayload, unit: Option<String>) -> Self {
        Self {
            status: STATUS_COMPLETED,
            result: Some(result),
            err: None,
            unit,
            completion: None,
        }
    }

    /// A task that was accepted and queued.
    pub fn queued(completion: CompletionHandle) -> Self {
        Self {
            status: STATUS_QUEUED,
            result: None,
            err: None,
            unit: None,
            completion: Some(completion),
        }
    }

    /// A task that failed.
    pub fn failed(err: TaskError, unit: Option<String>) -> Self {
        Self {
            status: STATUS_FAILED,
            result: None,
            err: Some(err),
            unit,
            completion: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }

    pub fn is_queued(&self) -> bool {
        self.status == STATUS_QUEUED
    }

    pub fn is_failed(&self) -> bool {
        self.status == STATUS_FAILED
    }

    /// Downcasts the payload of a completed result.
    pub fn value<T: 'static>(&self) -> Option<&T> {
        self.result
            .as_ref()
            .and_then(|payload| payload.downcast_ref::<T>())
    }
}

impl fmt::Debug for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskResult")
            .field("status", &self.status)
            .field("has_result", &self.result.is_some())
            .field("err", &self.err)
            .field("unit", &self.unit)
            .field("queued", &self.completion.is_some())
            .finish()
    }
}
