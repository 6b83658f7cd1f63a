//! # Backlog Queue
//!
//! Unbounded FIFO of tasks awaiting a free execution unit.
//!
//! # Thread Safety
//! Backed by a lock-free queue, safe for concurrent producers and consumers;
//! every entry is popped exactly once, so two concurrent drains can never
//! service the same task.
//!
//! The queue is unbounded by design: the pool applies no backpressure beyond
//! its unit cap, so sustained overload grows this queue without limit.

use std::fmt;

use crossbeam_queue::SegQueue;

use taskpool_api::types::{CompletionSender, TaskFn};

/// A task waiting for a free execution unit.
///
/// Exists either in the submitting caller's stack or in the backlog, never
/// both. Consumed when a released unit services it.
pub struct PendingTask {
    /// The callable to execute once a unit frees up.
    pub job: TaskFn,

    /// Continuation resolved with the terminal result when serviced.
    pub reply: CompletionSender,
}

impl fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTask").finish_non_exhaustive()
    }
}

/// Unbounded FIFO of pending tasks.
pub struct Backlog {
    queue: SegQueue<PendingTask>,
}

impl Backlog {
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }

    /// Appends a task at the tail.
    pub fn push(&self, task: PendingTask) {
        self.queue.push(task);
    }

    /// Removes and returns the oldest task, if any.
    pub fn pop(&self) -> Option<PendingTask> {
        self.queue.pop()
    }

    /// Snapshot of the current queue length.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Snapshot emptiness check.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for Backlog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Backlog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backlog").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpool_api::types::{CompletionHandle, TaskPayload};

    fn pending(value: i32) -> PendingTask {
        let (reply, _completion) = CompletionHandle::channel();
        PendingTask {
            job: Box::new(move || Ok(Box::new(value) as TaskPayload)),
            reply,
        }
    }

    #[test]
    fn pops_in_fifo_order() {
        let backlog = Backlog::new();
        backlog.push(pending(1));
        backlog.push(pending(2));
        backlog.push(pending(3));
        assert_eq!(backlog.len(), 3);

        for expected in 1..=3 {
            let task = backlog.pop().unwrap();
            let payload = (task.job)().unwrap();
            assert_eq!(payload.downcast_ref::<i32>(), Some(&expected));
        }
        assert!(backlog.is_empty());
    }

    #[test]
    fn pop_on_empty_returns_none() {
        let backlog = Backlog::new();
        assert!(backlog.pop().is_none());
        assert_eq!(backlog.len(), 0);
    }
}
