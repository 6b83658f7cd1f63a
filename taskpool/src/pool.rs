//! # Task Scheduler
//!
//! The orchestrator composing the lease registry and the backlog queue.
//!
//! ## Control Flow
//! A submission first tries to lease a unit. With a unit in hand the task is
//! dispatched right away; with none, the task lands in the backlog. After
//! every dispatch the unit is released and the backlog is drained against
//! whatever units are free.
//!
//! # Concurrency
//! Scheduling decisions run on the submitting task; actual computation runs
//! on the execution units. Pool and backlog mutations are synchronous and
//! non-interleavable, so concurrent submissions can never lease the same
//! unit or lose a queued task. Suspension points are unit creation during
//! growth and the single response of a dispatched request.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info};

use taskpool_api::errors::TaskError;
use taskpool_api::types::{CompletionHandle, Task, TaskFn, TaskPayload, TaskResult};

use crate::backlog::{Backlog, PendingTask};
use crate::config::PoolConfig;
use crate::error::{DispatchError, PoolError};
use crate::registry::{Lease, LeasedUnit, UnitRegistry};
use crate::unit::{logging_fault_hook, FaultHook, TokioUnitFactory, UnitFactory, UnitRequest};

/// Snapshot of pool state for monitoring.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Units currently idle and leasable.
    pub idle_units: usize,

    /// Units currently alive, idle plus leased.
    pub total_units: usize,

    /// Hard cap on live units.
    pub max_units: usize,

    /// Tasks waiting for a free unit.
    pub backlog_len: usize,

    /// Whether the pool has stopped accepting work.
    pub is_shutting_down: bool,
}

/// Bounded pool of execution units with lazy growth and a FIFO backlog.
///
/// Submissions lease an idle unit when one is available (LIFO, warm unit
/// first), lazily grow the pool under contention up to the cap, and queue
/// otherwise. Every released unit drains the backlog, oldest task first.
/// All failure is reported inside [`TaskResult`]; no orchestrator operation
/// panics or raises to the submitting caller.
pub struct TaskPool {
    registry: UnitRegistry,
    backlog: Backlog,
    config: PoolConfig,
    is_shutting_down: AtomicBool,
}

impl TaskPool {
    /// Creates a pool, eagerly spawning `pool_size` units.
    ///
    /// Fails only on invalid configuration or when unit creation itself
    /// fails, which is fatal at startup.
    pub async fn new(config: PoolConfig, factory: Arc<dyn UnitFactory>) -> Result<Self, PoolError> {
        Self::with_fault_hook(config, factory, logging_fault_hook()).await
    }

    /// As [`TaskPool::new`], with a caller-supplied fault hook wired into
    /// every unit.
    pub async fn with_fault_hook(
        config: PoolConfig,
        factory: Arc<dyn UnitFactory>,
        fault_hook: FaultHook,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        let registry = UnitRegistry::initialize(&config, factory, fault_hook).await?;
        Ok(Self {
            registry,
            backlog: Backlog::new(),
            config,
            is_shutting_down: AtomicBool::new(false),
        })
    }

    /// Default configuration on the current Tokio runtime.
    pub async fn with_defaults() -> Result<Self, PoolError> {
        Self::new(PoolConfig::default(), Arc::new(TokioUnitFactory::current())).await
    }

    /// Submits a task for execution.
    ///
    /// With a leasable unit the task runs immediately and the terminal
    /// result (200 or 300) is returned once the round trip finishes. With
    /// the pool saturated the task is queued and a 202 result is returned
    /// whose [`CompletionHandle`] later resolves with the terminal result.
    /// This method never returns an error; all failure travels in the
    /// result's `status`/`err` fields.
    pub async fn run_task(&self, task: Task) -> TaskResult {
        if self.is_shutting_down.load(Ordering::SeqCst) {
            return TaskResult::failed(PoolError::ShuttingDown.into(), None);
        }
        match self.registry.lease().await {
            Lease::Unit(handle) => {
                let leased = LeasedUnit::new(handle, &self.registry);
                let result = self.execute(leased, task.job).await;
                self.drain().await;
                result
            }
            Lease::Saturated => {
                let (reply, completion) = CompletionHandle::channel();
                self.backlog.push(PendingTask {
                    job: task.job,
                    reply,
                });
                debug!(backlog_len = self.backlog.len(), "No unit available, task queued");
                // A unit may have been freed between the failed lease and
                // the enqueue; one drain pass closes that window.
                self.drain().await;
                TaskResult::queued(completion)
            }
        }
    }

    /// Explicitly grows the pool by one unit.
    ///
    /// Returns a success message, or [`PoolError::Exhausted`] at capacity.
    pub async fn increase_pool(&self) -> Result<String, PoolError> {
        let unit_id = self.registry.grow().await?;
        Ok(format!("Execution unit {unit_id} added successfully."))
    }

    /// Snapshot of pool and backlog state.
    pub fn metrics(&self) -> PoolMetrics {
        let (idle_units, total_units) = self.registry.counts();
        PoolMetrics {
            idle_units,
            total_units,
            max_units: self.registry.capacity(),
            backlog_len: self.backlog.len(),
            is_shutting_down: self.is_shutting_down.load(Ordering::SeqCst),
        }
    }

    /// Stops accepting work.
    ///
    /// Every queued task is resolved with a failed (300) result so no
    /// continuation is left hanging, and all idle units are dropped, ending
    /// their loops. Units still leased stop once their current task ends.
    pub fn shutdown(&self) {
        self.is_shutting_down.store(true, Ordering::SeqCst);
        let mut flushed = 0usize;
        while let Some(pending) = self.backlog.pop() {
            let _ = pending
                .reply
                .send(TaskResult::failed(PoolError::ShuttingDown.into(), None));
            flushed += 1;
        }
        let dropped = self.registry.clear_idle();
        info!(flushed_tasks = flushed, dropped_units = dropped, "Task pool shut down");
    }

    /// Dispatches on the leased unit and shapes the outcome.
    ///
    /// The lease guard drops when this returns, so the unit is back in the
    /// idle pool (or discarded, if it faulted) before the caller drains.
    async fn execute(&self, leased: LeasedUnit<'_>, job: TaskFn) -> TaskResult {
        let unit_id = self
            .config
            .return_unit_id
            .then(|| leased.id().to_string());
        match self.dispatch(&leased, job).await {
            Ok(value) => TaskResult::completed(value, unit_id),
            Err(err) => TaskResult::failed(err, unit_id),
        }
    }

    /// One request, exactly one reply.
    ///
    /// The reply channel is consumed by the round trip, so nothing is left
    /// listening on the unit for unrelated future requests.
    async fn dispatch(
        &self,
        leased: &LeasedUnit<'_>,
        job: TaskFn,
    ) -> Result<TaskPayload, TaskError> {
        let (reply, response) = oneshot::channel();
        leased.send(UnitRequest {
            init: true,
            job,
            reply,
        })?;
        match response.await {
            Ok(outcome) => outcome,
            Err(_) => Err(DispatchError::ReplyDropped {
                unit_id: leased.id().to_string(),
            }
            .into()),
        }
    }

    /// Services queued tasks against free units, oldest first.
    ///
    /// Iterative on purpose: one loop iteration per serviced task, bounded
    /// by lease availability, so a long backlog cannot grow the call stack.
    /// Each serviced task goes through the same dispatch/release path as a
    /// direct submission, then its pending continuation is resolved.
    async fn drain(&self) {
        loop {
            if self.backlog.is_empty() {
                return;
            }
            let handle = match self.registry.lease().await {
                Lease::Unit(handle) => handle,
                Lease::Saturated => return,
            };
            let leased = LeasedUnit::new(handle, &self.registry);
            let Some(pending) = self.backlog.pop() else {
                // A concurrent drain serviced the last entry first; the
                // guard returns the unit untouched.
                return;
            };
            let result = self.execute(leased, pending.job).await;
            // The receiver is gone if the submitter dropped its handle.
            let _ = pending.reply.send(result);
        }
    }
}

impl fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskPool")
            .field("registry", &self.registry)
            .field("backlog", &self.backlog)
            .field("is_shutting_down", &self.is_shutting_down.load(Ordering::Relaxed))
            .finish()
    }
}
