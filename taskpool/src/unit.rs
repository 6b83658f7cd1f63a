//! # Execution Unit Runtime
//!
//! An execution unit is an isolated worker that serves one request at a
//! time: it runs the submitted callable and answers with a single response.
//! The orchestrator relies only on that per-call pairing and never on any
//! ordering of responses across units.
//!
//! ## Key Responsibilities
//! - Running submitted callables off the orchestrator's control flow
//! - Error isolation through panic recovery
//! - Out-of-band fault reporting through a fire-and-forget hook
//!
//! ## Implementation Details
//! Each unit owns the receiving half of an unbounded request channel. A
//! request carries its own one-shot reply channel; sending the reply consumes
//! the channel, so no listener can leak across calls on a reused unit. A unit
//! stops when every sender to its channel has been dropped.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use flume::{Receiver, Sender};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error};

use taskpool_api::errors::TaskError;
use taskpool_api::types::{TaskFn, TaskPayload};

use crate::error::PoolError;

/// Health of a single execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitHealth {
    /// Unit is idle, waiting in the pool.
    Idle = 0,

    /// Unit is leased and executing a task.
    Busy = 1,

    /// Unit has faulted and must not be leased again.
    Faulted = 2,
}

/// One request of the unit wire contract: `{init, job, reply}`.
///
/// The unit executes `job` and sends back exactly one response on `reply`.
pub struct UnitRequest {
    /// Protocol marker; requests without it are ignored by the unit loop.
    pub init: bool,

    /// The callable to execute.
    pub job: TaskFn,

    /// One-shot reply channel, consumed by the response.
    pub reply: oneshot::Sender<Result<TaskPayload, TaskError>>,
}

impl fmt::Debug for UnitRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitRequest")
            .field("init", &self.init)
            .finish_non_exhaustive()
    }
}

/// Out-of-band fault report, not correlated to any in-flight task.
#[derive(Debug, Clone)]
pub struct UnitFault {
    pub unit_id: String,
    pub message: String,
}

/// Fire-and-forget fault reporting hook.
pub type FaultHook = Arc<dyn Fn(UnitFault) + Send + Sync>;

/// Default fault hook: log the fault and move on.
pub fn logging_fault_hook() -> FaultHook {
    Arc::new(|fault: UnitFault| {
        error!(unit_id = %fault.unit_id, message = %fault.message, "Execution unit fault");
    })
}

/// Handle to a live execution unit.
///
/// Exactly one handle exists per unit. It is owned either by the idle stack
/// or by the caller holding the lease, never both at once.
pub struct UnitHandle {
    id: String,
    sender: Sender<UnitRequest>,
    health: Arc<AtomicUsize>,
}

impl UnitHandle {
    pub fn new(id: String, sender: Sender<UnitRequest>, health: Arc<AtomicUsize>) -> Self {
        Self { id, sender, health }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sender(&self) -> &Sender<UnitRequest> {
        &self.sender
    }

    pub fn health(&self) -> UnitHealth {
        match self.health.load(Ordering::SeqCst) {
            0 => UnitHealth::Idle,
            1 => UnitHealth::Busy,
            _ => UnitHealth::Faulted,
        }
    }

    pub fn set_health(&self, health: UnitHealth) {
        self.health.store(health as usize, Ordering::SeqCst);
    }
}

impl fmt::Debug for UnitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitHandle")
            .field("id", &self.id)
            .field("health", &self.health())
            .finish()
    }
}

/// Spawns execution units.
///
/// The seam that lets tests inject failing or instrumented spawn behavior;
/// the registry only ever creates units through this trait.
#[async_trait]
pub trait UnitFactory: Send + Sync {
    /// Creates one unit wired with the pool's fault hook.
    async fn spawn_unit(&self, id: &str, fault_hook: FaultHook) -> Result<UnitHandle, PoolError>;
}

/// Default factory: one Tokio task per unit, spawned onto a captured runtime
/// handle.
#[derive(Debug, Clone)]
pub struct TokioUnitFactory {
    handle: Handle,
}

impl TokioUnitFactory {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Captures the runtime the caller is currently on.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

#[async_trait]
impl UnitFactory for TokioUnitFactory {
    async fn spawn_unit(&self, id: &str, fault_hook: FaultHook) -> Result<UnitHandle, PoolError> {
        let (sender, receiver) = flume::unbounded();
        let health = Arc::new(AtomicUsize::new(UnitHealth::Idle as usize));
        // Detached: the unit stops when its sender is dropped.
        let _ = self
            .handle
            .spawn(run_unit(id.to_string(), receiver, health.clone(), fault_hook));
        Ok(UnitHandle::new(id.to_string(), sender, health))
    }
}

/// Unit main loop: one response per accepted request.
async fn run_unit(
    id: String,
    receiver: Receiver<UnitRequest>,
    health: Arc<AtomicUsize>,
    fault_hook: FaultHook,
) {
    while let Ok(request) = receiver.recv_async().await {
        if !request.init {
            continue;
        }
        let UnitRequest { job, reply, .. } = request;
        match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(outcome) => {
                // A closed receiver means the dispatcher stopped waiting.
                let _ = reply.send(outcome);
            }
            Err(payload) => {
                health.store(UnitHealth::Faulted as usize, Ordering::SeqCst);
                fault_hook(UnitFault {
                    unit_id: id.clone(),
                    message: panic_message(payload),
                });
                // `reply` drops here; the dispatcher observes the broken
                // round trip as a dispatch error.
            }
        }
    }
    debug!(unit_id = %id, "Execution unit stopped");
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "unit panicked with a non-string payload".to_string(),
        },
    }
}
