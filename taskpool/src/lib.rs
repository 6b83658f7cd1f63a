// Taskpool
//
// A bounded pool of execution units: callers submit opaque units of work,
// the scheduler dispatches them to an idle unit, queues them when none is
// idle, and grows the pool lazily up to a hard cap. Spawning is amortized,
// concurrent resource usage is bounded, and bursts are absorbed by an
// unbounded FIFO backlog.

pub mod backlog;
pub mod config;
pub mod error;
pub mod logging;
pub mod pool;
pub mod registry;
pub mod unit;

// Re-export key types for easier usage
pub use config::PoolConfig;
pub use error::{DispatchError, PoolError};
pub use pool::{PoolMetrics, TaskPool};
pub use registry::{Lease, LeasedUnit, UnitRegistry};
pub use unit::{
    logging_fault_hook, FaultHook, TokioUnitFactory, UnitFactory, UnitFault, UnitHandle,
    UnitHealth, UnitRequest,
};

// Re-export the contract crate so downstreams need only one dependency.
pub use taskpool_api as api;
