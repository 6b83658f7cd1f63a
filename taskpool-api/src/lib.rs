//! # Taskpool API
//!
//! Contract layer for the taskpool bounded execution-unit pool. This crate
//! holds the types a caller and the orchestrator agree on, with no
//! orchestration logic of its own.
//!
//! ## Core Components
//!
//! - **Tasks**: an opaque callable ([`Task`], [`TaskFn`]) handed to the pool
//!   for execution on an idle unit.
//! - **Results**: [`TaskResult`], the single outcome shape for every
//!   submission. Its numeric status is public contract: 200 means completed
//!   with a value, 202 means accepted and queued, 300 means failed.
//! - **Completions**: [`CompletionHandle`], delivered with every 202 result,
//!   resolving to the terminal result once the queued task is serviced.
//! - **Errors**: [`TaskError`], the tagged error carried inside failed
//!   results (message, numeric status, stable name).
//!
//! ## Module Organization
//!
//! - [`types`]: task, payload, result and completion types
//! - [`errors`]: the tagged error type and status conventions

pub mod errors;
pub mod types;

// Re-export the full contract surface at the crate root.
pub use errors::TaskError;
pub use types::{
    CompletionHandle, CompletionSender, Task, TaskFn, TaskPayload, TaskResult, STATUS_COMPLETED,
    STATUS_FAILED, STATUS_QUEUED,
};
