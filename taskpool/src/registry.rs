//! # Lease Registry
//!
//! Tracks idle execution units as a capacity-bounded pool and implements the
//! lease/release protocol with lazy growth.
//!
//! ## Invariants
//! - `|idle| + |leased| <= max_units` at all times
//! - A handle is owned by the idle stack or by one leasing caller, never both
//! - Growth only happens from a lease attempt that finds the stack empty, or
//!   from an explicit [`UnitRegistry::grow`] call
//!
//! # Thread Safety
//! All idle-stack and counter mutations happen under one synchronous lock,
//! so concurrent leases can never hand out the same handle and concurrent
//! releases can never lose one. The lock is never held across an await.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::config::PoolConfig;
use crate::error::{DispatchError, PoolError};
use crate::unit::{FaultHook, UnitFactory, UnitHandle, UnitHealth, UnitRequest};

/// Outcome of a lease attempt.
///
/// `Saturated` is a normal "caller must queue" signal, not an error: the
/// pool is at capacity with every unit busy.
#[derive(Debug)]
pub enum Lease {
    Unit(UnitHandle),
    Saturated,
}

enum LeaseDecision {
    Unit(UnitHandle),
    Grow(usize),
    Saturated,
}

struct RegistryState {
    /// Idle units, most recently released last; leases pop from the back.
    idle: Vec<UnitHandle>,

    /// Units currently alive: idle plus leased.
    spawned: usize,

    /// Monotonic id sequence, never reused after a discard.
    next_seq: usize,
}

/// Registry of execution units with a hard capacity cap.
pub struct UnitRegistry {
    state: Mutex<RegistryState>,
    capacity: usize,
    factory: Arc<dyn UnitFactory>,
    fault_hook: FaultHook,
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (idle, spawned) = self.counts();
        f.debug_struct("UnitRegistry")
            .field("idle", &idle)
            .field("spawned", &spawned)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl UnitRegistry {
    /// Eagerly creates the initial pool. A spawn failure here is fatal and
    /// propagates to the caller.
    pub async fn initialize(
        config: &PoolConfig,
        factory: Arc<dyn UnitFactory>,
        fault_hook: FaultHook,
    ) -> Result<Self, PoolError> {
        let mut idle = Vec::with_capacity(config.pool_size);
        for seq in 1..=config.pool_size {
            let id = format!("unit-{seq}");
            let handle = factory.spawn_unit(&id, fault_hook.clone()).await?;
            idle.push(handle);
        }
        info!(
            pool_size = config.pool_size,
            max_units = config.max_units,
            "Unit pool initialized"
        );
        Ok(Self {
            state: Mutex::new(RegistryState {
                idle,
                spawned: config.pool_size,
                next_seq: config.pool_size,
            }),
            capacity: config.max_units,
            factory,
            fault_hook,
        })
    }

    /// Leases an idle unit, lazily growing the pool when the stack is empty
    /// and capacity remains.
    ///
    /// Reuse is LIFO: the most recently released unit is handed out first.
    /// Handles found faulted while idle are discarded (their capacity slot is
    /// freed) and skipped. Growth failure is converted into `Saturated`, the
    /// signal for the scheduler to queue the task.
    pub async fn lease(&self) -> Lease {
        let decision = {
            let mut state = self.state.lock().unwrap();
            loop {
                match state.idle.pop() {
                    Some(handle) if handle.health() == UnitHealth::Faulted => {
                        state.spawned -= 1;
                        warn!(unit_id = %handle.id(), "Discarding faulted unit found in the idle pool");
                    }
                    Some(handle) => break LeaseDecision::Unit(handle),
                    None => {
                        if state.spawned < self.capacity {
                            // Reserve the slot before spawning so concurrent
                            // leases cannot overshoot the cap.
                            state.spawned += 1;
                            state.next_seq += 1;
                            break LeaseDecision::Grow(state.next_seq);
                        }
                        break LeaseDecision::Saturated;
                    }
                }
            }
        };

        match decision {
            LeaseDecision::Unit(handle) => {
                handle.set_health(UnitHealth::Busy);
                Lease::Unit(handle)
            }
            LeaseDecision::Grow(seq) => match self.spawn_reserved(seq).await {
                Ok(handle) => {
                    handle.set_health(UnitHealth::Busy);
                    Lease::Unit(handle)
                }
                Err(err) => {
                    warn!(error = %err, "Lazy growth failed; treating as no unit available");
                    Lease::Saturated
                }
            },
            LeaseDecision::Saturated => Lease::Saturated,
        }
    }

    /// Explicit growth: the new unit lands on the idle stack.
    ///
    /// Fails with [`PoolError::Exhausted`] at capacity.
    pub async fn grow(&self) -> Result<String, PoolError> {
        let seq = {
            let mut state = self.state.lock().unwrap();
            if state.spawned >= self.capacity {
                return Err(PoolError::Exhausted {
                    capacity: self.capacity,
                });
            }
            state.spawned += 1;
            state.next_seq += 1;
            state.next_seq
        };
        let handle = self.spawn_reserved(seq).await?;
        let id = handle.id().to_string();
        self.state.lock().unwrap().idle.push(handle);
        info!(unit_id = %id, "Execution unit added");
        Ok(id)
    }

    /// Spawns a unit for an already reserved slot; frees the slot on failure.
    async fn spawn_reserved(&self, seq: usize) -> Result<UnitHandle, PoolError> {
        let id = format!("grown-unit-{seq}");
        match self.factory.spawn_unit(&id, self.fault_hook.clone()).await {
            Ok(handle) => Ok(handle),
            Err(err) => {
                self.state.lock().unwrap().spawned -= 1;
                Err(err)
            }
        }
    }

    /// Returns a unit to the idle stack (LIFO).
    ///
    /// A faulted unit is discarded instead: its handle drops (ending the unit
    /// loop) and its capacity slot frees up for later lazy growth.
    pub fn release(&self, handle: UnitHandle) {
        let mut state = self.state.lock().unwrap();
        if handle.health() == UnitHealth::Faulted {
            state.spawned -= 1;
            warn!(unit_id = %handle.id(), "Dropping faulted unit instead of returning it to the idle pool");
            return;
        }
        handle.set_health(UnitHealth::Idle);
        state.idle.push(handle);
    }

    /// Idle and live unit counts under one lock, for consistent snapshots.
    pub fn counts(&self) -> (usize, usize) {
        let state = self.state.lock().unwrap();
        (state.idle.len(), state.spawned)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every idle handle, ending their unit loops. Returns how many
    /// were dropped. Leased units keep running until released.
    pub fn clear_idle(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        let dropped = state.idle.len();
        state.spawned -= dropped;
        state.idle.clear();
        dropped
    }
}

/// A held lease, released exactly once on every exit path.
///
/// Dropping the guard returns the unit to the registry, which either
/// restores it to the idle stack or discards it if it faulted while leased.
pub struct LeasedUnit<'a> {
    handle: Option<UnitHandle>,
    registry: &'a UnitRegistry,
}

impl<'a> LeasedUnit<'a> {
    pub fn new(handle: UnitHandle, registry: &'a UnitRegistry) -> Self {
        Self {
            handle: Some(handle),
            registry,
        }
    }

    fn handle(&self) -> &UnitHandle {
        self.handle.as_ref().expect("lease already released")
    }

    pub fn id(&self) -> &str {
        self.handle().id()
    }

    /// Delivers one request to the leased unit.
    pub fn send(&self, request: UnitRequest) -> Result<(), DispatchError> {
        let handle = self.handle();
        handle
            .sender()
            .send(request)
            .map_err(|_| DispatchError::SendFailed {
                unit_id: handle.id().to_string(),
            })
    }
}

impl Drop for LeasedUnit<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.registry.release(handle);
        }
    }
}

impl fmt::Debug for LeasedUnit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeasedUnit")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{logging_fault_hook, TokioUnitFactory};

    async fn registry(pool_size: usize, max_units: usize) -> UnitRegistry {
        UnitRegistry::initialize(
            &PoolConfig::new(pool_size, max_units),
            Arc::new(TokioUnitFactory::current()),
            logging_fault_hook(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn lease_with_idle_units_never_grows() {
        let registry = registry(2, 4).await;
        let Lease::Unit(handle) = registry.lease().await else {
            panic!("expected a unit");
        };
        assert_eq!(registry.counts(), (1, 2));
        registry.release(handle);
        assert_eq!(registry.counts(), (2, 2));
    }

    #[tokio::test]
    async fn lease_on_empty_stack_grows_by_one() {
        let registry = registry(0, 1).await;
        let Lease::Unit(handle) = registry.lease().await else {
            panic!("expected a grown unit");
        };
        assert_eq!(handle.id(), "grown-unit-1");
        assert_eq!(registry.counts(), (0, 1));
        registry.release(handle);
    }

    #[tokio::test]
    async fn lease_at_capacity_is_saturated() {
        let registry = registry(1, 1).await;
        let Lease::Unit(held) = registry.lease().await else {
            panic!("expected a unit");
        };
        assert!(matches!(registry.lease().await, Lease::Saturated));
        assert_eq!(registry.counts(), (0, 1));
        registry.release(held);
    }

    #[tokio::test]
    async fn release_is_lifo() {
        let registry = registry(2, 2).await;
        let Lease::Unit(first) = registry.lease().await else {
            panic!("expected a unit");
        };
        let Lease::Unit(second) = registry.lease().await else {
            panic!("expected a unit");
        };
        let last_id = second.id().to_string();
        registry.release(first);
        registry.release(second);
        let Lease::Unit(reused) = registry.lease().await else {
            panic!("expected a unit");
        };
        assert_eq!(reused.id(), last_id);
        registry.release(reused);
    }

    #[tokio::test]
    async fn faulted_unit_is_discarded_on_release() {
        let registry = registry(1, 1).await;
        let Lease::Unit(handle) = registry.lease().await else {
            panic!("expected a unit");
        };
        handle.set_health(UnitHealth::Faulted);
        registry.release(handle);
        assert_eq!(registry.counts(), (0, 0));
        // The freed slot is reclaimed by lazy growth.
        assert!(matches!(registry.lease().await, Lease::Unit(_)));
    }
}
