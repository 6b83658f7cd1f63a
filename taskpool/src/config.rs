use crate::error::PoolError;

/// Configuration for a [`TaskPool`](crate::pool::TaskPool).
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of execution units created eagerly at construction.
    pub pool_size: usize,

    /// Hard cap on live units, eager plus lazily grown.
    pub max_units: usize,

    /// Whether task results carry the id of the unit that served them.
    pub return_unit_id: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let pool_size = num_cpus::get();
        Self {
            pool_size,
            max_units: pool_size * 2,
            return_unit_id: false,
        }
    }
}

impl PoolConfig {
    /// Pool with the given eager size and growth cap.
    pub fn new(pool_size: usize, max_units: usize) -> Self {
        Self {
            pool_size,
            max_units,
            return_unit_id: false,
        }
    }

    /// Fixed-size pool: no lazy growth headroom.
    pub fn fixed(size: usize) -> Self {
        Self::new(size, size)
    }

    /// Enables unit-id reporting in task results.
    pub fn with_unit_ids(mut self) -> Self {
        self.return_unit_id = true;
        self
    }

    /// Rejects configurations the registry cannot honor.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_units == 0 {
            return Err(PoolError::InvalidConfig(
                "max_units must be at least 1".to_string(),
            ));
        }
        if self.pool_size > self.max_units {
            return Err(PoolError::InvalidConfig(format!(
                "pool_size ({}) exceeds max_units ({})",
                self.pool_size, self.max_units
            )));
        }
        Ok(())
    }
}
