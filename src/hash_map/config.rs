//! Configuration for the chained hash maps

use crate::error::{NodePoolError, Result};
use crate::memory::PoolConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest bucket table a map will use
pub const MIN_BUCKETS: usize = 8;

/// Default ratio of entries to buckets before the table grows
pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 1.0;

/// Smallest accepted max load factor; lower values would ask for bucket
/// tables orders of magnitude larger than the entry count
pub const MIN_LOAD_FACTOR: f32 = 0.01;

/// Factor applied to the entry count when the table grows on insert
pub(crate) const GROWTH_FACTOR: f64 = 1.5;

/// Configuration for [`GenericHashMap`](super::GenericHashMap)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HashMapConfig {
    /// Bucket count of a new map (raised to at least [`MIN_BUCKETS`])
    pub initial_buckets: usize,
    /// Entries per bucket tolerated before the table grows; must be finite
    /// and positive
    pub max_load_factor: f32,
    /// Node pool settings, used only by pooled maps
    pub pool: PoolConfig,
}

impl Default for HashMapConfig {
    fn default() -> Self {
        Self {
            initial_buckets: MIN_BUCKETS,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            pool: PoolConfig::default(),
        }
    }
}

impl HashMapConfig {
    /// Create config optimized for small maps (a few hundred entries)
    pub fn small() -> Self {
        Self {
            initial_buckets: MIN_BUCKETS,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            pool: PoolConfig::small(),
        }
    }

    /// Create config optimized for large maps (>100k entries)
    pub fn large() -> Self {
        Self {
            initial_buckets: 1024,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            pool: PoolConfig::large(),
        }
    }

    /// Create config trading longer chains for a smaller bucket table
    pub fn dense() -> Self {
        Self {
            initial_buckets: MIN_BUCKETS,
            max_load_factor: 2.0,
            pool: PoolConfig::default(),
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        validate_load_factor(self.max_load_factor)?;
        self.pool.validate()
    }
}

pub(crate) fn validate_load_factor(factor: f32) -> Result<()> {
    if !factor.is_finite() || factor < MIN_LOAD_FACTOR {
        return Err(NodePoolError::invalid_parameter(format!(
            "max load factor must be finite and at least {}, got {}",
            MIN_LOAD_FACTOR, factor
        )));
    }
    Ok(())
}

/// Largest entry count a table of `buckets` tolerates
#[inline]
pub(crate) fn reallocation_limit(buckets: usize, factor: f32) -> usize {
    (buckets as f64 * factor as f64).floor() as usize
}

/// Buckets needed so that `entries` stays within the load factor
#[inline]
pub(crate) fn buckets_for(entries: usize, factor: f32) -> usize {
    (entries as f64 / factor as f64).ceil() as usize
}
