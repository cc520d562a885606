//! Singly linked lists
//!
//! - [`LinkedList`]: every node is its own heap allocation
//! - [`PooledList`]: nodes live in a block pool and freed slots are recycled
//!
//! # Examples
//!
//! ```rust
//! use nodepool::list::PooledList;
//!
//! let mut list: PooledList<i32> = (1..=5).collect();
//! list.pop_front();
//! list.pop_front();
//! list.remove(&4);
//! assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![3, 5]);
//! ```

mod iter;
mod singly;

pub use iter::{IntoIter, Iter, IterMut, PoolValues};
pub use singly::{GenericList, LinkedList, PooledList};

use crate::error::Result;
use crate::memory::PoolConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for [`GenericList`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ListConfig {
    /// Node pool settings, used only by pooled lists
    pub pool: PoolConfig,
}

impl ListConfig {
    /// Create config optimized for short lists
    pub fn small() -> Self {
        Self {
            pool: PoolConfig::small(),
        }
    }

    /// Create config optimized for long lists
    pub fn large() -> Self {
        Self {
            pool: PoolConfig::large(),
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()
    }
}
