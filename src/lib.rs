//! # Nodepool: Node-Pooled Hash Maps and Linked Lists
//!
//! This crate provides node-based containers whose nodes come from a
//! pluggable allocator. Each container exists in two flavors that share one
//! implementation:
//!
//! - **Basic**: every node is an individual heap allocation
//! - **Pooled**: nodes are carved out of large blocks that never move; freed
//!   slots go on a free list and are reused before the pool grows
//!
//! ## Key Features
//!
//! - **Chained Hash Maps**: [`HashMap`] and [`PooledHashMap`] with cursors,
//!   configurable load factor and explicit rehash/reserve
//! - **Singly Linked Lists**: [`LinkedList`] and [`PooledList`] with O(1)
//!   push at both ends
//! - **Pool Traversal**: pooled containers iterate their nodes in storage
//!   order and report occupancy through [`PoolStats`]
//! - **Bulk Teardown**: pooled containers drop whole blocks at once
//!
//! ## Quick Start
//!
//! ```rust
//! use nodepool::{HashMap, PooledHashMap, PooledList};
//!
//! let mut map = HashMap::new();
//! map.insert("key", "value");
//! assert_eq!(map.at(&"key").unwrap(), &"value");
//!
//! let mut pooled = PooledHashMap::new();
//! for i in 0..100 {
//!     pooled.insert(i, i * i);
//! }
//! assert_eq!(pooled.pool_iter().count(), 100);
//!
//! let mut list = PooledList::new();
//! list.push_back(1);
//! list.push_front(0);
//! assert_eq!(list.front(), Some(&0));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod hash_map;
pub mod list;
pub mod memory;

// Re-export core types
pub use error::{NodePoolError, Result};

// Re-export containers
pub use hash_map::{Cursor, GenericHashMap, HashMap, HashMapConfig, PooledHashMap};
pub use list::{GenericList, LinkedList, ListConfig, PooledList};

// Re-export allocators
pub use memory::{
    Basic, BasicAllocator, NodeAllocator, NodeStrategy, PoolAllocator, PoolConfig, PoolStats,
    Pooled, SlotIndex,
};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library (currently only logs the version)
pub fn init() {
    log::debug!("Initializing nodepool v{}", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_functionality() {
        init();
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_version_info() {
        assert!(VERSION.contains('.'));
        // Version should be semver format like "0.1.0"
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2);
    }

    #[test]
    fn test_re_exports() {
        let _map = HashMap::<u32, u32>::new();
        let _pooled = PooledHashMap::<u32, u32>::new();
        let _list = LinkedList::<u32>::new();
        let _pooled_list = PooledList::<u32>::new();
        let _config = PoolConfig::default();

        let _err = NodePoolError::not_found("key");
        assert!(std::any::type_name::<Result<()>>().contains("NodePoolError"));
    }

    #[test]
    fn test_multiple_init_calls() {
        init();
        init();
    }
}
