//! Separately chained hash maps
//!
//! - [`HashMap`]: every node is its own heap allocation
//! - [`PooledHashMap`]: nodes live in a block pool and freed slots are
//!   recycled; adds [`pool_iter`](GenericHashMap::pool_iter) for traversal in
//!   storage order
//!
//! Both are the same [`GenericHashMap`] logic instantiated with a different
//! [`NodeStrategy`](crate::memory::NodeStrategy).
//!
//! # Examples
//!
//! ```rust
//! use nodepool::hash_map::PooledHashMap;
//!
//! let mut map = PooledHashMap::new();
//! map.insert(1, "a");
//! map.insert(2, "b");
//! assert_eq!(map.get(&2), Some(&"b"));
//! assert_eq!(map.remove(&2), Some("b"));
//! assert!(map.at(&2).is_err());
//! ```

mod config;
mod iter;
mod map;

pub use config::{HashMapConfig, DEFAULT_MAX_LOAD_FACTOR, MIN_BUCKETS, MIN_LOAD_FACTOR};
pub use iter::{Iter, IterMut, Keys, PoolEntries, Values, ValuesMut};
pub use map::{Cursor, GenericHashMap, HashMap, PooledHashMap};
