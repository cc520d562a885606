//! Node allocators for the chained containers
//!
//! Every container in this crate stores its elements in nodes obtained from a
//! [`NodeAllocator`]. Two implementations exist:
//!
//! - [`BasicAllocator`]: one heap allocation per node, freed on release.
//! - [`PoolAllocator`]: nodes live in fixed-length blocks that are never
//!   moved once allocated; released slots go onto a LIFO free list and are
//!   handed out again before the pool grows.
//!
//! Containers do not name an allocator type directly. They are generic over a
//! [`NodeStrategy`] ([`Basic`] or [`Pooled`]) which maps a node type to the
//! concrete allocator. This lets a node embed the strategy's handle type for
//! its `next` link without the node type depending on itself.

pub mod basic;
pub mod pool;

pub use basic::{BasicAllocator, BoxHandle};
pub use pool::{PoolAllocator, PoolIter, PoolStats, SlotIndex, UNUSED_SLOT};

use crate::error::{NodePoolError, Result};
use std::fmt;
use std::ptr::NonNull;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default byte budget for one pool block
pub const DEFAULT_BLOCK_BYTES: usize = 4096;

/// Minimum number of slots in one pool block
pub const DEFAULT_MIN_BLOCK_SLOTS: usize = 20;

/// Source of node storage for a container.
///
/// # Safety
///
/// Implementors must guarantee that the pointer returned by
/// [`node_ptr`](Self::node_ptr) for a live handle stays valid and keeps the
/// same address until that handle is released or the allocator is cleared or
/// dropped, regardless of any other allocations made in between. Distinct
/// live handles must point to distinct nodes. The pointer must not be derived
/// from the `&self` borrow: a caller with exclusive access to the allocator
/// may write through it even though it was obtained through a shared
/// reference.
pub unsafe trait NodeAllocator<N> {
    /// Opaque reference to an allocated node
    type Handle: Copy + Eq + fmt::Debug + 'static;

    /// Whether [`clear_pool`](Self::clear_pool) reclaims every live node.
    ///
    /// When `false`, the owner must release nodes one at a time before the
    /// allocator is dropped or the nodes leak.
    const RELEASES_IN_BULK: bool;

    /// Move `node` into fresh storage and return its handle
    fn allocate_node(&mut self, node: N) -> Self::Handle;

    /// Move the node behind `handle` out and give its storage back.
    ///
    /// # Safety
    ///
    /// `handle` must have been returned by this allocator's
    /// [`allocate_node`](Self::allocate_node) and not released since. Releasing
    /// the same handle twice corrupts the allocator.
    unsafe fn release_node(&mut self, handle: Self::Handle) -> N;

    /// Stable pointer to the node behind `handle`.
    ///
    /// # Safety
    ///
    /// `handle` must be live in this allocator.
    unsafe fn node_ptr(&self, handle: Self::Handle) -> NonNull<N>;

    /// Shared reference to a live node.
    ///
    /// # Safety
    ///
    /// `handle` must be live in this allocator.
    #[inline]
    unsafe fn node(&self, handle: Self::Handle) -> &N {
        // SAFETY: caller guarantees the handle is live
        unsafe { self.node_ptr(handle).as_ref() }
    }

    /// Mutable reference to a live node.
    ///
    /// # Safety
    ///
    /// `handle` must be live in this allocator.
    #[inline]
    unsafe fn node_mut(&mut self, handle: Self::Handle) -> &mut N {
        // SAFETY: caller guarantees the handle is live; `&mut self` rules out
        // other references obtained through this allocator
        unsafe { self.node_ptr(handle).as_mut() }
    }

    /// Reclaim storage in bulk. A no-op for allocators without a pool.
    fn clear_pool(&mut self);

    /// Number of nodes currently allocated
    fn live_count(&self) -> usize;
}

/// Chooses the allocator a container uses for its nodes
pub trait NodeStrategy {
    /// Handle type shared by every allocator of this strategy
    type Handle: Copy + Eq + fmt::Debug + 'static;

    /// Allocator for node type `N`
    type Allocator<N>: NodeAllocator<N, Handle = Self::Handle>;

    /// Build an allocator for node type `N`
    fn allocator<N>(config: &PoolConfig) -> Self::Allocator<N>;
}

/// Per-node heap allocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Basic;

/// Block pool with free-slot recycling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pooled;

impl NodeStrategy for Basic {
    type Handle = BoxHandle;
    type Allocator<N> = BasicAllocator<N>;

    fn allocator<N>(_config: &PoolConfig) -> BasicAllocator<N> {
        BasicAllocator::new()
    }
}

impl NodeStrategy for Pooled {
    type Handle = SlotIndex;
    type Allocator<N> = PoolAllocator<N>;

    fn allocator<N>(config: &PoolConfig) -> PoolAllocator<N> {
        PoolAllocator::with_config(config.clone())
    }
}

/// Configuration for a node pool
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfig {
    /// Byte budget for a single block; divided by the slot size to get the
    /// number of slots added per growth
    pub block_bytes: usize,
    /// Lower bound on slots per block, for nodes too large for `block_bytes`
    pub min_block_slots: usize,
    /// Slots to reserve up front when the pool is created
    pub initial_slots: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_bytes: DEFAULT_BLOCK_BYTES,
            min_block_slots: DEFAULT_MIN_BLOCK_SLOTS,
            initial_slots: 0,
        }
    }
}

impl PoolConfig {
    /// Configuration for pools that rarely hold more than a few hundred nodes
    pub fn small() -> Self {
        Self {
            block_bytes: 1024,
            min_block_slots: 8,
            initial_slots: 0,
        }
    }

    /// Configuration for pools expected to hold hundreds of thousands of nodes
    pub fn large() -> Self {
        Self {
            block_bytes: 64 * 1024,
            min_block_slots: 256,
            initial_slots: 0,
        }
    }

    /// Slots added by each growth for a slot of `slot_size` bytes
    pub fn block_len(&self, slot_size: usize) -> usize {
        let by_bytes = self.block_bytes / slot_size.max(1);
        by_bytes.max(self.min_block_slots).max(1)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.min_block_slots == 0 {
            return Err(NodePoolError::invalid_parameter(
                "min_block_slots must be at least 1",
            ));
        }
        Ok(())
    }
}
