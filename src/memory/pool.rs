//! Block pool allocator with free-slot recycling
//!
//! Nodes are stored in fixed-length blocks. A block is allocated once and never
//! moved or resized, so a node's address stays valid for as long as the node
//! is live, however much the pool grows afterwards.
//!
//! Every slot carries a `slot_index`. A live slot stores its own index there;
//! a free slot stores [`UNUSED_SLOT`]. Free slots are tracked on a LIFO stack of
//! indices. When the stack is empty the pool appends one block and pushes the
//! new indices in descending order, so consecutive allocations come out in
//! ascending, physically adjacent order.
//!
//! ```text
//!  blocks ──► [ s0 | s1 | s2 | ... | sB-1 ]   block 0
//!             [ sB | ...          | s2B-1 ]   block 1
//!
//!  free   ──► [ 7, 5, 2 ]   (top = 2, handed out next)
//! ```

use super::{NodeAllocator, PoolConfig};
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ptr::{self, NonNull};

/// `slot_index` value of a slot that holds no live node
pub const UNUSED_SLOT: usize = usize::MAX;

/// Handle to a pooled node: the node's slot position in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex(usize);

impl SlotIndex {
    /// Position of the slot in the pool
    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

/// One unit of pool storage
struct Slot<N> {
    /// Own index while live, `UNUSED_SLOT` while free
    slot_index: usize,
    node: MaybeUninit<N>,
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total slots owned by the pool
    pub capacity: usize,
    /// Slots holding a live node
    pub live: usize,
    /// Slots on the free list
    pub free: usize,
    /// Number of blocks allocated
    pub blocks: usize,
    /// Slots per block
    pub block_len: usize,
    /// Number of times the pool has grown
    pub growths: u64,
}

/// Allocator that carves nodes out of non-moving blocks
pub struct PoolAllocator<N> {
    blocks: Vec<NonNull<Slot<N>>>,
    block_len: usize,
    free: Vec<usize>,
    live: usize,
    growths: u64,
    config: PoolConfig,
    _marker: PhantomData<N>,
}

// SAFETY: the pool owns its blocks exclusively; the raw block pointers are
// never shared outside of borrows of the pool itself
unsafe impl<N: Send> Send for PoolAllocator<N> {}
// SAFETY: shared access only hands out `&N`
unsafe impl<N: Sync> Sync for PoolAllocator<N> {}

impl<N> PoolAllocator<N> {
    /// Create an empty pool with the default configuration
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create a pool with a custom configuration
    pub fn with_config(config: PoolConfig) -> Self {
        let block_len = config.block_len(mem::size_of::<Slot<N>>());
        let mut pool = Self {
            blocks: Vec::new(),
            block_len,
            free: Vec::new(),
            live: 0,
            growths: 0,
            config,
            _marker: PhantomData,
        };
        while pool.capacity() < pool.config.initial_slots {
            pool.grow();
        }
        pool
    }

    /// Total number of slots, live or free
    #[inline]
    pub fn capacity(&self) -> usize {
        self.blocks.len() * self.block_len
    }

    /// Slots added by each growth
    #[inline]
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Number of slots waiting on the free list
    #[inline]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The `slot_index` stored in slot `index`, or `None` past the end
    pub fn slot_index_of(&self, index: usize) -> Option<usize> {
        if index >= self.capacity() {
            return None;
        }
        // SAFETY: index is in bounds; only the plain integer field is read
        Some(unsafe { (*self.slot_ptr(index)).slot_index })
    }

    /// Whether slot `index` currently holds a live node
    pub fn is_live(&self, index: usize) -> bool {
        self.slot_index_of(index) == Some(index)
    }

    /// Current occupancy
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity(),
            live: self.live,
            free: self.free.len(),
            blocks: self.blocks.len(),
            block_len: self.block_len,
            growths: self.growths,
        }
    }

    /// Iterate live nodes in slot order, skipping free slots
    pub fn iter(&self) -> PoolIter<'_, N> {
        PoolIter {
            pool: self,
            index: 0,
            remaining: self.live,
        }
    }

    #[inline]
    fn slot_ptr(&self, index: usize) -> *mut Slot<N> {
        debug_assert!(index < self.capacity(), "slot {} out of range", index);
        let block = self.blocks[index / self.block_len];
        // SAFETY: every block holds exactly `block_len` slots
        unsafe { block.as_ptr().add(index % self.block_len) }
    }

    /// Append one block and push its indices so the lowest is popped first
    fn grow(&mut self) {
        let block: Box<[Slot<N>]> = (0..self.block_len)
            .map(|_| Slot {
                slot_index: UNUSED_SLOT,
                node: MaybeUninit::uninit(),
            })
            .collect();
        let base = self.capacity();
        self.blocks.push(NonNull::from(Box::leak(block)).cast::<Slot<N>>());
        self.free.reserve(self.block_len);
        self.free.extend((base..base + self.block_len).rev());
        self.growths += 1;
        log::debug!(
            "node pool grew to {} slots ({} blocks of {})",
            self.capacity(),
            self.blocks.len(),
            self.block_len
        );
    }

    fn drop_live_nodes(&mut self) {
        if !mem::needs_drop::<N>() || self.live == 0 {
            return;
        }
        for index in 0..self.capacity() {
            let slot = self.slot_ptr(index);
            // SAFETY: in-bounds slot; a slot whose index matches is initialised
            unsafe {
                if (*slot).slot_index == index {
                    (*slot).slot_index = UNUSED_SLOT;
                    ptr::drop_in_place(ptr::addr_of_mut!((*slot).node).cast::<N>());
                }
            }
        }
    }
}

impl<N> Default for PoolAllocator<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> fmt::Debug for PoolAllocator<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("stats", &self.stats())
            .finish()
    }
}

// SAFETY: blocks are never moved or freed while any slot in them is live,
// except by `clear_pool`/drop which end every handle
unsafe impl<N> NodeAllocator<N> for PoolAllocator<N> {
    type Handle = SlotIndex;

    const RELEASES_IN_BULK: bool = true;

    fn allocate_node(&mut self, node: N) -> SlotIndex {
        if self.free.is_empty() {
            self.grow();
        }
        let index = match self.free.pop() {
            Some(index) => index,
            None => unreachable!("grow always refills the free list"),
        };
        let slot = self.slot_ptr(index);
        // SAFETY: the index came off the free list, so the slot is in bounds
        // and holds no live node
        unsafe {
            debug_assert_eq!((*slot).slot_index, UNUSED_SLOT);
            ptr::addr_of_mut!((*slot).node).cast::<N>().write(node);
            (*slot).slot_index = index;
        }
        self.live += 1;
        SlotIndex(index)
    }

    unsafe fn release_node(&mut self, handle: SlotIndex) -> N {
        let slot = self.slot_ptr(handle.0);
        // SAFETY: caller guarantees the handle is live, so the slot is
        // initialised and its slot_index is its own position
        unsafe {
            let index = (*slot).slot_index;
            debug_assert_eq!(
                index, handle.0,
                "double release of pool slot {}",
                handle.0
            );
            let node = ptr::addr_of!((*slot).node).cast::<N>().read();
            self.free.push(index);
            (*slot).slot_index = UNUSED_SLOT;
            self.live -= 1;
            node
        }
    }

    #[inline]
    unsafe fn node_ptr(&self, handle: SlotIndex) -> NonNull<N> {
        let slot = self.slot_ptr(handle.0);
        // SAFETY: slot pointers are derived from non-null block pointers
        unsafe { NonNull::new_unchecked(ptr::addr_of_mut!((*slot).node).cast::<N>()) }
    }

    fn clear_pool(&mut self) {
        if self.blocks.is_empty() {
            return;
        }
        self.drop_live_nodes();
        let freed = self.capacity();
        for block in self.blocks.drain(..) {
            // SAFETY: each block was leaked from a Box<[Slot<N>]> of
            // `block_len` slots in `grow`; payloads were dropped above and
            // MaybeUninit does not drop its contents
            unsafe {
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                    block.as_ptr(),
                    self.block_len,
                )));
            }
        }
        self.free = Vec::new();
        self.live = 0;
        log::debug!("node pool released {} slots", freed);
    }

    fn live_count(&self) -> usize {
        self.live
    }
}

impl<N> Drop for PoolAllocator<N> {
    fn drop(&mut self) {
        self.clear_pool();
    }
}

/// Iterator over the live nodes of a pool in storage order
pub struct PoolIter<'a, N> {
    pool: &'a PoolAllocator<N>,
    index: usize,
    remaining: usize,
}

impl<'a, N> Iterator for PoolIter<'a, N> {
    type Item = &'a N;

    fn next(&mut self) -> Option<&'a N> {
        while self.remaining > 0 && self.index < self.pool.capacity() {
            let index = self.index;
            self.index += 1;
            let slot = self.pool.slot_ptr(index);
            // SAFETY: in-bounds slot; a matching slot_index means the node is
            // initialised, and the shared borrow of the pool keeps it alive
            unsafe {
                if (*slot).slot_index == index {
                    self.remaining -= 1;
                    return Some(&*ptr::addr_of!((*slot).node).cast::<N>());
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<N> ExactSizeIterator for PoolIter<'_, N> {}
