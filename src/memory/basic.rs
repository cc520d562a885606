//! Per-node heap allocator
//!
//! Each node is boxed on allocation and unboxed on release. There is nothing
//! to reclaim in bulk, so the owning container is responsible for releasing
//! every node it still holds before dropping the allocator.

use super::NodeAllocator;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Handle to a boxed node: the node's heap address with its type erased
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BoxHandle(NonNull<u8>);

// SAFETY: a handle is only an address; dereferencing it requires the unsafe
// allocator API and exclusive or shared access to the owning container
unsafe impl Send for BoxHandle {}
// SAFETY: see above
unsafe impl Sync for BoxHandle {}

impl fmt::Debug for BoxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxHandle({:p})", self.0)
    }
}

/// Allocator that hands out one heap allocation per node
pub struct BasicAllocator<N> {
    live: usize,
    _marker: PhantomData<Box<N>>,
}

impl<N> BasicAllocator<N> {
    /// Create an allocator with no live nodes
    pub fn new() -> Self {
        Self {
            live: 0,
            _marker: PhantomData,
        }
    }
}

impl<N> Default for BasicAllocator<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> fmt::Debug for BasicAllocator<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAllocator")
            .field("live", &self.live)
            .finish()
    }
}

// SAFETY: boxed nodes never move, so the address is stable until the box is
// reclaimed in `release_node`
unsafe impl<N> NodeAllocator<N> for BasicAllocator<N> {
    type Handle = BoxHandle;

    const RELEASES_IN_BULK: bool = false;

    #[inline]
    fn allocate_node(&mut self, node: N) -> BoxHandle {
        let ptr = Box::into_raw(Box::new(node));
        self.live += 1;
        // SAFETY: Box::into_raw never returns null
        BoxHandle(unsafe { NonNull::new_unchecked(ptr) }.cast())
    }

    #[inline]
    unsafe fn release_node(&mut self, handle: BoxHandle) -> N {
        debug_assert!(self.live > 0, "release_node on an allocator with no live nodes");
        self.live -= 1;
        // SAFETY: the handle came from Box::into_raw in allocate_node and has
        // not been released before (caller contract)
        let boxed = unsafe { Box::from_raw(handle.0.cast::<N>().as_ptr()) };
        *boxed
    }

    #[inline]
    unsafe fn node_ptr(&self, handle: BoxHandle) -> NonNull<N> {
        handle.0.cast()
    }

    fn clear_pool(&mut self) {}

    fn live_count(&self) -> usize {
        self.live
    }
}

impl<N> Drop for BasicAllocator<N> {
    fn drop(&mut self) {
        if self.live != 0 {
            log::warn!("BasicAllocator dropped with {} live nodes - leaking them", self.live);
        }
    }
}
