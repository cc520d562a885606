//! Singly linked list over a pluggable node allocator
//!
//! The list keeps a head and a tail handle. Pushing at either end and popping
//! the front are O(1). Anything that needs the predecessor of a node
//! (`pop_back`, positional removal, `remove`) walks from the head, since nodes
//! only link forward.

use super::iter::{IntoIter, Iter, IterMut, PoolValues};
use super::ListConfig;
use crate::error::{check_bounds, Result};
use crate::memory::{Basic, NodeAllocator, NodeStrategy, PoolStats, Pooled};
use std::fmt;
use std::iter::FromIterator;

/// List node: element plus the link to its successor
pub(crate) struct ListNode<T, H> {
    pub(crate) value: T,
    pub(crate) next: Option<H>,
}

/// Allocator type a list with strategy `P` stores its nodes in
pub(crate) type ListAlloc<T, P> =
    <P as NodeStrategy>::Allocator<ListNode<T, <P as NodeStrategy>::Handle>>;

/// Singly linked list generic over its node allocation strategy
///
/// Use the [`LinkedList`] and [`PooledList`] aliases rather than naming the
/// strategy directly.
pub struct GenericList<T, P: NodeStrategy = Basic> {
    head: Option<P::Handle>,
    tail: Option<P::Handle>,
    len: usize,
    alloc: ListAlloc<T, P>,
    config: ListConfig,
}

/// Linked list that allocates every node on the heap individually
pub type LinkedList<T> = GenericList<T, Basic>;

/// Linked list that carves its nodes out of a block pool
pub type PooledList<T> = GenericList<T, Pooled>;

impl<T, P: NodeStrategy> GenericList<T, P> {
    /// Create an empty list
    pub fn new() -> Self {
        Self::build(ListConfig::default())
    }

    /// Create an empty list with a custom configuration
    pub fn with_config(config: ListConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ListConfig) -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
            alloc: P::allocator(&config.pool),
            config,
        }
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The list's configuration
    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    #[inline]
    fn node(&self, h: P::Handle) -> &ListNode<T, P::Handle> {
        // SAFETY: the list only ever passes handles reachable from `head`,
        // all of which are live
        unsafe { self.alloc.node(h) }
    }

    #[inline]
    fn node_mut(&mut self, h: P::Handle) -> &mut ListNode<T, P::Handle> {
        // SAFETY: as in `node`
        unsafe { self.alloc.node_mut(h) }
    }

    /// Handle of the element at `index`, walking from the head
    fn handle_at(&self, index: usize) -> Option<P::Handle> {
        if index >= self.len {
            return None;
        }
        let mut cur = self.head;
        for _ in 0..index {
            cur = self.node(cur?).next;
        }
        cur
    }

    /// Add an element at the front
    pub fn push_front(&mut self, value: T) {
        let h = self.alloc.allocate_node(ListNode {
            value,
            next: self.head,
        });
        self.head = Some(h);
        if self.tail.is_none() {
            self.tail = Some(h);
        }
        self.len += 1;
    }

    /// Add an element at the back
    pub fn push_back(&mut self, value: T) {
        let h = self.alloc.allocate_node(ListNode { value, next: None });
        match self.tail {
            Some(t) => self.node_mut(t).next = Some(h),
            None => self.head = Some(h),
        }
        self.tail = Some(h);
        self.len += 1;
    }

    /// Remove and return the first element
    pub fn pop_front(&mut self) -> Option<T> {
        let h = self.head?;
        Some(self.unlink(None, h))
    }

    /// Remove and return the last element.
    ///
    /// O(n): the new tail is found by walking from the head.
    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        let prev = match self.len {
            1 => None,
            n => self.handle_at(n - 2),
        };
        Some(self.unlink(prev, tail))
    }

    /// Unlink `h`, whose predecessor is `prev` (`None` for the head)
    fn unlink(&mut self, prev: Option<P::Handle>, h: P::Handle) -> T {
        let next = self.node(h).next;
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        if next.is_none() {
            self.tail = prev;
        }
        self.len -= 1;
        // SAFETY: h is no longer reachable and is released exactly once
        unsafe { self.alloc.release_node(h) }.value
    }

    /// First element
    pub fn front(&self) -> Option<&T> {
        self.head.map(|h| &self.node(h).value)
    }

    /// First element, mutably
    pub fn front_mut(&mut self) -> Option<&mut T> {
        let h = self.head?;
        Some(&mut self.node_mut(h).value)
    }

    /// Last element
    pub fn back(&self) -> Option<&T> {
        self.tail.map(|h| &self.node(h).value)
    }

    /// Last element, mutably
    pub fn back_mut(&mut self) -> Option<&mut T> {
        let h = self.tail?;
        Some(&mut self.node_mut(h).value)
    }

    /// Element at `index`, O(index)
    pub fn get(&self, index: usize) -> Option<&T> {
        let h = self.handle_at(index)?;
        Some(&self.node(h).value)
    }

    /// Element at `index`, mutably
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let h = self.handle_at(index)?;
        Some(&mut self.node_mut(h).value)
    }

    /// Insert `value` so that it ends up at `index`
    pub fn insert_at(&mut self, index: usize, value: T) -> Result<()> {
        check_bounds(index, self.len + 1)?;
        if index == 0 {
            self.push_front(value);
        } else if index == self.len {
            self.push_back(value);
        } else if let Some(prev) = self.handle_at(index - 1) {
            let next = self.node(prev).next;
            let h = self.alloc.allocate_node(ListNode { value, next });
            self.node_mut(prev).next = Some(h);
            self.len += 1;
        }
        Ok(())
    }

    /// Remove and return the element at `index`
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        check_bounds(index, self.len)?;
        let prev = match index {
            0 => None,
            i => self.handle_at(i - 1),
        };
        let h = match prev {
            Some(p) => self.node(p).next,
            None => self.head,
        };
        match h {
            Some(h) => Ok(self.unlink(prev, h)),
            None => unreachable!("index {} checked against len {}", index, self.len),
        }
    }

    /// Keep only the elements for which `keep` returns true
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&mut T) -> bool,
    {
        let mut prev: Option<P::Handle> = None;
        let mut cur = self.head;
        while let Some(h) = cur {
            let node = self.node_mut(h);
            let next = node.next;
            if keep(&mut node.value) {
                prev = Some(h);
            } else {
                drop(self.unlink(prev, h));
            }
            cur = next;
        }
    }

    /// Remove every element equal to `value`, returning how many went
    pub fn remove(&mut self, value: &T) -> usize
    where
        T: PartialEq,
    {
        let before = self.len;
        self.retain(|v| v != value);
        before - self.len
    }

    /// Check if any element equals `value`
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|v| v == value)
    }

    /// Shorten the list to `len` elements; no-op if already shorter
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        if len == 0 {
            self.clear();
            return;
        }
        if let Some(new_tail) = self.handle_at(len - 1) {
            let mut cur = self.node_mut(new_tail).next.take();
            while let Some(h) = cur {
                // SAFETY: the detached suffix is unreachable from the list
                // and each node is released exactly once
                cur = unsafe { self.alloc.release_node(h) }.next;
            }
            self.tail = Some(new_tail);
            self.len = len;
        }
    }

    /// Grow with clones of `value` or truncate, so the list has `len`
    /// elements
    pub fn resize(&mut self, len: usize, value: T)
    where
        T: Clone,
    {
        if len < self.len {
            self.truncate(len);
            return;
        }
        for _ in self.len..len {
            self.push_back(value.clone());
        }
    }

    /// Move every element of `other` to the back of this list.
    ///
    /// The two lists own separate allocators, so this re-allocates each
    /// moved node: O(len of `other`).
    pub fn append(&mut self, other: &mut Self) {
        while let Some(value) = other.pop_front() {
            self.push_back(value);
        }
    }

    /// Remove every element. Pooled lists keep their pool capacity.
    pub fn clear(&mut self) {
        let mut cur = self.head.take();
        while let Some(h) = cur {
            // SAFETY: the chain was detached from `head`; each node is
            // released exactly once
            cur = unsafe { self.alloc.release_node(h) }.next;
        }
        self.tail = None;
        self.len = 0;
    }

    /// Remove every element and give the node storage back in bulk
    pub fn reset(&mut self) {
        if Self::releases_in_bulk() {
            self.head = None;
            self.tail = None;
            self.len = 0;
            self.alloc.clear_pool();
        } else {
            self.clear();
        }
    }

    /// Iterate front to back
    pub fn iter(&self) -> Iter<'_, T, P> {
        Iter::new(&self.alloc, self.head, self.len)
    }

    /// Iterate front to back with mutable access
    pub fn iter_mut(&mut self) -> IterMut<'_, T, P> {
        IterMut::new(&self.alloc, self.head, self.len)
    }

    fn releases_in_bulk() -> bool {
        <ListAlloc<T, P> as NodeAllocator<ListNode<T, P::Handle>>>::RELEASES_IN_BULK
    }
}

impl<T> GenericList<T, Pooled> {
    /// Iterate elements in pool storage order, which need not match list
    /// order
    pub fn pool_iter(&self) -> PoolValues<'_, T> {
        PoolValues::new(self.alloc.iter())
    }

    /// Occupancy of the node pool
    pub fn pool_stats(&self) -> PoolStats {
        self.alloc.stats()
    }
}

impl<T, P: NodeStrategy> Drop for GenericList<T, P> {
    fn drop(&mut self) {
        if Self::releases_in_bulk() {
            self.alloc.clear_pool();
        } else {
            self.clear();
        }
    }
}

impl<T, P: NodeStrategy> Default for GenericList<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, P: NodeStrategy> Clone for GenericList<T, P> {
    fn clone(&self) -> Self {
        let mut list = Self::build(self.config.clone());
        list.extend(self.iter().cloned());
        list
    }
}

impl<T: fmt::Debug, P: NodeStrategy> fmt::Debug for GenericList<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, P: NodeStrategy> PartialEq for GenericList<T, P> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq, P: NodeStrategy> Eq for GenericList<T, P> {}

impl<T, P: NodeStrategy> Extend<T> for GenericList<T, P> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T, P: NodeStrategy> FromIterator<T> for GenericList<T, P> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<T, P: NodeStrategy> IntoIterator for GenericList<T, P> {
    type Item = T;
    type IntoIter = IntoIter<T, P>;

    fn into_iter(self) -> IntoIter<T, P> {
        IntoIter::new(self)
    }
}

impl<'a, T, P: NodeStrategy> IntoIterator for &'a GenericList<T, P> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, P>;

    fn into_iter(self) -> Iter<'a, T, P> {
        self.iter()
    }
}

impl<'a, T, P: NodeStrategy> IntoIterator for &'a mut GenericList<T, P> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T, P>;

    fn into_iter(self) -> IterMut<'a, T, P> {
        self.iter_mut()
    }
}
