//! Iterators over the chained hash maps

use super::map::{MapAlloc, MapNode};
use crate::memory::{NodeAllocator, NodeStrategy, PoolIter, SlotIndex};
use std::iter::FusedIterator;
use std::marker::PhantomData;

/// Iterator over entries in bucket order
pub struct Iter<'a, K: 'a, V: 'a, P: NodeStrategy> {
    buckets: &'a [Option<P::Handle>],
    alloc: &'a MapAlloc<K, V, P>,
    next_bucket: usize,
    cur: Option<P::Handle>,
    remaining: usize,
}

impl<'a, K, V, P: NodeStrategy> Iter<'a, K, V, P> {
    pub(crate) fn new(
        buckets: &'a [Option<P::Handle>],
        alloc: &'a MapAlloc<K, V, P>,
        len: usize,
    ) -> Self {
        Self {
            buckets,
            alloc,
            next_bucket: 0,
            cur: None,
            remaining: len,
        }
    }
}

impl<K, V, P: NodeStrategy> Clone for Iter<'_, K, V, P> {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets,
            alloc: self.alloc,
            next_bucket: self.next_bucket,
            cur: self.cur,
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V, P: NodeStrategy> Iterator for Iter<'a, K, V, P> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(h) = self.cur {
                let alloc = self.alloc;
                // SAFETY: chained handles are live for as long as the map is
                // borrowed
                let node: &'a MapNode<K, V, P::Handle> = unsafe { alloc.node(h) };
                self.cur = node.next;
                self.remaining -= 1;
                return Some((&node.key, &node.value));
            }
            let head = *self.buckets.get(self.next_bucket)?;
            self.next_bucket += 1;
            self.cur = head;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, P: NodeStrategy> ExactSizeIterator for Iter<'_, K, V, P> {}
impl<K, V, P: NodeStrategy> FusedIterator for Iter<'_, K, V, P> {}

/// Iterator over entries with mutable values, in bucket order
pub struct IterMut<'a, K: 'a, V: 'a, P: NodeStrategy> {
    buckets: &'a [Option<P::Handle>],
    alloc: &'a MapAlloc<K, V, P>,
    next_bucket: usize,
    cur: Option<P::Handle>,
    remaining: usize,
    _marker: PhantomData<&'a mut V>,
}

impl<'a, K, V, P: NodeStrategy> IterMut<'a, K, V, P> {
    /// Callers must hold the map mutably borrowed for `'a`
    pub(crate) fn new(
        buckets: &'a [Option<P::Handle>],
        alloc: &'a MapAlloc<K, V, P>,
        len: usize,
    ) -> Self {
        Self {
            buckets,
            alloc,
            next_bucket: 0,
            cur: None,
            remaining: len,
            _marker: PhantomData,
        }
    }
}

impl<'a, K, V, P: NodeStrategy> Iterator for IterMut<'a, K, V, P> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(h) = self.cur {
                // SAFETY: the map is mutably borrowed for 'a and each chained
                // node is yielded exactly once, so the references never alias
                let node: &'a mut MapNode<K, V, P::Handle> =
                    unsafe { &mut *self.alloc.node_ptr(h).as_ptr() };
                self.cur = node.next;
                self.remaining -= 1;
                return Some((&node.key, &mut node.value));
            }
            let head = *self.buckets.get(self.next_bucket)?;
            self.next_bucket += 1;
            self.cur = head;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, P: NodeStrategy> ExactSizeIterator for IterMut<'_, K, V, P> {}
impl<K, V, P: NodeStrategy> FusedIterator for IterMut<'_, K, V, P> {}

/// Iterator over keys
pub struct Keys<'a, K: 'a, V: 'a, P: NodeStrategy> {
    inner: Iter<'a, K, V, P>,
}

impl<'a, K, V, P: NodeStrategy> Keys<'a, K, V, P> {
    pub(crate) fn new(inner: Iter<'a, K, V, P>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V, P: NodeStrategy> Iterator for Keys<'a, K, V, P> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, P: NodeStrategy> ExactSizeIterator for Keys<'_, K, V, P> {}

/// Iterator over values
pub struct Values<'a, K: 'a, V: 'a, P: NodeStrategy> {
    inner: Iter<'a, K, V, P>,
}

impl<'a, K, V, P: NodeStrategy> Values<'a, K, V, P> {
    pub(crate) fn new(inner: Iter<'a, K, V, P>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V, P: NodeStrategy> Iterator for Values<'a, K, V, P> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, P: NodeStrategy> ExactSizeIterator for Values<'_, K, V, P> {}

/// Iterator over mutable values
pub struct ValuesMut<'a, K: 'a, V: 'a, P: NodeStrategy> {
    inner: IterMut<'a, K, V, P>,
}

impl<'a, K, V, P: NodeStrategy> ValuesMut<'a, K, V, P> {
    pub(crate) fn new(inner: IterMut<'a, K, V, P>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V, P: NodeStrategy> Iterator for ValuesMut<'a, K, V, P> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, P: NodeStrategy> ExactSizeIterator for ValuesMut<'_, K, V, P> {}

/// Entries of a pooled map in pool storage order
pub struct PoolEntries<'a, K: 'a, V: 'a> {
    inner: PoolIter<'a, MapNode<K, V, SlotIndex>>,
}

impl<'a, K, V> PoolEntries<'a, K, V> {
    pub(crate) fn new(inner: PoolIter<'a, MapNode<K, V, SlotIndex>>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for PoolEntries<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| (&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for PoolEntries<'_, K, V> {}
