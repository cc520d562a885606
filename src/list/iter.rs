//! Iterators over the linked lists

use super::singly::{GenericList, ListAlloc, ListNode};
use crate::memory::{NodeAllocator, NodeStrategy, PoolIter, SlotIndex};
use std::iter::FusedIterator;
use std::marker::PhantomData;

/// Iterator over list elements, front to back
pub struct Iter<'a, T: 'a, P: NodeStrategy> {
    alloc: &'a ListAlloc<T, P>,
    cur: Option<P::Handle>,
    remaining: usize,
}

impl<'a, T, P: NodeStrategy> Iter<'a, T, P> {
    pub(crate) fn new(alloc: &'a ListAlloc<T, P>, head: Option<P::Handle>, len: usize) -> Self {
        Self {
            alloc,
            cur: head,
            remaining: len,
        }
    }
}

impl<T, P: NodeStrategy> Clone for Iter<'_, T, P> {
    fn clone(&self) -> Self {
        Self {
            alloc: self.alloc,
            cur: self.cur,
            remaining: self.remaining,
        }
    }
}

impl<'a, T, P: NodeStrategy> Iterator for Iter<'a, T, P> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let h = self.cur?;
        let alloc = self.alloc;
        // SAFETY: linked handles stay live while the list is borrowed
        let node: &'a ListNode<T, P::Handle> = unsafe { alloc.node(h) };
        self.cur = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, P: NodeStrategy> ExactSizeIterator for Iter<'_, T, P> {}
impl<T, P: NodeStrategy> FusedIterator for Iter<'_, T, P> {}

/// Iterator over mutable list elements, front to back
pub struct IterMut<'a, T: 'a, P: NodeStrategy> {
    alloc: &'a ListAlloc<T, P>,
    cur: Option<P::Handle>,
    remaining: usize,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T, P: NodeStrategy> IterMut<'a, T, P> {
    /// Callers must hold the list mutably borrowed for `'a`
    pub(crate) fn new(alloc: &'a ListAlloc<T, P>, head: Option<P::Handle>, len: usize) -> Self {
        Self {
            alloc,
            cur: head,
            remaining: len,
            _marker: PhantomData,
        }
    }
}

impl<'a, T, P: NodeStrategy> Iterator for IterMut<'a, T, P> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        let h = self.cur?;
        // SAFETY: the list is mutably borrowed for 'a and every node is
        // yielded once, so the references never alias
        let node: &'a mut ListNode<T, P::Handle> = unsafe { &mut *self.alloc.node_ptr(h).as_ptr() };
        self.cur = node.next;
        self.remaining -= 1;
        Some(&mut node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, P: NodeStrategy> ExactSizeIterator for IterMut<'_, T, P> {}
impl<T, P: NodeStrategy> FusedIterator for IterMut<'_, T, P> {}

/// Owning iterator, popping from the front
pub struct IntoIter<T, P: NodeStrategy> {
    list: GenericList<T, P>,
}

impl<T, P: NodeStrategy> IntoIter<T, P> {
    pub(crate) fn new(list: GenericList<T, P>) -> Self {
        Self { list }
    }
}

impl<T, P: NodeStrategy> Iterator for IntoIter<T, P> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.list.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len(), Some(self.list.len()))
    }
}

impl<T, P: NodeStrategy> ExactSizeIterator for IntoIter<T, P> {}
impl<T, P: NodeStrategy> FusedIterator for IntoIter<T, P> {}

/// Elements of a pooled list in pool storage order
pub struct PoolValues<'a, T: 'a> {
    inner: PoolIter<'a, ListNode<T, SlotIndex>>,
}

impl<'a, T> PoolValues<'a, T> {
    pub(crate) fn new(inner: PoolIter<'a, ListNode<T, SlotIndex>>) -> Self {
        Self { inner }
    }
}

impl<'a, T> Iterator for PoolValues<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.inner.next().map(|node| &node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for PoolValues<'_, T> {}
