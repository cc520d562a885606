//! Separately chained hash map over a pluggable node allocator
//!
//! The bucket table is an array of optional chain heads. Each chain is a
//! singly linked list of nodes whose keys hash to that bucket. New nodes are
//! prepended, so the most recently inserted key of a bucket comes first.
//!
//! All node storage goes through the strategy's [`NodeAllocator`]; the map
//! only ever rewrites `next` links. Growing the table re-threads existing
//! nodes into the new bucket array without moving or reallocating them.

use super::config::{self, HashMapConfig, GROWTH_FACTOR, MIN_BUCKETS};
use super::iter::{Iter, IterMut, Keys, PoolEntries, Values, ValuesMut};
use crate::error::{check_bounds, NodePoolError, Result};
use crate::memory::{Basic, NodeAllocator, NodeStrategy, PoolStats, Pooled};
use ahash::RandomState;
use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FromIterator;
use std::mem;
use std::ops::Index;
use std::sync::atomic::{AtomicU64, Ordering};

/// Chain node: payload plus the link to the next node in the same bucket
pub(crate) struct MapNode<K, V, H> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) next: Option<H>,
}

/// Source of per-map identities stamped into cursors
static NEXT_MAP_ID: AtomicU64 = AtomicU64::new(1);

/// Allocator type a map with strategy `P` stores its nodes in
pub(crate) type MapAlloc<K, V, P> =
    <P as NodeStrategy>::Allocator<MapNode<K, V, <P as NodeStrategy>::Handle>>;

/// Position of an entry, returned by [`GenericHashMap::find`].
///
/// A cursor remembers which map it was taken from and that map's
/// structural generation. Rehashing, erasing and clearing start a new
/// generation; a cursor from an older generation is rejected with
/// [`NodePoolError::StaleCursor`], one from another map with
/// [`NodePoolError::ForeignCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor<H> {
    map_id: u64,
    bucket: usize,
    node: H,
    generation: u64,
}

impl<H> Cursor<H> {
    /// Bucket the entry was in when the cursor was taken
    pub fn bucket(&self) -> usize {
        self.bucket
    }

    /// Map generation the cursor belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Chained hash map generic over its node allocation strategy
///
/// Use the [`HashMap`] and [`PooledHashMap`] aliases rather than naming the
/// strategy directly.
pub struct GenericHashMap<K, V, P: NodeStrategy = Basic, S = RandomState> {
    id: u64,
    buckets: Box<[Option<P::Handle>]>,
    alloc: MapAlloc<K, V, P>,
    len: usize,
    realloc_limit: usize,
    generation: u64,
    hash_builder: S,
    config: HashMapConfig,
}

/// Hash map that allocates every node on the heap individually
pub type HashMap<K, V, S = RandomState> = GenericHashMap<K, V, Basic, S>;

/// Hash map that carves its nodes out of a block pool
pub type PooledHashMap<K, V, S = RandomState> = GenericHashMap<K, V, Pooled, S>;

impl<K, V, P: NodeStrategy> GenericHashMap<K, V, P, RandomState> {
    /// Create an empty map with default configuration
    pub fn new() -> Self {
        Self::build(HashMapConfig::default(), RandomState::new(), MIN_BUCKETS)
    }

    /// Create an empty map sized to hold `capacity` entries without growing
    pub fn with_capacity(capacity: usize) -> Self {
        let config = HashMapConfig::default();
        let buckets = config::buckets_for(capacity, config.max_load_factor);
        Self::build(config, RandomState::new(), buckets)
    }

    /// Create an empty map with a custom configuration
    pub fn with_config(config: HashMapConfig) -> Result<Self> {
        Self::with_config_and_hasher(config, RandomState::new())
    }
}

impl<K, V, P: NodeStrategy, S> GenericHashMap<K, V, P, S> {
    /// Create an empty map that hashes keys with `hash_builder`
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::build(HashMapConfig::default(), hash_builder, MIN_BUCKETS)
    }

    /// Create an empty map with a custom configuration and hasher
    pub fn with_config_and_hasher(config: HashMapConfig, hash_builder: S) -> Result<Self> {
        config.validate()?;
        let buckets = config.initial_buckets;
        Ok(Self::build(config, hash_builder, buckets))
    }

    fn build(config: HashMapConfig, hash_builder: S, buckets: usize) -> Self {
        let buckets = buckets.max(MIN_BUCKETS);
        Self {
            id: NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed),
            buckets: vec![None; buckets].into_boxed_slice(),
            alloc: P::allocator(&config.pool),
            len: 0,
            realloc_limit: config::reallocation_limit(buckets, config.max_load_factor),
            generation: 0,
            hash_builder,
            config,
        }
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets in the table
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of entries chained in bucket `bucket`
    pub fn bucket_size(&self, bucket: usize) -> Result<usize> {
        check_bounds(bucket, self.buckets.len())?;
        let mut count = 0;
        let mut cur = self.buckets[bucket];
        while let Some(h) = cur {
            count += 1;
            // SAFETY: handles linked into a chain are live
            cur = unsafe { self.alloc.node(h) }.next;
        }
        Ok(count)
    }

    /// Current entries per bucket
    pub fn load_factor(&self) -> f32 {
        self.len as f32 / self.buckets.len() as f32
    }

    /// Entries per bucket tolerated before the table grows
    pub fn max_load_factor(&self) -> f32 {
        self.config.max_load_factor
    }

    /// Entry count above which the next insert grows the table
    pub fn reallocation_limit(&self) -> usize {
        self.realloc_limit
    }

    /// Structural generation, bumped by rehash, erase and clear
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The map's hasher
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// The map's configuration
    pub fn config(&self) -> &HashMapConfig {
        &self.config
    }

    /// Iterate entries bucket by bucket, most recent first within a bucket
    pub fn iter(&self) -> Iter<'_, K, V, P> {
        Iter::new(&self.buckets, &self.alloc, self.len)
    }

    /// Iterate entries with mutable access to the values
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, P> {
        IterMut::new(&self.buckets, &self.alloc, self.len)
    }

    /// Iterate keys
    pub fn keys(&self) -> Keys<'_, K, V, P> {
        Keys::new(self.iter())
    }

    /// Iterate values
    pub fn values(&self) -> Values<'_, K, V, P> {
        Values::new(self.iter())
    }

    /// Iterate values mutably
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, P> {
        ValuesMut::new(self.iter_mut())
    }

    /// Remove every entry, keeping the bucket table at its current size.
    ///
    /// Pooled maps return the nodes to the free list, so the pool keeps its
    /// capacity.
    pub fn clear(&mut self) {
        self.release_all();
        self.generation += 1;
    }

    /// Remove every entry and give the node storage back in bulk.
    ///
    /// For pooled maps this discards the whole pool; for heap maps it is the
    /// same as [`clear`](Self::clear).
    pub fn reset(&mut self) {
        if Self::releases_in_bulk() {
            self.buckets.fill(None);
            self.alloc.clear_pool();
            self.len = 0;
        } else {
            self.release_all();
        }
        self.generation += 1;
    }

    /// Keep only the entries for which `keep` returns true
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut removed = 0;
        for bucket in 0..self.buckets.len() {
            let mut prev: Option<P::Handle> = None;
            let mut cur = self.buckets[bucket];
            while let Some(h) = cur {
                // SAFETY: handles linked into a chain are live
                let node = unsafe { self.alloc.node_mut(h) };
                let next = node.next;
                if keep(&node.key, &mut node.value) {
                    prev = Some(h);
                } else {
                    self.relink(bucket, prev, next);
                    // SAFETY: h was just unlinked and is released exactly once
                    drop(unsafe { self.alloc.release_node(h) });
                    removed += 1;
                }
                cur = next;
            }
        }
        if removed > 0 {
            self.len -= removed;
            self.generation += 1;
        }
    }

    /// Entry under `cursor`, or `None` if the cursor is stale or foreign
    pub fn cursor_entry(&self, cursor: &Cursor<P::Handle>) -> Option<(&K, &V)> {
        self.check_cursor(cursor).ok()?;
        self.predecessor_of(cursor.bucket, cursor.node)?;
        // SAFETY: the handle was found in this map's chain, so it is live
        let node = unsafe { self.alloc.node(cursor.node) };
        Some((&node.key, &node.value))
    }

    /// Remove the entry under `cursor`.
    ///
    /// The predecessor is found by scanning the cursor's bucket from its
    /// head, so this costs O(chain length).
    pub fn erase_at(&mut self, cursor: Cursor<P::Handle>) -> Result<(K, V)> {
        self.check_cursor(&cursor)?;
        let prev = self
            .predecessor_of(cursor.bucket, cursor.node)
            .ok_or_else(|| NodePoolError::not_found("cursor does not point into its bucket"))?;
        let node = self.unlink(cursor.bucket, prev, cursor.node);
        Ok((node.key, node.value))
    }

    fn check_cursor(&self, cursor: &Cursor<P::Handle>) -> Result<()> {
        if cursor.map_id != self.id {
            log::trace!("rejecting cursor of map {} on map {}", cursor.map_id, self.id);
            return Err(NodePoolError::foreign_cursor(cursor.map_id, self.id));
        }
        if cursor.generation != self.generation {
            log::trace!(
                "rejecting cursor from generation {} (map at {})",
                cursor.generation,
                self.generation
            );
            return Err(NodePoolError::stale_cursor(cursor.generation, self.generation));
        }
        check_bounds(cursor.bucket, self.buckets.len())
    }

    /// `Some(predecessor)` if `target` is chained in `bucket`
    fn predecessor_of(&self, bucket: usize, target: P::Handle) -> Option<Option<P::Handle>> {
        let mut prev = None;
        let mut cur = self.buckets[bucket];
        while let Some(h) = cur {
            if h == target {
                return Some(prev);
            }
            prev = Some(h);
            // SAFETY: handles linked into a chain are live
            cur = unsafe { self.alloc.node(h) }.next;
        }
        None
    }

    /// Point `prev` (or the bucket head) at `next`
    #[inline]
    fn relink(&mut self, bucket: usize, prev: Option<P::Handle>, next: Option<P::Handle>) {
        match prev {
            // SAFETY: prev is chained in this bucket, so it is live
            Some(p) => unsafe { self.alloc.node_mut(p).next = next },
            None => self.buckets[bucket] = next,
        }
    }

    fn unlink(
        &mut self,
        bucket: usize,
        prev: Option<P::Handle>,
        h: P::Handle,
    ) -> MapNode<K, V, P::Handle> {
        // SAFETY: h is chained in `bucket`
        let next = unsafe { self.alloc.node(h) }.next;
        self.relink(bucket, prev, next);
        self.len -= 1;
        self.generation += 1;
        // SAFETY: h is no longer reachable and is released exactly once
        unsafe { self.alloc.release_node(h) }
    }

    fn release_all(&mut self) {
        for bucket in self.buckets.iter_mut() {
            let mut cur = bucket.take();
            while let Some(h) = cur {
                // SAFETY: every chained handle is live and appears in exactly
                // one chain; the bucket head was taken so it is not revisited
                let node = unsafe { self.alloc.release_node(h) };
                cur = node.next;
            }
        }
        self.len = 0;
    }

    fn releases_in_bulk() -> bool {
        <MapAlloc<K, V, P> as NodeAllocator<MapNode<K, V, P::Handle>>>::RELEASES_IN_BULK
    }
}

impl<K, V, P, S> GenericHashMap<K, V, P, S>
where
    K: Hash + Eq,
    P: NodeStrategy,
    S: BuildHasher,
{
    #[inline]
    fn index_for<Q: Hash + ?Sized>(hash_builder: &S, key: &Q, buckets: usize) -> usize {
        (hash_builder.hash_one(key) % buckets as u64) as usize
    }

    /// Bucket that `key` hashes to in the current table
    #[inline]
    pub fn bucket_of<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Self::index_for(&self.hash_builder, key, self.buckets.len())
    }

    /// Find `key` in `bucket`, returning its predecessor and handle
    fn locate<Q>(&self, bucket: usize, key: &Q) -> Option<(Option<P::Handle>, P::Handle)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut prev = None;
        let mut cur = self.buckets[bucket];
        while let Some(h) = cur {
            // SAFETY: handles linked into a chain are live
            let node = unsafe { self.alloc.node(h) };
            if <K as Borrow<Q>>::borrow(&node.key) == key {
                return Some((prev, h));
            }
            prev = Some(h);
            cur = node.next;
        }
        None
    }

    fn find_handle<Q>(&self, key: &Q) -> Option<P::Handle>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let bucket = self.bucket_of(key);
        self.locate(bucket, key).map(|(_, h)| h)
    }

    /// Prepend a node for a key known to be absent, growing afterwards if
    /// the entry count passed the reallocation limit
    fn insert_new(&mut self, bucket: usize, key: K, value: V) -> P::Handle {
        let next = self.buckets[bucket];
        let h = self.alloc.allocate_node(MapNode { key, value, next });
        self.buckets[bucket] = Some(h);
        self.len += 1;
        if self.len > self.realloc_limit {
            self.grow_for_len();
        }
        h
    }

    fn grow_for_len(&mut self) {
        let target = (self.len as f64 * GROWTH_FACTOR / self.config.max_load_factor as f64).ceil();
        self.grow_hash_table(target as usize);
    }

    /// Re-thread every node into a fresh table of `requested` buckets
    fn grow_hash_table(&mut self, requested: usize) {
        let new_count = requested.max(MIN_BUCKETS);
        let mut table: Box<[Option<P::Handle>]> = vec![None; new_count].into_boxed_slice();
        for bucket in self.buckets.iter_mut() {
            let mut cur = bucket.take();
            while let Some(h) = cur {
                // SAFETY: handles linked into a chain are live
                let node = unsafe { self.alloc.node_mut(h) };
                cur = node.next;
                let idx = Self::index_for(&self.hash_builder, &node.key, new_count);
                node.next = table[idx];
                table[idx] = Some(h);
            }
        }
        let old = mem::replace(&mut self.buckets, table);
        self.realloc_limit = config::reallocation_limit(new_count, self.config.max_load_factor);
        self.generation += 1;
        log::debug!(
            "hash table rehashed from {} to {} buckets ({} entries, limit {})",
            old.len(),
            new_count,
            self.len,
            self.realloc_limit
        );
    }

    /// Insert a key-value pair, returning the previous value for the key.
    ///
    /// Overwriting keeps the existing node, so cursors to it stay valid.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let bucket = self.bucket_of(&key);
        if let Some((_, h)) = self.locate(bucket, &key) {
            // SAFETY: h was found in a chain
            let node = unsafe { self.alloc.node_mut(h) };
            return Some(mem::replace(&mut node.value, value));
        }
        self.insert_new(bucket, key, value);
        None
    }

    /// Get reference to value by key
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Get the stored key and value
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let h = self.find_handle(key)?;
        // SAFETY: h was found in a chain
        let node = unsafe { self.alloc.node(h) };
        Some((&node.key, &node.value))
    }

    /// Get mutable reference to value by key
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let h = self.find_handle(key)?;
        // SAFETY: h was found in a chain
        Some(unsafe { &mut self.alloc.node_mut(h).value })
    }

    /// Required lookup: fails with `NotFound` when `key` is absent
    pub fn at<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key)
            .ok_or_else(|| NodePoolError::not_found("key not present in map"))
    }

    /// Mutable required lookup
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_mut(key)
            .ok_or_else(|| NodePoolError::not_found("key not present in map"))
    }

    /// Value for `key`, inserting `make()` first if the key is absent
    pub fn get_or_insert_with<F>(&mut self, key: K, make: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let bucket = self.bucket_of(&key);
        let h = match self.locate(bucket, &key) {
            Some((_, h)) => h,
            None => self.insert_new(bucket, key, make()),
        };
        // SAFETY: h is live, either found or just inserted; growth does not
        // move nodes
        unsafe { &mut self.alloc.node_mut(h).value }
    }

    /// Value for `key`, inserting `V::default()` first if the key is absent
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Check if map contains key
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_handle(key).is_some()
    }

    /// Number of entries with this key: 0 or 1
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        usize::from(self.contains_key(key))
    }

    /// Cursor to the entry for `key`
    pub fn find<Q>(&self, key: &Q) -> Option<Cursor<P::Handle>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let bucket = self.bucket_of(key);
        let (_, node) = self.locate(bucket, key)?;
        Some(Cursor {
            map_id: self.id,
            bucket,
            node,
            generation: self.generation,
        })
    }

    /// Remove key, returning its value if it was present
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Remove key, returning the stored key and value
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let bucket = self.bucket_of(key);
        let (prev, h) = self.locate(bucket, key)?;
        let node = self.unlink(bucket, prev, h);
        Some((node.key, node.value))
    }

    /// Resize the table to `buckets` buckets.
    ///
    /// The request is raised to the minimum table size and to whatever the
    /// current entry count needs under the max load factor.
    pub fn rehash(&mut self, buckets: usize) {
        let floor = config::buckets_for(self.len, self.config.max_load_factor);
        let target = buckets.max(floor).max(MIN_BUCKETS);
        if target != self.buckets.len() {
            self.grow_hash_table(target);
        }
    }

    /// Make room for at least `entries` entries in total without growing
    pub fn reserve(&mut self, entries: usize) {
        let target = config::buckets_for(entries, self.config.max_load_factor);
        if target > self.buckets.len() {
            self.grow_hash_table(target);
        }
    }

    /// Change the max load factor, growing at once if the map is now over it
    pub fn set_max_load_factor(&mut self, factor: f32) -> Result<()> {
        config::validate_load_factor(factor)?;
        self.config.max_load_factor = factor;
        self.realloc_limit = config::reallocation_limit(self.buckets.len(), factor);
        if self.len > self.realloc_limit {
            self.grow_for_len();
        }
        Ok(())
    }
}

impl<K, V, S> GenericHashMap<K, V, Pooled, S> {
    /// Iterate entries in pool storage order.
    ///
    /// Walks the node pool directly instead of the bucket chains, which
    /// reads memory sequentially. The order has no relation to keys or
    /// buckets.
    pub fn pool_iter(&self) -> PoolEntries<'_, K, V> {
        PoolEntries::new(self.alloc.iter())
    }

    /// Occupancy of the node pool
    pub fn pool_stats(&self) -> PoolStats {
        self.alloc.stats()
    }
}

impl<K, V, P: NodeStrategy, S> Drop for GenericHashMap<K, V, P, S> {
    fn drop(&mut self) {
        if Self::releases_in_bulk() {
            self.alloc.clear_pool();
        } else {
            self.release_all();
        }
    }
}

impl<K, V, P: NodeStrategy, S: Default> Default for GenericHashMap<K, V, P, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, P, S> Clone for GenericHashMap<K, V, P, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    P: NodeStrategy,
    S: BuildHasher + Clone,
{
    /// Deep copy: every entry is rehashed into a table sized for the
    /// current entry count
    fn clone(&self) -> Self {
        let buckets = config::buckets_for(self.len, self.config.max_load_factor);
        let mut map = Self::build(self.config.clone(), self.hash_builder.clone(), buckets);
        for (key, value) in self.iter() {
            let bucket = map.bucket_of(key);
            map.insert_new(bucket, key.clone(), value.clone());
        }
        map
    }
}

impl<K, V, P, S> fmt::Debug for GenericHashMap<K, V, P, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
    P: NodeStrategy,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, P, S> PartialEq for GenericHashMap<K, V, P, S>
where
    K: Hash + Eq,
    V: PartialEq,
    P: NodeStrategy,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self
                .iter()
                .all(|(k, v)| other.get(k).map_or(false, |ov| v == ov))
    }
}

impl<K, V, P, S> Eq for GenericHashMap<K, V, P, S>
where
    K: Hash + Eq,
    V: Eq,
    P: NodeStrategy,
    S: BuildHasher,
{
}

impl<K, Q, V, P, S> Index<&Q> for GenericHashMap<K, V, P, S>
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    P: NodeStrategy,
    S: BuildHasher,
{
    type Output = V;

    /// Panics if the key is absent; use [`GenericHashMap::at`] for a
    /// fallible lookup
    fn index(&self, key: &Q) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not found in map"),
        }
    }
}

impl<K, V, P, S> Extend<(K, V)> for GenericHashMap<K, V, P, S>
where
    K: Hash + Eq,
    P: NodeStrategy,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, P, S> FromIterator<(K, V)> for GenericHashMap<K, V, P, S>
where
    K: Hash + Eq,
    P: NodeStrategy,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<'a, K, V, P: NodeStrategy, S> IntoIterator for &'a GenericHashMap<K, V, P, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, P: NodeStrategy, S> IntoIterator for &'a mut GenericHashMap<K, V, P, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_map::{DEFAULT_MAX_LOAD_FACTOR, MIN_LOAD_FACTOR};
    use std::rc::Rc;

    fn check_basic_ops<P: NodeStrategy>() {
        let mut map = GenericHashMap::<String, i32, P>::new();
        assert_eq!(map.insert("key".to_string(), 1), None);
        assert_eq!(map.insert("key".to_string(), 2), Some(1));
        assert_eq!(map.get("key"), Some(&2));
        assert_eq!(map.len(), 1);

        assert_eq!(map.remove("key"), Some(2));
        assert_eq!(map.get("key"), None);
        assert_eq!(map.remove("key"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_basic_ops_heap() {
        check_basic_ops::<Basic>();
    }

    #[test]
    fn test_basic_ops_pooled() {
        check_basic_ops::<Pooled>();
    }

    #[test]
    fn test_new_map_shape() {
        let map = HashMap::<u32, u32>::new();
        assert_eq!(map.bucket_count(), MIN_BUCKETS);
        assert_eq!(map.reallocation_limit(), 8);
        assert_eq!(map.max_load_factor(), 1.0);
        assert_eq!(map.load_factor(), 0.0);
    }

    #[test]
    fn test_growth_happens_after_limit() {
        let mut map = PooledHashMap::<u32, u32>::new();
        for i in 0..8 {
            map.insert(i, i);
        }
        assert_eq!(map.bucket_count(), 8);

        map.insert(8, 8);
        // ceil(9 * 1.5 / 1.0)
        assert_eq!(map.bucket_count(), 14);
        assert_eq!(map.reallocation_limit(), 14);
        for i in 0..9 {
            assert_eq!(map.get(&i), Some(&i));
        }
    }

    #[test]
    fn test_load_factor_never_exceeds_max_after_insert() {
        let mut map = HashMap::<u64, u64>::new();
        for i in 0..5_000 {
            map.insert(i, i);
            assert!(map.len() <= map.reallocation_limit());
            assert!(map.load_factor() <= map.max_load_factor());
        }
    }

    #[test]
    fn test_chain_order_most_recent_first() {
        let mut map = HashMap::<u32, &str>::new();
        map.reserve(16);
        map.insert(1, "a");
        let bucket = map.bucket_of(&1);
        let colliding: Vec<u32> = (2..100_000u32)
            .filter(|k| map.bucket_of(k) == bucket)
            .take(2)
            .collect();
        map.insert(colliding[0], "b");
        map.insert(colliding[1], "c");
        assert_eq!(map.bucket_size(bucket).unwrap(), 3);

        let order: Vec<u32> = map
            .iter()
            .filter(|(k, _)| map.bucket_of(*k) == bucket)
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(order, vec![colliding[1], colliding[0], 1]);
    }

    #[test]
    fn test_overwrite_keeps_cursor_valid() {
        let mut map = PooledHashMap::<u32, String>::new();
        map.insert(7, "seven".to_string());
        let cursor = map.find(&7).unwrap();
        map.insert(7, "SEVEN".to_string());
        assert_eq!(
            map.cursor_entry(&cursor),
            Some((&7, &"SEVEN".to_string()))
        );
    }

    #[test]
    fn test_erase_at_and_stale_cursor() {
        let mut map = HashMap::<u32, u32>::new();
        for i in 0..5 {
            map.insert(i, i * 10);
        }
        let cursor = map.find(&3).unwrap();
        let other = map.find(&4).unwrap();
        assert_eq!(map.erase_at(cursor).unwrap(), (3, 30));
        assert_eq!(map.len(), 4);
        assert!(!map.contains_key(&3));

        // Erasing started a new generation
        let err = map.erase_at(other).unwrap_err();
        assert_eq!(err, NodePoolError::stale_cursor(0, 1));
        assert!(map.contains_key(&4));
        assert!(map.cursor_entry(&other).is_none());
    }

    #[test]
    fn test_cursor_stale_after_rehash() {
        let mut map = PooledHashMap::<u32, u32>::new();
        map.insert(1, 1);
        let cursor = map.find(&1).unwrap();
        map.rehash(64);
        assert!(matches!(
            map.erase_at(cursor),
            Err(NodePoolError::StaleCursor { .. })
        ));
        let fresh = map.find(&1).unwrap();
        assert_ne!(fresh, cursor);
        assert_eq!(map.erase_at(fresh).unwrap(), (1, 1));
    }

    #[test]
    fn test_foreign_cursor_rejected() {
        let mut a = HashMap::<u32, u32>::new();
        let mut b = HashMap::<u32, u32>::new();
        a.insert(1, 1);
        b.insert(1, 1);
        let cursor = a.find(&1).unwrap();
        assert!(b.cursor_entry(&cursor).is_none());
        assert!(b.erase_at(cursor).is_err());
        assert_eq!(b.len(), 1);
    }

    /// Sends every key to bucket zero
    #[derive(Default, Clone)]
    struct SingleBucket;

    impl BuildHasher for SingleBucket {
        type Hasher = SingleBucketHasher;

        fn build_hasher(&self) -> SingleBucketHasher {
            SingleBucketHasher
        }
    }

    struct SingleBucketHasher;

    impl std::hash::Hasher for SingleBucketHasher {
        fn finish(&self) -> u64 {
            0
        }

        fn write(&mut self, _bytes: &[u8]) {}
    }

    #[test]
    fn test_foreign_cursor_rejected_pooled() {
        // Both maps put their first node in pool slot 0 of bucket 0, so only
        // the map identity tells the cursors apart
        let mut a: PooledHashMap<u32, &str, SingleBucket> = PooledHashMap::with_hasher(SingleBucket);
        let mut b: PooledHashMap<u32, &str, SingleBucket> = PooledHashMap::with_hasher(SingleBucket);
        a.insert(1, "a-one");
        b.insert(2, "b-two");
        let cursor = a.find(&1).unwrap();

        assert_eq!(b.cursor_entry(&cursor), None);
        let err = b.erase_at(cursor).unwrap_err();
        assert!(matches!(err, NodePoolError::ForeignCursor { .. }));
        assert!(!err.is_recoverable());
        assert_eq!(b.len(), 1);
        assert_eq!(b.get(&2), Some(&"b-two"));

        // Same position in two maps never compares equal
        let other = b.find(&2).unwrap();
        assert_eq!(cursor.bucket(), other.bucket());
        assert_ne!(cursor, other);

        assert_eq!(a.cursor_entry(&cursor), Some((&1, &"a-one")));
        assert_eq!(a.erase_at(cursor), Ok((1, "a-one")));
    }

    #[test]
    fn test_clone_does_not_accept_source_cursors() {
        let mut a = PooledHashMap::<u32, u32>::new();
        a.insert(5, 50);
        let cursor = a.find(&5).unwrap();
        let mut copy = a.clone();
        assert!(copy.cursor_entry(&cursor).is_none());
        assert!(copy.erase_at(cursor).is_err());
        assert_eq!(copy.len(), 1);
    }

    #[test]
    fn test_at_reports_missing_key() {
        let mut map = HashMap::<&str, i32>::new();
        map.insert("present", 1);
        assert_eq!(map.at("present"), Ok(&1));
        let err = map.at("absent").unwrap_err();
        assert_eq!(err.category(), "lookup");
        *map.at_mut("present").unwrap() += 1;
        assert_eq!(map["present"], 2);
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn test_index_panics_on_missing_key() {
        let map = HashMap::<u32, u32>::new();
        let _ = map[&1];
    }

    #[test]
    fn test_count_and_contains() {
        let mut map = PooledHashMap::<u32, ()>::new();
        map.insert(5, ());
        assert_eq!(map.count(&5), 1);
        assert_eq!(map.count(&6), 0);
        assert!(map.contains_key(&5));
        assert!(!map.contains_key(&6));
    }

    #[test]
    fn test_entry_or_default_counts_words() {
        let mut map = PooledHashMap::<&str, usize>::new();
        for word in "a b a c b a".split(' ') {
            *map.entry_or_default(word) += 1;
        }
        assert_eq!(map["a"], 3);
        assert_eq!(map["b"], 2);
        assert_eq!(map["c"], 1);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_get_or_insert_with_survives_growth() {
        let mut map = HashMap::<u32, u32>::new();
        for i in 0..8 {
            map.insert(i, i);
        }
        let value = map.get_or_insert_with(100, || 42);
        *value += 1;
        assert_eq!(map.get(&100), Some(&43));
        assert!(map.bucket_count() > MIN_BUCKETS);
    }

    #[test]
    fn test_clear_keeps_table_shape() {
        let mut map = PooledHashMap::<u32, u32>::new();
        for i in 0..100 {
            map.insert(i, i);
        }
        let buckets = map.bucket_count();
        let capacity = map.pool_stats().capacity;
        let generation = map.generation();

        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.bucket_count(), buckets);
        assert_eq!(map.pool_stats().capacity, capacity);
        assert_eq!(map.pool_stats().live, 0);
        assert!(map.generation() > generation);
        assert_eq!(map.iter().count(), 0);
    }

    #[test]
    fn test_reset_discards_pool() {
        let mut map = PooledHashMap::<u32, u32>::new();
        for i in 0..100 {
            map.insert(i, i);
        }
        map.reset();
        assert!(map.is_empty());
        assert_eq!(map.pool_stats().capacity, 0);

        map.insert(1, 1);
        assert_eq!(map.get(&1), Some(&1));
    }

    #[test]
    fn test_reset_heap_map() {
        let mut map = HashMap::<String, String>::new();
        map.insert("k".into(), "v".into());
        map.reset();
        assert!(map.is_empty());
        assert!(map.get("k").is_none());
    }

    #[test]
    fn test_rehash_and_reserve() {
        let mut map = HashMap::<u32, u32>::new();
        for i in 0..20 {
            map.insert(i, i);
        }
        map.rehash(100);
        assert_eq!(map.bucket_count(), 100);
        assert_eq!(map.len(), 20);

        // Too small for the entries: raised to what they need
        map.rehash(1);
        assert_eq!(map.bucket_count(), 20);

        map.reserve(1000);
        assert_eq!(map.bucket_count(), 1000);
        let buckets = map.bucket_count();
        map.reserve(10);
        assert_eq!(map.bucket_count(), buckets);
        for i in 0..20 {
            assert_eq!(map.get(&i), Some(&i));
        }
    }

    #[test]
    fn test_set_max_load_factor() {
        let mut map = PooledHashMap::<u32, u32>::new();
        for i in 0..8 {
            map.insert(i, i);
        }
        assert_eq!(map.bucket_count(), 8);

        map.set_max_load_factor(0.5).unwrap();
        assert!(map.len() <= map.reallocation_limit());
        assert!(map.bucket_count() >= 16);

        assert!(map.set_max_load_factor(0.0).is_err());
        assert!(map.set_max_load_factor(f32::NAN).is_err());
        assert_eq!(map.max_load_factor(), 0.5);
        for i in 0..8 {
            assert_eq!(map.get(&i), Some(&i));
        }
    }

    #[test]
    fn test_tiny_load_factor_rejected() {
        let mut map = HashMap::<u32, u32>::new();
        map.insert(1, 1);
        let err = map.set_max_load_factor(1e-30).unwrap_err();
        assert_eq!(err.category(), "config");
        assert_eq!(map.max_load_factor(), DEFAULT_MAX_LOAD_FACTOR);
        // Further inserts still grow sanely
        for i in 2..100 {
            map.insert(i, i);
        }
        assert!(map.bucket_count() < 1000);

        map.set_max_load_factor(MIN_LOAD_FACTOR).unwrap();
        assert!(map.bucket_count() >= 99 * 100);
        assert_eq!(map.len(), 99);
    }

    #[test]
    fn test_with_config_validation() {
        let bad = HashMapConfig {
            max_load_factor: -1.0,
            ..Default::default()
        };
        assert!(HashMap::<u32, u32>::with_config(bad).is_err());

        let map = PooledHashMap::<u32, u32>::with_config(HashMapConfig::large()).unwrap();
        assert_eq!(map.bucket_count(), 1024);
    }

    #[test]
    fn test_bucket_size_bounds() {
        let map = HashMap::<u32, u32>::new();
        assert_eq!(map.bucket_size(0), Ok(0));
        assert_eq!(
            map.bucket_size(8),
            Err(NodePoolError::out_of_bounds(8, 8))
        );
    }

    #[test]
    fn test_bucket_sizes_sum_to_len() {
        let mut map = PooledHashMap::<u32, u32>::new();
        for i in 0..500 {
            map.insert(i, i);
        }
        let total: usize = (0..map.bucket_count())
            .map(|b| map.bucket_size(b).unwrap())
            .sum();
        assert_eq!(total, 500);
        for i in 0..500u32 {
            let bucket = map.bucket_of(&i);
            assert_eq!(map.find(&i).unwrap().bucket(), bucket);
        }
    }

    #[test]
    fn test_retain() {
        let mut map: PooledHashMap<u32, u32> = (0..100).map(|i| (i, i)).collect();
        map.retain(|k, v| {
            *v += 1;
            k % 2 == 0
        });
        assert_eq!(map.len(), 50);
        assert_eq!(map.get(&4), Some(&5));
        assert!(map.get(&5).is_none());
        assert_eq!(map.pool_stats().live, 50);
    }

    #[test]
    fn test_iter_mut_and_values_mut() {
        let mut map: HashMap<u32, u32> = (0..10).map(|i| (i, i)).collect();
        for (_, v) in map.iter_mut() {
            *v *= 2;
        }
        for v in map.values_mut() {
            *v += 1;
        }
        let mut values: Vec<u32> = map.values().copied().collect();
        values.sort_unstable();
        assert_eq!(values, (0..10).map(|i| i * 2 + 1).collect::<Vec<_>>());

        let mut keys: Vec<u32> = map.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..10).collect::<Vec<_>>());
        assert_eq!(map.iter().len(), 10);
    }

    #[test]
    fn test_pool_iter_matches_chain_iter() {
        let mut map = PooledHashMap::<u32, u32>::new();
        for i in 0..200 {
            map.insert(i, i + 1);
        }
        for i in (0..200).step_by(3) {
            map.remove(&i);
        }
        let mut chained: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
        let mut pooled: Vec<_> = map.pool_iter().map(|(k, v)| (*k, *v)).collect();
        chained.sort_unstable();
        pooled.sort_unstable();
        assert_eq!(chained, pooled);
        assert_eq!(map.pool_iter().len(), map.len());
    }

    #[test]
    fn test_pool_iter_follows_slot_order() {
        let mut map = PooledHashMap::<u32, u32>::new();
        for i in 0..50 {
            map.insert(i, i);
        }
        let keys: Vec<u32> = map.pool_iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_removed_slot_is_recycled() {
        let mut map = PooledHashMap::<u32, u32>::new();
        for i in 0..10 {
            map.insert(i, i);
        }
        let capacity = map.pool_stats().capacity;
        map.remove(&3);
        assert_eq!(map.pool_stats().free, capacity - 9);
        map.insert(99, 99);
        assert_eq!(map.pool_stats().capacity, capacity);
        assert_eq!(map.pool_stats().live, 10);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut map = HashMap::<String, Vec<u32>>::new();
        map.insert("a".into(), vec![1, 2]);
        map.insert("b".into(), vec![3]);
        let mut copy = map.clone();
        assert_eq!(copy, map);

        copy.get_mut("a").unwrap().push(9);
        copy.remove("b");
        assert_eq!(map.get("a"), Some(&vec![1, 2]));
        assert_eq!(map.get("b"), Some(&vec![3]));
        assert_ne!(copy, map);
    }

    #[test]
    fn test_clone_sizes_table_for_entries() {
        let mut map = PooledHashMap::<u32, u32>::new();
        map.reserve(10_000);
        for i in 0..10 {
            map.insert(i, i);
        }
        let copy = map.clone();
        assert_eq!(copy.bucket_count(), MIN_BUCKETS.max(10));
        assert_eq!(copy, map);
    }

    #[test]
    fn test_drop_releases_every_value() {
        let marker = Rc::new(());
        {
            let mut heap = HashMap::<u32, Rc<()>>::new();
            let mut pooled = PooledHashMap::<u32, Rc<()>>::new();
            for i in 0..100 {
                heap.insert(i, Rc::clone(&marker));
                pooled.insert(i, Rc::clone(&marker));
            }
            heap.remove(&0);
            pooled.remove(&0);
            assert_eq!(Rc::strong_count(&marker), 199);
        }
        assert_eq!(Rc::strong_count(&marker), 1);
    }

    #[test]
    fn test_debug_output() {
        let mut map = HashMap::<u32, &str>::new();
        map.insert(1, "one");
        assert_eq!(format!("{:?}", map), r#"{1: "one"}"#);
    }

    #[test]
    fn test_custom_hasher() {
        use std::collections::hash_map::RandomState as StdState;
        let mut map = GenericHashMap::<u32, u32, Pooled, StdState>::with_hasher(StdState::new());
        map.extend((0..100).map(|i| (i, i * i)));
        assert_eq!(map.get(&9), Some(&81));
        assert_eq!(map.len(), 100);
    }

    #[test]
    fn test_large_dataset() {
        let mut map = PooledHashMap::<u64, u64>::new();
        for i in 0..10_000 {
            map.insert(i, i);
        }
        assert_eq!(map.len(), 10_000);
        for i in 0..10_000 {
            assert_eq!(map.get(&i), Some(&i));
        }
        for i in 0..5_000 {
            assert_eq!(map.remove(&i), Some(i));
        }
        assert_eq!(map.len(), 5_000);
        assert_eq!(map.pool_stats().live, 5_000);
    }
}
