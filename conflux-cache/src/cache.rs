//! The LRU cache over a concurrent index and the recency list.

use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::trace;

use crate::error::CacheError;
use crate::list::{NodeRef, RecencyList};

/// A bounded LRU cache with compute-on-miss.
///
/// The index is a concurrent map from key to node; the recency list orders
/// the same nodes from most- to least-recently used under a single list
/// lock. When an insert pushes the size past capacity, the entry before the
/// tail sentinel is evicted.
///
/// Lock discipline: the list lock may be held while touching the index
/// (eviction removes the victim's key), never the other way around. Index
/// guards are dropped before the list lock is taken, so the two cannot
/// deadlock.
pub struct Cache<K, V> {
    capacity: usize,
    compute: Box<dyn Fn(&K) -> Option<V> + Send + Sync>,
    index: DashMap<K, NodeRef>,
    list: Mutex<RecencyList<K, V>>,
    len: AtomicUsize,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache bounded at `capacity` entries.
    ///
    /// The compute function runs on every miss; returning `None` means "do
    /// not cache" and the miss is passed through.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidCapacity`] when `capacity` is zero.
    pub fn new<F>(capacity: usize, compute: F) -> Result<Self, CacheError>
    where
        F: Fn(&K) -> Option<V> + Send + Sync + 'static,
    {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity);
        }
        Ok(Self {
            capacity,
            compute: Box::new(compute),
            index: DashMap::new(),
            list: Mutex::new(RecencyList::new()),
            len: AtomicUsize::new(0),
        })
    }

    /// Returns the value for `key`, computing it on a miss.
    ///
    /// A hit promotes the entry to most-recent. On a miss the computed value
    /// is cached (possibly evicting the least-recent entry) unless the
    /// compute function declines with `None`. A panicking compute function
    /// propagates unchanged and caches nothing.
    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(hit) = self.lookup_and_promote(key) {
            return Some(hit);
        }

        let value = (self.compute)(key)?;
        self.insert(key.clone(), value.clone());
        Some(value)
    }

    /// Inserts or updates `key`, returning the previous value on update.
    ///
    /// Updates replace the value in place and promote the entry; inserts may
    /// evict the least-recent entry.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let node = self.index.get(&key).map(|entry| *entry.value());
        if let Some(node) = node {
            let mut list = self.list.lock();
            if list.is_live(node) {
                let previous = list.replace_value(node.slot, value);
                list.move_to_front(node.slot);
                return Some(previous);
            }
            // The entry was evicted between the lookup and the lock; insert
            // fresh below.
        }

        self.insert(key, value);
        None
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut list = self.list.lock();
        self.index.clear();
        list.clear();
        self.len.store(0, Ordering::Relaxed);
    }

    /// Looks the key up through the index, validates the node under the list
    /// lock, promotes it, and clones the value out.
    fn lookup_and_promote(&self, key: &K) -> Option<V> {
        // Copy the ref out so the index guard is gone before the list lock.
        let node = *self.index.get(key)?;

        let mut list = self.list.lock();
        if !list.is_live(node) {
            // Evicted while we were between the index and the lock.
            return None;
        }
        list.move_to_front(node.slot);
        Some(list.value(node.slot).clone())
    }

    /// Publishes a new entry: allocate a detached node, claim the key in the
    /// index, then splice and (if needed) evict under the list lock.
    fn insert(&self, key: K, value: V) {
        let node = {
            let mut list = self.list.lock();
            list.alloc(key.clone(), value)
        };

        let raced = match self.index.entry(key) {
            Entry::Occupied(occupied) => Some(*occupied.get()),
            Entry::Vacant(vacant) => {
                vacant.insert(node);
                None
            },
        };

        let mut list = self.list.lock();
        match raced {
            Some(existing) => {
                // Another thread published this key first: recycle our node
                // and treat the insert as a touch of theirs.
                list.retire(node.slot);
                if list.is_live(existing) {
                    list.move_to_front(existing.slot);
                }
            },
            None => {
                list.link_front(node.slot);
                let len = self.len.fetch_add(1, Ordering::Relaxed) + 1;
                if len > self.capacity {
                    self.evict_lru(&mut list);
                }
            },
        }
    }

    /// Unlinks the entry before the tail sentinel and removes its key from
    /// the index. The shared list-lock critical section is what orders this
    /// eviction before any later insert of the same key.
    fn evict_lru(&self, list: &mut RecencyList<K, V>) {
        let Some(victim) = list.tail_candidate() else {
            return;
        };
        list.unlink(victim);
        let (key, _value) = list.retire(victim);
        self.index.remove(&key);
        self.len.fetch_sub(1, Ordering::Relaxed);
        trace!("evicted least-recently-used entry");
    }

    /// Asserts the index and the list describe the same entries.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let list = self.list.lock();
        assert_eq!(list.linked_len(), self.index.len());
        assert_eq!(list.linked_len(), self.len.load(Ordering::Relaxed));
        for entry in self.index.iter() {
            assert!(list.is_live(*entry.value()), "index entry points at a dead node");
        }
    }
}
