//! The keyed multimap over per-key chunked arrays.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::chunked::{ChunkedArray, ValueIter};

/// Default number of values per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// A thread-safe multimap where values under a key form an append-only,
/// chunked sequence.
///
/// Appends reserve slots with a lock-free fetch-and-add; reads never take a
/// lock and always observe a consistent prefix of each key's sequence. The
/// structure grows monotonically until dropped: chunks are created on demand
/// and never freed.
pub struct AppendLog<K, V> {
    entries: DashMap<K, Arc<ChunkedArray<V>>>,
    /// Total number of published values across all keys.
    total: AtomicU64,
    chunk_size: usize,
}

impl<K, V> AppendLog<K, V>
where
    K: Eq + Hash,
{
    /// Creates a store with the default chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Creates a store with the given chunk size.
    ///
    /// # Panics
    /// Panics if `chunk_size` is zero.
    #[must_use]
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        Self { entries: DashMap::new(), total: AtomicU64::new(0), chunk_size }
    }

    /// Appends a value to the sequence under `key`.
    pub fn add(&self, key: K, value: V) {
        self.array_for(key).push(value);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Appends all values in order under `key`.
    ///
    /// The slot range is reserved atomically, so the run is contiguous in the
    /// sequence even under concurrent writers.
    pub fn add_all(&self, key: K, values: Vec<V>) {
        if values.is_empty() {
            return;
        }
        let added = self.array_for(key).extend(values);
        self.total.fetch_add(added as u64, Ordering::Relaxed);
    }

    /// Returns a snapshot of the values under `key`, in insertion order.
    ///
    /// The snapshot contains exactly the prefix published at some point
    /// during the call; concurrent writers may have appended more since.
    #[must_use]
    pub fn get(&self, key: &K) -> Vec<V>
    where
        V: Clone,
    {
        match self.entries.get(key) {
            Some(array) => array.snapshot(),
            None => Vec::new(),
        }
    }

    /// Returns a lazy iterator over the values under `key`, bounded by the
    /// cursor observed at call time. The iterator is finite and cannot be
    /// restarted.
    #[must_use]
    pub fn iter(&self, key: &K) -> ValueIter<V> {
        match self.entries.get(key) {
            Some(array) => array.iter(),
            None => ValueIter::empty(),
        }
    }

    /// Number of values published under `key`.
    #[must_use]
    pub fn value_count(&self, key: &K) -> usize {
        self.entries.get(key).map_or(0, |array| array.len())
    }

    /// All keys currently present.
    #[must_use]
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Applies `action` to each key together with an iterator over its
    /// values, each bounded at the moment the key is visited.
    pub fn for_each<F>(&self, mut action: F)
    where
        F: FnMut(&K, ValueIter<V>),
    {
        for entry in self.entries.iter() {
            action(entry.key(), entry.value().iter());
        }
    }

    /// Total number of values observed across all keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.total.load(Ordering::Relaxed) as usize
    }

    /// Whether the store holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// The configured chunk size.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn array_for(&self, key: K) -> Arc<ChunkedArray<V>> {
        self.entries
            .entry(key)
            .or_insert_with(|| Arc::new(ChunkedArray::new(self.chunk_size)))
            .value()
            .clone()
    }

    #[cfg(test)]
    fn chunk_count(&self, key: &K) -> usize {
        self.entries.get(key).map_or(0, |array| array.chunk_count())
    }
}

impl<K: Eq + Hash, V> Default for AppendLog<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
