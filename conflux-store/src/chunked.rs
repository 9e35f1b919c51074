//! Chunked append-only storage for a single key.
//!
//! Values live in fixed-size chunks addressed through a chunk directory. The
//! directory is replaced wholesale when it grows; chunks themselves never
//! move, so a reader holding an old directory stays valid forever.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::trace;

/// A fixed-size block of write-once slots.
struct Chunk<V> {
    slots: Box<[UnsafeCell<MaybeUninit<V>>]>,
}

// Slots are written exactly once by the thread that reserved their index and
// read only below the published watermark, so cross-thread access is governed
// by the release/acquire handshake on `published`.
unsafe impl<V: Send> Send for Chunk<V> {}
unsafe impl<V: Send + Sync> Sync for Chunk<V> {}

impl<V> Chunk<V> {
    fn new(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || UnsafeCell::new(MaybeUninit::uninit()));
        Self { slots: slots.into_boxed_slice() }
    }

    /// # Safety
    /// `offset` must be a slot index reserved by the caller and not yet
    /// written.
    unsafe fn write(&self, offset: usize, value: V) {
        (*self.slots[offset].get()).write(value);
    }

    /// # Safety
    /// `offset` must lie below the owning array's published watermark.
    unsafe fn read(&self, offset: usize) -> &V {
        (*self.slots[offset].get()).assume_init_ref()
    }

    /// # Safety
    /// `offset` must be initialized and never touched again.
    unsafe fn drop_slot(&self, offset: usize) {
        (*self.slots[offset].get()).assume_init_drop();
    }
}

type Directory<V> = Vec<Arc<Chunk<V>>>;

/// A thread-safe, append-only array of values stored in fixed-size chunks.
///
/// Writers reserve a slot with a fetch-and-add on `reserved`, fill it, then
/// commit by advancing `published` in reservation order. Readers bound every
/// traversal by an acquire load of `published`: the prefix below it is fully
/// initialized and immutable.
pub(crate) struct ChunkedArray<V> {
    chunk_size: usize,
    /// Next slot index handed to a writer.
    reserved: AtomicU64,
    /// Watermark below which every slot is initialized and visible.
    published: AtomicU64,
    directory: ArcSwap<Directory<V>>,
    grow: Mutex<()>,
}

impl<V> ChunkedArray<V> {
    pub(crate) fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            reserved: AtomicU64::new(0),
            published: AtomicU64::new(0),
            directory: ArcSwap::from_pointee(vec![Arc::new(Chunk::new(chunk_size))]),
            grow: Mutex::new(()),
        }
    }

    /// Appends a single value.
    pub(crate) fn push(&self, value: V) {
        let index = self.reserved.fetch_add(1, Ordering::Relaxed);
        let (chunk_index, offset) = self.locate(index);
        self.ensure_chunk(chunk_index);

        let directory = self.directory.load();
        // SAFETY: `index` was reserved uniquely above; no other writer
        // touches this slot, and no reader sees it until the commit below.
        unsafe { directory[chunk_index].write(offset, value) };

        self.commit(index, 1);
    }

    /// Appends all values with a single reservation. Individual elements may
    /// become visible one by one only after the whole run is written, in
    /// reservation order relative to other writers.
    pub(crate) fn extend(&self, values: Vec<V>) -> usize {
        let count = values.len() as u64;
        if count == 0 {
            return 0;
        }
        let start = self.reserved.fetch_add(count, Ordering::Relaxed);
        let (end_chunk, _) = self.locate(start + count - 1);
        self.ensure_chunk(end_chunk);

        let directory = self.directory.load();
        let mut index = start;
        for value in values {
            let (chunk_index, offset) = self.locate(index);
            // SAFETY: indices in [start, start + count) belong to this call.
            unsafe { directory[chunk_index].write(offset, value) };
            index += 1;
        }

        self.commit(start, count);
        count as usize
    }

    /// Number of published values.
    pub(crate) fn len(&self) -> usize {
        self.published.load(Ordering::Acquire) as usize
    }

    /// Copies the published prefix into a fresh `Vec`.
    pub(crate) fn snapshot(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.iter().collect()
    }

    /// A lazy iterator over the prefix published at call time. Values
    /// appended afterwards are not yielded.
    pub(crate) fn iter(&self) -> ValueIter<V> {
        ValueIter {
            directory: self.directory.load_full(),
            chunk_size: self.chunk_size,
            len: self.published.load(Ordering::Acquire),
            pos: 0,
        }
    }

    /// Number of chunks currently addressable through the directory.
    #[cfg(test)]
    pub(crate) fn chunk_count(&self) -> usize {
        self.directory.load().len()
    }

    fn locate(&self, index: u64) -> (usize, usize) {
        let chunk_size = self.chunk_size as u64;
        ((index / chunk_size) as usize, (index % chunk_size) as usize)
    }

    /// Makes sure the directory covers `chunk_index`, growing it under the
    /// per-array mutex with a double check. Existing chunk references are
    /// copied; chunks themselves never move.
    fn ensure_chunk(&self, chunk_index: usize) {
        if chunk_index < self.directory.load().len() {
            return;
        }

        let _guard = self.grow.lock();
        let current = self.directory.load_full();
        if chunk_index < current.len() {
            return;
        }

        let new_len = (current.len() * 2).max(chunk_index + 1);
        let mut next: Directory<V> = Vec::with_capacity(new_len);
        next.extend(current.iter().cloned());
        while next.len() < new_len {
            next.push(Arc::new(Chunk::new(self.chunk_size)));
        }
        self.directory.store(Arc::new(next));
        trace!(chunks = new_len, "grew chunk directory");
    }

    /// Publishes `[start, start + count)`. Commits happen in reservation
    /// order: only the writer owning `start` performs this transition, so a
    /// plain store suffices once the watermark reaches `start`.
    fn commit(&self, start: u64, count: u64) {
        while self.published.load(Ordering::Acquire) != start {
            std::hint::spin_loop();
        }
        self.published.store(start + count, Ordering::Release);
    }
}

impl<V> Drop for ChunkedArray<V> {
    fn drop(&mut self) {
        if !std::mem::needs_drop::<V>() {
            return;
        }
        // Exclusive access: every writer has committed, so `published` covers
        // all initialized slots.
        let len = *self.published.get_mut();
        let directory = self.directory.load_full();
        for index in 0..len {
            let (chunk_index, offset) = self.locate(index);
            // SAFETY: slots below the watermark are initialized exactly once
            // and dropped exactly once, here.
            unsafe { directory[chunk_index].drop_slot(offset) };
        }
    }
}

/// Lazy iterator over the values published under one key at creation time.
///
/// The iterator is finite: values appended after it was created are never
/// yielded, even if they land before traversal reaches their index.
pub struct ValueIter<V> {
    directory: Arc<Directory<V>>,
    chunk_size: usize,
    len: u64,
    pos: u64,
}

impl<V> ValueIter<V> {
    pub(crate) fn empty() -> Self {
        Self { directory: Arc::new(Vec::new()), chunk_size: 1, len: 0, pos: 0 }
    }
}

impl<V: Clone> Iterator for ValueIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        if self.pos >= self.len {
            return None;
        }
        let chunk_size = self.chunk_size as u64;
        let chunk_index = (self.pos / chunk_size) as usize;
        let offset = (self.pos % chunk_size) as usize;
        self.pos += 1;
        // SAFETY: `pos` is below the watermark captured at creation.
        Some(unsafe { self.directory[chunk_index].read(offset) }.clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.len - self.pos) as usize;
        (remaining, Some(remaining))
    }
}

impl<V: Clone> ExactSizeIterator for ValueIter<V> {}
