//! # Conflux Store
//!
//! A thread-safe, append-only key-value multimap. For each key, values form
//! an append-only sequence stored in fixed-size chunks, giving:
//! - Lock-free indexing through atomic cursors
//! - Lock-free reads once values are published
//! - Stable storage: chunks are never moved or reallocated in place
//! - Memory-efficient traversal via snapshot-bounded iterators
//!
//! ## Examples
//!
//! ```rust
//! use conflux_store::AppendLog;
//!
//! let log: AppendLog<&str, u64> = AppendLog::new();
//! log.add("requests", 1);
//! log.add_all("requests", vec![2, 3]);
//!
//! assert_eq!(log.get(&"requests"), vec![1, 2, 3]);
//! assert_eq!(log.len(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod chunked;
mod store;

pub use chunked::ValueIter;
pub use store::{AppendLog, DEFAULT_CHUNK_SIZE};
