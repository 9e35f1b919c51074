//! # Conflux Cache
//!
//! A thread-safe bounded LRU cache. Lookups go through a concurrent index;
//! recency is tracked by an intrusive doubly-linked list guarded by a single
//! list lock. Misses run a compute function, which may decline to cache by
//! returning `None`.
//!
//! ## Examples
//!
//! ```rust
//! use conflux_cache::Cache;
//!
//! # fn main() -> Result<(), conflux_cache::CacheError> {
//! let cache = Cache::new(2, |key: &u32| Some(key * 10))?;
//! assert_eq!(cache.get(&3), Some(30));
//! assert_eq!(cache.put(3, 31), Some(30));
//! assert_eq!(cache.get(&3), Some(31));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cache;
mod error;
mod list;

pub use cache::Cache;
pub use error::CacheError;
