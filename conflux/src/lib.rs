//! # Conflux
//!
//! A collection of general-purpose concurrent in-memory primitives:
//! - [`store`]: a chunked, append-only multimap with lock-free reads
//! - [`pool`]: a bounded object pool with release-time validation
//! - [`cache`]: a bounded LRU over a concurrent index and a recency list
//! - [`pubsub`]: a partitioned publish/subscribe log with consumer groups
//! - [`actor`]: single-consumer mailboxes multiplexed onto a worker pool
//!
//! The five primitives are independent: they share nothing at runtime and
//! each can be depended on directly through its own crate. This crate only
//! re-exports them under one roof.
//!
//! ## Examples
//!
//! ```rust
//! use conflux::prelude::*;
//!
//! let log: AppendLog<&str, u32> = AppendLog::new();
//! log.add("k", 1);
//! assert_eq!(log.get(&"k"), vec![1]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use conflux_actor as actor;
pub use conflux_cache as cache;
pub use conflux_pool as pool;
pub use conflux_pubsub as pubsub;
pub use conflux_store as store;

/// Re-export of the most commonly used types.
pub mod prelude {
    pub use crate::actor::{ActorRef, ActorSystem, ActorSystemConfig};
    pub use crate::cache::Cache;
    pub use crate::pool::{Pool, PoolResource};
    pub use crate::pubsub::{Consumer, Message, Producer, PubSub};
    pub use crate::store::AppendLog;
}
