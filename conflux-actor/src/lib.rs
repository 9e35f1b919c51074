//! # Conflux Actor
//!
//! A minimal actor runtime: N single-consumer mailboxes multiplexed onto a
//! fixed pool of worker threads. At most one worker runs a given actor's
//! handler at any instant, enforced by a per-actor scheduled flag, and
//! messages from a single producer are handled in enqueue order.
//!
//! ## Examples
//!
//! ```rust
//! use conflux_actor::ActorSystem;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), conflux_actor::ActorError> {
//! let system = ActorSystem::new(4)?;
//! let total = Arc::new(AtomicU64::new(0));
//!
//! let sink = Arc::clone(&total);
//! let sum = system
//!     .register("sum", 128, move |n: u64| {
//!         sink.fetch_add(n, Ordering::Relaxed);
//!     })
//!     .expect("id is free");
//!
//! assert!(sum.send(41));
//! assert!(sum.send(1));
//! # system.shutdown();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod context;
mod system;

pub use config::ActorSystemConfig;
pub use system::{ActorError, ActorRef, ActorSystem};
