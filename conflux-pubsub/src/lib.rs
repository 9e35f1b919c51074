//! # Conflux PubSub
//!
//! An in-memory publish/subscribe log. Each topic is an append-only message
//! sequence; any number of consumer groups read it independently, each
//! tracking only a committed offset. Messages are never mutated or removed.
//!
//! ## Examples
//!
//! ```rust
//! use conflux_pubsub::PubSub;
//!
//! let bus = PubSub::new();
//! let consumer = bus.consumer("events", "billing");
//! bus.producer("events").send("order-1", "created");
//!
//! let batch = consumer.poll(10);
//! assert_eq!(batch.len(), 1);
//! consumer.commit(1);
//! assert!(consumer.poll(10).is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod message;
mod pubsub;
mod topic;

pub use message::{Message, MessageId};
pub use pubsub::{Consumer, Producer, PubSub};
pub use topic::Topic;
