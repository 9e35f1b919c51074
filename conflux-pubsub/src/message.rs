//! Message types for the publish/subscribe log.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generates a new unique message id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single record in a topic's log.
///
/// The timestamp is stamped from the wall clock when the message is
/// enqueued. It is advisory only: the clock may jump, so consumers must rely
/// on append order, which is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Producer-supplied routing key.
    pub key: String,
    /// Message payload (zero-copy).
    pub payload: Bytes,
    /// Wall-clock enqueue time.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message stamped with the current wall-clock time.
    pub fn new(key: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            id: MessageId::new(),
            key: key.into(),
            payload: payload.into(),
            timestamp: Utc::now(),
        }
    }

    /// The enqueue time in milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn messages_carry_key_payload_and_time() {
        let before = Utc::now().timestamp_millis();
        let message = Message::new("k", "v");
        assert_eq!(message.key, "k");
        assert_eq!(message.payload, Bytes::from("v"));
        assert_eq!(message.payload_size(), 1);
        assert!(message.timestamp_millis() >= before);
    }
}
