//! The topic registry and the producer/consumer handles.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;

use crate::message::Message;
use crate::topic::Topic;

/// The publish/subscribe bus: a registry of independent topics.
pub struct PubSub {
    topics: DashMap<String, Arc<Topic>>,
}

impl PubSub {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self { topics: DashMap::new() }
    }

    /// Returns the topic named `name`, creating it on first use.
    #[must_use]
    pub fn topic(&self, name: &str) -> Arc<Topic> {
        self.topics
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(topic = name, "topic created");
                Arc::new(Topic::new(name))
            })
            .value()
            .clone()
    }

    /// A producer handle for `topic`.
    #[must_use]
    pub fn producer(&self, topic: &str) -> Producer {
        Producer { topic: self.topic(topic) }
    }

    /// A consumer handle for `topic` bound to `group`.
    ///
    /// The group is registered at offset zero if it does not exist yet.
    #[must_use]
    pub fn consumer(&self, topic: &str, group: &str) -> Consumer {
        let topic = self.topic(topic);
        topic.ensure_group(group);
        Consumer { topic, group: group.to_string() }
    }

    /// Names of all topics created so far.
    #[must_use]
    pub fn topic_names(&self) -> Vec<String> {
        self.topics.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for PubSub {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishes messages to one topic.
pub struct Producer {
    topic: Arc<Topic>,
}

impl Producer {
    /// Appends a message with the given key and payload; the wall-clock
    /// timestamp is stamped at enqueue.
    pub fn send(&self, key: impl Into<String>, payload: impl Into<Bytes>) {
        self.topic.publish(Message::new(key, payload));
    }

    /// The topic this producer appends to.
    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

/// Reads one topic on behalf of a consumer group.
pub struct Consumer {
    topic: Arc<Topic>,
    group: String,
}

impl Consumer {
    /// Returns up to `max_messages` from the group's committed offset
    /// without advancing it.
    #[must_use]
    pub fn poll(&self, max_messages: usize) -> Vec<Message> {
        self.topic.poll(&self.group, max_messages)
    }

    /// Advances the group's committed offset monotonically.
    pub fn commit(&self, offset: usize) {
        self.topic.commit(&self.group, offset);
    }

    /// The group's current committed offset.
    #[must_use]
    pub fn committed_offset(&self) -> usize {
        self.topic.committed_offset(&self.group)
    }

    /// The consumer group this handle reads for.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// The topic this consumer reads from.
    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}
