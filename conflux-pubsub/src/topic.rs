//! Topics: an append-only message log plus per-group committed offsets,
//! both guarded by one reader/writer coordinator.

use std::collections::HashMap;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tracing::debug;

use crate::message::Message;

#[derive(Default)]
struct GroupCursor {
    committed: usize,
}

struct TopicState {
    messages: Vec<Message>,
    groups: HashMap<String, GroupCursor>,
}

/// A named append-only log with independent consumer groups.
///
/// Publishing takes the write role; polling takes the read role and never
/// advances any offset; committing upgrades from a read role to the write
/// role only when an advance is warranted. Messages are never mutated or
/// removed, and each group's committed offset is monotonically
/// non-decreasing and never exceeds the log length.
pub struct Topic {
    name: String,
    state: RwLock<TopicState>,
}

impl Topic {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(TopicState { messages: Vec::new(), groups: HashMap::new() }),
        }
    }

    /// The topic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a message to the log.
    pub fn publish(&self, message: Message) {
        let mut state = self.state.write();
        state.messages.push(message);
    }

    /// Returns up to `max_messages` starting at `group`'s committed offset.
    ///
    /// Polling never advances the offset; repeated polls return the same
    /// messages until a commit. An unknown group is created at offset zero.
    pub fn poll(&self, group: &str, max_messages: usize) -> Vec<Message> {
        if max_messages == 0 {
            return Vec::new();
        }

        {
            let state = self.state.read();
            if let Some(cursor) = state.groups.get(group) {
                return Self::slice(&state, cursor.committed, max_messages);
            }
        }

        // Unknown group: register it under the write role, then serve from
        // offset zero.
        let mut state = self.state.write();
        state.groups.entry(group.to_string()).or_default();
        Self::slice(&state, 0, max_messages)
    }

    /// Advances `group`'s committed offset to `offset`, monotonically.
    ///
    /// Offsets never move backwards (`offset ≤ current` is a no-op) and are
    /// clamped to the log length. The advance upgrades a read role to the
    /// write role; when the upgrade is contended, the write role is acquired
    /// fresh and monotonicity is re-checked.
    pub fn commit(&self, group: &str, offset: usize) {
        let state = self.state.upgradable_read();
        let target = offset.min(state.messages.len());
        if let Some(cursor) = state.groups.get(group) {
            if target <= cursor.committed {
                return;
            }
        }

        match RwLockUpgradableReadGuard::try_upgrade(state) {
            Ok(mut state) => {
                let cursor = state.groups.entry(group.to_string()).or_default();
                if target > cursor.committed {
                    cursor.committed = target;
                }
            },
            Err(state) => {
                drop(state);
                let mut state = self.state.write();
                let target = offset.min(state.messages.len());
                let cursor = state.groups.entry(group.to_string()).or_default();
                if target > cursor.committed {
                    cursor.committed = target;
                }
            },
        }
    }

    /// The committed offset for `group`, zero if the group is unknown.
    #[must_use]
    pub fn committed_offset(&self, group: &str) -> usize {
        self.state.read().groups.get(group).map_or(0, |cursor| cursor.committed)
    }

    /// Registers `group` at offset zero if it does not exist yet.
    pub fn ensure_group(&self, group: &str) {
        {
            let state = self.state.read();
            if state.groups.contains_key(group) {
                return;
            }
        }
        let mut state = self.state.write();
        state.groups.entry(group.to_string()).or_insert_with(|| {
            debug!(topic = %self.name, group, "consumer group registered");
            GroupCursor::default()
        });
    }

    /// Number of messages in the log.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().messages.len()
    }

    /// Whether the log holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slice(state: &TopicState, from: usize, max_messages: usize) -> Vec<Message> {
        let end = from.saturating_add(max_messages).min(state.messages.len());
        if from >= end {
            return Vec::new();
        }
        state.messages[from..end].to_vec()
    }
}
