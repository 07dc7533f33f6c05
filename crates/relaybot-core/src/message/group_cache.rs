//! Short-term buffer of recent group messages.
//!
//! Messages that do not trigger a reply are buffered per group so the next
//! triggered reply can see what the group was talking about. Each buffer is
//! bounded to a fixed capacity and drops its oldest entries first.
//!
//! The map is a `DashMap`: `record` and `drain_and_format` on the same group
//! are mutually exclusive through the entry guard, different groups proceed
//! independently. Each operation is O(capacity) and never awaits while
//! holding a guard.

use std::collections::VecDeque;

use dashmap::DashMap;
use tracing::debug;

/// Default number of buffered messages per group.
pub const DEFAULT_CAPACITY: usize = 15;

/// Separator placed between formatted entries.
pub const DELIMITER: &str = "||";

/// One buffered group message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMessage {
    pub user: String,
    pub text: String,
}

/// Per-group bounded history of recent messages.
pub struct GroupHistoryCache {
    capacity: usize,
    groups: DashMap<String, VecDeque<CachedMessage>>,
}

impl GroupHistoryCache {
    /// Create a cache holding at most `capacity` messages per group.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            groups: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a message, keeping only the `capacity` most recent.
    pub fn record(&self, group: &str, user: &str, text: &str) {
        let mut buffer = self.groups.entry(group.to_string()).or_default();
        buffer.push_back(CachedMessage {
            user: user.to_string(),
            text: text.to_string(),
        });
        while buffer.len() > self.capacity {
            buffer.pop_front();
        }
        debug!(group, user, buffered = buffer.len(), "Buffered group message");
    }

    /// Read and clear a group's buffer.
    ///
    /// Returns the entries formatted as `user: text` joined by [`DELIMITER`],
    /// together with how many entries there were. Unknown or empty groups
    /// yield `("", 0)`.
    pub fn drain_and_format(&self, group: &str) -> (String, usize) {
        let Some(mut buffer) = self.groups.get_mut(group) else {
            return (String::new(), 0);
        };
        let count = buffer.len();
        let formatted = buffer
            .drain(..)
            .map(|m| format!("{}: {}", m.user, m.text))
            .collect::<Vec<_>>()
            .join(DELIMITER);
        if count > 0 {
            debug!(group, count, "Drained group history");
        }
        (formatted, count)
    }

    /// Number of messages currently buffered for `group`.
    pub fn len(&self, group: &str) -> usize {
        self.groups.get(group).map_or(0, |b| b.len())
    }

    /// Snapshot of a group's buffer in insertion order.
    #[cfg(test)]
    pub(crate) fn snapshot(&self, group: &str) -> Vec<CachedMessage> {
        self.groups
            .get(group)
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for GroupHistoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for GroupHistoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupHistoryCache")
            .field("capacity", &self.capacity)
            .field("groups", &self.groups.len())
            .finish()
    }
}
