//! Queued DM operations store
//!
//! Four keyed partitions of pending operations (one per condition variant)
//! plus a flat list of shimmed operations whose type this build does not
//! recognize. Buckets preserve arrival order; once the blocking condition
//! resolves, the caller drains the bucket in order and clears it.
//!
//! All transformations take the store by value and return the new value.
//! Untouched buckets are moved, never copied, so a transition only writes
//! the path it actually changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::condition::QueueCondition;
use crate::operation::{DmOperation, ShimmedDmOperation};

/// A pending operation paired with the time it was enqueued.
///
/// The timestamp records enqueue time, not operation creation time, and is
/// the sole input to age-based pruning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub operation: DmOperation,
    pub timestamp: i64,
}

/// One bucket of pending operations, in arrival order.
pub type OperationsQueue = Vec<QueueEntry>;

/// The aggregate store of queued DM operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueuedDmOperations {
    pub thread_queue: BTreeMap<String, OperationsQueue>,
    pub entry_queue: BTreeMap<String, OperationsQueue>,
    pub message_queue: BTreeMap<String, OperationsQueue>,
    pub membership_queue: BTreeMap<String, BTreeMap<String, OperationsQueue>>,
    pub shimmed_operations: Vec<ShimmedDmOperation>,
}

impl QueuedDmOperations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `(operation, timestamp)` to the bucket selected by `condition`,
    /// creating intermediate levels as needed. Always appends at the tail.
    pub fn insert(mut self, condition: &QueueCondition, operation: DmOperation, timestamp: i64) -> Self {
        let entry = QueueEntry { operation, timestamp };
        match condition {
            QueueCondition::Thread { thread_id } => {
                self.thread_queue
                    .entry(thread_id.clone())
                    .or_default()
                    .push(entry);
            }
            QueueCondition::Entry { entry_id } => {
                self.entry_queue
                    .entry(entry_id.clone())
                    .or_default()
                    .push(entry);
            }
            QueueCondition::Message { message_id } => {
                self.message_queue
                    .entry(message_id.clone())
                    .or_default()
                    .push(entry);
            }
            QueueCondition::Membership { thread_id, user_id } => {
                self.membership_queue
                    .entry(thread_id.clone())
                    .or_default()
                    .entry(user_id.clone())
                    .or_default()
                    .push(entry);
            }
        }
        self
    }

    /// Delete the whole bucket selected by `condition`, along with any
    /// now-empty intermediate level. Removing an absent bucket is a no-op,
    /// not an error; callers remove speculatively.
    pub fn remove(mut self, condition: &QueueCondition) -> Self {
        match condition {
            QueueCondition::Thread { thread_id } => {
                self.thread_queue.remove(thread_id);
            }
            QueueCondition::Entry { entry_id } => {
                self.entry_queue.remove(entry_id);
            }
            QueueCondition::Message { message_id } => {
                self.message_queue.remove(message_id);
            }
            QueueCondition::Membership { thread_id, user_id } => {
                if let Some(users) = self.membership_queue.get_mut(thread_id) {
                    users.remove(user_id);
                    if users.is_empty() {
                        self.membership_queue.remove(thread_id);
                    }
                }
            }
        }
        self
    }

    /// Drop every entry with `timestamp < max_timestamp` from every bucket in
    /// every partition. The boundary is inclusive on the keep side: an entry
    /// stamped exactly `max_timestamp` survives. Buckets that become empty
    /// are removed entirely.
    pub fn prune(mut self, max_timestamp: i64) -> Self {
        prune_partition(&mut self.thread_queue, max_timestamp);
        prune_partition(&mut self.entry_queue, max_timestamp);
        prune_partition(&mut self.message_queue, max_timestamp);
        for users in self.membership_queue.values_mut() {
            prune_partition(users, max_timestamp);
        }
        self.membership_queue.retain(|_, users| !users.is_empty());
        self
    }

    /// Reset all four partitions and the shimmed list; used on full
    /// account/session reset.
    pub fn clear_all(self) -> Self {
        Self::default()
    }

    /// Total number of queued entries across all four partitions, not
    /// counting shimmed operations.
    pub fn queued_len(&self) -> usize {
        let flat: usize = self
            .thread_queue
            .values()
            .chain(self.entry_queue.values())
            .chain(self.message_queue.values())
            .map(Vec::len)
            .sum();
        let nested: usize = self
            .membership_queue
            .values()
            .flat_map(|users| users.values())
            .map(Vec::len)
            .sum();
        flat + nested
    }

    pub fn is_empty(&self) -> bool {
        self.queued_len() == 0 && self.shimmed_operations.is_empty()
    }
}

fn prune_partition(partition: &mut BTreeMap<String, OperationsQueue>, max_timestamp: i64) {
    for entries in partition.values_mut() {
        entries.retain(|entry| entry.timestamp >= max_timestamp);
    }
    partition.retain(|_, entries| !entries.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_operation() -> DmOperation {
        DmOperation::SendTextMessage {
            thread_id: "thread123".into(),
            creator_id: "user456".into(),
            time: 1_642_500_000_000,
            message_id: "msg789".into(),
            text: "Hello world".into(),
        }
    }

    fn membership_operation() -> DmOperation {
        DmOperation::AddMembers {
            thread_id: "thread456".into(),
            editor_id: "user789".into(),
            time: 1_642_500_001_000,
            message_id: "msg101".into(),
            added_user_ids: vec!["user123".into()],
        }
    }

    fn thread_condition(thread_id: &str) -> QueueCondition {
        QueueCondition::Thread {
            thread_id: thread_id.into(),
        }
    }

    fn membership_condition(thread_id: &str, user_id: &str) -> QueueCondition {
        QueueCondition::Membership {
            thread_id: thread_id.into(),
            user_id: user_id.into(),
        }
    }

    #[test]
    fn insert_preserves_arrival_order() {
        let condition = thread_condition("thread123");
        let first = mock_operation();
        let second = DmOperation::SendTextMessage {
            thread_id: "thread123".into(),
            creator_id: "user456".into(),
            time: 1_642_500_001_000,
            message_id: "msg999".into(),
            text: "Second message".into(),
        };

        let store = QueuedDmOperations::new()
            .insert(&condition, first.clone(), 100)
            .insert(&condition, second.clone(), 200);

        let bucket = &store.thread_queue["thread123"];
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].operation, first);
        assert_eq!(bucket[1].operation, second);
    }

    #[test]
    fn insert_creates_nested_membership_levels() {
        let store = QueuedDmOperations::new()
            .insert(&membership_condition("thread456", "user123"), membership_operation(), 100)
            .insert(&membership_condition("thread456", "user789"), membership_operation(), 200);

        let users = &store.membership_queue["thread456"];
        assert_eq!(users.len(), 2);
        assert_eq!(users["user123"].len(), 1);
        assert_eq!(users["user789"].len(), 1);
    }

    #[test]
    fn remove_missing_bucket_is_noop() {
        let store = QueuedDmOperations::new().insert(&thread_condition("thread123"), mock_operation(), 100);
        let before = store.clone();

        let store = store.remove(&thread_condition("nonexistent"));
        assert_eq!(store, before);

        let store = store.remove(&membership_condition("nonexistent", "user1"));
        assert_eq!(store, before);
    }

    #[test]
    fn insert_then_remove_restores_other_buckets() {
        let base = QueuedDmOperations::new()
            .insert(&thread_condition("thread1"), mock_operation(), 100)
            .insert(&membership_condition("thread2", "user1"), membership_operation(), 150);

        let condition = thread_condition("thread3");
        let store = base
            .clone()
            .insert(&condition, mock_operation(), 200)
            .insert(&condition, mock_operation(), 300)
            .remove(&condition);

        assert_eq!(store, base);
    }

    #[test]
    fn remove_last_user_drops_thread_key() {
        let store = QueuedDmOperations::new()
            .insert(&membership_condition("thread1", "user1"), membership_operation(), 100)
            .insert(&membership_condition("thread2", "user2"), membership_operation(), 200)
            .remove(&membership_condition("thread1", "user1"));

        assert!(!store.membership_queue.contains_key("thread1"));
        assert!(store.membership_queue.contains_key("thread2"));
    }

    #[test]
    fn remove_one_of_two_users_keeps_thread_key() {
        let store = QueuedDmOperations::new()
            .insert(&membership_condition("thread1", "user1"), membership_operation(), 100)
            .insert(&membership_condition("thread1", "user2"), membership_operation(), 200)
            .remove(&membership_condition("thread1", "user1"));

        let users = &store.membership_queue["thread1"];
        assert_eq!(users.len(), 1);
        assert!(users.contains_key("user2"));
    }

    #[test]
    fn prune_boundary_is_inclusive_on_keep_side() {
        let condition = thread_condition("thread1");
        let store = QueuedDmOperations::new()
            .insert(&condition, mock_operation(), 999)
            .insert(&condition, mock_operation(), 1000)
            .insert(&condition, mock_operation(), 1001)
            .prune(1000);

        let timestamps: Vec<i64> = store.thread_queue["thread1"]
            .iter()
            .map(|entry| entry.timestamp)
            .collect();
        assert_eq!(timestamps, vec![1000, 1001]);
    }

    #[test]
    fn prune_leaf_prunes_empty_buckets() {
        let store = QueuedDmOperations::new()
            .insert(&thread_condition("thread1"), mock_operation(), 100)
            .insert(&QueueCondition::Entry { entry_id: "entry1".into() }, mock_operation(), 100)
            .insert(&membership_condition("thread2", "user1"), membership_operation(), 100)
            .insert(&membership_condition("thread2", "user2"), membership_operation(), 2000)
            .prune(1000);

        assert!(store.thread_queue.is_empty());
        assert!(store.entry_queue.is_empty());
        let users = &store.membership_queue["thread2"];
        assert!(!users.contains_key("user1"));
        assert_eq!(users["user2"].len(), 1);
    }

    #[test]
    fn prune_drops_fully_emptied_membership_thread() {
        let store = QueuedDmOperations::new()
            .insert(&membership_condition("thread1", "user1"), membership_operation(), 100)
            .prune(1000);

        assert!(store.membership_queue.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn clear_all_resets_everything() {
        let mut store = QueuedDmOperations::new()
            .insert(&thread_condition("thread1"), mock_operation(), 100)
            .insert(&membership_condition("thread2", "user1"), membership_operation(), 200);
        store.shimmed_operations.push(ShimmedDmOperation {
            id: "op-1".into(),
            op_type: "future_op".into(),
            operation: serde_json::Value::Null,
        });

        let store = store.clear_all();
        assert!(store.is_empty());
        assert_eq!(store, QueuedDmOperations::new());
    }

    #[test]
    fn queued_len_counts_all_partitions() {
        let store = QueuedDmOperations::new()
            .insert(&thread_condition("thread1"), mock_operation(), 100)
            .insert(&thread_condition("thread1"), mock_operation(), 200)
            .insert(&QueueCondition::Message { message_id: "msg1".into() }, mock_operation(), 100)
            .insert(&membership_condition("thread2", "user1"), membership_operation(), 100);

        assert_eq!(store.queued_len(), 4);
        assert!(!store.is_empty());
    }
}
