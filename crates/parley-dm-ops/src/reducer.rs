//! Queue reducer
//!
//! The single authority over queue state transitions. Every external event
//! goes through [`reduce`], which returns the next store value together with
//! the store operations the caller must persist to make that value durable.
//! The reducer itself performs no I/O and every transition is total.
//!
//! Callers must serialize invocations against a given store value
//! (single-writer discipline) and commit the emitted operations atomically
//! before treating the returned store as authoritative; see
//! [`crate::handle::DmQueueHandle`] for the wrapper that enforces this.

use serde::{Deserialize, Serialize};

use crate::condition::QueueCondition;
use crate::operation::{DmOperation, ShimmedDmOperation, UNSHIMMED_OPERATION_TYPE};
use crate::queue::QueuedDmOperations;
use crate::store_ops::StoreOperation;

/// An external event driving the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueAction {
    /// An operation cannot be applied yet; file it under its blocking
    /// condition.
    QueueOperation {
        operation: DmOperation,
        timestamp: i64,
        condition: QueueCondition,
    },
    /// Periodic maintenance sweep: drop entries enqueued before
    /// `max_timestamp`.
    PruneQueue { max_timestamp: i64 },
    /// A blocking condition resolved and the bucket was drained; delete it.
    ClearQueue { condition: QueueCondition },
    /// An incoming operation's type is unrecognized by this build; persist
    /// it verbatim for a future build to reprocess.
    PersistUnsupportedOperation { operation: ShimmedDmOperation },
    /// A build that understands the operation finished reprocessing it.
    UnshimmingCompleted { id: String },
    /// Wholesale replacement from a storage load at startup.
    ReplaceStore {
        queued: QueuedDmOperations,
        operations: Vec<ShimmedDmOperation>,
    },
}

/// The outcome of a reduction: the next store value and the operations that
/// must be persisted to reach it on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceResult {
    pub store: QueuedDmOperations,
    pub operations: Vec<StoreOperation>,
}

/// Apply one action to the store.
pub fn reduce(store: QueuedDmOperations, action: &QueueAction) -> ReduceResult {
    match action {
        QueueAction::QueueOperation {
            operation,
            timestamp,
            condition,
        } => ReduceResult {
            store: store.insert(condition, operation.clone(), *timestamp),
            operations: vec![StoreOperation::AddQueuedDmOperation {
                condition: condition.clone(),
                operation: operation.clone(),
                timestamp: *timestamp,
            }],
        },
        QueueAction::PruneQueue { max_timestamp } => ReduceResult {
            store: store.prune(*max_timestamp),
            operations: vec![StoreOperation::PruneQueuedDmOperations {
                max_timestamp: *max_timestamp,
            }],
        },
        QueueAction::ClearQueue { condition } => ReduceResult {
            store: store.remove(condition),
            operations: vec![StoreOperation::ClearDmOperationsQueue {
                condition: condition.clone(),
            }],
        },
        QueueAction::PersistUnsupportedOperation { operation } => ReduceResult {
            // Only the persistence record is written now; the in-memory
            // shimmed list refreshes on the next full load.
            store,
            operations: vec![StoreOperation::ReplaceDmOperation {
                payload: operation.clone(),
            }],
        },
        QueueAction::UnshimmingCompleted { id } => ReduceResult {
            store,
            operations: vec![StoreOperation::RemoveDmOperations {
                ids: vec![id.clone()],
            }],
        },
        QueueAction::ReplaceStore { queued, operations } => {
            let shimmed_operations = operations
                .iter()
                .filter(|record| record.op_type == UNSHIMMED_OPERATION_TYPE)
                .cloned()
                .collect();
            ReduceResult {
                store: QueuedDmOperations {
                    shimmed_operations,
                    ..queued.clone()
                },
                // Triggered by a load, not by a state change that needs
                // saving.
                operations: Vec::new(),
            }
        }
    }
}
