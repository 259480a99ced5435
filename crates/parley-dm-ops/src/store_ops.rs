//! Store-operation log codec
//!
//! The persistence layer stores flat records, not nested structures. This
//! module defines the replayable log of primitive store operations, the flat
//! (client DB) record shapes, and the symmetric conversions between them:
//!
//! - [`process_store_operations`] applies a log to an in-memory store.
//! - [`convert_store_to_ops`] flattens a full store into a log that rebuilds
//!   it from empty (the full-flush path).
//! - [`convert_ops_to_client_db_ops`] stringifies a log for the storage
//!   engine; [`translate_client_db_data`] rebuilds the four partitions from
//!   stored rows, recovering partition assignment and intra-bucket order.

use serde::{Deserialize, Serialize};

use crate::condition::{ConditionKind, QueueCondition};
use crate::error::Result;
use crate::operation::{DmOperation, ShimmedDmOperation};
use crate::queue::QueuedDmOperations;

/// A primitive, replayable store mutation.
///
/// Applying a list of these in order is associative over concatenation, so a
/// log may be persisted incrementally and replayed in any batching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreOperation {
    /// Upsert a single shimmed operation record, keyed by id.
    ReplaceDmOperation { payload: ShimmedDmOperation },
    /// Delete shimmed operation records by id; absent ids are no-ops.
    RemoveDmOperations { ids: Vec<String> },
    /// Delete every shimmed operation record.
    RemoveAllDmOperations,
    /// Append one entry to the bucket selected by `condition`.
    AddQueuedDmOperation {
        condition: QueueCondition,
        operation: DmOperation,
        timestamp: i64,
    },
    /// Delete the whole bucket selected by `condition`.
    ClearDmOperationsQueue { condition: QueueCondition },
    /// Drop queued entries older than `max_timestamp` from every bucket.
    PruneQueuedDmOperations { max_timestamp: i64 },
}

/// Flat storage record for a shimmed operation; the structured value is
/// stringified for the storage engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientDbDmOperation {
    pub id: String,
    pub op_type: String,
    pub operation: String,
}

/// Flat storage record for one queued entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientDbQueuedDmOperation {
    pub queue_type: ConditionKind,
    pub queue_key: String,
    pub operation: String,
    pub timestamp: i64,
}

/// A [`StoreOperation`] in the flat form the storage engine accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientDbStoreOperation {
    ReplaceDmOperation { payload: ClientDbDmOperation },
    RemoveDmOperations { ids: Vec<String> },
    RemoveAllDmOperations,
    AddQueuedDmOperation { payload: ClientDbQueuedDmOperation },
    ClearDmOperationsQueue {
        queue_type: ConditionKind,
        queue_key: String,
    },
    PruneQueuedDmOperations { max_timestamp: i64 },
}

impl ShimmedDmOperation {
    /// Stringify for storage. The inverse is [`ClientDbDmOperation::into_shimmed`];
    /// the pair round-trips exactly.
    pub fn to_client_db(&self) -> Result<ClientDbDmOperation> {
        Ok(ClientDbDmOperation {
            id: self.id.clone(),
            op_type: self.op_type.clone(),
            operation: serde_json::to_string(&self.operation)?,
        })
    }
}

impl ClientDbDmOperation {
    /// Parse the stringified operation back into its structured form.
    pub fn into_shimmed(self) -> Result<ShimmedDmOperation> {
        Ok(ShimmedDmOperation {
            id: self.id,
            op_type: self.op_type,
            operation: serde_json::from_str(&self.operation)?,
        })
    }
}

/// Apply a log of store operations to a base store, in list order.
///
/// Total: replace is an idempotent overwrite, removes of absent ids and
/// clears of absent buckets are no-ops.
pub fn process_store_operations(
    mut store: QueuedDmOperations,
    ops: &[StoreOperation],
) -> QueuedDmOperations {
    for op in ops {
        store = match op {
            StoreOperation::ReplaceDmOperation { payload } => {
                match store
                    .shimmed_operations
                    .iter_mut()
                    .find(|record| record.id == payload.id)
                {
                    Some(existing) => *existing = payload.clone(),
                    None => store.shimmed_operations.push(payload.clone()),
                }
                store
            }
            StoreOperation::RemoveDmOperations { ids } => {
                store
                    .shimmed_operations
                    .retain(|record| !ids.contains(&record.id));
                store
            }
            StoreOperation::RemoveAllDmOperations => {
                store.shimmed_operations.clear();
                store
            }
            StoreOperation::AddQueuedDmOperation {
                condition,
                operation,
                timestamp,
            } => store.insert(condition, operation.clone(), *timestamp),
            StoreOperation::ClearDmOperationsQueue { condition } => store.remove(condition),
            StoreOperation::PruneQueuedDmOperations { max_timestamp } => {
                store.prune(*max_timestamp)
            }
        };
    }
    store
}

/// Flatten a full store into a log that rebuilds it when replayed against an
/// empty store: one queued-entry record per entry across all four
/// partitions, each tagged with its originating condition, plus one replace
/// per shimmed operation.
pub fn convert_store_to_ops(store: &QueuedDmOperations) -> Vec<StoreOperation> {
    let mut ops = Vec::with_capacity(store.queued_len() + store.shimmed_operations.len());

    for (thread_id, entries) in &store.thread_queue {
        for entry in entries {
            ops.push(StoreOperation::AddQueuedDmOperation {
                condition: QueueCondition::Thread {
                    thread_id: thread_id.clone(),
                },
                operation: entry.operation.clone(),
                timestamp: entry.timestamp,
            });
        }
    }
    for (entry_id, entries) in &store.entry_queue {
        for entry in entries {
            ops.push(StoreOperation::AddQueuedDmOperation {
                condition: QueueCondition::Entry {
                    entry_id: entry_id.clone(),
                },
                operation: entry.operation.clone(),
                timestamp: entry.timestamp,
            });
        }
    }
    for (message_id, entries) in &store.message_queue {
        for entry in entries {
            ops.push(StoreOperation::AddQueuedDmOperation {
                condition: QueueCondition::Message {
                    message_id: message_id.clone(),
                },
                operation: entry.operation.clone(),
                timestamp: entry.timestamp,
            });
        }
    }
    for (thread_id, users) in &store.membership_queue {
        for (user_id, entries) in users {
            for entry in entries {
                ops.push(StoreOperation::AddQueuedDmOperation {
                    condition: QueueCondition::Membership {
                        thread_id: thread_id.clone(),
                        user_id: user_id.clone(),
                    },
                    operation: entry.operation.clone(),
                    timestamp: entry.timestamp,
                });
            }
        }
    }
    for record in &store.shimmed_operations {
        ops.push(StoreOperation::ReplaceDmOperation {
            payload: record.clone(),
        });
    }

    ops
}

/// Stringify a log for the storage engine.
pub fn convert_ops_to_client_db_ops(ops: &[StoreOperation]) -> Result<Vec<ClientDbStoreOperation>> {
    ops.iter()
        .map(|op| {
            Ok(match op {
                StoreOperation::ReplaceDmOperation { payload } => {
                    ClientDbStoreOperation::ReplaceDmOperation {
                        payload: payload.to_client_db()?,
                    }
                }
                StoreOperation::RemoveDmOperations { ids } => {
                    ClientDbStoreOperation::RemoveDmOperations { ids: ids.clone() }
                }
                StoreOperation::RemoveAllDmOperations => {
                    ClientDbStoreOperation::RemoveAllDmOperations
                }
                StoreOperation::AddQueuedDmOperation {
                    condition,
                    operation,
                    timestamp,
                } => ClientDbStoreOperation::AddQueuedDmOperation {
                    payload: ClientDbQueuedDmOperation {
                        queue_type: condition.kind(),
                        queue_key: condition.queue_key(),
                        operation: serde_json::to_string(operation)?,
                        timestamp: *timestamp,
                    },
                },
                StoreOperation::ClearDmOperationsQueue { condition } => {
                    ClientDbStoreOperation::ClearDmOperationsQueue {
                        queue_type: condition.kind(),
                        queue_key: condition.queue_key(),
                    }
                }
                StoreOperation::PruneQueuedDmOperations { max_timestamp } => {
                    ClientDbStoreOperation::PruneQueuedDmOperations {
                        max_timestamp: *max_timestamp,
                    }
                }
            })
        })
        .collect()
}

/// Rebuild the four keyed partitions from stored rows. Rows must be supplied
/// in their stored (arrival) order; intra-bucket order is recovered exactly.
/// The shimmed list is not part of these rows and comes back empty.
pub fn translate_client_db_data(rows: &[ClientDbQueuedDmOperation]) -> Result<QueuedDmOperations> {
    let mut store = QueuedDmOperations::new();
    for row in rows {
        let condition = QueueCondition::from_queue_parts(row.queue_type, &row.queue_key)?;
        let operation: DmOperation = serde_json::from_str(&row.operation)?;
        store = store.insert(&condition, operation, row.timestamp);
    }
    Ok(store)
}
