//! In-memory storage backend
//!
//! Holds the same flat-record tables the SQLite backend does, guarded by a
//! mutex. Used by tests and by platforms without SQLite; its behavior is the
//! reference for [`crate::sqlite_store::SqliteOperationsStore`].

use std::sync::Mutex;

use crate::error::{DmOpsError, Result};
use crate::operation::ShimmedDmOperation;
use crate::queue::QueuedDmOperations;
use crate::storage::OperationsStore;
use crate::store_ops::{
    convert_ops_to_client_db_ops, translate_client_db_data, ClientDbDmOperation,
    ClientDbQueuedDmOperation, ClientDbStoreOperation, StoreOperation,
};

#[derive(Debug, Default)]
struct Tables {
    dm_operations: Vec<ClientDbDmOperation>,
    queued_dm_operations: Vec<ClientDbQueuedDmOperation>,
}

/// In-memory implementation of the [`OperationsStore`] trait.
#[derive(Debug, Default)]
pub struct InMemoryOperationsStore {
    tables: Mutex<Tables>,
}

impl InMemoryOperationsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OperationsStore for InMemoryOperationsStore {
    fn apply_operations(&self, ops: &[StoreOperation]) -> Result<()> {
        // Convert the whole batch before taking the lock; a conversion
        // failure leaves the tables untouched, and the in-table mutations
        // below are infallible, so the batch applies all-or-nothing.
        let db_ops = convert_ops_to_client_db_ops(ops)?;

        let mut tables = self
            .tables
            .lock()
            .map_err(|e| DmOpsError::Database(e.to_string()))?;

        for op in db_ops {
            match op {
                ClientDbStoreOperation::ReplaceDmOperation { payload } => {
                    match tables
                        .dm_operations
                        .iter_mut()
                        .find(|row| row.id == payload.id)
                    {
                        Some(existing) => *existing = payload,
                        None => tables.dm_operations.push(payload),
                    }
                }
                ClientDbStoreOperation::RemoveDmOperations { ids } => {
                    tables.dm_operations.retain(|row| !ids.contains(&row.id));
                }
                ClientDbStoreOperation::RemoveAllDmOperations => {
                    tables.dm_operations.clear();
                }
                ClientDbStoreOperation::AddQueuedDmOperation { payload } => {
                    tables.queued_dm_operations.push(payload);
                }
                ClientDbStoreOperation::ClearDmOperationsQueue {
                    queue_type,
                    queue_key,
                } => {
                    tables.queued_dm_operations.retain(|row| {
                        row.queue_type != queue_type || row.queue_key != queue_key
                    });
                }
                ClientDbStoreOperation::PruneQueuedDmOperations { max_timestamp } => {
                    tables
                        .queued_dm_operations
                        .retain(|row| row.timestamp >= max_timestamp);
                }
            }
        }

        Ok(())
    }

    fn load_queued_operations(&self) -> Result<QueuedDmOperations> {
        let tables = self
            .tables
            .lock()
            .map_err(|e| DmOpsError::Database(e.to_string()))?;
        translate_client_db_data(&tables.queued_dm_operations)
    }

    fn load_shimmed_operations(&self) -> Result<Vec<ShimmedDmOperation>> {
        let tables = self
            .tables
            .lock()
            .map_err(|e| DmOpsError::Database(e.to_string()))?;
        tables
            .dm_operations
            .iter()
            .map(|row| row.clone().into_shimmed())
            .collect()
    }
}
