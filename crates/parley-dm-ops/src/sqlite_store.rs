//! SQLite storage backend (requires the "sqlite" feature)
//!
//! Two flat tables back the queue: `dm_operations` for shimmed operation
//! records keyed by id, and `queued_dm_operations` for queued entries keyed
//! by `(queue_type, queue_key)`. Batches apply inside one transaction; loads
//! read in `rowid` order so intra-bucket arrival order survives a restart.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::condition::ConditionKind;
use crate::error::{DmOpsError, Result};
use crate::operation::ShimmedDmOperation;
use crate::queue::QueuedDmOperations;
use crate::storage::OperationsStore;
use crate::store_ops::{
    convert_ops_to_client_db_ops, translate_client_db_data, ClientDbDmOperation,
    ClientDbQueuedDmOperation, ClientDbStoreOperation, StoreOperation,
};

/// SQLite-backed implementation of the [`OperationsStore`] trait.
pub struct SqliteOperationsStore {
    conn: Mutex<Connection>,
}

impl SqliteOperationsStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS dm_operations (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                operation TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS queued_dm_operations (
                queue_type TEXT NOT NULL,
                queue_key TEXT NOT NULL,
                operation TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_queued_dm_operations_bucket
                ON queued_dm_operations(queue_type, queue_key);
            CREATE INDEX IF NOT EXISTS idx_queued_dm_operations_timestamp
                ON queued_dm_operations(timestamp);
            ",
        )?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DmOpsError::Database(e.to_string()))
    }

    fn apply_db_op(conn: &Connection, op: &ClientDbStoreOperation) -> Result<()> {
        match op {
            ClientDbStoreOperation::ReplaceDmOperation { payload } => {
                conn.execute(
                    "INSERT OR REPLACE INTO dm_operations (id, type, operation)
                     VALUES (?1, ?2, ?3)",
                    params![payload.id, payload.op_type, payload.operation],
                )?;
            }
            ClientDbStoreOperation::RemoveDmOperations { ids } => {
                for id in ids {
                    conn.execute("DELETE FROM dm_operations WHERE id = ?1", params![id])?;
                }
            }
            ClientDbStoreOperation::RemoveAllDmOperations => {
                conn.execute("DELETE FROM dm_operations", [])?;
            }
            ClientDbStoreOperation::AddQueuedDmOperation { payload } => {
                conn.execute(
                    "INSERT INTO queued_dm_operations (queue_type, queue_key, operation, timestamp)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        payload.queue_type.as_str(),
                        payload.queue_key,
                        payload.operation,
                        payload.timestamp,
                    ],
                )?;
            }
            ClientDbStoreOperation::ClearDmOperationsQueue {
                queue_type,
                queue_key,
            } => {
                conn.execute(
                    "DELETE FROM queued_dm_operations
                     WHERE queue_type = ?1 AND queue_key = ?2",
                    params![queue_type.as_str(), queue_key],
                )?;
            }
            ClientDbStoreOperation::PruneQueuedDmOperations { max_timestamp } => {
                conn.execute(
                    "DELETE FROM queued_dm_operations WHERE timestamp < ?1",
                    params![max_timestamp],
                )?;
            }
        }
        Ok(())
    }
}

impl OperationsStore for SqliteOperationsStore {
    fn apply_operations(&self, ops: &[StoreOperation]) -> Result<()> {
        let db_ops = convert_ops_to_client_db_ops(ops)?;

        let conn = self.lock_conn()?;
        let tx = conn.unchecked_transaction()?;
        for op in &db_ops {
            Self::apply_db_op(&tx, op)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn load_queued_operations(&self) -> Result<QueuedDmOperations> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT queue_type, queue_key, operation, timestamp
             FROM queued_dm_operations ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let records = rows
            .into_iter()
            .map(|(queue_type, queue_key, operation, timestamp)| {
                Ok(ClientDbQueuedDmOperation {
                    queue_type: ConditionKind::from_str(&queue_type)?,
                    queue_key,
                    operation,
                    timestamp,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        translate_client_db_data(&records)
    }

    fn load_shimmed_operations(&self) -> Result<Vec<ShimmedDmOperation>> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT id, type, operation FROM dm_operations ORDER BY rowid")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ClientDbDmOperation {
                    id: row.get(0)?,
                    op_type: row.get(1)?,
                    operation: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(|row| row.into_shimmed()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::QueueCondition;
    use crate::operation::DmOperation;
    use serde_json::json;

    fn mock_operation(message_id: &str) -> DmOperation {
        DmOperation::SendTextMessage {
            thread_id: "thread123".into(),
            creator_id: "user456".into(),
            time: 1_642_500_000_000,
            message_id: message_id.into(),
            text: "Hello world".into(),
        }
    }

    fn add_op(condition: QueueCondition, message_id: &str, timestamp: i64) -> StoreOperation {
        StoreOperation::AddQueuedDmOperation {
            condition,
            operation: mock_operation(message_id),
            timestamp,
        }
    }

    #[test]
    fn apply_then_load_round_trip() {
        let store = SqliteOperationsStore::open_in_memory().unwrap();
        store
            .apply_operations(&[
                add_op(
                    QueueCondition::Thread {
                        thread_id: "thread1".into(),
                    },
                    "msg1",
                    100,
                ),
                add_op(
                    QueueCondition::Thread {
                        thread_id: "thread1".into(),
                    },
                    "msg2",
                    200,
                ),
                add_op(
                    QueueCondition::Membership {
                        thread_id: "thread2".into(),
                        user_id: "user1".into(),
                    },
                    "msg3",
                    150,
                ),
            ])
            .unwrap();

        let loaded = store.load_queued_operations().unwrap();
        let bucket = &loaded.thread_queue["thread1"];
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].operation, mock_operation("msg1"));
        assert_eq!(bucket[1].operation, mock_operation("msg2"));
        assert_eq!(loaded.membership_queue["thread2"]["user1"].len(), 1);
    }

    #[test]
    fn clear_and_prune_delete_rows() {
        let store = SqliteOperationsStore::open_in_memory().unwrap();
        let thread1 = QueueCondition::Thread {
            thread_id: "thread1".into(),
        };
        store
            .apply_operations(&[
                add_op(thread1.clone(), "msg1", 99),
                add_op(thread1.clone(), "msg2", 100),
                add_op(
                    QueueCondition::Entry {
                        entry_id: "entry1".into(),
                    },
                    "msg3",
                    50,
                ),
            ])
            .unwrap();

        store
            .apply_operations(&[StoreOperation::PruneQueuedDmOperations { max_timestamp: 100 }])
            .unwrap();
        let loaded = store.load_queued_operations().unwrap();
        assert_eq!(loaded.thread_queue["thread1"].len(), 1);
        assert!(loaded.entry_queue.is_empty());

        store
            .apply_operations(&[StoreOperation::ClearDmOperationsQueue { condition: thread1 }])
            .unwrap();
        let loaded = store.load_queued_operations().unwrap();
        assert!(loaded.thread_queue.is_empty());
    }

    #[test]
    fn shimmed_record_lifecycle() {
        let record = ShimmedDmOperation {
            id: "x".into(),
            op_type: "send_hologram_message".into(),
            operation: json!({
                "type": "send_hologram_message",
                "threadID": "thread123",
            }),
        };
        let store = SqliteOperationsStore::open_in_memory().unwrap();
        store
            .apply_operations(&[StoreOperation::ReplaceDmOperation {
                payload: record.clone(),
            }])
            .unwrap();
        assert_eq!(store.load_shimmed_operations().unwrap(), vec![record]);

        store
            .apply_operations(&[StoreOperation::RemoveDmOperations {
                ids: vec!["x".into()],
            }])
            .unwrap();
        assert!(store.load_shimmed_operations().unwrap().is_empty());
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dm-ops.sqlite");

        {
            let store = SqliteOperationsStore::open(&path).unwrap();
            store
                .apply_operations(&[add_op(
                    QueueCondition::Message {
                        message_id: "msg0".into(),
                    },
                    "msg1",
                    100,
                )])
                .unwrap();
        }

        let store = SqliteOperationsStore::open(&path).unwrap();
        let loaded = store.load_queued_operations().unwrap();
        assert_eq!(loaded.message_queue["msg0"].len(), 1);
    }
}
