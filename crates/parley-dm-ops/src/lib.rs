//! Queued operation store for peer-to-peer DM messaging.
//!
//! DM operations sometimes arrive before something they causally depend on,
//! such as the thread they belong to or the message they react to. This crate
//! keeps those operations in a keyed queue until their dependency is
//! satisfied, and keeps operations a client build cannot yet interpret
//! ("shimmed" operations) persisted until an upgrade can replay them.
//!
//! The pieces:
//!
//! - [`QueuedDmOperations`] is the in-memory store: four keyed partitions
//!   (thread, entry, message, membership) plus the shimmed operation list.
//! - [`reduce`] is a pure function from a store value and a [`QueueAction`]
//!   to a new store value plus the [`StoreOperation`]s that make the change
//!   durable.
//! - [`OperationsStore`] is the storage seam, with in-memory
//!   ([`InMemoryOperationsStore`]) and SQLite ([`SqliteOperationsStore`],
//!   behind the `sqlite` feature) backends.
//! - [`DmQueueHandle`] ties them together: persist first, commit in memory
//!   only after the storage transaction succeeds.

pub mod condition;
pub mod error;
pub mod handle;
pub mod maintenance;
pub mod memory_store;
pub mod operation;
pub mod queue;
pub mod reducer;
pub mod storage;
pub mod store_ops;

#[cfg(feature = "sqlite")]
pub mod sqlite_store;

pub use condition::{ConditionKind, QueueCondition, MEMBERSHIP_KEY_SEPARATOR};
pub use error::{DmOpsError, Result};
pub use handle::DmQueueHandle;
pub use maintenance::{
    prune_cutoff, FIRST_PRUNING_DELAY, PRUNING_FREQUENCY, QUEUED_OPERATION_TTL,
};
pub use memory_store::InMemoryOperationsStore;
pub use operation::{
    DmOperation, ReactionAction, ShimmedDmOperation, UNSHIMMED_OPERATION_TYPE,
};
pub use queue::{OperationsQueue, QueueEntry, QueuedDmOperations};
pub use reducer::{reduce, QueueAction, ReduceResult};
pub use storage::OperationsStore;
pub use store_ops::{
    convert_ops_to_client_db_ops, convert_store_to_ops, process_store_operations,
    translate_client_db_data, ClientDbDmOperation, ClientDbQueuedDmOperation,
    ClientDbStoreOperation, StoreOperation,
};

#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteOperationsStore;
