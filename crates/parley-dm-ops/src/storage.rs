//! Storage engine call contract
//!
//! The queue core never performs I/O; this trait is the seam through which
//! the emitted store operations reach durable storage and through which the
//! store is reconstructed at startup.

use crate::error::Result;
use crate::operation::ShimmedDmOperation;
use crate::queue::QueuedDmOperations;
use crate::store_ops::StoreOperation;

/// The trait that all storage backends implement.
pub trait OperationsStore: Send + Sync {
    /// Durably commit a batch of store operations as a single atomic unit.
    /// Either every operation in the batch is applied or none is.
    fn apply_operations(&self, ops: &[StoreOperation]) -> Result<()>;

    /// Rebuild the four keyed partitions from stored rows, preserving
    /// intra-bucket arrival order. The shimmed list comes back empty; it is
    /// loaded separately via [`Self::load_shimmed_operations`] so the caller
    /// can apply the load-time type filter.
    fn load_queued_operations(&self) -> Result<QueuedDmOperations>;

    /// Load every persisted operation record, in stored order.
    fn load_shimmed_operations(&self) -> Result<Vec<ShimmedDmOperation>>;
}
