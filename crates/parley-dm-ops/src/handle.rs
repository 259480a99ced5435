//! Transactional queue handle
//!
//! The reducer computes a new store value and the operations needed to make
//! it durable, but leaves committing the two together to the caller. This
//! handle makes that two-phase commit explicit: the storage transaction
//! happens first, and the in-memory value is replaced only after it
//! succeeds, so memory and disk never diverge.

use crate::error::Result;
use crate::queue::QueuedDmOperations;
use crate::reducer::{reduce, QueueAction};
use crate::storage::OperationsStore;

/// Owns the in-memory store and its storage backend, applying actions
/// through the reducer with persist-before-commit ordering.
pub struct DmQueueHandle<S> {
    store: QueuedDmOperations,
    storage: S,
}

impl<S: OperationsStore> DmQueueHandle<S> {
    /// Reconstruct the store from storage at startup.
    pub fn load(storage: S) -> Result<Self> {
        let queued = storage.load_queued_operations()?;
        let operations = storage.load_shimmed_operations()?;
        let result = reduce(
            QueuedDmOperations::new(),
            &QueueAction::ReplaceStore { queued, operations },
        );
        Ok(Self {
            store: result.store,
            storage,
        })
    }

    /// Start from an empty store over an empty storage backend.
    pub fn new(storage: S) -> Self {
        Self {
            store: QueuedDmOperations::new(),
            storage,
        }
    }

    /// The current store value. Successive references are to distinct values
    /// after each successful [`Self::apply`], so callers can detect change
    /// by structural comparison.
    pub fn store(&self) -> &QueuedDmOperations {
        &self.store
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Run one action through the reducer, persist the emitted operations as
    /// one atomic batch, and only then commit the new store value in memory.
    /// If the storage write fails the in-memory store keeps its previous
    /// value and the error is returned.
    pub fn apply(&mut self, action: &QueueAction) -> Result<&QueuedDmOperations> {
        let result = reduce(self.store.clone(), action);
        if !result.operations.is_empty() {
            self.storage.apply_operations(&result.operations)?;
        }
        self.store = result.store;
        Ok(&self.store)
    }
}
