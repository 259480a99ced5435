//! Error types for parley-dm-ops
//!
//! The queue store, codec, and reducer are total and never fail; errors only
//! arise at the persistence boundary (database access, JSON serialization,
//! malformed stored records).

use thiserror::Error;

/// Result type alias for DM operation store operations
pub type Result<T> = std::result::Result<T, DmOpsError>;

/// Errors from the DM operation store persistence boundary
#[derive(Error, Debug)]
pub enum DmOpsError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored record that cannot be mapped back into the store
    #[error("Malformed record: {0}")]
    MalformedRecord(String),
}

impl From<serde_json::Error> for DmOpsError {
    fn from(err: serde_json::Error) -> Self {
        DmOpsError::Serialization(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DmOpsError {
    fn from(err: rusqlite::Error) -> Self {
        DmOpsError::Database(err.to_string())
    }
}
