//! Pruning policy
//!
//! Queued operations wait for a causal dependency that may never arrive
//! (the peer that should deliver it may be gone for good), so the queue is
//! swept periodically and entries past the TTL are dropped. The schedule is
//! owned by the platform's maintenance task; this module only supplies the
//! policy constants and the cutoff computation it feeds into
//! [`crate::reducer::QueueAction::PruneQueue`].

use std::time::Duration;

use chrono::{DateTime, Utc};

/// How long a queued operation may wait before it is pruned.
pub const QUEUED_OPERATION_TTL: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// Cadence of the periodic pruning sweep.
pub const PRUNING_FREQUENCY: Duration = Duration::from_secs(60 * 60);

/// Delay before the first sweep after startup, so launch work settles first.
pub const FIRST_PRUNING_DELAY: Duration = Duration::from_secs(10 * 60);

/// The `max_timestamp` for a pruning sweep at `now`: entries enqueued before
/// this instant are dropped, entries at or after it are kept.
pub fn prune_cutoff(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis() - QUEUED_OPERATION_TTL.as_millis() as i64
}
