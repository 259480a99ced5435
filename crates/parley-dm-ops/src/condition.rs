//! Queue conditions
//!
//! A condition names the causal dependency that keeps a DM operation from
//! being applied: a thread, calendar entry, or message record that does not
//! exist locally yet, or a specific user's membership in a thread. Each
//! condition selects the bucket the operation waits in.

use serde::{Deserialize, Serialize};

use crate::error::{DmOpsError, Result};

/// Separator used to compose the membership flat-record key.
///
/// Thread and user IDs are opaque identifiers that never contain `#`, so the
/// composed key splits back unambiguously.
pub const MEMBERSHIP_KEY_SEPARATOR: char = '#';

/// Why a DM operation is waiting in the queue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QueueCondition {
    /// Blocked on a thread record not yet existing locally
    Thread { thread_id: String },
    /// Blocked on a calendar-entry record
    Entry { entry_id: String },
    /// Blocked on a parent message record
    Message { message_id: String },
    /// Blocked on a specific user's membership record within a thread
    Membership { thread_id: String, user_id: String },
}

/// The variant discriminant of a [`QueueCondition`], used as the `queue_type`
/// column of flat storage records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Thread,
    Entry,
    Message,
    Membership,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::Thread => "thread",
            ConditionKind::Entry => "entry",
            ConditionKind::Message => "message",
            ConditionKind::Membership => "membership",
        }
    }
}

impl std::str::FromStr for ConditionKind {
    type Err = DmOpsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "thread" => Ok(ConditionKind::Thread),
            "entry" => Ok(ConditionKind::Entry),
            "message" => Ok(ConditionKind::Message),
            "membership" => Ok(ConditionKind::Membership),
            other => Err(DmOpsError::MalformedRecord(format!(
                "unknown queue type: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl QueueCondition {
    /// The variant discriminant of this condition.
    pub fn kind(&self) -> ConditionKind {
        match self {
            QueueCondition::Thread { .. } => ConditionKind::Thread,
            QueueCondition::Entry { .. } => ConditionKind::Entry,
            QueueCondition::Message { .. } => ConditionKind::Message,
            QueueCondition::Membership { .. } => ConditionKind::Membership,
        }
    }

    /// The flat-record key for this condition's bucket. Membership composes
    /// both IDs into a single key.
    pub fn queue_key(&self) -> String {
        match self {
            QueueCondition::Thread { thread_id } => thread_id.clone(),
            QueueCondition::Entry { entry_id } => entry_id.clone(),
            QueueCondition::Message { message_id } => message_id.clone(),
            QueueCondition::Membership { thread_id, user_id } => {
                format!("{}{}{}", thread_id, MEMBERSHIP_KEY_SEPARATOR, user_id)
            }
        }
    }

    /// Recover a condition from a stored `(queue_type, queue_key)` pair.
    pub fn from_queue_parts(kind: ConditionKind, key: &str) -> Result<Self> {
        match kind {
            ConditionKind::Thread => Ok(QueueCondition::Thread {
                thread_id: key.to_string(),
            }),
            ConditionKind::Entry => Ok(QueueCondition::Entry {
                entry_id: key.to_string(),
            }),
            ConditionKind::Message => Ok(QueueCondition::Message {
                message_id: key.to_string(),
            }),
            ConditionKind::Membership => {
                let (thread_id, user_id) =
                    key.split_once(MEMBERSHIP_KEY_SEPARATOR).ok_or_else(|| {
                        DmOpsError::MalformedRecord(format!(
                            "membership queue key missing separator: {}",
                            key
                        ))
                    })?;
                Ok(QueueCondition::Membership {
                    thread_id: thread_id.to_string(),
                    user_id: user_id.to_string(),
                })
            }
        }
    }
}
