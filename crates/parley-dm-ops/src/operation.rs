//! DM operation vocabulary
//!
//! A DM operation is a peer-to-peer messaging action exchanged directly
//! between client devices. The queue treats operations as opaque values: it
//! reads the type tag and the embedded identifiers used for bucket keys, and
//! never interprets payload semantics.

use serde::{Deserialize, Serialize};

/// Type tag of persisted operation records whose contents this client has
/// since learned to interpret. The load-time filter surfaces only records
/// carrying this tag into the in-memory shimmed list; records with any other
/// tag remain unrecognized and stay on disk.
pub const UNSHIMMED_OPERATION_TYPE: &str = "unshimmed";

/// Whether a reaction is being added or removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionAction {
    AddReaction,
    RemoveReaction,
}

/// A device-to-device messaging operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DmOperation {
    CreateThread {
        thread_id: String,
        creator_id: String,
        time: i64,
        thread_type: String,
        member_ids: Vec<String>,
    },
    CreateSidebar {
        thread_id: String,
        creator_id: String,
        time: i64,
        parent_thread_id: String,
        source_message_id: String,
        member_ids: Vec<String>,
    },
    SendTextMessage {
        thread_id: String,
        creator_id: String,
        time: i64,
        message_id: String,
        text: String,
    },
    SendReactionMessage {
        thread_id: String,
        creator_id: String,
        time: i64,
        message_id: String,
        target_message_id: String,
        reaction: String,
        action: ReactionAction,
    },
    SendEditMessage {
        thread_id: String,
        creator_id: String,
        time: i64,
        message_id: String,
        target_message_id: String,
        text: String,
    },
    AddMembers {
        thread_id: String,
        editor_id: String,
        time: i64,
        message_id: String,
        added_user_ids: Vec<String>,
    },
    JoinThread {
        thread_id: String,
        editor_id: String,
        time: i64,
        message_id: String,
    },
    LeaveThread {
        thread_id: String,
        editor_id: String,
        time: i64,
        message_id: String,
    },
    ChangeThreadSettings {
        thread_id: String,
        editor_id: String,
        time: i64,
        message_ids_prefix: String,
        changes: serde_json::Value,
    },
    ChangeThreadReadStatus {
        thread_id: String,
        creator_id: String,
        time: i64,
        unread: bool,
    },
    CreateEntry {
        thread_id: String,
        creator_id: String,
        time: i64,
        entry_id: String,
        entry_date: String,
        text: String,
        message_id: String,
    },
    DeleteEntry {
        thread_id: String,
        creator_id: String,
        time: i64,
        entry_id: String,
        entry_date: String,
        prev_text: String,
        message_id: String,
    },
    EditEntry {
        thread_id: String,
        creator_id: String,
        time: i64,
        entry_id: String,
        entry_date: String,
        text: String,
        message_id: String,
    },
}

impl DmOperation {
    /// The serialized type tag of this operation.
    pub fn op_type(&self) -> &'static str {
        match self {
            DmOperation::CreateThread { .. } => "create_thread",
            DmOperation::CreateSidebar { .. } => "create_sidebar",
            DmOperation::SendTextMessage { .. } => "send_text_message",
            DmOperation::SendReactionMessage { .. } => "send_reaction_message",
            DmOperation::SendEditMessage { .. } => "send_edit_message",
            DmOperation::AddMembers { .. } => "add_members",
            DmOperation::JoinThread { .. } => "join_thread",
            DmOperation::LeaveThread { .. } => "leave_thread",
            DmOperation::ChangeThreadSettings { .. } => "change_thread_settings",
            DmOperation::ChangeThreadReadStatus { .. } => "change_thread_read_status",
            DmOperation::CreateEntry { .. } => "create_entry",
            DmOperation::DeleteEntry { .. } => "delete_entry",
            DmOperation::EditEntry { .. } => "edit_entry",
        }
    }

    /// The thread this operation targets.
    pub fn thread_id(&self) -> &str {
        match self {
            DmOperation::CreateThread { thread_id, .. }
            | DmOperation::CreateSidebar { thread_id, .. }
            | DmOperation::SendTextMessage { thread_id, .. }
            | DmOperation::SendReactionMessage { thread_id, .. }
            | DmOperation::SendEditMessage { thread_id, .. }
            | DmOperation::AddMembers { thread_id, .. }
            | DmOperation::JoinThread { thread_id, .. }
            | DmOperation::LeaveThread { thread_id, .. }
            | DmOperation::ChangeThreadSettings { thread_id, .. }
            | DmOperation::ChangeThreadReadStatus { thread_id, .. }
            | DmOperation::CreateEntry { thread_id, .. }
            | DmOperation::DeleteEntry { thread_id, .. }
            | DmOperation::EditEntry { thread_id, .. } => thread_id,
        }
    }

    /// The device actor that originated this operation.
    pub fn actor_id(&self) -> &str {
        match self {
            DmOperation::CreateThread { creator_id, .. }
            | DmOperation::CreateSidebar { creator_id, .. }
            | DmOperation::SendTextMessage { creator_id, .. }
            | DmOperation::SendReactionMessage { creator_id, .. }
            | DmOperation::SendEditMessage { creator_id, .. }
            | DmOperation::ChangeThreadReadStatus { creator_id, .. }
            | DmOperation::CreateEntry { creator_id, .. }
            | DmOperation::DeleteEntry { creator_id, .. }
            | DmOperation::EditEntry { creator_id, .. } => creator_id,
            DmOperation::AddMembers { editor_id, .. }
            | DmOperation::JoinThread { editor_id, .. }
            | DmOperation::LeaveThread { editor_id, .. }
            | DmOperation::ChangeThreadSettings { editor_id, .. } => editor_id,
        }
    }

    /// The operation's logical timestamp.
    pub fn time(&self) -> i64 {
        match self {
            DmOperation::CreateThread { time, .. }
            | DmOperation::CreateSidebar { time, .. }
            | DmOperation::SendTextMessage { time, .. }
            | DmOperation::SendReactionMessage { time, .. }
            | DmOperation::SendEditMessage { time, .. }
            | DmOperation::AddMembers { time, .. }
            | DmOperation::JoinThread { time, .. }
            | DmOperation::LeaveThread { time, .. }
            | DmOperation::ChangeThreadSettings { time, .. }
            | DmOperation::ChangeThreadReadStatus { time, .. }
            | DmOperation::CreateEntry { time, .. }
            | DmOperation::DeleteEntry { time, .. }
            | DmOperation::EditEntry { time, .. } => *time,
        }
    }
}

/// An operation persisted verbatim because this client build does not
/// recognize its type tag. The structured value is kept untouched so a later
/// build can reprocess it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShimmedDmOperation {
    pub id: String,
    pub op_type: String,
    pub operation: serde_json::Value,
}
