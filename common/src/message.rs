use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::ConversationId;
use crate::identity::UserId;

/// Unique identifier for a message. Assigned by the backend on persist;
/// optimistic messages carry a provisional id until the reload replaces them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

/// A direct message between two users.
///
/// Messages live inside their conversation and are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Whether `user` has yet to see this message given their watermark.
    ///
    /// A missing watermark means nothing was ever seen. A message stamped
    /// exactly at the watermark counts as seen.
    pub fn is_unread_for(&self, user: &UserId, last_seen: Option<DateTime<Utc>>) -> bool {
        if &self.receiver_id != user {
            return false;
        }
        match last_seen {
            None => true,
            Some(seen) => self.timestamp > seen,
        }
    }

    pub fn involves(&self, user: &UserId) -> bool {
        &self.sender_id == user || &self.receiver_id == user
    }
}
