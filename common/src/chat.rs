use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::message::Message;

/// Joins the two sorted participant ids of a conversation.
pub const CONVERSATION_ID_SEPARATOR: char = '_';

/// Identity of a two-party conversation.
///
/// Built from the sorted participant ids so both sides resolve to the same
/// key no matter who opened the chat.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn between(a: &UserId, b: &UserId) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{first}{CONVERSATION_ID_SEPARATOR}{second}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A conversation as stored by the backend (`chats` resource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// True when `user` sent or received at least one message here.
    pub fn involves(&self, user: &UserId) -> bool {
        self.messages.iter().any(|m| m.involves(user))
    }

    /// Number of messages addressed to `user` newer than their watermark.
    pub fn unread_for(&self, user: &UserId, last_seen: Option<DateTime<Utc>>) -> usize {
        self.messages
            .iter()
            .filter(|m| m.is_unread_for(user, last_seen))
            .count()
    }

    /// Messages in display order (ascending timestamp). Transport order is
    /// not trusted.
    pub fn into_display_order(self) -> Vec<Message> {
        let mut messages = self.messages;
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        messages
    }

    /// The most recent message, if any.
    pub fn latest(&self) -> Option<&Message> {
        self.messages.iter().max_by_key(|m| m.timestamp)
    }
}

/// Body of a send: what the client posts to the `chats` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub message: Message,
}
