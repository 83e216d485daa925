//! One open conversation view and its optimistic send path.
//!
//! A send appends a provisional message right away, persists it, then
//! replaces the whole list with what the backend reports. Provisional
//! messages are never merged with server ones; the reload drops them.

use chrono::{DateTime, Utc};

use consume_common::chat::{Conversation, ConversationId, NewMessage};
use consume_common::identity::{User, UserId};
use consume_common::message::{Message, MessageId};
use consume_common::resource::Resource;

use crate::client::MarketClient;
use crate::error::Result;

/// Where the last send is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    /// Nothing in flight.
    Composing,
    /// Provisional message shown, remote write pending.
    Optimistic,
    /// Remote write acknowledged; the provisional message is gone.
    Committed,
    /// Remote write failed; the list shows only what the backend has.
    RolledBack,
}

fn provisional_id(now: DateTime<Utc>) -> MessageId {
    MessageId(format!(
        "local-{}-{:x}",
        now.timestamp_millis(),
        rand::random::<u64>()
    ))
}

pub fn is_provisional(message: &Message) -> bool {
    message.id.0.starts_with("local-")
}

pub struct ChatSession {
    client: MarketClient,
    me: User,
    other: UserId,
    conversation: ConversationId,
    messages: Vec<Message>,
    draft: String,
    phase: SendPhase,
}

impl ChatSession {
    /// Load the conversation between `me` and `other` and mark it read.
    pub async fn open(client: MarketClient, me: User, other: UserId) -> Result<Self> {
        let conversation = ConversationId::between(&me.id, &other);
        let mut session = Self {
            client,
            me,
            other,
            conversation,
            messages: Vec::new(),
            draft: String::new(),
            phase: SendPhase::Composing,
        };
        session.reload().await?;
        session.mark_read().await;
        tracing::info!("Opened chat {} for {}", session.conversation, session.me.id);
        Ok(session)
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation
    }

    /// Messages in display order (ascending timestamp).
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> SendPhase {
        self.phase
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Send whatever is in the draft.
    pub async fn send_draft(&mut self) -> Result<()> {
        let text = std::mem::take(&mut self.draft);
        self.send(&text).await
    }

    /// Send `text` to the other participant.
    ///
    /// Blank text is ignored. Once the write resolves the provisional message
    /// is gone: the list is reloaded from the backend, or, when that reload
    /// fails, keeps only what was last loaded. A failed write is returned so
    /// the caller can show it.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let now = self.client.clock().now();
        let provisional = Message {
            id: provisional_id(now),
            conversation_id: self.conversation.clone(),
            sender_id: self.me.id.clone(),
            receiver_id: self.other.clone(),
            text: text.to_string(),
            timestamp: now,
        };
        self.messages.push(provisional.clone());
        self.draft.clear();
        self.phase = SendPhase::Optimistic;

        let body = NewMessage {
            conversation_id: self.conversation.clone(),
            message: provisional.clone(),
        };
        match self.client.create(Resource::Chats, &body).await {
            Ok(_) => {
                self.phase = SendPhase::Committed;
                if let Err(err) = self.reload().await {
                    tracing::warn!("Reload after send in {} failed: {err}", self.conversation);
                    self.messages.retain(|m| m.id != provisional.id);
                }
                self.client.notifications().notify_new_message(
                    &self.other,
                    &self.me.name,
                    &self.conversation,
                    text,
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!("Send in {} failed: {err}", self.conversation);
                self.phase = SendPhase::RolledBack;
                if let Err(reload_err) = self.reload().await {
                    tracing::warn!("Rollback reload in {} failed: {reload_err}", self.conversation);
                    self.messages.retain(|m| m.id != provisional.id);
                }
                Err(err)
            }
        }
    }

    /// Pull the conversation again. When new messages arrived while open,
    /// they are marked read. Returns how many messages were added.
    pub async fn refresh(&mut self) -> Result<usize> {
        let before = self.messages.len();
        self.reload().await?;
        let added = self.messages.len().saturating_sub(before);
        if added > 0 {
            self.mark_read().await;
        }
        Ok(added)
    }

    /// Leave the view, marking everything seen up to now.
    pub async fn close(self) {
        self.mark_read().await;
        tracing::debug!("Closed chat {} for {}", self.conversation, self.me.id);
    }

    async fn mark_read(&self) {
        self.client
            .mark_conversation_read(&self.me.id, &self.conversation)
            .await;
    }

    /// Replace the local list with the backend's, in display order.
    async fn reload(&mut self) -> Result<()> {
        let chats = self.client.cached_read::<Conversation>(None, true).await?;
        self.messages = chats
            .iter()
            .find(|c| c.id == self.conversation)
            .cloned()
            .map(Conversation::into_display_order)
            .unwrap_or_default();
        Ok(())
    }
}
