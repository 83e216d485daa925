//! The backend as the client sees it: generic collection CRUD plus the
//! per-user read watermarks.

mod http;
mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use consume_common::chat::ConversationId;
use consume_common::identity::UserId;
use consume_common::resource::Resource;

use crate::error::Result;

pub use http::HttpStore;
pub use memory::{MemoryStore, Op};

/// Last-seen instant per conversation, for one user.
pub type Watermarks = HashMap<ConversationId, DateTime<Utc>>;

/// Remote collaborator contract.
///
/// Records travel as JSON; typing happens in the read facade. Implementations
/// must not panic on backend errors, they return them.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All records of a collection, optionally narrowed to one scope value.
    async fn list(&self, resource: Resource, scope: Option<&str>) -> Result<Vec<Value>>;

    async fn create(&self, resource: Resource, record: Value) -> Result<Value>;

    async fn update(&self, resource: Resource, id: &str, patch: Value) -> Result<Value>;

    async fn delete(&self, resource: Resource, id: &str) -> Result<()>;

    /// Every watermark of `user` in one round trip.
    async fn get_watermarks(&self, user: &UserId) -> Result<Watermarks>;

    async fn set_watermark(
        &self,
        user: &UserId,
        conversation: &ConversationId,
        at: DateTime<Utc>,
    ) -> Result<()>;
}
