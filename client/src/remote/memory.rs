//! In-memory backend with failure injection and call counting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;

use consume_common::chat::{Conversation, ConversationId, NewMessage};
use consume_common::identity::UserId;
use consume_common::message::MessageId;
use consume_common::resource::Resource;

use super::{RemoteStore, Watermarks};
use crate::clock::{Clock, SystemClock};
use crate::error::{ClientError, Result};

/// Remote operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List(Resource),
    Create(Resource),
    Update(Resource),
    Delete(Resource),
    GetWatermarks,
    SetWatermark,
}

/// Backend held in process memory.
///
/// Behaves like the hosted function server: posted chat messages get their id
/// and timestamp from the store's clock, other records get an id when they
/// arrive without one, and watermarks are last-write-wins.
pub struct MemoryStore {
    collections: DashMap<Resource, Vec<Value>>,
    watermarks: DashMap<UserId, Watermarks>,
    calls: DashMap<Op, usize>,
    failures: DashMap<Op, ClientError>,
    clock: Arc<dyn Clock>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            collections: DashMap::new(),
            watermarks: DashMap::new(),
            calls: DashMap::new(),
            failures: DashMap::new(),
            clock,
            next_id: AtomicU64::new(1),
        }
    }

    /// Append records to a collection without counting a call.
    pub fn seed<T: Serialize>(
        &self,
        resource: Resource,
        records: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        let values = records
            .into_iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ClientError::decode(resource.as_str(), e))?;
        self.collections.entry(resource).or_default().extend(values);
        Ok(())
    }

    /// Make every call to `op` fail with `err` until [`recover`](Self::recover).
    pub fn fail(&self, op: Op, err: ClientError) {
        self.failures.insert(op, err);
    }

    pub fn recover(&self, op: Op) {
        self.failures.remove(&op);
    }

    /// Calls made to `op`, failed ones included.
    pub fn calls(&self, op: Op) -> usize {
        self.calls.get(&op).map(|n| *n).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    pub fn reset_calls(&self) {
        self.calls.clear();
    }

    /// Snapshot of a collection as stored.
    pub fn records(&self, resource: Resource) -> Vec<Value> {
        self.collections
            .get(&resource)
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn watermark(&self, user: &UserId, conversation: &ConversationId) -> Option<DateTime<Utc>> {
        self.watermarks
            .get(user)
            .and_then(|marks| marks.get(conversation).copied())
    }

    fn begin(&self, op: Op) -> Result<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        match self.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn assign_id(&self) -> String {
        let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{}-{seq}", self.clock.now().timestamp_millis())
    }

    fn post_message(&self, record: Value) -> Result<Value> {
        let NewMessage {
            conversation_id,
            mut message,
        } = serde_json::from_value(record)
            .map_err(|e| ClientError::rejected(Some(400), format!("invalid message: {e}")))?;

        let now = self.clock.now();
        message.id = MessageId(self.assign_id());
        message.timestamp = now;

        let mut chats = self.collections.entry(Resource::Chats).or_default();
        let position = chats
            .iter()
            .position(|c| id_of(c) == Some(conversation_id.as_str()));
        let mut conversation = match position {
            Some(i) => serde_json::from_value::<Conversation>(chats[i].clone())
                .map_err(|e| ClientError::decode("chats", e))?,
            None => Conversation {
                id: conversation_id,
                messages: Vec::new(),
                created_at: Some(now),
            },
        };
        conversation.messages.push(message);
        let value =
            serde_json::to_value(&conversation).map_err(|e| ClientError::decode("chats", e))?;
        match position {
            Some(i) => chats[i] = value.clone(),
            None => chats.push(value.clone()),
        }
        Ok(value)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn id_of(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn not_found(resource: Resource, id: &str) -> ClientError {
    ClientError::rejected(Some(404), format!("{resource} {id} not found"))
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list(&self, resource: Resource, scope: Option<&str>) -> Result<Vec<Value>> {
        self.begin(Op::List(resource))?;
        let records = self.records(resource);
        Ok(match scope {
            None => records,
            Some(scope) => records
                .into_iter()
                .filter(|r| r.get(resource.scope_field()).and_then(Value::as_str) == Some(scope))
                .collect(),
        })
    }

    async fn create(&self, resource: Resource, record: Value) -> Result<Value> {
        self.begin(Op::Create(resource))?;
        if resource == Resource::Chats {
            return self.post_message(record);
        }
        let Value::Object(mut fields) = record else {
            return Err(ClientError::rejected(Some(400), "record must be an object"));
        };
        if !fields.contains_key("id") {
            fields.insert("id".into(), Value::String(self.assign_id()));
        }
        let record = Value::Object(fields);
        self.collections.entry(resource).or_default().push(record.clone());
        Ok(record)
    }

    async fn update(&self, resource: Resource, id: &str, patch: Value) -> Result<Value> {
        self.begin(Op::Update(resource))?;
        let Value::Object(patch) = patch else {
            return Err(ClientError::rejected(Some(400), "patch must be an object"));
        };
        let mut records = self.collections.entry(resource).or_default();
        let record = records
            .iter_mut()
            .find(|r| id_of(r) == Some(id))
            .ok_or_else(|| not_found(resource, id))?;
        if let Value::Object(fields) = record {
            fields.extend(patch);
        }
        Ok(record.clone())
    }

    async fn delete(&self, resource: Resource, id: &str) -> Result<()> {
        self.begin(Op::Delete(resource))?;
        let mut records = self.collections.entry(resource).or_default();
        let before = records.len();
        records.retain(|r| id_of(r) != Some(id));
        if records.len() == before {
            return Err(not_found(resource, id));
        }
        Ok(())
    }

    async fn get_watermarks(&self, user: &UserId) -> Result<Watermarks> {
        self.begin(Op::GetWatermarks)?;
        Ok(self
            .watermarks
            .get(user)
            .map(|marks| marks.clone())
            .unwrap_or_default())
    }

    async fn set_watermark(
        &self,
        user: &UserId,
        conversation: &ConversationId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.begin(Op::SetWatermark)?;
        self.watermarks
            .entry(user.clone())
            .or_default()
            .insert(conversation.clone(), at);
        Ok(())
    }
}
