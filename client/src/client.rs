//! Entry point tying the cache, reads, watermarks and counters together.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use consume_common::chat::ConversationId;
use consume_common::identity::{StoreId, User, UserId};
use consume_common::resource::{Record, Resource};

use crate::cache::TtlCache;
use crate::chat_session::ChatSession;
use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::counters::{CounterAggregator, CounterReport};
use crate::error::Result;
use crate::facade::CachedReads;
use crate::notifications::NotificationFeed;
use crate::polling::{CounterBadges, NotificationBell};
use crate::remote::{HttpStore, RemoteStore};
use crate::watermark::WatermarkStore;

/// Client-side state of one signed-in app instance.
///
/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct MarketClient {
    reads: Arc<CachedReads>,
    watermarks: Arc<WatermarkStore>,
    counters: Arc<CounterAggregator>,
    notifications: Arc<NotificationFeed>,
    clock: Arc<dyn Clock>,
    config: Arc<ClientConfig>,
}

impl MarketClient {
    pub fn new(remote: Arc<dyn RemoteStore>, config: ClientConfig) -> Self {
        Self::with_clock(remote, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        remote: Arc<dyn RemoteStore>,
        config: ClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(TtlCache::with_clock(Arc::clone(&clock)));
        let reads = Arc::new(CachedReads::new(
            Arc::clone(&remote),
            cache,
            config.ttls.clone(),
        ));
        let watermarks = Arc::new(WatermarkStore::new(remote));
        let counters = Arc::new(CounterAggregator::new(
            Arc::clone(&reads),
            Arc::clone(&watermarks),
        ));
        let notifications = Arc::new(NotificationFeed::with_clock(Arc::clone(&clock)));
        Self {
            reads,
            watermarks,
            counters,
            notifications,
            clock,
            config: Arc::new(config),
        }
    }

    /// Client talking to the function server at `config.api_url`.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let remote = Arc::new(HttpStore::new(&config)?);
        tracing::info!("Connecting to {}", config.api_url);
        Ok(Self::new(remote, config))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn notifications(&self) -> &Arc<NotificationFeed> {
        &self.notifications
    }

    pub fn watermarks(&self) -> &Arc<WatermarkStore> {
        &self.watermarks
    }

    pub async fn cached_read<R: Record>(
        &self,
        scope: Option<&str>,
        force_refresh: bool,
    ) -> Result<Arc<Vec<R>>> {
        self.reads.read::<R>(scope, force_refresh).await
    }

    pub fn invalidate(&self, resource: Resource, scope: Option<&str>) {
        self.reads.invalidate(resource, scope);
    }

    pub async fn create<T: Serialize>(&self, resource: Resource, record: &T) -> Result<Value> {
        self.reads.create(resource, record).await
    }

    pub async fn update(&self, resource: Resource, id: &str, patch: Value) -> Result<Value> {
        self.reads.update(resource, id, patch).await
    }

    pub async fn delete(&self, resource: Resource, id: &str) -> Result<()> {
        self.reads.delete(resource, id).await
    }

    pub async fn get_counters(
        &self,
        user: &UserId,
        store: Option<&StoreId>,
        force_refresh: bool,
    ) -> CounterReport {
        self.counters.get_counters(user, store, force_refresh).await
    }

    /// Record that `user` has seen `conversation` up to now.
    ///
    /// Failures are logged, not returned: the next mark retries with a later
    /// instant. The user's cached counters are dropped either way.
    pub async fn mark_conversation_read(&self, user: &UserId, conversation: &ConversationId) {
        let now = self.clock.now();
        if let Err(err) = self.watermarks.set(user, conversation, now).await {
            tracing::warn!("Marking {conversation} read for {user} failed: {err}");
        }
        self.reads.invalidate_counters(user);
    }

    /// Open the conversation between `me` and `other`.
    pub async fn chat(&self, me: User, other: UserId) -> Result<ChatSession> {
        ChatSession::open(self.clone(), me, other).await
    }

    pub fn mount_counter_badges(&self, user: User) -> CounterBadges {
        CounterBadges::mount(self.clone(), user)
    }

    pub fn mount_notification_bell(&self, user: UserId) -> NotificationBell {
        NotificationBell::mount(self.clone(), user)
    }

    /// Drop every cached read.
    pub fn logout(&self) {
        self.reads.clear();
        tracing::info!("Cache cleared on logout");
    }
}
