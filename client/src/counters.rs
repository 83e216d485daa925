//! Badge counters derived from orders, chats and read watermarks.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use consume_common::chat::Conversation;
use consume_common::identity::{StoreId, UserId};
use consume_common::order::Order;

use crate::facade::CachedReads;
use crate::watermark::{WatermarkSnapshot, WatermarkStore};

/// Numbers shown on the navigation badges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    pub pending_orders_for_seller: usize,
    pub pending_orders_for_buyer: usize,
    pub unread_messages: usize,
}

/// Inputs of a counters computation that can fail independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubRead {
    Orders,
    Chats,
    Watermarks,
}

impl fmt::Display for SubRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubRead::Orders => "orders",
            SubRead::Chats => "chats",
            SubRead::Watermarks => "watermarks",
        })
    }
}

/// Outcome of [`CounterAggregator::get_counters`].
///
/// A non-empty `degraded` list means some inputs were unavailable and the
/// affected counters may read lower than the truth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterReport {
    pub counters: Counters,
    pub degraded: Vec<SubRead>,
    pub from_cache: bool,
}

impl CounterReport {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Messages addressed to `user` newer than their watermark, summed over the
/// conversations `user` takes part in.
pub fn count_unread(
    conversations: &[Conversation],
    user: &UserId,
    watermarks: &WatermarkSnapshot,
) -> usize {
    conversations
        .iter()
        .filter(|c| c.involves(user))
        .map(|c| c.unread_for(user, watermarks.last_seen(&c.id)))
        .sum()
}

pub fn count_pending_for_seller(orders: &[Order], store: Option<&StoreId>) -> usize {
    match store {
        Some(store) => orders.iter().filter(|o| o.is_pending_for_store(store)).count(),
        None => 0,
    }
}

pub fn count_pending_for_buyer(orders: &[Order], buyer: &UserId) -> usize {
    orders.iter().filter(|o| o.is_active_for_buyer(buyer)).count()
}

pub struct CounterAggregator {
    reads: Arc<CachedReads>,
    watermarks: Arc<WatermarkStore>,
}

impl CounterAggregator {
    pub fn new(reads: Arc<CachedReads>, watermarks: Arc<WatermarkStore>) -> Self {
        Self { reads, watermarks }
    }

    /// All three counters for `user` in one batch.
    ///
    /// Orders, chats and watermarks are fetched concurrently. A failed orders
    /// or chats read counts as empty and a failed watermark read falls back to
    /// the local copy; either way the part is listed in
    /// [`CounterReport::degraded`] and the result is not cached.
    pub async fn get_counters(
        &self,
        user: &UserId,
        store: Option<&StoreId>,
        force_refresh: bool,
    ) -> CounterReport {
        if !force_refresh {
            if let Some(counters) = self.reads.cached_counters(user) {
                return CounterReport {
                    counters: *counters,
                    degraded: Vec::new(),
                    from_cache: true,
                };
            }
        }

        let (orders, chats, watermarks) = tokio::join!(
            self.reads.read::<Order>(None, force_refresh),
            self.reads.read::<Conversation>(None, force_refresh),
            self.watermarks.get_all(user),
        );

        let mut degraded = Vec::new();
        let orders = orders.unwrap_or_else(|err| {
            tracing::warn!("Counters for {user}: orders unavailable: {err}");
            degraded.push(SubRead::Orders);
            Arc::default()
        });
        let chats = chats.unwrap_or_else(|err| {
            tracing::warn!("Counters for {user}: chats unavailable: {err}");
            degraded.push(SubRead::Chats);
            Arc::default()
        });
        if watermarks.from_mirror {
            degraded.push(SubRead::Watermarks);
        }

        let counters = Counters {
            pending_orders_for_seller: count_pending_for_seller(&orders, store),
            pending_orders_for_buyer: count_pending_for_buyer(&orders, user),
            unread_messages: count_unread(&chats, user, &watermarks),
        };

        if degraded.is_empty() {
            self.reads.store_counters(user, counters);
        } else {
            tracing::warn!("Counters for {user} degraded ({degraded:?}), not caching");
        }
        tracing::debug!("Counters for {user}: {counters:?}");

        CounterReport {
            counters,
            degraded,
            from_cache: false,
        }
    }
}
