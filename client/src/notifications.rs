//! In-app notification feed, local to this process.
//!
//! Nothing here is delivered to other devices. The feed backs the floating
//! notification bell and the notification center.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use consume_common::chat::ConversationId;
use consume_common::identity::UserId;
use consume_common::order::OrderId;
use consume_common::product::ProductId;

use crate::clock::{Clock, SystemClock};

/// Unread message notifications for the same conversation closer together
/// than this many seconds are collapsed into the first one.
pub const MESSAGE_DEDUP_SECS: i64 = 5;

/// Longest message preview shown before it gets cut.
pub const PREVIEW_CHARS: usize = 50;

/// How long notifications are kept, in days.
pub const RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Order,
    OrderConfirmed,
    PriceAdjusted,
    Message,
    Favorite,
}

/// Screen a notification opens when tapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Orders,
    Messages,
    Store,
}

pub fn screen_for(kind: NotificationKind) -> Screen {
    match kind {
        NotificationKind::Order
        | NotificationKind::OrderConfirmed
        | NotificationKind::PriceAdjusted => Screen::Orders,
        NotificationKind::Message => Screen::Messages,
        NotificationKind::Favorite => Screen::Store,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Order, conversation or product the notification is about.
    pub related_id: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

pub struct NotificationFeed {
    entries: Mutex<Vec<Notification>>,
    clock: Arc<dyn Clock>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            clock,
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an unread notification and return it.
    pub fn push(
        &self,
        user: &UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        related_id: impl Into<String>,
    ) -> Notification {
        let now = self.clock.now();
        let notification = Notification {
            id: format!("notif-{}-{:x}", now.timestamp_millis(), rand::random::<u32>()),
            user_id: user.clone(),
            kind,
            title: title.into(),
            message: message.into(),
            related_id: related_id.into(),
            created_at: now,
            read: false,
        };
        tracing::info!("Notification {:?} for {user}: {}", kind, notification.title);
        self.entries().push(notification.clone());
        notification
    }

    /// Tell the seller a buyer placed an order.
    pub fn notify_new_order(
        &self,
        store_owner: &UserId,
        buyer_name: &str,
        order: &OrderId,
        total: f64,
    ) -> Notification {
        self.push(
            store_owner,
            NotificationKind::Order,
            "New order received",
            format!("{buyer_name} placed an order for Q {total:.2}"),
            order.0.clone(),
        )
    }

    /// Tell the buyer the seller confirmed, possibly at a different price.
    pub fn notify_order_confirmed(
        &self,
        buyer: &UserId,
        store_name: &str,
        order: &OrderId,
        price_adjusted: bool,
    ) -> Notification {
        let (kind, title, message) = if price_adjusted {
            (
                NotificationKind::PriceAdjusted,
                "Price adjusted",
                format!("{store_name} confirmed your order with a new price. Check the details."),
            )
        } else {
            (
                NotificationKind::OrderConfirmed,
                "Order confirmed",
                format!("{store_name} confirmed your order. Arrange the delivery."),
            )
        };
        self.push(buyer, kind, title, message, order.0.clone())
    }

    /// Tell `receiver` about a new chat message.
    ///
    /// Returns `None` when an unread notification for the same conversation
    /// was raised within [`MESSAGE_DEDUP_SECS`].
    pub fn notify_new_message(
        &self,
        receiver: &UserId,
        sender_name: &str,
        conversation: &ConversationId,
        text: &str,
    ) -> Option<Notification> {
        let now = self.clock.now();
        let recent = self.entries().iter().any(|n| {
            &n.user_id == receiver
                && n.kind == NotificationKind::Message
                && n.related_id == conversation.as_str()
                && !n.read
                && now - n.created_at < Duration::seconds(MESSAGE_DEDUP_SECS)
        });
        if recent {
            tracing::debug!("Skipping message notification for {receiver} in {conversation}");
            return None;
        }
        Some(self.push(
            receiver,
            NotificationKind::Message,
            format!("Message from {sender_name}"),
            preview(text),
            conversation.as_str(),
        ))
    }

    /// Tell the seller someone saved one of their products.
    pub fn notify_product_favorited(
        &self,
        store_owner: &UserId,
        user_name: &str,
        product: &ProductId,
        product_title: &str,
    ) -> Notification {
        self.push(
            store_owner,
            NotificationKind::Favorite,
            "Product added to favorites",
            format!("{user_name} liked \"{product_title}\""),
            product.0.clone(),
        )
    }

    /// Unread notifications of `user`, newest first.
    pub fn unread_for(&self, user: &UserId) -> Vec<Notification> {
        let mut unread: Vec<_> = self
            .entries()
            .iter()
            .filter(|n| &n.user_id == user && !n.read)
            .cloned()
            .collect();
        unread.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        unread
    }

    pub fn unread_count(&self, user: &UserId) -> usize {
        self.entries()
            .iter()
            .filter(|n| &n.user_id == user && !n.read)
            .count()
    }

    /// Returns whether a notification with that id existed.
    pub fn mark_read(&self, id: &str) -> bool {
        match self.entries().iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&self, user: &UserId) {
        for n in self.entries().iter_mut().filter(|n| &n.user_id == user) {
            n.read = true;
        }
    }

    /// Drop notifications older than `age`. Returns how many were removed.
    pub fn prune_older_than(&self, age: Duration) -> usize {
        let cutoff = self.clock.now() - age;
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|n| n.created_at > cutoff);
        before - entries.len()
    }

    pub fn prune(&self) -> usize {
        self.prune_older_than(Duration::days(RETENTION_DAYS))
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn feed() -> (NotificationFeed, ManualClock) {
        let clock = ManualClock::default();
        (NotificationFeed::with_clock(Arc::new(clock.clone())), clock)
    }

    fn conv() -> ConversationId {
        ConversationId::between(&UserId::new("a"), &UserId::new("b"))
    }

    #[test]
    fn message_notifications_collapse_within_window() {
        let (feed, clock) = feed();
        let b = UserId::new("b");
        assert!(feed.notify_new_message(&b, "Ana", &conv(), "hola").is_some());
        clock.advance(Duration::seconds(4));
        assert!(feed.notify_new_message(&b, "Ana", &conv(), "¿sigue disponible?").is_none());
        clock.advance(Duration::seconds(2));
        assert!(feed.notify_new_message(&b, "Ana", &conv(), "hola?").is_some());
        assert_eq!(feed.unread_count(&b), 2);
    }

    #[test]
    fn read_notification_does_not_suppress_next() {
        let (feed, _) = feed();
        let b = UserId::new("b");
        let first = feed.notify_new_message(&b, "Ana", &conv(), "hola").unwrap();
        assert!(feed.mark_read(&first.id));
        assert!(feed.notify_new_message(&b, "Ana", &conv(), "hola").is_some());
    }

    #[test]
    fn long_previews_are_cut() {
        let text = "ñ".repeat(60);
        let cut = preview(&text);
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(preview("corto"), "corto");
    }

    #[test]
    fn unread_is_newest_first_and_mark_all_read_clears() {
        let (feed, clock) = feed();
        let seller = UserId::new("s");
        feed.notify_new_order(&seller, "Luis", &OrderId("o1".into()), 12.5);
        clock.advance(Duration::seconds(1));
        let second = feed.notify_order_confirmed(&seller, "Tienda", &OrderId("o2".into()), true);
        assert_eq!(second.kind, NotificationKind::PriceAdjusted);

        let unread = feed.unread_for(&seller);
        assert_eq!(unread.len(), 2);
        assert_eq!(unread[0].related_id, "o2");
        assert!(unread[1].message.contains("Q 12.50"));

        feed.mark_all_read(&seller);
        assert!(feed.unread_for(&seller).is_empty());
    }

    #[test]
    fn prune_drops_week_old_entries() {
        let (feed, clock) = feed();
        let u = UserId::new("u");
        feed.notify_product_favorited(&u, "Eva", &ProductId("p1".into()), "Tamales");
        clock.advance(Duration::days(7) + Duration::seconds(1));
        feed.notify_product_favorited(&u, "Eva", &ProductId("p2".into()), "Atol");
        assert_eq!(feed.prune(), 1);
        assert_eq!(feed.unread_count(&u), 1);
    }

    #[test]
    fn screens_by_kind() {
        assert_eq!(screen_for(NotificationKind::PriceAdjusted), Screen::Orders);
        assert_eq!(screen_for(NotificationKind::Message), Screen::Messages);
        assert_eq!(screen_for(NotificationKind::Favorite), Screen::Store);
    }
}
