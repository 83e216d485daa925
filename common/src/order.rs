use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{StoreId, UserId};
use crate::product::ProductId;

/// Unique order identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

/// Order lifecycle as seen by buyer and seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed by the buyer, waiting for the seller.
    Pending,
    /// Accepted by the seller (possibly with an adjusted price).
    Confirmed,
    /// Handed over to the buyer.
    Completed,
    /// Cancelled by either side.
    Cancelled,
}

impl OrderStatus {
    /// Ordinal along the lifecycle. Higher never goes back to lower.
    pub fn ordinal(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Confirmed => 1,
            OrderStatus::Completed => 2,
            OrderStatus::Cancelled => 2,
        }
    }

    /// Returns true if transitioning from self to `next` is valid.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Confirmed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Confirmed, OrderStatus::Completed)
                | (OrderStatus::Confirmed, OrderStatus::Cancelled)
        )
    }

    /// Still needs attention from the buyer (badge on the profile screen).
    pub fn is_active(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price at the time the order was placed.
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_image_index: Option<u32>,
}

/// An order placed by a buyer with a single store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub store_id: StoreId,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_notes: Option<String>,
    /// Total set by the seller on confirmation when it differs from `total`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_total: Option<f64>,
}

impl Order {
    /// Waiting for `store` to confirm.
    pub fn is_pending_for_store(&self, store: &StoreId) -> bool {
        &self.store_id == store && self.status == OrderStatus::Pending
    }

    /// Still open from the point of view of `buyer`.
    pub fn is_active_for_buyer(&self, buyer: &UserId) -> bool {
        &self.buyer_id == buyer && self.status.is_active()
    }

    /// What the buyer owes: the adjusted total if the seller set one.
    pub fn payable_total(&self) -> f64 {
        self.adjusted_total.unwrap_or(self.total)
    }

    pub fn price_adjusted(&self) -> bool {
        self.adjusted_total.is_some_and(|t| t != self.total)
    }
}
