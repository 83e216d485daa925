use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::StoreId;

/// Unique product identifier (timestamp-based, assigned by the backend).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

/// A product listing in a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "in_stock_default")]
    pub in_stock: bool,
    /// Temporary "product of the day" listing.
    #[serde(default)]
    pub is_product_of_the_day: bool,
    /// End of the day a product of the day was listed on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

fn in_stock_default() -> bool {
    true
}

impl Product {
    /// A product of the day stops being offered once it expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_product_of_the_day && self.expires_at.is_some_and(|at| now > at)
    }

    /// Listed and not expired.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.in_stock && !self.is_expired(now)
    }
}
