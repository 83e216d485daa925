use serde::{Deserialize, Serialize};

use crate::identity::{StoreId, UserId};

/// Public profile of a seller's store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub verified: bool,
    /// Average review rating, 0 when unreviewed.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_reviews: u32,
}

impl Store {
    /// Fold one more review into the running average.
    pub fn record_review(&mut self, stars: u8) {
        let stars = f64::from(stars.clamp(1, 5));
        let total = f64::from(self.total_reviews);
        self.rating = (self.rating * total + stars) / (total + 1.0);
        self.total_reviews += 1;
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user_id == user
    }
}
