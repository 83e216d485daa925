use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A marketplace user's identifier, as assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A store's identifier. Every store is owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(pub String);

impl StoreId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered user. Users become sellers by opening a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub phone: String,
    pub name: String,
    #[serde(default)]
    pub has_store: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<StoreId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// The store to count seller-side orders for, if this user sells.
    pub fn selling_store(&self) -> Option<&StoreId> {
        if self.has_store {
            self.store_id.as_ref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_uses_backend_field_names() {
        let user: User = serde_json::from_str(
            r#"{"id":"u1","phone":"5555","name":"Ana","hasStore":true,"storeId":"s1"}"#,
        )
        .unwrap();
        assert_eq!(user.id, UserId::new("u1"));
        assert_eq!(user.selling_store(), Some(&StoreId::new("s1")));
    }

    #[test]
    fn buyer_has_no_selling_store() {
        let user: User =
            serde_json::from_str(r#"{"id":"u2","phone":"1","name":"Beto","storeId":"s9"}"#)
                .unwrap();
        assert!(!user.has_store);
        assert_eq!(user.selling_store(), None);
    }
}
