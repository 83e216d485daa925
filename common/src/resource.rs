use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::chat::Conversation;
use crate::identity::User;
use crate::order::Order;
use crate::product::Product;
use crate::storefront::Store;

/// Remote collections the client reads and mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Products,
    Stores,
    Orders,
    Chats,
    Users,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Products,
        Resource::Stores,
        Resource::Orders,
        Resource::Chats,
        Resource::Users,
    ];

    /// Collection name, used both as the URL path segment and the cache key.
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Products => "products",
            Resource::Stores => "stores",
            Resource::Orders => "orders",
            Resource::Chats => "chats",
            Resource::Users => "users",
        }
    }

    /// Record field a scoped listing filters on.
    pub fn scope_field(self) -> &'static str {
        match self {
            Resource::Products | Resource::Orders => "storeId",
            Resource::Stores => "userId",
            Resource::Chats | Resource::Users => "id",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record type that lives in one remote collection.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const RESOURCE: Resource;
}

impl Record for Product {
    const RESOURCE: Resource = Resource::Products;
}

impl Record for Store {
    const RESOURCE: Resource = Resource::Stores;
}

impl Record for Order {
    const RESOURCE: Resource = Resource::Orders;
}

impl Record for Conversation {
    const RESOURCE: Resource = Resource::Chats;
}

impl Record for User {
    const RESOURCE: Resource = Resource::Users;
}
