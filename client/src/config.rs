//! Client configuration.

use std::time::Duration;

use consume_common::resource::Resource;

use crate::error::{ClientError, Result};

/// Default backend location (local function server).
pub const DEFAULT_API_URL: &str = "http://localhost:54321/functions/v1/make-server";

/// Freshness window per cached resource.
///
/// Volatile collections (chats, orders) get short windows, near-static ones
/// (stores, users) long ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTtls {
    pub products: Duration,
    pub stores: Duration,
    pub orders: Duration,
    pub chats: Duration,
    pub users: Duration,
    /// Derived badge counters.
    pub counters: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            products: Duration::from_secs(30),
            stores: Duration::from_secs(60),
            orders: Duration::from_secs(15),
            chats: Duration::from_secs(10),
            users: Duration::from_secs(60),
            counters: Duration::from_secs(15),
        }
    }
}

impl CacheTtls {
    pub fn for_resource(&self, resource: Resource) -> Duration {
        match resource {
            Resource::Products => self.products,
            Resource::Stores => self.stores,
            Resource::Orders => self.orders,
            Resource::Chats => self.chats,
            Resource::Users => self.users,
        }
    }
}

/// Everything the client needs to talk to the backend and schedule refreshes.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the function server, without trailing slash.
    pub api_url: String,
    /// Bearer key sent with every request.
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub ttls: CacheTtls,
    /// Badge counter refresh period.
    pub counters_poll: Duration,
    /// Floating notification refresh period.
    pub notifications_poll: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(10),
            ttls: CacheTtls::default(),
            counters_poll: Duration::from_secs(30),
            notifications_poll: Duration::from_secs(2),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    pub fn with_counters_poll(mut self, period: Duration) -> Self {
        self.counters_poll = period;
        self
    }

    pub fn with_notifications_poll(mut self, period: Duration) -> Self {
        self.notifications_poll = period;
        self
    }

    /// Reject settings that would make the client misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "api_url must be an http(s) URL, got {:?}",
                self.api_url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::Config("request_timeout must be non-zero".into()));
        }
        if self.counters_poll.is_zero() || self.notifications_poll.is_zero() {
            return Err(ClientError::Config("poll periods must be non-zero".into()));
        }
        Ok(())
    }
}
