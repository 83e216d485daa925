//! Cache-aside reads over the remote collections.
//!
//! Every read goes through [`CachedReads::read`]: a fresh cache entry answers
//! without touching the network, a miss (or a forced refresh) fetches, decodes
//! and stores. Mutations forward to the remote and invalidate the whole
//! resource class on success so no stale scoped variant survives.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use consume_common::identity::UserId;
use consume_common::resource::{Record, Resource};

use crate::cache::TtlCache;
use crate::config::CacheTtls;
use crate::counters::Counters;
use crate::error::{ClientError, Result};
use crate::remote::RemoteStore;

const COUNTERS_PREFIX: &str = "counters:";

/// Cache key of a (resource, scope) read.
pub fn cache_key(resource: Resource, scope: Option<&str>) -> String {
    match scope {
        Some(scope) => format!("{resource}:{scope}"),
        None => resource.as_str().to_string(),
    }
}

pub fn counters_key(user: &UserId) -> String {
    format!("{COUNTERS_PREFIX}{user}")
}

pub struct CachedReads {
    remote: Arc<dyn RemoteStore>,
    cache: Arc<TtlCache>,
    ttls: CacheTtls,
}

impl CachedReads {
    pub fn new(remote: Arc<dyn RemoteStore>, cache: Arc<TtlCache>, ttls: CacheTtls) -> Self {
        Self { remote, cache, ttls }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    /// Records of `R`, optionally narrowed to `scope`.
    ///
    /// Failures are returned and never cached, so the next call retries.
    pub async fn read<R: Record>(
        &self,
        scope: Option<&str>,
        force_refresh: bool,
    ) -> Result<Arc<Vec<R>>> {
        let resource = R::RESOURCE;
        let key = cache_key(resource, scope);
        if !force_refresh {
            if let Some(hit) = self.cache.get::<Vec<R>>(&key) {
                return Ok(hit);
            }
        }

        tracing::debug!("Fetching {key} from remote (forced: {force_refresh})");
        let raw = self.remote.list(resource, scope).await?;
        let records = raw
            .into_iter()
            .map(serde_json::from_value::<R>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ClientError::decode(resource.as_str(), e))?;
        Ok(self.cache.set(key, records, self.ttls.for_resource(resource)))
    }

    /// Drop cached reads of `resource`: one scoped key, or every key of the
    /// class when `scope` is `None`.
    pub fn invalidate(&self, resource: Resource, scope: Option<&str>) {
        match scope {
            Some(_) => {
                self.cache.invalidate(&cache_key(resource, scope));
            }
            None => {
                self.cache.invalidate_pattern(resource.as_str());
            }
        }
    }

    fn invalidate_after_write(&self, resource: Resource) {
        self.cache.invalidate_pattern(resource.as_str());
        if matches!(resource, Resource::Orders | Resource::Chats) {
            self.cache.invalidate_pattern(COUNTERS_PREFIX);
        }
    }

    pub async fn create<T: Serialize>(&self, resource: Resource, record: &T) -> Result<Value> {
        let body = serde_json::to_value(record)
            .map_err(|e| ClientError::decode(resource.as_str(), e))?;
        let created = self.remote.create(resource, body).await?;
        self.invalidate_after_write(resource);
        Ok(created)
    }

    pub async fn update(&self, resource: Resource, id: &str, patch: Value) -> Result<Value> {
        let updated = self.remote.update(resource, id, patch).await?;
        self.invalidate_after_write(resource);
        Ok(updated)
    }

    pub async fn delete(&self, resource: Resource, id: &str) -> Result<()> {
        self.remote.delete(resource, id).await?;
        self.invalidate_after_write(resource);
        Ok(())
    }

    pub fn cached_counters(&self, user: &UserId) -> Option<Arc<Counters>> {
        self.cache.get::<Counters>(&counters_key(user))
    }

    pub fn store_counters(&self, user: &UserId, counters: Counters) {
        self.cache.set(counters_key(user), counters, self.ttls.counters);
    }

    pub fn invalidate_counters(&self, user: &UserId) {
        self.cache.invalidate(&counters_key(user));
    }

    /// Forget everything (logout).
    pub fn clear(&self) {
        self.cache.clear();
    }
}
