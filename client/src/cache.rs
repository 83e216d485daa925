//! Process-local TTL cache.
//!
//! Entries expire lazily: an expired entry is purged by the `get` that
//! notices it, there is no background sweep. Values are handed out as
//! `Arc<T>` so callers share the cached copy read-only.
//!
//! Keys are plain strings, `"<resource>"` or `"<resource>:<scope>"`. Pattern
//! invalidation removes every key containing a substring, which lets one
//! mutation drop all scoped variants of a collection without the cache
//! knowing anything about resources.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    stored_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    /// Age strictly beyond the TTL. A clock that went backwards reads as fresh.
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (now - self.stored_at).to_std() {
            Ok(age) => age > self.ttl,
            Err(_) => false,
        }
    }
}

pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    // The lock is never held across an await, so a poisoned map is still
    // consistent; keep serving it.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh value stored under `key`, or `None` when absent or expired.
    ///
    /// An entry of another type is reported as absent.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let now = self.clock.now();
        let mut entries = self.entries();
        let entry = entries.get(key)?;
        if entry.is_expired(now) {
            entries.remove(key);
            tracing::trace!("Cache expired for {key:?}");
            return None;
        }
        let age = (now - entry.stored_at).num_milliseconds();
        match Arc::clone(&entry.value).downcast::<T>() {
            Ok(value) => {
                tracing::debug!("Cache hit for {key:?} (age {age}ms)");
                Some(value)
            }
            Err(_) => {
                tracing::warn!(
                    "Cache entry {key:?} holds a different type than {}",
                    std::any::type_name::<T>()
                );
                None
            }
        }
    }

    /// Store `value` under `key`, replacing any entry and restarting its age.
    pub fn set<T: Any + Send + Sync>(
        &self,
        key: impl Into<String>,
        value: T,
        ttl: Duration,
    ) -> Arc<T> {
        let value = Arc::new(value);
        self.set_shared(key, Arc::clone(&value), ttl);
        value
    }

    pub fn set_shared<T: Any + Send + Sync>(
        &self,
        key: impl Into<String>,
        value: Arc<T>,
        ttl: Duration,
    ) {
        let key = key.into();
        tracing::debug!("Cache set for {key:?} (ttl {}s)", ttl.as_secs_f32());
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
            ttl,
        };
        self.entries().insert(key, entry);
    }

    /// Remove one entry. Returns whether anything was removed.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.entries().remove(key).is_some();
        if removed {
            tracing::debug!("Cache invalidated {key:?}");
        }
        removed
    }

    /// Remove every entry whose key contains `pattern`. Returns the count.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !key.contains(pattern));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!("Cache invalidated {removed} entries matching {pattern:?}");
        }
        removed
    }

    /// Drop everything (logout).
    pub fn clear(&self) {
        self.entries().clear();
        tracing::debug!("Cache cleared");
    }

    /// Number of stored entries, expired ones included until next touched.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}
