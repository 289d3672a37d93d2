//! Response cache storage.
//!
//! Entries are type-erased so a single store can hold every CMS resource type;
//! a lookup with the wrong type behaves like a miss.

use std::{any::Any, sync::Arc, time::Duration};

use dashmap::DashMap;
use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use super::config::CacheConfig;

const SOURCE: &str = "cache::store";

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Process-wide response cache with per-entry expiry.
///
/// Each write replaces the whole entry under the shard lock, so readers see
/// either the previous value or the new one. Expired entries are removed with
/// `remove_if`, which re-checks expiry under the lock and therefore never drops
/// a fresher value written in the meantime.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return a clone of the live value stored under `key`.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                if let Some(value) = entry.value.downcast_ref::<T>() {
                    counter!("vitrine_cache_hit_total").increment(1);
                    return Some(value.clone());
                }
                debug!(
                    target = SOURCE,
                    key, "cached value has a different type; treating as miss"
                );
                false
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries
                .remove_if(key, |_, entry| entry.is_expired(Instant::now()));
        }

        counter!("vitrine_cache_miss_total").increment(1);
        None
    }

    /// Store `value` under `key` for `ttl`. A zero `ttl` stores nothing.
    pub fn insert<T>(&self, key: impl Into<String>, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        if ttl.is_zero() {
            return;
        }

        let key = key.into();
        let entry = CacheEntry {
            value: Arc::new(value),
            expires_at: Instant::now() + ttl,
        };

        if !self.config.is_bounded() {
            self.entries.insert(key, entry);
            return;
        }

        if !self.entries.contains_key(&key) {
            self.evict_down_to(self.config.max_entries - 1, None);
        }
        self.entries.insert(key.clone(), entry);

        // Concurrent writers may all have made room for the same slot.
        self.evict_down_to(self.config.max_entries, Some(&key));
    }

    /// Drop one entry. Returns true if something was removed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove every expired entry and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            counter!("vitrine_cache_expired_total").increment(purged as u64);
        }
        purged
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict until at most `limit` entries remain: expired ones first, then
    /// the entry that expires soonest. `keep` is never chosen as a victim.
    fn evict_down_to(&self, limit: usize, keep: Option<&str>) {
        if self.entries.len() <= limit {
            return;
        }

        self.purge_expired();

        while self.entries.len() > limit {
            let soonest = self
                .entries
                .iter()
                .filter(|entry| Some(entry.key().as_str()) != keep)
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());

            let Some(key) = soonest else {
                break;
            };
            if self.entries.remove(&key).is_some() {
                counter!("vitrine_cache_evict_total").increment(1);
                debug!(target = SOURCE, key = %key, "evicted entry to stay within capacity");
            }
        }
    }
}
