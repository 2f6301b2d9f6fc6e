use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use shared::Result;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tenant_cache::{InvalidationPattern, KeyValueStore};

use crate::MAX_ENTRY_TTL;

#[derive(Clone)]
struct StoredEntry {
    payload: Arc<[u8]>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, StoredEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-based in-process store with per-entry TTL and key enumeration.
///
/// Suitable when a single process owns the cache; every key lives here, so
/// scans are complete.
pub struct MokaStore {
    cache: Cache<String, StoredEntry>,
}

impl MokaStore {
    /// Create a new unbounded Moka store
    pub fn new_unbounded() -> Self {
        Self::new("tenant-cache", None)
    }

    /// Create a new bounded Moka store with max entries
    pub fn new_bounded(max_entries: u64) -> Self {
        Self::new("tenant-cache", Some(max_entries))
    }

    /// Create a Moka store from name and optional capacity
    pub fn new(name: &str, max_entries: Option<u64>) -> Self {
        let mut builder = Cache::builder().name(name).expire_after(PerEntryTtl);

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            cache: builder.build(),
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl KeyValueStore for MokaStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        // Either doesn't exist or TTL expired
        Ok(self.cache.get(key).await.map(|entry| entry.payload.to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let entry = StoredEntry {
            payload: value.into(),
            ttl: ttl.min(MAX_ENTRY_TTL),
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn scan(&self, pattern: &InvalidationPattern) -> Result<Vec<String>> {
        Ok(self
            .cache
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .map(|(key, _)| key.to_string())
            .collect())
    }

    fn name(&self) -> &'static str {
        "moka"
    }
}

impl Debug for MokaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStore")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}
