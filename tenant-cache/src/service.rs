use crate::domain::CacheKey;
use crate::events::{
    now_timestamp, CacheEvent, EntryRemovedEvent, EntryStoredEvent, KeySource,
    PatternInvalidatedEvent,
};
use crate::index::KeyIndex;
use crate::pattern::InvalidationPattern;
use crate::ports::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::config::CacheSettings;
use shared::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Tenant-scoped cache over a distributed key/value store.
///
/// Clones share the store handle and the fallback index, so hand out clones
/// (or an `Arc<TenantCache>`) rather than building one per consumer.
#[derive(Clone)]
pub struct TenantCache {
    // None when the store handle is entirely unavailable (degraded mode)
    store: Option<Arc<dyn KeyValueStore>>,
    index: Arc<KeyIndex>,
    default_ttl_minutes: u64,
    operation_timeout: Option<Duration>,
    event_broadcaster: Option<broadcast::Sender<CacheEvent>>,
}

impl TenantCache {
    pub fn new(store: Arc<dyn KeyValueStore>, settings: &CacheSettings) -> Self {
        Self {
            store: Some(store),
            index: Arc::new(KeyIndex::new()),
            default_ttl_minutes: settings.default_ttl_minutes,
            operation_timeout: settings.operation_timeout,
            event_broadcaster: None,
        }
    }

    /// A cache with no store: reads always miss and writes are dropped.
    pub fn degraded(settings: &CacheSettings) -> Self {
        Self {
            store: None,
            index: Arc::new(KeyIndex::new()),
            default_ttl_minutes: settings.default_ttl_minutes,
            operation_timeout: settings.operation_timeout,
            event_broadcaster: None,
        }
    }

    pub fn with_event_broadcaster(mut self, broadcaster: broadcast::Sender<CacheEvent>) -> Self {
        self.event_broadcaster = Some(broadcaster);
        self
    }

    pub fn default_ttl_minutes(&self) -> u64 {
        self.default_ttl_minutes
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_minutes.saturating_mul(60))
    }

    pub fn is_degraded(&self) -> bool {
        self.store.is_none()
    }

    pub fn store_name(&self) -> &'static str {
        self.store.as_ref().map_or("none", |store| store.name())
    }

    /// Number of keys currently held by the fallback index.
    pub fn indexed_keys(&self) -> usize {
        self.index.len()
    }

    /// Bound a single store call by the configured timeout.
    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match self.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => call.await,
        }
    }

    /// Cached value for `key`. Misses, store failures and undecodable
    /// payloads all come back as `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let store = self.store.as_ref()?;

        let bytes = match self.bounded(store.get(key.as_str())).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(key = %key, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(key = %key, "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cached payload could not be decoded, treating as miss");
                None
            }
        }
    }

    /// Write `value` under `key` with `ttl` (or the default TTL).
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let Some(store) = self.store.as_ref() else {
            debug!(key = %key, "no store configured, dropping write");
            return Ok(());
        };

        let ttl = ttl.unwrap_or_else(|| self.default_ttl());
        let payload =
            serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        let value_size = payload.len();

        self.bounded(store.set(key.as_str(), payload, ttl)).await?;
        self.index.register(key.as_str(), ttl);
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        debug!(key = %key, ttl_ms, "cache entry stored");

        self.broadcast(CacheEvent::Stored(EntryStoredEvent {
            key: key.to_string(),
            value_size,
            ttl_ms,
            timestamp: now_timestamp(),
        }));
        Ok(())
    }

    /// Delete one key. Removing a key that does not exist is not an error.
    pub async fn remove(&self, key: &CacheKey) -> Result<()> {
        let Some(store) = self.store.as_ref() else {
            debug!(key = %key, "no store configured, nothing to remove");
            return Ok(());
        };

        let existed = self.bounded(store.delete(key.as_str())).await?;
        self.index.unregister(key.as_str());
        debug!(key = %key, existed, "cache entry removed");

        self.broadcast(CacheEvent::Removed(EntryRemovedEvent {
            key: key.to_string(),
            existed,
            timestamp: now_timestamp(),
        }));
        Ok(())
    }

    /// Parse `pattern` and delete every key it selects.
    pub async fn remove_by_pattern(&self, pattern: &str) -> Result<usize> {
        let pattern = InvalidationPattern::parse(pattern)?;
        self.remove_matching(&pattern).await
    }

    /// Delete every key selected by `pattern`, returning how many were deleted.
    ///
    /// Keys come from the store's own enumeration when it has one, otherwise
    /// from the fallback index. Deletes already issued are never rolled back.
    pub async fn remove_matching(&self, pattern: &InvalidationPattern) -> Result<usize> {
        let (keys, source) = self.resolve_keys(pattern).await;
        if keys.is_empty() {
            debug!(pattern = %pattern, ?source, "no cache keys matched");
            return Ok(0);
        }

        let Some(store) = self.store.as_ref() else {
            for key in &keys {
                self.index.unregister(key);
            }
            return Ok(0);
        };

        let mut deleted = 0;
        let mut failures: Vec<(String, Error)> = Vec::new();
        for key in &keys {
            match self.bounded(store.delete(key)).await {
                Ok(_) => {
                    self.index.unregister(key);
                    deleted += 1;
                }
                Err(e) => {
                    warn!(key = %key, pattern = %pattern, error = %e, "failed to delete cache key");
                    failures.push((key.clone(), e));
                }
            }
        }

        if let Some((key, first)) = failures.first() {
            return Err(Error::PartialInvalidation {
                pattern: pattern.to_string(),
                deleted,
                failed: failures.len(),
                reason: format!("{}: {}", key, first),
            });
        }

        debug!(pattern = %pattern, deleted, ?source, "cache keys invalidated");
        self.broadcast(CacheEvent::Invalidated(PatternInvalidatedEvent {
            pattern: pattern.to_string(),
            removed: deleted,
            source,
            timestamp: now_timestamp(),
        }));
        Ok(deleted)
    }

    async fn resolve_keys(&self, pattern: &InvalidationPattern) -> (Vec<String>, KeySource) {
        if let Some(store) = self.store.as_ref() {
            match self.bounded(store.scan(pattern)).await {
                Ok(mut keys) => {
                    keys.sort();
                    keys.dedup();
                    let pruned = self.index.prune();
                    if pruned > 0 {
                        debug!(pruned, "dropped lapsed entries from fallback index");
                    }
                    return (keys, KeySource::Scan);
                }
                Err(Error::ScanUnsupported) => {
                    debug!(store = store.name(), "store cannot enumerate keys, using fallback index");
                }
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "key scan failed, using fallback index");
                }
            }
        }
        (self.index.matching(pattern), KeySource::FallbackIndex)
    }

    /// Return the cached value for `key`, or compute, cache and return it.
    ///
    /// A failed write after computing is logged and the computed value is
    /// still returned; the source of truth already answered.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(hit);
        }

        let value = compute().await?;
        if let Err(e) = self.set(key, &value, ttl).await {
            warn!(key = %key, error = %e, "failed to cache computed value");
        }
        Ok(value)
    }

    fn broadcast(&self, event: CacheEvent) {
        if let Some(ref broadcaster) = self.event_broadcaster {
            match broadcaster.send(event) {
                Ok(subscriber_count) => {
                    debug!("Broadcasted cache event to {} subscriber(s)", subscriber_count);
                }
                Err(_) => {
                    debug!("No subscribers for cache event");
                }
            }
        }
    }
}

impl std::fmt::Debug for TenantCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantCache")
            .field("store", &self.store_name())
            .field("indexed_keys", &self.index.len())
            .field("default_ttl_minutes", &self.default_ttl_minutes)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}
