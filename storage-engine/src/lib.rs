pub mod moka_store;
#[cfg(feature = "redis")]
pub mod redis_store;

pub use moka_store::MokaStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

use shared::config::CacheSettings;
use std::sync::Arc;
use tenant_cache::{KeyValueStore, TenantCache};
use std::time::Duration;
use tracing::{info, warn};

/// Longest TTL a backend is asked to honour; longer requests are clamped.
pub const MAX_ENTRY_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Build the tenant cache described by `settings`.
///
/// - no connection string: an in-process moka store,
/// - a connection string: the distributed store; if it cannot be reached the
///   cache comes up degraded rather than falling back to a per-process store
///   that other instances would not see.
pub async fn build_tenant_cache(settings: &CacheSettings) -> TenantCache {
    let endpoints = settings.endpoints();
    if endpoints.is_empty() {
        info!(
            "No cache connection configured, using in-process store (ttl {} min)",
            settings.default_ttl_minutes
        );
        let store: Arc<dyn KeyValueStore> = Arc::new(MokaStore::new_unbounded());
        return TenantCache::new(store, settings);
    }

    match connect_distributed(&endpoints, settings).await {
        Ok(store) => {
            info!(
                "Tenant cache using {} store with {} endpoint(s)",
                store.name(),
                endpoints.len()
            );
            TenantCache::new(store, settings)
        }
        Err(e) => {
            warn!(
                "Failed to connect to cache store: {}. Running in degraded mode.",
                e
            );
            TenantCache::degraded(settings)
        }
    }
}

#[cfg(feature = "redis")]
async fn connect_distributed(
    endpoints: &[String],
    settings: &CacheSettings,
) -> shared::Result<Arc<dyn KeyValueStore>> {
    let store = RedisStore::connect(endpoints, settings.scan_count).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn connect_distributed(
    _endpoints: &[String],
    _settings: &CacheSettings,
) -> shared::Result<Arc<dyn KeyValueStore>> {
    Err(shared::Error::Config(
        "a cache connection string is set but the redis backend is not compiled in".to_string(),
    ))
}
