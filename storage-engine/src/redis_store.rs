use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use shared::{Error, Result};
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::time::Duration;
use tenant_cache::{InvalidationPattern, KeyValueStore};
use tracing::{info, warn};

use crate::MAX_ENTRY_TTL;

fn unavailable(endpoint: &str, err: redis::RedisError) -> Error {
    Error::StoreUnavailable(format!("{}: {}", endpoint, err))
}

struct Endpoint {
    url: String,
    conn: ConnectionManager,
}

/// Redis-backed store.
///
/// GET/SET/DEL go to the first endpoint; SCAN runs on every endpoint so keys
/// held by any reachable node are found.
pub struct RedisStore {
    endpoints: Vec<Endpoint>,
    scan_count: usize,
}

impl RedisStore {
    /// Connect to the configured endpoints.
    ///
    /// The first endpoint is the primary and must be reachable. Secondaries
    /// that cannot be reached are logged and left out of scans.
    pub async fn connect(urls: &[String], scan_count: usize) -> Result<Self> {
        let Some((primary, secondaries)) = urls.split_first() else {
            return Err(Error::Config("no redis endpoints configured".to_string()));
        };

        let mut endpoints = Vec::with_capacity(urls.len());
        endpoints.push(Self::connect_endpoint(primary).await?);
        for url in secondaries {
            match Self::connect_endpoint(url).await {
                Ok(endpoint) => endpoints.push(endpoint),
                Err(e) => warn!(endpoint = %url, error = %e, "skipping unreachable redis endpoint"),
            }
        }

        Ok(Self {
            endpoints,
            scan_count,
        })
    }

    async fn connect_endpoint(url: &str) -> Result<Endpoint> {
        let client = redis::Client::open(url).map_err(|e| unavailable(url, e))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| unavailable(url, e))?;
        info!("Connected to redis endpoint {}", url);
        Ok(Endpoint {
            url: url.to_string(),
            conn,
        })
    }

    /// Endpoints that were reachable at connect time, primary first.
    pub fn endpoint_urls(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.url.as_str()).collect()
    }

    fn primary(&self) -> (&str, ConnectionManager) {
        let endpoint = &self.endpoints[0];
        (&endpoint.url, endpoint.conn.clone())
    }

    async fn scan_endpoint(&self, endpoint: &Endpoint, glob: &str) -> Result<Vec<String>> {
        let mut conn = endpoint.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(glob)
                .arg("COUNT")
                .arg(self.scan_count)
                .query_async(&mut conn)
                .await
                .map_err(|e| unavailable(&endpoint.url, e))?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let (url, mut conn) = self.primary();
        conn.get(key).await.map_err(|e| unavailable(url, e))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let (url, mut conn) = self.primary();
        let ttl_ms = u64::try_from(ttl.min(MAX_ENTRY_TTL).as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        conn.pset_ex::<_, _, ()>(key, value, ttl_ms)
            .await
            .map_err(|e| unavailable(url, e))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let (url, mut conn) = self.primary();
        let removed: i64 = conn.del(key).await.map_err(|e| unavailable(url, e))?;
        Ok(removed > 0)
    }

    async fn scan(&self, pattern: &InvalidationPattern) -> Result<Vec<String>> {
        let glob = pattern.to_glob();
        let mut keys = BTreeSet::new();
        let mut last_error = None;
        let mut reached = 0;

        for endpoint in &self.endpoints {
            match self.scan_endpoint(endpoint, &glob).await {
                Ok(found) => {
                    reached += 1;
                    keys.extend(found);
                }
                Err(e) => {
                    warn!(endpoint = %endpoint.url, error = %e, "SCAN failed, skipping endpoint");
                    last_error = Some(e);
                }
            }
        }

        match (reached, last_error) {
            (0, Some(e)) => Err(e),
            _ => Ok(keys.into_iter().collect()),
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

impl Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("endpoints", &self.endpoint_urls())
            .field("scan_count", &self.scan_count)
            .finish()
    }
}
