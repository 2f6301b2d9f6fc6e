#![deny(clippy::all)]

use crate::pattern::InvalidationPattern;
use async_trait::async_trait;
use shared::{Error, Result};
use std::time::Duration;

// Ports are the pluggable extension points for the underlying key/value store

/// Port for a distributed key/value store (e.g., Redis, or moka in-process)
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Raw payload for `key`, `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Returns whether the key existed. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Enumerate keys matching `pattern` across every reachable node.
    async fn scan(&self, _pattern: &InvalidationPattern) -> Result<Vec<String>> {
        Err(Error::ScanUnsupported)
    }

    fn name(&self) -> &'static str;
}
