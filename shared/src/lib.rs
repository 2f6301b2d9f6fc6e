// shared/src/lib.rs

use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("store does not support key enumeration")]
    ScanUnsupported,
    #[error(
        "partial invalidation of '{pattern}': {deleted} deleted, {failed} failed: {reason}"
    )]
    PartialInvalidation {
        pattern: String,
        deleted: usize,
        failed: usize,
        reason: String,
    },
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("invalid key segment: {0}")]
    InvalidKey(String),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("config: {0}")]
    Config(String),
}

pub type CacheError = Error;
pub type Result<T> = std::result::Result<T, Error>;

pub mod config;
