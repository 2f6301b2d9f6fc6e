use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    Stored(EntryStoredEvent),
    Removed(EntryRemovedEvent),
    Invalidated(PatternInvalidatedEvent),
}

impl CacheEvent {
    pub fn timestamp(&self) -> i64 {
        match self {
            CacheEvent::Stored(e) => e.timestamp,
            CacheEvent::Removed(e) => e.timestamp,
            CacheEvent::Invalidated(e) => e.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStoredEvent {
    pub key: String,
    pub value_size: usize,
    pub ttl_ms: u64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRemovedEvent {
    pub key: String,
    pub existed: bool,
    pub timestamp: i64,
}

/// Where the key set of a pattern removal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    Scan,
    FallbackIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternInvalidatedEvent {
    pub pattern: String,
    pub removed: usize,
    pub source: KeySource,
    pub timestamp: i64,
}

/// Current time in milliseconds since the UNIX epoch
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
