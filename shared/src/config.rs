use std::time::Duration;
use tracing::{info, warn};

/// Settings consumed by the tenant cache, read once at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheSettings {
    pub default_ttl_minutes: u64,
    /// Comma-separated store endpoints. `None` means a single-process in-memory store.
    pub connection_string: Option<String>,
    pub operation_timeout: Option<Duration>,
    pub scan_count: usize,
}

impl CacheSettings {
    pub const DEFAULT_TTL_MINUTES: u64 = 30;
    pub const DEFAULT_SCAN_COUNT: usize = 250;
    /// Largest TTL whose length in seconds still fits a `u64`.
    pub const MAX_TTL_MINUTES: u64 = u64::MAX / 60;

    const TTL_VAR: &str = "TENANT_CACHE_TTL_MINUTES";
    const CONNECTION_VAR: &str = "TENANT_CACHE_CONNECTION";
    const TIMEOUT_VAR: &str = "TENANT_CACHE_TIMEOUT_MS";
    const SCAN_COUNT_VAR: &str = "TENANT_CACHE_SCAN_COUNT";

    /// Load `.env` (if present) and then read the process environment.
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded cache settings overrides from {}", path.display()),
            Err(_) => info!("No .env file found, using system environment variables"),
        }
        Self::from_env()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_ttl_minutes = match lookup(Self::TTL_VAR) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(minutes) if (1..=Self::MAX_TTL_MINUTES).contains(&minutes) => minutes,
                _ => {
                    warn!(
                        "{}='{}' is not a positive number of minutes up to {}, using {}",
                        Self::TTL_VAR,
                        raw,
                        Self::MAX_TTL_MINUTES,
                        Self::DEFAULT_TTL_MINUTES
                    );
                    Self::DEFAULT_TTL_MINUTES
                }
            },
            None => Self::DEFAULT_TTL_MINUTES,
        };

        let connection_string = lookup(Self::CONNECTION_VAR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let operation_timeout = lookup(Self::TIMEOUT_VAR).and_then(|raw| {
            match raw.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(ms) => Some(Duration::from_millis(ms)),
                Err(_) => {
                    warn!("{}='{}' is not a number, disabling timeout", Self::TIMEOUT_VAR, raw);
                    None
                }
            }
        });

        let scan_count = match lookup(Self::SCAN_COUNT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .unwrap_or_else(|| {
                    warn!(
                        "{}='{}' is invalid, using {}",
                        Self::SCAN_COUNT_VAR,
                        raw,
                        Self::DEFAULT_SCAN_COUNT
                    );
                    Self::DEFAULT_SCAN_COUNT
                }),
            None => Self::DEFAULT_SCAN_COUNT,
        };

        Self {
            default_ttl_minutes,
            connection_string,
            operation_timeout,
            scan_count,
        }
    }

    pub fn with_default_ttl_minutes(mut self, minutes: u64) -> Self {
        self.default_ttl_minutes = minutes;
        self
    }

    pub fn with_connection_string(mut self, connection: impl Into<String>) -> Self {
        self.connection_string = Some(connection.into());
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_minutes.saturating_mul(60))
    }

    /// Individual endpoints from the connection string, in declaration order.
    pub fn endpoints(&self) -> Vec<String> {
        self.connection_string
            .as_deref()
            .map(|conn| {
                conn.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_minutes: Self::DEFAULT_TTL_MINUTES,
            connection_string: None,
            operation_timeout: None,
            scan_count: Self::DEFAULT_SCAN_COUNT,
        }
    }
}
