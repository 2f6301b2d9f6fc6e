#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tenant_cache::{InvalidationPattern, KeyValueStore};

/// Clock the fake store reads instead of wall time.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanMode {
    Supported,
    Unsupported,
    Failing,
}

/// In-memory store with injectable time, scan capability and failures.
pub struct FakeStore {
    clock: Arc<ManualClock>,
    // key -> (payload, expires_at_ms)
    entries: Mutex<HashMap<String, (Vec<u8>, u64)>>,
    scan_mode: Mutex<ScanMode>,
    unavailable: AtomicBool,
    // deletes succeed this many more times, then fail
    deletes_before_failure: Mutex<Option<usize>>,
    delay: Mutex<Option<Duration>>,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub deletes: AtomicUsize,
    pub scans: AtomicUsize,
}

impl FakeStore {
    pub fn new(scan_mode: ScanMode) -> Arc<Self> {
        Arc::new(Self {
            clock: Arc::new(ManualClock::default()),
            entries: Mutex::new(HashMap::new()),
            scan_mode: Mutex::new(scan_mode),
            unavailable: AtomicBool::new(false),
            deletes_before_failure: Mutex::new(None),
            delay: Mutex::new(None),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            scans: AtomicUsize::new(0),
        })
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn set_scan_mode(&self, mode: ScanMode) {
        *self.scan_mode.lock() = mode;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fail_deletes_after(&self, successes: usize) {
        *self.deletes_before_failure.lock() = Some(successes);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Write raw bytes, bypassing serialization, as another process might.
    pub fn insert_raw(&self, key: &str, payload: &[u8]) {
        let expires_at = self.clock.now_ms() + 60_000;
        self.entries
            .lock()
            .insert(key.to_string(), (payload.to_vec(), expires_at));
    }

    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .lock()
            .get(key)
            .is_some_and(|(_, expires_at)| *expires_at > now)
    }

    pub fn live_keys(&self) -> Vec<String> {
        let now = self.clock.now_ms();
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, (_, expires_at))| *expires_at > now)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    async fn pause(&self) -> Result<()> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FakeStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.pause().await?;
        self.gets.fetch_add(1, Ordering::SeqCst);
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();
        let live = entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(payload, _)| payload.clone());
        if live.is_none() {
            entries.remove(key);
        }
        Ok(live)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.pause().await?;
        self.sets.fetch_add(1, Ordering::SeqCst);
        let expires_at = self.clock.now_ms() + ttl.as_millis() as u64;
        self.entries
            .lock()
            .insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.pause().await?;
        {
            let mut remaining = self.deletes_before_failure.lock();
            if let Some(n) = remaining.as_mut() {
                if *n == 0 {
                    return Err(Error::StoreUnavailable("delete rejected".to_string()));
                }
                *n -= 1;
            }
        }
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().remove(key).is_some())
    }

    async fn scan(&self, pattern: &InvalidationPattern) -> Result<Vec<String>> {
        let mode = *self.scan_mode.lock();
        match mode {
            ScanMode::Unsupported => Err(Error::ScanUnsupported),
            ScanMode::Failing => Err(Error::StoreUnavailable("SCAN refused".to_string())),
            ScanMode::Supported => {
                self.pause().await?;
                self.scans.fetch_add(1, Ordering::SeqCst);
                Ok(self
                    .live_keys()
                    .into_iter()
                    .filter(|key| pattern.matches(key))
                    .collect())
            }
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
