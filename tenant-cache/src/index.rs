use crate::pattern::InvalidationPattern;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Registrations allowed before the first sweep of lapsed entries.
const MIN_PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug)]
struct Entries {
    // key -> instant after which the store has dropped it; None never lapses
    keys: HashMap<String, Option<Instant>>,
    prune_at: usize,
}

impl Entries {
    fn prune(&mut self, now: Instant) -> usize {
        let before = self.keys.len();
        self.keys
            .retain(|_, expires_at| expires_at.is_none_or(|at| at > now));
        self.prune_at = (self.keys.len() * 2).max(MIN_PRUNE_THRESHOLD);
        before - self.keys.len()
    }
}

/// Process-local record of keys written through this cache.
///
/// Used to resolve invalidation patterns when the store cannot enumerate
/// keys itself. It only knows about writes made by this process, so other
/// instances sharing the same store are invisible to it.
///
/// Lapsed entries are swept whenever the map doubles since the last sweep,
/// on every lookup, and on explicit [`KeyIndex::prune`].
///
/// The lock is held for the duration of a single map operation and never
/// across a store call.
#[derive(Debug)]
pub struct KeyIndex {
    entries: Mutex<Entries>,
}

impl Default for KeyIndex {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Entries {
                keys: HashMap::new(),
                prune_at: MIN_PRUNE_THRESHOLD,
            }),
        }
    }
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: &str, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl);
        let mut entries = self.entries.lock();
        entries.keys.insert(key.to_string(), expires_at);
        if entries.keys.len() >= entries.prune_at {
            entries.prune(now);
        }
    }

    pub fn unregister(&self, key: &str) -> bool {
        self.entries.lock().keys.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().keys.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries whose TTL has lapsed, returning how many went.
    pub fn prune(&self) -> usize {
        self.entries.lock().prune(Instant::now())
    }

    /// Snapshot of indexed keys matching `pattern`, sorted.
    ///
    /// Entries whose TTL has lapsed are pruned on the way.
    pub fn matching(&self, pattern: &InvalidationPattern) -> Vec<String> {
        let mut entries = self.entries.lock();
        entries.prune(Instant::now());

        let mut matched: Vec<String> = entries
            .keys
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();
        matched.sort();
        matched
    }
}
