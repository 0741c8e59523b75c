//! Time-bounded dedup cache keyed by event grouping identity.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::event::EventRecord;

/// Default lifetime of a cache entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Entry stored in the cache.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// The most recently emitted record for this key.
    record: EventRecord,

    /// Absolute deadline after which the entry no longer suppresses.
    expires_at: Instant,
}

/// Maps a grouping key to the last emitted record for that key.
///
/// The control plane tends to re-deliver the same logical event (same
/// key, same timestamp, same message) within a short window; the cache
/// suppresses those repeats while letting genuinely recurring reasons
/// through once their timestamp or message changes.
///
/// Expiry is lazy: an entry past its deadline is treated as absent on the
/// next touch. [`DedupCache::sweep`] exists only to bound memory growth
/// from keys that are never revisited. The cache has exactly one owner
/// and needs no internal synchronization.
#[derive(Debug)]
pub struct DedupCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl DedupCache {
    /// Create a cache whose entries live for `ttl` after each write.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Whether `candidate` is novel enough to emit under `key`.
    ///
    /// True when no live entry exists, when the timestamps differ in
    /// either direction (ordering is advisory, not a monotonic filter),
    /// or when the timestamp matches but the message changed. False only
    /// for a true duplicate: same timestamp, same message.
    pub fn should_emit(&self, key: &str, candidate: &EventRecord) -> bool {
        match self.live_entry(key) {
            None => true,
            Some(entry) => {
                entry.record.timestamp != candidate.timestamp
                    || entry.record.message != candidate.message
            }
        }
    }

    /// Record `candidate` as the emitted record for `key`.
    ///
    /// Unconditionally overwrites any previous entry and starts a fresh
    /// TTL window.
    pub fn record(&mut self, key: &str, candidate: &EventRecord) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                record: candidate.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn sweep(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    /// Whether the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn live_entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
