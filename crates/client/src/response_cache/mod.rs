//! In-process TTL cache for REST responses.
//!
//! Entries are keyed by normalized URL plus sorted non-empty parameters and expire
//! after a per-endpoint TTL. Expired entries are evicted on lookup, by a sweep every
//! [`MISS_SWEEP_EVERY`] misses, and by the background task from
//! [`ResponseCache::spawn_sweeper`].

pub mod keys;
pub mod policy;
pub mod stats;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use swcache_core::config::MAX_TTL_SECS;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::lock::mutex_lock;

pub use keys::cache_key;
pub use policy::{EndpointClass, TtlTable, should_cache};
pub use stats::CacheStats;

use stats::Counters;

/// Every this many misses, expired entries are swept inline.
pub const MISS_SWEEP_EVERY: u64 = 64;

/// Longer TTLs are clamped to this.
pub const MAX_TTL: Duration = Duration::from_secs(MAX_TTL_SECS);

fn expiry(now: Instant, ttl: Duration) -> Instant {
    let ttl = ttl.min(MAX_TTL);
    now.checked_add(ttl).unwrap_or(now)
}

struct Entry<T> {
    data: Arc<T>,
    expires_at: Instant,
}

struct CacheState<T> {
    entries: HashMap<String, Entry<T>>,
    counters: Counters,
}

impl<T> CacheState<T> {
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before - self.entries.len()
    }
}

/// TTL cache instance. Construct one per API client; tests build their own.
pub struct ResponseCache<T = Value> {
    state: Mutex<CacheState<T>>,
    ttl: TtlTable,
}

impl<T> Default for ResponseCache<T> {
    fn default() -> Self {
        Self::new(TtlTable::default())
    }
}

impl<T> ResponseCache<T> {
    pub fn new(ttl: TtlTable) -> Self {
        Self { state: Mutex::new(CacheState { entries: HashMap::new(), counters: Counters::default() }), ttl }
    }

    pub fn ttl_table(&self) -> &TtlTable {
        &self.ttl
    }

    /// Stored payload for `url` and `params`, unless absent or expired.
    pub fn get(&self, url: &str, params: Option<&Value>) -> Option<Arc<T>> {
        let key = cache_key(url, params);
        let now = Instant::now();
        let mut state = mutex_lock(&self.state, "response_cache", "get");

        let found = state.entries.get(&key).map(|entry| (now < entry.expires_at, Arc::clone(&entry.data)));
        let live = match found {
            Some((true, data)) => Some(data),
            Some((false, _)) => {
                state.entries.remove(&key);
                None
            }
            None => None,
        };

        match live {
            Some(data) => {
                state.counters.record_hit();
                tracing::debug!("response cache hit {}", key);
                Some(data)
            }
            None => {
                state.counters.record_miss();
                tracing::debug!("response cache miss {}", key);
                if state.counters.misses % MISS_SWEEP_EVERY == 0 {
                    state.sweep(now);
                }
                None
            }
        }
    }

    /// Store `data`, replacing any existing entry. Returns the shared payload.
    ///
    /// TTLs above [`MAX_TTL`] are clamped.
    pub fn set(&self, url: &str, params: Option<&Value>, data: T, ttl: Duration) -> Arc<T> {
        let key = cache_key(url, params);
        let data = Arc::new(data);
        let entry = Entry { data: Arc::clone(&data), expires_at: expiry(Instant::now(), ttl) };

        let mut state = mutex_lock(&self.state, "response_cache", "set");
        state.entries.insert(key, entry);
        state.counters.sets += 1;
        data
    }

    /// Store `data` with the TTL of the endpoint class `url` belongs to.
    pub fn set_default(&self, url: &str, params: Option<&Value>, data: T) -> Arc<T> {
        let ttl = self.ttl.ttl_for_url(url);
        self.set(url, params, data, ttl)
    }

    /// Remove every entry whose key contains `pattern`, or everything when `None`.
    ///
    /// Returns the number of removed entries.
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        let mut state = mutex_lock(&self.state, "response_cache", "invalidate");
        let before = state.entries.len();
        match pattern {
            Some(pattern) => state.entries.retain(|key, _| !key.contains(pattern)),
            None => state.entries.clear(),
        }
        let removed = before - state.entries.len();
        state.counters.clears += removed as u64;

        tracing::debug!("invalidated {} response cache entries (pattern: {:?})", removed, pattern);
        removed
    }

    /// Evict every entry already past its expiry. Returns the number evicted.
    pub fn sweep_expired(&self) -> usize {
        mutex_lock(&self.state, "response_cache", "sweep").sweep(Instant::now())
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let state = mutex_lock(&self.state, "response_cache", "stats");
        let valid = state.entries.values().filter(|entry| now < entry.expires_at).count();
        let expired = state.entries.len() - valid;
        let mut keys: Vec<String> = state.entries.keys().cloned().collect();
        keys.sort();
        CacheStats::new(&state.counters, valid, expired, keys)
    }

    /// Drop all entries and counters.
    pub fn reset(&self) {
        let mut state = mutex_lock(&self.state, "response_cache", "reset");
        state.entries.clear();
        state.counters = Counters::default();
    }
}

impl<T: Send + Sync + 'static> ResponseCache<T> {
    /// Sweep expired entries every `period` until the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let evicted = cache.sweep_expired();
                if evicted > 0 {
                    tracing::debug!("swept {} expired response cache entries", evicted);
                }
            }
        })
    }
}
