//! Response cache statistics.
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Monotonic counters for one cache instance.
#[derive(Debug, Clone, Default)]
pub(crate) struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub clears: u64,
    pub last_hit: Option<DateTime<Utc>>,
    pub last_miss: Option<DateTime<Utc>>,
}

impl Counters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
        self.last_hit = Some(Utc::now());
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
        self.last_miss = Some(Utc::now());
    }
}

/// Point-in-time view of a cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Entries physically present, expired or not.
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub clears: u64,
    /// Hits over lookups, 0.0 when nothing was looked up.
    pub hit_rate: f64,
    pub last_hit_time: Option<DateTime<Utc>>,
    pub last_miss_time: Option<DateTime<Utc>>,
    pub keys: Vec<String>,
}

impl CacheStats {
    pub(crate) fn new(counters: &Counters, valid: usize, expired: usize, keys: Vec<String>) -> Self {
        let lookups = counters.hits + counters.misses;
        let hit_rate = if lookups == 0 { 0.0 } else { counters.hits as f64 / lookups as f64 };
        Self {
            total: valid + expired,
            valid,
            expired,
            hits: counters.hits,
            misses: counters.misses,
            sets: counters.sets,
            clears: counters.clears,
            hit_rate,
            last_hit_time: counters.last_hit,
            last_miss_time: counters.last_miss,
            keys,
        }
    }
}
