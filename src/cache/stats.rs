//! Cache Statistics Module
//!
//! Lock-free counters for cache hits, misses, evictions and expirations.
//! Counters live outside the structural lock so readers never contend with
//! writers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Hit Counter ==
/// A hit/miss pair with a derived hit rate.
#[derive(Debug, Default)]
pub struct HitCounter {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl HitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Hit rate as a percentage, 0 when nothing has been looked up yet.
    pub fn hit_rate(&self) -> f64 {
        hit_rate_percent(self.hits(), self.misses())
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// `hits / (hits + misses) * 100`, or 0.0 if no requests have been made.
pub fn hit_rate_percent(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64 * 100.0
    }
}

// == Cache Stats ==
/// Counters maintained by the LRU core.
#[derive(Debug, Default)]
pub struct CacheStats {
    lookups: HitCounter,
    /// Entries removed to satisfy the count or byte bound
    evictions: AtomicU64,
    /// Entries removed because their TTL elapsed
    expirations: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.lookups.record_hit();
    }

    pub fn record_miss(&self) {
        self.lookups.record_miss();
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expirations(&self, count: u64) {
        self.expirations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.lookups.reset();
        self.evictions.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters.
    pub fn snapshot(&self, entries: usize, total_size: u64) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.lookups.hits(),
            misses: self.lookups.misses(),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            entries,
            total_size,
            hit_rate: self.lookups.hit_rate(),
        }
    }
}

/// Serializable copy of the LRU core counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub entries: usize,
    pub total_size: u64,
    /// Percentage in [0, 100]
    pub hit_rate: f64,
}
