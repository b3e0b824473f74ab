//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

// == Cache Entry ==
/// A single cached value together with its bookkeeping metadata.
///
/// Wall-clock timestamps are kept for reporting; expiry is decided against a
/// monotonic `Instant` so clock adjustments never resurrect or kill entries.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Size charged against the cache byte budget
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    /// Number of successful reads since insertion
    pub access_count: u64,
    /// Monotonic expiry deadline
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry that expires `ttl` from now.
    pub fn new(value: V, size: u64, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            value,
            size,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            expires_at: Instant::now() + ttl,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches `expires_at`, so a fully
    /// elapsed TTL is never served.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    // == Record Access ==
    /// Updates the access metadata after a successful read.
    pub fn record_access(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = Utc::now();
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
