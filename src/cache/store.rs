//! LRU Cache Core
//!
//! Thread-safe cache combining the recency list with TTL expiration and
//! dual (entry count + byte size) eviction bounds.

use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, CacheStatsSnapshot, LruList};

/// Read-only view of one entry, used for popularity reports.
#[derive(Debug, Clone)]
pub struct EntryInfo<K> {
    pub key: K,
    pub size: u64,
    pub access_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    /// Zero once expired but not yet swept
    pub ttl_remaining: Duration,
}

// == LRU Cache ==
/// Capacity- and byte-bounded, TTL-aware LRU cache.
///
/// Every structural change happens under one mutex so the list, the index
/// and the byte total always agree. Hit/miss counters are atomics outside it.
#[derive(Debug)]
pub struct LruCache<K, V> {
    inner: Mutex<LruList<K, V>>,
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Maximum total size in bytes
    max_size_bytes: u64,
    /// TTL applied by `put`
    default_ttl: Duration,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    V: Clone,
{
    // == Constructor ==
    pub fn new(capacity: usize, max_size_bytes: u64, default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(LruList::new()),
            stats: CacheStats::new(),
            capacity,
            max_size_bytes,
            default_ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruList<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Put ==
    /// Inserts or replaces a value using the default TTL.
    pub fn put(&self, key: K, value: V, size: u64) {
        self.put_with_ttl(key, value, size, self.default_ttl);
    }

    /// Inserts or replaces a value at the head, then evicts from the tail
    /// until both the count and the byte bound hold again.
    ///
    /// A value larger than `max_size_bytes` is evicted immediately along with
    /// everything older than it.
    pub fn put_with_ttl(&self, key: K, value: V, size: u64, ttl: Duration) {
        let mut list = self.lock();
        list.push_front(key, CacheEntry::new(value, size, ttl));

        while list.len() > self.capacity || list.total_size() > self.max_size_bytes {
            match list.pop_back() {
                Some((evicted, entry)) => {
                    self.stats.record_eviction();
                    debug!(key = ?evicted, size = entry.size, "evicted cache entry");
                }
                None => break,
            }
        }
    }

    // == Get ==
    /// Returns a live value and marks it most recently used.
    ///
    /// An expired entry is removed on the spot and reported as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut list = self.lock();

        let expired = match list.peek(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            list.remove(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return None;
        }

        let entry = list.promote(key)?;
        entry.record_access();
        self.stats.record_hit();
        Some(entry.value.clone())
    }

    /// Reports whether a live entry exists without touching recency or stats.
    pub fn contains(&self, key: &K) -> bool {
        self.lock().peek(key).is_some_and(|e| !e.is_expired())
    }

    // == Delete ==
    /// Removes an entry. Returns false when the key was absent.
    pub fn delete(&self, key: &K) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Removes every entry whose key matches the predicate.
    pub fn remove_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&K) -> bool,
    {
        let mut list = self.lock();
        let keys = list.keys_where(|k, _| predicate(k));
        for key in &keys {
            list.remove(key);
        }
        keys.len()
    }

    // == Purge Expired ==
    /// Removes all expired entries regardless of access pattern.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut list = self.lock();
        let expired = list.keys_where(|_, e| e.is_expired_at(now));
        for key in &expired {
            list.remove(key);
        }
        self.stats.record_expirations(expired.len() as u64);
        expired.len()
    }

    // == Clear ==
    /// Drops every entry and resets the counters.
    pub fn clear(&self) {
        self.lock().clear();
        self.stats.reset();
    }

    // == Introspection ==
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Current total size of all entries in bytes.
    pub fn current_size(&self) -> u64 {
        self.lock().total_size()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Metadata of every entry, most recently used first.
    pub fn entries(&self) -> Vec<EntryInfo<K>> {
        self.lock()
            .iter()
            .map(|(key, entry)| EntryInfo {
                key: key.clone(),
                size: entry.size,
                access_count: entry.access_count,
                created_at: entry.created_at,
                last_accessed_at: entry.last_accessed_at,
                ttl_remaining: entry.ttl_remaining(),
            })
            .collect()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        let list = self.lock();
        self.stats.snapshot(list.len(), list.total_size())
    }
}
