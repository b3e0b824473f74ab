//! LRU List Module
//!
//! Recency ordering for cache entries: an arena-backed doubly-linked list
//! plus a key→slot index, giving O(1) lookup, promotion and eviction.

use std::collections::HashMap;
use std::hash::Hash;

use crate::cache::CacheEntry;

/// Null link in the arena.
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    entry: Option<CacheEntry<V>>,
    prev: usize,
    next: usize,
}

// == LRU List ==
/// Entries ordered by recency.
///
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// Freed slots are recycled through a free list, so the arena never grows
/// beyond the peak number of live entries. Not synchronized; the owning
/// cache serializes access.
#[derive(Debug)]
pub struct LruList<K, V> {
    index: HashMap<K, usize>,
    nodes: Vec<Node<K, V>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    /// Sum of `size` over live entries
    total_size: u64,
}

impl<K: Hash + Eq + Clone, V> LruList<K, V> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            nodes: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            total_size: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    // == Push Front ==
    /// Inserts an entry as most recently used.
    ///
    /// If the key already exists its entry is replaced and moved to the head;
    /// the previous entry is returned.
    pub fn push_front(&mut self, key: K, entry: CacheEntry<V>) -> Option<CacheEntry<V>> {
        let size = entry.size;

        if let Some(&slot) = self.index.get(&key) {
            self.unlink(slot);
            self.link_front(slot);
            let old = self.nodes[slot].entry.replace(entry);
            if let Some(old) = &old {
                self.total_size -= old.size;
            }
            self.total_size += size;
            return old;
        }

        let node = Node {
            key: key.clone(),
            entry: Some(entry),
            prev: NIL,
            next: NIL,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        self.link_front(slot);
        self.index.insert(key, slot);
        self.total_size += size;
        None
    }

    // == Get ==
    /// Looks up an entry without changing recency.
    pub fn peek(&self, key: &K) -> Option<&CacheEntry<V>> {
        let slot = *self.index.get(key)?;
        self.nodes[slot].entry.as_ref()
    }

    /// Marks a key as most recently used and returns its entry.
    pub fn promote(&mut self, key: &K) -> Option<&mut CacheEntry<V>> {
        let slot = *self.index.get(key)?;
        if self.head != slot {
            self.unlink(slot);
            self.link_front(slot);
        }
        self.nodes[slot].entry.as_mut()
    }

    // == Remove ==
    /// Removes a key, returning its entry.
    pub fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let slot = self.index.remove(key)?;
        self.release(slot)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used entry.
    pub fn pop_back(&mut self) -> Option<(K, CacheEntry<V>)> {
        if self.tail == NIL {
            return None;
        }
        let slot = self.tail;
        let key = self.nodes[slot].key.clone();
        self.index.remove(&key);
        self.release(slot).map(|entry| (key, entry))
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.total_size = 0;
    }

    // == Iteration ==
    /// Iterates from most to least recently used.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Collects the keys matching a predicate, most recent first.
    pub fn keys_where<F>(&self, mut predicate: F) -> Vec<K>
    where
        F: FnMut(&K, &CacheEntry<V>) -> bool,
    {
        self.iter()
            .filter(|(k, e)| predicate(k, e))
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn release(&mut self, slot: usize) -> Option<CacheEntry<V>> {
        self.unlink(slot);
        self.free.push(slot);
        let entry = self.nodes[slot].entry.take();
        if let Some(entry) = &entry {
            self.total_size -= entry.size;
        }
        entry
    }

    fn link_front(&mut self, slot: usize) {
        self.nodes[slot].prev = NIL;
        self.nodes[slot].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = slot;
        }
        self.head = slot;
        if self.tail == NIL {
            self.tail = slot;
        }
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);
        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }
        self.nodes[slot].prev = NIL;
        self.nodes[slot].next = NIL;
    }
}

impl<K: Hash + Eq + Clone, V> Default for LruList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(key, entry)` pairs in recency order.
pub struct Iter<'a, K, V> {
    list: &'a LruList<K, V>,
    cursor: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a CacheEntry<V>);

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor != NIL {
            let node = &self.list.nodes[self.cursor];
            self.cursor = node.next;
            if let Some(entry) = node.entry.as_ref() {
                return Some((&node.key, entry));
            }
        }
        None
    }
}
