//! Read-path memoization with explicit invalidation.
//!
//! Folding a delta chain is the most expensive read in the system, so
//! reconstructed snapshots, snapshot->guild lookups and per-guild snapshot
//! lists are all memoized. Every write path invalidates the affected keys;
//! nothing here expires data that a write did not touch, except the TTL on
//! guild snapshot lists.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::engine::reconstruct::MaterializedSnapshot;
use crate::store::SnapshotMeta;

/// Bounded cache with least-recently-used eviction. Capacities here are
/// small (hundreds of entries), so recency is tracked with a logical clock
/// and eviction scans for the stalest entry.
pub struct LruCache<K, V> {
    capacity: usize,
    tick: u64,
    entries: HashMap<K, (V, u64)>,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        LruCache {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(key).map(|(value, stamp)| {
            *stamp = tick;
            value.clone()
        })
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.tick += 1;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            if let Some(stalest) = self
                .entries
                .iter()
                .min_by_key(|(_, (_, stamp))| *stamp)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&stalest);
            }
        }
        self.entries.insert(key, (value, self.tick));
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(value, _)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache whose entries expire after a fixed duration. Expiry is lazy: stale
/// entries are dropped on access rather than by a background task.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (V, Instant)>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some((_, expires)) if *expires <= Instant::now() => {
                self.entries.remove(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (value, Instant::now() + self.ttl));
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(value, _)| value)
    }
}

/// The engine's cache set, with key-scoped invalidation hooks called by
/// every write path.
pub struct Caches {
    /// guild id -> snapshot metadata, newest first
    pub lists: TtlCache<String, Vec<SnapshotMeta>>,
    /// snapshot id -> owning guild id (None is cached for missing snapshots)
    pub guilds: LruCache<i64, Option<String>>,
    /// snapshot id -> fully reconstructed state
    pub snapshots: LruCache<i64, MaterializedSnapshot>,
}

impl Caches {
    pub fn new(list_ttl: Duration, lookup_capacity: usize, snapshot_capacity: usize) -> Self {
        Caches {
            lists: TtlCache::new(list_ttl),
            guilds: LruCache::new(lookup_capacity),
            snapshots: LruCache::new(snapshot_capacity),
        }
    }

    /// Called after any write that changes a guild's snapshot chain.
    pub fn invalidate_guild(&mut self, guild_id: &str) {
        self.lists.remove(&guild_id.to_string());
    }

    /// Called after any write that changes or removes a single snapshot.
    pub fn invalidate_snapshot(&mut self, snapshot_id: i64) {
        self.snapshots.remove(&snapshot_id);
        self.guilds.remove(&snapshot_id);
    }
}
