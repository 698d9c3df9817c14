//! Bounded, expiring cache for adapter cross-call lookups.
//!
//! Some vendors make adapters repeat an expensive lookup on every collection
//! (resolving a project name to an internal id, a scan to a generated report).
//! Adapters share a [`ReportCache`] injected at construction; its size bound,
//! TTL, and locking are all explicit. A miss is answered by recomputation,
//! never treated as a failure.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default number of cached entries (500).
pub const DEFAULT_CAPACITY: usize = 500;

/// Default entry lifetime (1 hour).
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// A size-bounded cache whose entries expire after a fixed TTL.
///
/// Safe to share across concurrently running collector instances; every
/// operation takes the internal lock briefly and never blocks on I/O.
pub struct ReportCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    capacity: usize,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> ReportCache<K, V> {
    /// Create a cache with the given entry bound and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Look up a value. Expired entries are removed and report as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert a value, evicting the oldest entry when the cache is full.
    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for ReportCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl<K, V> std::fmt::Debug for ReportCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportCache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
