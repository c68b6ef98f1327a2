//! Generic TTL + LRU bounded cache, shared by the price oracle, chain-client
//! cursor maps, and the trading engine's processed-transfer dedup set.
//!
//! Thread-safe via an internal lock; callers never see the lock.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub inserts: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

struct Inner<K, V> {
    data: HashMap<K, Entry<V>>,
    access_order: VecDeque<K>,
    metrics: CacheMetrics,
}

/// A bounded, TTL-expiring, LRU-evicting cache. Clone is cheap (shares the
/// same backing store via `Arc`).
#[derive(Clone)]
pub struct BoundedCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    ttl: Duration,
    capacity: usize,
    inner: Arc<RwLock<Inner<K, V>>>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            inner: Arc::new(RwLock::new(Inner {
                data: HashMap::new(),
                access_order: VecDeque::new(),
                metrics: CacheMetrics::default(),
            })),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.write();

        let expired = inner.data.get(key).map(|e| e.inserted_at.elapsed() > self.ttl).unwrap_or(false);
        if expired {
            inner.data.remove(key);
            inner.access_order.retain(|k| k != key);
            inner.metrics.misses += 1;
            inner.metrics.expirations += 1;
            return None;
        }

        if let Some(entry) = inner.data.get(key) {
            let value = entry.value.clone();
            inner.access_order.retain(|k| k != key);
            inner.access_order.push_back(key.clone());
            inner.metrics.hits += 1;
            Some(value)
        } else {
            inner.metrics.misses += 1;
            None
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.write();

        if inner.data.len() >= self.capacity && !inner.data.contains_key(&key) {
            if let Some(lru_key) = inner.access_order.pop_front() {
                inner.data.remove(&lru_key);
                inner.metrics.evictions += 1;
            }
        }

        inner.data.insert(key.clone(), Entry { value, inserted_at: Instant::now() });
        inner.access_order.retain(|k| k != &key);
        inner.access_order.push_back(key);
        inner.metrics.inserts += 1;
    }

    pub fn remove(&self, key: &K) {
        let mut inner = self.inner.write();
        inner.data.remove(key);
        inner.access_order.retain(|k| k != key);
    }

    /// Proactively drops every entry past its TTL, independent of `get`'s
    /// lazy expiry. Used by background sweepers that need the cache to stay
    /// bounded even for keys nobody is actively re-reading.
    pub fn prune_expired(&self) {
        let mut inner = self.inner.write();
        let ttl = self.ttl;
        let expired: Vec<K> =
            inner.data.iter().filter(|(_, e)| e.inserted_at.elapsed() > ttl).map(|(k, _)| k.clone()).collect();
        for key in expired {
            inner.data.remove(&key);
            inner.access_order.retain(|k| k != &key);
            inner.metrics.expirations += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.inner.read().metrics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn hits_and_misses_are_counted() {
        let cache: BoundedCache<String, String> = BoundedCache::new(Duration::from_secs(60), 100);
        cache.insert("key1".to_string(), "value1".to_string());
        assert_eq!(cache.get(&"key1".to_string()), Some("value1".to_string()));
        assert_eq!(cache.get(&"missing".to_string()), None);

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache: BoundedCache<&str, &str> = BoundedCache::new(Duration::from_millis(50), 100);
        cache.insert("key", "value");
        assert_eq!(cache.get(&"key"), Some("value"));
        thread::sleep(Duration::from_millis(80));
        assert_eq!(cache.get(&"key"), None);
    }

    #[test]
    fn oldest_entry_evicted_at_capacity() {
        let cache: BoundedCache<&str, &str> = BoundedCache::new(Duration::from_secs(60), 2);
        cache.insert("key1", "value1");
        cache.insert("key2", "value2");
        cache.insert("key3", "value3");

        assert_eq!(cache.get(&"key1"), None);
        assert_eq!(cache.get(&"key2"), Some("value2"));
        assert_eq!(cache.get(&"key3"), Some("value3"));
    }
}
