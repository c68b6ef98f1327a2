//! Bounded per-wallet cursor map (§4.3): last block number for EVM, last
//! signature for Solana. Capacity-only eviction, oldest first — no TTL,
//! since a cursor must never silently expire and re-scan history.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

struct Inner<K, V> {
    data: HashMap<K, V>,
    insertion_order: VecDeque<K>,
}

pub struct CursorMap<K, V>
where
    K: Clone + Eq + Hash,
{
    capacity: usize,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> CursorMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self { capacity, inner: Mutex::new(Inner { data: HashMap::new(), insertion_order: VecDeque::new() }) }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().data.get(key).cloned()
    }

    pub fn set(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        if !inner.data.contains_key(&key) {
            if inner.data.len() >= self.capacity {
                if let Some(oldest) = inner.insertion_order.pop_front() {
                    inner.data.remove(&oldest);
                }
            }
            inner.insertion_order.push_back(key.clone());
        }
        inner.data.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_cursor_evicted_once_over_capacity() {
        let map: CursorMap<String, u64> = CursorMap::new(2);
        map.set("0xa".to_string(), 1);
        map.set("0xb".to_string(), 2);
        map.set("0xc".to_string(), 3);

        assert_eq!(map.get(&"0xa".to_string()), None);
        assert_eq!(map.get(&"0xb".to_string()), Some(2));
        assert_eq!(map.get(&"0xc".to_string()), Some(3));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn re_setting_an_existing_key_does_not_evict() {
        let map: CursorMap<String, u64> = CursorMap::new(2);
        map.set("0xa".to_string(), 1);
        map.set("0xb".to_string(), 2);
        map.set("0xa".to_string(), 99);

        assert_eq!(map.get(&"0xa".to_string()), Some(99));
        assert_eq!(map.len(), 2);
    }
}
