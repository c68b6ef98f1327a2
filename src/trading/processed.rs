//! Bounded, TTL-evicting dedup set of `(wallet, tx_hash)` pairs (§4.7, §5).
//!
//! This is purely a retry-storm optimisation: the Store's own
//! `UNIQUE(wallet, tx_hash, chain)` constraint is the durable guard against
//! reprocessing a transfer. A periodic sweeper keeps the in-memory side
//! bounded even for keys nobody re-queries; `shutdown` joins it so no timer
//! outlives the process.

use crate::logger::{self, LogTag};
use crate::util::BoundedCache;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const SWEEP_INTERVAL_SECS: u64 = 300;

pub struct ProcessedLru {
    cache: Arc<BoundedCache<(String, String), ()>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ProcessedLru {
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        let cache = Arc::new(BoundedCache::new(Duration::from_secs(ttl_secs), capacity));
        let sweeper_cache = Arc::clone(&cache);

        let sweeper = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
            loop {
                interval.tick().await;
                sweeper_cache.prune_expired();
                logger::debug(LogTag::Trading, "swept expired entries from the processed-transfer cache");
            }
        });

        Self { cache, sweeper: Mutex::new(Some(sweeper)) }
    }

    pub fn contains(&self, wallet: &str, tx_hash: &str) -> bool {
        self.cache.get(&(wallet.to_string(), tx_hash.to_string())).is_some()
    }

    pub fn insert(&self, wallet: &str, tx_hash: &str) {
        self.cache.insert((wallet.to_string(), tx_hash.to_string()), ());
    }

    /// Aborts and joins the sweeper task. Safe to call more than once; the
    /// second call finds nothing left to join.
    pub async fn shutdown(&self) {
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn a_key_is_remembered_after_insert() {
        let lru = ProcessedLru::new(100, 3_600);
        assert!(!lru.contains("0xwal", "0xhash"));
        lru.insert("0xwal", "0xhash");
        assert!(lru.contains("0xwal", "0xhash"));
        lru.shutdown().await;
    }

    #[tokio::test]
    async fn different_wallets_with_the_same_hash_are_distinct_keys() {
        let lru = ProcessedLru::new(100, 3_600);
        lru.insert("0xwal1", "0xhash");
        assert!(!lru.contains("0xwal2", "0xhash"));
        lru.shutdown().await;
    }
}
