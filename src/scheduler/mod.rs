//! Wallet rotation scheduling (§4.4).
//!
//! Given N active wallets and a tick counter, `NextSlice` always returns a
//! (possibly empty) slice — never an absence-of-value — grouped by chain in
//! a stable order, with a settling delay inserted only *between* chain
//! groups, never trailing the last one.

use crate::config::SchedulerConfig;
use crate::domain::{Chain, Wallet};
use crate::logger::{self, LogTag};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

const CHAIN_ORDER: [Chain; 6] =
    [Chain::Ethereum, Chain::Base, Chain::Arbitrum, Chain::Optimism, Chain::Polygon, Chain::Solana];

fn batch_size(active_count: usize, config: &SchedulerConfig) -> usize {
    if active_count == 0 {
        return 0;
    }
    let computed = active_count.div_ceil(config.batch_divisor);
    computed.clamp(1, config.max_batch_size)
}

pub struct Scheduler {
    config: SchedulerConfig,
    tick: AtomicU64,
    running: AtomicBool,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config, tick: AtomicU64::new(0), running: AtomicBool::new(false) }
    }

    /// Returns the wallets due this tick, grouped by chain in `CHAIN_ORDER`.
    /// Rejects overlapping ticks with a warning rather than queueing one. The
    /// caller must call `finish_tick` once the slice has actually been
    /// processed — the flag covers the whole ingest tick, not just this call.
    pub fn next_slice(&self, active_wallets: &[Wallet]) -> Vec<Vec<Wallet>> {
        if self.running.swap(true, Ordering::SeqCst) {
            logger::warning(LogTag::Scheduler, "ingest tick still running, skipping this rotation");
            return Vec::new();
        }

        self.compute_slice(active_wallets)
    }

    /// Clears the reentrancy flag. Call once the slice returned by
    /// `next_slice` has been fully processed (or immediately if the slice
    /// was empty because a tick was already running).
    pub fn finish_tick(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn compute_slice(&self, active_wallets: &[Wallet]) -> Vec<Vec<Wallet>> {
        let active_count = active_wallets.len();
        if active_count == 0 {
            return Vec::new();
        }

        let batch = batch_size(active_count, &self.config);
        let num_slices = active_count.div_ceil(batch);
        let tick = self.tick.fetch_add(1, Ordering::SeqCst);
        let slice_index = (tick as usize) % num_slices;

        let start = slice_index * batch;
        let end = (start + batch).min(active_count);
        let due: Vec<&Wallet> = active_wallets[start..end].iter().collect();

        CHAIN_ORDER
            .iter()
            .map(|chain| due.iter().filter(|w| w.chain == *chain).map(|w| (*w).clone()).collect::<Vec<_>>())
            .filter(|group: &Vec<Wallet>| !group.is_empty())
            .collect()
    }

    /// Sleep `inter_chain_settle_ms` between chain groups, but never after
    /// the last one — a trailing sleep would waste the whole inter-tick
    /// budget for nothing.
    pub async fn settle_between_chains(&self, chain_index: usize, total_chains: usize) {
        if chain_index + 1 < total_chains {
            tokio::time::sleep(Duration::from_millis(self.config.inter_chain_settle_ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StrategyName;

    fn wallets(n: usize, chain: Chain) -> Vec<Wallet> {
        (0..n).map(|i| Wallet::new(format!("0x{}", i), chain, StrategyName::CopyTrade)).collect()
    }

    #[test]
    fn batch_size_is_capped_at_six() {
        let config = SchedulerConfig::default();
        assert_eq!(batch_size(100, &config), 6);
        assert_eq!(batch_size(5, &config), 1);
        assert_eq!(batch_size(11, &config), 3);
    }

    #[test]
    fn every_wallet_is_visited_once_per_full_rotation() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let pool = wallets(12, Chain::Base);
        let batch = batch_size(pool.len(), &scheduler.config);
        let num_slices = pool.len().div_ceil(batch);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..num_slices {
            for group in scheduler.next_slice(&pool) {
                for wallet in group {
                    seen.insert(wallet.address.clone());
                }
            }
            scheduler.finish_tick();
        }
        assert_eq!(seen.len(), pool.len());
    }

    #[test]
    fn empty_wallet_set_returns_empty_slice_not_panic() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        assert!(scheduler.next_slice(&[]).is_empty());
        scheduler.finish_tick();
    }

    #[test]
    fn overlapping_tick_is_rejected_with_an_empty_slice() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let pool = wallets(12, Chain::Base);

        assert!(!scheduler.next_slice(&pool).is_empty());
        assert!(scheduler.next_slice(&pool).is_empty());
        scheduler.finish_tick();
    }

    #[test]
    fn slices_group_by_chain_in_stable_order() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let mut pool = wallets(2, Chain::Solana);
        pool.extend(wallets(2, Chain::Ethereum));

        let groups = scheduler.compute_slice(&pool);
        if groups.len() > 1 {
            assert_eq!(groups[0][0].chain, Chain::Ethereum);
        }
    }
}
