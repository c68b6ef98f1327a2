//! Wallet discovery pipeline (§4.8): pump detection -> early-buyer query ->
//! per-wallet performance scoring -> top-K insertion, capped at a daily
//! budget regardless of how often `run` is invoked.

mod metrics;

use crate::config::DiscoveryConfig;
use crate::domain::{Action, Chain, DiscoveredWallet, Token};
use crate::logger::{self, LogTag};
use crate::store::Store;
use chrono::{DateTime, Utc};
use metrics::{compute_wallet_metrics, WalletMetrics};
use std::collections::HashMap;

pub struct Discovery {
    store: Store,
    config: DiscoveryConfig,
}

struct ScoredCandidate {
    address: String,
    chain: Chain,
    metrics: WalletMetrics,
    score: f64,
}

impl Discovery {
    pub fn new(store: Store, config: DiscoveryConfig) -> Self {
        Self { store, config }
    }

    /// Runs one discovery pass, returning how many new wallets were
    /// inserted. A no-op once the daily budget is spent, independent of how
    /// often the caller invokes it (the Supervisor ticks this every 6h by
    /// default, but a manual `/api/discover` call must respect the same cap).
    pub fn run(&self, now: DateTime<Utc>) -> anyhow::Result<usize> {
        self.roll_daily_counter(now)?;

        let remaining = self.config.daily_limit.saturating_sub(self.store.get_discovery_count_today()?);
        if remaining == 0 {
            logger::info(LogTag::Discovery, "daily discovery budget spent, skipping this run");
            return Ok(0);
        }

        let pumped = self.store.pump_candidates(
            now,
            chrono::Duration::days(self.config.pump_timeframe_days),
            self.config.pump_threshold_multiple,
        )?;
        logger::debug(LogTag::Discovery, &format!("{} pumped tokens found this pass", pumped.len()));

        let mut seen_wallets: HashMap<(String, Chain), ()> = HashMap::new();
        let mut candidates = Vec::new();

        for token in &pumped {
            for (address, chain) in self.early_buyers(token)? {
                if seen_wallets.contains_key(&(address.clone(), chain)) {
                    continue;
                }
                seen_wallets.insert((address.clone(), chain), ());

                if self.store.is_wallet_already_tracked(&address, chain)? {
                    continue;
                }

                let history = self.store.all_transfers_for_wallet(&address, chain)?;
                let metrics = compute_wallet_metrics(&history);
                if !self.passes_thresholds(&metrics) {
                    continue;
                }

                let score = self.score(&metrics);
                candidates.push(ScoredCandidate { address, chain, metrics, score });
            }
        }

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        let take = self.config.top_k_per_run.min(remaining as usize);

        let mut inserted = 0;
        for candidate in candidates.into_iter().take(take) {
            let wallet = DiscoveredWallet {
                address: candidate.address.clone(),
                chain: candidate.chain,
                first_seen: now,
                profitability_score: candidate.score,
                estimated_win_rate: candidate.metrics.win_rate,
                tracked_trades: candidate.metrics.trade_count,
                successful_tracked_trades: (candidate.metrics.win_rate * candidate.metrics.trade_count as f64).round() as u32,
                promoted: false,
                promoted_date: None,
                discovery_method: "pump_early_buyer".to_string(),
                rejection_reason: None,
            };
            self.store.insert_discovered_wallet(&wallet)?;
            self.store.increment_discovery_count_today()?;
            inserted += 1;
            logger::info(
                LogTag::Discovery,
                &format!("discovered wallet {} on {:?} (score {:.1})", candidate.address, candidate.chain, candidate.score),
            );
        }

        self.store.set_last_discovery_run(now)?;
        Ok(inserted)
    }

    /// Resets the daily counter the first time `run` is called on a new
    /// calendar day relative to the last recorded run.
    fn roll_daily_counter(&self, now: DateTime<Utc>) -> anyhow::Result<()> {
        let is_new_day = match self.store.get_last_discovery_run()? {
            Some(last) => last.date_naive() != now.date_naive(),
            None => true,
        };
        if is_new_day {
            self.store.set_discovery_count_today(0)?;
        }
        Ok(())
    }

    /// Wallets whose buy on this token landed in the bottom
    /// `early_buy_fraction` of the price range observed since the token's
    /// `first_seen`.
    fn early_buyers(&self, token: &Token) -> anyhow::Result<Vec<(String, Chain)>> {
        let transfers = self.store.transfers_for_token(&token.address, token.chain, token.first_seen)?;
        let buys: Vec<_> = transfers.iter().filter(|t| t.action == Action::Buy && t.price_usd > 0.0).collect();
        if buys.is_empty() {
            return Ok(Vec::new());
        }

        let lo = buys.iter().map(|t| t.price_usd).fold(f64::MAX, f64::min);
        let hi = buys.iter().map(|t| t.price_usd).fold(f64::MIN, f64::max);
        let range = hi - lo;
        let cutoff = if range <= 0.0 { hi } else { lo + range * self.config.early_buy_fraction };

        let mut wallets = Vec::new();
        let mut seen = HashMap::new();
        for tx in buys {
            if tx.price_usd <= cutoff && !seen.contains_key(&tx.wallet_address) {
                seen.insert(tx.wallet_address.clone(), ());
                wallets.push((tx.wallet_address.clone(), tx.chain));
            }
        }
        Ok(wallets)
    }

    fn passes_thresholds(&self, metrics: &WalletMetrics) -> bool {
        metrics.trade_count >= self.config.min_trade_count
            && metrics.win_rate >= self.config.min_win_rate
            && metrics.realised_profit_usd >= self.config.min_profit_usd
    }

    /// Weighted [0, 100] composite: win rate 40%, profitability 30%,
    /// consistency 15%, risk management 15%. Profitability is normalised
    /// against five times the minimum qualifying profit so a wallet right at
    /// the threshold scores low on this component rather than saturating it.
    fn score(&self, metrics: &WalletMetrics) -> f64 {
        let win_rate_component = metrics.win_rate.max(0.0).min(1.0) * 40.0;
        let profitability_component =
            (metrics.realised_profit_usd / (self.config.min_profit_usd * 5.0)).max(0.0).min(1.0) * 30.0;
        let consistency_component = metrics.consistency * 15.0;
        let risk_component = metrics.risk_management * 15.0;
        win_rate_component + profitability_component + consistency_component + risk_component
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Transfer;

    fn test_store() -> Store {
        Store::open_in_memory().unwrap()
    }

    fn transfer(wallet: &str, token: &str, action: Action, amount: f64, price: f64, at: DateTime<Utc>) -> Transfer {
        Transfer {
            wallet_address: wallet.to_string(),
            chain: Chain::Base,
            tx_hash: format!("{}-{}-{:?}-{}", wallet, token, action, at.timestamp_nanos_opt().unwrap_or(0)),
            token_address: token.to_string(),
            token_symbol: "TOK".to_string(),
            action,
            amount,
            price_usd: price,
            total_value_usd: amount * price,
            timestamp: at,
            block_number: Some(1),
        }
    }

    #[test]
    fn a_run_with_no_pumped_tokens_inserts_nothing() {
        let store = test_store();
        let discovery = Discovery::new(store, DiscoveryConfig::default());
        let inserted = discovery.run(Utc::now()).unwrap();
        assert_eq!(inserted, 0);
    }

    #[test]
    fn the_daily_counter_resets_on_a_new_calendar_day() {
        let store = test_store();
        store.set_discovery_count_today(15).unwrap();
        store.set_last_discovery_run(Utc::now() - chrono::Duration::days(2)).unwrap();
        let discovery = Discovery::new(store, DiscoveryConfig::default());
        // Budget was fully spent yesterday; today's first run should have
        // room again because the counter rolls over to a new day.
        discovery.run(Utc::now()).unwrap();
        assert!(discovery.store.get_discovery_count_today().unwrap() < 15);
    }

    #[test]
    fn early_buyers_prefers_the_cheapest_entrants() {
        let store = test_store();
        let now = Utc::now();
        let token = Token {
            address: "0xtok".to_string(),
            chain: Chain::Base,
            symbol: "TOK".to_string(),
            decimals: 18,
            first_seen: now - chrono::Duration::hours(1),
            creation_time: None,
            current_price_usd: 2.0,
            max_price_usd: 6.0,
            market_cap_usd: None,
            last_updated: now,
        };
        store
            .add_transfer(&transfer("0xearly", "0xtok", Action::Buy, 100.0, 1.0, now - chrono::Duration::minutes(50)))
            .unwrap();
        store
            .add_transfer(&transfer("0xlate", "0xtok", Action::Buy, 100.0, 5.0, now - chrono::Duration::minutes(10)))
            .unwrap();

        let discovery = Discovery::new(store, DiscoveryConfig::default());
        let buyers = discovery.early_buyers(&token).unwrap();
        assert_eq!(buyers, vec![("0xearly".to_string(), Chain::Base)]);
    }
}
