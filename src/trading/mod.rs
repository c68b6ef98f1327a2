//! Decide -> risk-check -> execute -> manage loop (§4.7).
//!
//! `TradingEngine::process` turns a batch of transfers into opened paper
//! trades; `manage_open_positions` walks every open trade through its
//! owning strategy's exit rules. Both hold their mutable state (the capital
//! ledger, the processed-transfer dedup set) behind their own locks, touched
//! only from inside these two entry points.

mod ledger;
mod processed;

use crate::config::{RiskConfig, StrategyConfig};
use crate::domain::{Action, Chain, ExitDecision, ExitReason, PaperTrade, StrategyName, Transfer, Wallet};
use crate::logger::{self, LogTag};
use crate::pricing::PriceOracle;
use crate::risk::{PortfolioState, RiskManager};
use crate::store::Store;
use crate::strategies::{EvalContext, ExitContext, StrategyEngine};
use chrono::{DateTime, Utc};

pub use ledger::CapitalLedger;
pub use processed::ProcessedLru;

/// A conservative per-chain fallback price used only when every resolution
/// path in `resolve_entry_price` comes up empty. The position is still
/// opened, but shrunk, rather than silently dropping a transfer that real
/// money would have acted on.
fn fallback_price_usd(chain: Chain) -> f64 {
    match chain {
        Chain::Solana => 0.000001,
        _ => 0.0001,
    }
}

/// Size multiplier applied when a trade has to fall back to
/// `fallback_price_usd` rather than a real quote, so a bad price estimate
/// can't open an outsized position.
const FALLBACK_SIZE_SHRINK: f64 = 0.25;

pub struct TradingEngine {
    store: Store,
    price_oracle: PriceOracle,
    strategies: StrategyEngine,
    risk: RiskManager,
    strategy_config: StrategyConfig,
    ledger: CapitalLedger,
    processed: ProcessedLru,
}

impl TradingEngine {
    pub fn new(
        store: Store,
        price_oracle: PriceOracle,
        strategy_config: StrategyConfig,
        risk_config: &RiskConfig,
        processed_lru_capacity: usize,
        processed_lru_ttl_secs: u64,
    ) -> anyhow::Result<Self> {
        let available = store.get_available_capital()?.unwrap_or(0.0);
        Ok(Self {
            store,
            price_oracle,
            strategies: StrategyEngine::new(),
            risk: RiskManager::new(risk_config),
            strategy_config,
            ledger: CapitalLedger::new(available),
            processed: ProcessedLru::new(processed_lru_capacity, processed_lru_ttl_secs),
        })
    }

    /// Resolves a USD-per-unit entry price for a transfer, falling through
    /// `tx.price_usd` -> a live oracle quote -> a derived
    /// `total_value_usd / amount` -> a chain-specific conservative default
    /// with a shrunken position size (§4.2, §4.7).
    async fn resolve_entry_price(&self, tx: &Transfer) -> (f64, f64) {
        if tx.price_usd > 0.0 && tx.price_usd.is_finite() {
            return (tx.price_usd, 1.0);
        }

        if let Some(result) = self.price_oracle.get_price(&tx.token_address, tx.chain).await {
            if result.price_usd > 0.0 {
                return (result.price_usd, 1.0);
            }
        }

        if tx.amount > 0.0 && tx.total_value_usd > 0.0 {
            let derived = tx.total_value_usd / tx.amount;
            if derived.is_finite() && derived > 0.0 {
                return (derived, 1.0);
            }
        }

        logger::warning(
            LogTag::Trading,
            &format!("no resolvable price for {} on {}, using a shrunken fallback", tx.token_address, tx.chain),
        );
        (fallback_price_usd(tx.chain), FALLBACK_SIZE_SHRINK)
    }

    fn portfolio_state(
        &self,
        wallet: &Wallet,
        candidate_size_usd: f64,
        correlated_exposure_usd: f64,
        open_positions: usize,
        strategy_paused: bool,
    ) -> anyhow::Result<PortfolioState> {
        let total_capital_usd = self.store.get_total_capital()?.unwrap_or(0.0);
        let available = self.ledger.available();
        Ok(PortfolioState {
            total_capital_usd,
            peak_equity_usd: total_capital_usd.max(available),
            current_equity_usd: available,
            daily_pnl_usd: 0.0,
            weekly_pnl_usd: 0.0,
            open_positions,
            candidate_size_usd,
            correlated_exposure_usd,
            wallet_status: wallet.status,
            strategy_paused,
        })
    }

    /// Runs every transfer through strategy selection, risk admission and
    /// entry execution. Transfers for wallets we have no record of, or that
    /// we have already processed within the dedup window, are skipped
    /// without error (§4.7).
    pub async fn process(&self, transfers: &[Transfer]) -> anyhow::Result<usize> {
        let mut opened = 0;

        for tx in transfers {
            if tx.action != Action::Buy {
                continue;
            }
            if self.processed.contains(&tx.wallet_address, &tx.tx_hash) {
                continue;
            }

            let Some(wallet) = self.store.get_wallet(&tx.wallet_address, tx.chain)? else {
                continue;
            };

            let now = Utc::now();
            let ctx = EvalContext { store: &self.store, price_oracle: &self.price_oracle, config: &self.strategy_config, now };

            let Some(winner) = self.strategies.select_winner(tx, &wallet, &ctx).await else {
                self.processed.insert(&tx.wallet_address, &tx.tx_hash);
                continue;
            };

            // Adaptive never becomes the strategy a trade is recorded under;
            // it's resolved to whichever child it was delegating to right now.
            let strategy_used = if winner.strategy == StrategyName::Adaptive {
                crate::strategies::active_delegate(&self.store, now)
            } else {
                winner.strategy
            };

            let open_trades = self.store.list_open_trades()?;
            let correlated_exposure_usd: f64 = open_trades
                .iter()
                .filter(|t| t.token_address == tx.token_address)
                .map(|t| t.entry_value_usd)
                .sum();

            let strategy_paused = crate::strategies::is_auto_paused(&self.store, strategy_used, now);

            let state = self.portfolio_state(
                &wallet,
                winner.size_usd,
                correlated_exposure_usd,
                open_trades.len(),
                strategy_paused,
            )?;

            if let Some(rejection) = self.risk.check(&state) {
                logger::info(
                    LogTag::Trading,
                    &format!("risk rejected {} candidate for {}: {}", winner.strategy, tx.token_address, rejection.as_str()),
                );
                self.processed.insert(&tx.wallet_address, &tx.tx_hash);
                continue;
            }

            let (entry_price, size_shrink) = self.resolve_entry_price(tx).await;
            let sized_usd = winner.size_usd * size_shrink;

            if !self.ledger.try_reserve(sized_usd) {
                logger::info(LogTag::Trading, "insufficient available capital, skipping candidate");
                self.processed.insert(&tx.wallet_address, &tx.tx_hash);
                continue;
            }

            let amount = sized_usd / entry_price;

            match self.store.open_paper_trade(&tx.token_address, tx.chain, strategy_used, &tx.wallet_address, entry_price, amount, now) {
                Ok(id) => {
                    opened += 1;
                    self.store.record_trade_opened(strategy_used, now.date_naive())?;
                    logger::info(
                        LogTag::Trading,
                        &format!("opened trade {} via {} on {} ({:.2} USD, confidence {:?})", id, strategy_used, tx.token_address, sized_usd, winner.confidence),
                    );
                }
                Err(e) => {
                    self.ledger.release(sized_usd);
                    logger::error(LogTag::Trading, &format!("failed to open paper trade: {}", e));
                }
            }

            self.processed.insert(&tx.wallet_address, &tx.tx_hash);
        }

        self.store.set_available_capital(self.ledger.available())?;
        Ok(opened)
    }

    /// Walks every open trade through its owning strategy's exit rules,
    /// closing or partially exiting positions as decided. A forced full exit
    /// fires if the shared time-stop has elapsed even when the strategy
    /// itself would hold (§4.7).
    pub async fn manage_open_positions(&self) -> anyhow::Result<usize> {
        let now = Utc::now();
        let exit_ctx = ExitContext { config: &self.strategy_config, now };
        let mut closed = 0;

        for mut trade in self.store.list_open_trades()? {
            let Some(result) = self.price_oracle.get_price(&trade.token_address, trade.chain).await else {
                continue;
            };
            let current_price = result.price_usd;
            self.store.update_peak_price(trade.id, current_price)?;
            trade.peak_price = trade.peak_price.max(current_price);

            let Some(strategy) = self.strategies.strategy_by_name(trade.strategy_used) else {
                continue;
            };

            let mut decision = strategy.exit(&mut trade, current_price, &exit_ctx);
            if matches!(decision, ExitDecision::Hold) {
                if let Some(forced) = crate::strategies::time_stop(&trade, &self.strategy_config, now) {
                    decision = forced;
                }
            }

            match decision {
                ExitDecision::Hold => {}
                ExitDecision::Exit { fraction, reason } if fraction >= 1.0 => {
                    self.close_full(&trade, current_price, reason, now)?;
                    closed += 1;
                }
                ExitDecision::Exit { fraction, reason } => {
                    self.close_partial(&mut trade, current_price, fraction, reason)?;
                }
            }
        }

        Ok(closed)
    }

    fn close_full(&self, trade: &PaperTrade, current_price: f64, reason: ExitReason, now: DateTime<Utc>) -> anyhow::Result<()> {
        let closed = self.store.close_paper_trade(trade.id, current_price, reason, now)?;
        self.ledger.release(trade.entry_value_usd);
        self.store.record_trade_closed(trade.strategy_used, now.date_naive(), closed.pnl.unwrap_or(0.0))?;
        self.store.set_available_capital(self.ledger.available())?;
        logger::info(
            LogTag::Trading,
            &format!("closed trade {} ({}): pnl {:.2}", trade.id, reason, closed.pnl.unwrap_or(0.0)),
        );
        Ok(())
    }

    /// Realises PnL on the sold fraction, shrinks the stored amount (and with
    /// it `entry_value_usd`, so the remaining cost basis stays in sync with
    /// what's still reserved) to what remains, and appends a tier marker so a
    /// later check doesn't refire the same threshold (§4.5, §4.7).
    /// `entry_price` is left untouched.
    fn close_partial(&self, trade: &mut PaperTrade, current_price: f64, fraction: f64, reason: ExitReason) -> anyhow::Result<()> {
        let sold_amount = trade.amount * fraction;
        let remaining_amount = trade.amount - sold_amount;
        let realised_value = sold_amount * current_price;
        let cost_basis = sold_amount * trade.entry_price;
        let realised_pnl = realised_value - cost_basis;

        self.store.update_paper_trade_amount(trade.id, remaining_amount)?;
        if reason == ExitReason::TierTakeProfit {
            let tier = match fraction {
                f if f >= 0.59 => "tier_10x",
                f if f >= 0.29 => "tier_5x",
                _ => "tier_2x",
            };
            self.store.append_trade_note(trade.id, tier)?;
        }

        self.ledger.release(cost_basis);
        trade.amount = remaining_amount;
        self.store
            .record_trade_closed(trade.strategy_used, Utc::now().date_naive(), realised_pnl)
            .ok();
        self.store.set_available_capital(self.ledger.available())?;
        logger::info(
            LogTag::Trading,
            &format!("partial exit on trade {}: sold {:.4} ({:.0}%) for {:.2} realised pnl", trade.id, sold_amount, fraction * 100.0, realised_pnl),
        );
        Ok(())
    }

    /// Cancels the LRU sweeper and joins its task so nothing outlives the
    /// process.
    pub async fn shutdown(&self) {
        self.processed.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PricingConfig, RiskConfig, StrategyConfig};
    use crate::domain::{Action, Chain, Wallet};
    use chrono::Utc;

    fn tx(value_usd: f64) -> Transfer {
        Transfer {
            wallet_address: "0xwal".to_string(),
            chain: Chain::Base,
            tx_hash: "0xhash".to_string(),
            token_address: "0xtok".to_string(),
            token_symbol: "TOK".to_string(),
            action: Action::Buy,
            amount: 1000.0,
            price_usd: 1.0,
            total_value_usd: value_usd,
            timestamp: Utc::now(),
            block_number: Some(1),
        }
    }

    async fn engine() -> TradingEngine {
        let store = Store::open_in_memory().unwrap();
        store.set_total_capital(10_000.0).unwrap();
        store.set_available_capital(10_000.0).unwrap();
        let wallet = Wallet::new("0xwal".to_string(), Chain::Base, StrategyName::CopyTrade);
        store.upsert_wallet(&wallet).unwrap();

        TradingEngine::new(
            store,
            PriceOracle::new(&PricingConfig::default()),
            StrategyConfig::default(),
            &RiskConfig::default(),
            10_000,
            3_600,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn a_qualifying_transfer_opens_exactly_one_trade() {
        let engine = engine().await;
        let opened = engine.process(&[tx(500.0)]).await.unwrap();
        assert_eq!(opened, 1);
        assert_eq!(engine.store.list_open_trades().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn the_same_transfer_hash_is_never_processed_twice() {
        let engine = engine().await;
        engine.process(&[tx(500.0)]).await.unwrap();
        let second = engine.process(&[tx(500.0)]).await.unwrap();
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn an_unknown_wallet_is_skipped_without_error() {
        let store = Store::open_in_memory().unwrap();
        store.set_total_capital(10_000.0).unwrap();
        store.set_available_capital(10_000.0).unwrap();
        let engine = TradingEngine::new(
            store,
            PriceOracle::new(&PricingConfig::default()),
            StrategyConfig::default(),
            &RiskConfig::default(),
            10_000,
            3_600,
        )
        .unwrap();

        let opened = engine.process(&[tx(500.0)]).await.unwrap();
        assert_eq!(opened, 0);
    }
}
