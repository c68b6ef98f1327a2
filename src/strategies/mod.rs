//! The strategy catalogue and its dispatch surface (§4.5).
//!
//! Each strategy is a zero-sized unit struct implementing `Strategy`.
//! `evaluate` is async (it may read Store and PriceOracle); `exit` is
//! deliberately synchronous, so an owning trade can never be left hanging on
//! an in-flight lookup mid-exit-check.

mod adaptive;
mod arbitrage;
mod copy_trade;
mod early_gem;
mod memecoin;
mod smart_money;
mod volume_breakout;

pub use adaptive::{active_delegate, is_auto_paused, AdaptiveStrategy};
pub use arbitrage::ArbitrageStrategy;
pub use copy_trade::CopyTradeStrategy;
pub use early_gem::EarlyGemStrategy;
pub use memecoin::MemecoinStrategy;
pub use smart_money::SmartMoneyStrategy;
pub use volume_breakout::VolumeBreakoutStrategy;

use crate::config::StrategyConfig;
use crate::domain::{Confidence, Decision, ExitDecision, ExitReason, PaperTrade, StrategyName, Transfer, Wallet};
use crate::pricing::PriceOracle;
use crate::store::Store;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub struct EvalContext<'a> {
    pub store: &'a Store,
    pub price_oracle: &'a PriceOracle,
    pub config: &'a StrategyConfig,
    pub now: DateTime<Utc>,
}

pub struct ExitContext<'a> {
    pub config: &'a StrategyConfig,
    pub now: DateTime<Utc>,
}

#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> StrategyName;

    async fn evaluate(&self, tx: &Transfer, wallet: &Wallet, ctx: &EvalContext<'_>) -> Decision;

    fn exit(&self, trade: &mut PaperTrade, current_price: f64, ctx: &ExitContext<'_>) -> ExitDecision;

    /// Multiplier applied to a candidate's size during winner selection
    /// (§4.7). Lets a strategy express "I am the right call for this
    /// transfer" beyond raw position size alone.
    fn affinity(&self, tx: &Transfer) -> f64;
}

/// Forces a full exit once a trade has been open at least `time_stop_hours`,
/// independent of whatever the owning strategy's own Exit would otherwise
/// decide (§4.5/§4.7). Every strategy's `exit` should check this first.
pub fn time_stop(trade: &PaperTrade, config: &StrategyConfig, now: DateTime<Utc>) -> Option<ExitDecision> {
    let age_hours = trade.age(now).num_seconds() as f64 / 3600.0;
    if age_hours >= config.time_stop_hours {
        Some(ExitDecision::Exit { fraction: 1.0, reason: ExitReason::TimeStop })
    } else {
        None
    }
}

/// `(current - entry) / entry`, used by every strategy's stop/take-profit
/// check. Returns 0 rather than dividing by zero for a malformed trade.
pub fn pnl_pct(entry_price: f64, current_price: f64) -> f64 {
    if entry_price <= 0.0 {
        0.0
    } else {
        (current_price - entry_price) / entry_price
    }
}

pub struct ScoredCandidate {
    pub strategy: StrategyName,
    pub size_usd: f64,
    pub confidence: Confidence,
    pub reason: String,
    pub score: f64,
}

/// Holds the closed catalogue of seven strategies.
pub struct StrategyEngine {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyEngine {
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(CopyTradeStrategy),
                Box::new(SmartMoneyStrategy),
                Box::new(VolumeBreakoutStrategy),
                Box::new(MemecoinStrategy),
                Box::new(ArbitrageStrategy),
                Box::new(EarlyGemStrategy),
                Box::new(AdaptiveStrategy),
            ],
        }
    }

    pub fn strategy_by_name(&self, name: StrategyName) -> Option<&dyn Strategy> {
        self.strategies.iter().find(|s| s.name() == name).map(|s| s.as_ref())
    }

    pub fn all(&self) -> &[Box<dyn Strategy>] {
        &self.strategies
    }

    /// Evaluates every enabled strategy and scores every one that votes to
    /// copy. The winner is the highest `size_usd * affinity`, ties broken by
    /// confidence then strategy name — never the first strategy that
    /// happened to vote yes, which would let CopyTrade's deliberate fallback
    /// posture eat every trade ahead of a more specific strategy (§4.7).
    pub async fn select_winner(&self, tx: &Transfer, wallet: &Wallet, ctx: &EvalContext<'_>) -> Option<ScoredCandidate> {
        let mut candidates = Vec::new();

        for strategy in &self.strategies {
            if let Decision::Copy { size_usd, confidence, reason } = strategy.evaluate(tx, wallet, ctx).await {
                let score = size_usd * strategy.affinity(tx);
                candidates.push(ScoredCandidate { strategy: strategy.name(), size_usd, confidence, reason, score });
            }
        }

        candidates.into_iter().max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.confidence.cmp(&b.confidence))
                .then_with(|| b.strategy.as_str().cmp(a.strategy.as_str()))
        })
    }
}

impl Default for StrategyEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, Chain, WalletStatus};

    fn sample_tx(value_usd: f64) -> Transfer {
        Transfer {
            wallet_address: "0xwal".to_string(),
            chain: Chain::Base,
            tx_hash: "0xhash".to_string(),
            token_address: "0xtok".to_string(),
            token_symbol: "TOK".to_string(),
            action: Action::Buy,
            amount: 100.0,
            price_usd: 1.0,
            total_value_usd: value_usd,
            timestamp: Utc::now(),
            block_number: Some(1),
        }
    }

    #[tokio::test]
    async fn a_large_buy_is_not_won_by_the_first_matching_strategy() {
        let store = Store::open_in_memory().unwrap();
        let oracle = PriceOracle::new(&crate::config::PricingConfig::default());
        let config = StrategyConfig::default();
        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now: Utc::now() };

        let mut wallet = Wallet::new("0xwal".to_string(), Chain::Base, StrategyName::CopyTrade);
        wallet.status = WalletStatus::Active;
        wallet.total_trades = 30;
        wallet.successful_trades = 20;
        wallet.recompute_win_rate();

        // $5,000 clears SmartMoney's whale threshold; CopyTrade also votes
        // yes (it has no upper gate beyond its own per-trade cap), but
        // SmartMoney's larger affinity-weighted size should win.
        let tx = sample_tx(5_000.0);
        let engine = StrategyEngine::new();
        let winner = engine.select_winner(&tx, &wallet, &ctx).await;

        assert!(winner.is_some());
        assert_eq!(winner.unwrap().strategy, StrategyName::SmartMoney);
    }
}
