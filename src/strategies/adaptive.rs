use super::{EvalContext, ExitContext, Strategy};
use crate::domain::{Decision, ExitDecision, PaperTrade, StrategyName, Transfer, Wallet};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Mirrors `RiskConfig::strategy_pause_pnl_pct`'s default. Adaptive needs a
/// lightweight read of "is my current delegate paused" without pulling the
/// full RiskConfig through `EvalContext`; RiskManager is still the
/// authoritative enforcement point for the real admission check.
const STRATEGY_PAUSE_PNL_PCT: f64 = -0.15;
const ROLLING_WINDOW_DAYS: i64 = 7;

const DELEGATES: [StrategyName; 6] = [
    StrategyName::CopyTrade,
    StrategyName::SmartMoney,
    StrategyName::VolumeBreakout,
    StrategyName::Memecoin,
    StrategyName::Arbitrage,
    StrategyName::EarlyGem,
];

fn build(name: StrategyName) -> Box<dyn Strategy> {
    match name {
        StrategyName::CopyTrade => Box::new(super::CopyTradeStrategy),
        StrategyName::SmartMoney => Box::new(super::SmartMoneyStrategy),
        StrategyName::VolumeBreakout => Box::new(super::VolumeBreakoutStrategy),
        StrategyName::Memecoin => Box::new(super::MemecoinStrategy),
        StrategyName::Arbitrage => Box::new(super::ArbitrageStrategy),
        StrategyName::EarlyGem => Box::new(super::EarlyGemStrategy),
        StrategyName::Adaptive => Box::new(AdaptiveStrategy),
    }
}

/// Rolling realised PnL as a fraction of total capital over the trailing
/// window, or `None` if there is no capital baseline or no closed trades yet
/// (an unestablished strategy is not "paused", it is simply untested).
pub fn rolling_pnl_pct(
    store: &crate::store::Store,
    strategy: StrategyName,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<f64>> {
    let Some(capital) = store.get_total_capital()? else { return Ok(None) };
    if capital <= 0.0 {
        return Ok(None);
    }

    let cutoff = (now - chrono::Duration::days(ROLLING_WINDOW_DAYS)).date_naive();
    let history = store.list_performance(strategy)?;
    let realised: f64 = history.iter().filter(|p| p.date >= cutoff).map(|p| p.realised_pnl_usd).sum();
    let closed: u32 = history.iter().filter(|p| p.date >= cutoff).map(|p| p.trades_closed).sum();

    if closed == 0 {
        Ok(None)
    } else {
        Ok(Some(realised / capital))
    }
}

pub fn is_auto_paused(store: &crate::store::Store, strategy: StrategyName, now: DateTime<Utc>) -> bool {
    match rolling_pnl_pct(store, strategy, now) {
        Ok(Some(pct)) => pct < STRATEGY_PAUSE_PNL_PCT,
        _ => false,
    }
}

/// Whichever other strategy currently has the best rolling realised PnL.
/// `TradingEngine` calls this directly so a trade Adaptive wins can be
/// recorded under the delegate's own name rather than `StrategyName::Adaptive`
/// (§4.5, §4.7).
pub fn active_delegate(store: &crate::store::Store, now: DateTime<Utc>) -> StrategyName {
    DELEGATES
        .iter()
        .copied()
        .filter_map(|name| rolling_pnl_pct(store, name, now).ok().flatten().map(|pct| (name, pct)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name)
        // No strategy has a rolling track record yet: default to the
        // broadest fallback rather than refusing to ever delegate.
        .unwrap_or(StrategyName::CopyTrade)
}

/// Delegates to whichever other strategy currently has the best rolling
/// realised PnL, rather than running a strategy of its own (§4.5). If that
/// delegate is itself auto-paused, Adaptive reports no-copy for this
/// evaluation instead of silently falling through to the next-best child —
/// the point of auto-pause is to stop copying a strategy that is losing, not
/// to reroute its trades elsewhere.
pub struct AdaptiveStrategy;

#[async_trait]
impl Strategy for AdaptiveStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::Adaptive
    }

    async fn evaluate(&self, tx: &Transfer, wallet: &Wallet, ctx: &EvalContext<'_>) -> Decision {
        let delegate = active_delegate(ctx.store, ctx.now);

        if is_auto_paused(ctx.store, delegate, ctx.now) {
            return Decision::Skip { reason: format!("current delegate {} is auto-paused", delegate) };
        }

        build(delegate).evaluate(tx, wallet, ctx).await
    }

    fn exit(&self, trade: &mut PaperTrade, current_price: f64, ctx: &ExitContext<'_>) -> ExitDecision {
        // A trade already carries the delegate that opened it, in
        // `strategy_used` — but Adaptive itself never becomes the value of
        // `strategy_used` (TradingEngine records the delegate, not
        // `StrategyName::Adaptive`). If this is ever called directly it
        // falls back to CopyTrade's exit rules.
        build(trade.strategy_used).exit(trade, current_price, ctx)
    }

    fn affinity(&self, tx: &Transfer) -> f64 {
        build(StrategyName::CopyTrade).affinity(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PricingConfig, StrategyConfig};
    use crate::domain::{Action, Chain};
    use crate::pricing::PriceOracle;
    use crate::store::Store;
    use chrono::Utc;

    fn tx() -> Transfer {
        Transfer {
            wallet_address: "0xwal".to_string(),
            chain: Chain::Base,
            tx_hash: "0xhash".to_string(),
            token_address: "0xtok".to_string(),
            token_symbol: "TOK".to_string(),
            action: Action::Buy,
            amount: 1000.0,
            price_usd: 1.0,
            total_value_usd: 1000.0,
            timestamp: Utc::now(),
            block_number: Some(1),
        }
    }

    #[tokio::test]
    async fn with_no_track_record_it_defaults_to_copy_trade() {
        let store = Store::open_in_memory().unwrap();
        let config = StrategyConfig::default();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now: Utc::now() };
        let wallet = Wallet::new("0xwal".to_string(), Chain::Base, StrategyName::Adaptive);

        let decision = AdaptiveStrategy.evaluate(&tx(), &wallet, &ctx).await;
        // CopyTrade requires a $50 minimum, which this transfer clears.
        assert!(decision.is_copy());
    }

    #[tokio::test]
    async fn a_paused_delegate_is_not_rerouted() {
        let store = Store::open_in_memory().unwrap();
        let config = StrategyConfig::default();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let now = Utc::now();
        store.set_total_capital(10_000.0).unwrap();
        store.record_trade_closed(StrategyName::CopyTrade, now.date_naive(), -2_000.0).unwrap();

        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now };
        let wallet = Wallet::new("0xwal".to_string(), Chain::Base, StrategyName::Adaptive);
        let decision = AdaptiveStrategy.evaluate(&tx(), &wallet, &ctx).await;
        assert!(matches!(decision, Decision::Skip { .. }));
    }
}
