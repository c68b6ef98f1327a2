use super::{pnl_pct, time_stop, EvalContext, ExitContext, Strategy};
use crate::domain::{Confidence, Decision, ExitDecision, ExitReason, PaperTrade, StrategyName, Transfer, Wallet, WalletStatus};
use async_trait::async_trait;

const STOP_LOSS_PCT: f64 = -0.12;
const TAKE_PROFIT_PCT: f64 = 0.40;
const TRAILING_ENGAGE_PCT: f64 = 0.30;
const TRAILING_GIVEBACK_PCT: f64 = 0.10;

/// The fallback strategy: copies any buy from an active wallet once it
/// clears a minimum size, sized as a fraction of the source transfer capped
/// at a flat per-trade ceiling (§4.5).
pub struct CopyTradeStrategy;

#[async_trait]
impl Strategy for CopyTradeStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::CopyTrade
    }

    async fn evaluate(&self, tx: &Transfer, wallet: &Wallet, ctx: &EvalContext<'_>) -> Decision {
        if wallet.status != WalletStatus::Active {
            return Decision::Skip { reason: "wallet not active".to_string() };
        }
        if !matches!(tx.action, crate::domain::Action::Buy) {
            return Decision::Skip { reason: "not a buy".to_string() };
        }

        let value = tx.effective_value_usd();
        if value < ctx.config.copy_min_trade_usd {
            return Decision::Skip { reason: format!("${:.2} below minimum", value) };
        }

        // A known win rate below 40% disqualifies the wallet outright; an
        // unknown win rate (brand new wallet) is neither penalised nor
        // rewarded here.
        if let Some(win_rate) = wallet.win_rate {
            if win_rate < 0.40 {
                return Decision::Skip { reason: format!("win rate {:.0}% too low", win_rate * 100.0) };
            }
        }

        let size_usd = (value * ctx.config.copy_pct_of_tx).min(ctx.config.copy_max_per_trade_usd);
        let confidence = match wallet.win_rate {
            Some(rate) if rate >= 0.65 => Confidence::High,
            Some(_) => Confidence::Medium,
            None => Confidence::Low,
        };

        Decision::Copy { size_usd, confidence, reason: format!("copying ${:.2} buy from {}", value, wallet.address) }
    }

    fn exit(&self, trade: &mut PaperTrade, current_price: f64, ctx: &ExitContext<'_>) -> ExitDecision {
        if let Some(exit) = time_stop(trade, ctx.config, ctx.now) {
            return exit;
        }

        let pnl = pnl_pct(trade.entry_price, current_price);
        if pnl <= STOP_LOSS_PCT {
            return ExitDecision::Exit { fraction: 1.0, reason: ExitReason::StopLoss };
        }
        if pnl >= TAKE_PROFIT_PCT {
            return ExitDecision::Exit { fraction: 1.0, reason: ExitReason::TakeProfit };
        }

        // Once a trade has run up past the engage threshold, a pullback of
        // `giveback_pct` of the peak-vs-entry gain closes it out, locking in
        // most of the run rather than riding it back to flat.
        let peak_gain = pnl_pct(trade.entry_price, trade.peak_price);
        if peak_gain >= TRAILING_ENGAGE_PCT {
            let giveback_floor = trade.peak_price * (1.0 - TRAILING_GIVEBACK_PCT);
            if current_price <= giveback_floor {
                return ExitDecision::Exit { fraction: 1.0, reason: ExitReason::TrailingStop };
            }
        }

        ExitDecision::Hold
    }

    fn affinity(&self, _tx: &Transfer) -> f64 {
        // Deliberately below 1.0: CopyTrade is the broadest net and would eat
        // every trade ahead of a more specific strategy if weighted evenly.
        0.85
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PricingConfig, StrategyConfig};
    use crate::domain::{Action, Chain};
    use crate::pricing::PriceOracle;
    use crate::store::Store;
    use chrono::{Duration, Utc};

    fn tx(value_usd: f64) -> Transfer {
        Transfer {
            wallet_address: "0xwal".to_string(),
            chain: Chain::Base,
            tx_hash: "0xhash".to_string(),
            token_address: "0xtok".to_string(),
            token_symbol: "TOK".to_string(),
            action: Action::Buy,
            amount: 10.0,
            price_usd: 1.0,
            total_value_usd: value_usd,
            timestamp: Utc::now(),
            block_number: Some(1),
        }
    }

    fn trade(entry_price: f64, peak_price: f64, opened_at: chrono::DateTime<Utc>) -> PaperTrade {
        PaperTrade {
            id: 1,
            token_address: "0xtok".to_string(),
            chain: Chain::Base,
            strategy_used: StrategyName::CopyTrade,
            source_wallet: "0xwal".to_string(),
            entry_price,
            amount: 10.0,
            entry_value_usd: entry_price * 10.0,
            peak_price,
            status: crate::domain::TradeStatus::Open,
            opened_at,
            exit_price: None,
            exit_value_usd: None,
            pnl: None,
            pnl_percentage: None,
            exit_time: None,
            exit_reason: None,
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn below_minimum_size_is_skipped() {
        let store = Store::open_in_memory().unwrap();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let config = StrategyConfig::default();
        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now: Utc::now() };
        let wallet = Wallet::new("0xwal".to_string(), Chain::Base, StrategyName::CopyTrade);

        let decision = CopyTradeStrategy.evaluate(&tx(10.0), &wallet, &ctx).await;
        assert!(matches!(decision, Decision::Skip { .. }));
    }

    #[tokio::test]
    async fn low_win_rate_wallet_is_skipped() {
        let store = Store::open_in_memory().unwrap();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let config = StrategyConfig::default();
        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now: Utc::now() };
        let mut wallet = Wallet::new("0xwal".to_string(), Chain::Base, StrategyName::CopyTrade);
        wallet.total_trades = 20;
        wallet.successful_trades = 2;
        wallet.recompute_win_rate();

        let decision = CopyTradeStrategy.evaluate(&tx(500.0), &wallet, &ctx).await;
        assert!(matches!(decision, Decision::Skip { .. }));
    }

    #[test]
    fn time_stop_fires_regardless_of_price() {
        let config = StrategyConfig::default();
        let ctx = ExitContext { config: &config, now: Utc::now() };
        let mut t = trade(1.0, 1.0, Utc::now() - Duration::hours(49));

        let decision = CopyTradeStrategy.exit(&mut t, 1.0, &ctx);
        assert!(matches!(decision, ExitDecision::Exit { reason: ExitReason::TimeStop, fraction } if fraction == 1.0));
    }

    #[test]
    fn trailing_stop_fires_after_giveback_from_peak() {
        let config = StrategyConfig::default();
        let ctx = ExitContext { config: &config, now: Utc::now() };
        // entry 1.0, peak 1.35 (+35%, past the 30% engage threshold), now
        // pulled back to 1.20 which is <= 1.35 * 0.90 = 1.215... actually
        // compute exactly below the floor.
        let mut t = trade(1.0, 1.35, Utc::now());
        let floor = 1.35 * 0.9;
        let decision = CopyTradeStrategy.exit(&mut t, floor - 0.01, &ctx);
        assert!(matches!(decision, ExitDecision::Exit { reason: ExitReason::TrailingStop, .. }));
    }

    #[test]
    fn holds_when_nothing_triggers() {
        let config = StrategyConfig::default();
        let ctx = ExitContext { config: &config, now: Utc::now() };
        let mut t = trade(1.0, 1.05, Utc::now());
        let decision = CopyTradeStrategy.exit(&mut t, 1.02, &ctx);
        assert!(matches!(decision, ExitDecision::Hold));
    }
}
