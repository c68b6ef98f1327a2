use super::{pnl_pct, time_stop, EvalContext, ExitContext, Strategy};
use crate::domain::{Action, Confidence, Decision, ExitDecision, ExitReason, PaperTrade, StrategyName, Transfer, Wallet, WalletStatus};
use async_trait::async_trait;

const STOP_LOSS_PCT: f64 = -0.10;
const TAKE_PROFIT_PCT: f64 = 0.35;

/// Copies large, high-conviction buys from wallets whose transfer already
/// carries a resolvable USD value above the whale threshold (§4.5). Requires
/// a known price — an unresolved transfer is not "probably a whale buy", it
/// is unverifiable and gets skipped.
pub struct SmartMoneyStrategy;

#[async_trait]
impl Strategy for SmartMoneyStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::SmartMoney
    }

    async fn evaluate(&self, tx: &Transfer, wallet: &Wallet, ctx: &EvalContext<'_>) -> Decision {
        if wallet.status != WalletStatus::Active || tx.action != Action::Buy {
            return Decision::Skip { reason: "wallet inactive or not a buy".to_string() };
        }
        if tx.total_value_usd <= 0.0 {
            return Decision::Skip { reason: "no resolvable USD value for this transfer".to_string() };
        }
        if tx.total_value_usd < ctx.config.smart_money_whale_threshold_usd {
            return Decision::Skip { reason: format!("${:.2} below whale threshold", tx.total_value_usd) };
        }

        let size_usd = (tx.total_value_usd * 0.15).min(ctx.config.smart_money_max_per_trade_usd);
        let confidence = if tx.total_value_usd >= ctx.config.smart_money_whale_threshold_usd * 3.0 {
            Confidence::High
        } else {
            Confidence::Medium
        };

        Decision::Copy {
            size_usd,
            confidence,
            reason: format!("${:.2} whale buy by {}", tx.total_value_usd, wallet.address),
        }
    }

    fn exit(&self, trade: &mut PaperTrade, current_price: f64, ctx: &ExitContext<'_>) -> ExitDecision {
        if let Some(exit) = time_stop(trade, ctx.config, ctx.now) {
            return exit;
        }

        let pnl = pnl_pct(trade.entry_price, current_price);
        if pnl <= STOP_LOSS_PCT {
            ExitDecision::Exit { fraction: 1.0, reason: ExitReason::StopLoss }
        } else if pnl >= TAKE_PROFIT_PCT {
            ExitDecision::Exit { fraction: 1.0, reason: ExitReason::TakeProfit }
        } else {
            ExitDecision::Hold
        }
    }

    fn affinity(&self, _tx: &Transfer) -> f64 {
        1.2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PricingConfig, StrategyConfig};
    use crate::domain::Chain;
    use crate::pricing::PriceOracle;
    use crate::store::Store;
    use chrono::Utc;

    fn active_wallet() -> Wallet {
        Wallet::new("0xwal".to_string(), Chain::Base, StrategyName::SmartMoney)
    }

    fn tx(value_usd: f64) -> Transfer {
        Transfer {
            wallet_address: "0xwal".to_string(),
            chain: Chain::Base,
            tx_hash: "0xhash".to_string(),
            token_address: "0xtok".to_string(),
            token_symbol: "TOK".to_string(),
            action: Action::Buy,
            amount: 1.0,
            price_usd: value_usd,
            total_value_usd: value_usd,
            timestamp: Utc::now(),
            block_number: Some(1),
        }
    }

    #[tokio::test]
    async fn below_whale_threshold_is_skipped() {
        let store = Store::open_in_memory().unwrap();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let config = StrategyConfig::default();
        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now: Utc::now() };

        let decision = SmartMoneyStrategy.evaluate(&tx(500.0), &active_wallet(), &ctx).await;
        assert!(matches!(decision, Decision::Skip { .. }));
    }

    #[tokio::test]
    async fn a_large_whale_buy_is_copied_with_high_confidence() {
        let store = Store::open_in_memory().unwrap();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let config = StrategyConfig::default();
        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now: Utc::now() };

        let decision = SmartMoneyStrategy.evaluate(&tx(10_000.0), &active_wallet(), &ctx).await;
        assert!(matches!(decision, Decision::Copy { confidence: Confidence::High, .. }));
    }

    #[tokio::test]
    async fn zero_value_transfer_is_unverifiable() {
        let store = Store::open_in_memory().unwrap();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let config = StrategyConfig::default();
        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now: Utc::now() };

        let decision = SmartMoneyStrategy.evaluate(&tx(0.0), &active_wallet(), &ctx).await;
        assert!(matches!(decision, Decision::Skip { .. }));
    }
}
