use super::{pnl_pct, time_stop, EvalContext, ExitContext, Strategy};
use crate::domain::{Action, Confidence, Decision, ExitDecision, ExitReason, PaperTrade, StrategyName, Transfer, Wallet};
use async_trait::async_trait;

const STOP_LOSS_PCT: f64 = -0.08;
const TAKE_PROFIT_PCT: f64 = 0.20;
/// A wallet needs this many recorded trades before its buy pattern reads as
/// a bot's arbitrage signature rather than a one-off large purchase.
const MIN_TRADE_HISTORY: u32 = 50;

/// EVM DeFi arbitrage signature: a high-frequency wallet (a bot, in
/// practice) buying above a meaningfully higher threshold than CopyTrade's
/// (§4.5). Solana is out of scope — the signature is specifically EVM
/// mempool/DEX-router arbitrage.
pub struct ArbitrageStrategy;

#[async_trait]
impl Strategy for ArbitrageStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::Arbitrage
    }

    async fn evaluate(&self, tx: &Transfer, wallet: &Wallet, ctx: &EvalContext<'_>) -> Decision {
        if !tx.chain.is_evm() || tx.action != Action::Buy {
            return Decision::Skip { reason: "not an EVM buy".to_string() };
        }

        let value = tx.effective_value_usd();
        if value < ctx.config.arbitrage_copy_threshold_usd {
            return Decision::Skip { reason: format!("${:.2} below arbitrage threshold", value) };
        }
        if wallet.total_trades < MIN_TRADE_HISTORY {
            return Decision::Skip { reason: "not enough trade history to confirm an arbitrage pattern".to_string() };
        }

        let size_usd = (value * 0.20).min(ctx.config.arbitrage_max_per_trade_usd);
        let confidence = match wallet.win_rate {
            Some(rate) if rate >= 0.70 => Confidence::High,
            Some(rate) if rate >= 0.50 => Confidence::Medium,
            _ => Confidence::Low,
        };

        Decision::Copy { size_usd, confidence, reason: format!("high-frequency EVM wallet, ${:.2} buy", value) }
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

    fn affinity(&self, tx: &Transfer) -> f64 {
        if tx.chain.is_evm() {
            1.3
        } else {
            0.0
        }
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

    fn tx(chain: Chain, value_usd: f64) -> Transfer {
        Transfer {
            wallet_address: "0xbot".to_string(),
            chain,
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
    async fn solana_never_matches_the_evm_signature() {
        let store = Store::open_in_memory().unwrap();
        let config = StrategyConfig::default();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now: Utc::now() };

        let mut wallet = Wallet::new("0xbot".to_string(), Chain::Solana, StrategyName::Arbitrage);
        wallet.total_trades = 200;

        let decision = ArbitrageStrategy.evaluate(&tx(Chain::Solana, 1000.0), &wallet, &ctx).await;
        assert!(matches!(decision, Decision::Skip { .. }));
    }

    #[tokio::test]
    async fn a_fresh_wallet_with_no_history_is_not_yet_confirmed() {
        let store = Store::open_in_memory().unwrap();
        let config = StrategyConfig::default();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now: Utc::now() };

        let wallet = Wallet::new("0xbot".to_string(), Chain::Base, StrategyName::Arbitrage);
        let decision = ArbitrageStrategy.evaluate(&tx(Chain::Base, 1000.0), &wallet, &ctx).await;
        assert!(matches!(decision, Decision::Skip { .. }));
    }
}
