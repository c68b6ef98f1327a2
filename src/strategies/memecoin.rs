use super::{time_stop, EvalContext, ExitContext, Strategy};
use crate::domain::{Action, Confidence, Decision, ExitDecision, ExitReason, PaperTrade, StrategyName, Transfer, Wallet};
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashSet;

const STOP_LOSS_PCT: f64 = -0.40;

/// Solana-biased: copies a token once enough distinct wallets have bought it
/// within a short window, and scales out in tiers as the price multiplies
/// rather than taking one all-or-nothing exit (§4.5). The tier journal lives
/// in `PaperTrade.notes` as an append-only, idempotent record — a tier can
/// only ever fire once per trade.
pub struct MemecoinStrategy;

const TIER_2X: &str = "tier_2x";
const TIER_5X: &str = "tier_5x";
const TIER_10X: &str = "tier_10x";

impl MemecoinStrategy {
    fn distinct_buyers_in_window(tx: &Transfer, ctx: &EvalContext<'_>) -> anyhow::Result<usize> {
        let window = Duration::seconds(ctx.config.memecoin_copy_window_secs as i64);
        let since = tx.timestamp - window;
        let history = ctx.store.transfers_for_token(&tx.token_address, tx.chain, since)?;

        let buyers: HashSet<String> =
            history.iter().filter(|t| t.action == Action::Buy).map(|t| t.wallet_address.clone()).collect();
        Ok(buyers.len())
    }
}

#[async_trait]
impl Strategy for MemecoinStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::Memecoin
    }

    async fn evaluate(&self, tx: &Transfer, _wallet: &Wallet, ctx: &EvalContext<'_>) -> Decision {
        if tx.action != Action::Buy {
            return Decision::Skip { reason: "not a buy".to_string() };
        }

        let buyers = match Self::distinct_buyers_in_window(tx, ctx) {
            Ok(n) => n,
            Err(e) => return Decision::Skip { reason: format!("could not read buyer window: {}", e) },
        };

        if buyers < ctx.config.memecoin_copy_threshold as usize {
            return Decision::Skip { reason: format!("only {} distinct buyers in window", buyers) };
        }

        let confidence = if tx.chain.is_evm() { Confidence::Low } else { Confidence::Medium };

        Decision::Copy {
            size_usd: ctx.config.memecoin_max_per_trade_usd,
            confidence,
            reason: format!("{} distinct buyers within the copy window", buyers),
        }
    }

    fn exit(&self, trade: &mut PaperTrade, current_price: f64, ctx: &ExitContext<'_>) -> ExitDecision {
        if let Some(exit) = time_stop(trade, ctx.config, ctx.now) {
            return exit;
        }

        let pnl = super::pnl_pct(trade.entry_price, current_price);
        if pnl <= STOP_LOSS_PCT {
            return ExitDecision::Exit { fraction: 1.0, reason: ExitReason::StopLoss };
        }

        if trade.entry_price <= 0.0 {
            return ExitDecision::Hold;
        }
        let multiple = current_price / trade.entry_price;

        if multiple >= 10.0 && !trade.has_tier(TIER_10X) {
            trade.append_tier(TIER_10X);
            return ExitDecision::Exit { fraction: 0.10, reason: ExitReason::TierTakeProfit };
        }
        if multiple >= 5.0 && !trade.has_tier(TIER_5X) {
            trade.append_tier(TIER_5X);
            return ExitDecision::Exit { fraction: 0.30, reason: ExitReason::TierTakeProfit };
        }
        if multiple >= 2.0 && !trade.has_tier(TIER_2X) {
            trade.append_tier(TIER_2X);
            return ExitDecision::Exit { fraction: 0.60, reason: ExitReason::TierTakeProfit };
        }

        ExitDecision::Hold
    }

    fn affinity(&self, tx: &Transfer) -> f64 {
        if tx.chain == crate::domain::Chain::Solana {
            1.15
        } else {
            0.85
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PricingConfig, StrategyConfig};
    use crate::domain::{Chain, TradeStatus};
    use crate::pricing::PriceOracle;
    use crate::store::Store;
    use chrono::Utc;

    fn buy(wallet: &str, timestamp: chrono::DateTime<Utc>) -> Transfer {
        Transfer {
            wallet_address: wallet.to_string(),
            chain: Chain::Solana,
            tx_hash: format!("0x{}-{}", wallet, timestamp.timestamp_nanos_opt().unwrap_or(0)),
            token_address: "sotok".to_string(),
            token_symbol: "MEME".to_string(),
            action: Action::Buy,
            amount: 1000.0,
            price_usd: 0.001,
            total_value_usd: 10.0,
            timestamp,
            block_number: None,
        }
    }

    fn trade() -> PaperTrade {
        PaperTrade {
            id: 1,
            token_address: "sotok".to_string(),
            chain: Chain::Solana,
            strategy_used: StrategyName::Memecoin,
            source_wallet: "0xw".to_string(),
            entry_price: 1.0,
            amount: 100.0,
            entry_value_usd: 100.0,
            peak_price: 1.0,
            status: TradeStatus::Open,
            opened_at: Utc::now(),
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
    async fn requires_enough_distinct_buyers_in_the_window() {
        let store = Store::open_in_memory().unwrap();
        let config = StrategyConfig::default();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let now = Utc::now();

        for i in 0..(config.memecoin_copy_threshold - 1) {
            store.add_transfer(&buy(&format!("0xw{}", i), now)).unwrap();
        }
        let trigger = buy("0xtrigger", now);
        store.add_transfer(&trigger).unwrap();

        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now };
        let wallet = Wallet::new("0xtrigger".to_string(), Chain::Solana, StrategyName::Memecoin);
        let decision = MemecoinStrategy.evaluate(&trigger, &wallet, &ctx).await;
        assert!(matches!(decision, Decision::Skip { .. }));
    }

    #[test]
    fn a_tier_only_fires_once() {
        let config = StrategyConfig::default();
        let ctx = ExitContext { config: &config, now: Utc::now() };
        let mut t = trade();

        let first = MemecoinStrategy.exit(&mut t, 2.5, &ctx);
        assert!(matches!(first, ExitDecision::Exit { reason: ExitReason::TierTakeProfit, fraction } if fraction == 0.60));
        assert!(t.has_tier(TIER_2X));

        // Still at 2.5x: the 2x tier already fired, should not fire again.
        let second = MemecoinStrategy.exit(&mut t, 2.5, &ctx);
        assert!(matches!(second, ExitDecision::Hold));
    }

    #[test]
    fn stop_loss_overrides_tiers() {
        let config = StrategyConfig::default();
        let ctx = ExitContext { config: &config, now: Utc::now() };
        let mut t = trade();
        let decision = MemecoinStrategy.exit(&mut t, 0.5, &ctx);
        assert!(matches!(decision, ExitDecision::Exit { reason: ExitReason::StopLoss, .. }));
    }
}
