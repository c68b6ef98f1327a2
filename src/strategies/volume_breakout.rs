use super::{time_stop, EvalContext, ExitContext, Strategy};
use crate::domain::{Action, Confidence, Decision, ExitDecision, ExitReason, PaperTrade, StrategyName, Transfer, Wallet};
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashSet;

const STOP_LOSS_PCT: f64 = -0.15;
const TAKE_PROFIT_PCT: f64 = 0.50;

/// Fires when a token's buy volume across *all* tracked wallets has surged
/// against its own recent baseline — a coordinated-looking move rather than
/// one wallet's opinion (§4.5). Looks only at the window ending at the
/// transfer it is evaluating, so it never peeks at future transfers.
pub struct VolumeBreakoutStrategy;

impl VolumeBreakoutStrategy {
    /// `(current_window_volume, baseline_window_volume, distinct_buyers_in_current_window)`.
    fn windows(tx: &Transfer, ctx: &EvalContext<'_>) -> anyhow::Result<(f64, f64, usize)> {
        let window = Duration::seconds(ctx.config.volume_breakout_window_secs as i64);
        let since = tx.timestamp - window * 2;
        let history = ctx.store.transfers_for_token(&tx.token_address, tx.chain, since)?;

        let split = tx.timestamp - window;
        let mut current_volume = 0.0;
        let mut baseline_volume = 0.0;
        let mut buyers = HashSet::new();

        for entry in &history {
            if entry.action != Action::Buy {
                continue;
            }
            if entry.timestamp >= split {
                current_volume += entry.effective_value_usd();
                buyers.insert(entry.wallet_address.clone());
            } else {
                baseline_volume += entry.effective_value_usd();
            }
        }

        Ok((current_volume, baseline_volume, buyers.len()))
    }
}

#[async_trait]
impl Strategy for VolumeBreakoutStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::VolumeBreakout
    }

    async fn evaluate(&self, tx: &Transfer, _wallet: &Wallet, ctx: &EvalContext<'_>) -> Decision {
        if tx.action != Action::Buy {
            return Decision::Skip { reason: "not a buy".to_string() };
        }

        let (current, baseline, buyers) = match Self::windows(tx, ctx) {
            Ok(v) => v,
            Err(e) => return Decision::Skip { reason: format!("could not read volume history: {}", e) },
        };

        if buyers < ctx.config.volume_breakout_min_buyers as usize {
            return Decision::Skip { reason: format!("only {} distinct buyers in window", buyers) };
        }

        // A near-zero baseline makes the multiplier meaningless (division
        // blows up); treat it as "not established enough to call a breakout".
        if baseline < 1.0 {
            return Decision::Skip { reason: "no established baseline volume".to_string() };
        }

        let multiplier = current / baseline;
        if multiplier < ctx.config.volume_breakout_multiplier {
            return Decision::Skip { reason: format!("volume multiplier {:.2}x below threshold", multiplier) };
        }

        let confidence = if multiplier >= ctx.config.volume_breakout_multiplier * 2.0 {
            Confidence::High
        } else {
            Confidence::Medium
        };

        Decision::Copy {
            size_usd: ctx.config.volume_breakout_max_per_trade_usd,
            confidence,
            reason: format!("{:.2}x volume breakout across {} buyers", multiplier, buyers),
        }
    }

    fn exit(&self, trade: &mut PaperTrade, current_price: f64, ctx: &ExitContext<'_>) -> ExitDecision {
        if let Some(exit) = time_stop(trade, ctx.config, ctx.now) {
            return exit;
        }

        let pnl = super::pnl_pct(trade.entry_price, current_price);
        if pnl <= STOP_LOSS_PCT {
            ExitDecision::Exit { fraction: 1.0, reason: ExitReason::StopLoss }
        } else if pnl >= TAKE_PROFIT_PCT {
            ExitDecision::Exit { fraction: 1.0, reason: ExitReason::TakeProfit }
        } else {
            ExitDecision::Hold
        }
    }

    fn affinity(&self, _tx: &Transfer) -> f64 {
        1.1
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

    fn buy(wallet: &str, value_usd: f64, timestamp: chrono::DateTime<Utc>) -> Transfer {
        Transfer {
            wallet_address: wallet.to_string(),
            chain: Chain::Base,
            tx_hash: format!("0x{}-{}", wallet, timestamp.timestamp_nanos_opt().unwrap_or(0)),
            token_address: "0xtok".to_string(),
            token_symbol: "TOK".to_string(),
            action: Action::Buy,
            amount: 10.0,
            price_usd: 1.0,
            total_value_usd: value_usd,
            timestamp,
            block_number: Some(1),
        }
    }

    #[tokio::test]
    async fn fires_when_volume_and_buyer_count_both_clear_the_bar() {
        let store = Store::open_in_memory().unwrap();
        let config = StrategyConfig::default();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let now = Utc::now();
        let window = Duration::seconds(config.volume_breakout_window_secs as i64);

        // Baseline window: a modest $100 from one wallet.
        store.add_transfer(&buy("0xbaseline", 100.0, now - window - Duration::minutes(10))).unwrap();
        // Current window: three distinct buyers totalling well over 2.5x.
        store.add_transfer(&buy("0xb1", 150.0, now - Duration::minutes(5))).unwrap();
        store.add_transfer(&buy("0xb2", 150.0, now - Duration::minutes(4))).unwrap();
        let trigger = buy("0xb3", 150.0, now);
        store.add_transfer(&trigger).unwrap();

        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now };
        let wallet = Wallet::new("0xb3".to_string(), Chain::Base, StrategyName::VolumeBreakout);
        let decision = VolumeBreakoutStrategy.evaluate(&trigger, &wallet, &ctx).await;
        assert!(matches!(decision, Decision::Copy { .. }));
    }

    #[tokio::test]
    async fn too_few_distinct_buyers_is_skipped() {
        let store = Store::open_in_memory().unwrap();
        let config = StrategyConfig::default();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let now = Utc::now();

        let trigger = buy("0xsolo", 500.0, now);
        store.add_transfer(&trigger).unwrap();

        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now };
        let wallet = Wallet::new("0xsolo".to_string(), Chain::Base, StrategyName::VolumeBreakout);
        let decision = VolumeBreakoutStrategy.evaluate(&trigger, &wallet, &ctx).await;
        assert!(matches!(decision, Decision::Skip { .. }));
    }
}
