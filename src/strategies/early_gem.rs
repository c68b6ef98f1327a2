use super::{time_stop, EvalContext, ExitContext, Strategy};
use crate::domain::{Action, Confidence, Decision, ExitDecision, ExitReason, PaperTrade, StrategyName, Transfer, Wallet};
use async_trait::async_trait;

const STOP_LOSS_PCT: f64 = -0.25;
const TAKE_PROFIT_MULTIPLE: f64 = 2.5;

/// Copies a buy on a token that is both very young and already carries
/// meaningful size, from a wallet with a confirmed track record (§4.5). No
/// dedicated liquidity feed exists in this pipeline, so market cap — the one
/// size signal the pricing cascade actually returns — stands in for it.
pub struct EarlyGemStrategy;

#[async_trait]
impl Strategy for EarlyGemStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::EarlyGem
    }

    async fn evaluate(&self, tx: &Transfer, wallet: &Wallet, ctx: &EvalContext<'_>) -> Decision {
        if tx.action != Action::Buy {
            return Decision::Skip { reason: "not a buy".to_string() };
        }

        let win_rate = match wallet.win_rate {
            Some(rate) if rate >= ctx.config.early_gem_min_win_rate => rate,
            Some(_) => return Decision::Skip { reason: "wallet win rate below the early-gem bar".to_string() },
            None => return Decision::Skip { reason: "wallet has no established win rate yet".to_string() },
        };

        let token = match ctx.store.get_token(&tx.token_address, tx.chain) {
            Ok(Some(token)) => token,
            Ok(None) => return Decision::Skip { reason: "token age unknown".to_string() },
            Err(e) => return Decision::Skip { reason: format!("could not look up token: {}", e) },
        };

        let age_hours = (ctx.now - token.first_seen).num_seconds() as f64 / 3600.0;
        if age_hours > ctx.config.early_gem_max_token_age_hours {
            return Decision::Skip { reason: format!("token is {:.1}h old, too mature", age_hours) };
        }

        let liquidity_proxy = token.market_cap_usd.unwrap_or(0.0);
        if liquidity_proxy < ctx.config.early_gem_min_liquidity_usd {
            return Decision::Skip { reason: format!("${:.2} market cap below liquidity floor", liquidity_proxy) };
        }

        let confidence = if win_rate >= 0.65 { Confidence::High } else { Confidence::Medium };
        Decision::Copy {
            size_usd: ctx.config.early_gem_max_per_trade_usd,
            confidence,
            reason: format!("{:.1}h old token, {:.0}% wallet win rate", age_hours, win_rate * 100.0),
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

        if trade.entry_price > 0.0 && current_price / trade.entry_price >= TAKE_PROFIT_MULTIPLE {
            return ExitDecision::Exit { fraction: 1.0, reason: ExitReason::TakeProfit };
        }

        ExitDecision::Hold
    }

    fn affinity(&self, _tx: &Transfer) -> f64 {
        1.05
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

    fn established_wallet() -> Wallet {
        let mut wallet = Wallet::new("0xwal".to_string(), Chain::Base, StrategyName::EarlyGem);
        wallet.total_trades = 20;
        wallet.successful_trades = 12;
        wallet.recompute_win_rate();
        wallet
    }

    fn tx() -> Transfer {
        Transfer {
            wallet_address: "0xwal".to_string(),
            chain: Chain::Base,
            tx_hash: "0xhash".to_string(),
            token_address: "0xgem".to_string(),
            token_symbol: "GEM".to_string(),
            action: Action::Buy,
            amount: 1000.0,
            price_usd: 0.01,
            total_value_usd: 100.0,
            timestamp: Utc::now(),
            block_number: Some(1),
        }
    }

    #[tokio::test]
    async fn an_old_token_is_skipped_even_with_good_liquidity() {
        let store = Store::open_in_memory().unwrap();
        let config = StrategyConfig::default();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let now = Utc::now();
        store
            .add_or_update_token("0xgem", Chain::Base, "GEM", 18, 1.0, Some(50_000.0), now - chrono::Duration::hours(200))
            .unwrap();

        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now };
        let decision = EarlyGemStrategy.evaluate(&tx(), &established_wallet(), &ctx).await;
        assert!(matches!(decision, Decision::Skip { .. }));
    }

    #[tokio::test]
    async fn a_young_well_capitalised_token_is_copied() {
        let store = Store::open_in_memory().unwrap();
        let config = StrategyConfig::default();
        let oracle = PriceOracle::new(&PricingConfig::default());
        let now = Utc::now();
        store
            .add_or_update_token("0xgem", Chain::Base, "GEM", 18, 1.0, Some(50_000.0), now - chrono::Duration::hours(2))
            .unwrap();

        let ctx = EvalContext { store: &store, price_oracle: &oracle, config: &config, now };
        let decision = EarlyGemStrategy.evaluate(&tx(), &established_wallet(), &ctx).await;
        assert!(matches!(decision, Decision::Copy { .. }));
    }
}
