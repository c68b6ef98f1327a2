//! Per-wallet trade metrics from raw transfer history (§4.8 step 3).
//!
//! Buys and sells are matched FIFO per token: a sell consumes the oldest
//! still-open buy lots first. Each sell that manages to consume at least
//! one lot counts as one closed trade; a sell with no matching lot (the
//! wallet's buy predates our transfer history) contributes nothing, since
//! there is no cost basis to compute a return from.

use crate::domain::{Action, Transfer};
use std::collections::{HashMap, VecDeque};

struct Lot {
    amount: f64,
    price_usd: f64,
}

struct ClosedTrade {
    pnl_usd: f64,
    return_pct: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WalletMetrics {
    pub trade_count: u32,
    pub win_rate: f64,
    pub realised_profit_usd: f64,
    pub consistency: f64,
    pub risk_management: f64,
}

fn clamp01(x: f64) -> f64 {
    x.max(0.0).min(1.0)
}

/// Walks `transfers` (assumed sorted by timestamp, as every `Store` listing
/// query returns them) and matches each sell against open buy lots for the
/// same token, oldest first.
pub fn compute_wallet_metrics(transfers: &[Transfer]) -> WalletMetrics {
    let mut open_lots: HashMap<&str, VecDeque<Lot>> = HashMap::new();
    let mut closed = Vec::new();

    for tx in transfers {
        match tx.action {
            Action::Buy => {
                if tx.amount > 0.0 && tx.price_usd > 0.0 {
                    open_lots.entry(tx.token_address.as_str()).or_default().push_back(Lot {
                        amount: tx.amount,
                        price_usd: tx.price_usd,
                    });
                }
            }
            Action::Sell => {
                if tx.price_usd <= 0.0 || tx.amount <= 0.0 {
                    continue;
                }
                let Some(lots) = open_lots.get_mut(tx.token_address.as_str()) else { continue };
                if let Some(trade) = match_sell(lots, tx.amount, tx.price_usd) {
                    closed.push(trade);
                }
            }
        }
    }

    if closed.is_empty() {
        return WalletMetrics::default();
    }

    let trade_count = closed.len() as u32;
    let wins = closed.iter().filter(|t| t.pnl_usd > 0.0).count() as f64;
    let win_rate = wins / closed.len() as f64;
    let realised_profit_usd: f64 = closed.iter().map(|t| t.pnl_usd).sum();

    let returns: Vec<f64> = closed.iter().map(|t| t.return_pct).collect();
    let consistency = consistency_score(&returns);

    let largest_loss = closed.iter().map(|t| t.pnl_usd).fold(0.0_f64, f64::min).abs();
    let risk_management = if realised_profit_usd > 0.0 {
        clamp01(1.0 - largest_loss / realised_profit_usd)
    } else {
        0.0
    };

    WalletMetrics { trade_count, win_rate, realised_profit_usd, consistency, risk_management }
}

/// Consumes oldest-first lots to cover `sell_amount`, returning the blended
/// pnl/return across whatever it could match. Partial lots are split; fully
/// consumed lots are popped.
fn match_sell(lots: &mut VecDeque<Lot>, sell_amount: f64, sell_price: f64) -> Option<ClosedTrade> {
    let mut remaining = sell_amount;
    let mut cost_basis = 0.0;
    let mut matched_amount = 0.0;

    while remaining > 1e-12 {
        let Some(lot) = lots.front_mut() else { break };
        let take = lot.amount.min(remaining);
        cost_basis += take * lot.price_usd;
        matched_amount += take;
        lot.amount -= take;
        remaining -= take;
        if lot.amount <= 1e-12 {
            lots.pop_front();
        }
    }

    if matched_amount <= 1e-12 || cost_basis <= 0.0 {
        return None;
    }

    let proceeds = matched_amount * sell_price;
    let pnl_usd = proceeds - cost_basis;
    let return_pct = pnl_usd / cost_basis;
    Some(ClosedTrade { pnl_usd, return_pct })
}

/// `1 - coefficient_of_variation(returns)`, clamped to `[0, 1]`. A wallet
/// whose returns barely vary scores near 1; wildly uneven returns score
/// near 0. Undefined (near-zero mean) scores 0 rather than dividing out to
/// something meaningless.
fn consistency_score(returns: &[f64]) -> f64 {
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    if mean.abs() < 1e-9 {
        return 0.0;
    }
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let coefficient_of_variation = variance.sqrt() / mean.abs();
    clamp01(1.0 - coefficient_of_variation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Chain;
    use chrono::Utc;

    fn transfer(action: Action, token: &str, amount: f64, price: f64) -> Transfer {
        Transfer {
            wallet_address: "0xwal".to_string(),
            chain: Chain::Base,
            tx_hash: format!("{:?}-{}-{}", action, token, amount),
            token_address: token.to_string(),
            token_symbol: "TOK".to_string(),
            action,
            amount,
            price_usd: price,
            total_value_usd: amount * price,
            timestamp: Utc::now(),
            block_number: Some(1),
        }
    }

    #[test]
    fn a_profitable_round_trip_is_a_win() {
        let transfers = vec![transfer(Action::Buy, "0xtok", 100.0, 1.0), transfer(Action::Sell, "0xtok", 100.0, 1.5)];
        let metrics = compute_wallet_metrics(&transfers);
        assert_eq!(metrics.trade_count, 1);
        assert_eq!(metrics.win_rate, 1.0);
        assert_eq!(metrics.realised_profit_usd, 50.0);
    }

    #[test]
    fn a_sell_with_no_matching_buy_contributes_nothing() {
        let transfers = vec![transfer(Action::Sell, "0xtok", 100.0, 1.5)];
        let metrics = compute_wallet_metrics(&transfers);
        assert_eq!(metrics.trade_count, 0);
    }

    #[test]
    fn a_partial_sell_splits_the_lot_and_leaves_the_remainder_open() {
        let transfers = vec![
            transfer(Action::Buy, "0xtok", 100.0, 1.0),
            transfer(Action::Sell, "0xtok", 40.0, 2.0),
            transfer(Action::Sell, "0xtok", 60.0, 0.5),
        ];
        let metrics = compute_wallet_metrics(&transfers);
        assert_eq!(metrics.trade_count, 2);
        // 40 @ (2.0-1.0) = +40, 60 @ (0.5-1.0) = -30; net +10.
        assert_eq!(metrics.realised_profit_usd, 10.0);
        assert_eq!(metrics.win_rate, 0.5);
    }

    #[test]
    fn wildly_uneven_returns_score_low_consistency() {
        let transfers = vec![
            transfer(Action::Buy, "0xa", 10.0, 1.0),
            transfer(Action::Sell, "0xa", 10.0, 1.1),
            transfer(Action::Buy, "0xb", 10.0, 1.0),
            transfer(Action::Sell, "0xb", 10.0, 5.0),
        ];
        let metrics = compute_wallet_metrics(&transfers);
        assert!(metrics.consistency < 0.5);
    }
}
