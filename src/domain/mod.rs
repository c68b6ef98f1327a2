//! Shared domain types for the ingest -> decide -> execute -> manage -> discover loop.
//!
//! These are the tagged record types the rest of the crate passes around: no
//! ad-hoc JSON blobs, no stringly-typed statuses. Store, StrategyEngine,
//! RiskManager and TradingEngine all speak this vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A chain the system can observe wallets on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Base,
    Arbitrum,
    Optimism,
    Polygon,
    Solana,
}

impl Chain {
    pub fn is_evm(self) -> bool {
        !matches!(self, Chain::Solana)
    }

    /// `chainid` parameter used by the unified multi-chain explorer V2 endpoint.
    pub fn explorer_chain_id(self) -> Option<u64> {
        match self {
            Chain::Ethereum => Some(1),
            Chain::Base => Some(8453),
            Chain::Arbitrum => Some(42161),
            Chain::Optimism => Some(10),
            Chain::Polygon => Some(137),
            Chain::Solana => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Base => "base",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::Polygon => "polygon",
            Chain::Solana => "solana",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Chain> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" | "eth" => Some(Chain::Ethereum),
            "base" => Some(Chain::Base),
            "arbitrum" | "arb" => Some(Chain::Arbitrum),
            "optimism" | "op" => Some(Chain::Optimism),
            "polygon" | "matic" => Some(Chain::Polygon),
            "solana" | "sol" => Some(Chain::Solana),
            _ => None,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a tracked wallet (§3 Wallet.status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Active,
    Paused,
    Demoted,
}

impl WalletStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WalletStatus::Active => "active",
            WalletStatus::Paused => "paused",
            WalletStatus::Demoted => "demoted",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<WalletStatus> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Some(WalletStatus::Active),
            "paused" => Some(WalletStatus::Paused),
            "demoted" => Some(WalletStatus::Demoted),
            _ => None,
        }
    }
}

/// The closed set of strategies (§4.5). A tagged enum, never a free string,
/// so selection, scoring and persistence all agree on the same vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyName {
    CopyTrade,
    SmartMoney,
    VolumeBreakout,
    Memecoin,
    Arbitrage,
    EarlyGem,
    Adaptive,
}

impl StrategyName {
    pub const ALL: [StrategyName; 7] = [
        StrategyName::CopyTrade,
        StrategyName::SmartMoney,
        StrategyName::VolumeBreakout,
        StrategyName::Memecoin,
        StrategyName::Arbitrage,
        StrategyName::EarlyGem,
        StrategyName::Adaptive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyName::CopyTrade => "copyTrade",
            StrategyName::SmartMoney => "smartMoney",
            StrategyName::VolumeBreakout => "volumeBreakout",
            StrategyName::Memecoin => "memecoin",
            StrategyName::Arbitrage => "arbitrage",
            StrategyName::EarlyGem => "earlyGem",
            StrategyName::Adaptive => "adaptive",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<StrategyName> {
        StrategyName::ALL.into_iter().find(|n| n.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tracked wallet and its rolling performance (§3 Wallet).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
    pub chain: Chain,
    pub strategy_type: StrategyName,
    pub win_rate: Option<f64>,
    pub total_trades: u32,
    pub successful_trades: u32,
    pub total_pnl_usd: f64,
    pub avg_trade_size_usd: f64,
    pub biggest_win_usd: f64,
    pub biggest_loss_usd: f64,
    pub status: WalletStatus,
    pub date_added: DateTime<Utc>,
    pub last_checked: Option<DateTime<Utc>>,
    pub notes: String,
}

impl Wallet {
    pub fn new(address: String, chain: Chain, strategy_type: StrategyName) -> Self {
        Self {
            address,
            chain,
            strategy_type,
            win_rate: None,
            total_trades: 0,
            successful_trades: 0,
            total_pnl_usd: 0.0,
            avg_trade_size_usd: 0.0,
            biggest_win_usd: 0.0,
            biggest_loss_usd: 0.0,
            status: WalletStatus::Active,
            date_added: Utc::now(),
            last_checked: None,
            notes: String::new(),
        }
    }

    /// Recompute `win_rate` from the invariant `successful_trades <= total_trades`.
    pub fn recompute_win_rate(&mut self) {
        debug_assert!(self.successful_trades <= self.total_trades);
        self.win_rate = if self.total_trades == 0 {
            None
        } else {
            Some((self.successful_trades as f64) / (self.total_trades as f64))
        };
    }
}

/// Buy or sell side of an observed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
        }
    }
}

/// An observed on-chain transfer (§3 Transfer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub wallet_address: String,
    pub chain: Chain,
    pub tx_hash: String,
    pub token_address: String,
    pub token_symbol: String,
    pub action: Action,
    pub amount: f64,
    pub price_usd: f64,
    pub total_value_usd: f64,
    pub timestamp: DateTime<Utc>,
    pub block_number: Option<u64>,
}

impl Transfer {
    /// Value to judge the transfer's "size" by, falling back to `amount` when
    /// `total_value_usd` could not be resolved (§4.5 defensive evaluation).
    pub fn effective_value_usd(&self) -> f64 {
        if self.total_value_usd > 0.0 { self.total_value_usd } else { self.amount }
    }
}

/// A token's last-known price and the running peak used for pump detection
/// (§3 Token, §4.8 Discovery).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub address: String,
    pub chain: Chain,
    pub symbol: String,
    pub decimals: u8,
    pub first_seen: DateTime<Utc>,
    pub creation_time: Option<DateTime<Utc>>,
    pub current_price_usd: f64,
    pub max_price_usd: f64,
    pub market_cap_usd: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

/// Lifecycle of a PaperTrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// The fixed vocabulary of why a position was closed (§4.5, §9 tagged records).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TrailingStop,
    TimeStop,
    TierTakeProfit,
    Manual,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::TimeStop => "time_stop",
            ExitReason::TierTakeProfit => "tier_take_profit",
            ExitReason::Manual => "manual",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A simulated position (§3 PaperTrade).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperTrade {
    pub id: i64,
    pub token_address: String,
    pub chain: Chain,
    pub strategy_used: StrategyName,
    pub source_wallet: String,
    pub entry_price: f64,
    pub amount: f64,
    pub entry_value_usd: f64,
    pub peak_price: f64,
    pub status: TradeStatus,
    pub opened_at: DateTime<Utc>,
    pub exit_price: Option<f64>,
    pub exit_value_usd: Option<f64>,
    pub pnl: Option<f64>,
    pub pnl_percentage: Option<f64>,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_reason: Option<ExitReason>,
    pub notes: String,
}

impl PaperTrade {
    /// Append-only tier journal check: has this tier already fired?
    pub fn has_tier(&self, tier: &str) -> bool {
        self.notes.split(';').any(|entry| entry.trim() == tier)
    }

    pub fn append_tier(&mut self, tier: &str) {
        if !self.has_tier(tier) {
            if !self.notes.is_empty() {
                self.notes.push(';');
            }
            self.notes.push_str(tier);
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.opened_at
    }
}

/// A wallet Discovery has surfaced as a candidate (§3 DiscoveredWallet).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredWallet {
    pub address: String,
    pub chain: Chain,
    pub first_seen: DateTime<Utc>,
    pub profitability_score: f64,
    pub estimated_win_rate: f64,
    pub tracked_trades: u32,
    pub successful_tracked_trades: u32,
    pub promoted: bool,
    pub promoted_date: Option<DateTime<Utc>>,
    pub discovery_method: String,
    pub rejection_reason: Option<String>,
}

/// Daily per-strategy rollup (§3 StrategyPerformance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyPerformance {
    pub strategy_type: StrategyName,
    pub date: chrono::NaiveDate,
    pub trades_opened: u32,
    pub trades_closed: u32,
    pub wins: u32,
    pub losses: u32,
    pub realised_pnl_usd: f64,
}

/// Confidence a strategy attaches to an evaluation (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Outcome of `Strategy::evaluate` (§4.5, §9: tagged sum, not a dynamic object).
#[derive(Debug, Clone)]
pub enum Decision {
    Copy { size_usd: f64, confidence: Confidence, reason: String },
    Skip { reason: String },
}

impl Decision {
    pub fn is_copy(&self) -> bool {
        matches!(self, Decision::Copy { .. })
    }
}

/// Outcome of `Strategy::exit` (§4.5, §9).
#[derive(Debug, Clone)]
pub enum ExitDecision {
    Hold,
    Exit { fraction: f64, reason: ExitReason },
}
