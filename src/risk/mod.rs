//! Admission control ahead of opening a paper trade (§4.6).
//!
//! `RiskManager::check` is a synchronous `Check(candidate, portfolio) ->
//! {approved, reason}` predicate pipeline: a fixed-order `Vec<Box<dyn
//! RiskRule>>`, each rule pure over the same immutable `PortfolioState`
//! snapshot, returning the first rejection found. Order only decides which
//! reason gets reported — the admission set itself doesn't depend on it,
//! since every rule reads the same frozen snapshot rather than mutating
//! shared state as it goes (the corpus's own risk manager runs a comparable
//! `Vec<Box<dyn RiskValidator>>` pipeline over one `ValidationContext`,
//! simplified here to a plain synchronous predicate since there is no
//! broker round-trip to await).

use crate::config::RiskConfig;
use crate::domain::WalletStatus;

/// A frozen view of portfolio state at the moment a candidate trade is
/// being considered. Never mutated mid-check — every rule sees the same
/// numbers regardless of evaluation order.
#[derive(Debug, Clone, Copy)]
pub struct PortfolioState {
    pub total_capital_usd: f64,
    pub peak_equity_usd: f64,
    pub current_equity_usd: f64,
    pub daily_pnl_usd: f64,
    pub weekly_pnl_usd: f64,
    pub open_positions: usize,
    pub candidate_size_usd: f64,
    /// Existing exposure to the same token (or tightly-clustered wallet
    /// group) the candidate would add to, excluding the candidate itself.
    pub correlated_exposure_usd: f64,
    pub wallet_status: WalletStatus,
    pub strategy_paused: bool,
}

/// The closed set of reasons a candidate trade can be turned away (§4.6),
/// never a free-form string — callers and tests match on this directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskRejection {
    Drawdown,
    DailyLoss,
    WeeklyLoss,
    TooManyOpenPositions,
    PositionTooLarge,
    CorrelatedExposure,
    WalletNotActive,
    StrategyPaused,
}

impl RiskRejection {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskRejection::Drawdown => "drawdown limit breached",
            RiskRejection::DailyLoss => "daily loss limit breached",
            RiskRejection::WeeklyLoss => "weekly loss limit breached",
            RiskRejection::TooManyOpenPositions => "too many open positions",
            RiskRejection::PositionTooLarge => "position too large relative to capital",
            RiskRejection::CorrelatedExposure => "correlated exposure too large",
            RiskRejection::WalletNotActive => "source wallet is not active",
            RiskRejection::StrategyPaused => "strategy is auto-paused",
        }
    }
}

trait RiskRule: Send + Sync {
    fn check(&self, state: &PortfolioState) -> Option<RiskRejection>;
}

struct WalletActiveRule;
impl RiskRule for WalletActiveRule {
    fn check(&self, state: &PortfolioState) -> Option<RiskRejection> {
        (state.wallet_status != WalletStatus::Active).then_some(RiskRejection::WalletNotActive)
    }
}

struct StrategyPausedRule;
impl RiskRule for StrategyPausedRule {
    fn check(&self, state: &PortfolioState) -> Option<RiskRejection> {
        state.strategy_paused.then_some(RiskRejection::StrategyPaused)
    }
}

struct DrawdownRule {
    max_drawdown_pct: f64,
}
impl RiskRule for DrawdownRule {
    fn check(&self, state: &PortfolioState) -> Option<RiskRejection> {
        if state.peak_equity_usd <= 0.0 {
            return None;
        }
        let drawdown = (state.peak_equity_usd - state.current_equity_usd) / state.peak_equity_usd;
        (drawdown > self.max_drawdown_pct).then_some(RiskRejection::Drawdown)
    }
}

struct DailyLossRule {
    max_daily_loss_pct: f64,
}
impl RiskRule for DailyLossRule {
    fn check(&self, state: &PortfolioState) -> Option<RiskRejection> {
        if state.total_capital_usd <= 0.0 {
            return None;
        }
        let loss_pct = -state.daily_pnl_usd / state.total_capital_usd;
        (loss_pct > self.max_daily_loss_pct).then_some(RiskRejection::DailyLoss)
    }
}

struct WeeklyLossRule {
    max_weekly_loss_pct: f64,
}
impl RiskRule for WeeklyLossRule {
    fn check(&self, state: &PortfolioState) -> Option<RiskRejection> {
        if state.total_capital_usd <= 0.0 {
            return None;
        }
        let loss_pct = -state.weekly_pnl_usd / state.total_capital_usd;
        (loss_pct > self.max_weekly_loss_pct).then_some(RiskRejection::WeeklyLoss)
    }
}

struct OpenPositionsRule {
    max_open_positions: usize,
}
impl RiskRule for OpenPositionsRule {
    fn check(&self, state: &PortfolioState) -> Option<RiskRejection> {
        (state.open_positions >= self.max_open_positions).then_some(RiskRejection::TooManyOpenPositions)
    }
}

struct PositionSizeRule {
    max_position_pct_of_capital: f64,
}
impl RiskRule for PositionSizeRule {
    fn check(&self, state: &PortfolioState) -> Option<RiskRejection> {
        if state.total_capital_usd <= 0.0 {
            return None;
        }
        let pct = state.candidate_size_usd / state.total_capital_usd;
        (pct > self.max_position_pct_of_capital).then_some(RiskRejection::PositionTooLarge)
    }
}

struct CorrelatedExposureRule {
    max_correlated_pct_of_capital: f64,
}
impl RiskRule for CorrelatedExposureRule {
    fn check(&self, state: &PortfolioState) -> Option<RiskRejection> {
        if state.total_capital_usd <= 0.0 {
            return None;
        }
        let pct = (state.correlated_exposure_usd + state.candidate_size_usd) / state.total_capital_usd;
        (pct > self.max_correlated_pct_of_capital).then_some(RiskRejection::CorrelatedExposure)
    }
}

pub struct RiskManager {
    rules: Vec<Box<dyn RiskRule>>,
}

impl RiskManager {
    pub fn new(config: &RiskConfig) -> Self {
        Self {
            // Order decides which single reason gets reported when several
            // rules would fire at once; the admission decision itself is the
            // same regardless, since every rule reads the same snapshot.
            rules: vec![
                Box::new(WalletActiveRule),
                Box::new(StrategyPausedRule),
                Box::new(DrawdownRule { max_drawdown_pct: config.max_drawdown_pct }),
                Box::new(DailyLossRule { max_daily_loss_pct: config.max_daily_loss_pct }),
                Box::new(WeeklyLossRule { max_weekly_loss_pct: config.max_weekly_loss_pct }),
                Box::new(OpenPositionsRule { max_open_positions: config.max_open_positions }),
                Box::new(PositionSizeRule { max_position_pct_of_capital: config.max_position_pct_of_capital }),
                Box::new(CorrelatedExposureRule {
                    max_correlated_pct_of_capital: config.max_correlated_pct_of_capital,
                }),
            ],
        }
    }

    /// Returns the first rejection found, or `None` if the candidate clears
    /// every rule.
    pub fn check(&self, state: &PortfolioState) -> Option<RiskRejection> {
        self.rules.iter().find_map(|rule| rule.check(state))
    }

    pub fn approved(&self, state: &PortfolioState) -> bool {
        self.check(state).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> PortfolioState {
        PortfolioState {
            total_capital_usd: 10_000.0,
            peak_equity_usd: 10_000.0,
            current_equity_usd: 10_000.0,
            daily_pnl_usd: 0.0,
            weekly_pnl_usd: 0.0,
            open_positions: 5,
            candidate_size_usd: 100.0,
            correlated_exposure_usd: 0.0,
            wallet_status: WalletStatus::Active,
            strategy_paused: false,
        }
    }

    #[test]
    fn a_clean_candidate_is_approved() {
        let risk = RiskManager::new(&RiskConfig::default());
        assert!(risk.approved(&baseline()));
    }

    #[test]
    fn an_inactive_wallet_is_rejected_before_any_numeric_rule() {
        let risk = RiskManager::new(&RiskConfig::default());
        let mut state = baseline();
        state.wallet_status = WalletStatus::Paused;
        // Also breach drawdown, to confirm wallet status is still reported
        // first since it's earlier in the fixed order.
        state.current_equity_usd = 1_000.0;

        assert_eq!(risk.check(&state), Some(RiskRejection::WalletNotActive));
    }

    #[test]
    fn drawdown_beyond_the_limit_is_rejected() {
        let risk = RiskManager::new(&RiskConfig::default());
        let mut state = baseline();
        state.current_equity_usd = 7_000.0; // 30% drawdown, over the 20% default
        assert_eq!(risk.check(&state), Some(RiskRejection::Drawdown));
    }

    #[test]
    fn position_size_over_the_cap_is_rejected() {
        let risk = RiskManager::new(&RiskConfig::default());
        let mut state = baseline();
        state.candidate_size_usd = 2_000.0; // 20% of capital, over the 12% default
        assert_eq!(risk.check(&state), Some(RiskRejection::PositionTooLarge));
    }

    #[test]
    fn too_many_open_positions_is_rejected() {
        let risk = RiskManager::new(&RiskConfig::default());
        let mut state = baseline();
        state.open_positions = 40;
        assert_eq!(risk.check(&state), Some(RiskRejection::TooManyOpenPositions));
    }

    #[test]
    fn correlated_exposure_stacks_with_the_candidate_size() {
        let risk = RiskManager::new(&RiskConfig::default());
        let mut state = baseline();
        state.correlated_exposure_usd = 2_500.0; // plus the 100 candidate = 26% of capital
        assert_eq!(risk.check(&state), Some(RiskRejection::CorrelatedExposure));
    }
}
