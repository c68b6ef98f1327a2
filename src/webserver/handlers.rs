//! Handlers for the §6 HTTP API. Deliberately thin: each one reads a query
//! or path parameter, calls into `Store`/`Supervisor`/`ApiStatus`, and
//! serializes the result. No business logic lives here.

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::domain::{Chain, DiscoveredWallet, PaperTrade, StrategyName, StrategyPerformance, Wallet, WalletStatus};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn find_wallet(state: &AppState, address: &str, chain: Option<Chain>) -> ApiResult<Wallet> {
    if let Some(chain) = chain {
        return state
            .store
            .get_wallet(address, chain)?
            .ok_or_else(|| ApiError::NotFound(format!("wallet {}", address)));
    }
    state
        .store
        .list_wallets()?
        .into_iter()
        .find(|w| w.address.eq_ignore_ascii_case(address))
        .ok_or_else(|| ApiError::NotFound(format!("wallet {}", address)))
}

#[derive(Serialize)]
pub struct HealthResponse {
    initialized: bool,
    mock_mode: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse { initialized: true, mock_mode: state.mock_mode })
}

#[derive(Serialize)]
pub struct DashboardResponse {
    total_capital: f64,
    available_capital: f64,
    open_trades: Vec<PaperTrade>,
    strategy_performance: Vec<StrategyPerformance>,
    discovered_pending: usize,
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> ApiResult<Json<DashboardResponse>> {
    let total_capital = state.store.get_total_capital()?.unwrap_or(0.0);
    let available_capital = state.store.get_available_capital()?.unwrap_or(0.0);
    let open_trades = state.store.list_open_trades()?;

    let mut strategy_performance = Vec::new();
    for strategy in StrategyName::ALL {
        strategy_performance.extend(state.store.list_performance(strategy)?);
    }

    let discovered_pending = state.store.list_discovered_wallets(Some(false))?.len();

    Ok(Json(DashboardResponse { total_capital, available_capital, open_trades, strategy_performance, discovered_pending }))
}

pub async fn list_wallets(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Wallet>>> {
    Ok(Json(state.store.list_wallets()?))
}

#[derive(Deserialize)]
pub struct ChainQuery {
    chain: Option<Chain>,
}

#[derive(Serialize)]
pub struct WalletDetail {
    wallet: Wallet,
    recent_transfers: Vec<crate::domain::Transfer>,
    open_trades: Vec<PaperTrade>,
    closed_trades: Vec<PaperTrade>,
}

pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(q): Query<ChainQuery>,
) -> ApiResult<Json<WalletDetail>> {
    let wallet = find_wallet(&state, &address, q.chain)?;
    let since = Utc::now() - chrono::Duration::days(7);
    let recent_transfers = state.store.transfers_for_wallet(&wallet.address, wallet.chain, since)?;
    let open_trades = state.store.list_open_trades()?.into_iter().filter(|t| t.source_wallet == wallet.address).collect();
    let closed_trades = state.store.list_closed_trades(Some(&wallet.address), None, None)?;

    Ok(Json(WalletDetail { wallet, recent_transfers, open_trades, closed_trades }))
}

#[derive(Serialize)]
pub struct WalletActivity {
    address: String,
    chain: Chain,
    transfer_count_24h: usize,
    volume_usd_24h: f64,
}

pub async fn wallets_activity(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<WalletActivity>>> {
    let since = Utc::now() - chrono::Duration::hours(24);
    let mut activity = Vec::new();
    for wallet in state.store.list_wallets()? {
        let transfers = state.store.transfers_for_wallet(&wallet.address, wallet.chain, since)?;
        let volume_usd_24h = transfers.iter().map(|t| t.total_value_usd).sum();
        activity.push(WalletActivity {
            address: wallet.address,
            chain: wallet.chain,
            transfer_count_24h: transfers.len(),
            volume_usd_24h,
        });
    }
    Ok(Json(activity))
}

#[derive(Deserialize)]
pub struct SetWalletStatusRequest {
    chain: Chain,
    status: WalletStatus,
}

pub async fn set_wallet_status(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Json(body): Json<SetWalletStatusRequest>,
) -> ApiResult<Json<Wallet>> {
    state
        .store
        .get_wallet(&address, body.chain)?
        .ok_or_else(|| ApiError::NotFound(format!("wallet {}", address)))?;
    state.store.set_wallet_status(&address, body.chain, body.status)?;
    let wallet = state
        .store
        .get_wallet(&address, body.chain)?
        .ok_or_else(|| ApiError::NotFound(format!("wallet {}", address)))?;
    Ok(Json(wallet))
}

#[derive(Deserialize)]
pub struct TradesQuery {
    status: Option<String>,
    strategy: Option<String>,
}

pub async fn list_trades(State(state): State<Arc<AppState>>, Query(q): Query<TradesQuery>) -> ApiResult<Json<Vec<PaperTrade>>> {
    let strategy = match &q.strategy {
        Some(raw) => Some(
            StrategyName::from_str_loose(raw).ok_or_else(|| ApiError::BadRequest(format!("unknown strategy {}", raw)))?,
        ),
        None => None,
    };

    let wants_open = q.status.as_deref().map(|s| s.eq_ignore_ascii_case("open")).unwrap_or(false);
    let wants_closed = q.status.as_deref().map(|s| s.eq_ignore_ascii_case("closed")).unwrap_or(false);

    let mut trades = Vec::new();
    if wants_closed || (!wants_open && q.status.is_none()) {
        trades.extend(state.store.list_closed_trades(None, strategy, None)?);
    }
    if wants_open || q.status.is_none() {
        let open = state.store.list_open_trades()?;
        trades.extend(open.into_iter().filter(|t| strategy.map(|s| t.strategy_used == s).unwrap_or(true)));
    }
    Ok(Json(trades))
}

#[derive(Deserialize)]
pub struct DiscoveredQuery {
    promoted: Option<bool>,
}

pub async fn list_discovered(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DiscoveredQuery>,
) -> ApiResult<Json<Vec<DiscoveredWallet>>> {
    Ok(Json(state.store.list_discovered_wallets(q.promoted)?))
}

pub async fn trigger_discover(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    let inserted = state.supervisor.run_discover_tick().await?;
    Ok(Json(serde_json::json!({ "inserted": inserted })))
}

pub async fn trigger_track(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    let opened = state.supervisor.run_ingest_tick().await?;
    Ok(Json(serde_json::json!({ "opened": opened })))
}

pub async fn promote_discovered(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(q): Query<ChainQuery>,
) -> ApiResult<Json<Wallet>> {
    let chain = q.chain.ok_or_else(|| ApiError::BadRequest("chain query parameter is required".to_string()))?;
    let candidate = state
        .store
        .get_discovered_wallet(&address, chain)?
        .ok_or_else(|| ApiError::NotFound(format!("discovered wallet {}", address)))?;

    state.store.promote_discovered_wallet(&address, chain, Utc::now())?;
    state.store.upsert_wallet(&Wallet {
        address: candidate.address,
        chain: candidate.chain,
        strategy_type: StrategyName::CopyTrade,
        win_rate: Some(candidate.estimated_win_rate),
        total_trades: candidate.tracked_trades,
        successful_trades: candidate.successful_tracked_trades,
        total_pnl_usd: 0.0,
        avg_trade_size_usd: 0.0,
        biggest_win_usd: 0.0,
        biggest_loss_usd: 0.0,
        status: WalletStatus::Active,
        date_added: Utc::now(),
        last_checked: None,
        notes: "promoted from discovery".to_string(),
    })?;

    let wallet = state
        .store
        .get_wallet(&address, chain)?
        .ok_or_else(|| ApiError::NotFound(format!("wallet {}", address)))?;
    Ok(Json(wallet))
}

pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<Vec<crate::status::ProviderStatus>> {
    Json(state.status.snapshot(Utc::now()).await)
}
