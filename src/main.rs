use paperwatch::config::Config;
use paperwatch::discovery::Discovery;
use paperwatch::domain::{Chain, Wallet, WalletStatus};
use paperwatch::logger::{self, LogTag};
use paperwatch::pricing::PriceOracle;
use paperwatch::scheduler::Scheduler;
use paperwatch::status::{ApiStatus, ProbeSpec, Tier};
use paperwatch::store::Store;
use paperwatch::supervisor::Supervisor;
use paperwatch::trading::TradingEngine;
use paperwatch::webserver;
use std::sync::Arc;

fn probe_specs(config: &Config) -> Vec<ProbeSpec> {
    vec![
        ProbeSpec {
            provider: "evm_explorer",
            url: "https://api.etherscan.io/v2/api?chainid=1&module=stats&action=ethsupply".to_string(),
            tier: Tier::Critical,
            anchor: None,
        },
        ProbeSpec {
            provider: "solana_rpc",
            url: config.chain.solana_rpc_url.clone(),
            tier: Tier::Critical,
            anchor: None,
        },
        ProbeSpec {
            provider: "coingecko",
            url: "https://api.coingecko.com/api/v3/ping".to_string(),
            tier: Tier::NonCritical,
            anchor: None,
        },
        ProbeSpec {
            provider: "coinmarketcap",
            url: "https://pro-api.coinmarketcap.com/v2/key/info".to_string(),
            tier: Tier::NonCritical,
            anchor: Some("coingecko"),
        },
        ProbeSpec {
            provider: "dexscreener",
            url: "https://api.dexscreener.com/latest/dex/tokens/So11111111111111111111111111111111111111112".to_string(),
            tier: Tier::NonCritical,
            anchor: Some("solana_rpc"),
        },
        ProbeSpec {
            provider: "jupiter",
            url: "https://price.jup.ag/v6/price?ids=SOL".to_string(),
            tier: Tier::NonCritical,
            anchor: Some("solana_rpc"),
        },
    ]
}

/// Parses a `"address:chain"` seed entry; invalid entries are logged and
/// skipped rather than crashing startup (§6 env var table: absence/malformed
/// input downgrades a feature, never aborts the process).
fn parse_seed_wallet(raw: &str) -> Option<(String, Chain)> {
    let (address, chain_str) = raw.split_once(':')?;
    let chain = match chain_str.to_ascii_lowercase().as_str() {
        "ethereum" => Chain::Ethereum,
        "base" => Chain::Base,
        "arbitrum" => Chain::Arbitrum,
        "optimism" => Chain::Optimism,
        "polygon" => Chain::Polygon,
        "solana" => Chain::Solana,
        _ => return None,
    };
    Some((address.trim().to_string(), chain))
}

/// Seeds `WATCHED_WALLETS` into the Store the first time the process boots
/// against an empty wallet table. Later additions go through promotion or an
/// operator action, not env reloads, so this only ever runs once per database.
fn seed_watched_wallets(store: &Store, config: &Config) -> anyhow::Result<()> {
    if !store.list_wallets()?.is_empty() {
        return Ok(());
    }
    for raw in &config.watched_wallets {
        match parse_seed_wallet(raw) {
            Some((address, chain)) => {
                store.upsert_wallet(&Wallet {
                    address,
                    chain,
                    strategy_type: paperwatch::domain::StrategyName::CopyTrade,
                    win_rate: None,
                    total_trades: 0,
                    successful_trades: 0,
                    total_pnl_usd: 0.0,
                    avg_trade_size_usd: 0.0,
                    biggest_win_usd: 0.0,
                    biggest_loss_usd: 0.0,
                    status: WalletStatus::Active,
                    date_added: chrono::Utc::now(),
                    last_checked: None,
                    notes: "seeded from WATCHED_WALLETS".to_string(),
                })?;
            }
            None => logger::warning(LogTag::System, &format!("ignoring malformed WATCHED_WALLETS entry '{}'", raw)),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    let config = Config::from_env();
    logger::init(&config.logging.level, &config.logging.log_dir);
    logger::info(LogTag::System, "starting up");

    let store = Store::open(&config.database_path)?;
    if store.get_total_capital()?.is_none() {
        store.set_total_capital(config.capital.total_capital_usd)?;
        store.set_available_capital(config.capital.total_capital_usd)?;
    }
    seed_watched_wallets(&store, &config)?;

    let price_oracle = PriceOracle::new(&config.pricing);
    let trading = Arc::new(TradingEngine::new(
        store.clone(),
        price_oracle,
        config.strategy.clone(),
        &config.risk,
        config.trading.processed_lru_capacity,
        config.trading.processed_lru_ttl_secs,
    )?);
    let discovery = Arc::new(Discovery::new(store.clone(), config.discovery.clone()));
    let status = Arc::new(ApiStatus::new(probe_specs(&config)));
    let scheduler = Scheduler::new(config.scheduler.clone());

    let supervisor = Arc::new(Supervisor::new(
        store.clone(),
        trading,
        discovery,
        Arc::clone(&status),
        scheduler,
        &config.chain,
        config.supervisor.clone(),
    ));

    let app_state = webserver::AppState {
        store,
        supervisor: Arc::clone(&supervisor),
        status,
        mock_mode: config.chain.mock_mode,
    };

    let supervisor_handle = tokio::spawn(Arc::clone(&supervisor).run());
    let webserver_handle = tokio::spawn(webserver::run(app_state, config.webserver));

    let (supervisor_result, webserver_result) = tokio::join!(supervisor_handle, webserver_handle);
    supervisor_result??;
    webserver_result??;

    logger::flush();
    Ok(())
}
