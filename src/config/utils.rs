//! Configuration loading.
//!
//! `Config::from_env` is called exactly once, in `main`, and the resulting
//! value is handed down explicitly (usually behind an `Arc`) to every
//! component that needs it. There is no global config cell here: mutable
//! process-wide state is confined to the Supervisor's shutdown flag, not
//! scattered through a `static`.

use super::schemas::*;
use std::env;

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_wallet_list(key: &str) -> Vec<String> {
    env::var(key)
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

impl Config {
    /// Builds configuration from environment variables (optionally loaded
    /// from a `.env` file by the caller via `dotenv::dotenv()`), falling
    /// back to the defaults embedded in each `config_struct!` section.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            database_path: env_string("DATABASE_PATH", &defaults.database_path),
            watched_wallets: {
                let seeded = env_wallet_list("WATCHED_WALLETS");
                if seeded.is_empty() { defaults.watched_wallets } else { seeded }
            },
            capital: CapitalConfig {
                total_capital_usd: env_parsed("TOTAL_CAPITAL_USD", defaults.capital.total_capital_usd),
            },
            supervisor: SupervisorConfig {
                tracking_interval_secs: env_parsed(
                    "TRACKING_INTERVAL_SECS",
                    defaults.supervisor.tracking_interval_secs,
                ),
                manage_interval_secs: env_parsed(
                    "MANAGE_INTERVAL_SECS",
                    defaults.supervisor.manage_interval_secs,
                ),
                metrics_interval_secs: env_parsed(
                    "METRICS_INTERVAL_MIN",
                    defaults.supervisor.metrics_interval_secs / 60,
                ) * 60,
                discover_interval_secs: env_parsed(
                    "DISCOVER_INTERVAL_SECS",
                    defaults.supervisor.discover_interval_secs,
                ),
                shutdown_grace_secs: env_parsed(
                    "SHUTDOWN_GRACE_SECS",
                    defaults.supervisor.shutdown_grace_secs,
                ),
            },
            chain: ChainConfig {
                evm_explorer_key: env_opt_string("EVM_EXPLORER_KEY"),
                solana_rpc_key: env_opt_string("SOLANA_RPC_KEY"),
                solana_rpc_url: env_string("SOLANA_RPC_URL", &defaults.chain.solana_rpc_url),
                http_timeout_secs: env_parsed("CHAIN_HTTP_TIMEOUT_SECS", defaults.chain.http_timeout_secs),
                evm_min_spacing_ms: env_parsed("EVM_MIN_SPACING_MS", defaults.chain.evm_min_spacing_ms),
                cursor_cap_per_wallet: env_parsed(
                    "CURSOR_CAP_PER_WALLET",
                    defaults.chain.cursor_cap_per_wallet,
                ),
                mock_mode: env_bool("MOCK_MODE", defaults.chain.mock_mode),
            },
            pricing: PricingConfig {
                coingecko_key: env_opt_string("COINGECKO_API_KEY"),
                coinmarketcap_key: env_opt_string("COINMARKETCAP_API_KEY"),
                dex_provider_key: env_opt_string("DEX_PROVIDER_API_KEY"),
                cache_ttl_secs: env_parsed("PRICE_CACHE_TTL_SECS", defaults.pricing.cache_ttl_secs),
                cache_max_entries: env_parsed(
                    "PRICE_CACHE_MAX_ENTRIES",
                    defaults.pricing.cache_max_entries,
                ),
            },
            scheduler: SchedulerConfig {
                max_batch_size: env_parsed("SCHEDULER_MAX_BATCH_SIZE", defaults.scheduler.max_batch_size),
                batch_divisor: env_parsed("SCHEDULER_BATCH_DIVISOR", defaults.scheduler.batch_divisor),
                inter_chain_settle_ms: env_parsed(
                    "SCHEDULER_INTER_CHAIN_SETTLE_MS",
                    defaults.scheduler.inter_chain_settle_ms,
                ),
            },
            trading: TradingConfig {
                processed_lru_capacity: env_parsed(
                    "PROCESSED_LRU_CAPACITY",
                    defaults.trading.processed_lru_capacity,
                ),
                processed_lru_ttl_secs: env_parsed(
                    "PROCESSED_LRU_TTL_SECS",
                    defaults.trading.processed_lru_ttl_secs,
                ),
            },
            strategy: defaults.strategy,
            risk: RiskConfig {
                max_drawdown_pct: env_parsed("RISK_MAX_DRAWDOWN_PCT", defaults.risk.max_drawdown_pct),
                max_daily_loss_pct: env_parsed("RISK_MAX_DAILY_LOSS_PCT", defaults.risk.max_daily_loss_pct),
                max_weekly_loss_pct: env_parsed(
                    "RISK_MAX_WEEKLY_LOSS_PCT",
                    defaults.risk.max_weekly_loss_pct,
                ),
                max_open_positions: env_parsed(
                    "RISK_MAX_OPEN_POSITIONS",
                    defaults.risk.max_open_positions,
                ),
                max_position_pct_of_capital: env_parsed(
                    "RISK_MAX_POSITION_PCT",
                    defaults.risk.max_position_pct_of_capital,
                ),
                max_correlated_pct_of_capital: env_parsed(
                    "RISK_MAX_CORRELATED_PCT",
                    defaults.risk.max_correlated_pct_of_capital,
                ),
                strategy_pause_pnl_pct: env_parsed(
                    "RISK_STRATEGY_PAUSE_PNL_PCT",
                    defaults.risk.strategy_pause_pnl_pct,
                ),
                wallet_pause_pnl_pct: env_parsed(
                    "RISK_WALLET_PAUSE_PNL_PCT",
                    defaults.risk.wallet_pause_pnl_pct,
                ),
                wallet_pause_trade_window: env_parsed(
                    "RISK_WALLET_PAUSE_TRADE_WINDOW",
                    defaults.risk.wallet_pause_trade_window,
                ),
            },
            discovery: DiscoveryConfig {
                daily_limit: env_parsed("DAILY_DISCOVERY_LIMIT", defaults.discovery.daily_limit),
                pump_timeframe_days: env_parsed(
                    "DISCOVERY_PUMP_TIMEFRAME_DAYS",
                    defaults.discovery.pump_timeframe_days,
                ),
                pump_threshold_multiple: env_parsed(
                    "DISCOVERY_PUMP_THRESHOLD_MULTIPLE",
                    defaults.discovery.pump_threshold_multiple,
                ),
                early_buy_fraction: env_parsed(
                    "DISCOVERY_EARLY_BUY_FRACTION",
                    defaults.discovery.early_buy_fraction,
                ),
                min_trade_count: env_parsed(
                    "DISCOVERY_MIN_TRADE_COUNT",
                    defaults.discovery.min_trade_count,
                ),
                min_win_rate: env_parsed("DISCOVERY_MIN_WIN_RATE", defaults.discovery.min_win_rate),
                min_profit_usd: env_parsed("DISCOVERY_MIN_PROFIT_USD", defaults.discovery.min_profit_usd),
                top_k_per_run: env_parsed("DISCOVERY_TOP_K_PER_RUN", defaults.discovery.top_k_per_run),
            },
            webserver: WebserverConfig {
                enabled: env_bool("WEBSERVER_ENABLED", defaults.webserver.enabled),
                bind_addr: env_string("WEBSERVER_BIND_ADDR", &defaults.webserver.bind_addr),
                api_key: env_opt_string("WEBSERVER_API_KEY"),
                cors_origin: env_string("WEBSERVER_CORS_ORIGIN", &defaults.webserver.cors_origin),
                rate_limit_window_ms: env_parsed(
                    "WEBSERVER_RATE_LIMIT_WINDOW_MS",
                    defaults.webserver.rate_limit_window_ms,
                ),
                rate_limit_max_general: env_parsed(
                    "WEBSERVER_RATE_LIMIT_MAX_GENERAL",
                    defaults.webserver.rate_limit_max_general,
                ),
                rate_limit_max_mutating: env_parsed(
                    "WEBSERVER_RATE_LIMIT_MAX_MUTATING",
                    defaults.webserver.rate_limit_max_mutating,
                ),
                rate_limit_max_discovery: env_parsed(
                    "WEBSERVER_RATE_LIMIT_MAX_DISCOVERY",
                    defaults.webserver.rate_limit_max_discovery,
                ),
            },
            logging: LoggingConfig {
                level: env_string("LOG_LEVEL", &defaults.logging.level),
                log_dir: env_string("LOG_DIR", &defaults.logging.log_dir),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env_match_schema() {
        let cfg = Config::default();
        assert_eq!(cfg.capital.total_capital_usd, 10_000.0);
        assert_eq!(cfg.discovery.daily_limit, 15);
    }

    #[test]
    fn watched_wallets_seed_parses_comma_list() {
        let wallets = env_wallet_list("__PAPERWATCH_TEST_WALLETS_UNSET__");
        assert!(wallets.is_empty());
    }
}
