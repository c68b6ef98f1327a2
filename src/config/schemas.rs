//! Configuration schemas - every tunable the core loop reads, defined once
//! with embedded defaults via `config_struct!` (§9: single source, no
//! repetition). Values are overridden from environment variables in
//! `utils::Config::from_env`; nothing here reads the environment directly.

use crate::config_struct;

config_struct! {
    /// Capital accounting (§3 SystemState, §4.7 TradingEngine).
    pub struct CapitalConfig {
        total_capital_usd: f64 = 10_000.0,
    }
}

config_struct! {
    /// Tick cadence for the Supervisor's scheduled jobs (§4.9).
    pub struct SupervisorConfig {
        tracking_interval_secs: u64 = 60,
        manage_interval_secs: u64 = 120,
        metrics_interval_secs: u64 = 900,
        discover_interval_secs: u64 = 6 * 60 * 60,
        shutdown_grace_secs: u64 = 10,
    }
}

config_struct! {
    /// ChainClient provider keys and timeouts (§4.3, §5).
    pub struct ChainConfig {
        evm_explorer_key: Option<String> = None,
        solana_rpc_key: Option<String> = None,
        solana_rpc_url: String = "https://api.mainnet-beta.solana.com".to_string(),
        http_timeout_secs: u64 = 10,
        evm_min_spacing_ms: u64 = 200,
        cursor_cap_per_wallet: usize = 100,
        mock_mode: bool = false,
    }
}

config_struct! {
    /// PriceOracle cascade keys and cache shape (§4.2).
    pub struct PricingConfig {
        coingecko_key: Option<String> = None,
        coinmarketcap_key: Option<String> = None,
        dex_provider_key: Option<String> = None,
        cache_ttl_secs: u64 = 60,
        cache_max_entries: usize = 500,
    }
}

config_struct! {
    /// Wallet rotation policy (§4.4).
    pub struct SchedulerConfig {
        max_batch_size: usize = 6,
        batch_divisor: usize = 5,
        inter_chain_settle_ms: u64 = 250,
    }
}

config_struct! {
    /// In-memory processed-transfer LRU (§4.7, §5).
    pub struct TradingConfig {
        processed_lru_capacity: usize = 10_000,
        processed_lru_ttl_secs: u64 = 60 * 60,
    }
}

config_struct! {
    /// Per-strategy thresholds (§4.5). One flat section; each strategy reads
    /// only the fields relevant to it.
    pub struct StrategyConfig {
        copy_min_trade_usd: f64 = 50.0,
        copy_max_per_trade_usd: f64 = 500.0,
        copy_pct_of_tx: f64 = 0.1,
        smart_money_whale_threshold_usd: f64 = 2_000.0,
        smart_money_max_per_trade_usd: f64 = 1_500.0,
        volume_breakout_window_secs: u64 = 60 * 60,
        volume_breakout_multiplier: f64 = 2.5,
        volume_breakout_min_buyers: u32 = 3,
        volume_breakout_max_per_trade_usd: f64 = 800.0,
        memecoin_copy_threshold: u32 = 5,
        memecoin_copy_window_secs: u64 = 60 * 30,
        memecoin_max_per_trade_usd: f64 = 400.0,
        arbitrage_copy_threshold_usd: f64 = 250.0,
        arbitrage_max_per_trade_usd: f64 = 600.0,
        early_gem_max_token_age_hours: f64 = 72.0,
        early_gem_min_liquidity_usd: f64 = 10_000.0,
        early_gem_min_win_rate: f64 = 0.5,
        early_gem_max_per_trade_usd: f64 = 300.0,
        time_stop_hours: f64 = 48.0,
    }
}

config_struct! {
    /// Admission-control thresholds (§4.6).
    pub struct RiskConfig {
        max_drawdown_pct: f64 = 0.20,
        max_daily_loss_pct: f64 = 0.03,
        max_weekly_loss_pct: f64 = 0.08,
        max_open_positions: usize = 40,
        max_position_pct_of_capital: f64 = 0.12,
        max_correlated_pct_of_capital: f64 = 0.25,
        strategy_pause_pnl_pct: f64 = -0.15,
        wallet_pause_pnl_pct: f64 = -0.12,
        wallet_pause_trade_window: usize = 20,
    }
}

config_struct! {
    /// Discovery tuning (§4.8).
    pub struct DiscoveryConfig {
        daily_limit: u32 = 15,
        pump_timeframe_days: i64 = 10,
        pump_threshold_multiple: f64 = 2.5,
        early_buy_fraction: f64 = 0.25,
        min_trade_count: u32 = 15,
        min_win_rate: f64 = 0.55,
        min_profit_usd: f64 = 3_000.0,
        top_k_per_run: usize = 5,
    }
}

config_struct! {
    /// HTTP boundary (§6). Out of core scope but its contract is fixed.
    pub struct WebserverConfig {
        enabled: bool = true,
        bind_addr: String = "0.0.0.0:8080".to_string(),
        api_key: Option<String> = None,
        cors_origin: String = "*".to_string(),
        rate_limit_window_ms: u64 = 15 * 60 * 1000,
        rate_limit_max_general: u32 = 100,
        rate_limit_max_mutating: u32 = 10,
        rate_limit_max_discovery: u32 = 5,
    }
}

config_struct! {
    /// Logging (A2).
    pub struct LoggingConfig {
        level: String = "info".to_string(),
        log_dir: String = "data/logs".to_string(),
    }
}

config_struct! {
    /// Top-level configuration aggregate. Constructed once at startup
    /// (`Config::from_env`) and passed down explicitly; never a global
    /// singleton (§9 "confine process-wide state to the Supervisor").
    pub struct Config {
        database_path: String = "data/paperwatch.db".to_string(),
        watched_wallets: Vec<String> = Vec::new(),
        capital: CapitalConfig = CapitalConfig::default(),
        supervisor: SupervisorConfig = SupervisorConfig::default(),
        chain: ChainConfig = ChainConfig::default(),
        pricing: PricingConfig = PricingConfig::default(),
        scheduler: SchedulerConfig = SchedulerConfig::default(),
        trading: TradingConfig = TradingConfig::default(),
        strategy: StrategyConfig = StrategyConfig::default(),
        risk: RiskConfig = RiskConfig::default(),
        discovery: DiscoveryConfig = DiscoveryConfig::default(),
        webserver: WebserverConfig = WebserverConfig::default(),
        logging: LoggingConfig = LoggingConfig::default(),
    }
}
