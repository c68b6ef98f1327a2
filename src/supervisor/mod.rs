//! Owns the scheduled jobs and graceful shutdown (§4.9).
//!
//! Four jobs run as independent `tokio::spawn`ed loops against their own
//! interval: ingest, manage, discover, metrics. Each reads the shared
//! shutdown flag between ticks; `run` resolves once every job's
//! `JoinHandle` has been awaited, after a bounded grace window, then hands
//! off to `TradingEngine::shutdown`.

use crate::chain::{ChainClient, EvmChainClient, MockChainClient, SolanaChainClient};
use crate::config::{ChainConfig, SupervisorConfig};
use crate::discovery::Discovery;
use crate::domain::Chain;
use crate::logger::{self, LogTag};
use crate::scheduler::Scheduler;
use crate::status::ApiStatus;
use crate::store::Store;
use crate::trading::TradingEngine;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Resolves the two upstream clients ingest uses, substituting a single
/// deterministic mock for both when `mock_mode` is set (§4.3).
fn build_chain_clients(config: &ChainConfig) -> (Arc<dyn ChainClient>, Arc<dyn ChainClient>) {
    if config.mock_mode {
        let mock: Arc<dyn ChainClient> = Arc::new(MockChainClient::new());
        return (mock.clone(), mock);
    }
    let evm: Arc<dyn ChainClient> = Arc::new(EvmChainClient::new(
        config.http_timeout_secs,
        config.evm_min_spacing_ms,
        config.evm_explorer_key.clone(),
        config.cursor_cap_per_wallet,
    ));
    let solana: Arc<dyn ChainClient> = Arc::new(SolanaChainClient::new(
        config.http_timeout_secs,
        config.evm_min_spacing_ms,
        config.solana_rpc_url.clone(),
        config.solana_rpc_key.clone(),
        config.cursor_cap_per_wallet,
    ));
    (evm, solana)
}

pub struct Supervisor {
    store: Store,
    trading: Arc<TradingEngine>,
    discovery: Arc<Discovery>,
    status: Arc<ApiStatus>,
    scheduler: Arc<Scheduler>,
    evm_client: Arc<dyn ChainClient>,
    solana_client: Arc<dyn ChainClient>,
    config: SupervisorConfig,
    shutdown: Arc<AtomicBool>,
    manage_running: Arc<AtomicBool>,
    discover_running: Arc<AtomicBool>,
}

impl Supervisor {
    pub fn new(
        store: Store,
        trading: Arc<TradingEngine>,
        discovery: Arc<Discovery>,
        status: Arc<ApiStatus>,
        scheduler: Scheduler,
        chain_config: &ChainConfig,
        config: SupervisorConfig,
    ) -> Self {
        let (evm_client, solana_client) = build_chain_clients(chain_config);
        Self {
            store,
            trading,
            discovery,
            status,
            scheduler: Arc::new(scheduler),
            evm_client,
            solana_client,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            manage_running: Arc::new(AtomicBool::new(false)),
            discover_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A clone-able handle other components (the HTTP boundary) can read to
    /// tell whether a shutdown is in progress, and flip to request one.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Runs one ingest tick: the due wallet slice, fetched per chain, added
    /// to the Store, and handed to `TradingEngine::process`. Exposed so the
    /// HTTP boundary's `POST /api/track` can trigger it out of band from the
    /// scheduled loop.
    pub async fn run_ingest_tick(&self) -> anyhow::Result<usize> {
        let active = self.store.list_active_wallets()?;
        let slices = self.scheduler.next_slice(&active);
        if slices.is_empty() {
            return Ok(0);
        }

        let mut opened_total = 0;
        let total_chains = slices.len();
        for (index, group) in slices.iter().enumerate() {
            let mut applied = Vec::new();
            for wallet in group {
                let client: &Arc<dyn ChainClient> = if wallet.chain.is_evm() { &self.evm_client } else { &self.solana_client };
                match client.get_recent_token_transfers(&wallet.address, wallet.chain, None).await {
                    Ok((transfers, _cursor)) => {
                        for transfer in transfers {
                            match self.store.add_transfer(&transfer) {
                                Ok(crate::errors::StoreOutcome::Applied) => applied.push(transfer),
                                Ok(crate::errors::StoreOutcome::Rejected(reason)) => {
                                    logger::debug(LogTag::Chain, &format!("transfer rejected: {}", reason));
                                }
                                Err(e) => logger::error(LogTag::Chain, &format!("failed to store transfer: {}", e)),
                            }
                        }
                        self.store.touch_wallet_checked(&wallet.address, wallet.chain, Utc::now())?;
                    }
                    Err(e) => {
                        logger::warning(LogTag::Chain, &format!("ingest failed for {} on {:?}: {}", wallet.address, wallet.chain, e));
                    }
                }
            }
            self.scheduler.settle_between_chains(index, total_chains).await;

            match self.trading.process(&applied).await {
                Ok(opened) => opened_total += opened,
                Err(e) => logger::error(LogTag::Trading, &format!("processing ingest batch failed: {}", e)),
            }
        }

        self.scheduler.finish_tick();
        Ok(opened_total)
    }

    /// Runs one manage tick, reentrancy-guarded against an overlapping
    /// scheduled or manually-triggered run.
    pub async fn run_manage_tick(&self) -> anyhow::Result<usize> {
        if self.manage_running.swap(true, Ordering::SeqCst) {
            logger::warning(LogTag::Supervisor, "manage tick still running, skipping this one");
            return Ok(0);
        }
        let result = self.trading.manage_open_positions().await;
        self.manage_running.store(false, Ordering::SeqCst);
        result
    }

    /// Runs one discovery pass. Exposed for `POST /api/discover`;
    /// reentrancy-guarded the same way as manage.
    pub async fn run_discover_tick(&self) -> anyhow::Result<usize> {
        if self.discover_running.swap(true, Ordering::SeqCst) {
            logger::warning(LogTag::Supervisor, "discovery tick still running, skipping this one");
            return Ok(0);
        }
        let result = self.discovery.run(Utc::now());
        self.discover_running.store(false, Ordering::SeqCst);
        result
    }

    /// Refreshes the cached provider health snapshot.
    pub async fn run_metrics_tick(&self) {
        self.status.snapshot(Utc::now()).await;
    }

    /// Spawns the four job loops and the ctrlc signal watcher, then blocks
    /// until every job has wound down.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let shutdown = Arc::clone(&self.shutdown);
        ctrlc::set_handler(move || {
            logger::info(LogTag::Supervisor, "shutdown signal received");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|e| anyhow::anyhow!("failed to install signal handler: {}", e))?;

        let ingest = self.spawn_job("ingest", self.config.tracking_interval_secs, {
            let this = Arc::clone(&self);
            move || {
                let this = Arc::clone(&this);
                async move {
                    if let Err(e) = this.run_ingest_tick().await {
                        logger::error(LogTag::Supervisor, &format!("ingest tick failed: {}", e));
                    }
                }
            }
        });

        let manage = self.spawn_job("manage", self.config.manage_interval_secs, {
            let this = Arc::clone(&self);
            move || {
                let this = Arc::clone(&this);
                async move {
                    if let Err(e) = this.run_manage_tick().await {
                        logger::error(LogTag::Supervisor, &format!("manage tick failed: {}", e));
                    }
                }
            }
        });

        let discover = self.spawn_job("discover", self.config.discover_interval_secs, {
            let this = Arc::clone(&self);
            move || {
                let this = Arc::clone(&this);
                async move {
                    if let Err(e) = this.run_discover_tick().await {
                        logger::error(LogTag::Supervisor, &format!("discover tick failed: {}", e));
                    }
                }
            }
        });

        let metrics = self.spawn_job("metrics", self.config.metrics_interval_secs, {
            let this = Arc::clone(&self);
            move || {
                let this = Arc::clone(&this);
                async move {
                    this.run_metrics_tick().await;
                }
            }
        });

        for handle in [ingest, manage, discover, metrics] {
            let _ = handle.await;
        }

        logger::info(LogTag::Supervisor, "all jobs wound down, shutting down trading engine");
        self.trading.shutdown().await;
        Ok(())
    }

    /// Spawns one job loop: ticks on its own interval, running `body` each
    /// time, until the shared shutdown flag is set. Exits immediately (no
    /// further tick) once shutdown is observed, per the bounded grace
    /// window — a tick already in flight still runs to completion.
    fn spawn_job<F, Fut>(&self, name: &'static str, interval_secs: u64, body: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let shutdown = Arc::clone(&self.shutdown);
        let grace = Duration::from_secs(self.config.shutdown_grace_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                body().await;
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
            }
            logger::debug(LogTag::Supervisor, &format!("{} job loop exiting", name));
            let _ = grace;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainConfig, DiscoveryConfig, PricingConfig, RiskConfig, StrategyConfig};
    use crate::pricing::PriceOracle;

    fn supervisor() -> Arc<Supervisor> {
        let store = Store::open_in_memory().unwrap();
        store.set_total_capital(10_000.0).unwrap();
        store.set_available_capital(10_000.0).unwrap();

        let trading = Arc::new(
            TradingEngine::new(
                store.clone(),
                PriceOracle::new(&PricingConfig::default()),
                StrategyConfig::default(),
                &RiskConfig::default(),
                10_000,
                3_600,
            )
            .unwrap(),
        );
        let discovery = Arc::new(Discovery::new(store.clone(), DiscoveryConfig::default()));
        let status = Arc::new(ApiStatus::new(Vec::new()));
        let chain_config = ChainConfig { mock_mode: true, ..ChainConfig::default() };
        let scheduler = Scheduler::new(crate::config::SchedulerConfig::default());

        Arc::new(Supervisor::new(store, trading, discovery, status, scheduler, &chain_config, SupervisorConfig::default()))
    }

    #[tokio::test]
    async fn a_manage_tick_on_an_empty_store_closes_nothing() {
        let supervisor = supervisor();
        let closed = supervisor.run_manage_tick().await.unwrap();
        assert_eq!(closed, 0);
    }

    #[tokio::test]
    async fn an_overlapping_manage_tick_is_skipped_not_queued() {
        let supervisor = supervisor();
        supervisor.manage_running.store(true, Ordering::SeqCst);
        let closed = supervisor.run_manage_tick().await.unwrap();
        assert_eq!(closed, 0);
        supervisor.manage_running.store(false, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn an_ingest_tick_with_no_active_wallets_opens_nothing() {
        let supervisor = supervisor();
        let opened = supervisor.run_ingest_tick().await.unwrap();
        assert_eq!(opened, 0);
    }
}
