//! Configuration - a single `Config` built once from the environment and
//! passed down explicitly.
//!
//! - `macros.rs` - the `config_struct!` macro: defines a section with
//!   embedded defaults in one place, no repetition between the struct,
//!   `Default` impl, and serde attributes.
//! - `schemas.rs` - every configuration section, using that macro.
//! - `utils.rs` - `Config::from_env()`.
//!
//! There is deliberately no global/static config instance. `main` builds one
//! `Config` and hands it (usually via `Arc<Config>`) to the Supervisor and
//! each subsystem constructor; tests build their own with `Config::default()`
//! and override only the fields they care about.

#[macro_use]
mod macros;

pub mod schemas;
pub mod utils;

pub use schemas::{
    CapitalConfig, ChainConfig, Config, DiscoveryConfig, LoggingConfig, PricingConfig, RiskConfig,
    SchedulerConfig, StrategyConfig, SupervisorConfig, TradingConfig, WebserverConfig,
};
