//! Runtime logger configuration.
//!
//! A single `LoggerConfig` is set once (from `Config::logging`) during
//! `logger::init`. Level filtering only; there is no per-tag CLI flag system
//! since this process has no interactive command line, just env vars read
//! once at startup.

use super::levels::LogLevel;
use once_cell::sync::Lazy;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub console_enabled: bool,
    pub file_enabled: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { min_level: LogLevel::Info, console_enabled: true, file_enabled: true }
    }
}

static LOGGER_CONFIG: Lazy<Arc<RwLock<LoggerConfig>>> =
    Lazy::new(|| Arc::new(RwLock::new(LoggerConfig::default())));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// Parses `level` (as found in `LoggingConfig::level`) and installs it as the
/// active minimum level. Unrecognized values fall back to Info rather than
/// failing startup over a typo'd env var.
pub fn init_from_level(level: &str) {
    let min_level = LogLevel::from_str(level).unwrap_or(LogLevel::Info);
    set_logger_config(LoggerConfig { min_level, ..LoggerConfig::default() });
}
