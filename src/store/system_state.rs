use super::Store;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

const KEY_TOTAL_CAPITAL: &str = "total_capital";
const KEY_AVAILABLE_CAPITAL: &str = "available_capital";
const KEY_DISCOVERY_COUNT_TODAY: &str = "discovery_count_today";
const KEY_LAST_DISCOVERY_RUN: &str = "last_discovery_run";
const KEY_TRADING_PAUSED: &str = "trading_paused";

impl Store {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT value FROM system_state WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .context("reading system_state")
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO system_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .context("writing system_state")?;
        Ok(())
    }

    pub fn get_total_capital(&self) -> Result<Option<f64>> {
        Ok(self.get_raw(KEY_TOTAL_CAPITAL)?.and_then(|v| v.parse().ok()))
    }

    pub fn set_total_capital(&self, value: f64) -> Result<()> {
        self.set_raw(KEY_TOTAL_CAPITAL, &value.to_string())
    }

    pub fn get_available_capital(&self) -> Result<Option<f64>> {
        Ok(self.get_raw(KEY_AVAILABLE_CAPITAL)?.and_then(|v| v.parse().ok()))
    }

    pub fn set_available_capital(&self, value: f64) -> Result<()> {
        self.set_raw(KEY_AVAILABLE_CAPITAL, &value.to_string())
    }

    pub fn get_discovery_count_today(&self) -> Result<u32> {
        Ok(self.get_raw(KEY_DISCOVERY_COUNT_TODAY)?.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    pub fn set_discovery_count_today(&self, value: u32) -> Result<()> {
        self.set_raw(KEY_DISCOVERY_COUNT_TODAY, &value.to_string())
    }

    pub fn increment_discovery_count_today(&self) -> Result<u32> {
        let next = self.get_discovery_count_today()? + 1;
        self.set_discovery_count_today(next)?;
        Ok(next)
    }

    pub fn get_last_discovery_run(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.get_raw(KEY_LAST_DISCOVERY_RUN)?.and_then(|v| v.parse::<DateTime<Utc>>().ok()))
    }

    pub fn set_last_discovery_run(&self, at: DateTime<Utc>) -> Result<()> {
        self.set_raw(KEY_LAST_DISCOVERY_RUN, &at.to_rfc3339())
    }

    pub fn is_trading_paused(&self) -> Result<bool> {
        Ok(self.get_raw(KEY_TRADING_PAUSED)?.map(|v| v == "true").unwrap_or(false))
    }

    pub fn set_trading_paused(&self, paused: bool) -> Result<()> {
        self.set_raw(KEY_TRADING_PAUSED, if paused { "true" } else { "false" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_keys_have_sensible_defaults() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.get_total_capital().unwrap(), None);
        assert_eq!(store.get_discovery_count_today().unwrap(), 0);
        assert!(!store.is_trading_paused().unwrap());
        assert_eq!(store.get_last_discovery_run().unwrap(), None);
    }

    #[test]
    fn round_trips_capital_and_pause_flag() {
        let store = Store::open_in_memory().unwrap();
        store.set_total_capital(10_000.0).unwrap();
        store.set_available_capital(7_500.0).unwrap();
        store.set_trading_paused(true).unwrap();

        assert_eq!(store.get_total_capital().unwrap(), Some(10_000.0));
        assert_eq!(store.get_available_capital().unwrap(), Some(7_500.0));
        assert!(store.is_trading_paused().unwrap());
    }

    #[test]
    fn discovery_count_increments() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.increment_discovery_count_today().unwrap(), 1);
        assert_eq!(store.increment_discovery_count_today().unwrap(), 2);
    }
}
