use super::Store;
use crate::domain::StrategyName;
use crate::domain::StrategyPerformance;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

fn row_to_performance(row: &Row) -> rusqlite::Result<StrategyPerformance> {
    let strategy_str: String = row.get("strategy_type")?;
    let date_str: String = row.get("date")?;

    Ok(StrategyPerformance {
        strategy_type: StrategyName::from_str_loose(&strategy_str).unwrap_or(StrategyName::CopyTrade),
        date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
        trades_opened: row.get("trades_opened")?,
        trades_closed: row.get("trades_closed")?,
        wins: row.get("wins")?,
        losses: row.get("losses")?,
        realised_pnl_usd: row.get("realised_pnl_usd")?,
    })
}

impl Store {
    pub fn get_performance(&self, strategy: StrategyName, date: NaiveDate) -> Result<Option<StrategyPerformance>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM strategy_performance WHERE strategy_type = ?1 AND date = ?2",
            params![strategy.as_str(), date.to_string()],
            row_to_performance,
        )
        .optional()
        .context("fetching strategy performance")
    }

    pub fn list_performance(&self, strategy: StrategyName) -> Result<Vec<StrategyPerformance>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM strategy_performance WHERE strategy_type = ?1 ORDER BY date",
        )?;
        let rows = stmt.query_map(params![strategy.as_str()], row_to_performance)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("listing strategy performance")
    }

    pub fn record_trade_opened(&self, strategy: StrategyName, date: NaiveDate) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO strategy_performance (strategy_type, date, trades_opened)
             VALUES (?1, ?2, 1)
             ON CONFLICT(strategy_type, date) DO UPDATE SET
                trades_opened = trades_opened + 1",
            params![strategy.as_str(), date.to_string()],
        )
        .context("recording trade opened")?;
        Ok(())
    }

    /// Rolls a closed trade's outcome into its day's bucket (§3: counters and
    /// rollups per day, unique on (strategy_type, date)).
    pub fn record_trade_closed(&self, strategy: StrategyName, date: NaiveDate, pnl: f64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let win = if pnl > 0.0 { 1 } else { 0 };
        let loss = if pnl <= 0.0 { 1 } else { 0 };
        conn.execute(
            "INSERT INTO strategy_performance (strategy_type, date, trades_closed, wins, losses, realised_pnl_usd)
             VALUES (?1, ?2, 1, ?3, ?4, ?5)
             ON CONFLICT(strategy_type, date) DO UPDATE SET
                trades_closed = trades_closed + 1,
                wins = wins + ?3,
                losses = losses + ?4,
                realised_pnl_usd = realised_pnl_usd + ?5",
            params![strategy.as_str(), date.to_string(), win, loss, pnl],
        )
        .context("recording trade closed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    #[test]
    fn opened_and_closed_counters_accumulate_same_day() {
        let store = Store::open_in_memory().unwrap();
        store.record_trade_opened(StrategyName::CopyTrade, today()).unwrap();
        store.record_trade_opened(StrategyName::CopyTrade, today()).unwrap();
        store.record_trade_closed(StrategyName::CopyTrade, today(), 25.0).unwrap();
        store.record_trade_closed(StrategyName::CopyTrade, today(), -10.0).unwrap();

        let perf = store.get_performance(StrategyName::CopyTrade, today()).unwrap().unwrap();
        assert_eq!(perf.trades_opened, 2);
        assert_eq!(perf.trades_closed, 2);
        assert_eq!(perf.wins, 1);
        assert_eq!(perf.losses, 1);
        assert_eq!(perf.realised_pnl_usd, 15.0);
    }

    #[test]
    fn different_strategies_stay_isolated() {
        let store = Store::open_in_memory().unwrap();
        store.record_trade_opened(StrategyName::CopyTrade, today()).unwrap();
        store.record_trade_opened(StrategyName::Arbitrage, today()).unwrap();

        let copy = store.get_performance(StrategyName::CopyTrade, today()).unwrap().unwrap();
        assert_eq!(copy.trades_opened, 1);
    }
}
