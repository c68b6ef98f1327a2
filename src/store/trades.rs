use super::Store;
use crate::domain::{Chain, ExitReason, PaperTrade, StrategyName, TradeStatus};
use crate::errors::{EngineError, StoreOutcome};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_trade(row: &Row) -> rusqlite::Result<PaperTrade> {
    let chain_str: String = row.get("chain")?;
    let strategy_str: String = row.get("strategy_used")?;
    let status_str: String = row.get("status")?;
    let opened_at: String = row.get("opened_at")?;
    let exit_time: Option<String> = row.get("exit_time")?;
    let exit_reason: Option<String> = row.get("exit_reason")?;

    Ok(PaperTrade {
        id: row.get("id")?,
        token_address: row.get("token_address")?,
        chain: Chain::from_str_loose(&chain_str).unwrap_or(Chain::Ethereum),
        strategy_used: StrategyName::from_str_loose(&strategy_str).unwrap_or(StrategyName::CopyTrade),
        source_wallet: row.get("source_wallet")?,
        entry_price: row.get("entry_price")?,
        amount: row.get("amount")?,
        entry_value_usd: row.get("entry_value_usd")?,
        peak_price: row.get("peak_price")?,
        status: if status_str == "open" { TradeStatus::Open } else { TradeStatus::Closed },
        opened_at: opened_at.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
        exit_price: row.get("exit_price")?,
        exit_value_usd: row.get("exit_value_usd")?,
        pnl: row.get("pnl")?,
        pnl_percentage: row.get("pnl_percentage")?,
        exit_time: exit_time.and_then(|s| s.parse::<DateTime<Utc>>().ok()),
        exit_reason: exit_reason.and_then(|s| parse_exit_reason(&s)),
        notes: row.get("notes")?,
    })
}

fn parse_exit_reason(s: &str) -> Option<ExitReason> {
    match s {
        "stop_loss" => Some(ExitReason::StopLoss),
        "take_profit" => Some(ExitReason::TakeProfit),
        "trailing_stop" => Some(ExitReason::TrailingStop),
        "time_stop" => Some(ExitReason::TimeStop),
        "tier_take_profit" => Some(ExitReason::TierTakeProfit),
        "manual" => Some(ExitReason::Manual),
        _ => None,
    }
}

impl Store {
    pub fn open_paper_trade(
        &self,
        token_address: &str,
        chain: Chain,
        strategy_used: StrategyName,
        source_wallet: &str,
        entry_price: f64,
        amount: f64,
        opened_at: DateTime<Utc>,
    ) -> Result<i64> {
        let entry_value_usd = entry_price * amount;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO paper_trades (
                token_address, chain, strategy_used, source_wallet, entry_price, amount,
                entry_value_usd, peak_price, status, opened_at, notes
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?5,'open',?8,'')",
            params![
                token_address,
                chain.as_str(),
                strategy_used.as_str(),
                source_wallet,
                entry_price,
                amount,
                entry_value_usd,
                opened_at.to_rfc3339(),
            ],
        )
        .context("opening paper trade")?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_trade(&self, id: i64) -> Result<Option<PaperTrade>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM paper_trades WHERE id = ?1", params![id], row_to_trade)
            .optional()
            .context("fetching paper trade")
    }

    pub fn list_open_trades(&self) -> Result<Vec<PaperTrade>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM paper_trades WHERE status = 'open' ORDER BY opened_at")?;
        let rows = stmt.query_map([], row_to_trade)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("listing open trades")
    }

    pub fn list_closed_trades(
        &self,
        wallet: Option<&str>,
        strategy: Option<StrategyName>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PaperTrade>> {
        let conn = self.conn.lock().unwrap();
        let mut sql = "SELECT * FROM paper_trades WHERE status = 'closed'".to_string();
        let mut bind_values: Vec<String> = Vec::new();

        if let Some(wallet) = wallet {
            sql.push_str(" AND source_wallet = ?");
            bind_values.push(wallet.to_string());
        }
        if let Some(strategy) = strategy {
            sql.push_str(" AND strategy_used = ?");
            bind_values.push(strategy.as_str().to_string());
        }
        if let Some(since) = since {
            sql.push_str(" AND exit_time >= ?");
            bind_values.push(since.to_rfc3339());
        }
        sql.push_str(" ORDER BY exit_time DESC");

        let mut stmt = conn.prepare(&sql)?;
        let bind_refs: Vec<&dyn rusqlite::ToSql> =
            bind_values.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
        let rows = stmt.query_map(bind_refs.as_slice(), row_to_trade)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("listing closed trades")
    }

    /// Shrinks `amount` for a partial exit, and `entry_value_usd` along with
    /// it (`entry_price * new_amount`) so the remaining position's cost basis
    /// always matches what is still actually reserved. `peak_price` and tier
    /// `notes` are updated by the caller via their own dedicated setters so
    /// each concern stays a single statement (§9: bound parameters, no
    /// string splicing).
    pub fn update_paper_trade_amount(&self, id: i64, new_amount: f64) -> Result<StoreOutcome> {
        if new_amount <= 0.0 {
            return Ok(StoreOutcome::Rejected("new amount must be positive".to_string()));
        }
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE paper_trades SET amount = ?1, entry_value_usd = entry_price * ?1 WHERE id = ?2 AND status = 'open'",
                params![new_amount, id],
            )
            .context("updating paper trade amount")?;
        Ok(if changed == 0 {
            StoreOutcome::Rejected("trade not found or not open".to_string())
        } else {
            StoreOutcome::Applied
        })
    }

    pub fn update_peak_price(&self, id: i64, current_price: f64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE paper_trades SET peak_price = MAX(peak_price, ?1) WHERE id = ?2 AND status = 'open'",
            params![current_price, id],
        )
        .context("updating peak price")?;
        Ok(())
    }

    pub fn append_trade_note(&self, id: i64, tier: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let existing: String =
            conn.query_row("SELECT notes FROM paper_trades WHERE id = ?1", params![id], |r| r.get(0))
                .context("reading trade notes")?;
        if existing.split(';').any(|e| e.trim() == tier) {
            return Ok(());
        }
        let updated = if existing.is_empty() { tier.to_string() } else { format!("{};{}", existing, tier) };
        conn.execute("UPDATE paper_trades SET notes = ?1 WHERE id = ?2", params![updated, id])
            .context("appending trade note")?;
        Ok(())
    }

    /// Validates `exit_price > 0` and that the trade is currently open before
    /// writing close fields (§4.1: refuses to close a closed trade).
    pub fn close_paper_trade(
        &self,
        id: i64,
        exit_price: f64,
        exit_reason: ExitReason,
        exit_time: DateTime<Utc>,
    ) -> Result<PaperTrade> {
        if exit_price <= 0.0 {
            return Err(EngineError::validation("exit_price", "must be > 0").into());
        }

        let conn = self.conn.lock().unwrap();
        let trade = conn
            .query_row("SELECT * FROM paper_trades WHERE id = ?1", params![id], row_to_trade)
            .optional()
            .context("fetching trade to close")?
            .ok_or_else(|| EngineError::position(format!("no such trade {}", id)))?;

        if trade.status != TradeStatus::Open {
            return Err(EngineError::position(format!("trade {} is not open", id)).into());
        }

        let exit_value_usd = exit_price * trade.amount;
        let pnl = exit_value_usd - trade.entry_value_usd;
        let pnl_percentage = if trade.entry_value_usd > 0.0 { pnl / trade.entry_value_usd * 100.0 } else { 0.0 };

        conn.execute(
            "UPDATE paper_trades SET
                status = 'closed', exit_price = ?1, exit_value_usd = ?2, pnl = ?3,
                pnl_percentage = ?4, exit_time = ?5, exit_reason = ?6
             WHERE id = ?7",
            params![
                exit_price,
                exit_value_usd,
                pnl,
                pnl_percentage,
                exit_time.to_rfc3339(),
                exit_reason.as_str(),
                id,
            ],
        )
        .context("closing paper trade")?;

        self.get_trade_locked(&conn, id)
    }

    fn get_trade_locked(&self, conn: &rusqlite::Connection, id: i64) -> Result<PaperTrade> {
        conn.query_row("SELECT * FROM paper_trades WHERE id = ?1", params![id], row_to_trade)
            .context("re-fetching closed trade")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_then_close_computes_pnl() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .open_paper_trade("0xtok", Chain::Base, StrategyName::CopyTrade, "0xwal", 1.0, 100.0, Utc::now())
            .unwrap();

        let closed = store.close_paper_trade(id, 1.5, ExitReason::TakeProfit, Utc::now()).unwrap();
        assert_eq!(closed.status, TradeStatus::Closed);
        assert_eq!(closed.pnl, Some(50.0));
    }

    #[test]
    fn closing_an_already_closed_trade_is_refused() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .open_paper_trade("0xtok", Chain::Base, StrategyName::CopyTrade, "0xwal", 1.0, 100.0, Utc::now())
            .unwrap();
        store.close_paper_trade(id, 1.5, ExitReason::TakeProfit, Utc::now()).unwrap();

        let result = store.close_paper_trade(id, 2.0, ExitReason::TakeProfit, Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn zero_exit_price_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .open_paper_trade("0xtok", Chain::Base, StrategyName::CopyTrade, "0xwal", 1.0, 100.0, Utc::now())
            .unwrap();
        assert!(store.close_paper_trade(id, 0.0, ExitReason::StopLoss, Utc::now()).is_err());
    }

    #[test]
    fn tier_note_appended_once() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .open_paper_trade("0xtok", Chain::Base, StrategyName::CopyTrade, "0xwal", 1.0, 100.0, Utc::now())
            .unwrap();
        store.append_trade_note(id, "tier_2").unwrap();
        store.append_trade_note(id, "tier_2").unwrap();

        let trade = store.get_trade(id).unwrap().unwrap();
        assert_eq!(trade.notes, "tier_2");
    }

    #[test]
    fn list_closed_trades_filters_by_strategy() {
        let store = Store::open_in_memory().unwrap();
        let copy_id = store
            .open_paper_trade("0xtok", Chain::Base, StrategyName::CopyTrade, "0xwal", 1.0, 100.0, Utc::now())
            .unwrap();
        let arb_id = store
            .open_paper_trade("0xtok2", Chain::Base, StrategyName::Arbitrage, "0xwal", 1.0, 50.0, Utc::now())
            .unwrap();
        store.close_paper_trade(copy_id, 1.2, ExitReason::TakeProfit, Utc::now()).unwrap();
        store.close_paper_trade(arb_id, 0.9, ExitReason::StopLoss, Utc::now()).unwrap();

        let copy_only = store.list_closed_trades(None, Some(StrategyName::CopyTrade), None).unwrap();
        assert_eq!(copy_only.len(), 1);
        assert_eq!(copy_only[0].id, copy_id);
    }
}
