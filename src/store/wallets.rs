use super::Store;
use crate::domain::{Chain, StrategyName, Wallet, WalletStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_wallet(row: &Row) -> rusqlite::Result<Wallet> {
    let chain_str: String = row.get("chain")?;
    let strategy_str: String = row.get("strategy_type")?;
    let status_str: String = row.get("status")?;
    let date_added: String = row.get("date_added")?;
    let last_checked: Option<String> = row.get("last_checked")?;

    Ok(Wallet {
        address: row.get("address")?,
        chain: Chain::from_str_loose(&chain_str).unwrap_or(Chain::Ethereum),
        strategy_type: StrategyName::from_str_loose(&strategy_str).unwrap_or(StrategyName::CopyTrade),
        win_rate: row.get("win_rate")?,
        total_trades: row.get("total_trades")?,
        successful_trades: row.get("successful_trades")?,
        total_pnl_usd: row.get("total_pnl_usd")?,
        avg_trade_size_usd: row.get("avg_trade_size_usd")?,
        biggest_win_usd: row.get("biggest_win_usd")?,
        biggest_loss_usd: row.get("biggest_loss_usd")?,
        status: WalletStatus::from_str_loose(&status_str).unwrap_or(WalletStatus::Active),
        date_added: date_added.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
        last_checked: last_checked.and_then(|s| s.parse::<DateTime<Utc>>().ok()),
        notes: row.get("notes")?,
    })
}

impl Store {
    /// Insert or fully replace a wallet row, keyed by `(address, chain)`.
    pub fn upsert_wallet(&self, wallet: &Wallet) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO wallets (
                address, chain, strategy_type, win_rate, total_trades, successful_trades,
                total_pnl_usd, avg_trade_size_usd, biggest_win_usd, biggest_loss_usd,
                status, date_added, last_checked, notes
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)
            ON CONFLICT(address, chain) DO UPDATE SET
                strategy_type = excluded.strategy_type,
                win_rate = excluded.win_rate,
                total_trades = excluded.total_trades,
                successful_trades = excluded.successful_trades,
                total_pnl_usd = excluded.total_pnl_usd,
                avg_trade_size_usd = excluded.avg_trade_size_usd,
                biggest_win_usd = excluded.biggest_win_usd,
                biggest_loss_usd = excluded.biggest_loss_usd,
                status = excluded.status,
                last_checked = excluded.last_checked,
                notes = excluded.notes",
            params![
                wallet.address,
                wallet.chain.as_str(),
                wallet.strategy_type.as_str(),
                wallet.win_rate,
                wallet.total_trades,
                wallet.successful_trades,
                wallet.total_pnl_usd,
                wallet.avg_trade_size_usd,
                wallet.biggest_win_usd,
                wallet.biggest_loss_usd,
                wallet.status.as_str(),
                wallet.date_added.to_rfc3339(),
                wallet.last_checked.map(|t| t.to_rfc3339()),
                wallet.notes,
            ],
        )
        .context("upserting wallet")?;
        Ok(())
    }

    pub fn get_wallet(&self, address: &str, chain: Chain) -> Result<Option<Wallet>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM wallets WHERE address = ?1 AND chain = ?2",
            params![address, chain.as_str()],
            row_to_wallet,
        )
        .optional()
        .context("fetching wallet")
    }

    pub fn list_wallets(&self) -> Result<Vec<Wallet>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM wallets ORDER BY date_added")?;
        let rows = stmt.query_map([], row_to_wallet)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("listing wallets")
    }

    pub fn list_active_wallets(&self) -> Result<Vec<Wallet>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM wallets WHERE status = 'active' ORDER BY address")?;
        let rows = stmt.query_map([], row_to_wallet)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("listing active wallets")
    }

    pub fn set_wallet_status(&self, address: &str, chain: Chain, status: WalletStatus) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE wallets SET status = ?1 WHERE address = ?2 AND chain = ?3",
            params![status.as_str(), address, chain.as_str()],
        )
        .context("updating wallet status")?;
        Ok(())
    }

    pub fn touch_wallet_checked(&self, address: &str, chain: Chain, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE wallets SET last_checked = ?1 WHERE address = ?2 AND chain = ?3",
            params![at.to_rfc3339(), address, chain.as_str()],
        )
        .context("touching wallet last_checked")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_get_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let wallet = Wallet::new("0xabc".to_string(), Chain::Base, StrategyName::CopyTrade);
        store.upsert_wallet(&wallet).unwrap();

        let fetched = store.get_wallet("0xabc", Chain::Base).unwrap().unwrap();
        assert_eq!(fetched.address, "0xabc");
        assert_eq!(fetched.status, WalletStatus::Active);
    }

    #[test]
    fn upsert_is_an_update_on_conflict() {
        let store = Store::open_in_memory().unwrap();
        let mut wallet = Wallet::new("0xabc".to_string(), Chain::Base, StrategyName::CopyTrade);
        store.upsert_wallet(&wallet).unwrap();

        wallet.total_trades = 5;
        wallet.successful_trades = 3;
        store.upsert_wallet(&wallet).unwrap();

        let fetched = store.get_wallet("0xabc", Chain::Base).unwrap().unwrap();
        assert_eq!(fetched.total_trades, 5);
        assert_eq!(store.list_wallets().unwrap().len(), 1);
    }

    #[test]
    fn paused_wallet_excluded_from_active_list() {
        let store = Store::open_in_memory().unwrap();
        let wallet = Wallet::new("0xabc".to_string(), Chain::Base, StrategyName::CopyTrade);
        store.upsert_wallet(&wallet).unwrap();
        store.set_wallet_status("0xabc", Chain::Base, WalletStatus::Paused).unwrap();

        assert!(store.list_active_wallets().unwrap().is_empty());
    }
}
