use super::Store;
use crate::domain::{Chain, DiscoveredWallet};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_discovered(row: &Row) -> rusqlite::Result<DiscoveredWallet> {
    let chain_str: String = row.get("chain")?;
    let first_seen: String = row.get("first_seen")?;
    let promoted_date: Option<String> = row.get("promoted_date")?;

    Ok(DiscoveredWallet {
        address: row.get("address")?,
        chain: Chain::from_str_loose(&chain_str).unwrap_or(Chain::Ethereum),
        first_seen: first_seen.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
        profitability_score: row.get("profitability_score")?,
        estimated_win_rate: row.get("estimated_win_rate")?,
        tracked_trades: row.get("tracked_trades")?,
        successful_tracked_trades: row.get("successful_tracked_trades")?,
        promoted: row.get::<_, i64>("promoted")? != 0,
        promoted_date: promoted_date.and_then(|s| s.parse::<DateTime<Utc>>().ok()),
        discovery_method: row.get("discovery_method")?,
        rejection_reason: row.get("rejection_reason")?,
    })
}

impl Store {
    pub fn insert_discovered_wallet(&self, candidate: &DiscoveredWallet) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO discovered_wallets (
                address, chain, first_seen, profitability_score, estimated_win_rate,
                tracked_trades, successful_tracked_trades, promoted, promoted_date,
                discovery_method, rejection_reason
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)
            ON CONFLICT(address, chain) DO UPDATE SET
                profitability_score = excluded.profitability_score,
                estimated_win_rate = excluded.estimated_win_rate,
                tracked_trades = excluded.tracked_trades,
                successful_tracked_trades = excluded.successful_tracked_trades,
                discovery_method = excluded.discovery_method",
            params![
                candidate.address,
                candidate.chain.as_str(),
                candidate.first_seen.to_rfc3339(),
                candidate.profitability_score,
                candidate.estimated_win_rate,
                candidate.tracked_trades,
                candidate.successful_tracked_trades,
                candidate.promoted as i64,
                candidate.promoted_date.map(|t| t.to_rfc3339()),
                candidate.discovery_method,
                candidate.rejection_reason,
            ],
        )
        .context("inserting discovered wallet")?;
        Ok(())
    }

    pub fn list_discovered_wallets(&self, promoted: Option<bool>) -> Result<Vec<DiscoveredWallet>> {
        let conn = self.conn.lock().unwrap();
        let sql = match promoted {
            Some(true) => "SELECT * FROM discovered_wallets WHERE promoted = 1 ORDER BY profitability_score DESC",
            Some(false) => "SELECT * FROM discovered_wallets WHERE promoted = 0 ORDER BY profitability_score DESC",
            None => "SELECT * FROM discovered_wallets ORDER BY profitability_score DESC",
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], row_to_discovered)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("listing discovered wallets")
    }

    pub fn is_wallet_already_tracked(&self, address: &str, chain: Chain) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM wallets WHERE address = ?1 AND chain = ?2",
                params![address, chain.as_str()],
                |row| row.get(0),
            )
            .context("checking wallet tracking status")?;
        Ok(count > 0)
    }

    /// Materialises a DiscoveredWallet into a Wallet row and flips
    /// `promoted` (§3, §4.8: promotion is a separate operator action).
    pub fn promote_discovered_wallet(&self, address: &str, chain: Chain, now: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE discovered_wallets SET promoted = 1, promoted_date = ?1 WHERE address = ?2 AND chain = ?3",
            params![now.to_rfc3339(), address, chain.as_str()],
        )
        .context("flipping promoted flag")?;
        Ok(())
    }

    pub fn get_discovered_wallet(&self, address: &str, chain: Chain) -> Result<Option<DiscoveredWallet>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM discovered_wallets WHERE address = ?1 AND chain = ?2",
            params![address, chain.as_str()],
            row_to_discovered,
        )
        .optional()
        .context("fetching discovered wallet")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(address: &str) -> DiscoveredWallet {
        DiscoveredWallet {
            address: address.to_string(),
            chain: Chain::Base,
            first_seen: Utc::now(),
            profitability_score: 80.0,
            estimated_win_rate: 0.6,
            tracked_trades: 20,
            successful_tracked_trades: 12,
            promoted: false,
            promoted_date: None,
            discovery_method: "pump_scan".to_string(),
            rejection_reason: None,
        }
    }

    #[test]
    fn promotion_flips_the_flag() {
        let store = Store::open_in_memory().unwrap();
        store.insert_discovered_wallet(&sample("0xcand")).unwrap();
        store.promote_discovered_wallet("0xcand", Chain::Base, Utc::now()).unwrap();

        let fetched = store.get_discovered_wallet("0xcand", Chain::Base).unwrap().unwrap();
        assert!(fetched.promoted);
        assert!(fetched.promoted_date.is_some());
    }

    #[test]
    fn not_yet_tracked_wallet_reports_false() {
        let store = Store::open_in_memory().unwrap();
        assert!(!store.is_wallet_already_tracked("0xnew", Chain::Base).unwrap());
    }
}
