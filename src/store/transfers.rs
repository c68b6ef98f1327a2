use super::Store;
use crate::domain::{Action, Chain, Transfer};
use crate::errors::StoreOutcome;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

fn row_to_transfer(row: &Row) -> rusqlite::Result<Transfer> {
    let chain_str: String = row.get("chain")?;
    let action_str: String = row.get("action")?;
    let timestamp: String = row.get("timestamp")?;

    Ok(Transfer {
        wallet_address: row.get("wallet_address")?,
        chain: Chain::from_str_loose(&chain_str).unwrap_or(Chain::Ethereum),
        tx_hash: row.get("tx_hash")?,
        token_address: row.get("token_address")?,
        token_symbol: row.get("token_symbol")?,
        action: if action_str == "buy" { Action::Buy } else { Action::Sell },
        amount: row.get("amount")?,
        price_usd: row.get("price_usd")?,
        total_value_usd: row.get("total_value_usd")?,
        timestamp: timestamp.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
        block_number: row.get::<_, Option<i64>>("block_number")?.map(|b| b as u64),
    })
}

impl Store {
    /// Idempotent on `(wallet_address, chain, tx_hash)`: a duplicate insert is
    /// a no-op, not an error (§3 idempotence invariant, §7 business-rule
    /// rejection).
    pub fn add_transfer(&self, transfer: &Transfer) -> Result<StoreOutcome> {
        if transfer.tx_hash.is_empty() || transfer.wallet_address.is_empty() {
            return Ok(StoreOutcome::Rejected("missing wallet_address or tx_hash".to_string()));
        }
        if transfer.amount < 0.0 || transfer.price_usd < 0.0 || transfer.total_value_usd < 0.0 {
            return Ok(StoreOutcome::Rejected("negative amount/price/value".to_string()));
        }

        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO transfers (
                    wallet_address, chain, tx_hash, token_address, token_symbol,
                    action, amount, price_usd, total_value_usd, timestamp, block_number
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
                params![
                    transfer.wallet_address,
                    transfer.chain.as_str(),
                    transfer.tx_hash,
                    transfer.token_address,
                    transfer.token_symbol,
                    transfer.action.as_str(),
                    transfer.amount,
                    transfer.price_usd,
                    transfer.total_value_usd,
                    transfer.timestamp.to_rfc3339(),
                    transfer.block_number.map(|b| b as i64),
                ],
            )
            .context("inserting transfer")?;

        if changed == 0 {
            Ok(StoreOutcome::Rejected("duplicate (wallet, chain, tx_hash)".to_string()))
        } else {
            Ok(StoreOutcome::Applied)
        }
    }

    pub fn transfers_for_wallet(&self, address: &str, chain: Chain, since: DateTime<Utc>) -> Result<Vec<Transfer>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM transfers WHERE wallet_address = ?1 AND chain = ?2 AND timestamp >= ?3
             ORDER BY timestamp",
        )?;
        let rows = stmt.query_map(params![address, chain.as_str(), since.to_rfc3339()], row_to_transfer)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("listing transfers for wallet")
    }

    pub fn transfers_for_token(&self, token_address: &str, chain: Chain, since: DateTime<Utc>) -> Result<Vec<Transfer>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM transfers WHERE token_address = ?1 AND chain = ?2 AND timestamp >= ?3
             ORDER BY timestamp",
        )?;
        let rows = stmt.query_map(params![token_address, chain.as_str(), since.to_rfc3339()], row_to_transfer)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("listing transfers for token")
    }

    pub fn all_transfers_for_wallet(&self, address: &str, chain: Chain) -> Result<Vec<Transfer>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM transfers WHERE wallet_address = ?1 AND chain = ?2 ORDER BY timestamp",
        )?;
        let rows = stmt.query_map(params![address, chain.as_str()], row_to_transfer)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("listing all transfers for wallet")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tx_hash: &str) -> Transfer {
        Transfer {
            wallet_address: "0xabc".to_string(),
            chain: Chain::Base,
            tx_hash: tx_hash.to_string(),
            token_address: "0xtoken".to_string(),
            token_symbol: "TOK".to_string(),
            action: Action::Buy,
            amount: 100.0,
            price_usd: 1.5,
            total_value_usd: 150.0,
            timestamp: Utc::now(),
            block_number: Some(123),
        }
    }

    #[test]
    fn duplicate_insert_is_a_rejected_no_op() {
        let store = Store::open_in_memory().unwrap();
        let transfer = sample("0xhash1");

        assert_eq!(store.add_transfer(&transfer).unwrap(), StoreOutcome::Applied);
        assert_eq!(
            store.add_transfer(&transfer).unwrap(),
            StoreOutcome::Rejected("duplicate (wallet, chain, tx_hash)".to_string())
        );

        let rows = store.all_transfers_for_wallet("0xabc", Chain::Base).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn missing_tx_hash_is_rejected_not_an_error() {
        let store = Store::open_in_memory().unwrap();
        let mut transfer = sample("");
        transfer.tx_hash = String::new();
        let outcome = store.add_transfer(&transfer).unwrap();
        assert!(matches!(outcome, StoreOutcome::Rejected(_)));
    }
}
