use super::Store;
use crate::domain::{Chain, Token};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_token(row: &Row) -> rusqlite::Result<Token> {
    let chain_str: String = row.get("chain")?;
    let first_seen: String = row.get("first_seen")?;
    let creation_time: Option<String> = row.get("creation_time")?;
    let last_updated: String = row.get("last_updated")?;

    Ok(Token {
        address: row.get("address")?,
        chain: Chain::from_str_loose(&chain_str).unwrap_or(Chain::Ethereum),
        symbol: row.get("symbol")?,
        decimals: row.get("decimals")?,
        first_seen: first_seen.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
        creation_time: creation_time.and_then(|s| s.parse::<DateTime<Utc>>().ok()),
        current_price_usd: row.get("current_price_usd")?,
        max_price_usd: row.get("max_price_usd")?,
        market_cap_usd: row.get("market_cap_usd")?,
        last_updated: last_updated.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
    })
}

impl Store {
    /// Inserts the token if new, otherwise updates `current_price_usd` and
    /// raises `max_price_usd` via `MAX(existing, new)` — the atomic peak
    /// update pump detection (§4.8) depends on. A zero price never lowers the
    /// recorded peak.
    pub fn add_or_update_token(
        &self,
        address: &str,
        chain: Chain,
        symbol: &str,
        decimals: u8,
        current_price_usd: f64,
        market_cap_usd: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tokens (
                address, chain, symbol, decimals, first_seen, current_price_usd,
                max_price_usd, market_cap_usd, last_updated
            ) VALUES (?1,?2,?3,?4,?5,?6,?6,?7,?5)
            ON CONFLICT(address, chain) DO UPDATE SET
                current_price_usd = excluded.current_price_usd,
                max_price_usd = MAX(tokens.max_price_usd, excluded.current_price_usd),
                market_cap_usd = excluded.market_cap_usd,
                last_updated = excluded.last_updated",
            params![
                address,
                chain.as_str(),
                symbol,
                decimals,
                now.to_rfc3339(),
                current_price_usd,
                market_cap_usd,
            ],
        )
        .context("upserting token with atomic peak")?;
        Ok(())
    }

    pub fn get_token(&self, address: &str, chain: Chain) -> Result<Option<Token>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM tokens WHERE address = ?1 AND chain = ?2",
            params![address, chain.as_str()],
            row_to_token,
        )
        .optional()
        .context("fetching token")
    }

    /// Pump candidates for Discovery step 1 (§4.8): tokens first seen within
    /// `timeframe` of `now` whose peak has run up at least `threshold`x over
    /// the current price.
    pub fn pump_candidates(
        &self,
        now: DateTime<Utc>,
        timeframe: chrono::Duration,
        threshold: f64,
    ) -> Result<Vec<Token>> {
        let conn = self.conn.lock().unwrap();
        let cutoff = (now - timeframe).to_rfc3339();
        let mut stmt = conn.prepare(
            "SELECT * FROM tokens
             WHERE first_seen >= ?1 AND current_price_usd > 0
             AND max_price_usd / current_price_usd >= ?2
             ORDER BY max_price_usd / current_price_usd DESC",
        )?;
        let rows = stmt.query_map(params![cutoff, threshold], row_to_token)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("querying pump candidates")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_price_never_drops_on_a_lower_update() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store.add_or_update_token("0xtoken", Chain::Base, "TOK", 18, 10.0, None, now).unwrap();
        store.add_or_update_token("0xtoken", Chain::Base, "TOK", 18, 2.0, None, now).unwrap();

        let token = store.get_token("0xtoken", Chain::Base).unwrap().unwrap();
        assert_eq!(token.max_price_usd, 10.0);
        assert_eq!(token.current_price_usd, 2.0);
    }

    #[test]
    fn pump_candidates_filters_by_threshold() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store.add_or_update_token("0xpump", Chain::Base, "PUMP", 18, 10.0, None, now).unwrap();
        store.add_or_update_token("0xpump", Chain::Base, "PUMP", 18, 2.0, None, now).unwrap();
        store.add_or_update_token("0xflat", Chain::Base, "FLAT", 18, 5.0, None, now).unwrap();

        let candidates = store.pump_candidates(now, chrono::Duration::days(10), 2.5).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].address, "0xpump");
    }
}
