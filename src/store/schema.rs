//! Idempotent schema migration. `CREATE TABLE IF NOT EXISTS` for new
//! installs, `PRAGMA table_info` probes to add columns a prior version might
//! be missing, so an existing database is never destroyed (§3, §4.1).

use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn migrate(conn: &Connection) -> Result<()> {
    create_wallets_table(conn)?;
    create_transfers_table(conn)?;
    create_tokens_table(conn)?;
    create_paper_trades_table(conn)?;
    create_discovered_wallets_table(conn)?;
    create_strategy_performance_table(conn)?;
    create_system_state_table(conn)?;
    create_indexes(conn)?;
    add_missing_columns(conn)?;
    Ok(())
}

fn create_wallets_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS wallets (
            address TEXT NOT NULL,
            chain TEXT NOT NULL,
            strategy_type TEXT NOT NULL,
            win_rate REAL,
            total_trades INTEGER NOT NULL DEFAULT 0,
            successful_trades INTEGER NOT NULL DEFAULT 0,
            total_pnl_usd REAL NOT NULL DEFAULT 0,
            avg_trade_size_usd REAL NOT NULL DEFAULT 0,
            biggest_win_usd REAL NOT NULL DEFAULT 0,
            biggest_loss_usd REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            date_added TEXT NOT NULL,
            last_checked TEXT,
            notes TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (address, chain)
        )",
        [],
    )
    .context("creating wallets table")?;
    Ok(())
}

fn create_transfers_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transfers (
            wallet_address TEXT NOT NULL,
            chain TEXT NOT NULL,
            tx_hash TEXT NOT NULL,
            token_address TEXT NOT NULL,
            token_symbol TEXT NOT NULL,
            action TEXT NOT NULL,
            amount REAL NOT NULL,
            price_usd REAL NOT NULL,
            total_value_usd REAL NOT NULL,
            timestamp TEXT NOT NULL,
            block_number INTEGER,
            PRIMARY KEY (wallet_address, chain, tx_hash)
        )",
        [],
    )
    .context("creating transfers table")?;
    Ok(())
}

fn create_tokens_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tokens (
            address TEXT NOT NULL,
            chain TEXT NOT NULL,
            symbol TEXT NOT NULL,
            decimals INTEGER NOT NULL,
            first_seen TEXT NOT NULL,
            creation_time TEXT,
            current_price_usd REAL NOT NULL DEFAULT 0,
            max_price_usd REAL NOT NULL DEFAULT 0,
            market_cap_usd REAL,
            last_updated TEXT NOT NULL,
            PRIMARY KEY (address, chain)
        )",
        [],
    )
    .context("creating tokens table")?;
    Ok(())
}

fn create_paper_trades_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS paper_trades (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            token_address TEXT NOT NULL,
            chain TEXT NOT NULL,
            strategy_used TEXT NOT NULL,
            source_wallet TEXT NOT NULL,
            entry_price REAL NOT NULL,
            amount REAL NOT NULL,
            entry_value_usd REAL NOT NULL,
            peak_price REAL NOT NULL,
            status TEXT NOT NULL,
            opened_at TEXT NOT NULL,
            exit_price REAL,
            exit_value_usd REAL,
            pnl REAL,
            pnl_percentage REAL,
            exit_time TEXT,
            exit_reason TEXT,
            notes TEXT NOT NULL DEFAULT ''
        )",
        [],
    )
    .context("creating paper_trades table")?;
    Ok(())
}

fn create_discovered_wallets_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS discovered_wallets (
            address TEXT NOT NULL,
            chain TEXT NOT NULL,
            first_seen TEXT NOT NULL,
            profitability_score REAL NOT NULL,
            estimated_win_rate REAL NOT NULL,
            tracked_trades INTEGER NOT NULL,
            successful_tracked_trades INTEGER NOT NULL,
            promoted INTEGER NOT NULL DEFAULT 0,
            promoted_date TEXT,
            discovery_method TEXT NOT NULL,
            rejection_reason TEXT,
            PRIMARY KEY (address, chain)
        )",
        [],
    )
    .context("creating discovered_wallets table")?;
    Ok(())
}

fn create_strategy_performance_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS strategy_performance (
            strategy_type TEXT NOT NULL,
            date TEXT NOT NULL,
            trades_opened INTEGER NOT NULL DEFAULT 0,
            trades_closed INTEGER NOT NULL DEFAULT 0,
            wins INTEGER NOT NULL DEFAULT 0,
            losses INTEGER NOT NULL DEFAULT 0,
            realised_pnl_usd REAL NOT NULL DEFAULT 0,
            PRIMARY KEY (strategy_type, date)
        )",
        [],
    )
    .context("creating strategy_performance table")?;
    Ok(())
}

fn create_system_state_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS system_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .context("creating system_state table")?;
    Ok(())
}

fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute("CREATE INDEX IF NOT EXISTS idx_transfers_token ON transfers(token_address, chain)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_transfers_timestamp ON transfers(timestamp)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_transfers_wallet ON transfers(wallet_address, chain)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_tokens_first_seen ON tokens(first_seen)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_paper_trades_status ON paper_trades(status)", [])?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_paper_trades_strategy ON paper_trades(strategy_used, opened_at)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_discovered_promoted ON discovered_wallets(promoted)",
        [],
    )?;
    Ok(())
}

/// Adds columns a database created by an earlier version of the schema might
/// be missing, without touching existing data. `peak_price` and `notes` are
/// the two fields most likely to be absent from a pre-partial-exit schema.
fn add_missing_columns(conn: &Connection) -> Result<()> {
    add_column_if_missing(conn, "paper_trades", "peak_price", "REAL NOT NULL DEFAULT 0")?;
    add_column_if_missing(conn, "paper_trades", "notes", "TEXT NOT NULL DEFAULT ''")?;
    add_column_if_missing(conn, "wallets", "notes", "TEXT NOT NULL DEFAULT ''")?;
    Ok(())
}

fn add_column_if_missing(conn: &Connection, table: &str, column: &str, ddl_type: &str) -> Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let existing: Vec<String> =
        stmt.query_map([], |row| row.get::<_, String>(1))?.filter_map(|r| r.ok()).collect();

    if !existing.iter().any(|c| c == column) {
        conn.execute(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, ddl_type), [])
            .with_context(|| format!("adding column {}.{}", table, column))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_twice_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type='table'", [], |r| r.get(0))
            .unwrap();
        assert!(count >= 7);
    }

    #[test]
    fn missing_column_is_added_without_destroying_data() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE paper_trades (id INTEGER PRIMARY KEY, token_address TEXT)",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO paper_trades (id, token_address) VALUES (1, 'abc')", []).unwrap();

        add_column_if_missing(&conn, "paper_trades", "peak_price", "REAL NOT NULL DEFAULT 0").unwrap();

        let token: String =
            conn.query_row("SELECT token_address FROM paper_trades WHERE id=1", [], |r| r.get(0)).unwrap();
        assert_eq!(token, "abc");
    }
}
