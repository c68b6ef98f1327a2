//! Durable typed interface over the SQLite schema (§3, §4.1).
//!
//! One `Store` wraps one `Arc<Mutex<Connection>>` so every write path
//! serializes through a single logical writer (§5); reads go through the
//! same mutex since rusqlite does not give us safe concurrent access to one
//! connection, but WAL mode keeps external readers unblocked by our own
//! writes. `Store` is cheap to `Clone` — every clone shares the same
//! connection and mutex — so the Supervisor, TradingEngine and Discovery can
//! each hold their own handle to the one database.

mod discovery;
mod performance;
mod schema;
mod system_state;
mod tokens;
mod trades;
mod transfers;
mod wallets;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (creating if absent) the SQLite file at `path`, enables WAL, and
    /// runs the idempotent migration.
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating database directory {}", parent.display()))?;
            }
        }

        let conn = Connection::open(path).with_context(|| format!("opening database at {}", path))?;
        conn.pragma_update(None, "journal_mode", "WAL").context("enabling WAL journal mode")?;
        conn.pragma_update(None, "foreign_keys", "ON").context("enabling foreign keys")?;

        let store = Store { conn: Arc::new(Mutex::new(conn)) };
        store.migrate().context("running schema migration")?;
        Ok(store)
    }

    /// In-memory store for tests: same schema, no file on disk.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory database")?;
        let store = Store { conn: Arc::new(Mutex::new(conn)) };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        schema::migrate(&conn)
    }
}
