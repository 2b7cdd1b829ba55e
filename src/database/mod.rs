//! SQLite persistence for users, listings and the deal ledger
//!
//! A single [`Database`] owns the connection behind a mutex; every logical
//! ledger operation (reserve, refund, credit) runs as one transaction while
//! the lock is held, so concurrent handlers can never interleave a stale
//! read with a write.
//!
//! ```text
//! database/
//! ├── mod.rs       # connection + schema
//! ├── models.rs    # row types
//! ├── users.rs     # user records + balance ledger + VIP grants
//! ├── listings.rs  # currency pairs and listings
//! └── deals.rs     # deal workflow: create / confirm / decline
//! ```

pub mod deals;
pub mod listings;
pub mod models;
pub mod users;

pub use models::{
    DatabaseResult, Deal, DealKind, DealStatus, DecisionOutcome, Listing, Pair, RecipientKind,
    User,
};

use anyhow::Result;
use rusqlite::Connection;
use std::sync::Mutex;

pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory database for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Cascade from p2p_pairs to p2p_listings relies on this pragma
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create all tables and indexes if they do not exist
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                username TEXT,
                full_name TEXT NOT NULL,
                ton_wallet TEXT,
                card_number TEXT,
                language TEXT NOT NULL DEFAULT 'ru',
                balance TEXT NOT NULL DEFAULT '0',
                deals_count INTEGER NOT NULL DEFAULT 0,
                ref_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_users_ton_wallet ON users(ton_wallet);
            CREATE INDEX IF NOT EXISTS idx_users_card_number ON users(card_number);

            CREATE TABLE IF NOT EXISTS p2p_pairs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL
            );

            CREATE TABLE IF NOT EXISTS p2p_listings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pair_id INTEGER NOT NULL,
                nickname TEXT NOT NULL,
                price TEXT NOT NULL,
                "limit" TEXT NOT NULL,
                action TEXT NOT NULL,
                FOREIGN KEY (pair_id) REFERENCES p2p_pairs (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS deals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                sender_id INTEGER NOT NULL,
                recipient_address TEXT,
                recipient_type TEXT,
                amount TEXT NOT NULL,
                currency TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS balance_grants (
                user_id INTEGER PRIMARY KEY,
                expires_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}
