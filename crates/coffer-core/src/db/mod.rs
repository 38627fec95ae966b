//! SQLite store with connection pooling and migrations
//!
//! This module is organized by store:
//! - `transactions` - Classified transactions with hash deduplication
//! - `corrections` - Append-only correction log
//! - `profiles` - Tax profiles and tax snapshots
//!
//! Rows that carry nested domain values (classifications, correction records,
//! profiles, snapshots) keep them as JSON text next to the indexed columns.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod corrections;
mod profiles;
mod transactions;


pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) a database file and run migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` so every pooled connection
    /// sees the same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "coffer_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        let path = path
            .to_str()
            .ok_or_else(|| Error::Store("temp dir path is not valid UTF-8".to_string()))?
            .to_string();
        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- WAL mode: readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Classified transactions, deduplicated per user by content hash
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                hash TEXT NOT NULL UNIQUE,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                merchant_name TEXT,
                amount REAL NOT NULL,
                transaction_type TEXT NOT NULL,
                external_categories TEXT NOT NULL DEFAULT '[]',
                classification TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_transactions_user_date
                ON transactions(user_id, date);

            -- Append-only correction log
            CREATE TABLE IF NOT EXISTS corrections (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                correction_type TEXT NOT NULL,
                record TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_corrections_user
                ON corrections(user_id, id);

            -- One tax profile per user
            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                country TEXT NOT NULL,
                profile TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Tax snapshots; history is kept
            CREATE TABLE IF NOT EXISTS snapshots (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                period TEXT NOT NULL,
                calculated_at TEXT NOT NULL,
                total_tax_owed REAL NOT NULL,
                snapshot TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_snapshots_user_time
                ON snapshots(user_id, calculated_at);
            "#,
        )?;

        info!("Database migrations complete: {}", self.db_path);
        Ok(())
    }
}
