//! Database access layer with connection pooling and schema setup
//!
//! This module is organized by domain:
//! - `users` - Credential store (usernames and Argon2 password hashes)
//! - `categories` - Per-user categories, default seeding, reassign-then-delete
//! - `invoices` - Uploaded invoice metadata
//! - `spendings` - Extracted line items, month queries, category reassignment
//!
//! Every method checks a connection out of the pool for the duration of the
//! call; the `PooledConnection` guard hands it back on drop, on every exit path.

use chrono::{DateTime, SubsecRound, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OptionalExtension;
use tracing::info;

use crate::error::{Error, Result};

mod categories;
mod invoices;
mod spendings;
mod users;


pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "KREDIT_DB_KEY";

/// Storage format for timestamps (matches SQLite's CURRENT_TIMESTAMP)
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Fixed application salt - changing this would invalidate all existing encrypted databases
    const APP_SALT: &[u8; 16] = b"kredit-salt-v1-x";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a stored datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Format a timestamp the way `parse_datetime` reads it back
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Current time at the storage precision (whole seconds), so values handed
/// back to callers compare equal to what a later read returns
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
    /// Opened with a SQLCipher key
    keyed: bool,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `KREDIT_DB_KEY` environment variable to be set.
    /// Returns an error if it is not set. Use `new_unencrypted()`
    /// for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    ///
    /// The schema is created before this returns, so a `Database` handed to the
    /// server is always ready to serve.
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let key_pragma = match passphrase {
            Some(pass) => Some(format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?)),
            None => None,
        };

        // Per-connection setup: key first, then foreign key enforcement and lock wait
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if let Some(ref pragma) = key_pragma {
                conn.execute_batch(pragma)?;
            }
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            // Writers queue behind an IMMEDIATE transaction instead of failing with BUSY
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(())
        });

        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
            keyed: passphrase.is_some(),
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
    /// Note: Uses a temporary file rather than `:memory:` because each pooled
    /// connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "kredit_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        // Remove any leftover file from an earlier run
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Check if the database is encrypted
    ///
    /// True only when a key was supplied and SQLCipher is active.
    pub fn is_encrypted(&self) -> Result<bool> {
        if !self.keyed {
            return Ok(false);
        }
        let conn = self.conn()?;
        // SQLCipher reports cipher_version when it is linked in
        let version: Option<String> = conn
            .query_row("PRAGMA cipher_version;", [], |row| row.get(0))
            .optional()?;
        Ok(version.is_some_and(|v| !v.is_empty()))
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Create tables and indexes (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the single writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Users (created out-of-band by `kredit users add`)
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Categories (per-user, "Other" is the mandatory fallback)
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE(user_id, name)
            );

            CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);

            -- Invoices (one row per uploaded file, written before extraction)
            CREATE TABLE IF NOT EXISTS invoices (
                id INTEGER PRIMARY KEY,
                filename TEXT NOT NULL,
                upload_date DATETIME NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_invoices_user ON invoices(user_id);

            -- Spendings (extracted line items)
            CREATE TABLE IF NOT EXISTS spendings (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                date DATE NOT NULL,
                amount REAL NOT NULL CHECK (amount >= 0),
                category_id INTEGER REFERENCES categories(id),
                import_date DATETIME NOT NULL,
                invoice_id INTEGER NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_spendings_user_date ON spendings(user_id, date);
            CREATE INDEX IF NOT EXISTS idx_spendings_category ON spendings(category_id);
            CREATE INDEX IF NOT EXISTS idx_spendings_invoice ON spendings(invoice_id);
            "#,
        )?;

        info!(path = %self.db_path, "Database schema ready");
        Ok(())
    }
}
