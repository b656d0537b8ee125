//! Durable storage for accounts, the operation ledger, cached voices and
//! generated audio.
//!
//! A single [`Database`] handle is opened by the process and passed into each
//! SQLite-backed store at construction time. Stores hold the connection lock
//! only for the statements they run and never across an `.await`.
//!
//! Tables:
//! - `accounts`: identity, password verifier, plan, credit counters, flags
//! - `operations`: one immutable row per completed billable operation
//! - `voices`: provider voices cloned by an account

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;

pub mod accounts;
pub mod artifacts;
pub mod history;
pub mod voices;

pub use accounts::{
    Account, AccountPurge, AccountStore, AccountUpdate, NewAccount, Plan, SqliteAccountStore,
    normalize_identity,
};
pub use artifacts::{ArtifactRef, ArtifactStore, FsArtifactStore, is_valid_artifact_id};
pub use history::{
    DailyCount, HistoryPage, HistoryStats, HistoryStore, InvalidPage, KindTotals, LedgerTotals,
    NewOperationRecord, OperationDetail, OperationKind, OperationRecord, PageRequest,
    SqliteHistoryStore,
};
pub use voices::{SqliteVoiceStore, StoredVoice, VoiceStore};

/// Errors raised by the storage layer
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Conflict(String),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid artifact id: {0}")]
    InvalidArtifactId(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    avatar_url TEXT,
    plan TEXT NOT NULL,
    credits_used INTEGER NOT NULL DEFAULT 0 CHECK (credits_used >= 0),
    credits_limit INTEGER NOT NULL CHECK (credits_limit > 0),
    is_active INTEGER NOT NULL DEFAULT 1,
    email_verified INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    last_login_at INTEGER
);

CREATE TABLE IF NOT EXISTS operations (
    id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    cost INTEGER NOT NULL CHECK (cost >= 0),
    artifact TEXT NOT NULL,
    detail TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_operations_account ON operations(account_id, created_at);
CREATE INDEX IF NOT EXISTS idx_operations_created ON operations(created_at);

CREATE TABLE IF NOT EXISTS voices (
    voice_id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    description TEXT,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_voices_account ON voices(account_id);
";

/// Shared handle to the SQLite database.
///
/// Cloning is cheap; all clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at the given path and apply the schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads + crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        Self::with_schema(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Clamp an unsigned counter into SQLite's signed integer range.
pub(crate) fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(crate) fn from_sql_int(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
