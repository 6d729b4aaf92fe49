// 🗄️ Account & Prediction Store - SQLite via rusqlite
//
// Two tables:
// - accounts              (Account Store)
// - payment_predictions   (Prediction Store, append-only, FK → accounts ON DELETE CASCADE)
//
// Every write runs inside a transaction: it either fully commits or is
// rolled back when the Transaction is dropped without commit.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::entities::{
    format_date, Account, NewAccount, PaymentPrediction, PredictionLabel, PredictionStatus,
    DATE_FORMAT,
};
use crate::error::{ServiceError, ServiceResult};

// ============================================================================
// SHARED HANDLE
// ============================================================================

/// Process-wide handle to the store, cloned into every service
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    /// Longest a write may wait for the connection before it is abandoned
    write_timeout: Option<Duration>,
}

impl Database {
    pub fn new(conn: Connection) -> Self {
        Database {
            conn: Arc::new(Mutex::new(conn)),
            write_timeout: None,
        }
    }

    /// Open by connection string (see `open_database`)
    pub fn open(database_url: &str) -> Result<Self> {
        Ok(Database::new(open_database(database_url)?))
    }

    /// Same store, with writes bounded by `timeout`
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    fn lock(&self) -> ServiceResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ServiceError::unexpected("database connection lock poisoned"))
    }

    /// Run `f` with exclusive access to the connection
    pub fn with_conn<T, F>(&self, f: F) -> ServiceResult<T>
    where
        F: FnOnce(&Connection) -> ServiceResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run a write with exclusive access to the connection
    ///
    /// If the connection could not be acquired within the write timeout,
    /// `f` never runs and nothing is written. Once `f` starts, its outcome
    /// is reported as-is.
    pub fn write<T, F>(&self, f: F) -> ServiceResult<T>
    where
        F: FnOnce(&Connection) -> ServiceResult<T>,
    {
        let started = Instant::now();
        let conn = self.lock()?;

        if let Some(limit) = self.write_timeout {
            let waited = started.elapsed();
            if waited > limit {
                warn!(?waited, ?limit, "write abandoned before it started");
                return Err(ServiceError::unexpected(format!(
                    "store busy: write not started within {:?}",
                    limit
                )));
            }
        }

        f(&conn)
    }
}

// ============================================================================
// CONNECTION
// ============================================================================

/// Open the store selected by a connection string
///
/// Accepted forms: `sqlite://path/to/file.db`, `sqlite:path`, a plain file
/// path, or `:memory:` (also `sqlite::memory:`).
pub fn open_database(database_url: &str) -> Result<Connection> {
    let url = database_url.trim();
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);

    if path.is_empty() {
        bail!("Empty database path in connection string {:?}", database_url);
    }
    if path.contains("://") {
        bail!("Unsupported database connection string: {}", database_url);
    }

    let conn = if path == ":memory:" {
        Connection::open_in_memory().context("Failed to open in-memory database")?
    } else {
        Connection::open(path).with_context(|| format!("Failed to open database: {}", path))?
    };

    setup_database(&conn).context("Failed to create tables")?;
    info!(database = %path, "database ready");

    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery; referential integrity for cascade deletes
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Accounts Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            value REAL NOT NULL,
            due_date TEXT NOT NULL,
            paid INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Payment Predictions Table (append-only log)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS payment_predictions (
            id TEXT PRIMARY KEY NOT NULL,
            account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            prediction TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            predicted_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_predictions_account ON payment_predictions(account_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_created ON accounts(created_at)",
        [],
    )?;

    Ok(())
}

/// Read accounts from a CSV with `name,value,due_date[,paid]` columns
///
/// Each row gets a fresh UUID; invalid rows abort the whole load.
pub fn load_accounts_csv(csv_path: &Path) -> Result<Vec<Account>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut accounts = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        let row: NewAccount =
            result.with_context(|| format!("Failed to deserialize account row {}", line + 1))?;
        let account = row
            .into_account()
            .with_context(|| format!("Invalid account on row {}", line + 1))?;
        accounts.push(account);
    }

    Ok(accounts)
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn timestamp_to_sql(ts: &DateTime<Utc>) -> String {
    // Fixed width so lexical order matches chronological order
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

#[derive(Debug)]
struct InvalidColumn(String);

impl std::fmt::Display for InvalidColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvalidColumn {}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        value: row.get(2)?,
        due_date: date_column(row, 3)?,
        paid: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

fn prediction_from_row(row: &Row<'_>) -> rusqlite::Result<PaymentPrediction> {
    let label: String = row.get(2)?;
    let status: String = row.get(3)?;

    Ok(PaymentPrediction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        prediction: label
            .parse::<PredictionLabel>()
            .map_err(|e| conversion_error(2, InvalidColumn(e)))?,
        status: status
            .parse::<PredictionStatus>()
            .map_err(|e| conversion_error(3, InvalidColumn(e)))?,
        predicted_at: timestamp_column(row, 4)?,
    })
}

const ACCOUNT_COLUMNS: &str = "id, name, value, due_date, paid, created_at";
const PREDICTION_COLUMNS: &str = "id, account_id, prediction, status, predicted_at";

// ============================================================================
// ACCOUNT STORE
// ============================================================================

fn insert_account_row(conn: &Connection, account: &Account) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO accounts (id, name, value, due_date, paid, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            account.id,
            account.name,
            account.value,
            format_date(&account.due_date),
            account.paid,
            timestamp_to_sql(&account.created_at),
        ],
    )?;
    Ok(())
}

/// Insert a single account
pub fn insert_account(conn: &Connection, account: &Account) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    insert_account_row(&tx, account)?;
    tx.commit()?;

    debug!(account_id = %account.id, "account inserted");
    Ok(())
}

/// Insert a batch of accounts atomically (all or nothing)
pub fn insert_accounts(conn: &Connection, accounts: &[Account]) -> rusqlite::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    for account in accounts {
        insert_account_row(&tx, account)?;
    }
    tx.commit()?;

    Ok(accounts.len())
}

pub fn get_account(conn: &Connection, account_id: &str) -> rusqlite::Result<Option<Account>> {
    conn.query_row(
        &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS),
        params![account_id],
        account_from_row,
    )
    .optional()
}

/// All accounts, oldest first (ties broken by id)
pub fn get_all_accounts(conn: &Connection) -> rusqlite::Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM accounts ORDER BY created_at, id",
        ACCOUNT_COLUMNS
    ))?;

    let accounts = stmt
        .query_map([], account_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(accounts)
}

/// Overwrite the mutable values of an account (id and created_at never change).
/// Returns false if no such account.
pub fn update_account(conn: &Connection, account: &Account) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE accounts SET name = ?1, value = ?2, due_date = ?3, paid = ?4 WHERE id = ?5",
        params![
            account.name,
            account.value,
            format_date(&account.due_date),
            account.paid,
            account.id,
        ],
    )?;

    Ok(changed > 0)
}

/// Delete an account and (by cascade) all of its predictions.
/// Returns false if no such account.
pub fn delete_account(conn: &Connection, account_id: &str) -> rusqlite::Result<bool> {
    let tx = conn.unchecked_transaction()?;
    let deleted = tx.execute("DELETE FROM accounts WHERE id = ?1", params![account_id])?;
    tx.commit()?;

    Ok(deleted > 0)
}

pub fn count_accounts(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))
}

// ============================================================================
// PREDICTION STORE
// ============================================================================

/// Append a prediction to the log
///
/// The account reference is enforced by the foreign key, not re-checked here.
pub fn insert_prediction(conn: &Connection, prediction: &PaymentPrediction) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO payment_predictions (id, account_id, prediction, status, predicted_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            prediction.id,
            prediction.account_id,
            prediction.prediction.as_str(),
            prediction.status.as_str(),
            timestamp_to_sql(&prediction.predicted_at),
        ],
    )?;
    tx.commit()?;

    debug!(
        prediction_id = %prediction.id,
        account_id = %prediction.account_id,
        "prediction recorded"
    );
    Ok(())
}

/// Predictions for one account, newest first
pub fn get_predictions_for_account(
    conn: &Connection,
    account_id: &str,
) -> rusqlite::Result<Vec<PaymentPrediction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM payment_predictions
         WHERE account_id = ?1
         ORDER BY predicted_at DESC, rowid DESC",
        PREDICTION_COLUMNS
    ))?;

    let predictions = stmt
        .query_map(params![account_id], prediction_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(predictions)
}

pub fn count_predictions(conn: &Connection, account_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM payment_predictions WHERE account_id = ?1",
        params![account_id],
        |row| row.get(0),
    )
}

pub fn count_all_predictions(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM payment_predictions", [], |row| row.get(0))
}

// ============================================================================
// TESTS
// ============================================================================
