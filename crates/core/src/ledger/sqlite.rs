//! SQLite-backed credit ledger.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::debug;

use super::{CreditLedger, LedgerError};

/// SQLite-backed credit ledger.
pub struct SqliteCreditLedger {
    conn: Mutex<Connection>,
    initial_balance: i64,
}

impl SqliteCreditLedger {
    /// Open (or create) the ledger database.
    pub fn new(path: &Path, initial_balance: u64) -> Result<Self, LedgerError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::with_connection(conn, initial_balance)
    }

    /// Create an in-memory ledger (useful for testing).
    pub fn in_memory(initial_balance: u64) -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn, initial_balance)
    }

    fn with_connection(conn: Connection, initial_balance: u64) -> Result<Self, LedgerError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS credit_accounts (
                requester_id TEXT PRIMARY KEY,
                balance INTEGER NOT NULL CHECK (balance >= 0),
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(db_err)?;

        Ok(Self {
            conn: Mutex::new(conn),
            initial_balance: to_sql_amount(initial_balance)?,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::Database("connection mutex poisoned".to_string()))
    }

    /// Create the account with the initial balance if it doesn't exist.
    fn ensure_account(&self, conn: &Connection, requester_id: &str) -> Result<(), LedgerError> {
        let created = conn
            .execute(
                "INSERT OR IGNORE INTO credit_accounts (requester_id, balance, updated_at) VALUES (?1, ?2, ?3)",
                params![requester_id, self.initial_balance, Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;
        if created > 0 {
            debug!(requester_id, balance = self.initial_balance, "Created credit account");
        }
        Ok(())
    }

    fn read_balance(conn: &Connection, requester_id: &str) -> Result<u64, LedgerError> {
        let balance: i64 = conn
            .query_row(
                "SELECT balance FROM credit_accounts WHERE requester_id = ?1",
                params![requester_id],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(balance.max(0) as u64)
    }

    fn add(&self, requester_id: &str, amount: u64) -> Result<u64, LedgerError> {
        let delta = to_sql_amount(amount)?;
        let conn = self.conn()?;
        self.ensure_account(&conn, requester_id)?;

        conn.execute(
            "UPDATE credit_accounts SET balance = balance + ?1, updated_at = ?2 WHERE requester_id = ?3",
            params![delta, Utc::now().to_rfc3339(), requester_id],
        )
        .map_err(db_err)?;

        Self::read_balance(&conn, requester_id)
    }
}

impl CreditLedger for SqliteCreditLedger {
    fn balance(&self, requester_id: &str) -> Result<u64, LedgerError> {
        let conn = self.conn()?;
        self.ensure_account(&conn, requester_id)?;
        Self::read_balance(&conn, requester_id)
    }

    fn check_and_debit(&self, requester_id: &str, amount: u64) -> Result<u64, LedgerError> {
        let delta = to_sql_amount(amount)?;
        let conn = self.conn()?;
        self.ensure_account(&conn, requester_id)?;

        // Conditional update: the balance check and the debit are one statement
        let changed = conn
            .execute(
                "UPDATE credit_accounts SET balance = balance - ?1, updated_at = ?2 WHERE requester_id = ?3 AND balance >= ?1",
                params![delta, Utc::now().to_rfc3339(), requester_id],
            )
            .map_err(db_err)?;

        let balance = Self::read_balance(&conn, requester_id)?;
        if changed == 0 {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: balance,
            });
        }
        Ok(balance)
    }

    fn refund(&self, requester_id: &str, amount: u64) -> Result<u64, LedgerError> {
        self.add(requester_id, amount)
    }

    fn grant(&self, requester_id: &str, amount: u64) -> Result<u64, LedgerError> {
        self.add(requester_id, amount)
    }
}

fn to_sql_amount(amount: u64) -> Result<i64, LedgerError> {
    i64::try_from(amount).map_err(|_| LedgerError::InvalidAmount(amount))
}

fn db_err(e: rusqlite::Error) -> LedgerError {
    LedgerError::Database(e.to_string())
}
