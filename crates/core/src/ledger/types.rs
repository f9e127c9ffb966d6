//! Credit ledger trait and errors.

use thiserror::Error;

/// Errors from credit ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Balance is lower than the amount requested.
    #[error("Insufficient credits: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// Amount can't be represented by the store.
    #[error("Invalid amount: {0}")]
    InvalidAmount(u64),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Per-requester credit balances.
///
/// Requesters are created on first use with the configured initial balance.
pub trait CreditLedger: Send + Sync {
    /// Current balance.
    fn balance(&self, requester_id: &str) -> Result<u64, LedgerError>;

    /// Debit `amount` if the balance covers it, as one atomic step.
    /// Returns the remaining balance.
    fn check_and_debit(&self, requester_id: &str, amount: u64) -> Result<u64, LedgerError>;

    /// Return previously debited credits. Returns the new balance.
    fn refund(&self, requester_id: &str, amount: u64) -> Result<u64, LedgerError>;

    /// Add credits. Returns the new balance.
    fn grant(&self, requester_id: &str, amount: u64) -> Result<u64, LedgerError>;
}
