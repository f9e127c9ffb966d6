//! Requester credit balances.

mod sqlite;
mod types;

pub use sqlite::SqliteCreditLedger;
pub use types::{CreditLedger, LedgerError};
