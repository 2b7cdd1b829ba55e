//! Domain error types
//!
//! The ledger core reports failures through [`LedgerError`] so callers can
//! distinguish user-recoverable outcomes (insufficient funds, a request that
//! was already processed) from storage failures. Privileged-surface checks
//! produce [`AccessError`]. Everything outside the core uses `anyhow`.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A debit would take the balance below zero; nothing was mutated.
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds {
        balance: Decimal,
        requested: Decimal,
    },

    /// The deal is already in a terminal state; the action was not applied.
    #[error("deal {0} already processed")]
    AlreadyProcessed(i64),

    #[error("deal {0} not found")]
    DealNotFound(i64),

    #[error("user {0} not found")]
    UserNotFound(i64),

    /// A stored amount failed to parse back into a decimal.
    #[error("malformed amount in storage: {0}")]
    MalformedAmount(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("user {0} is not an administrator")]
    NotAdmin(i64),
}
