// ⚠️ Error taxonomy
// Store-level failures and banking-level rejections

use thiserror::Error;

/// Failures reported by the account store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Card number already issued: {0}")]
    Duplicate(String),

    #[error("Insufficient funds on {number}: need {needed}, available {available}")]
    InsufficientFunds {
        number: String,
        needed: i64,
        available: i64,
    },

    #[error("Balance update of {delta} would overdraw {number}")]
    WouldOverdraw { number: String, delta: i64 },

    #[error("Balance update of {delta} would overflow {number}")]
    BalanceOverflow { number: String, delta: i64 },

    #[error("Transfer amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything a banking operation can reject with.
///
/// Rejections caused by user input are recoverable: the console reports them
/// and redisplays the menu. `Store` wraps persistence failures.
#[derive(Debug, Error)]
pub enum BankError {
    /// Non-positive, or large enough to overflow the receiving balance.
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("Card number fails the Luhn check")]
    InvalidChecksum,

    /// Deliberately carries no detail: unknown card, wrong PIN and malformed
    /// number are indistinguishable.
    #[error("Wrong card number or PIN")]
    AuthFailure,

    #[error("Cannot transfer to the same account")]
    SameAccount,

    #[error("Target card does not exist")]
    TargetNotFound,

    #[error("Insufficient funds: need {needed}, available {available}")]
    InsufficientFunds { needed: i64, available: i64 },

    #[error("No account is logged in")]
    NotLoggedIn,

    #[error("Could not issue a unique card number after {0} attempts")]
    IdentityExhausted(u32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type BankResult<T> = Result<T, BankError>;

impl BankError {
    /// True for rejections caused by user input rather than the store.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, BankError::Store(_) | BankError::IdentityExhausted(_))
    }
}
