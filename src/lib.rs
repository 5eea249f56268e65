// Simple Banking System - Core Library
// Exposes all modules for use in the console binary and tests

pub mod config;
pub mod console;
pub mod db;
pub mod error;
pub mod identity;
pub mod luhn;
pub mod service;

// Re-export commonly used types
pub use config::{Config, DEFAULT_DATABASE};
pub use console::{
    accounts_json, card_number_report, rejection_message, AccountCommand, Console, MainCommand,
    UnknownChoice,
};
pub use db::{setup_database, Account, AccountStore};
pub use error::{BankError, BankResult, StoreError, StoreResult};
pub use identity::{CardIssuer, Credentials, DEFAULT_BIN};
pub use luhn::{append_checksum, compute_checksum, is_valid, CARD_NUMBER_LEN};
pub use service::{BankingService, Session};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
