use crate::error::{StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// One row of the `card` table.
///
/// The PIN never leaves the process through serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: i64,
    pub number: String,
    #[serde(skip_serializing)]
    pub pin: String,
    pub balance: i64,
}

const ACCOUNT_COLUMNS: &str = "id, number, pin, balance";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        number: row.get(1)?,
        pin: row.get(2)?,
        balance: row.get(3)?,
    })
}

fn balance_of(conn: &Connection, number: &str) -> StoreResult<i64> {
    conn.query_row("SELECT balance FROM card WHERE number = ?1", [number], |row| {
        row.get(0)
    })
    .optional()?
    .ok_or_else(|| StoreError::NotFound(number.to_string()))
}

/// Balance after `delta`, or why it is not allowed. SQLite would silently
/// turn an overflowing INTEGER sum into a REAL, so the sum is done here.
fn apply_delta(number: &str, current: i64, delta: i64) -> StoreResult<i64> {
    match current.checked_add(delta) {
        Some(balance) if balance >= 0 => Ok(balance),
        None if delta > 0 => Err(StoreError::BalanceOverflow {
            number: number.to_string(),
            delta,
        }),
        _ => Err(StoreError::WouldOverdraw {
            number: number.to_string(),
            delta,
        }),
    }
}

pub fn setup_database(conn: &Connection) -> rusqlite::Result<()> {
    // ==========================================================================
    // Card table - number is unique so a colliding issue fails loudly
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS card (
            id INTEGER PRIMARY KEY,
            number TEXT NOT NULL UNIQUE,
            pin TEXT NOT NULL,
            balance INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    Ok(())
}

// ============================================================================
// ACCOUNT STORE
// ============================================================================

/// Owned handle over the SQLite database holding the `card` table.
///
/// The connection lives exactly as long as the store and is closed when the
/// store is dropped.
pub struct AccountStore {
    conn: Connection,
}

impl AccountStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        // WAL for crash recovery of file databases
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::initialize(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> StoreResult<Self> {
        setup_database(&conn)?;
        Ok(Self { conn })
    }

    /// Insert a fresh account with a zero balance.
    pub fn insert(&mut self, number: &str, pin: &str) -> StoreResult<Account> {
        let result = self.conn.execute(
            "INSERT INTO card (number, pin) VALUES (?1, ?2)",
            params![number, pin],
        );

        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                info!(number, id, "card inserted");
                Ok(Account {
                    id,
                    number: number.to_string(),
                    pin: pin.to_string(),
                    balance: 0,
                })
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Duplicate(number.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_by_number(&self, number: &str) -> StoreResult<Option<Account>> {
        debug!(number, "lookup by number");
        let account = self
            .conn
            .query_row(
                &format!("SELECT {} FROM card WHERE number = ?1", ACCOUNT_COLUMNS),
                [number],
                account_from_row,
            )
            .optional()?;

        Ok(account)
    }

    pub fn find_by_number_and_pin(&self, number: &str, pin: &str) -> StoreResult<Option<Account>> {
        debug!(number, "lookup by credentials");
        let account = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM card WHERE number = ?1 AND pin = ?2",
                    ACCOUNT_COLUMNS
                ),
                params![number, pin],
                account_from_row,
            )
            .optional()?;

        Ok(account)
    }

    pub fn exists(&self, number: &str) -> StoreResult<bool> {
        let found: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM card WHERE number = ?1)",
            [number],
            |row| row.get(0),
        )?;

        Ok(found)
    }

    /// Apply `delta` to the balance.
    ///
    /// The new balance is computed with checked arithmetic before anything is
    /// written, so a rejected update leaves the row untouched and the column
    /// always holds an INTEGER.
    pub fn update_balance(&mut self, number: &str, delta: i64) -> StoreResult<Account> {
        let tx = self.conn.transaction()?;

        let current = balance_of(&tx, number)?;
        let balance = apply_delta(number, current, delta)?;
        tx.execute(
            "UPDATE card SET balance = ?1 WHERE number = ?2",
            params![balance, number],
        )?;

        tx.commit()?;

        self.find_by_number(number)?
            .ok_or_else(|| StoreError::NotFound(number.to_string()))
    }

    /// Move `amount` from one card to another inside one transaction.
    ///
    /// Both new balances are validated before the first write; any early
    /// return drops the uncommitted transaction.
    pub fn transfer(&mut self, from: &str, to: &str, amount: i64) -> StoreResult<()> {
        if amount <= 0 {
            return Err(StoreError::InvalidAmount(amount));
        }

        let tx = self.conn.transaction()?;

        let available = balance_of(&tx, from)?;
        if available < amount {
            return Err(StoreError::InsufficientFunds {
                number: from.to_string(),
                needed: amount,
                available,
            });
        }
        let debited = apply_delta(from, available, -amount)?;

        let target = balance_of(&tx, to)?;
        let credited = apply_delta(to, target, amount)?;

        tx.execute(
            "UPDATE card SET balance = ?1 WHERE number = ?2",
            params![debited, from],
        )?;
        tx.execute(
            "UPDATE card SET balance = ?1 WHERE number = ?2",
            params![credited, to],
        )?;

        tx.commit()?;
        info!(from, to, amount, "transfer committed");

        Ok(())
    }

    /// Hard delete. No tombstone is kept.
    pub fn delete(&mut self, number: &str) -> StoreResult<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM card WHERE number = ?1", [number])?;

        if deleted == 0 {
            return Err(StoreError::NotFound(number.to_string()));
        }

        info!(number, "card deleted");
        Ok(())
    }

    pub fn all_accounts(&self) -> StoreResult<Vec<Account>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM card ORDER BY id",
            ACCOUNT_COLUMNS
        ))?;

        let accounts = stmt
            .query_map([], account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    pub fn count(&self) -> StoreResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM card", [], |row| row.get(0))?;

        Ok(count)
    }
}
