// 🏦 Banking Service - session state machine over the account store
//
// The store is passed into every operation; the service itself only owns the
// session state and the card issuer.

use crate::db::{Account, AccountStore};
use crate::error::{BankError, BankResult, StoreError};
use crate::identity::{CardIssuer, Credentials};
use crate::luhn;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, warn};

// ============================================================================
// SESSION STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    LoggedOut,
    /// Holds the active card number
    LoggedIn(String),
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Session::LoggedIn(_))
    }
}

// ============================================================================
// BANKING SERVICE
// ============================================================================

pub struct BankingService {
    issuer: CardIssuer,
    rng: Box<dyn RngCore>,
    session: Session,
}

impl BankingService {
    pub fn new(issuer: CardIssuer) -> Self {
        Self::with_rng(issuer, Box::new(StdRng::from_entropy()))
    }

    /// Deterministic card numbers, for tests and reproducible demos.
    pub fn with_rng(issuer: CardIssuer, rng: Box<dyn RngCore>) -> Self {
        Self {
            issuer,
            rng,
            session: Session::LoggedOut,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Card number of the logged-in account, if any.
    pub fn active_number(&self) -> Option<&str> {
        match &self.session {
            Session::LoggedIn(number) => Some(number),
            Session::LoggedOut => None,
        }
    }

    /// Issue a new card and persist it. The session is left as it was.
    pub fn create_account(&mut self, store: &mut AccountStore) -> BankResult<Credentials> {
        // Collisions seen by the lookup and by the UNIQUE constraint at
        // insert share one attempt budget.
        let max_attempts = self.issuer.max_attempts();
        for attempt in 1..=max_attempts {
            let Some(credentials) = self.issuer.try_issue(&mut self.rng, store)? else {
                warn!(attempt, "card number collision, regenerating");
                continue;
            };

            match store.insert(&credentials.number, &credentials.pin) {
                Ok(_) => {
                    info!(number = %credentials.number, "account created");
                    return Ok(credentials);
                }
                Err(StoreError::Duplicate(number)) => {
                    warn!(attempt, %number, "card number taken at insert, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(BankError::IdentityExhausted(max_attempts))
    }

    /// Authenticate with card number and PIN.
    ///
    /// Malformed numbers, unknown cards and wrong PINs all produce the same
    /// `AuthFailure`.
    pub fn login(&mut self, store: &AccountStore, number: &str, pin: &str) -> BankResult<()> {
        if !luhn::is_valid(number) {
            debug!("login rejected before lookup");
            return Err(BankError::AuthFailure);
        }

        match store.find_by_number_and_pin(number, pin)? {
            Some(account) => {
                info!(number = %account.number, "logged in");
                self.session = Session::LoggedIn(account.number);
                Ok(())
            }
            None => Err(BankError::AuthFailure),
        }
    }

    pub fn logout(&mut self) {
        if let Session::LoggedIn(number) = &self.session {
            info!(%number, "logged out");
        }
        self.session = Session::LoggedOut;
    }

    pub fn balance(&mut self, store: &AccountStore) -> BankResult<i64> {
        Ok(self.active_account(store)?.balance)
    }

    /// Deposit a positive amount into the active account; returns the new
    /// balance.
    pub fn add_income(&mut self, store: &mut AccountStore, amount: i64) -> BankResult<i64> {
        let number = self.active_account(store)?.number;
        if amount <= 0 {
            return Err(BankError::InvalidAmount(amount));
        }

        let account = match store.update_balance(&number, amount) {
            Ok(account) => account,
            Err(StoreError::BalanceOverflow { .. }) => {
                return Err(BankError::InvalidAmount(amount))
            }
            Err(e) => return Err(e.into()),
        };
        info!(%number, amount, balance = account.balance, "income added");
        Ok(account.balance)
    }

    /// Validate the transfer target without moving money.
    ///
    /// Same-account, checksum and existence checks run in that order, so the
    /// console can reject a bad target before asking for an amount.
    pub fn check_transfer_target(&mut self, store: &AccountStore, target: &str) -> BankResult<()> {
        let source = self.active_account(store)?;

        if target == source.number {
            return Err(BankError::SameAccount);
        }
        if !luhn::is_valid(target) {
            return Err(BankError::InvalidChecksum);
        }
        if !store.exists(target)? {
            return Err(BankError::TargetNotFound);
        }

        Ok(())
    }

    /// Move `amount` from the active account to `target`.
    ///
    /// Rejections, first match wins: same account, bad checksum, unknown
    /// target, non-positive amount, insufficient funds.
    pub fn transfer(
        &mut self,
        store: &mut AccountStore,
        target: &str,
        amount: i64,
    ) -> BankResult<()> {
        let result = self.try_transfer(store, target, amount);
        if let Err(e) = &result {
            if e.is_user_error() {
                warn!(to = target, amount, reason = %e, "transfer rejected");
            }
        }
        result
    }

    fn try_transfer(&mut self, store: &mut AccountStore, target: &str, amount: i64) -> BankResult<()> {
        self.check_transfer_target(store, target)?;
        if amount <= 0 {
            return Err(BankError::InvalidAmount(amount));
        }

        let source = self.active_account(store)?;
        if source.balance < amount {
            return Err(BankError::InsufficientFunds {
                needed: amount,
                available: source.balance,
            });
        }

        match store.transfer(&source.number, target, amount) {
            Ok(()) => Ok(()),
            Err(StoreError::InsufficientFunds {
                needed, available, ..
            }) => Err(BankError::InsufficientFunds { needed, available }),
            Err(StoreError::NotFound(number)) if number == target => {
                Err(BankError::TargetNotFound)
            }
            Err(StoreError::BalanceOverflow { .. }) => Err(BankError::InvalidAmount(amount)),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the active account and end the session.
    pub fn close_account(&mut self, store: &mut AccountStore) -> BankResult<()> {
        let account = self.active_account(store)?;
        store.delete(&account.number)?;
        info!(number = %account.number, "account closed");
        self.session = Session::LoggedOut;
        Ok(())
    }

    /// Reload the active account. A record that vanished from the store
    /// ends the session.
    fn active_account(&mut self, store: &AccountStore) -> BankResult<Account> {
        let number = self
            .active_number()
            .ok_or(BankError::NotLoggedIn)?
            .to_string();

        match store.find_by_number(&number)? {
            Some(account) => Ok(account),
            None => {
                warn!(%number, "active account no longer exists");
                self.session = Session::LoggedOut;
                Err(BankError::NotLoggedIn)
            }
        }
    }
}

impl Default for BankingService {
    fn default() -> Self {
        Self::new(CardIssuer::default())
    }
}
