// 💳 Card Issuer - card numbers and PINs
//
// A card number is BIN (6) + account identifier (9) + Luhn check digit (1).
// Uniqueness is checked against the store before a number is handed out;
// the UNIQUE constraint on `card.number` backs this up.

use crate::db::AccountStore;
use crate::error::{BankError, BankResult};
use crate::luhn;
use rand::Rng;
use tracing::warn;

/// Issuer identification number used when none is configured
pub const DEFAULT_BIN: &str = "400000";

/// Largest 9-digit account identifier
const MAX_ACCOUNT_ID: u32 = 999_999_999;

/// Largest 4-digit PIN
const MAX_PIN: u16 = 9_999;

/// Number + PIN pair handed to the user at account creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub number: String,
    pub pin: String,
}

#[derive(Debug, Clone)]
pub struct CardIssuer {
    bin: String,
    max_attempts: u32,
}

impl CardIssuer {
    /// `bin` must be six ASCII digits; `Config::validate` guarantees this for
    /// configured values.
    pub fn new(bin: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            bin: bin.into(),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Fresh 16-digit card number carrying a valid check digit.
    pub fn generate_card_number<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let account_id = rng.gen_range(0..=MAX_ACCOUNT_ID);
        let payload = format!("{}{:09}", self.bin, account_id);
        let check = luhn::compute_checksum(&payload).unwrap_or(0);
        format!("{}{}", payload, check)
    }

    pub fn generate_pin<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        format!("{:04}", rng.gen_range(0..=MAX_PIN))
    }

    /// One draw: a number not yet present in the store paired with a PIN,
    /// or `None` when the drawn number is already taken.
    pub fn try_issue<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        store: &AccountStore,
    ) -> BankResult<Option<Credentials>> {
        let number = self.generate_card_number(rng);
        if store.exists(&number)? {
            return Ok(None);
        }

        Ok(Some(Credentials {
            number,
            pin: self.generate_pin(rng),
        }))
    }

    /// Draw until a free number turns up.
    ///
    /// Gives up with `IdentityExhausted` after `max_attempts` collisions.
    pub fn issue<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        store: &AccountStore,
    ) -> BankResult<Credentials> {
        for attempt in 1..=self.max_attempts {
            match self.try_issue(rng, store)? {
                Some(credentials) => return Ok(credentials),
                None => warn!(attempt, "card number collision, regenerating"),
            }
        }

        Err(BankError::IdentityExhausted(self.max_attempts))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for CardIssuer {
    fn default() -> Self {
        Self::new(DEFAULT_BIN, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_card_number_shape() {
        let issuer = CardIssuer::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let number = issuer.generate_card_number(&mut rng);
            assert_eq!(number.len(), luhn::CARD_NUMBER_LEN);
            assert!(number.starts_with(DEFAULT_BIN));
            assert!(luhn::is_valid(&number), "invalid number {}", number);
        }
    }

    #[test]
    fn test_pin_shape() {
        let issuer = CardIssuer::default();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            let pin = issuer.generate_pin(&mut rng);
            assert_eq!(pin.len(), 4);
            assert!(pin.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_custom_bin() {
        let issuer = CardIssuer::new("512345", 3);
        let mut rng = StdRng::seed_from_u64(1);

        let number = issuer.generate_card_number(&mut rng);
        assert!(number.starts_with("512345"));
        assert!(luhn::is_valid(&number));
    }

    #[test]
    fn test_issue_skips_existing_numbers() {
        let issuer = CardIssuer::default();
        let mut store = AccountStore::open_in_memory().unwrap();

        // Same seed twice: the first draw of the second rng collides
        let taken = issuer.generate_card_number(&mut StdRng::seed_from_u64(99));
        store.insert(&taken, "0000").unwrap();

        let issued = issuer.issue(&mut StdRng::seed_from_u64(99), &store).unwrap();
        assert_ne!(issued.number, taken);
        assert!(luhn::is_valid(&issued.number));
    }

    #[test]
    fn test_issue_gives_up_after_max_attempts() {
        let issuer = CardIssuer::new(DEFAULT_BIN, 1);
        let mut store = AccountStore::open_in_memory().unwrap();

        let taken = issuer.generate_card_number(&mut StdRng::seed_from_u64(5));
        store.insert(&taken, "0000").unwrap();

        let result = issuer.issue(&mut StdRng::seed_from_u64(5), &store);
        assert!(matches!(result, Err(BankError::IdentityExhausted(1))));
    }

    proptest! {
        #[test]
        fn prop_generated_numbers_validate(seed in any::<u64>()) {
            let issuer = CardIssuer::default();
            let number = issuer.generate_card_number(&mut StdRng::seed_from_u64(seed));
            prop_assert!(luhn::is_valid(&number));
        }
    }
}
