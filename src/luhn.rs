// 🔢 Checksum Engine - Luhn algorithm over card numbers
// Pure functions, no I/O

/// Full length of a card number (BIN + account identifier + check digit)
pub const CARD_NUMBER_LEN: usize = 16;

// ============================================================================
// CHECKSUM
// ============================================================================

/// Compute the Luhn check digit for a payload of decimal digits.
///
/// Walking from the rightmost digit, every second digit (starting with the
/// rightmost one) is doubled and reduced by 9 when it exceeds 9. The check
/// digit is whatever brings the total up to a multiple of ten.
///
/// Returns `None` for an empty payload or one containing non-digits.
pub fn compute_checksum(digits: &str) -> Option<u8> {
    if digits.is_empty() {
        return None;
    }

    let mut sum: u32 = 0;
    for (i, c) in digits.chars().rev().enumerate() {
        let mut d = c.to_digit(10)?;
        if i % 2 == 0 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }

    Some(((10 - sum % 10) % 10) as u8)
}

/// Append the check digit to a payload.
pub fn append_checksum(payload: &str) -> Option<String> {
    let check = compute_checksum(payload)?;
    Some(format!("{}{}", payload, check))
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Check a full card number: exactly 16 ASCII digits whose last digit is the
/// Luhn checksum of the first 15. Anything malformed is simply invalid.
pub fn is_valid(number: &str) -> bool {
    if number.len() != CARD_NUMBER_LEN || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let (payload, last) = number.split_at(CARD_NUMBER_LEN - 1);
    let expected = last.as_bytes()[0] - b'0';

    compute_checksum(payload) == Some(expected)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_checksums() {
        // Classic textbook payload: 7992739871 -> 3
        assert_eq!(compute_checksum("7992739871"), Some(3));
        assert_eq!(compute_checksum("400000844943340"), Some(3));
        assert_eq!(compute_checksum("0"), Some(0));
    }

    #[test]
    fn test_rejects_non_digits() {
        assert_eq!(compute_checksum(""), None);
        assert_eq!(compute_checksum("40000a"), None);
        assert_eq!(compute_checksum("4000 00"), None);
    }

    #[test]
    fn test_is_valid_accepts_real_number() {
        assert!(is_valid("4000008449433403"));
        assert!(is_valid("4000003305061034"));
    }

    #[test]
    fn test_is_valid_rejects_wrong_check_digit() {
        assert!(!is_valid("4000008449433402"));
        assert!(!is_valid("4000003305061030"));
    }

    #[test]
    fn test_is_valid_rejects_malformed_input() {
        assert!(!is_valid(""));
        assert!(!is_valid("4"));
        assert!(!is_valid("400000844943340"));
        assert!(!is_valid("40000084494334030"));
        assert!(!is_valid("400000844943340x"));
        assert!(!is_valid("４000008449433403"));
    }

    #[test]
    fn test_append_checksum() {
        assert_eq!(
            append_checksum("400000844943340").as_deref(),
            Some("4000008449433403")
        );
        assert_eq!(append_checksum("abc"), None);
    }

    proptest! {
        #[test]
        fn prop_checksum_completes_any_prefix(prefix in "[0-9]{15}") {
            let check = compute_checksum(&prefix).unwrap();
            prop_assert!(check <= 9);
            let full = format!("{}{}", prefix, check);
            prop_assert!(is_valid(&full));
        }

        #[test]
        fn prop_single_digit_change_is_detected(prefix in "[0-9]{15}", pos in 0usize..16, bump in 1u8..10) {
            let full = append_checksum(&prefix).unwrap();
            let mut bytes = full.into_bytes();
            bytes[pos] = b'0' + (bytes[pos] - b'0' + bump) % 10;
            let altered = String::from_utf8(bytes).unwrap();
            prop_assert!(!is_valid(&altered));
        }
    }
}
