//! Input validation for user-supplied values
//!
//! Every free-text input a flow accepts passes through one of these helpers
//! before it is stored or spent. Validation failures are recoverable: the
//! handler re-prompts the same step and keeps the conversation state.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// TON wallet addresses: exactly 48 characters of [a-zA-Z0-9_-]
static WALLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{48}$").unwrap());

/// Bank cards: exactly 16 digits (after space stripping)
static CARD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{16}$").unwrap());

/// Check a TON wallet address
pub fn is_valid_wallet(address: &str) -> bool {
    WALLET_RE.is_match(address)
}

/// Normalize and check a card number: strips spaces, requires 16 digits.
/// Returns the normalized digits on success.
pub fn normalize_card(raw: &str) -> Option<String> {
    let stripped: String = raw.chars().filter(|c| *c != ' ').collect();
    if CARD_RE.is_match(&stripped) {
        Some(stripped)
    } else {
        None
    }
}

/// Parse a strictly positive decimal amount ("40", "12.50", "0.05")
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let amount = Decimal::from_str(raw.trim()).ok()?;
    if amount > Decimal::ZERO {
        Some(amount)
    } else {
        None
    }
}

/// Parse a signed balance adjustment; an explicit '+' or '-' prefix is
/// required ("+10", "-2.5"). Anything else is a syntax error.
pub fn parse_signed_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('+') {
        Some(rest) => (false, rest),
        None => (true, raw.strip_prefix('-')?),
    };
    let amount = parse_amount(digits)?;
    Some(if negative { -amount } else { amount })
}

/// Display names: 2 to 50 characters
pub fn is_valid_name(name: &str) -> bool {
    let len = name.chars().count();
    (2..=50).contains(&len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_accepts_exact_48() {
        let ok = "UQDoDzbmTF6UO6x9dAoKn_KvbINKptV6kHrCMqv3G4csblFh";
        assert_eq!(ok.len(), 48);
        assert!(is_valid_wallet(ok));
        assert!(is_valid_wallet(&"a".repeat(48)));
        assert!(is_valid_wallet(&"A1_-".repeat(12)));
    }

    #[test]
    fn test_wallet_rejects_bad_length_and_alphabet() {
        assert!(!is_valid_wallet(&"a".repeat(47)));
        assert!(!is_valid_wallet(&"a".repeat(49)));
        assert!(!is_valid_wallet(""));
        let with_space = format!("{} {}", "a".repeat(23), "b".repeat(24));
        assert!(!is_valid_wallet(&with_space));
        let with_plus = format!("{}+", "a".repeat(47));
        assert!(!is_valid_wallet(&with_plus));
    }

    #[test]
    fn test_card_strips_spaces() {
        assert_eq!(
            normalize_card("1234 5678 9012 3456"),
            Some("1234567890123456".to_string())
        );
        assert_eq!(
            normalize_card("1234567890123456"),
            Some("1234567890123456".to_string())
        );
    }

    #[test]
    fn test_card_rejects_bad_input() {
        assert_eq!(normalize_card("1234 5678 9012 345"), None);
        assert_eq!(normalize_card("1234 5678 9012 34567"), None);
        assert_eq!(normalize_card("1234-5678-9012-3456"), None);
        assert_eq!(normalize_card("abcd efgh ijkl mnop"), None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("40"), Some(Decimal::from(40)));
        assert_eq!(parse_amount(" 12.50 "), Decimal::from_str("12.50").ok());
        assert_eq!(parse_amount("0"), None);
        assert_eq!(parse_amount("-5"), None);
        assert_eq!(parse_amount("ten"), None);
    }

    #[test]
    fn test_parse_signed_amount_requires_prefix() {
        assert_eq!(parse_signed_amount("+10"), Some(Decimal::from(10)));
        assert_eq!(parse_signed_amount("-2.5"), Decimal::from_str("-2.5").ok());
        assert_eq!(parse_signed_amount("10"), None);
        assert_eq!(parse_signed_amount("+"), None);
        assert_eq!(parse_signed_amount("+-3"), None);
    }

    #[test]
    fn test_name_bounds() {
        assert!(is_valid_name("Al"));
        assert!(is_valid_name(&"n".repeat(50)));
        assert!(!is_valid_name("A"));
        assert!(!is_valid_name(&"n".repeat(51)));
    }
}
