//! Display formatting helpers for Telegram messages

use rust_decimal::Decimal;

/// Mask a TON wallet for display: first and last 8 characters.
/// Example: EQAWzE12...C6ISgcLo
pub fn mask_wallet(address: &str, placeholder: &str) -> String {
    if address.is_empty() {
        return placeholder.to_string();
    }
    if address.len() > 16 {
        format!("{}...{}", &address[..8], &address[address.len() - 8..])
    } else {
        address.to_string()
    }
}

/// Mask a card number for display: only the last 4 digits.
/// Example: **** **** **** 1234
pub fn mask_card(card_number: &str, placeholder: &str) -> String {
    if card_number.is_empty() {
        return placeholder.to_string();
    }
    if card_number.len() >= 4 {
        format!("**** **** **** {}", &card_number[card_number.len() - 4..])
    } else {
        card_number.to_string()
    }
}

/// Render a money amount with at least two fractional digits
/// (40 -> "40.00", 12.5 -> "12.50", 0.125 -> "0.125")
pub fn format_amount(amount: Decimal) -> String {
    let normalized = amount.normalize();
    if normalized.scale() < 2 {
        let mut padded = normalized;
        padded.rescale(2);
        padded.to_string()
    } else {
        normalized.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_mask_wallet() {
        let addr = "UQDoDzbmTF6UO6x9dAoKn_KvbINKptV6kHrCMqv3G4csblFh";
        assert_eq!(mask_wallet(addr, "-"), "UQDoDzbm...G4csblFh");
        assert_eq!(mask_wallet("short", "-"), "short");
        assert_eq!(mask_wallet("", "not added"), "not added");
    }

    #[test]
    fn test_mask_card() {
        assert_eq!(mask_card("1234567890123456", "-"), "**** **** **** 3456");
        assert_eq!(mask_card("", "not added"), "not added");
        assert_eq!(mask_card("123", "-"), "123");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::from(40)), "40.00");
        assert_eq!(format_amount(Decimal::from_str("12.5").unwrap()), "12.50");
        assert_eq!(format_amount(Decimal::from_str("0.125").unwrap()), "0.125");
        assert_eq!(
            format_amount(Decimal::from_str("100.00").unwrap()),
            "100.00"
        );
    }
}
