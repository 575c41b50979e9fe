//! Presentation formatting for card form fields.
//!
//! These helpers only shape what the user typed. They are not validators:
//! a formatted value may still be a nonsense card number.

/// Maximum digits kept in a card number.
pub const CARD_NUMBER_DIGITS: usize = 16;

/// Maximum digits kept in an expiry date (`MMYY`).
pub const EXPIRY_DIGITS: usize = 4;

/// Maximum digits kept in a CVV.
pub const CVV_DIGITS: usize = 4;

fn digits(value: &str, max: usize) -> String {
    value.chars().filter(char::is_ascii_digit).take(max).collect()
}

/// Group card digits in space-separated blocks of four.
///
/// ```
/// use bgr_core::card::format_card_number;
///
/// assert_eq!(format_card_number("4242424242424242"), "4242 4242 4242 4242");
/// assert_eq!(format_card_number("4242-4242 42"), "4242 4242 42");
/// ```
#[must_use]
pub fn format_card_number(value: &str) -> String {
    let digits = digits(value, CARD_NUMBER_DIGITS);
    let mut formatted = String::with_capacity(digits.len() + digits.len() / 4);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && i % 4 == 0 {
            formatted.push(' ');
        }
        formatted.push(c);
    }
    formatted
}

/// Mask an expiry date as `MM/YY`.
///
/// The slash appears once two digits are present, so `"12"` becomes `"12/"`
/// and a single digit is left alone.
///
/// ```
/// use bgr_core::card::format_expiry;
///
/// assert_eq!(format_expiry("1225"), "12/25");
/// assert_eq!(format_expiry("1"), "1");
/// ```
#[must_use]
pub fn format_expiry(value: &str) -> String {
    let digits = digits(value, EXPIRY_DIGITS);
    match digits.split_at_checked(2) {
        Some((month, year)) => format!("{month}/{year}"),
        None => digits,
    }
}

/// Strip a CVV to at most four digits.
#[must_use]
pub fn format_cvv(value: &str) -> String {
    digits(value, CVV_DIGITS)
}
