//! Luhn (mod 10) checksums, as used for order numbers.

/// Returns true if `number` is a non-empty string of ASCII digits whose last digit is a valid Luhn check digit.
pub fn is_valid(number: &str) -> bool {
    luhn_sum(number, false).is_some_and(|sum| sum % 10 == 0)
}

/// Calculates the check digit that makes `payload` followed by the digit Luhn-valid.
///
/// Returns `None` if `payload` contains anything other than ASCII digits.
pub fn check_digit(payload: &str) -> Option<char> {
    let sum = luhn_sum(payload, true)?;
    let digit = (10 - sum % 10) % 10;
    char::from_digit(digit, 10)
}

/// Appends the Luhn check digit to `payload`.
pub fn with_check_digit(payload: &str) -> Option<String> {
    check_digit(payload).map(|d| format!("{payload}{d}"))
}

fn luhn_sum(digits: &str, double_rightmost: bool) -> Option<u32> {
    if digits.is_empty() {
        return if double_rightmost { Some(0) } else { None };
    }
    digits.bytes().rev().enumerate().try_fold(0u32, |sum, (i, b)| {
        if !b.is_ascii_digit() {
            return None;
        }
        let d = u32::from(b - b'0');
        let doubled = (i % 2 == 1) != double_rightmost;
        let d = match (doubled, d * 2) {
            (true, n) if n > 9 => n - 9,
            (true, n) => n,
            (false, _) => d,
        };
        Some(sum + d)
    })
}
