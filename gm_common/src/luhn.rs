//! Luhn (mod 10) checksum validation for order numbers.

/// Returns true if the decimal digits of `number` pass the Luhn check. Zero and negative numbers are never valid.
pub fn is_valid(number: i64) -> bool {
    if number <= 0 {
        return false;
    }
    let mut n = number;
    let mut sum = 0;
    let mut double = false;
    while n > 0 {
        let mut digit = n % 10;
        if double {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
        double = !double;
        n /= 10;
    }
    sum % 10 == 0
}
