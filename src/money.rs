//! Decimal money helpers.
//!
//! The ledger stores signed decimal balances directly (`rust_decimal::Decimal`); unlike a
//! scaled-integer representation there is no fixed precision to declare up front, but every
//! externally-rendered amount (CSV, SEPA XML) is formatted with exactly two fraction digits,
//! and no rounding happens on the booking path itself.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum MoneyError {
    #[error("amount string '{0}' is not a valid decimal")]
    InvalidFormat(String),
    #[error("amount must be positive, got {0}")]
    NotPositive(Decimal),
    #[error("amount must not be negative, got {0}")]
    Negative(Decimal),
}

/// Parses a decimal amount string, rejecting anything that doesn't round-trip.
pub fn parse_amount(s: &str) -> Result<Decimal, MoneyError> {
    Decimal::from_str(s.trim()).map_err(|_| MoneyError::InvalidFormat(s.to_string()))
}

pub fn require_positive(amount: Decimal) -> Result<Decimal, MoneyError> {
    if amount <= Decimal::ZERO {
        return Err(MoneyError::NotPositive(amount));
    }
    Ok(amount)
}

pub fn require_non_negative(amount: Decimal) -> Result<Decimal, MoneyError> {
    if amount < Decimal::ZERO {
        return Err(MoneyError::Negative(amount));
    }
    Ok(amount)
}

/// Formats an amount as a decimal string with exactly two fraction digits, the shape every
/// CSV/SEPA field requires.
pub fn format_two_decimals(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn parses_plain_decimal() {
        assert_eq!(parse_amount("12.40").unwrap(), d("12.40"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn formats_with_two_fraction_digits() {
        assert_eq!(format_two_decimals(d("12.4")), "12.40");
        assert_eq!(format_two_decimals(d("12")), "12.00");
        assert_eq!(format_two_decimals(d("-2.5")), "-2.50");
    }

    #[test]
    fn positive_check_rejects_zero_and_negative() {
        assert!(require_positive(d("0")).is_err());
        assert!(require_positive(d("-1")).is_err());
        assert!(require_positive(d("1")).is_ok());
    }
}
