//! Amount type for monetary values stored in integer minor currency units.
//!
//! The record store holds amounts as integers (cents), so all arithmetic in
//! this crate is integer arithmetic. Fractional input only exists at the
//! user-input boundary, where `Decimal` parsing rounds explicitly to cents.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// A monetary amount in minor currency units (cents).
///
/// Serializes as a bare integer, which is how the record store stores it.
/// Parsing accepts user-entered strings with an optional dollar sign and
/// thousands separators.
///
/// # Examples
///
/// ```
/// # use budget_sync::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("-$1,234.56").unwrap();
/// assert_eq!(amount.minor(), -123456);
/// assert_eq!(amount.to_string(), "-$1,234.56");
/// ```
///
/// Sub-cent input rounds half away from zero, once, at the parse boundary:
/// ```
/// # use budget_sync::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("0.005").unwrap();
/// assert_eq!(amount.minor(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Creates an Amount from a value already expressed in minor units.
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the value in minor units.
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

/// An error that can occur when parsing a string into an `Amount`.
pub struct ParseAmountError(String);

impl ParseAmountError {
    fn new(input: &str) -> Self {
        Self(format!("invalid amount '{input}'"))
    }
}

impl Debug for ParseAmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for ParseAmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ParseAmountError {}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::default());
        }

        // Remove the dollar sign if present, keeping the sign out front.
        let without_dollar = if let Some(after_minus) = trimmed.strip_prefix('-') {
            if let Some(after_dollar) = after_minus.strip_prefix('$') {
                format!("-{after_dollar}")
            } else {
                trimmed.to_string()
            }
        } else if let Some(after_dollar) = trimmed.strip_prefix('$') {
            after_dollar.to_string()
        } else {
            trimmed.to_string()
        };

        // Remove commas (thousands separators)
        let without_commas = without_dollar.replace(',', "");

        let value = Decimal::from_str(&without_commas).map_err(|_| ParseAmountError::new(s))?;
        let minor = (value * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| ParseAmountError::new(s))?;
        Ok(Amount(minor))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let dollars = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}${}.{cents:02}", group_thousands(dollars))
    }
}

/// Formats an integer with comma thousands separators.
fn group_thousands(mut n: u64) -> String {
    let mut groups = Vec::new();
    loop {
        let group = n % 1000;
        n /= 1000;
        if n == 0 {
            groups.push(group.to_string());
            break;
        }
        groups.push(format!("{group:03}"));
    }
    groups.reverse();
    groups.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_dollar_sign() {
        let amount = Amount::from_str("$50.00").unwrap();
        assert_eq!(amount.minor(), 5000);
    }

    #[test]
    fn test_parse_without_dollar_sign() {
        let amount = Amount::from_str("50.00").unwrap();
        assert_eq!(amount.minor(), 5000);
    }

    #[test]
    fn test_parse_negative_with_dollar_sign() {
        let amount = Amount::from_str("-$50.00").unwrap();
        assert_eq!(amount.minor(), -5000);
    }

    #[test]
    fn test_parse_empty_string() {
        let amount = Amount::from_str("").unwrap();
        assert!(amount.is_zero());
    }

    #[test]
    fn test_parse_whitespace() {
        let amount = Amount::from_str("  $50.00  ").unwrap();
        assert_eq!(amount.minor(), 5000);
    }

    #[test]
    fn test_parse_with_commas() {
        let amount = Amount::from_str("$1,000.00").unwrap();
        assert_eq!(amount.minor(), 100000);
    }

    #[test]
    fn test_parse_large_amount_with_commas() {
        let amount = Amount::from_str("-$60,000.00").unwrap();
        assert_eq!(amount.minor(), -6000000);
    }

    #[test]
    fn test_parse_whole_dollars() {
        let amount = Amount::from_str("12").unwrap();
        assert_eq!(amount.minor(), 1200);
    }

    #[test]
    fn test_parse_rounds_half_away_from_zero() {
        assert_eq!(Amount::from_str("0.005").unwrap().minor(), 1);
        assert_eq!(Amount::from_str("-0.005").unwrap().minor(), -1);
        assert_eq!(Amount::from_str("0.004").unwrap().minor(), 0);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(Amount::from_str("twelve dollars").is_err());
    }

    #[test]
    fn test_display_zero() {
        let amount = Amount::from_minor(0);
        assert_eq!(amount.to_string(), "$0.00");
    }

    #[test]
    fn test_display_cents_padding() {
        let amount = Amount::from_minor(-705);
        assert_eq!(amount.to_string(), "-$7.05");
    }

    #[test]
    fn test_display_thousands() {
        let amount = Amount::from_minor(123456789);
        assert_eq!(amount.to_string(), "$1,234,567.89");
    }

    #[test]
    fn test_serialize_as_integer() {
        let amount = Amount::from_minor(5000);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "5000");
    }

    #[test]
    fn test_deserialize_from_integer() {
        let amount: Amount = serde_json::from_str("-700").unwrap();
        assert_eq!(amount.minor(), -700);
    }

    #[test]
    fn test_zero_is_not_positive_or_negative() {
        let zero = Amount::from_minor(0);
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
        assert!(zero.is_zero());
    }

    #[test]
    fn test_ordering() {
        assert!(Amount::from_minor(3000) < Amount::from_minor(5000));
    }
}
