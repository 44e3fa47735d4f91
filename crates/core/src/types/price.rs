//! Type-safe product price using decimal arithmetic.
//!
//! Prices are stored in the store's own currency; the backend owns the
//! currency setting, so only the amount travels through this type.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more than two decimal places.
    #[error("price can have at most two decimal places")]
    TooPrecise,
}

/// A non-negative amount with at most two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] for negative amounts or sub-cent precision.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        Ok(Self(amount))
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::NotANumber)?;
        Self::new(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("19.99", "19.99")]
    #[case(" 5 ", "5.00")]
    #[case("0", "0.00")]
    #[case("12.50", "12.50")]
    fn test_parse_valid(#[case] input: &str, #[case] display: &str) {
        assert_eq!(input.parse::<Price>().unwrap().to_string(), display);
    }

    #[rstest]
    #[case("abc", PriceError::NotANumber)]
    #[case("", PriceError::NotANumber)]
    #[case("-1", PriceError::Negative)]
    #[case("1.999", PriceError::TooPrecise)]
    fn test_parse_invalid(#[case] input: &str, #[case] expected: PriceError) {
        assert_eq!(input.parse::<Price>().unwrap_err(), expected);
    }
}
