//! Amount type representing a decimal number with a currency.
//!
//! An [`Amount`] combines a decimal number with a currency code. Postings and
//! price annotations may leave either half out, which is what
//! [`IncompleteAmount`] models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;

/// An amount is a quantity paired with a currency.
///
/// # Examples
///
/// ```
/// use beanlex_core::Amount;
/// use rust_decimal_macros::dec;
///
/// let amount = Amount::new(dec!(100.00), "USD");
/// assert_eq!(amount.number, dec!(100.00));
/// assert_eq!(amount.currency, "USD");
/// assert_eq!(amount.to_string(), "100.00 USD");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    /// The decimal quantity
    pub number: Decimal,
    /// The currency code (e.g., "USD", "EUR", "AAPL")
    pub currency: String,
}

impl Amount {
    /// Create a new amount.
    #[must_use]
    pub fn new(number: Decimal, currency: impl Into<String>) -> Self {
        Self {
            number,
            currency: currency.into(),
        }
    }

    /// Check if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.number.is_zero()
    }

    /// Get the scale (number of decimal places) of this amount.
    #[must_use]
    pub const fn scale(&self) -> u32 {
        self.number.scale()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}

impl Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            number: -self.number,
            currency: self.currency,
        }
    }
}

/// An amount as written in a posting, where either half may be missing.
///
/// - `100.00 USD` - Complete amount
/// - `USD` - Currency only
/// - `100.00` - Number only
///
/// A posting with no amount at all carries `None` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncompleteAmount {
    /// Complete amount with both number and currency
    Complete(Amount),
    /// Only number specified
    NumberOnly(Decimal),
    /// Only currency specified
    CurrencyOnly(String),
}

impl IncompleteAmount {
    /// Create a complete amount.
    #[must_use]
    pub fn complete(number: Decimal, currency: impl Into<String>) -> Self {
        Self::Complete(Amount::new(number, currency))
    }

    /// Get the number if present.
    #[must_use]
    pub const fn number(&self) -> Option<Decimal> {
        match self {
            Self::Complete(a) => Some(a.number),
            Self::NumberOnly(n) => Some(*n),
            Self::CurrencyOnly(_) => None,
        }
    }

    /// Get the currency if present.
    #[must_use]
    pub fn currency(&self) -> Option<&str> {
        match self {
            Self::Complete(a) => Some(&a.currency),
            Self::NumberOnly(_) => None,
            Self::CurrencyOnly(c) => Some(c),
        }
    }

    /// Get the complete amount, if both halves are present.
    #[must_use]
    pub const fn as_amount(&self) -> Option<&Amount> {
        match self {
            Self::Complete(a) => Some(a),
            _ => None,
        }
    }
}

impl From<Amount> for IncompleteAmount {
    fn from(amount: Amount) -> Self {
        Self::Complete(amount)
    }
}

impl fmt::Display for IncompleteAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(a) => write!(f, "{a}"),
            Self::NumberOnly(n) => write!(f, "{n}"),
            Self::CurrencyOnly(c) => write!(f, "{c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new() {
        let amount = Amount::new(dec!(100.00), "USD");
        assert_eq!(amount.number, dec!(100.00));
        assert_eq!(amount.currency, "USD");
        assert_eq!(amount.scale(), 2);
    }

    #[test]
    fn test_neg() {
        let amount = -Amount::new(dec!(12.5), "EUR");
        assert_eq!(amount.number, dec!(-12.5));
        assert_eq!(amount.currency, "EUR");
    }

    #[test]
    fn test_incomplete_accessors() {
        let complete = IncompleteAmount::complete(dec!(1), "USD");
        assert_eq!(complete.number(), Some(dec!(1)));
        assert_eq!(complete.currency(), Some("USD"));
        assert!(complete.as_amount().is_some());

        let number = IncompleteAmount::NumberOnly(dec!(2));
        assert_eq!(number.currency(), None);
        assert!(number.as_amount().is_none());

        let currency = IncompleteAmount::CurrencyOnly("CAD".to_string());
        assert_eq!(currency.number(), None);
        assert_eq!(currency.to_string(), "CAD");
    }
}
