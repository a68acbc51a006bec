//! Cost specification type.
//!
//! A [`CostSpec`] is what appears between braces after a posting amount:
//! `{150 USD}`, `{{1500 USD}}`, `{150 # 5 USD, 2024-01-15, "lot-a"}`, `{*}`.
//! Any field may be left out.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cost specification as written in a posting.
///
/// # Example
///
/// ```
/// use beanlex_core::CostSpec;
/// use rust_decimal_macros::dec;
///
/// let spec = CostSpec::default()
///     .with_number_per(dec!(150))
///     .with_currency("USD");
/// assert_eq!(spec.to_string(), "{150 USD}");
/// assert!(!spec.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CostSpec {
    /// Cost per unit (if specified)
    pub number_per: Option<Decimal>,
    /// Total cost (if specified) - alternative to `number_per`
    pub number_total: Option<Decimal>,
    /// Currency of the cost (if specified)
    pub currency: Option<String>,
    /// Acquisition date (if specified)
    pub date: Option<NaiveDate>,
    /// Lot label (if specified)
    pub label: Option<String>,
    /// Whether to merge with existing lot (average cost)
    pub merge: bool,
}

impl CostSpec {
    /// Set the per-unit cost.
    #[must_use]
    pub const fn with_number_per(mut self, number: Decimal) -> Self {
        self.number_per = Some(number);
        self
    }

    /// Set the total cost.
    #[must_use]
    pub const fn with_number_total(mut self, number: Decimal) -> Self {
        self.number_total = Some(number);
        self
    }

    /// Set the currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Set the date.
    #[must_use]
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the merge flag (for average cost booking).
    #[must_use]
    pub const fn with_merge(mut self) -> Self {
        self.merge = true;
        self
    }

    /// Check if this is an empty cost spec (`{}`).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.number_per.is_none()
            && self.number_total.is_none()
            && self.currency.is_none()
            && self.date.is_none()
            && self.label.is_none()
            && !self.merge
    }
}

impl fmt::Display for CostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        let mut amount = String::new();
        if let Some(per) = self.number_per {
            amount.push_str(&per.to_string());
        }
        if let Some(total) = self.number_total {
            if !amount.is_empty() {
                amount.push(' ');
            }
            amount.push_str(&format!("# {total}"));
        }
        if let Some(currency) = &self.currency {
            if !amount.is_empty() {
                amount.push(' ');
            }
            amount.push_str(currency);
        }
        if !amount.is_empty() {
            parts.push(amount);
        }
        if let Some(date) = self.date {
            parts.push(date.to_string());
        }
        if let Some(label) = &self.label {
            parts.push(format!("\"{label}\""));
        }
        if self.merge {
            parts.push("*".to_string());
        }

        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty() {
        assert!(CostSpec::default().is_empty());
        assert_eq!(CostSpec::default().to_string(), "{}");
        assert!(!CostSpec::default().with_merge().is_empty());
    }

    #[test]
    fn test_display_full() {
        let spec = CostSpec::default()
            .with_number_per(dec!(150))
            .with_number_total(dec!(5))
            .with_currency("USD")
            .with_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .with_label("lot-a");
        assert_eq!(spec.to_string(), "{150 # 5 USD, 2024-01-15, \"lot-a\"}");
    }
}
