//! Value types for beanlex.
//!
//! The parser never accumulates a ledger itself. Every construct it recognizes
//! is handed to a builder as one of the owned values defined here:
//!
//! - [`Amount`] / [`IncompleteAmount`] - A decimal number with a (possibly missing) currency
//! - [`CostSpec`] - A cost specification written in braces after a posting amount
//! - [`PriceAnnotation`] - An `@` or `@@` price written after a posting amount
//! - [`MetaValue`] - The value side of a `key: value` metadata line
//! - [`Posting`] - One leg of a transaction
//! - One header struct per dated directive ([`Open`], [`Transaction`], ...)
//!
//! # Example
//!
//! ```
//! use beanlex_core::{Amount, IncompleteAmount, Posting};
//! use rust_decimal_macros::dec;
//!
//! let posting = Posting::with_units(
//!     "Expenses:Food",
//!     IncompleteAmount::Complete(Amount::new(dec!(5.00), "USD")),
//! )
//! .with_flag('!');
//!
//! assert_eq!(posting.to_string(), "! Expenses:Food 5.00 USD");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod amount;
pub mod cost;
pub mod directive;

pub use amount::{Amount, IncompleteAmount};
pub use cost::CostSpec;
pub use directive::{
    Balance, Close, Commodity, Custom, Document, Event, MetaValue, Note, Open, Pad, Posting,
    Price, PriceAnnotation, Query, Transaction,
};

// Re-export commonly used external types
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;
