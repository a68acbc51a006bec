//! Ledger debugging tools.
//!
//! This crate provides command-line tools built on `beanlex-parser`:
//!
//! - `beanlex-doctor` / `bean-doctor`: dump the token stream or the builder
//!   calls of a ledger file
//!
//! # Example Usage
//!
//! ```bash
//! beanlex-doctor lex ledger.beancount
//! beanlex-doctor parse --format json ledger.beancount
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cmd;
pub mod report;
