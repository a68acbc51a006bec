//! Streaming lexer and grammar driver for beancount-style ledger files.
//!
//! This crate turns ledger text into located tokens and reports every
//! recognized construct to a caller-supplied [`Builder`]. It does not build
//! an AST, resolve includes or validate anything; that is the builder's job.
//!
//! # Components
//!
//! - [`Tokenizer`] - one token at a time, each with kind, raw text, decoded
//!   literal and [`Location`]
//! - [`GrammarDriver`] - pulls tokens from any [`TokenSource`] and calls the
//!   [`Builder`] as constructs complete
//! - [`Session`] - full-parse and incremental (`begin`/`step`/`close`) runs
//!
//! # Example
//!
//! ```
//! use beanlex_parser::{ConstructLog, Session};
//!
//! let source = r#"2024-01-15 * "Coffee Shop" "Morning coffee"
//!   Expenses:Food:Coffee  5.00 USD
//!   Assets:Cash
//! "#;
//!
//! let mut log = ConstructLog::new();
//! Session::new().parse_str("main.beancount", source, &mut log).unwrap();
//! assert_eq!(log.methods(), vec!["transaction", "posting", "posting"]);
//! assert_eq!(log.lines(), vec![1, 2, 3]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod error;
mod grammar;
mod location;
mod session;
mod source;
mod span;
mod token;
mod tokenizer;

pub use builder::{Builder, Construct, ConstructLog};
pub use error::{ParseError, ParseErrorKind, SessionError};
pub use grammar::GrammarDriver;
pub use location::{Location, LocationTracker};
pub use session::Session;
pub use source::{TokenReplay, TokenSource};
pub use span::Span;
pub use token::{Literal, Token, TokenKind};
pub use tokenizer::Tokenizer;

use std::path::Path;

/// Parse the file at `path` with default session options.
///
/// # Errors
///
/// See [`Session::parse`].
pub fn parse_file(path: impl AsRef<Path>, builder: &mut dyn Builder) -> Result<(), SessionError> {
    Session::new().parse(path, builder)
}

/// Tokenize `source` completely, reporting locations under `name`.
///
/// The END token is not included.
///
/// # Errors
///
/// Returns the first lexical error.
pub fn tokenize(name: &str, source: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokenizer = Tokenizer::new(name, source);
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.next_token()?;
        if token.is_end() {
            return Ok(tokens);
        }
        tokens.push(token);
    }
}
