//! Parse and session error types.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::{Location, Span};

/// A lexical or syntax error with location information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// The file and line where the error occurred.
    pub location: Location,
    /// The byte span where the error occurred.
    pub span: Span,
    /// Optional context message.
    pub context: Option<String>,
    /// Optional hint for fixing the error.
    pub hint: Option<String>,
}

impl ParseError {
    /// Create a new parse error.
    #[must_use]
    pub const fn new(kind: ParseErrorKind, location: Location, span: Span) -> Self {
        Self {
            kind,
            location,
            span,
            context: None,
            hint: None,
        }
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a hint for fixing this error.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// The reported line of the error.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.location.line
    }

    /// Returns true if the tokenizer raised this error.
    #[must_use]
    pub const fn is_lexical(&self) -> bool {
        self.kind.is_lexical()
    }

    /// Get a numeric code for the error kind.
    #[must_use]
    pub const fn kind_code(&self) -> u32 {
        match &self.kind {
            ParseErrorKind::UnexpectedChar(_) => 1,
            ParseErrorKind::UnexpectedEof => 2,
            ParseErrorKind::Expected(_) => 3,
            ParseErrorKind::InvalidDate(_) => 4,
            ParseErrorKind::InvalidNumber(_) => 5,
            ParseErrorKind::InvalidUtf8 => 6,
            ParseErrorKind::UnclosedString => 8,
            ParseErrorKind::IndentationError => 11,
            ParseErrorKind::SyntaxError(_) => 12,
            ParseErrorKind::MissingAccount => 14,
            ParseErrorKind::MissingAmount => 16,
            ParseErrorKind::MissingCurrency => 17,
            ParseErrorKind::MissingDirective => 19,
        }
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> String {
        format!("{}", self.kind)
    }

    /// Get a short label for the error.
    #[must_use]
    pub const fn label(&self) -> &str {
        match &self.kind {
            ParseErrorKind::UnexpectedChar(_) => "unexpected character",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::Expected(_) => "expected different token",
            ParseErrorKind::InvalidDate(_) => "invalid date",
            ParseErrorKind::InvalidNumber(_) => "invalid number",
            ParseErrorKind::InvalidUtf8 => "invalid UTF-8",
            ParseErrorKind::UnclosedString => "unclosed string",
            ParseErrorKind::IndentationError => "indentation error",
            ParseErrorKind::SyntaxError(_) => "parse error",
            ParseErrorKind::MissingAccount => "expected account name",
            ParseErrorKind::MissingAmount => "expected amount",
            ParseErrorKind::MissingCurrency => "expected currency",
            ParseErrorKind::MissingDirective => "expected directive",
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.kind)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({ctx})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Kinds of parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Unexpected character in input.
    #[error("syntax error: unexpected '{0}'")]
    UnexpectedChar(char),
    /// Unexpected end of file.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// Expected a specific token.
    #[error("expected {0}")]
    Expected(String),
    /// Invalid date, such as month 13 or day 32.
    #[error("invalid date '{0}'")]
    InvalidDate(String),
    /// Number text that does not fit a decimal.
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    /// Bytes that are not valid UTF-8.
    #[error("invalid UTF-8 byte sequence")]
    InvalidUtf8,
    /// Unclosed string literal.
    #[error("unclosed string literal")]
    UnclosedString,
    /// Indented line where a directive was expected.
    #[error("indentation error")]
    IndentationError,
    /// Generic syntax error.
    #[error("parse error: {0}")]
    SyntaxError(String),
    /// Missing account name (e.g., after 'open' keyword).
    #[error("expected account name")]
    MissingAccount,
    /// Missing amount.
    #[error("expected amount")]
    MissingAmount,
    /// Missing currency after number.
    #[error("expected currency after number")]
    MissingCurrency,
    /// Missing directive after date.
    #[error("expected directive after date")]
    MissingDirective,
}

impl ParseErrorKind {
    /// Returns true for the kinds the tokenizer raises.
    #[must_use]
    pub const fn is_lexical(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedChar(_)
                | Self::UnclosedString
                | Self::InvalidDate(_)
                | Self::InvalidNumber(_)
                | Self::InvalidUtf8
        )
    }
}

/// Errors returned by a [`Session`](crate::Session).
#[derive(Debug, Error)]
pub enum SessionError {
    /// The input file could not be opened or read.
    #[error("cannot open file '{}': {source}", path.display())]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The tokenizer rejected part of the input.
    #[error("{0}")]
    Lexical(ParseError),

    /// The token stream did not match the grammar.
    #[error("{0}")]
    Syntax(ParseError),

    /// A run is already open on this session.
    #[error("a parse session is already open")]
    AlreadyOpen,
}

impl SessionError {
    /// The underlying parse error, if any.
    #[must_use]
    pub const fn parse_error(&self) -> Option<&ParseError> {
        match self {
            Self::Lexical(e) | Self::Syntax(e) => Some(e),
            Self::Io { .. } | Self::AlreadyOpen => None,
        }
    }
}

impl From<ParseError> for SessionError {
    fn from(err: ParseError) -> Self {
        if err.is_lexical() {
            Self::Lexical(err)
        } else {
            Self::Syntax(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: usize) -> Location {
        Location::new("test.beancount", line)
    }

    #[test]
    fn test_parse_error_new() {
        let err = ParseError::new(ParseErrorKind::UnexpectedEof, at(3), Span::new(0, 5));
        assert_eq!(err.line(), 3);
        assert!(err.context.is_none());
        assert!(err.hint.is_none());
    }

    #[test]
    fn test_parse_error_with_context_and_hint() {
        let err = ParseError::new(ParseErrorKind::UnexpectedEof, at(1), Span::new(0, 5))
            .with_context("in transaction")
            .with_hint("add more input");
        assert_eq!(err.context, Some("in transaction".to_string()));
        assert_eq!(err.hint, Some("add more input".to_string()));
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(ParseErrorKind::MissingAccount, at(7), Span::new(0, 5))
            .with_context("open directive");
        assert_eq!(
            err.to_string(),
            "test.beancount:7: expected account name (open directive)"
        );
    }

    #[test]
    fn test_lexical_split() {
        assert!(ParseErrorKind::UnclosedString.is_lexical());
        assert!(ParseErrorKind::UnexpectedChar('$').is_lexical());
        assert!(ParseErrorKind::InvalidUtf8.is_lexical());
        assert!(ParseErrorKind::InvalidDate("2024-13-01".to_string()).is_lexical());
        assert!(!ParseErrorKind::MissingDirective.is_lexical());
        assert!(!ParseErrorKind::Expected("EOL".to_string()).is_lexical());
    }

    #[test]
    fn test_session_error_from_parse_error() {
        let lexical = ParseError::new(ParseErrorKind::UnclosedString, at(2), Span::new(0, 1));
        assert!(matches!(
            SessionError::from(lexical),
            SessionError::Lexical(_)
        ));

        let syntax = ParseError::new(ParseErrorKind::MissingDirective, at(2), Span::new(0, 1));
        let err = SessionError::from(syntax);
        assert!(matches!(err, SessionError::Syntax(_)));
        assert_eq!(err.parse_error().map(ParseError::line), Some(2));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = SessionError::Io {
            path: PathBuf::from("/no/such/ledger.beancount"),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("/no/such/ledger.beancount"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_labels() {
        let kinds = [
            ParseErrorKind::UnexpectedChar('x'),
            ParseErrorKind::UnexpectedEof,
            ParseErrorKind::Expected("foo".to_string()),
            ParseErrorKind::InvalidDate("bad".to_string()),
            ParseErrorKind::InvalidNumber("nan".to_string()),
            ParseErrorKind::InvalidUtf8,
            ParseErrorKind::UnclosedString,
            ParseErrorKind::IndentationError,
            ParseErrorKind::SyntaxError("oops".to_string()),
            ParseErrorKind::MissingAccount,
            ParseErrorKind::MissingAmount,
            ParseErrorKind::MissingCurrency,
            ParseErrorKind::MissingDirective,
        ];

        for kind in kinds {
            let err = ParseError::new(kind, at(1), Span::new(0, 1));
            assert!(!err.label().is_empty());
            assert!(err.kind_code() > 0);
        }
    }
}
