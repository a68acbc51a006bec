//! Pull-based tokenizer.
//!
//! The Logos DFA in [`TokenKind`] recognizes single lexemes; this module adds
//! the line-oriented parts of the syntax on top of it:
//!
//! - an INDENT token before the first token of an indented line,
//! - EOL tokens and line counting (including newlines inside strings),
//! - trivia lines: comment-only lines and lines starting at column 0 with
//!   `*`, `#` or `:` (org-mode headings, shebangs, emacs modelines),
//! - decoding of literal payloads,
//! - reporting bytes that are not valid UTF-8 at the line they occur on.
//!
//! The lexer is rebuilt on the unconsumed tail for each call, so callers can
//! stop after any token and resume later.

use std::str::FromStr;

use chrono::NaiveDate;
use logos::Logos;
use rust_decimal::Decimal;
use tracing::trace;

use crate::error::{ParseError, ParseErrorKind};
use crate::location::{Location, LocationTracker};
use crate::span::Span;
use crate::token::{Literal, Token, TokenKind};

/// Converts source text into located tokens, one at a time.
#[derive(Debug)]
pub struct Tokenizer {
    source: String,
    pos: usize,
    len: usize,
    at_line_start: bool,
    finished: bool,
    debug: bool,
    tracker: LocationTracker,
    /// Offsets of U+FFFD characters standing in for invalid input bytes.
    invalid: Vec<usize>,
}

impl Tokenizer {
    /// Create a tokenizer over `source`, reporting locations under `filename`.
    #[must_use]
    pub fn new(filename: &str, source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            len: source.len(),
            source,
            pos: 0,
            at_line_start: true,
            finished: false,
            debug: false,
            tracker: LocationTracker::new(filename),
            invalid: Vec::new(),
        }
    }

    /// Create a tokenizer over raw file contents.
    ///
    /// Invalid UTF-8 does not fail construction. Each bad sequence is
    /// reported as an [`InvalidUtf8`](ParseErrorKind::InvalidUtf8) error when
    /// the tokenizer reaches it, so everything before it still tokenizes.
    #[must_use]
    pub fn from_bytes(filename: &str, bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(source) => Self::new(filename, source),
            Err(err) => {
                let (source, invalid) = replace_invalid(err.as_bytes());
                let mut tokenizer = Self::new(filename, source);
                tokenizer.invalid = invalid;
                tokenizer
            }
        }
    }

    /// Add `offset` to every reported line.
    #[must_use]
    pub fn with_first_line(mut self, offset: usize) -> Self {
        self.tracker.set_first_line(offset);
        self
    }

    /// Emit a trace event for every token.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The location of the next unread character.
    #[must_use]
    pub fn location(&self) -> Location {
        self.tracker.current()
    }

    /// The name locations are reported under.
    #[must_use]
    pub fn filename(&self) -> &str {
        self.tracker.filename()
    }

    /// Returns true once END has been produced.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Produce the next token.
    ///
    /// After END every call returns END again. On a lexical error the
    /// offending text has already been skipped, so calling again resumes
    /// with the following input.
    ///
    /// # Errors
    ///
    /// Returns a lexical [`ParseError`] for unrecognized characters, invalid
    /// UTF-8, unterminated strings, impossible dates and unrepresentable
    /// numbers.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        let result = self.scan();
        if self.debug {
            match &result {
                Ok(token) => trace!(
                    kind = token.kind_name(),
                    line = token.line(),
                    text = %token.raw_text,
                    "token"
                ),
                Err(err) => trace!(error = %err, "lexical error"),
            }
        }
        result
    }

    fn scan(&mut self) -> Result<Token, ParseError> {
        loop {
            if self.finished {
                return Ok(Token::end(self.tracker.current(), self.len));
            }

            if self.at_line_start {
                self.at_line_start = false;
                if let Some(indent) = self.line_prefix()? {
                    return Ok(indent);
                }
                if self.at_line_start {
                    // A trivia line was swallowed.
                    continue;
                }
            }

            let rest = &self.source[self.pos..];
            let mut lex = TokenKind::lexer(rest);
            let Some(result) = lex.next() else {
                return Ok(self.finish());
            };
            let range = lex.span();
            let start = self.pos + range.start;
            let end = self.pos + range.end;

            let kind = match result {
                Ok(kind) => kind,
                Err(()) => return Err(self.skip_invalid(start)),
            };
            if let Some(at) = self.invalid_within(start, end) {
                return Err(self.reject_invalid(start, end, at));
            }

            let location = self.tracker.current();
            let span = Span::new(start, end);
            let raw = span.text(&self.source);
            self.pos = end;

            match kind {
                TokenKind::Comment => continue,
                TokenKind::Eol => {
                    self.tracker.advance_line(1);
                    self.at_line_start = true;
                    return Ok(Token::new(kind, raw, location, span));
                }
                _ => {}
            }

            let literal = match decode(kind, raw) {
                Ok(literal) => literal,
                Err(err_kind) => {
                    self.tracker.advance_line(count_newlines(raw));
                    return Err(ParseError::new(err_kind, location, span));
                }
            };
            let mut token = Token::new(kind, raw, location, span);
            token.literal = literal;
            // Multi-line strings report their start line.
            self.tracker.advance_line(count_newlines(&token.raw_text));
            return Ok(token);
        }
    }

    /// Handle the beginning of a line.
    ///
    /// Returns an INDENT token when the line is indented and has content.
    /// Trivia lines are consumed whole, leaving `at_line_start` set.
    fn line_prefix(&mut self) -> Result<Option<Token>, ParseError> {
        let rest = &self.source[self.pos..];

        if rest.starts_with(['*', '#', ':']) {
            self.skip_line()?;
            return Ok(None);
        }

        let width = rest
            .bytes()
            .take_while(|b| *b == b' ' || *b == b'\t')
            .count();
        let after = &rest[width..];

        if after.starts_with(';') {
            self.skip_line()?;
            return Ok(None);
        }
        if width == 0 || after.is_empty() || after.starts_with(['\n', '\r']) {
            return Ok(None);
        }

        let span = Span::new(self.pos, self.pos + width);
        let token = Token::new(
            TokenKind::Indent,
            &rest[..width],
            self.tracker.current(),
            span,
        );
        self.pos += width;
        Ok(Some(token))
    }

    /// Consume through the end of the current line, newline included.
    fn skip_line(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let end = self.source[start..]
            .find('\n')
            .map_or(self.len, |idx| start + idx + 1);
        if let Some(at) = self.invalid_within(start, end) {
            return Err(self.reject_invalid(start, end, at));
        }
        self.pos = end;
        if self.source[..end].ends_with('\n') {
            self.tracker.advance_line(1);
            self.at_line_start = true;
        }
        Ok(())
    }

    /// The first replaced byte sequence in `start..end`, if any.
    fn invalid_within(&self, start: usize, end: usize) -> Option<usize> {
        let idx = self.invalid.partition_point(|&at| at < start);
        self.invalid.get(idx).copied().filter(|&at| at < end)
    }

    /// Skip `start..end`, which contains invalid input at `at`, and build
    /// the error located on the line of `at`.
    fn reject_invalid(&mut self, start: usize, end: usize, at: usize) -> ParseError {
        let mut location = self.tracker.current();
        location.line += count_newlines(&self.source[start..at]);

        self.tracker.advance_line(count_newlines(&self.source[start..end]));
        self.at_line_start = self.source[..end].ends_with('\n');
        self.pos = end;

        ParseError::new(
            ParseErrorKind::InvalidUtf8,
            location,
            Span::new(at, at + char::REPLACEMENT_CHARACTER.len_utf8()),
        )
        .with_hint("save the file as UTF-8")
    }

    /// Build the error for unlexable input at `start` and move past it.
    fn skip_invalid(&mut self, start: usize) -> ParseError {
        if self.invalid_within(start, start + 1).is_some() {
            let end = start + char::REPLACEMENT_CHARACTER.len_utf8();
            return self.reject_invalid(start, end, start);
        }

        let location = self.tracker.current();
        let rest = &self.source[start..];

        if rest.starts_with('"') {
            // Nothing after an unterminated quote can be trusted.
            self.tracker.advance_line(count_newlines(rest));
            self.pos = self.len;
            return ParseError::new(
                ParseErrorKind::UnclosedString,
                location,
                Span::new(start, self.len),
            )
            .with_hint("add a closing '\"'");
        }

        let ch = rest.chars().next().unwrap_or('\0');
        let end = start + ch.len_utf8().max(1);
        self.pos = end.min(self.len);
        ParseError::new(
            ParseErrorKind::UnexpectedChar(ch),
            location,
            Span::new(start, self.pos),
        )
    }

    /// Produce END and release the source buffer.
    fn finish(&mut self) -> Token {
        self.finished = true;
        self.source = String::new();
        self.invalid = Vec::new();
        self.pos = 0;
        Token::end(self.tracker.current(), self.len)
    }
}

/// Decode `bytes`, replacing each invalid sequence with U+FFFD and recording
/// the offset of every replacement.
fn replace_invalid(mut bytes: &[u8]) -> (String, Vec<usize>) {
    let mut text = String::with_capacity(bytes.len());
    let mut invalid = Vec::new();
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                text.push_str(valid);
                return (text, invalid);
            }
            Err(err) => {
                let (valid, rest) = bytes.split_at(err.valid_up_to());
                text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                invalid.push(text.len());
                text.push(char::REPLACEMENT_CHARACTER);
                bytes = &rest[err.error_len().unwrap_or(rest.len())..];
            }
        }
    }
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}

/// Decode the payload of a literal-carrying token.
fn decode(kind: TokenKind, raw: &str) -> Result<Option<Literal>, ParseErrorKind> {
    let literal = match kind {
        TokenKind::Date => Literal::Date(parse_date(raw)?),
        TokenKind::Number => {
            let clean: String = raw.chars().filter(|&c| c != ',').collect();
            let number = Decimal::from_str(&clean)
                .map_err(|_| ParseErrorKind::InvalidNumber(raw.to_string()))?;
            Literal::Number(number)
        }
        TokenKind::String => Literal::String(unescape(&raw[1..raw.len() - 1])),
        TokenKind::Account => Literal::Account(raw.to_string()),
        TokenKind::Currency => Literal::Currency(raw.to_string()),
        TokenKind::Tag => Literal::Tag(raw[1..].to_string()),
        TokenKind::Link => Literal::Link(raw[1..].to_string()),
        _ => return Ok(None),
    };
    Ok(Some(literal))
}

/// Parse `YYYY-MM-DD` or `YYYY/MM/DD`.
fn parse_date(raw: &str) -> Result<NaiveDate, ParseErrorKind> {
    let invalid = || ParseErrorKind::InvalidDate(raw.to_string());
    let mut parts = raw.split(['-', '/']);
    let mut field = || parts.next().ok_or_else(invalid);
    let y: i32 = field()?.parse().map_err(|_| invalid())?;
    let m: u32 = field()?.parse().map_err(|_| invalid())?;
    let d: u32 = field()?.parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid)
}

/// Resolve `\n \t \r \\ \"`; other escapes are kept verbatim.
fn unescape(inner: &str) -> String {
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}
