//! Token kinds and the located tokens handed out by the tokenizer.
//!
//! [`TokenKind`] doubles as the Logos DFA definition. A few kinds are never
//! produced by Logos itself: [`TokenKind::Indent`] and [`TokenKind::End`] are
//! synthesized by the [`Tokenizer`](crate::Tokenizer), and
//! [`TokenKind::Comment`] is trivia that the tokenizer drops.

use chrono::NaiveDate;
use logos::Logos;
use rust_decimal::Decimal;
use std::fmt;

use crate::location::Location;
use crate::span::Span;

/// Token types recognized by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t]+")] // Skip horizontal whitespace (spaces and tabs)
pub enum TokenKind {
    // ===== Literals =====
    /// A date in YYYY-MM-DD or YYYY/MM/DD format.
    #[regex(r"\d{4}[-/]\d{2}[-/]\d{2}")]
    Date,

    /// A number with optional sign, thousands separators, and decimals.
    /// Examples: 123, -456, 1,234.56, 1234.5678
    #[regex(r"-?(\d{1,3}(,\d{3})*|\d+)(\.\d+)?")]
    Number,

    /// A double-quoted string, possibly spanning lines.
    /// The slice includes the quotes.
    #[regex(r#""([^"\\]|\\.)*""#)]
    String,

    /// An account name like Assets:Bank:Checking.
    #[regex(r"[A-Z][A-Za-z0-9-]*(:[A-Z0-9][A-Za-z0-9-]*)+")]
    Account,

    /// A currency/commodity code like USD, EUR, AAPL, BTC.
    /// At least two characters, so single-letter flags stay flags.
    #[regex(r"[A-Z][A-Z0-9'._-]+")]
    Currency,

    /// A tag like #tag-name.
    #[regex(r"#[a-zA-Z0-9_/.-]+")]
    Tag,

    /// A link like ^link-name.
    #[regex(r"\^[a-zA-Z0-9_/.-]+")]
    Link,

    /// A metadata key (identifier starting lowercase, followed by colon).
    /// The slice includes the trailing colon.
    #[regex(r"[a-z][a-zA-Z0-9_-]*:")]
    Key,

    // ===== Keywords =====
    /// The `txn` keyword for transactions.
    #[token("txn")]
    Txn,
    /// The `balance` directive keyword.
    #[token("balance")]
    Balance,
    /// The `open` directive keyword.
    #[token("open")]
    Open,
    /// The `close` directive keyword.
    #[token("close")]
    Close,
    /// The `commodity` directive keyword.
    #[token("commodity")]
    Commodity,
    /// The `pad` directive keyword.
    #[token("pad")]
    Pad,
    /// The `event` directive keyword.
    #[token("event")]
    Event,
    /// The `query` directive keyword.
    #[token("query")]
    Query,
    /// The `note` directive keyword.
    #[token("note")]
    Note,
    /// The `document` directive keyword.
    #[token("document")]
    Document,
    /// The `price` directive keyword.
    #[token("price")]
    Price,
    /// The `custom` directive keyword.
    #[token("custom")]
    Custom,
    /// The `option` directive keyword.
    #[token("option")]
    Option_,
    /// The `include` directive keyword.
    #[token("include")]
    Include,
    /// The `plugin` directive keyword.
    #[token("plugin")]
    Plugin,
    /// The `pushtag` directive keyword.
    #[token("pushtag")]
    Pushtag,
    /// The `poptag` directive keyword.
    #[token("poptag")]
    Poptag,
    /// The `pushmeta` directive keyword.
    #[token("pushmeta")]
    Pushmeta,
    /// The `popmeta` directive keyword.
    #[token("popmeta")]
    Popmeta,
    /// The `TRUE` boolean literal.
    #[token("TRUE")]
    True,
    /// The `FALSE` boolean literal.
    #[token("FALSE")]
    False,
    /// The `NULL` literal.
    #[token("NULL")]
    Null,

    // ===== Punctuation =====
    /// Double left brace `{{` for total cost specifications.
    #[token("{{")]
    LDoubleBrace,
    /// Double right brace `}}`.
    #[token("}}")]
    RDoubleBrace,
    /// Brace-hash `{#` for total cost specifications.
    #[token("{#")]
    LBraceHash,
    /// Left brace `{` for cost specifications.
    #[token("{")]
    LBrace,
    /// Right brace `}`.
    #[token("}")]
    RBrace,
    /// Left parenthesis `(` for expressions.
    #[token("(")]
    LParen,
    /// Right parenthesis `)`.
    #[token(")")]
    RParen,
    /// Double at-sign `@@` for total price.
    #[token("@@")]
    AtAt,
    /// At-sign `@` for unit price.
    #[token("@")]
    At,
    /// Colon `:` separator.
    #[token(":")]
    Colon,
    /// Comma `,` separator.
    #[token(",")]
    Comma,
    /// Tilde `~` for tolerance.
    #[token("~")]
    Tilde,
    /// Plus `+` operator.
    #[token("+")]
    Plus,
    /// Minus `-` operator.
    #[token("-")]
    Minus,
    /// Star `*` for cleared transactions, multiplication, and cost merge.
    #[token("*")]
    Star,
    /// Slash `/` for division.
    #[token("/")]
    Slash,
    /// Hash `#` separating per-unit and total cost.
    #[token("#")]
    Hash,

    // ===== Transaction Flags =====
    /// Pending flag `!`.
    #[token("!")]
    Pending,

    /// Other transaction flags: P S T C U R M ? % &
    #[regex(r"[PSTCURM?%&]")]
    Flag,

    // ===== Structural =====
    /// End of a line.
    #[regex(r"\r?\n")]
    Eol,

    /// A comment starting with semicolon. Dropped by the tokenizer.
    #[regex(r";[^\n\r]*")]
    Comment,

    /// Leading whitespace before the first token of a line.
    Indent,

    /// End of input.
    End,
}

impl TokenKind {
    /// The upper-case grammar name of this kind, as shown to tooling.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Date => "DATE",
            Self::Number => "NUMBER",
            Self::String => "STRING",
            Self::Account => "ACCOUNT",
            Self::Currency => "CURRENCY",
            Self::Tag => "TAG",
            Self::Link => "LINK",
            Self::Key => "KEY",
            Self::Txn => "TXN",
            Self::Balance => "BALANCE",
            Self::Open => "OPEN",
            Self::Close => "CLOSE",
            Self::Commodity => "COMMODITY",
            Self::Pad => "PAD",
            Self::Event => "EVENT",
            Self::Query => "QUERY",
            Self::Note => "NOTE",
            Self::Document => "DOCUMENT",
            Self::Price => "PRICE",
            Self::Custom => "CUSTOM",
            Self::Option_ => "OPTION",
            Self::Include => "INCLUDE",
            Self::Plugin => "PLUGIN",
            Self::Pushtag => "PUSHTAG",
            Self::Poptag => "POPTAG",
            Self::Pushmeta => "PUSHMETA",
            Self::Popmeta => "POPMETA",
            Self::True | Self::False => "BOOL",
            Self::Null => "NONE",
            Self::LDoubleBrace => "LCURLCURL",
            Self::RDoubleBrace => "RCURLCURL",
            Self::LBraceHash => "LCURLHASH",
            Self::LBrace => "LCURL",
            Self::RBrace => "RCURL",
            Self::LParen => "LPAREN",
            Self::RParen => "RPAREN",
            Self::AtAt => "ATAT",
            Self::At => "AT",
            Self::Colon => "COLON",
            Self::Comma => "COMMA",
            Self::Tilde => "TILDE",
            Self::Plus => "PLUS",
            Self::Minus => "MINUS",
            Self::Star => "ASTERISK",
            Self::Slash => "SLASH",
            Self::Hash => "HASH",
            Self::Pending | Self::Flag => "FLAG",
            Self::Eol => "EOL",
            Self::Comment => "COMMENT",
            Self::Indent => "INDENT",
            Self::End => "END",
        }
    }

    /// Returns true if this kind can flag a transaction or posting.
    #[must_use]
    pub const fn is_flag(self) -> bool {
        matches!(self, Self::Star | Self::Pending | Self::Flag)
    }

    /// Returns true if this kind ends a line.
    #[must_use]
    pub const fn is_line_end(self) -> bool {
        matches!(self, Self::Eol | Self::End)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded value of a payload-carrying token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// A calendar date.
    Date(NaiveDate),
    /// A decimal number, thousands separators removed.
    Number(Decimal),
    /// String contents with escapes resolved.
    String(String),
    /// An account name.
    Account(String),
    /// A currency code.
    Currency(String),
    /// A tag name without `#`.
    Tag(String),
    /// A link name without `^`.
    Link(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{d}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Account(s) | Self::Currency(s) | Self::Tag(s) | Self::Link(s) => {
                write!(f, "{s}")
            }
        }
    }
}

/// A classified, located unit of lexical input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// The exact source text.
    pub raw_text: String,
    /// Decoded value, for dates, numbers, strings, accounts, currencies, tags and links.
    pub literal: Option<Literal>,
    /// Where the token starts.
    pub location: Location,
    /// Byte range in the source.
    pub span: Span,
}

impl Token {
    /// Create a token without a literal.
    #[must_use]
    pub fn new(kind: TokenKind, raw_text: impl Into<String>, location: Location, span: Span) -> Self {
        Self {
            kind,
            raw_text: raw_text.into(),
            literal: None,
            location,
            span,
        }
    }

    /// The END token at `location`.
    #[must_use]
    pub fn end(location: Location, offset: usize) -> Self {
        Self::new(TokenKind::End, "", location, Span::new(offset, offset))
    }

    /// A zero-width token of `kind` at `location`, for hand-built streams.
    #[must_use]
    pub fn synthetic(kind: TokenKind, location: Location) -> Self {
        Self::new(kind, "", location, Span::default())
    }

    /// Attach a decoded literal.
    #[must_use]
    pub fn with_literal(mut self, literal: Literal) -> Self {
        self.literal = Some(literal);
        self
    }

    /// The upper-case grammar name of this token's kind.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    /// The reported line of the token's first character.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.location.line
    }

    /// Returns true for the END token.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::End
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.kind_name(), self.line(), self.raw_text)?;
        if let Some(literal) = &self.literal {
            write!(f, " {literal}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        TokenKind::lexer(source).map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_lex_date() {
        assert_eq!(kinds("2024-01-15"), vec![TokenKind::Date]);
        assert_eq!(kinds("2024/01/15"), vec![TokenKind::Date]);
    }

    #[test]
    fn test_lex_number() {
        assert_eq!(kinds("1234.56"), vec![TokenKind::Number]);
        assert_eq!(kinds("-1,234.56"), vec![TokenKind::Number]);
    }

    #[test]
    fn test_lex_account_and_currency() {
        assert_eq!(kinds("Assets:Bank:Checking"), vec![TokenKind::Account]);
        assert_eq!(kinds("USD"), vec![TokenKind::Currency]);
        assert_eq!(kinds("P"), vec![TokenKind::Flag]);
    }

    #[test]
    fn test_lex_keywords_beat_currency() {
        assert_eq!(
            kinds("TRUE FALSE NULL txn"),
            vec![
                TokenKind::True,
                TokenKind::False,
                TokenKind::Null,
                TokenKind::Txn
            ]
        );
    }

    #[test]
    fn test_lex_tag_link_key() {
        assert_eq!(
            kinds("#my-tag ^my-link filename:"),
            vec![TokenKind::Tag, TokenKind::Link, TokenKind::Key]
        );
    }

    #[test]
    fn test_lex_punctuation() {
        assert_eq!(
            kinds("{ } {{ }} {# @ @@ , ~ #"),
            vec![
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LDoubleBrace,
                TokenKind::RDoubleBrace,
                TokenKind::LBraceHash,
                TokenKind::At,
                TokenKind::AtAt,
                TokenKind::Comma,
                TokenKind::Tilde,
                TokenKind::Hash,
            ]
        );
    }

    #[test]
    fn test_lex_multiline_string() {
        assert_eq!(kinds("\"line one\nline two\""), vec![TokenKind::String]);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(TokenKind::Date.name(), "DATE");
        assert_eq!(TokenKind::Pending.name(), "FLAG");
        assert_eq!(TokenKind::Eol.to_string(), "EOL");
    }
}
