//! Recursive-descent grammar driver.
//!
//! Pulls tokens from a [`TokenSource`] with one token of lookahead and
//! reports each construct to a [`Builder`] as soon as its line is complete.
//! A header line is only reported after its end of line has been checked, so
//! an error on a line never produces a builder call for that line.
//!
//! The first error stops the run. There is no recovery.

use beanlex_core::{
    Amount, Balance, Close, Commodity, CostSpec, Custom, Decimal, Document, Event,
    IncompleteAmount, MetaValue, NaiveDate, Note, Open, Pad, Posting, Price, PriceAnnotation,
    Query, Transaction,
};
use std::str::FromStr;
use tracing::trace;

use crate::builder::Builder;
use crate::error::{ParseError, ParseErrorKind};
use crate::location::Location;
use crate::source::TokenSource;
use crate::token::{Literal, Token, TokenKind};

type Result<T> = std::result::Result<T, ParseError>;

/// Drives a token stream through the ledger grammar.
pub struct GrammarDriver<'s, S: TokenSource + ?Sized> {
    source: &'s mut S,
    peeked: Option<Token>,
    debug: bool,
}

impl<'s, S: TokenSource + ?Sized> GrammarDriver<'s, S> {
    /// Create a driver reading from `source`.
    pub fn new(source: &'s mut S) -> Self {
        Self {
            source,
            peeked: None,
            debug: false,
        }
    }

    /// Emit a trace event for every reduced construct.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Consume tokens until END, reporting constructs to `builder`.
    ///
    /// # Errors
    ///
    /// Returns the first lexical or syntax error. The builder's
    /// [`error`](Builder::error) method is called with it first.
    pub fn run<B: Builder + ?Sized>(&mut self, builder: &mut B) -> Result<()> {
        let result = self.file(builder);
        if let Err(err) = &result {
            if self.debug {
                trace!(error = %err, "parse stopped");
            }
            builder.error(err);
        }
        result
    }

    // ===== Token plumbing =====

    fn peek(&mut self) -> Result<&Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.source.next_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    fn peek_kind(&mut self) -> Result<TokenKind> {
        Ok(self.peek()?.kind)
    }

    fn bump(&mut self) -> Result<Token> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.source.next_token(),
        }
    }

    /// An error located at the lookahead token.
    fn unexpected(&mut self, kind: ParseErrorKind) -> ParseError {
        match self.peek() {
            Ok(token) => error_at(token, kind),
            Err(err) => err,
        }
    }

    fn expect(&mut self, kind: TokenKind, err: ParseErrorKind) -> Result<Token> {
        if self.peek_kind()? == kind {
            self.bump()
        } else {
            Err(self.unexpected(err))
        }
    }

    fn string(&mut self, what: &str) -> Result<String> {
        self.expect(TokenKind::String, ParseErrorKind::Expected(what.to_string()))
            .map(text)
    }

    fn account(&mut self) -> Result<String> {
        self.expect(TokenKind::Account, ParseErrorKind::MissingAccount)
            .map(text)
    }

    fn currency(&mut self) -> Result<String> {
        self.expect(TokenKind::Currency, ParseErrorKind::MissingCurrency)
            .map(text)
    }

    fn end_of_line(&mut self, construct: &str) -> Result<()> {
        match self.peek_kind()? {
            TokenKind::Eol => self.bump().map(drop),
            TokenKind::End => Ok(()),
            _ => Err(self.unexpected(ParseErrorKind::Expected(format!(
                "end of line after {construct}"
            )))),
        }
    }

    fn reduced(&self, construct: &str, loc: &Location) {
        if self.debug {
            trace!(construct, file = %loc.filename, line = loc.line, "reduce");
        }
    }

    // ===== File structure =====

    fn file<B: Builder + ?Sized>(&mut self, b: &mut B) -> Result<()> {
        loop {
            match self.peek_kind()? {
                TokenKind::End => return Ok(()),
                TokenKind::Eol => {
                    self.bump()?;
                }
                TokenKind::Indent => {
                    self.bump()?;
                    if !self.peek_kind()?.is_line_end() {
                        return Err(self.unexpected(ParseErrorKind::IndentationError)
                            .with_hint("only postings and metadata may be indented"));
                    }
                }
                TokenKind::Date => self.dated(b)?,
                _ => self.undated(b)?,
            }
        }
    }

    fn undated<B: Builder + ?Sized>(&mut self, b: &mut B) -> Result<()> {
        let kind = self.peek_kind()?;
        let loc = self.peek()?.location.clone();
        match kind {
            TokenKind::Option_ => {
                self.bump()?;
                let key = self.string("option name")?;
                let value = self.string("option value")?;
                self.end_of_line("option")?;
                self.reduced("option", &loc);
                b.option(loc, key, value);
            }
            TokenKind::Include => {
                self.bump()?;
                let path = self.string("include path")?;
                self.end_of_line("include")?;
                self.reduced("include", &loc);
                b.include(loc, path);
            }
            TokenKind::Plugin => {
                self.bump()?;
                let name = self.string("plugin name")?;
                let config = if self.peek_kind()? == TokenKind::String {
                    Some(self.bump().map(text)?)
                } else {
                    None
                };
                self.end_of_line("plugin")?;
                self.reduced("plugin", &loc);
                b.plugin(loc, name, config);
            }
            TokenKind::Pushtag | TokenKind::Poptag => {
                self.bump()?;
                let tag = self
                    .expect(TokenKind::Tag, ParseErrorKind::Expected("tag".to_string()))
                    .map(text)?;
                if kind == TokenKind::Pushtag {
                    self.end_of_line("pushtag")?;
                    self.reduced("pushtag", &loc);
                    b.pushtag(loc, tag);
                } else {
                    self.end_of_line("poptag")?;
                    self.reduced("poptag", &loc);
                    b.poptag(loc, tag);
                }
            }
            TokenKind::Pushmeta => {
                self.bump()?;
                let key = self.key()?;
                let value = if self.peek_kind()?.is_line_end() {
                    MetaValue::None
                } else {
                    self.value()?
                };
                self.end_of_line("pushmeta")?;
                self.reduced("pushmeta", &loc);
                b.pushmeta(loc, key, value);
            }
            TokenKind::Popmeta => {
                self.bump()?;
                let key = self.key()?;
                self.end_of_line("popmeta")?;
                self.reduced("popmeta", &loc);
                b.popmeta(loc, key);
            }
            _ => return Err(self.unexpected(ParseErrorKind::Expected("directive".to_string()))),
        }
        Ok(())
    }

    fn key(&mut self) -> Result<String> {
        let token = self.expect(
            TokenKind::Key,
            ParseErrorKind::Expected("metadata key".to_string()),
        )?;
        Ok(token.raw_text.trim_end_matches(':').to_string())
    }

    // ===== Dated directives =====

    fn dated<B: Builder + ?Sized>(&mut self, b: &mut B) -> Result<()> {
        let head = self.bump()?;
        let date = date_of(&head)?;
        let loc = head.location;

        let keyword = self.peek_kind()?;
        let is_txn = keyword == TokenKind::Txn || keyword.is_flag();
        if is_txn {
            self.transaction(loc, date, b)?;
            return self.body(true, b);
        }

        match keyword {
            TokenKind::Open => {
                self.bump()?;
                let account = self.account()?;
                let mut currencies = Vec::new();
                if self.peek_kind()? == TokenKind::Currency {
                    currencies.push(self.currency()?);
                    while self.peek_kind()? == TokenKind::Comma {
                        self.bump()?;
                        currencies.push(self.currency()?);
                    }
                }
                let mut open = Open::new(date, account).with_currencies(currencies);
                if self.peek_kind()? == TokenKind::String {
                    open = open.with_booking(self.bump().map(text)?);
                }
                self.end_of_line("open")?;
                self.reduced("open", &loc);
                b.open(loc, open);
            }
            TokenKind::Close => {
                self.bump()?;
                let account = self.account()?;
                self.end_of_line("close")?;
                self.reduced("close", &loc);
                b.close(loc, Close::new(date, account));
            }
            TokenKind::Commodity => {
                self.bump()?;
                let currency = self.currency()?;
                self.end_of_line("commodity")?;
                self.reduced("commodity", &loc);
                b.commodity(loc, Commodity::new(date, currency));
            }
            TokenKind::Pad => {
                self.bump()?;
                let account = self.account()?;
                let source = self.account()?;
                self.end_of_line("pad")?;
                self.reduced("pad", &loc);
                b.pad(loc, Pad::new(date, account, source));
            }
            TokenKind::Balance => {
                self.bump()?;
                let account = self.account()?;
                if !starts_expr(self.peek_kind()?) {
                    return Err(self.unexpected(ParseErrorKind::MissingAmount));
                }
                let number = self.expr()?;
                let tolerance = if self.peek_kind()? == TokenKind::Tilde {
                    self.bump()?;
                    Some(self.expr()?)
                } else {
                    None
                };
                let currency = self.currency()?;
                let mut balance = Balance::new(date, account, Amount::new(number, currency));
                if let Some(tolerance) = tolerance {
                    balance = balance.with_tolerance(tolerance);
                }
                self.end_of_line("balance")?;
                self.reduced("balance", &loc);
                b.balance(loc, balance);
            }
            TokenKind::Event => {
                self.bump()?;
                let event_type = self.string("event type")?;
                let value = self.string("event value")?;
                self.end_of_line("event")?;
                self.reduced("event", &loc);
                b.event(loc, Event::new(date, event_type, value));
            }
            TokenKind::Query => {
                self.bump()?;
                let name = self.string("query name")?;
                let query = self.string("query string")?;
                self.end_of_line("query")?;
                self.reduced("query", &loc);
                b.query(loc, Query::new(date, name, query));
            }
            TokenKind::Note => {
                self.bump()?;
                let account = self.account()?;
                let comment = self.string("note text")?;
                self.end_of_line("note")?;
                self.reduced("note", &loc);
                b.note(loc, Note::new(date, account, comment));
            }
            TokenKind::Document => {
                self.bump()?;
                let account = self.account()?;
                let path = self.string("document path")?;
                let mut document = Document::new(date, account, path);
                loop {
                    match self.peek_kind()? {
                        TokenKind::Tag => document.tags.push(self.bump().map(text)?),
                        TokenKind::Link => document.links.push(self.bump().map(text)?),
                        _ => break,
                    }
                }
                self.end_of_line("document")?;
                self.reduced("document", &loc);
                b.document(loc, document);
            }
            TokenKind::Price => {
                self.bump()?;
                let currency = self.currency()?;
                if !starts_expr(self.peek_kind()?) {
                    return Err(self.unexpected(ParseErrorKind::MissingAmount));
                }
                let number = self.expr()?;
                let quote = self.currency()?;
                self.end_of_line("price")?;
                self.reduced("price", &loc);
                b.price(loc, Price::new(date, currency, Amount::new(number, quote)));
            }
            TokenKind::Custom => {
                self.bump()?;
                let mut custom = Custom::new(date, self.string("custom type")?);
                while !self.peek_kind()?.is_line_end() {
                    custom = custom.with_value(self.value()?);
                }
                self.end_of_line("custom")?;
                self.reduced("custom", &loc);
                b.custom(loc, custom);
            }
            _ => return Err(self.unexpected(ParseErrorKind::MissingDirective)),
        }

        self.body(false, b)
    }

    fn transaction<B: Builder + ?Sized>(
        &mut self,
        loc: Location,
        date: NaiveDate,
        b: &mut B,
    ) -> Result<()> {
        let flag_token = self.bump()?;
        let flag = match flag_token.kind {
            TokenKind::Txn => '*',
            _ => flag_token.raw_text.chars().next().unwrap_or('*'),
        };

        let mut strings = Vec::new();
        let mut tags = Vec::new();
        let mut links = Vec::new();
        loop {
            match self.peek_kind()? {
                TokenKind::String if strings.len() == 2 => {
                    return Err(self.unexpected(ParseErrorKind::SyntaxError(
                        "too many strings on transaction header".to_string(),
                    )));
                }
                TokenKind::String => strings.push(self.bump().map(text)?),
                TokenKind::Tag => tags.push(self.bump().map(text)?),
                TokenKind::Link => links.push(self.bump().map(text)?),
                _ => break,
            }
        }
        self.end_of_line("transaction header")?;

        let mut strings = strings.into_iter();
        let (payee, narration) = match (strings.next(), strings.next()) {
            (Some(payee), Some(narration)) => (Some(payee), narration),
            (Some(narration), None) => (None, narration),
            _ => (None, String::new()),
        };

        let mut txn = Transaction::new(date, narration).with_flag(flag);
        txn.payee = payee;
        txn.tags = tags;
        txn.links = links;

        self.reduced("transaction", &loc);
        b.transaction(loc, txn);
        Ok(())
    }

    // ===== Indented lines =====

    fn body<B: Builder + ?Sized>(&mut self, is_txn: bool, b: &mut B) -> Result<()> {
        loop {
            match self.peek_kind()? {
                TokenKind::Eol => {
                    self.bump()?;
                }
                TokenKind::Indent => {
                    self.bump()?;
                    match self.peek_kind()? {
                        TokenKind::Eol | TokenKind::End => {}
                        TokenKind::Key => self.key_value(b)?,
                        TokenKind::Tag | TokenKind::Link if is_txn => self.tags_links(b)?,
                        kind if is_txn && (kind == TokenKind::Account || kind.is_flag()) => {
                            self.posting(b)?;
                        }
                        _ if is_txn => {
                            return Err(self.unexpected(ParseErrorKind::Expected(
                                "posting, metadata, tags or links".to_string(),
                            )))
                        }
                        _ => {
                            return Err(self.unexpected(ParseErrorKind::Expected(
                                "metadata".to_string(),
                            )))
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn key_value<B: Builder + ?Sized>(&mut self, b: &mut B) -> Result<()> {
        let loc = self.peek()?.location.clone();
        let key = self.key()?;
        let value = if self.peek_kind()?.is_line_end() {
            MetaValue::None
        } else {
            self.value()?
        };
        self.end_of_line("metadata")?;
        self.reduced("key_value", &loc);
        b.key_value(loc, key, value);
        Ok(())
    }

    fn tags_links<B: Builder + ?Sized>(&mut self, b: &mut B) -> Result<()> {
        let loc = self.peek()?.location.clone();
        let mut tags = Vec::new();
        let mut links = Vec::new();
        loop {
            match self.peek_kind()? {
                TokenKind::Tag => tags.push(self.bump().map(text)?),
                TokenKind::Link => links.push(self.bump().map(text)?),
                _ => break,
            }
        }
        self.end_of_line("tags and links")?;
        self.reduced("tags_links", &loc);
        b.tags_links(loc, tags, links);
        Ok(())
    }

    fn posting<B: Builder + ?Sized>(&mut self, b: &mut B) -> Result<()> {
        let loc = self.peek()?.location.clone();
        let flag = if self.peek_kind()?.is_flag() {
            self.bump()?.raw_text.chars().next()
        } else {
            None
        };
        let account = self.account()?;

        let mut posting = match self.incomplete_amount()? {
            Some(units) => Posting::with_units(account, units),
            None => Posting::auto(account),
        };
        posting.flag = flag;
        posting.cost = self.cost()?;
        posting.price = self.price_annotation()?;

        self.end_of_line("posting")?;
        self.reduced("posting", &loc);
        b.posting(loc, posting);
        Ok(())
    }

    // ===== Values and amounts =====

    fn value(&mut self) -> Result<MetaValue> {
        let value = match self.peek_kind()? {
            TokenKind::String => MetaValue::String(self.bump().map(text)?),
            TokenKind::True => {
                self.bump()?;
                MetaValue::Bool(true)
            }
            TokenKind::False => {
                self.bump()?;
                MetaValue::Bool(false)
            }
            TokenKind::Null => {
                self.bump()?;
                MetaValue::None
            }
            TokenKind::Account => MetaValue::Account(self.bump().map(text)?),
            TokenKind::Tag => MetaValue::Tag(self.bump().map(text)?),
            TokenKind::Link => MetaValue::Link(self.bump().map(text)?),
            TokenKind::Date => MetaValue::Date(date_of(&self.bump()?)?),
            TokenKind::Currency => MetaValue::Currency(self.bump().map(text)?),
            kind if starts_expr(kind) => {
                let number = self.expr()?;
                if self.peek_kind()? == TokenKind::Currency {
                    MetaValue::Amount(Amount::new(number, self.bump().map(text)?))
                } else {
                    MetaValue::Number(number)
                }
            }
            _ => return Err(self.unexpected(ParseErrorKind::Expected("value".to_string()))),
        };
        Ok(value)
    }

    fn incomplete_amount(&mut self) -> Result<Option<IncompleteAmount>> {
        let kind = self.peek_kind()?;
        if starts_expr(kind) {
            let number = self.expr()?;
            if self.peek_kind()? == TokenKind::Currency {
                let currency = self.bump().map(text)?;
                return Ok(Some(IncompleteAmount::complete(number, currency)));
            }
            return Ok(Some(IncompleteAmount::NumberOnly(number)));
        }
        if kind == TokenKind::Currency {
            return Ok(Some(IncompleteAmount::CurrencyOnly(self.bump().map(text)?)));
        }
        Ok(None)
    }

    fn cost(&mut self) -> Result<Option<CostSpec>> {
        let (closer, total) = match self.peek_kind()? {
            TokenKind::LBrace => (TokenKind::RBrace, false),
            TokenKind::LDoubleBrace => (TokenKind::RDoubleBrace, true),
            TokenKind::LBraceHash => (TokenKind::RBrace, true),
            _ => return Ok(None),
        };
        self.bump()?;

        let mut components = Vec::new();
        loop {
            let kind = self.peek_kind()?;
            if kind == closer {
                self.bump()?;
                break;
            }
            let component = match kind {
                TokenKind::Comma => {
                    self.bump()?;
                    continue;
                }
                TokenKind::Date => CostComponent::Date(date_of(&self.bump()?)?),
                TokenKind::Currency => CostComponent::CurrencyOnly(self.bump().map(text)?),
                TokenKind::String => CostComponent::Label(self.bump().map(text)?),
                TokenKind::Star => {
                    self.bump()?;
                    CostComponent::Merge
                }
                TokenKind::Hash => {
                    self.bump()?;
                    CostComponent::Hash
                }
                // `#5` lexes as a tag; inside braces it is '#' then 5.
                TokenKind::Tag if hash_number(self.peek()?).is_some() => {
                    let token = self.bump()?;
                    let number = hash_number(&token).unwrap_or_default();
                    components.push(CostComponent::Hash);
                    let number = self.term_rest(number)?;
                    let number = self.expr_rest(number)?;
                    self.cost_number(number)?
                }
                kind if starts_expr(kind) => {
                    let number = self.expr()?;
                    self.cost_number(number)?
                }
                _ => {
                    let close = if closer == TokenKind::RBrace { "}" } else { "}}" };
                    return Err(self.unexpected(ParseErrorKind::Expected(format!(
                        "cost component or '{close}'"
                    ))));
                }
            };
            components.push(component);
        }

        Ok(Some(build_cost_spec(components, total)))
    }

    fn cost_number(&mut self, number: Decimal) -> Result<CostComponent> {
        if self.peek_kind()? == TokenKind::Currency {
            return Ok(CostComponent::Amount(number, self.bump().map(text)?));
        }
        Ok(CostComponent::NumberOnly(number))
    }

    fn price_annotation(&mut self) -> Result<Option<PriceAnnotation>> {
        let total = match self.peek_kind()? {
            TokenKind::At => false,
            TokenKind::AtAt => true,
            _ => return Ok(None),
        };
        self.bump()?;
        let annotation = match (total, self.incomplete_amount()?) {
            (false, None) => PriceAnnotation::UnitEmpty,
            (true, None) => PriceAnnotation::TotalEmpty,
            (false, Some(IncompleteAmount::Complete(amount))) => PriceAnnotation::Unit(amount),
            (true, Some(IncompleteAmount::Complete(amount))) => PriceAnnotation::Total(amount),
            (false, Some(partial)) => PriceAnnotation::UnitIncomplete(partial),
            (true, Some(partial)) => PriceAnnotation::TotalIncomplete(partial),
        };
        Ok(Some(annotation))
    }

    // ===== Arithmetic =====

    /// expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Decimal> {
        let left = self.term()?;
        self.expr_rest(left)
    }

    /// The `(('+' | '-') term)*` tail of an expression starting at `left`.
    ///
    /// The tokenizer folds a leading minus into NUMBER, so a negative number
    /// directly after a term (`10 -2`) is a subtraction whose sign is
    /// already part of the right-hand term.
    fn expr_rest(&mut self, mut left: Decimal) -> Result<Decimal> {
        loop {
            let op = self.peek_kind()?;
            let op_token = match op {
                TokenKind::Plus | TokenKind::Minus => self.bump()?,
                TokenKind::Number if self.peek()?.raw_text.starts_with('-') => {
                    self.peek()?.clone()
                }
                _ => return Ok(left),
            };
            let right = self.term()?;
            let result = if op == TokenKind::Minus {
                left.checked_sub(right)
            } else {
                left.checked_add(right)
            };
            left = result.ok_or_else(|| overflow(&op_token))?;
        }
    }

    /// term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Decimal> {
        let left = self.unary()?;
        self.term_rest(left)
    }

    fn term_rest(&mut self, mut left: Decimal) -> Result<Decimal> {
        loop {
            let op = self.peek_kind()?;
            if !matches!(op, TokenKind::Star | TokenKind::Slash) {
                return Ok(left);
            }
            let op_token = self.bump()?;
            let right = self.unary()?;
            left = if op == TokenKind::Star {
                left.checked_mul(right).ok_or_else(|| overflow(&op_token))?
            } else if right.is_zero() {
                return Err(error_at(
                    &op_token,
                    ParseErrorKind::SyntaxError("division by zero".to_string()),
                ));
            } else {
                left.checked_div(right).ok_or_else(|| overflow(&op_token))?
            };
        }
    }

    /// unary := ('+' | '-')* atom
    fn unary(&mut self) -> Result<Decimal> {
        let mut negate = false;
        loop {
            match self.peek_kind()? {
                TokenKind::Plus => {}
                TokenKind::Minus => negate = !negate,
                _ => break,
            }
            self.bump()?;
        }
        let value = self.atom()?;
        Ok(if negate { -value } else { value })
    }

    /// atom := NUMBER | '(' expr ')'
    fn atom(&mut self) -> Result<Decimal> {
        match self.peek_kind()? {
            TokenKind::Number => number_of(&self.bump()?),
            TokenKind::LParen => {
                self.bump()?;
                let value = self.expr()?;
                self.expect(TokenKind::RParen, ParseErrorKind::Expected("')'".to_string()))?;
                Ok(value)
            }
            _ => Err(self.unexpected(ParseErrorKind::Expected("number".to_string()))),
        }
    }
}

/// A single component between cost braces.
#[derive(Debug, Clone)]
enum CostComponent {
    Amount(Decimal, String),
    NumberOnly(Decimal),
    CurrencyOnly(String),
    Date(NaiveDate),
    Label(String),
    Merge,
    Hash,
}

/// Build a `CostSpec` from its components.
///
/// - `{150 USD}` - per-unit cost
/// - `{{150 USD}}` or `{# 150 USD}` - total cost
/// - `{150 # 5 USD}` - per-unit 150, total 5
fn build_cost_spec(components: Vec<CostComponent>, total_brace: bool) -> CostSpec {
    let hash = components
        .iter()
        .position(|c| matches!(c, CostComponent::Hash));

    let mut spec = CostSpec::default();
    for (idx, component) in components.into_iter().enumerate() {
        let is_total = hash.map_or(total_brace, |pos| idx > pos);
        let set_number = |spec: &mut CostSpec, number| {
            if is_total {
                spec.number_total = Some(number);
            } else {
                spec.number_per = Some(number);
            }
        };
        match component {
            CostComponent::Amount(number, currency) => {
                set_number(&mut spec, number);
                spec.currency = Some(currency);
            }
            CostComponent::NumberOnly(number) => set_number(&mut spec, number),
            CostComponent::CurrencyOnly(currency) => {
                if spec.currency.is_none() {
                    spec.currency = Some(currency);
                }
            }
            CostComponent::Date(date) => spec.date = Some(date),
            CostComponent::Label(label) => spec.label = Some(label),
            CostComponent::Merge => spec.merge = true,
            CostComponent::Hash => {}
        }
    }
    spec
}

const fn starts_expr(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Number | TokenKind::LParen | TokenKind::Plus | TokenKind::Minus
    )
}

/// The number in a `#5` tag token, if it spells one.
fn hash_number(token: &Token) -> Option<Decimal> {
    let digits = token.raw_text.strip_prefix('#')?;
    Decimal::from_str(digits).ok()
}

fn error_at(token: &Token, kind: ParseErrorKind) -> ParseError {
    let found = if token.is_end() {
        "found end of file".to_string()
    } else {
        format!("found {}", token.kind_name())
    };
    ParseError::new(kind, token.location.clone(), token.span).with_context(found)
}

fn overflow(op: &Token) -> ParseError {
    error_at(op, ParseErrorKind::SyntaxError("arithmetic overflow".to_string()))
}

/// The decoded text of a token, falling back to its raw text.
fn text(token: Token) -> String {
    match token.literal {
        Some(
            Literal::String(s)
            | Literal::Account(s)
            | Literal::Currency(s)
            | Literal::Tag(s)
            | Literal::Link(s),
        ) => s,
        _ => token.raw_text,
    }
}

fn date_of(token: &Token) -> Result<NaiveDate> {
    match token.literal {
        Some(Literal::Date(date)) => Ok(date),
        _ => Err(error_at(
            token,
            ParseErrorKind::InvalidDate(token.raw_text.clone()),
        )),
    }
}

fn number_of(token: &Token) -> Result<Decimal> {
    if let Some(Literal::Number(number)) = token.literal {
        return Ok(number);
    }
    let clean: String = token.raw_text.chars().filter(|&c| c != ',').collect();
    Decimal::from_str(&clean)
        .map_err(|_| error_at(token, ParseErrorKind::InvalidNumber(token.raw_text.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Construct, ConstructLog};
    use crate::tokenizer::Tokenizer;
    use rust_decimal_macros::dec;

    fn parse(source: &str) -> (ConstructLog, std::result::Result<(), ParseError>) {
        let mut tokenizer = Tokenizer::new("test.beancount", source);
        let mut log = ConstructLog::new();
        let result = GrammarDriver::new(&mut tokenizer).run(&mut log);
        (log, result)
    }

    fn parse_ok(source: &str) -> ConstructLog {
        let (log, result) = parse(source);
        result.unwrap();
        log
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_option_include_plugin() {
        let log = parse_ok(
            "option \"title\" \"Home\"\ninclude \"other.beancount\"\nplugin \"auto\" \"cfg\"\nplugin \"bare\"\n",
        );
        assert_eq!(
            log.entries.iter().map(|(_, c)| c.clone()).collect::<Vec<_>>(),
            vec![
                Construct::Option {
                    key: "title".into(),
                    value: "Home".into()
                },
                Construct::Include {
                    path: "other.beancount".into()
                },
                Construct::Plugin {
                    name: "auto".into(),
                    config: Some("cfg".into())
                },
                Construct::Plugin {
                    name: "bare".into(),
                    config: None
                },
            ]
        );
        assert_eq!(log.lines(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_tag_and_meta_stacks() {
        let log = parse_ok("pushtag #trip\npushmeta location: \"Paris\"\npopmeta location:\npoptag #trip\n");
        assert_eq!(log.methods(), vec!["pushtag", "pushmeta", "popmeta", "poptag"]);
        assert_eq!(
            log.entries[1].1,
            Construct::Pushmeta {
                key: "location".into(),
                value: MetaValue::String("Paris".into())
            }
        );
    }

    #[test]
    fn test_transaction_with_postings() {
        let source = "\
2024-01-15 * \"Cafe\" \"Coffee\" #food ^r1
  receipt: \"r.pdf\"
  Expenses:Food   4.50 USD
  ! Assets:Cash
    note: TRUE
";
        let log = parse_ok(source);
        assert_eq!(
            log.methods(),
            vec!["transaction", "key_value", "posting", "posting", "key_value"]
        );
        assert_eq!(log.lines(), vec![1, 2, 3, 4, 5]);

        let Construct::Transaction(txn) = &log.entries[0].1 else {
            panic!("expected transaction");
        };
        assert_eq!(txn.date, date(2024, 1, 15));
        assert_eq!(txn.flag, '*');
        assert_eq!(txn.payee.as_deref(), Some("Cafe"));
        assert_eq!(txn.narration, "Coffee");
        assert_eq!(txn.tags, vec!["food".to_string()]);
        assert_eq!(txn.links, vec!["r1".to_string()]);

        assert_eq!(
            log.entries[2].1,
            Construct::Posting(Posting::with_units(
                "Expenses:Food",
                IncompleteAmount::complete(dec!(4.50), "USD")
            ))
        );
        assert_eq!(
            log.entries[3].1,
            Construct::Posting(Posting::auto("Assets:Cash").with_flag('!'))
        );
    }

    #[test]
    fn test_single_string_is_narration() {
        let log = parse_ok("2024-01-15 txn \"Just narration\"\n");
        let Construct::Transaction(txn) = &log.entries[0].1 else {
            panic!("expected transaction");
        };
        assert_eq!(txn.payee, None);
        assert_eq!(txn.narration, "Just narration");
    }

    #[test]
    fn test_too_many_header_strings() {
        let (log, result) = parse("2024-01-15 * \"a\" \"b\" \"c\"\n");
        let err = result.unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::SyntaxError(_)));
        assert_eq!(log.methods(), vec!["error"]);
    }

    #[test]
    fn test_tags_links_line() {
        let log = parse_ok("2024-01-15 * \"x\"\n  #a ^b #c\n  Assets:Cash\n");
        assert_eq!(
            log.entries[1].1,
            Construct::TagsLinks {
                tags: vec!["a".into(), "c".into()],
                links: vec!["b".into()]
            }
        );
    }

    #[test]
    fn test_cost_and_price() {
        let log = parse_ok(
            "2024-01-15 *\n  Assets:Stock 10 AAPL {150 # 5 USD, 2024-01-01, \"lot\"} @ 155 USD\n  Assets:Cash\n",
        );
        let Construct::Posting(posting) = &log.entries[1].1 else {
            panic!("expected posting");
        };
        let cost = posting.cost.as_ref().unwrap();
        assert_eq!(cost.number_per, Some(dec!(150)));
        assert_eq!(cost.number_total, Some(dec!(5)));
        assert_eq!(cost.currency.as_deref(), Some("USD"));
        assert_eq!(cost.date, Some(date(2024, 1, 1)));
        assert_eq!(cost.label.as_deref(), Some("lot"));
        assert_eq!(
            posting.price,
            Some(PriceAnnotation::Unit(Amount::new(dec!(155), "USD")))
        );
    }

    #[test]
    fn test_total_cost_forms() {
        let log = parse_ok(
            "2024-01-15 *\n  Assets:A 10 XYZ {{1500 USD}}\n  Assets:B 1 XYZ {# 20 USD}\n  Assets:C 1 XYZ {*} @@\n",
        );
        let costs: Vec<_> = log
            .entries
            .iter()
            .filter_map(|(_, c)| match c {
                Construct::Posting(p) => p.cost.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(costs[0].number_total, Some(dec!(1500)));
        assert_eq!(costs[1].number_total, Some(dec!(20)));
        assert!(costs[2].merge);
        let Construct::Posting(last) = &log.entries[3].1 else {
            panic!("expected posting");
        };
        assert_eq!(last.price, Some(PriceAnnotation::TotalEmpty));
    }

    #[test]
    fn test_arithmetic() {
        let log = parse_ok("2024-01-15 *\n  Assets:Cash (10 + 5) * 2 / 4 USD\n");
        let Construct::Posting(posting) = &log.entries[1].1 else {
            panic!("expected posting");
        };
        assert_eq!(
            posting.units,
            Some(IncompleteAmount::complete(dec!(7.5), "USD"))
        );
    }

    fn units(source: &str) -> Vec<Option<IncompleteAmount>> {
        parse_ok(source)
            .entries
            .into_iter()
            .filter_map(|(_, c)| match c {
                Construct::Posting(p) => Some(p.units),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_signed_number_after_term_subtracts() {
        let units = units(
            "2024-01-15 *\n  Assets:A 10-2 USD\n  Assets:B (10 -2) USD\n  Assets:C 10 -2 * 3 USD\n  Assets:D 1 - -2 USD\n",
        );
        assert_eq!(
            units,
            vec![
                Some(IncompleteAmount::complete(dec!(8), "USD")),
                Some(IncompleteAmount::complete(dec!(8), "USD")),
                Some(IncompleteAmount::complete(dec!(4), "USD")),
                Some(IncompleteAmount::complete(dec!(3), "USD")),
            ]
        );
    }

    #[test]
    fn test_leading_negative_number_is_unchanged() {
        let units = units("2024-01-15 *\n  Assets:A -2 USD\n  Assets:B -(3 - 1)\n");
        assert_eq!(
            units,
            vec![
                Some(IncompleteAmount::complete(dec!(-2), "USD")),
                Some(IncompleteAmount::NumberOnly(dec!(-2))),
            ]
        );
    }

    #[test]
    fn test_hash_shorthand_in_cost() {
        let log = parse_ok(
            "2024-01-15 *\n  Assets:A 10 XYZ {150 #5 USD}\n  Assets:B 10 XYZ {150 #5*2 USD}\n",
        );
        let costs: Vec<_> = log
            .entries
            .iter()
            .filter_map(|(_, c)| match c {
                Construct::Posting(p) => p.cost.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(costs[0].number_per, Some(dec!(150)));
        assert_eq!(costs[0].number_total, Some(dec!(5)));
        assert_eq!(costs[0].currency.as_deref(), Some("USD"));
        assert_eq!(costs[1].number_total, Some(dec!(10)));
    }

    #[test]
    fn test_word_tag_in_cost_is_rejected() {
        let (_, result) = parse("2024-01-15 *\n  Assets:A 10 XYZ {150 #lot USD}\n");
        assert_eq!(
            result.unwrap_err().kind,
            ParseErrorKind::Expected("cost component or '}'".to_string())
        );
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        let (_, result) = parse("2024-01-15 *\n  Assets:Cash 1 / 0 USD\n");
        assert_eq!(
            result.unwrap_err().kind,
            ParseErrorKind::SyntaxError("division by zero".to_string())
        );
    }

    #[test]
    fn test_dated_directives() {
        let source = "\
2024-01-01 open Assets:Cash USD,EUR \"FIFO\"
2024-01-02 close Assets:Old
2024-01-03 commodity USD
2024-01-04 pad Assets:Cash Equity:Opening
2024-01-05 balance Assets:Cash 100.00 ~ 0.01 USD
2024-01-06 event \"location\" \"Paris\"
2024-01-07 query \"cash\" \"SELECT 1\"
2024-01-08 note Assets:Cash \"hello\"
2024-01-09 document Assets:Cash \"a.pdf\" #t ^l
2024-01-10 price AAPL 150.00 USD
2024-01-11 custom \"budget\" Expenses:Food 500 USD TRUE \"monthly\"
";
        let log = parse_ok(source);
        assert_eq!(
            log.methods(),
            vec![
                "open",
                "close",
                "commodity",
                "pad",
                "balance",
                "event",
                "query",
                "note",
                "document",
                "price",
                "custom"
            ]
        );
        assert_eq!(log.lines(), (1..=11).collect::<Vec<_>>());

        assert_eq!(
            log.entries[0].1,
            Construct::Open(
                Open::new(date(2024, 1, 1), "Assets:Cash")
                    .with_currencies(vec!["USD".into(), "EUR".into()])
                    .with_booking("FIFO")
            )
        );
        assert_eq!(
            log.entries[4].1,
            Construct::Balance(
                Balance::new(
                    date(2024, 1, 5),
                    "Assets:Cash",
                    Amount::new(dec!(100.00), "USD")
                )
                .with_tolerance(dec!(0.01))
            )
        );
        let Construct::Custom(custom) = &log.entries[10].1 else {
            panic!("expected custom");
        };
        assert_eq!(
            custom.values,
            vec![
                MetaValue::Account("Expenses:Food".into()),
                MetaValue::Amount(Amount::new(dec!(500), "USD")),
                MetaValue::Bool(true),
                MetaValue::String("monthly".into()),
            ]
        );
    }

    #[test]
    fn test_metadata_under_directive() {
        let log = parse_ok("2024-01-01 open Assets:Cash\n  owner: \"me\"\n  empty:\n");
        assert_eq!(log.methods(), vec!["open", "key_value", "key_value"]);
        assert_eq!(
            log.entries[2].1,
            Construct::KeyValue {
                key: "empty".into(),
                value: MetaValue::None
            }
        );
    }

    #[test]
    fn test_posting_under_non_transaction_is_rejected() {
        let (_, result) = parse("2024-01-01 open Assets:Cash\n  Assets:Other 1 USD\n");
        let err = result.unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Expected("metadata".to_string()));
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_missing_account() {
        let (log, result) = parse("2024-01-01 open\n");
        let err = result.unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingAccount);
        assert_eq!(log.methods(), vec!["error"]);
    }

    #[test]
    fn test_missing_directive() {
        let (_, result) = parse("2024-01-01 Assets:Cash\n");
        assert_eq!(result.unwrap_err().kind, ParseErrorKind::MissingDirective);
    }

    #[test]
    fn test_indented_directive() {
        let (_, result) = parse("  2024-01-01 open Assets:Cash\n");
        assert_eq!(result.unwrap_err().kind, ParseErrorKind::IndentationError);
    }

    #[test]
    fn test_trailing_garbage_reports_no_header() {
        let (log, result) = parse("2024-01-01 close Assets:Cash\n2024-01-02 close Assets:Bank USD\n");
        let err = result.unwrap_err();
        assert_eq!(err.line(), 2);
        assert_eq!(log.methods(), vec!["close", "error"]);
    }

    #[test]
    fn test_no_final_newline() {
        let log = parse_ok("2024-01-01 commodity USD");
        assert_eq!(log.methods(), vec!["commodity"]);
    }

    #[test]
    fn test_lexical_error_stops_run() {
        let (log, result) = parse("2024-01-01 commodity USD\n$\n2024-01-02 commodity EUR\n");
        let err = result.unwrap_err();
        assert!(err.is_lexical());
        assert_eq!(err.line(), 2);
        assert_eq!(log.methods(), vec!["commodity", "error"]);
    }
}
