//! The callback protocol between the grammar driver and its consumer.
//!
//! The driver invokes one [`Builder`] method per recognized construct, in
//! source order, each with an owned value and the [`Location`] of the
//! construct's first token. Every method has an empty default body, so a
//! builder only implements the constructs it cares about.
//!
//! [`ConstructLog`] is a ready-made builder that records every call.

use beanlex_core::{
    Balance, Close, Commodity, Custom, Document, Event, MetaValue, Note, Open, Pad, Posting,
    Price, Query, Transaction,
};
use serde::Serialize;

use crate::error::ParseError;
use crate::location::Location;

/// Receives the constructs recognized by the grammar driver.
#[allow(unused_variables)]
pub trait Builder {
    /// `option "key" "value"`.
    fn option(&mut self, loc: Location, key: String, value: String) {}

    /// `include "path"`. The path is reported, not opened.
    fn include(&mut self, loc: Location, path: String) {}

    /// `plugin "module" ["config"]`.
    fn plugin(&mut self, loc: Location, name: String, config: Option<String>) {}

    /// `pushtag #tag`.
    fn pushtag(&mut self, loc: Location, tag: String) {}

    /// `poptag #tag`.
    fn poptag(&mut self, loc: Location, tag: String) {}

    /// `pushmeta key: value`.
    fn pushmeta(&mut self, loc: Location, key: String, value: MetaValue) {}

    /// `popmeta key:`.
    fn popmeta(&mut self, loc: Location, key: String) {}

    /// A transaction header line.
    fn transaction(&mut self, loc: Location, txn: Transaction) {}

    /// A posting line inside a transaction.
    fn posting(&mut self, loc: Location, posting: Posting) {}

    /// A continuation line of tags and links inside a transaction.
    fn tags_links(&mut self, loc: Location, tags: Vec<String>, links: Vec<String>) {}

    /// An indented `key: value` line under any directive.
    fn key_value(&mut self, loc: Location, key: String, value: MetaValue) {}

    /// An `open` directive.
    fn open(&mut self, loc: Location, open: Open) {}

    /// A `close` directive.
    fn close(&mut self, loc: Location, close: Close) {}

    /// A `commodity` directive.
    fn commodity(&mut self, loc: Location, commodity: Commodity) {}

    /// A `pad` directive.
    fn pad(&mut self, loc: Location, pad: Pad) {}

    /// A `balance` directive.
    fn balance(&mut self, loc: Location, balance: Balance) {}

    /// An `event` directive.
    fn event(&mut self, loc: Location, event: Event) {}

    /// A `query` directive.
    fn query(&mut self, loc: Location, query: Query) {}

    /// A `note` directive.
    fn note(&mut self, loc: Location, note: Note) {}

    /// A `document` directive.
    fn document(&mut self, loc: Location, document: Document) {}

    /// A `price` directive.
    fn price(&mut self, loc: Location, price: Price) {}

    /// A `custom` directive.
    fn custom(&mut self, loc: Location, custom: Custom) {}

    /// A lexical or syntax error that ends the parse.
    fn error(&mut self, err: &ParseError) {}
}

/// One recorded builder call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "construct", rename_all = "snake_case")]
pub enum Construct {
    /// `option`
    Option {
        /// Option name.
        key: String,
        /// Option value.
        value: String,
    },
    /// `include`
    Include {
        /// Included path.
        path: String,
    },
    /// `plugin`
    Plugin {
        /// Plugin module name.
        name: String,
        /// Optional configuration string.
        config: Option<String>,
    },
    /// `pushtag`
    Pushtag {
        /// The tag.
        tag: String,
    },
    /// `poptag`
    Poptag {
        /// The tag.
        tag: String,
    },
    /// `pushmeta`
    Pushmeta {
        /// The key.
        key: String,
        /// The value.
        value: MetaValue,
    },
    /// `popmeta`
    Popmeta {
        /// The key.
        key: String,
    },
    /// Transaction header.
    Transaction(Transaction),
    /// Posting line.
    Posting(Posting),
    /// Tags/links continuation line.
    TagsLinks {
        /// Tags without `#`.
        tags: Vec<String>,
        /// Links without `^`.
        links: Vec<String>,
    },
    /// Metadata line.
    KeyValue {
        /// The key.
        key: String,
        /// The value.
        value: MetaValue,
    },
    /// `open`
    Open(Open),
    /// `close`
    Close(Close),
    /// `commodity`
    Commodity(Commodity),
    /// `pad`
    Pad(Pad),
    /// `balance`
    Balance(Balance),
    /// `event`
    Event(Event),
    /// `query`
    Query(Query),
    /// `note`
    Note(Note),
    /// `document`
    Document(Document),
    /// `price`
    Price(Price),
    /// `custom`
    Custom(Custom),
    /// Error notification, rendered.
    Error {
        /// The error message.
        message: String,
    },
}

impl Construct {
    /// The builder method this call went to.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Option { .. } => "option",
            Self::Include { .. } => "include",
            Self::Plugin { .. } => "plugin",
            Self::Pushtag { .. } => "pushtag",
            Self::Poptag { .. } => "poptag",
            Self::Pushmeta { .. } => "pushmeta",
            Self::Popmeta { .. } => "popmeta",
            Self::Transaction(_) => "transaction",
            Self::Posting(_) => "posting",
            Self::TagsLinks { .. } => "tags_links",
            Self::KeyValue { .. } => "key_value",
            Self::Open(_) => "open",
            Self::Close(_) => "close",
            Self::Commodity(_) => "commodity",
            Self::Pad(_) => "pad",
            Self::Balance(_) => "balance",
            Self::Event(_) => "event",
            Self::Query(_) => "query",
            Self::Note(_) => "note",
            Self::Document(_) => "document",
            Self::Price(_) => "price",
            Self::Custom(_) => "custom",
            Self::Error { .. } => "error",
        }
    }
}

/// A builder that records every call with its location.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConstructLog {
    /// Recorded calls, in call order.
    pub entries: Vec<(Location, Construct)>,
}

impl ConstructLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reported lines, in call order.
    #[must_use]
    pub fn lines(&self) -> Vec<usize> {
        self.entries.iter().map(|(loc, _)| loc.line).collect()
    }

    /// Builder method names, in call order.
    #[must_use]
    pub fn methods(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(_, c)| c.method()).collect()
    }

    fn push(&mut self, loc: Location, construct: Construct) {
        self.entries.push((loc, construct));
    }
}

impl Builder for ConstructLog {
    fn option(&mut self, loc: Location, key: String, value: String) {
        self.push(loc, Construct::Option { key, value });
    }

    fn include(&mut self, loc: Location, path: String) {
        self.push(loc, Construct::Include { path });
    }

    fn plugin(&mut self, loc: Location, name: String, config: Option<String>) {
        self.push(loc, Construct::Plugin { name, config });
    }

    fn pushtag(&mut self, loc: Location, tag: String) {
        self.push(loc, Construct::Pushtag { tag });
    }

    fn poptag(&mut self, loc: Location, tag: String) {
        self.push(loc, Construct::Poptag { tag });
    }

    fn pushmeta(&mut self, loc: Location, key: String, value: MetaValue) {
        self.push(loc, Construct::Pushmeta { key, value });
    }

    fn popmeta(&mut self, loc: Location, key: String) {
        self.push(loc, Construct::Popmeta { key });
    }

    fn transaction(&mut self, loc: Location, txn: Transaction) {
        self.push(loc, Construct::Transaction(txn));
    }

    fn posting(&mut self, loc: Location, posting: Posting) {
        self.push(loc, Construct::Posting(posting));
    }

    fn tags_links(&mut self, loc: Location, tags: Vec<String>, links: Vec<String>) {
        self.push(loc, Construct::TagsLinks { tags, links });
    }

    fn key_value(&mut self, loc: Location, key: String, value: MetaValue) {
        self.push(loc, Construct::KeyValue { key, value });
    }

    fn open(&mut self, loc: Location, open: Open) {
        self.push(loc, Construct::Open(open));
    }

    fn close(&mut self, loc: Location, close: Close) {
        self.push(loc, Construct::Close(close));
    }

    fn commodity(&mut self, loc: Location, commodity: Commodity) {
        self.push(loc, Construct::Commodity(commodity));
    }

    fn pad(&mut self, loc: Location, pad: Pad) {
        self.push(loc, Construct::Pad(pad));
    }

    fn balance(&mut self, loc: Location, balance: Balance) {
        self.push(loc, Construct::Balance(balance));
    }

    fn event(&mut self, loc: Location, event: Event) {
        self.push(loc, Construct::Event(event));
    }

    fn query(&mut self, loc: Location, query: Query) {
        self.push(loc, Construct::Query(query));
    }

    fn note(&mut self, loc: Location, note: Note) {
        self.push(loc, Construct::Note(note));
    }

    fn document(&mut self, loc: Location, document: Document) {
        self.push(loc, Construct::Document(document));
    }

    fn price(&mut self, loc: Location, price: Price) {
        self.push(loc, Construct::Price(price));
    }

    fn custom(&mut self, loc: Location, custom: Custom) {
        self.push(loc, Construct::Custom(custom));
    }

    fn error(&mut self, err: &ParseError) {
        self.push(
            err.location.clone(),
            Construct::Error {
                message: err.to_string(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanlex_core::NaiveDate;

    struct OnlyOpens(usize);

    impl Builder for OnlyOpens {
        fn open(&mut self, _loc: Location, _open: Open) {
            self.0 += 1;
        }
    }

    #[test]
    fn test_default_methods_are_noops() {
        let mut builder = OnlyOpens(0);
        let loc = Location::new("t", 1);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        builder.close(loc.clone(), Close::new(date, "Assets:Cash"));
        builder.open(loc, Open::new(date, "Assets:Cash"));
        assert_eq!(builder.0, 1);
    }

    #[test]
    fn test_log_records_order() {
        let mut log = ConstructLog::new();
        log.option(Location::new("t", 1), "title".into(), "Home".into());
        log.pushtag(Location::new("t", 2), "trip".into());
        assert_eq!(log.methods(), vec!["option", "pushtag"]);
        assert_eq!(log.lines(), vec![1, 2]);
        assert_eq!(log.len(), 2);
    }
}
