//! Parse sessions.
//!
//! A [`Session`] runs the tokenizer and grammar driver over one input at a
//! time, in one of two modes:
//!
//! - **full parse** ([`Session::parse`], [`Session::parse_str`]): runs the
//!   grammar to completion, reporting constructs to a builder;
//! - **incremental** ([`Session::begin`], [`Session::step`],
//!   [`Session::close`]): hands out raw tokens one at a time.
//!
//! All per-run state lives in the session, so independent sessions can
//! coexist. A session holds at most one open run. Files are read as bytes;
//! invalid UTF-8 surfaces as a located lexical error, not an I/O failure.
//!
//! # Example
//!
//! ```
//! use beanlex_parser::{ConstructLog, Session};
//!
//! let mut log = ConstructLog::new();
//! Session::new()
//!     .with_first_line(10)
//!     .parse_str("inline", "2024-01-01 open Assets:Cash\n", &mut log)
//!     .unwrap();
//! assert_eq!(log.lines(), vec![11]);
//! ```

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::builder::Builder;
use crate::error::SessionError;
use crate::grammar::GrammarDriver;
use crate::token::Token;
use crate::tokenizer::Tokenizer;

/// An incremental run: the tokenizer plus the builder bound to it.
struct Active<'b> {
    tokenizer: Tokenizer,
    builder: &'b mut dyn Builder,
}

/// Owns the lifecycle of parse runs.
pub struct Session<'b> {
    report_filename: Option<String>,
    first_line: usize,
    debug: bool,
    active: Option<Active<'b>>,
    last_filename: Option<String>,
    last_line: usize,
}

impl Default for Session<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'b> Session<'b> {
    /// Create a session with default options.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            report_filename: None,
            first_line: 0,
            debug: false,
            active: None,
            last_filename: None,
            last_line: 0,
        }
    }

    /// Report locations under `name` instead of the input path.
    #[must_use]
    pub fn with_report_filename(mut self, name: impl Into<String>) -> Self {
        self.report_filename = Some(name.into());
        self
    }

    /// Add `offset` to every reported line.
    #[must_use]
    pub fn with_first_line(mut self, offset: usize) -> Self {
        self.first_line = offset;
        self
    }

    /// Trace every token and every reduced construct.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Parse the file at `path` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyOpen`] if an incremental run is open,
    /// [`SessionError::Io`] if the file cannot be read, and
    /// [`SessionError::Lexical`] or [`SessionError::Syntax`] for the first
    /// error in the input.
    pub fn parse(
        &mut self,
        path: impl AsRef<Path>,
        builder: &mut dyn Builder,
    ) -> Result<(), SessionError> {
        self.ensure_closed()?;
        let path = path.as_ref();
        let bytes = read_source(path)?;
        let name = self.reported_name(&path.display().to_string());
        let tokenizer = self.prepare(Tokenizer::from_bytes(&name, bytes));
        self.run(tokenizer, builder)
    }

    /// Parse in-memory `source`, reported under `name`, to completion.
    ///
    /// # Errors
    ///
    /// As [`parse`](Self::parse), without the I/O case.
    pub fn parse_str(
        &mut self,
        name: &str,
        source: impl Into<String>,
        builder: &mut dyn Builder,
    ) -> Result<(), SessionError> {
        self.ensure_closed()?;
        let name = self.reported_name(name);
        let tokenizer = self.prepare(Tokenizer::new(&name, source));
        self.run(tokenizer, builder)
    }

    /// Open the file at `path` for stepping, binding `builder` until the
    /// run is closed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyOpen`] if a run is open, leaving it
    /// untouched, or [`SessionError::Io`] if the file cannot be read.
    pub fn begin(
        &mut self,
        path: impl AsRef<Path>,
        builder: &'b mut dyn Builder,
    ) -> Result<(), SessionError> {
        self.ensure_closed()?;
        let path = path.as_ref();
        let bytes = read_source(path)?;
        let name = self.reported_name(&path.display().to_string());
        let tokenizer = self.prepare(Tokenizer::from_bytes(&name, bytes));
        self.active = Some(Active { tokenizer, builder });
        Ok(())
    }

    /// Open in-memory `source` for stepping.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyOpen`] if a run is open.
    pub fn begin_str(
        &mut self,
        name: &str,
        source: impl Into<String>,
        builder: &'b mut dyn Builder,
    ) -> Result<(), SessionError> {
        self.ensure_closed()?;
        let name = self.reported_name(name);
        let tokenizer = self.prepare(Tokenizer::new(&name, source));
        self.active = Some(Active { tokenizer, builder });
        Ok(())
    }

    /// Produce the next token of the open run.
    ///
    /// Returns `Ok(None)` at the end of input, which also closes the run,
    /// and on every call while no run is open.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Lexical`] for unrecognized input. The bound
    /// builder is notified, the bad text is skipped and the run stays open.
    pub fn step(&mut self) -> Result<Option<Token>, SessionError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };
        match active.tokenizer.next_token() {
            Ok(token) if token.is_end() => {
                self.end_run();
                Ok(None)
            }
            Ok(token) => Ok(Some(token)),
            Err(err) => {
                active.builder.error(&err);
                Err(SessionError::from(err))
            }
        }
    }

    /// Close the open run, if any, and give the bound builder back.
    ///
    /// The returned session keeps the options and the last known location
    /// and is free to bind a builder of any lifetime.
    ///
    /// ```
    /// use beanlex_parser::{ConstructLog, Session};
    ///
    /// let mut log = ConstructLog::new();
    /// let mut session = Session::new();
    /// session.begin_str("a", "2024-01-01 open", &mut log).unwrap();
    /// session.step().unwrap();
    /// let session = session.close();
    ///
    /// assert!(log.entries.is_empty());
    /// assert_eq!(session.current_filename(), Some("a"));
    /// ```
    #[must_use]
    pub fn close<'n>(mut self) -> Session<'n> {
        self.end_run();
        Session {
            report_filename: self.report_filename,
            first_line: self.first_line,
            debug: self.debug,
            active: None,
            last_filename: self.last_filename,
            last_line: self.last_line,
        }
    }

    fn end_run(&mut self) {
        if let Some(active) = self.active.take() {
            self.last_line = active.tokenizer.location().line;
            debug!(
                file = active.tokenizer.filename(),
                line = self.last_line,
                "parse session closed"
            );
        }
    }

    /// Returns true while an incremental run is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// The filename of the current or most recent run.
    #[must_use]
    pub fn current_filename(&self) -> Option<&str> {
        self.last_filename.as_deref()
    }

    /// The current line of the open run, or the last known line.
    ///
    /// Zero before the first run.
    #[must_use]
    pub fn current_line(&self) -> usize {
        self.active
            .as_ref()
            .map_or(self.last_line, |active| active.tokenizer.location().line)
    }

    fn ensure_closed(&self) -> Result<(), SessionError> {
        if self.is_open() {
            return Err(SessionError::AlreadyOpen);
        }
        Ok(())
    }

    fn reported_name(&self, fallback: &str) -> String {
        self.report_filename
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }

    fn prepare(&mut self, tokenizer: Tokenizer) -> Tokenizer {
        debug!(
            file = tokenizer.filename(),
            first_line = self.first_line,
            "parse session opened"
        );
        self.last_filename = Some(tokenizer.filename().to_string());
        tokenizer
            .with_first_line(self.first_line)
            .with_debug(self.debug)
    }

    fn run(
        &mut self,
        mut tokenizer: Tokenizer,
        builder: &mut dyn Builder,
    ) -> Result<(), SessionError> {
        let result = GrammarDriver::new(&mut tokenizer)
            .with_debug(self.debug)
            .run(builder);

        self.last_line = match &result {
            Ok(()) => tokenizer.location().line,
            Err(err) => err.line(),
        };
        debug!(
            file = tokenizer.filename(),
            line = self.last_line,
            ok = result.is_ok(),
            "parse session closed"
        );
        result.map_err(SessionError::from)
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>, SessionError> {
    fs::read(path).map_err(|source| SessionError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ConstructLog;
    use crate::error::ParseErrorKind;

    #[test]
    fn test_accessors_before_first_run() {
        let session = Session::new();
        assert_eq!(session.current_filename(), None);
        assert_eq!(session.current_line(), 0);
        assert!(!session.is_open());
    }

    #[test]
    fn test_parse_str_records_location() {
        let mut log = ConstructLog::new();
        let mut session = Session::new();
        session
            .parse_str("mem.beancount", "\n\n2024-01-01 commodity USD\n", &mut log)
            .unwrap();
        assert_eq!(log.lines(), vec![3]);
        assert_eq!(session.current_filename(), Some("mem.beancount"));
        assert_eq!(session.current_line(), 4);
    }

    #[test]
    fn test_report_filename_overrides() {
        let mut log = ConstructLog::new();
        Session::new()
            .with_report_filename("shown.beancount")
            .parse_str("hidden", "2024-01-01 commodity USD\n", &mut log)
            .unwrap();
        assert_eq!(&*log.entries[0].0.filename, "shown.beancount");
    }

    #[test]
    fn test_step_until_end() {
        let mut log = ConstructLog::new();
        let mut session = Session::new();
        session
            .begin_str("s", "2024-01-01 close Assets:Cash\n", &mut log)
            .unwrap();
        assert!(session.is_open());
        let mut names = Vec::new();
        while let Some(token) = session.step().unwrap() {
            names.push(token.kind_name());
        }
        assert_eq!(names, vec!["DATE", "CLOSE", "ACCOUNT", "EOL"]);
        assert!(!session.is_open());
        assert!(session.step().unwrap().is_none());
        assert!(session.step().unwrap().is_none());
    }

    #[test]
    fn test_close_releases_run() {
        let mut first = ConstructLog::new();
        let mut second = ConstructLog::new();
        let mut session = Session::new();
        session.begin_str("a", "2024-01-01", &mut first).unwrap();
        let mut session = session.close();
        assert!(session.step().unwrap().is_none());
        session.begin_str("b", "USD", &mut second).unwrap();
        assert_eq!(session.step().unwrap().unwrap().kind_name(), "CURRENCY");
        assert_eq!(session.current_filename(), Some("b"));
    }

    #[test]
    fn test_close_hands_builder_back() {
        let mut log = ConstructLog::new();
        let mut session = Session::new().with_first_line(5);
        session.begin_str("a", "2024-01-01 $\n", &mut log).unwrap();
        assert!(session.step().unwrap().is_some());
        assert!(session.step().is_err());
        let mut session = session.close();

        // The builder is readable while the session lives on.
        assert_eq!(log.methods(), vec!["error"]);
        assert_eq!(session.current_line(), 6);
        session
            .parse_str("b", "2024-01-01 commodity USD\n", &mut ConstructLog::new())
            .unwrap();
        assert_eq!(log.entries.len(), 1);
        assert_eq!(session.current_line(), 7);
    }

    #[test]
    fn test_parse_file_with_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.beancount");
        let bytes = b"2024-01-01 commodity USD\n2024-01-02 note Assets:Cash \"caf\xe9\"\n";
        fs::write(&path, bytes).unwrap();

        let mut log = ConstructLog::new();
        let err = Session::new().parse(&path, &mut log).unwrap_err();
        let SessionError::Lexical(parse_error) = err else {
            panic!("expected a lexical error, got {err:?}");
        };
        assert_eq!(parse_error.kind, ParseErrorKind::InvalidUtf8);
        assert_eq!(parse_error.line(), 2);
        assert_eq!(log.methods(), vec!["commodity", "error"]);
    }
}
