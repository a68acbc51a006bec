//! Source location tracking.
//!
//! Every token and every builder call carries a [`Location`]: the name the
//! input should be reported under and a line number. The line is the
//! physical line plus a caller-supplied first-line offset, so a fragment cut
//! out of a larger document can report positions as if it were still in
//! place.

use std::fmt;
use std::sync::Arc;

/// A (filename, line) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// Name reported for the input.
    pub filename: Arc<str>,
    /// Logical line: physical line plus the first-line offset.
    pub line: usize,
}

impl Location {
    /// Create a location.
    #[must_use]
    pub fn new(filename: impl Into<Arc<str>>, line: usize) -> Self {
        Self {
            filename: filename.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line)
    }
}

/// Bookkeeping for the current filename, physical line and first-line offset.
#[derive(Debug, Clone)]
pub struct LocationTracker {
    filename: Arc<str>,
    line: usize,
    first_line: usize,
}

impl LocationTracker {
    /// Start tracking at physical line 1 of `filename` with no offset.
    #[must_use]
    pub fn new(filename: impl Into<Arc<str>>) -> Self {
        Self {
            filename: filename.into(),
            line: 1,
            first_line: 0,
        }
    }

    /// The location at the current position.
    #[must_use]
    pub fn current(&self) -> Location {
        Location {
            filename: Arc::clone(&self.filename),
            line: self.line + self.first_line,
        }
    }

    /// Move forward by `n` lines.
    pub fn advance_line(&mut self, n: usize) {
        self.line += n;
    }

    /// Report subsequent locations under `name`.
    pub fn set_filename(&mut self, name: impl Into<Arc<str>>) {
        self.filename = name.into();
    }

    /// Add `offset` to every subsequently reported line.
    pub fn set_first_line(&mut self, offset: usize) {
        self.first_line = offset;
    }

    /// The reported filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The physical line, ignoring the offset.
    #[must_use]
    pub const fn physical_line(&self) -> usize {
        self.line
    }
}
