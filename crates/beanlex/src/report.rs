//! Error reporting with source diagnostics.
//!
//! Uses ariadne for pretty-printed error messages with source context.

use std::io::{self, Write};
use std::ops::Range;

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use beanlex_parser::ParseError;
use serde::Serialize;

/// A diagnostic message in JSON format.
#[derive(Debug, Serialize)]
pub struct JsonDiagnostic {
    /// Reported file name
    pub file: String,
    /// Reported line number, including any first-line offset
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Severity, always "error" for parse failures
    pub severity: &'static str,
    /// Error code (e.g., "P0014")
    pub code: String,
    /// Error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Optional context information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl JsonDiagnostic {
    /// Describe `error`, using `source` to find its column.
    pub fn new(error: &ParseError, source: Option<&str>) -> Self {
        Self {
            file: error.location.filename.to_string(),
            line: error.line(),
            column: source.map_or(1, |s| column_of(s, error.span.start)),
            severity: "error",
            code: error_code(error),
            message: error.message(),
            hint: error.hint.clone(),
            context: error.context.clone(),
        }
    }
}

/// The display code of a parse error.
pub fn error_code(error: &ParseError) -> String {
    format!("P{:04}", error.kind_code())
}

/// Column (1-based, in characters) of byte `offset` within its line.
pub fn column_of(source: &str, offset: usize) -> usize {
    let Some(before) = source.get(..offset.min(source.len())) else {
        return 1;
    };
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    before[line_start..].chars().count() + 1
}

/// Render one parse error against the source text it came from.
pub fn report_parse_error<W: Write>(
    error: &ParseError,
    source: &str,
    color: bool,
    writer: &mut W,
) -> io::Result<()> {
    let name = error.location.filename.to_string();
    let Range { start, end } = Range::from(error.span);
    let start = start.min(source.len());
    let end = end.clamp(start, source.len());

    let mut label = Label::new((name.as_str(), start..end)).with_message(error.label());
    if color {
        label = label.with_color(Color::Red);
    }

    let mut report = Report::build(ReportKind::Error, (name.as_str(), start..end))
        .with_code(error_code(error))
        .with_message(error.to_string())
        .with_label(label)
        .with_config(
            Config::default()
                .with_compact(false)
                .with_color(color)
                .with_index_type(IndexType::Byte),
        );
    if let Some(hint) = &error.hint {
        report = report.with_help(hint);
    }

    report
        .finish()
        .write((name.as_str(), Source::from(source)), &mut *writer)
}

/// Print a one-line summary of the run.
pub fn print_summary<W: Write>(errors: usize, writer: &mut W) -> io::Result<()> {
    if errors == 0 {
        writeln!(writer, "\x1b[32m\u{2713}\x1b[0m No errors found")
    } else {
        let error_text = if errors == 1 { "error" } else { "errors" };
        writeln!(writer, "\x1b[31m\u{2717}\x1b[0m {errors} {error_text}")
    }
}
