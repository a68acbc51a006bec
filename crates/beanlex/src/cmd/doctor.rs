//! Shared implementation for beanlex-doctor and bean-doctor.
//!
//! # Usage
//!
//! ```bash
//! beanlex-doctor lex ledger.beancount                  # Dump the token stream
//! beanlex-doctor parse ledger.beancount                # List builder calls
//! beanlex-doctor parse --first-line 100 fragment.bean  # Shift reported lines
//! beanlex-doctor parse --format json ledger.beancount  # Machine-readable output
//! ```

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use beanlex_parser::{Construct, ConstructLog, Session};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::report::{self, JsonDiagnostic};

/// Output format for parse results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// JSON output for tooling integration
    Json,
}

/// Debugging tool for beancount-style ledgers.
#[derive(Parser, Debug)]
#[command(name = "beanlex-doctor")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The command to run
    #[command(subcommand)]
    pub command: Command,

    /// Log session activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Doctor subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dump the token stream of a ledger file
    #[command(alias = "dump-lexer")]
    Lex {
        /// The ledger file to tokenize
        file: PathBuf,
        /// Number added to every reported line
        #[arg(long, default_value_t = 0)]
        first_line: usize,
    },

    /// Parse a ledger file and list every builder call
    Parse(ParseArgs),
}

/// Options for the `parse` subcommand.
#[derive(clap::Args, Debug)]
pub struct ParseArgs {
    /// The ledger file to parse
    pub file: PathBuf,

    /// Report locations under this name instead of FILE
    #[arg(long, value_name = "NAME")]
    pub report_filename: Option<String>,

    /// Number added to every reported line
    #[arg(long, default_value_t = 0)]
    pub first_line: usize,

    /// Trace every token and reduction
    #[arg(long)]
    pub debug: bool,

    /// Output format (text or json)
    #[arg(long, short = 'f', value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// One builder call in JSON output.
#[derive(Debug, Serialize)]
struct JsonCall<'a> {
    file: &'a str,
    line: usize,
    #[serde(flatten)]
    call: &'a Construct,
}

/// JSON output for a parse run.
#[derive(Debug, Serialize)]
struct JsonOutput<'a> {
    calls: Vec<JsonCall<'a>>,
    diagnostics: Vec<JsonDiagnostic>,
    error_count: usize,
}

/// Main entry point for the doctor command.
pub fn main() -> ExitCode {
    main_with_name("beanlex-doctor")
}

/// Main entry point with custom binary name (for bean-doctor compatibility).
pub fn main_with_name(bin_name: &'static str) -> ExitCode {
    let matches = Args::command()
        .name(bin_name)
        .bin_name(bin_name)
        .get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    let trace = matches!(&args.command, Command::Parse(p) if p.debug);
    init_logging(args.verbose, trace);

    let color = io::stderr().is_terminal();
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();

    match run(&args, &mut stdout, &mut stderr, color) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool, trace: bool) {
    let filter = if trace {
        EnvFilter::new("beanlex_parser=trace")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Run a parsed command, writing results to `out` and diagnostics to `err`.
///
/// Returns the number of lexical or syntax errors found in the input.
pub fn run<W: Write, E: Write>(
    args: &Args,
    out: &mut W,
    err: &mut E,
    color: bool,
) -> Result<usize> {
    match &args.command {
        Command::Lex { file, first_line } => cmd_lex(file, *first_line, out, err),
        Command::Parse(parse_args) => cmd_parse(parse_args, args.verbose, out, err, color),
    }
}

fn cmd_lex<W: Write, E: Write>(
    file: &Path,
    first_line: usize,
    out: &mut W,
    err: &mut E,
) -> Result<usize> {
    let mut log = ConstructLog::new();
    let mut session = Session::new().with_first_line(first_line);
    session
        .begin(file, &mut log)
        .with_context(|| format!("failed to lex {}", file.display()))?;

    let mut tokens = 0usize;
    let mut errors = 0usize;
    loop {
        match session.step() {
            Ok(Some(token)) => {
                tokens += 1;
                writeln!(out, "{token}")?;
            }
            Ok(None) => break,
            Err(e) => {
                errors += 1;
                writeln!(err, "error: {e}")?;
            }
        }
    }
    debug!(tokens, errors, file = %file.display(), "lexed file");

    Ok(errors)
}

fn cmd_parse<W: Write, E: Write>(
    args: &ParseArgs,
    verbose: bool,
    out: &mut W,
    err: &mut E,
    color: bool,
) -> Result<usize> {
    let mut log = ConstructLog::new();
    let mut session = Session::new()
        .with_first_line(args.first_line)
        .with_debug(args.debug);
    if let Some(name) = &args.report_filename {
        session = session.with_report_filename(name.as_str());
    }

    let failure = match session.parse(&args.file, &mut log) {
        Ok(()) => None,
        Err(e) if e.parse_error().is_none() => {
            return Err(e).with_context(|| format!("failed to parse {}", args.file.display()));
        }
        Err(e) => e.parse_error().cloned(),
    };
    // Decoded the same way the tokenizer decodes, so spans line up.
    let source = fs::read(&args.file)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
    let error_count = usize::from(failure.is_some());

    let calls = log
        .entries
        .iter()
        .filter(|(_, construct)| !matches!(construct, Construct::Error { .. }));

    match args.format {
        OutputFormat::Text => {
            for (loc, construct) in calls {
                if verbose {
                    let detail = serde_json::to_string(construct)?;
                    writeln!(out, "{loc} {} {detail}", construct.method())?;
                } else {
                    writeln!(out, "{loc} {}", construct.method())?;
                }
            }
            if let Some(error) = &failure {
                match &source {
                    Some(source) => report::report_parse_error(error, source, color, err)?,
                    None => writeln!(err, "error: {error}")?,
                }
            }
            report::print_summary(error_count, err)?;
        }
        OutputFormat::Json => {
            let output = JsonOutput {
                calls: calls
                    .map(|(loc, construct)| JsonCall {
                        file: &loc.filename,
                        line: loc.line,
                        call: construct,
                    })
                    .collect(),
                diagnostics: failure
                    .iter()
                    .map(|error| JsonDiagnostic::new(error, source.as_deref()))
                    .collect(),
                error_count,
            };
            serde_json::to_writer_pretty(&mut *out, &output)?;
            writeln!(out)?;
        }
    }

    Ok(error_count)
}
