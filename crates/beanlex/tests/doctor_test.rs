//! Tests for the doctor command, driven through its argument parser.

use std::io::Write;
use std::path::Path;

use beanlex::cmd::doctor::{run, Args};
use clap::Parser;

// ============================================================================
// Helper Functions
// ============================================================================

struct Output {
    errors: usize,
    stdout: String,
    stderr: String,
}

fn write_ledger(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path.display().to_string()
}

fn doctor(argv: &[&str]) -> anyhow::Result<Output> {
    let args = Args::try_parse_from(std::iter::once("beanlex-doctor").chain(argv.iter().copied()))
        .unwrap();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let errors = run(&args, &mut stdout, &mut stderr, false)?;
    Ok(Output {
        errors,
        stdout: String::from_utf8(stdout).unwrap(),
        stderr: String::from_utf8(stderr).unwrap(),
    })
}

const LEDGER: &str = r#"2024-01-01 open Assets:Cash USD

2024-01-15 * "Cafe" "Coffee"
  Expenses:Coffee  4.50 USD
  Assets:Cash
"#;

// ============================================================================
// lex
// ============================================================================

#[test]
fn test_lex_dumps_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_ledger(dir.path(), "ledger.beancount", "2024-01-01 open Assets:Cash\n");

    let output = doctor(&["lex", &path]).unwrap();
    assert_eq!(output.errors, 0);
    assert_eq!(
        output.stdout.lines().collect::<Vec<_>>(),
        vec![
            "DATE 1 \"2024-01-01\" 2024-01-01",
            "OPEN 1 \"open\"",
            "ACCOUNT 1 \"Assets:Cash\" Assets:Cash",
            "EOL 1 \"\\n\"",
        ]
    );
}

#[test]
fn test_lex_first_line_offset() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_ledger(dir.path(), "ledger.beancount", "\nUSD");

    let output = doctor(&["lex", "--first-line", "40", &path]).unwrap();
    assert_eq!(
        output.stdout.lines().collect::<Vec<_>>(),
        vec!["EOL 41 \"\\n\"", "CURRENCY 42 \"USD\" USD"]
    );
}

#[test]
fn test_lex_continues_after_bad_character() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_ledger(dir.path(), "ledger.beancount", "2024-01-01 $ USD\n");

    let output = doctor(&["lex", &path]).unwrap();
    assert_eq!(output.errors, 1);
    assert!(output.stderr.contains("unexpected '$'"));
    assert!(output.stdout.contains("CURRENCY 1 \"USD\" USD"));
}

#[test]
fn test_lex_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.beancount").display().to_string();

    let err = doctor(&["lex", &path]).err().unwrap();
    let message = format!("{err:#}");
    assert!(message.contains("failed to lex"));
    assert!(message.contains("absent.beancount"));
}

// ============================================================================
// parse
// ============================================================================

#[test]
fn test_parse_lists_calls() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_ledger(dir.path(), "ledger.beancount", LEDGER);

    let output = doctor(&["parse", "--report-filename", "main.beancount", &path]).unwrap();
    assert_eq!(output.errors, 0);
    assert_eq!(
        output.stdout.lines().collect::<Vec<_>>(),
        vec![
            "main.beancount:1 open",
            "main.beancount:3 transaction",
            "main.beancount:4 posting",
            "main.beancount:5 posting",
        ]
    );
    assert!(output.stderr.contains("No errors found"));
}

#[test]
fn test_parse_verbose_includes_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_ledger(dir.path(), "ledger.beancount", "2024-01-01 open Assets:Cash\n");

    let output = doctor(&["parse", "-v", &path]).unwrap();
    assert!(output.stdout.contains(" open {"));
    assert!(output.stdout.contains("\"construct\":\"open\""));
    assert!(output.stdout.contains("Assets:Cash"));
}

#[test]
fn test_parse_error_rendered() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_ledger(
        dir.path(),
        "ledger.beancount",
        "2024-01-01 open Assets:Cash\n2024-01-02 close\n",
    );

    let output = doctor(&["parse", &path]).unwrap();
    assert_eq!(output.errors, 1);
    assert_eq!(output.stdout.trim_end(), format!("{path}:1 open"));
    assert!(output.stderr.contains("P0014"));
    assert!(output.stderr.contains("expected account name"));
    assert!(output.stderr.contains("1 error"));
}

#[test]
fn test_parse_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_ledger(
        dir.path(),
        "ledger.beancount",
        "2024-01-01 commodity USD\n2024-01-02 close\n",
    );

    let output = doctor(&[
        "parse",
        "--format",
        "json",
        "--first-line",
        "10",
        "--report-filename",
        "r.beancount",
        &path,
    ])
    .unwrap();
    assert_eq!(output.errors, 1);

    let json: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(json["error_count"], 1);
    assert_eq!(json["calls"][0]["construct"], "commodity");
    assert_eq!(json["calls"][0]["line"], 11);
    assert_eq!(json["calls"][0]["file"], "r.beancount");
    assert_eq!(json["calls"].as_array().unwrap().len(), 1);

    let diagnostic = &json["diagnostics"][0];
    assert_eq!(diagnostic["line"], 12);
    assert_eq!(diagnostic["code"], "P0014");
    assert_eq!(diagnostic["severity"], "error");
}

#[test]
fn test_parse_reports_invalid_utf8_on_its_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin1.beancount");
    std::fs::write(
        &path,
        b"2024-01-01 open Assets:Cash\n2024-01-02 note Assets:Cash \"caf\xe9\"\n",
    )
    .unwrap();
    let path = path.display().to_string();

    let output = doctor(&["parse", &path]).unwrap();
    assert_eq!(output.errors, 1);
    assert_eq!(output.stdout.trim_end(), format!("{path}:1 open"));
    assert!(output.stderr.contains("P0006"));
    assert!(output.stderr.contains("invalid UTF-8"));
}

#[test]
fn test_lex_continues_after_invalid_utf8() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin1.beancount");
    std::fs::write(&path, b"; caf\xe9\nUSD\n").unwrap();
    let path = path.display().to_string();

    let output = doctor(&["lex", &path]).unwrap();
    assert_eq!(output.errors, 1);
    assert!(output.stderr.contains("invalid UTF-8"));
    assert!(output.stdout.contains("CURRENCY 2 \"USD\" USD"));
}

#[test]
fn test_parse_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.beancount").display().to_string();

    let err = doctor(&["parse", &path]).err().unwrap();
    assert!(format!("{err:#}").contains("cannot open file"));
}
