#![no_main]
//! Fuzz target for structured ledger entries.
//!
//! Builds entries from ledger-shaped pieces so inputs get past the tokenizer
//! and exercise the grammar driver and the line bookkeeping.

use arbitrary::Arbitrary;
use beanlex_parser::{ConstructLog, Session};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Entry {
    Open { account: u8, booking: bool },
    Transaction { flag: bool, text: String, legs: Vec<(u8, i32, bool)> },
    Balance { account: u8, units: i32, tolerance: Option<u8> },
    Price { units: i32, divisor: u8 },
    Meta { key: u8, text: String },
    Blank,
    Comment(String),
}

const ACCOUNTS: [&str; 4] = ["Assets:Cash", "Assets:Bank:Checking", "Expenses:Food", "Income:Job"];
const KEYS: [&str; 3] = ["note", "receipt-id", "a_1"];

fn clean(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '"' && *c != '\\')
        .take(40)
        .collect()
}

fn render(entries: &[Entry]) -> String {
    let mut out = String::new();
    for (n, entry) in entries.iter().take(32).enumerate() {
        let date = format!("2024-{:02}-{:02}", n % 12 + 1, n % 28 + 1);
        match entry {
            Entry::Open { account, booking } => {
                out += &format!("{date} open {} USD", ACCOUNTS[*account as usize % 4]);
                if *booking {
                    out += " \"FIFO\"";
                }
            }
            Entry::Transaction { flag, text, legs } => {
                let flag = if *flag { "*" } else { "!" };
                out += &format!("{date} {flag} \"{}\" #fuzz", clean(text));
                for (account, units, cost) in legs.iter().take(6) {
                    out += &format!("\n  {} {units} USD", ACCOUNTS[*account as usize % 4]);
                    if *cost {
                        out += " {1.5 EUR, 2024-01-01}";
                    }
                }
            }
            Entry::Balance { account, units, tolerance } => {
                out += &format!("{date} balance {} {units}", ACCOUNTS[*account as usize % 4]);
                if let Some(t) = tolerance {
                    out += &format!(" ~ 0.{t}");
                }
                out += " USD";
            }
            Entry::Price { units, divisor } => {
                out += &format!("{date} price EUR ({units} / {divisor}) USD");
            }
            Entry::Meta { key, text } => {
                out += &format!(
                    "{date} commodity EUR\n  {}: \"{}\"",
                    KEYS[*key as usize % 3],
                    clean(text)
                );
            }
            Entry::Blank => {}
            Entry::Comment(text) => {
                out += "; ";
                out += &text.replace(['\n', '\r'], " ");
            }
        }
        out.push('\n');
    }
    out
}

fuzz_target!(|entries: Vec<Entry>| {
    let source = render(&entries);
    let mut log = ConstructLog::new();
    let result = Session::new().parse_str("fuzz.beancount", source, &mut log);

    let lines = log.lines();
    assert!(lines.windows(2).all(|w| w[0] <= w[1]));
    match result {
        Ok(()) => assert!(log.methods().iter().all(|m| *m != "error")),
        Err(_) => assert_eq!(log.methods().last(), Some(&"error")),
    }
});
