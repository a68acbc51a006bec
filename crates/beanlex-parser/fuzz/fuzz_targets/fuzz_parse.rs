#![no_main]
//! Fuzz target for full parses.
//!
//! Arbitrary bytes may fail to parse, but must never panic, and the builder
//! must see non-decreasing lines.

use beanlex_parser::{ConstructLog, GrammarDriver, Tokenizer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut tokenizer = Tokenizer::from_bytes("fuzz.beancount", data.to_vec());
    let mut log = ConstructLog::new();
    let _ = GrammarDriver::new(&mut tokenizer).run(&mut log);
    let lines = log.lines();
    assert!(lines.windows(2).all(|w| w[0] <= w[1]));
});
