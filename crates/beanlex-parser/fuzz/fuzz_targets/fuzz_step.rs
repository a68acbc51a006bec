#![no_main]
//! Fuzz target for incremental stepping.
//!
//! Stepping must always reach the end, even across lexical errors.

use beanlex_parser::{ConstructLog, Session};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut log = ConstructLog::new();
        let mut session = Session::new();
        if session.begin_str("fuzz.beancount", input, &mut log).is_err() {
            return;
        }
        // Every step consumes at least one byte or ends the run.
        for _ in 0..=input.len() * 2 + 2 {
            match session.step() {
                Ok(None) => break,
                Ok(Some(_)) | Err(_) => {}
            }
        }
        assert!(!session.is_open());
    }
});
