//! bean-doctor - Debugging tool for ledger files.
//!
//! Compatibility binary for Python beancount users.

fn main() -> std::process::ExitCode {
    beanlex::cmd::doctor::main_with_name("bean-doctor")
}
