//! beanlex-doctor - Debugging tool for ledger files.

fn main() -> std::process::ExitCode {
    beanlex::cmd::doctor::main()
}
