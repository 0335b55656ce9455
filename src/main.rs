//! Geotiler CLI entry point.

#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

fn main() {
    if let Err(e) = geotiler::run() {
        eprintln!("error: {e}");
        // 128 + SIGINT(2) for interrupted runs
        let code = if matches!(e, geotiler::Error::Interrupted) { 130 } else { 1 };
        std::process::exit(code);
    }
}
