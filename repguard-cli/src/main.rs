//! Repguard CLI - repetition collapse detection for token streams.
//!
//! Commands:
//! - `repguard scan [FILE]`: Feed token ids from FILE or stdin through one guard
//! - `repguard config`: Print the effective configuration
//!
//! Exit codes:
//! - 0: No repetition detected
//! - 1: Error
//! - 2: Repetition detected, the stream would have been stopped

use clap::Parser;
use tracing_subscriber::EnvFilter;

use repguard_cli::Cli;

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("repguard=debug,repguard_cli=debug")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = repguard_cli::run(cli);
    std::process::exit(exit_code);
}
