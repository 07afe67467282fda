//! Repguard CLI - run the repetition guard over token id streams.
//!
//! The binary is a thin driver around the `repguard` library, useful for
//! replaying a captured generation and tuning thresholds:
//!
//! ```bash
//! echo "5 1 2 1 2 1 2" | repguard scan --max-token-rep 4 --min-gram-rep 2
//! repguard config --config repguard.toml
//! ```

pub mod cli;
pub mod scan;

pub use cli::{Cli, Commands, GuardOverrides};
pub use scan::{ScanError, ScanReport, ScanResult};

/// Exit code when the input ran through without a stop.
pub const EXIT_CONTINUE: i32 = 0;
/// Exit code for configuration, input or output errors.
pub const EXIT_ERROR: i32 = 1;
/// Exit code when the guard stopped the stream.
pub const EXIT_STOPPED: i32 = 2;

/// Execute a parsed command line and return the process exit code.
pub fn run(cli: Cli) -> i32 {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Scan {
            file,
            json,
            overrides,
        } => match scan::run_scan(config_path, file.as_deref(), json, &overrides) {
            Ok(true) => EXIT_STOPPED,
            Ok(false) => EXIT_CONTINUE,
            Err(e) => report_error(&e),
        },
        Commands::Config { overrides } => {
            result_to_exit(scan::run_config(config_path, &overrides))
        }
    }
}

/// Convert a `Result<(), E: Display>` to an exit code.
pub fn result_to_exit<E: std::fmt::Display>(result: Result<(), E>) -> i32 {
    match result {
        Ok(()) => EXIT_CONTINUE,
        Err(e) => report_error(&e),
    }
}

fn report_error<E: std::fmt::Display>(error: &E) -> i32 {
    eprintln!("Error: {}", error);
    EXIT_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_to_exit_ok() {
        let result: Result<(), String> = Ok(());
        assert_eq!(result_to_exit(result), 0);
    }

    #[test]
    fn test_result_to_exit_err() {
        let result: Result<(), String> = Err("something failed".to_string());
        assert_eq!(result_to_exit(result), 1);
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        assert_eq!(EXIT_CONTINUE, 0);
        assert_eq!(EXIT_ERROR, 1);
        assert_eq!(EXIT_STOPPED, 2);
    }
}
