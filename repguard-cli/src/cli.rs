//! CLI definition for the repguard command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use repguard::GuardConfig;

/// Repguard - repetition collapse detection for token streams
#[derive(Parser, Debug)]
#[command(name = "repguard")]
#[command(version)]
#[command(about = "Detect repetition collapse in a stream of token ids")]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed token ids through one guard and report where it stops
    Scan {
        /// File of whitespace or comma separated token ids; stdin when omitted
        file: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        overrides: GuardOverrides,
    },
    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        overrides: GuardOverrides,
    },
}

/// Command-line overrides applied on top of loaded configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct GuardOverrides {
    /// Disable the guard entirely
    #[arg(long)]
    pub disable: bool,

    /// Lookback window in tokens (power of two)
    #[arg(long)]
    pub buffer_capacity: Option<usize>,

    /// Tolerated consecutive repetitions of a single token
    #[arg(long)]
    pub max_token_rep: Option<usize>,

    /// Minimum tolerated repetitions of an n-gram
    #[arg(long)]
    pub min_gram_rep: Option<usize>,

    /// Longest period to scan
    #[arg(long)]
    pub max_period_check: Option<usize>,

    /// Shortest n-gram period to scan
    #[arg(long)]
    pub min_ngram_len: Option<usize>,

    /// Longest n-gram period to scan
    #[arg(long)]
    pub max_ngram_len: Option<usize>,

    /// Scan every n-gram period up to --max-period-check
    #[arg(long, conflicts_with_all = ["min_ngram_len", "max_ngram_len"])]
    pub all_periods: bool,
}

impl GuardOverrides {
    pub fn apply(&self, mut config: GuardConfig) -> GuardConfig {
        if self.disable {
            config.enabled = false;
        }
        if let Some(value) = self.buffer_capacity {
            config.buffer_capacity = value;
        }
        if let Some(value) = self.max_token_rep {
            config.max_token_rep = value;
        }
        if let Some(value) = self.min_gram_rep {
            config.min_gram_rep = value;
        }
        if let Some(value) = self.max_period_check {
            config.max_period_check = value;
        }
        if self.all_periods {
            config = config.without_ngram_bounds();
        }
        if let Some(value) = self.min_ngram_len {
            config.min_ngram_len = Some(value);
        }
        if let Some(value) = self.max_ngram_len {
            config.max_ngram_len = Some(value);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_replace_only_given_values() {
        let overrides = GuardOverrides {
            max_token_rep: Some(8),
            max_ngram_len: Some(5),
            ..Default::default()
        };
        let config = overrides.apply(GuardConfig::default());
        assert_eq!(config.max_token_rep, 8);
        assert_eq!(config.max_ngram_len, Some(5));
        assert_eq!(config.min_ngram_len, Some(3));
        assert_eq!(config.buffer_capacity, 1024);
        assert!(config.enabled);
    }

    #[test]
    fn test_all_periods_clears_bounds() {
        let overrides = GuardOverrides {
            all_periods: true,
            disable: true,
            ..Default::default()
        };
        let config = overrides.apply(GuardConfig::default());
        assert_eq!(config.min_ngram_len, None);
        assert_eq!(config.max_ngram_len, None);
        assert!(!config.enabled);
    }

    #[test]
    fn test_parse_scan_arguments() {
        let cli = Cli::try_parse_from([
            "repguard",
            "scan",
            "tokens.txt",
            "--json",
            "--max-token-rep",
            "4",
        ])
        .unwrap();
        match cli.command {
            Commands::Scan {
                file,
                json,
                overrides,
            } => {
                assert_eq!(file, Some(PathBuf::from("tokens.txt")));
                assert!(json);
                assert_eq!(overrides.max_token_rep, Some(4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
