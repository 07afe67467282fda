//! The `scan` and `config` commands.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use repguard::{
    ConfigError, GuardConfig, GuardDecision, GuardState, StopReason, TokenId, ValidatedConfig,
};
use serde::Serialize;
use thiserror::Error;

use crate::cli::GuardOverrides;

/// Errors from the command-line commands.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read token ids from stdin: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("Invalid token id '{value}' at position {position}")]
    InvalidToken { position: usize, value: String },

    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ScanResult<T> = Result<T, ScanError>;

/// Outcome of feeding a token stream through one guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Number of token ids read from the input.
    pub tokens_read: usize,
    /// Number of tokens fed to the guard before the scan ended.
    pub tokens_observed: usize,
    /// Zero-based index of the token that triggered the stop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_index: Option<usize>,
    #[serde(flatten)]
    pub decision: GuardDecision,
}

impl ScanReport {
    pub fn stopped(&self) -> bool {
        self.decision.is_stop()
    }

    /// One line summary for terminal output.
    pub fn summary(&self) -> String {
        match (&self.decision, self.stop_index) {
            (GuardDecision::Stop(reason), Some(index)) => format!(
                "stop at token {index} of {}: {reason}",
                self.tokens_read
            ),
            _ => format!("continue after {} tokens", self.tokens_observed),
        }
    }
}

/// Resolve configuration from defaults, file, environment and flags, in
/// that order of precedence.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &GuardOverrides,
) -> Result<ValidatedConfig, ConfigError> {
    let loaded: GuardConfig = GuardConfig::figment(path)?.extract()?;
    overrides.apply(loaded).validate()
}

/// Parse token ids separated by whitespace and/or commas.
pub fn parse_tokens(input: &str) -> ScanResult<Vec<TokenId>> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|item| !item.is_empty())
        .enumerate()
        .map(|(position, item)| {
            item.parse::<TokenId>()
                .map_err(|_| ScanError::InvalidToken {
                    position,
                    value: item.to_string(),
                })
        })
        .collect()
}

/// Read token ids from `file`, or from stdin when no file is given.
pub fn read_tokens(file: Option<&Path>) -> ScanResult<Vec<TokenId>> {
    let input = match file {
        Some(path) => std::fs::read_to_string(path).map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })?,
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .map_err(ScanError::Stdin)?;
            input
        }
    };
    parse_tokens(&input)
}

/// Feed `tokens` to a fresh guard until it first decides to stop.
pub fn scan(config: Arc<ValidatedConfig>, tokens: &[TokenId]) -> ScanReport {
    let mut guard = GuardState::new(config);

    for (index, &token) in tokens.iter().enumerate() {
        let decision = guard.observe(token);
        if let GuardDecision::Stop(reason) = decision {
            log_stop(index, &reason);
            return ScanReport {
                tokens_read: tokens.len(),
                tokens_observed: index + 1,
                stop_index: Some(index),
                decision,
            };
        }
    }

    tracing::debug!(tokens = tokens.len(), "Scan finished without a stop");
    ScanReport {
        tokens_read: tokens.len(),
        tokens_observed: tokens.len(),
        stop_index: None,
        decision: GuardDecision::Continue,
    }
}

fn log_stop(index: usize, reason: &StopReason) {
    tracing::info!(
        index,
        period = reason.period,
        run_length = reason.run_length,
        threshold = reason.threshold,
        "Repetition detected"
    );
}

/// Run `scan`, printing the report. Returns whether the guard stopped.
pub fn run_scan(
    config_path: Option<&Path>,
    file: Option<&Path>,
    json: bool,
    overrides: &GuardOverrides,
) -> ScanResult<bool> {
    let config = resolve_config(config_path, overrides)?;
    let tokens = read_tokens(file)?;
    let report = scan(Arc::new(config), &tokens);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary());
    }
    Ok(report.stopped())
}

/// Run `config`, printing the effective configuration as JSON.
pub fn run_config(config_path: Option<&Path>, overrides: &GuardOverrides) -> ScanResult<()> {
    let config = resolve_config(config_path, overrides)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
