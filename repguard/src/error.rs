//! Error types for guard configuration

use figment::error::Kind;
use std::path::PathBuf;
use thiserror::Error;

/// Category of error for consistent handling and routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// User input or configuration error - can be fixed by user
    User,
    /// Internal logic or environmental error
    Internal,
}

/// Configuration errors.
///
/// Every variant is raised at startup, before any guard is created. The
/// detection path itself has no error cases.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Buffer capacity is zero or not a power of two
    #[error("buffer_capacity must be a power of two greater than 0, got {capacity}")]
    InvalidCapacity { capacity: usize },

    /// A repetition threshold of zero
    #[error("{field} must be greater than 0")]
    ZeroThreshold { field: &'static str },

    /// Maximum period to check is zero
    #[error("max_period_check must be greater than 0")]
    ZeroMaxPeriod,

    /// N-gram length bound of zero
    #[error("{field} must be greater than 0")]
    ZeroNgramLength { field: &'static str },

    /// N-gram length bounds are inverted
    #[error("min_ngram_len ({min}) must not exceed max_ngram_len ({max})")]
    InvertedNgramBounds { min: usize, max: usize },

    /// Configuration file does not exist
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Configuration file extension not recognised
    #[error("Unsupported configuration file format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Configuration sources could not be merged or extracted
    #[error("Failed to parse configuration: {source}")]
    Parse {
        #[source]
        source: Box<figment::Error>,
    },
}

impl ConfigError {
    /// Get the error category for proper handling
    ///
    /// Malformed values in files or `REPGUARD_*` variables are user errors.
    /// Only figment failing to represent the configuration type at all is
    /// internal.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConfigError::Parse { source } => match source.kind {
                Kind::Unsupported(..) | Kind::UnsupportedKey(..) => ErrorCategory::Internal,
                _ => ErrorCategory::User,
            },
            _ => ErrorCategory::User,
        }
    }

    /// Get a unique error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::InvalidCapacity { .. } => "REPGUARD_CAPACITY",
            ConfigError::ZeroThreshold { .. } => "REPGUARD_THRESHOLD",
            ConfigError::ZeroMaxPeriod => "REPGUARD_MAX_PERIOD",
            ConfigError::ZeroNgramLength { .. } | ConfigError::InvertedNgramBounds { .. } => {
                "REPGUARD_NGRAM_BOUNDS"
            }
            ConfigError::FileNotFound { .. } => "REPGUARD_CONFIG_FILE",
            ConfigError::UnsupportedFormat { .. } => "REPGUARD_CONFIG_FORMAT",
            ConfigError::Parse { .. } => "REPGUARD_CONFIG_PARSE",
        }
    }

    /// Check if this is a user-correctable error
    pub fn is_user_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::User)
    }
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        ConfigError::Parse {
            source: Box::new(error),
        }
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
