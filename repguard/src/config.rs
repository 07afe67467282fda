//! Guard configuration and its loading from files and the environment
//!
//! Configuration is read once at startup, validated, and then shared read-only
//! by every request-local guard through an `Arc<ValidatedConfig>`.

use crate::classifier::RepetitionClassifier;
use crate::error::{ConfigError, ConfigResult};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, RangeInclusive};
use std::path::Path;
use tracing::{debug, warn};

/// Prefix of environment variables overriding configuration values.
pub const ENV_PREFIX: &str = "REPGUARD_";

/// Raw guard configuration as written in config files or built in code.
///
/// Call [`GuardConfig::validate`] to obtain a [`ValidatedConfig`], which is
/// the only form the detection types accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// When false every guard is a permanent no-op.
    pub enabled: bool,
    /// Lookback window in tokens. Must be a power of two.
    pub buffer_capacity: usize,
    /// Tolerated consecutive repetitions of a single token.
    pub max_token_rep: usize,
    /// Floor on the tolerated repetitions of an n-gram.
    pub min_gram_rep: usize,
    /// Longest period scanned.
    pub max_period_check: usize,
    /// Shortest n-gram period scanned, when bounded.
    pub min_ngram_len: Option<usize>,
    /// Longest n-gram period scanned, when bounded.
    pub max_ngram_len: Option<usize>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buffer_capacity: 1024,
            max_token_rep: 32,
            min_gram_rep: 5,
            max_period_check: 256,
            min_ngram_len: Some(3),
            max_ngram_len: Some(12),
        }
    }
}

impl GuardConfig {
    /// Load configuration from defaults, an optional file and `REPGUARD_*`
    /// environment variables, later sources overriding earlier ones.
    pub fn load(path: Option<&Path>) -> ConfigResult<ValidatedConfig> {
        let config: GuardConfig = Self::figment(path)?.extract()?;
        config.validate()
    }

    /// Build the figment with all sources in precedence order
    pub fn figment(path: Option<&Path>) -> ConfigResult<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(GuardConfig::default()));

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            debug!("Loading guard configuration file: {}", path.display());
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_ascii_lowercase());
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => {
                    return Err(ConfigError::UnsupportedFormat {
                        path: path.to_path_buf(),
                    })
                }
            };
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Check every invariant and wrap the configuration for sharing.
    pub fn validate(self) -> ConfigResult<ValidatedConfig> {
        if self.buffer_capacity == 0 || !self.buffer_capacity.is_power_of_two() {
            return Err(ConfigError::InvalidCapacity {
                capacity: self.buffer_capacity,
            });
        }
        if self.max_token_rep == 0 {
            return Err(ConfigError::ZeroThreshold {
                field: "max_token_rep",
            });
        }
        if self.min_gram_rep == 0 {
            return Err(ConfigError::ZeroThreshold {
                field: "min_gram_rep",
            });
        }
        if self.max_period_check == 0 {
            return Err(ConfigError::ZeroMaxPeriod);
        }
        if self.min_ngram_len == Some(0) {
            return Err(ConfigError::ZeroNgramLength {
                field: "min_ngram_len",
            });
        }
        if self.max_ngram_len == Some(0) {
            return Err(ConfigError::ZeroNgramLength {
                field: "max_ngram_len",
            });
        }
        if let (Some(min), Some(max)) = (self.min_ngram_len, self.max_ngram_len) {
            if min > max {
                return Err(ConfigError::InvertedNgramBounds { min, max });
            }
        }

        if self.max_token_rep == 1 || self.min_gram_rep == 1 {
            warn!(
                max_token_rep = self.max_token_rep,
                min_gram_rep = self.min_gram_rep,
                "Repetition threshold of 1 behaves like 2: a run needs at least one repeat"
            );
        }
        if self.max_period_check > self.buffer_capacity / 2 {
            debug!(
                max_period_check = self.max_period_check,
                buffer_capacity = self.buffer_capacity,
                "max_period_check exceeds half the buffer and is clamped"
            );
        }

        let validated = ValidatedConfig(self);
        if validated.enabled {
            let unreachable = validated.unreachable_periods();
            if unreachable.first() == Some(&1) {
                warn!(
                    max_token_rep = validated.max_token_rep,
                    buffer_capacity = validated.buffer_capacity,
                    "max_token_rep exceeds buffer_capacity: single-token loops are never stopped"
                );
            }
            let ngrams: Vec<usize> = unreachable.into_iter().filter(|&p| p > 1).collect();
            if !ngrams.is_empty() {
                warn!(
                    periods = ?ngrams,
                    buffer_capacity = validated.buffer_capacity,
                    "Threshold times period exceeds buffer_capacity: these n-gram periods are never stopped"
                );
            }
        }

        Ok(validated)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    pub fn with_max_token_rep(mut self, max_token_rep: usize) -> Self {
        self.max_token_rep = max_token_rep;
        self
    }

    pub fn with_min_gram_rep(mut self, min_gram_rep: usize) -> Self {
        self.min_gram_rep = min_gram_rep;
        self
    }

    pub fn with_max_period_check(mut self, max_period_check: usize) -> Self {
        self.max_period_check = max_period_check;
        self
    }

    pub fn with_ngram_bounds(mut self, min: usize, max: usize) -> Self {
        self.min_ngram_len = Some(min);
        self.max_ngram_len = Some(max);
        self
    }

    /// Scan every n-gram period up to `max_period_check`.
    pub fn without_ngram_bounds(mut self) -> Self {
        self.min_ngram_len = None;
        self.max_ngram_len = None;
        self
    }
}

/// A [`GuardConfig`] whose invariants have been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidatedConfig(GuardConfig);

impl ValidatedConfig {
    /// Periods greater than one that are evaluated, before the occupancy
    /// limit is applied. Empty when the bounds exclude every n-gram.
    pub fn ngram_periods(&self) -> RangeInclusive<usize> {
        let lo = self.0.min_ngram_len.unwrap_or(2).max(2);
        let hi = self
            .0
            .max_period_check
            .min(self.0.max_ngram_len.unwrap_or(usize::MAX))
            .min(self.0.buffer_capacity / 2);
        lo..=hi
    }

    /// Largest period whose run length has to be tracked.
    pub fn max_tracked_period(&self) -> usize {
        let ngrams = self.ngram_periods();
        if ngrams.is_empty() {
            1
        } else {
            *ngrams.end()
        }
    }

    /// Evaluated periods whose threshold can never be reached.
    ///
    /// A window of `buffer_capacity` tokens holds at most
    /// `buffer_capacity / p` copies of a `p`-token block, so a period is
    /// unreachable when its threshold is larger than that.
    pub fn unreachable_periods(&self) -> Vec<usize> {
        let classifier = RepetitionClassifier::new(self);
        std::iter::once(1)
            .chain(self.ngram_periods())
            .filter(|&period| classifier.threshold(period) > self.buffer_capacity / period)
            .collect()
    }

    pub fn into_inner(self) -> GuardConfig {
        self.0
    }
}

impl Deref for ValidatedConfig {
    type Target = GuardConfig;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
