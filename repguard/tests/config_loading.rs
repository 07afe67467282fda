//! Configuration loading from files and environment variables.

use repguard::{ConfigError, ErrorCategory, GuardConfig};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

const VARS: &[&str] = &[
    "REPGUARD_ENABLED",
    "REPGUARD_BUFFER_CAPACITY",
    "REPGUARD_MAX_TOKEN_REP",
    "REPGUARD_MIN_GRAM_REP",
    "REPGUARD_MAX_PERIOD_CHECK",
    "REPGUARD_MIN_NGRAM_LEN",
    "REPGUARD_MAX_NGRAM_LEN",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_sources() {
    clear_env();
    let config = GuardConfig::load(None).unwrap();
    assert_eq!(config.into_inner(), GuardConfig::default());
}

#[test]
#[serial]
fn test_env_overrides_defaults() {
    clear_env();
    std::env::set_var("REPGUARD_BUFFER_CAPACITY", "64");
    std::env::set_var("REPGUARD_MAX_TOKEN_REP", "16");
    std::env::set_var("REPGUARD_ENABLED", "false");

    let config = GuardConfig::load(None).unwrap();
    assert_eq!(config.buffer_capacity, 64);
    assert_eq!(config.max_token_rep, 16);
    assert!(!config.enabled);
    assert_eq!(config.min_gram_rep, 5);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_capacity_fails_at_load() {
    clear_env();
    std::env::set_var("REPGUARD_BUFFER_CAPACITY", "1000");

    let result = GuardConfig::load(None);
    assert!(matches!(
        result,
        Err(ConfigError::InvalidCapacity { capacity: 1000 })
    ));

    clear_env();
}

#[test]
#[serial]
fn test_unparseable_env_value() {
    clear_env();
    std::env::set_var("REPGUARD_MAX_TOKEN_REP", "lots");

    let error = GuardConfig::load(None).unwrap_err();
    assert!(matches!(error, ConfigError::Parse { .. }));
    assert_eq!(error.error_code(), "REPGUARD_CONFIG_PARSE");
    assert!(error.is_user_error());

    clear_env();
}

#[test]
#[serial]
fn test_malformed_toml_is_user_error() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("repguard.toml");
    fs::write(&path, "buffer_capacity = \"abc\"\nmax_token_rep =\n").unwrap();

    let error = GuardConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(error, ConfigError::Parse { .. }));
    assert_eq!(error.category(), ErrorCategory::User);
}

#[test]
#[serial]
fn test_toml_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("repguard.toml");
    fs::write(
        &path,
        "buffer_capacity = 512\nmin_gram_rep = 4\nmax_ngram_len = 6\n",
    )
    .unwrap();

    let config = GuardConfig::load(Some(&path)).unwrap();
    assert_eq!(config.buffer_capacity, 512);
    assert_eq!(config.min_gram_rep, 4);
    assert_eq!(config.max_ngram_len, Some(6));
    assert_eq!(config.min_ngram_len, Some(3));
    assert_eq!(config.ngram_periods(), 3..=6);
}

#[test]
#[serial]
fn test_yaml_file_with_env_override() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("repguard.yaml");
    fs::write(&path, "max_token_rep: 24\nmax_period_check: 64\n").unwrap();
    std::env::set_var("REPGUARD_MAX_TOKEN_REP", "12");

    let config = GuardConfig::load(Some(&path)).unwrap();
    assert_eq!(config.max_token_rep, 12);
    assert_eq!(config.max_period_check, 64);

    clear_env();
}

#[test]
#[serial]
fn test_json_file_with_inverted_bounds() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("repguard.json");
    fs::write(&path, r#"{ "min_ngram_len": 10, "max_ngram_len": 4 }"#).unwrap();

    let result = GuardConfig::load(Some(&path));
    assert!(matches!(
        result,
        Err(ConfigError::InvertedNgramBounds { min: 10, max: 4 })
    ));
}

#[test]
#[serial]
fn test_missing_and_unsupported_files() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    let missing = temp_dir.path().join("absent.toml");
    assert!(matches!(
        GuardConfig::load(Some(&missing)),
        Err(ConfigError::FileNotFound { .. })
    ));

    let ini = temp_dir.path().join("repguard.ini");
    fs::write(&ini, "buffer_capacity=8").unwrap();
    let error = GuardConfig::load(Some(&ini)).unwrap_err();
    assert!(matches!(error, ConfigError::UnsupportedFormat { .. }));
    assert!(error.is_user_error());
}
