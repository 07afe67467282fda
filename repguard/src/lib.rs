//! # Repguard
//!
//! Streaming detection of repetition collapse in token generation: a request
//! that keeps emitting the same token, or the same short cycle of tokens,
//! until it hits its length limit.
//!
//! A [`GuardState`] watches one request. After every generated token the host
//! calls [`GuardState::observe`] and stops the request when it returns
//! [`GuardDecision::Stop`]. Per-token cost is bounded by the longest scanned
//! period, independent of how long the request has been running.
//!
//! ```rust
//! use repguard::{GuardConfig, GuardDecision, GuardState};
//! use std::sync::Arc;
//!
//! let config = GuardConfig::default()
//!     .with_buffer_capacity(8)
//!     .with_max_token_rep(4)
//!     .with_min_gram_rep(2)
//!     .with_ngram_bounds(2, 4)
//!     .validate()
//!     .expect("valid configuration");
//! let mut guard = GuardState::new(Arc::new(config));
//!
//! let decisions: Vec<GuardDecision> = [1, 2, 1, 2].iter().map(|&t| guard.observe(t)).collect();
//! assert!(decisions[3].is_stop());
//! ```
//!
//! Hosts serving many requests keep a [`GuardRegistry`], which maps request
//! ids to guards and turns an engine step's outputs into a list of requests
//! to abort.

pub mod buffer;
pub mod classifier;
pub mod config;
pub mod error;
pub mod guard;
pub mod registry;
pub mod scanner;
pub mod stopper;
pub mod types;

pub use buffer::TokenHistoryBuffer;
pub use classifier::RepetitionClassifier;
pub use config::{GuardConfig, ValidatedConfig};
pub use error::{ConfigError, ConfigResult, ErrorCategory};
pub use guard::GuardState;
pub use registry::GuardRegistry;
pub use scanner::{rescan_run_length, PeriodScanner};
pub use stopper::Stopper;
pub use types::{
    FinishReason, GuardDecision, RequestId, StepOutput, StopReason, TokenId, STOP_REASON,
};
