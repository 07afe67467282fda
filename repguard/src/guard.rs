//! Per-request guard state.

use crate::buffer::TokenHistoryBuffer;
use crate::classifier::RepetitionClassifier;
use crate::config::ValidatedConfig;
use crate::scanner::PeriodScanner;
use crate::stopper::Stopper;
use crate::types::{FinishReason, GuardDecision, TokenId, STOP_REASON};
use std::sync::Arc;
use tracing::{debug, trace};

/// Repetition guard for one generation request.
///
/// Feed every generated token to [`observe`](Self::observe) and stop the
/// request once it returns [`GuardDecision::Stop`]. The guard only decides;
/// calling `observe` after a stop is allowed and keeps tracking the stream.
///
/// A guard built from a disabled configuration holds no buffer and always
/// answers `Continue`.
///
/// ## Performance
///
/// Each `observe` pushes into the ring buffer, updates one counter per
/// tracked period and checks the evaluated periods against their thresholds.
/// Cost is O(max tracked period) per token, independent of how many tokens
/// the request has produced.
///
/// ## Thread Safety
///
/// `GuardState` is `Send` but mutated through `&mut self`. Each request owns
/// its own guard; only the `Arc<ValidatedConfig>` is shared.
///
/// ## Memory Usage
///
/// One `buffer_capacity`-slot buffer plus one counter per tracked period,
/// allocated once in [`new`](Self::new). Nothing grows afterwards.
///
/// # Examples
///
/// ```rust
/// use repguard::{GuardConfig, GuardState};
/// use std::sync::Arc;
///
/// let config = GuardConfig::default().with_max_token_rep(3).validate().unwrap();
/// let mut guard = GuardState::new(Arc::new(config));
///
/// assert!(!guard.observe(42).is_stop());
/// assert!(!guard.observe(42).is_stop());
/// let decision = guard.observe(42);
/// assert_eq!(decision.stop_reason().map(|r| r.period), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct GuardState {
    config: Arc<ValidatedConfig>,
    detector: Option<Detector>,
    last_decision: GuardDecision,
    tokens_observed: usize,
}

#[derive(Debug, Clone)]
struct Detector {
    buffer: TokenHistoryBuffer,
    scanner: PeriodScanner,
    classifier: RepetitionClassifier,
}

impl Detector {
    fn new(config: &ValidatedConfig) -> Self {
        Self {
            buffer: TokenHistoryBuffer::with_valid_capacity(config.buffer_capacity),
            scanner: PeriodScanner::new(config.max_tracked_period()),
            classifier: RepetitionClassifier::new(config),
        }
    }
}

impl GuardState {
    /// Create a guard for a new request.
    ///
    /// The buffer and scanner are sized from `config` here; a disabled
    /// configuration allocates neither.
    pub fn new(config: Arc<ValidatedConfig>) -> Self {
        let detector = config.enabled.then(|| Detector::new(&config));
        trace!(
            enabled = config.enabled,
            buffer_capacity = config.buffer_capacity,
            "Creating repetition guard"
        );
        Self {
            config,
            detector,
            last_decision: GuardDecision::Continue,
            tokens_observed: 0,
        }
    }

    /// Record the next generated token and decide whether to stop.
    ///
    /// Never fails. The returned decision is also kept as
    /// [`last_decision`](Self::last_decision).
    pub fn observe(&mut self, token: TokenId) -> GuardDecision {
        let Some(detector) = self.detector.as_mut() else {
            return GuardDecision::Continue;
        };

        detector.buffer.push(token);
        detector.scanner.update(&detector.buffer);
        self.tokens_observed += 1;

        let decision = detector
            .classifier
            .classify(&detector.scanner, detector.buffer.occupancy());
        if let GuardDecision::Stop(reason) = decision {
            if !self.last_decision.is_stop() {
                debug!(
                    period = reason.period,
                    run_length = reason.run_length,
                    threshold = reason.threshold,
                    tokens_observed = self.tokens_observed,
                    "Repetition guard triggered"
                );
            }
        }
        self.last_decision = decision;
        decision
    }

    /// Recompute the decision from the current state without consuming a
    /// token. Always equals [`last_decision`](Self::last_decision).
    pub fn classify(&self) -> GuardDecision {
        match &self.detector {
            Some(detector) => detector
                .classifier
                .classify(&detector.scanner, detector.buffer.occupancy()),
            None => GuardDecision::Continue,
        }
    }

    /// Decision returned by the most recent `observe`, `Continue` before the
    /// first token.
    pub fn last_decision(&self) -> GuardDecision {
        self.last_decision
    }

    /// Tokens observed since creation or the last reset.
    pub fn tokens_observed(&self) -> usize {
        self.tokens_observed
    }

    /// Tokens currently held in the lookback window.
    pub fn occupancy(&self) -> usize {
        self.detector
            .as_ref()
            .map_or(0, |detector| detector.buffer.occupancy())
    }

    /// False when built from a disabled configuration.
    pub fn is_enabled(&self) -> bool {
        self.detector.is_some()
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Forget all history so the guard can serve a new request.
    pub fn reset(&mut self) {
        if let Some(detector) = self.detector.as_mut() {
            detector.buffer.clear();
            detector.scanner.reset();
        }
        self.last_decision = GuardDecision::Continue;
        self.tokens_observed = 0;
    }
}

impl Stopper for GuardState {
    fn should_stop(&mut self, token: TokenId) -> Option<FinishReason> {
        match self.observe(token) {
            GuardDecision::Stop(reason) => {
                Some(FinishReason::Stopped(format!("{STOP_REASON}: {reason}")))
            }
            GuardDecision::Continue => None,
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardConfig;
    use crate::types::StopReason;

    fn guard(config: GuardConfig) -> GuardState {
        GuardState::new(Arc::new(config.validate().unwrap()))
    }

    fn scenario_guard() -> GuardState {
        guard(
            GuardConfig::default()
                .with_buffer_capacity(8)
                .with_max_token_rep(4)
                .with_min_gram_rep(2)
                .with_ngram_bounds(2, 4),
        )
    }

    #[test]
    fn test_bigram_stops_on_fourth_token() {
        let mut guard = scenario_guard();
        assert_eq!(guard.observe(1), GuardDecision::Continue);
        assert_eq!(guard.observe(2), GuardDecision::Continue);
        assert_eq!(guard.observe(1), GuardDecision::Continue);
        assert_eq!(
            guard.observe(2),
            GuardDecision::Stop(StopReason {
                period: 2,
                run_length: 2,
                threshold: 2,
            })
        );
        assert_eq!(guard.tokens_observed(), 4);
    }

    #[test]
    fn test_single_token_threshold() {
        let mut guard = guard(GuardConfig::default());
        for _ in 0..31 {
            assert_eq!(guard.observe(42), GuardDecision::Continue);
        }
        let decision = guard.observe(42);
        assert_eq!(
            decision.stop_reason(),
            Some(&StopReason {
                period: 1,
                run_length: 32,
                threshold: 32,
            })
        );
    }

    #[test]
    fn test_disabled_guard_is_noop() {
        let mut guard = guard(GuardConfig::default().with_enabled(false));
        assert!(!guard.is_enabled());
        for _ in 0..100 {
            assert_eq!(guard.observe(7), GuardDecision::Continue);
        }
        assert_eq!(guard.occupancy(), 0);
        assert_eq!(guard.tokens_observed(), 0);
        assert_eq!(guard.classify(), GuardDecision::Continue);
    }

    #[test]
    fn test_classify_matches_last_decision() {
        let mut guard = scenario_guard();
        for token in [3, 1, 2, 1, 2] {
            guard.observe(token);
            assert_eq!(guard.classify(), guard.last_decision());
            assert_eq!(guard.classify(), guard.classify());
        }
        assert!(guard.last_decision().is_stop());
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut guard = scenario_guard();
        for token in [1, 2, 1, 2] {
            guard.observe(token);
        }
        assert!(guard.last_decision().is_stop());

        guard.reset();
        assert_eq!(guard.last_decision(), GuardDecision::Continue);
        assert_eq!(guard.occupancy(), 0);
        assert_eq!(guard.observe(2), GuardDecision::Continue);
    }

    #[test]
    fn test_stopper_reports_reason() {
        let mut guard = scenario_guard();
        let mut reason = None;
        for token in [5, 5, 5, 5] {
            reason = guard.should_stop(token);
        }
        match reason {
            Some(FinishReason::Stopped(message)) => {
                assert!(message.starts_with("repetition_guard"));
                assert!(message.contains("single token repeated 4 times"));
            }
            None => panic!("expected the guard to stop"),
        }
    }

    #[test]
    fn test_stopper_trait_object() {
        let mut stopper: Box<dyn Stopper> = Box::new(scenario_guard());
        assert!(stopper.should_stop(1).is_none());
        assert!(stopper
            .as_any_mut()
            .downcast_mut::<GuardState>()
            .is_some());
    }

    #[test]
    fn test_thread_safety() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<GuardState>();
        assert_sync::<GuardState>();
    }
}
