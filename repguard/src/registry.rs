//! Host-facing map from request id to guard.
//!
//! The host owns one [`GuardRegistry`] and notifies it of request start,
//! every generated token, and request end. Guards are created and dropped
//! here; nothing else holds them.

use crate::config::ValidatedConfig;
use crate::guard::GuardState;
use crate::types::{GuardDecision, RequestId, StepOutput, TokenId, STOP_REASON};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns the guards of every in-flight request.
///
/// Guards enter the map on [`start`](GuardRegistry::start) and leave it on
/// [`finish`](GuardRegistry::finish); nothing else adds or removes them, so
/// memory is bounded by the number of live requests.
///
/// ## Thread Safety
///
/// The registry is `Send` but takes `&mut self` for every update. Hosts that
/// drive it from several threads wrap it in a mutex; guards of different
/// requests never share mutable state.
#[derive(Debug)]
pub struct GuardRegistry {
    config: Arc<ValidatedConfig>,
    guards: HashMap<RequestId, GuardState>,
}

impl GuardRegistry {
    pub fn new(config: Arc<ValidatedConfig>) -> Self {
        debug!(
            enabled = config.enabled,
            buffer_capacity = config.buffer_capacity,
            max_token_rep = config.max_token_rep,
            min_gram_rep = config.min_gram_rep,
            "Creating guard registry"
        );
        Self {
            config,
            guards: HashMap::new(),
        }
    }

    /// Register a new request. A guard left over under the same id is
    /// replaced.
    pub fn start(&mut self, request_id: RequestId) {
        let guard = GuardState::new(Arc::clone(&self.config));
        if self.guards.insert(request_id.clone(), guard).is_some() {
            warn!(%request_id, "Request started twice, discarding previous guard");
        } else {
            debug!(%request_id, "Request guard created");
        }
    }

    /// Feed one token of `request_id`.
    ///
    /// Unknown requests are a host contract violation; they are logged and
    /// answered with `Continue`.
    pub fn observe(&mut self, request_id: &RequestId, token: TokenId) -> GuardDecision {
        match self.guards.get_mut(request_id) {
            Some(guard) => {
                let decision = guard.observe(token);
                log_stop(request_id, &decision);
                decision
            }
            None => {
                warn!(%request_id, "Token observed for unknown request");
                GuardDecision::Continue
            }
        }
    }

    /// Feed a batch of new tokens of `request_id`, stopping at the first
    /// token that triggers the guard. Tokens after it are not observed.
    pub fn observe_tokens(
        &mut self,
        request_id: &RequestId,
        tokens: &[TokenId],
    ) -> GuardDecision {
        let Some(guard) = self.guards.get_mut(request_id) else {
            warn!(%request_id, "Tokens observed for unknown request");
            return GuardDecision::Continue;
        };
        let decision = feed(guard, tokens);
        log_stop(request_id, &decision);
        decision
    }

    /// Process the outputs of one engine step.
    ///
    /// Only requests registered with [`start`](Self::start) are fed. Outputs
    /// for unknown ids, such as late outputs of a request already passed to
    /// [`finish`](Self::finish), are skipped without creating a guard, so the
    /// registry only grows on `start`. Outputs without new tokens are skipped
    /// too.
    ///
    /// # Returns
    ///
    /// The ids of requests to abort, each once, in the order they were first
    /// seen.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use repguard::{GuardConfig, GuardRegistry, RequestId, StepOutput};
    /// use std::sync::Arc;
    ///
    /// let config = GuardConfig::default().with_max_token_rep(4).validate().unwrap();
    /// let mut registry = GuardRegistry::new(Arc::new(config));
    /// registry.start(RequestId::from("looping"));
    ///
    /// let aborts = registry.process_step(&[StepOutput::new("looping", vec![7; 4])]);
    /// assert_eq!(aborts, vec![RequestId::from("looping")]);
    /// ```
    pub fn process_step(&mut self, outputs: &[StepOutput]) -> Vec<RequestId> {
        let mut aborts = Vec::new();
        let mut seen = HashSet::new();

        for output in outputs {
            if output.new_token_ids.is_empty() {
                continue;
            }
            let Some(guard) = self.guards.get_mut(&output.request_id) else {
                debug!(
                    request_id = %output.request_id,
                    tokens = output.new_token_ids.len(),
                    "Skipping output of untracked request"
                );
                continue;
            };

            let decision = feed(guard, &output.new_token_ids);
            log_stop(&output.request_id, &decision);
            if decision.is_stop() && seen.insert(output.request_id.clone()) {
                aborts.push(output.request_id.clone());
            }
        }

        aborts
    }

    /// Drop the guard of a finished or aborted request, returning its last
    /// decision.
    pub fn finish(&mut self, request_id: &RequestId) -> Option<GuardDecision> {
        let guard = self.guards.remove(request_id)?;
        debug!(
            %request_id,
            tokens_observed = guard.tokens_observed(),
            stopped = guard.last_decision().is_stop(),
            "Request guard released"
        );
        Some(guard.last_decision())
    }

    /// Guard of `request_id`, for diagnostics.
    pub fn get(&self, request_id: &RequestId) -> Option<&GuardState> {
        self.guards.get(request_id)
    }

    pub fn contains(&self, request_id: &RequestId) -> bool {
        self.guards.contains_key(request_id)
    }

    /// Number of requests currently tracked.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Configuration shared by every guard of this registry.
    pub fn config(&self) -> &Arc<ValidatedConfig> {
        &self.config
    }
}

fn feed(guard: &mut GuardState, tokens: &[TokenId]) -> GuardDecision {
    for &token in tokens {
        let decision = guard.observe(token);
        if decision.is_stop() {
            return decision;
        }
    }
    guard.last_decision()
}

fn log_stop(request_id: &RequestId, decision: &GuardDecision) {
    if let GuardDecision::Stop(reason) = decision {
        info!(
            %request_id,
            stop_reason = STOP_REASON,
            period = reason.period,
            run_length = reason.run_length,
            threshold = reason.threshold,
            "Repetition detected, stopping request"
        );
    }
}
