//! Shared value types exchanged between the guard and its host.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Opaque token identifier produced by the host's tokenizer.
///
/// Only equality is meaningful.
pub type TokenId = u32;

/// Stop reason string surfaced to hosts when the guard aborts a request.
pub const STOP_REASON: &str = "repetition_guard";

/// Identifier of one generation request, owned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Generate a fresh ULID-based id for hosts that do not assign their own.
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Diagnostic payload attached to a stop decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopReason {
    /// Length in tokens of the repeating cycle
    pub period: usize,
    /// Consecutive copies of the cycle ending at the newest token
    pub run_length: usize,
    /// Threshold the run length met or exceeded
    pub threshold: usize,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.period == 1 {
            write!(
                f,
                "single token repeated {} times (threshold {})",
                self.run_length, self.threshold
            )
        } else {
            write!(
                f,
                "{}-gram repeated {} times (threshold {})",
                self.period, self.run_length, self.threshold
            )
        }
    }
}

/// Decision returned to the host after each observed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    #[default]
    Continue,
    Stop(StopReason),
}

impl GuardDecision {
    pub fn is_stop(&self) -> bool {
        matches!(self, GuardDecision::Stop(_))
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        match self {
            GuardDecision::Stop(reason) => Some(reason),
            GuardDecision::Continue => None,
        }
    }
}

/// Reason generation finished, as reported through a [`crate::Stopper`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stopped(String),
}

/// New tokens produced for one request during a single engine step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    pub request_id: RequestId,
    /// Tokens appended to the request's output this step. Empty for
    /// non-generative (pooling) outputs.
    pub new_token_ids: Vec<TokenId>,
}

impl StepOutput {
    pub fn new<R: Into<RequestId>>(request_id: R, new_token_ids: Vec<TokenId>) -> Self {
        Self {
            request_id: request_id.into(),
            new_token_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_request_ids_are_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 26);
    }

    #[test]
    fn test_stop_reason_display() {
        let single = StopReason {
            period: 1,
            run_length: 32,
            threshold: 32,
        };
        assert_eq!(
            single.to_string(),
            "single token repeated 32 times (threshold 32)"
        );

        let gram = StopReason {
            period: 3,
            run_length: 11,
            threshold: 11,
        };
        assert_eq!(gram.to_string(), "3-gram repeated 11 times (threshold 11)");
    }

    #[test]
    fn test_decision_serializes_with_tag() {
        let json = serde_json::to_value(GuardDecision::Continue).unwrap();
        assert_eq!(json, serde_json::json!({ "decision": "continue" }));

        let stop = GuardDecision::Stop(StopReason {
            period: 2,
            run_length: 16,
            threshold: 16,
        });
        let json = serde_json::to_value(stop).unwrap();
        assert_eq!(json["decision"], "stop");
        assert_eq!(json["period"], 2);
        assert_eq!(json["run_length"], 16);
        assert!(stop.is_stop());
        assert_eq!(stop.stop_reason().map(|r| r.period), Some(2));
    }
}
