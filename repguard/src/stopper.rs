//! # Generation Stoppers
//!
//! A host usually checks several stopping conditions after each generated
//! token. The [`Stopper`] trait gives them a uniform shape: each stopper sees
//! the new token and returns a [`FinishReason`] when generation should end.
//! The first stopper to return one terminates the request with that reason.
//!
//! [`GuardState`](crate::GuardState) implements this trait, reporting
//! repetition collapse as a stop.

use crate::types::{FinishReason, TokenId};

/// Trait for determining when to stop text generation.
///
/// Implementations keep per-request state, so they are `Send` but not
/// shared: each request owns its own instances. They must never panic and
/// must keep memory bounded regardless of generation length.
///
/// ## Implementation Requirements
///
/// - **Incremental**: look only at the new token and internal state, never
///   at the whole generated sequence
/// - **Bounded**: per-token cost must not grow with generation length
/// - **Quiet**: log stops at `debug`; the host decides what to report
///
/// # Examples
///
/// ```rust
/// use repguard::{FinishReason, GuardConfig, GuardState, Stopper};
/// use std::sync::Arc;
///
/// let config = GuardConfig::default().with_max_token_rep(2).validate().unwrap();
/// let mut stoppers: Vec<Box<dyn Stopper>> = vec![Box::new(GuardState::new(Arc::new(config)))];
///
/// let mut finish = None;
/// for token in [5, 5] {
///     finish = stoppers.iter_mut().find_map(|stopper| stopper.should_stop(token));
/// }
/// assert!(matches!(finish, Some(FinishReason::Stopped(_))));
/// ```
pub trait Stopper: Send {
    /// Evaluate the token just generated.
    ///
    /// # Returns
    ///
    /// * `Some(FinishReason)` - Generation should stop with the specified reason
    /// * `None` - Generation should continue
    fn should_stop(&mut self, token: TokenId) -> Option<FinishReason>;

    /// Downcast to `Any` for specialized handling and configuration access.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
