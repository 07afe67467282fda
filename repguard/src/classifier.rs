//! Threshold classification of scanner run lengths.

use crate::config::ValidatedConfig;
use crate::scanner::PeriodScanner;
use crate::types::{GuardDecision, StopReason};
use std::ops::RangeInclusive;

/// Maps periods to repetition thresholds and decides collapse.
///
/// Period 1 tolerates `max_token_rep` copies. Longer periods tolerate
/// `max(min_gram_rep, ceil(max_token_rep / p))` copies, so a cycle is judged
/// by roughly the number of tokens it wastes, with a floor keeping long
/// cycles detectable.
#[derive(Debug, Clone)]
pub struct RepetitionClassifier {
    max_token_rep: usize,
    min_gram_rep: usize,
    ngram_periods: RangeInclusive<usize>,
}

impl RepetitionClassifier {
    pub fn new(config: &ValidatedConfig) -> Self {
        Self {
            max_token_rep: config.max_token_rep,
            min_gram_rep: config.min_gram_rep,
            ngram_periods: config.ngram_periods(),
        }
    }

    /// Minimum run length that counts as collapse for `period`.
    pub fn threshold(&self, period: usize) -> usize {
        if period <= 1 {
            self.max_token_rep
        } else {
            self.min_gram_rep.max(self.max_token_rep.div_ceil(period))
        }
    }

    /// Whether `period` is evaluated at all, ignoring warm-up.
    pub fn evaluates(&self, period: usize) -> bool {
        period == 1 || self.ngram_periods.contains(&period)
    }

    /// Decide from the current scanner state.
    ///
    /// `occupancy` is the buffer fill; periods longer than half of it cannot
    /// have repeated yet and are skipped. The smallest triggering period wins.
    pub fn classify(&self, scanner: &PeriodScanner, occupancy: usize) -> GuardDecision {
        if let Some(reason) = self.check(scanner, 1) {
            return GuardDecision::Stop(reason);
        }

        let start = *self.ngram_periods.start();
        let end = (*self.ngram_periods.end())
            .min(occupancy / 2)
            .min(scanner.max_period());
        for period in start..=end {
            if let Some(reason) = self.check(scanner, period) {
                return GuardDecision::Stop(reason);
            }
        }

        GuardDecision::Continue
    }

    fn check(&self, scanner: &PeriodScanner, period: usize) -> Option<StopReason> {
        let run_length = scanner.run_length(period);
        let threshold = self.threshold(period);
        (run_length >= threshold).then_some(StopReason {
            period,
            run_length,
            threshold,
        })
    }
}
