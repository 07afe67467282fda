//! Incremental period scanning over a [`TokenHistoryBuffer`].
//!
//! For each tracked period `p` the scanner keeps the length of the longest
//! suffix of the window in which every token equals the token `p` positions
//! earlier. A push extends that suffix by one when the new token matches,
//! and resets it otherwise, so each token costs one comparison per period.
//! The number of consecutive copies of the newest `p`-block follows directly:
//! `matched / p + 1`.

use crate::buffer::TokenHistoryBuffer;

/// Tracks repeat runs for periods `1..=max_period`.
///
/// ## Performance
///
/// [`update`](Self::update) does one comparison and one counter update per
/// period, and [`run_length`](Self::run_length) is a division. Nothing
/// depends on how long the stream has been running.
///
/// ## Memory Usage
///
/// One `usize` per period, allocated in [`new`](Self::new).
///
/// # Examples
///
/// ```rust
/// use repguard::{PeriodScanner, TokenHistoryBuffer};
///
/// let mut buffer = TokenHistoryBuffer::new(16).unwrap();
/// let mut scanner = PeriodScanner::new(4);
/// for token in [1, 2, 1, 2, 1, 2] {
///     buffer.push(token);
///     scanner.update(&buffer);
/// }
/// assert_eq!(scanner.run_length(2), 3);
/// assert_eq!(scanner.run_length(1), 0);
/// ```
#[derive(Debug, Clone)]
pub struct PeriodScanner {
    /// `matched[p - 1]` is the periodic suffix length for period `p`
    matched: Vec<usize>,
}

impl PeriodScanner {
    /// Create a scanner for periods `1..=max_period`. Period 1 is always
    /// tracked, even when `max_period` is 0.
    pub fn new(max_period: usize) -> Self {
        Self {
            matched: vec![0; max_period.max(1)],
        }
    }

    /// Longest tracked period.
    pub fn max_period(&self) -> usize {
        self.matched.len()
    }

    /// Account for the token just pushed into `buffer`.
    ///
    /// Must be called exactly once after every push, with the same buffer.
    pub fn update(&mut self, buffer: &TokenHistoryBuffer) {
        let occupancy = buffer.occupancy();
        if occupancy == 0 {
            return;
        }
        let newest = buffer.at(0);
        let capacity = buffer.capacity();

        for (index, matched) in self.matched.iter_mut().enumerate() {
            let period = index + 1;
            if period < occupancy && buffer.at(period) == newest {
                // Pairs reaching past the window no longer count.
                *matched = (*matched + 1).min(capacity - period);
            } else {
                *matched = 0;
            }
        }
    }

    /// Consecutive copies of the newest `period`-token block, or 0 when the
    /// block has not repeated even once.
    pub fn run_length(&self, period: usize) -> usize {
        if period == 0 || period > self.matched.len() {
            return 0;
        }
        copies(self.matched[period - 1], period)
    }

    /// Forget all runs, as after clearing the buffer.
    pub fn reset(&mut self) {
        self.matched.fill(0);
    }
}

fn copies(matched: usize, period: usize) -> usize {
    let copies = matched / period + 1;
    if copies >= 2 {
        copies
    } else {
        0
    }
}

/// Compute the run length for `period` by walking the buffer block by block.
///
/// Costs O(occupancy) per call; [`PeriodScanner`] yields the same values
/// incrementally.
pub fn rescan_run_length(buffer: &TokenHistoryBuffer, period: usize) -> usize {
    let occupancy = buffer.occupancy();
    if period == 0 || 2 * period > occupancy {
        return 0;
    }

    let mut blocks = 1;
    while (blocks + 1) * period <= occupancy {
        let start = blocks * period;
        let same = (0..period).all(|k| buffer.at(k) == buffer.at(start + k));
        if !same {
            break;
        }
        blocks += 1;
    }

    if blocks >= 2 {
        blocks
    } else {
        0
    }
}
