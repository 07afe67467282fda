//! Fixed-capacity circular history of the most recent tokens of one request.

use crate::error::{ConfigError, ConfigResult};
use crate::types::TokenId;

/// Ring buffer addressed by logical offset from the newest token.
///
/// Offset 0 is the most recently pushed token; larger offsets are older.
/// Capacity is a power of two so wraparound is a single mask.
///
/// ```rust
/// use repguard::TokenHistoryBuffer;
///
/// let mut buffer = TokenHistoryBuffer::new(4).unwrap();
/// for token in 1..=6 {
///     buffer.push(token);
/// }
/// assert!(buffer.is_full());
/// assert_eq!(buffer.iter().collect::<Vec<_>>(), vec![6, 5, 4, 3]);
/// assert_eq!(buffer.get(4), None);
/// ```
#[derive(Debug, Clone)]
pub struct TokenHistoryBuffer {
    slots: Box<[TokenId]>,
    mask: usize,
    /// Slot the next push writes to
    head: usize,
    occupancy: usize,
}

impl TokenHistoryBuffer {
    /// Create an empty buffer.
    ///
    /// Fails when `capacity` is zero or not a power of two.
    pub fn new(capacity: usize) -> ConfigResult<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(ConfigError::InvalidCapacity { capacity });
        }
        Ok(Self::with_valid_capacity(capacity))
    }

    /// Create an empty buffer from a capacity already checked by
    /// configuration validation.
    pub(crate) fn with_valid_capacity(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            slots: vec![0; capacity].into_boxed_slice(),
            mask: capacity - 1,
            head: 0,
            occupancy: 0,
        }
    }

    /// Append a token, overwriting the oldest one once the buffer is full.
    #[inline]
    pub fn push(&mut self, token: TokenId) {
        self.slots[self.head] = token;
        self.head = (self.head + 1) & self.mask;
        if self.occupancy < self.slots.len() {
            self.occupancy += 1;
        }
    }

    /// Token `offset` steps behind the newest one.
    ///
    /// `offset` must be below [`occupancy`](Self::occupancy); debug builds
    /// assert it.
    #[inline]
    pub fn at(&self, offset: usize) -> TokenId {
        debug_assert!(
            offset < self.occupancy,
            "offset {offset} outside occupancy {}",
            self.occupancy
        );
        self.slots[self.head.wrapping_sub(1 + offset) & self.mask]
    }

    /// Token `offset` steps behind the newest one, or `None` outside the
    /// occupied window.
    pub fn get(&self, offset: usize) -> Option<TokenId> {
        (offset < self.occupancy).then(|| self.at(offset))
    }

    /// Tokens currently held, at most [`capacity`](Self::capacity).
    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    /// Size of the lookback window.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy == 0
    }

    pub fn is_full(&self) -> bool {
        self.occupancy == self.slots.len()
    }

    /// Forget every token. Capacity is kept.
    pub fn clear(&mut self) {
        self.head = 0;
        self.occupancy = 0;
    }

    /// Occupied tokens from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = TokenId> + '_ {
        (0..self.occupancy).map(move |offset| self.at(offset))
    }
}
