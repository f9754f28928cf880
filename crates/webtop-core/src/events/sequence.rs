//! Monotonic sequence counter.
//!
//! # Where sequence numbers are used (for beginners)
//!
//! Two parts of the shell need numbers that only ever go up:
//!
//! - **Window stacking (z-order)** – every time a window is focused it takes
//!   the next value.  Because values are never reused, two windows can never
//!   tie for "on top".
//! - **Icon saves** – every icon move takes the next value.  When the
//!   persistence collaborator answers out of order, the larger number tells us
//!   which position is the most recent intent.
//!
//! # Why an atomic?
//!
//! The shell itself is single-threaded, but save completions are produced by
//! tokio tasks.  An `AtomicU64` lets a counter be read from either side
//! without a lock and costs nothing extra on the shell thread.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter.
///
/// # Examples
///
/// ```rust
/// use webtop_core::SequenceCounter;
///
/// let counter = SequenceCounter::starting_at(1);
/// assert_eq!(counter.next(), 1);
/// assert_eq!(counter.next(), 2);
/// ```
#[derive(Debug)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    /// Creates a counter whose first [`next`](Self::next) returns 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a counter whose first [`next`](Self::next) returns `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            inner: AtomicU64::new(first),
        }
    }

    /// Returns the next value and advances the counter.
    ///
    /// `Ordering::Relaxed` is enough: the values order events, they do not
    /// publish other memory.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the value the next call to [`next`](Self::next) will hand out.
    pub fn peek(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_counter_starts_at_zero() {
        // Arrange
        let counter = SequenceCounter::new();

        // Act
        let first = counter.next();

        // Assert
        assert_eq!(first, 0);
    }

    #[test]
    fn test_sequence_counter_increments_monotonically() {
        // Arrange
        let counter = SequenceCounter::starting_at(100);

        // Act
        let values: Vec<u64> = (0..100).map(|_| counter.next()).collect();

        // Assert – values must be strictly monotonically increasing
        for window in values.windows(2) {
            assert!(
                window[1] > window[0],
                "values must be monotonically increasing"
            );
        }
        assert_eq!(values[0], 100);
    }

    #[test]
    fn test_peek_does_not_increment() {
        // Arrange
        let counter = SequenceCounter::new();
        counter.next();

        // Act
        let peeked = counter.peek();
        let next = counter.next();

        // Assert
        assert_eq!(peeked, 1);
        assert_eq!(next, 1);
    }
}
