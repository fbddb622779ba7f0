// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Size-ceiling retention decision.
//!
//! Eviction removes the oldest half of a stream *by count*, not by bytes.
//! Halving the records is assumed to roughly halve the footprint; the two are
//! not strictly proportional, and which records survive depends on this rule.

/// Outcome of evaluating a stream against its ceiling. Derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionDecision {
    /// Whether the stream is over its ceiling
    pub due_now: bool,
    /// Oldest records to remove
    pub delete_count: u64,
}

impl RetentionDecision {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.due_now || self.delete_count == 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionPolicy;

impl RetentionPolicy {
    /// Records to remove from a stream of `count` records: the oldest half,
    /// rounded down. Streams of 0 or 1 records never lose anything.
    #[must_use]
    pub fn half_of(count: u64) -> u64 {
        if count <= 1 {
            0
        } else {
            count / 2
        }
    }

    /// ```
    /// use board_engine::retention::RetentionPolicy;
    ///
    /// let decision = RetentionPolicy::evaluate(301, 300, 10);
    /// assert!(decision.due_now);
    /// assert_eq!(decision.delete_count, 5);
    ///
    /// let under = RetentionPolicy::evaluate(300, 300, 10);
    /// assert!(!under.due_now);
    /// ```
    #[must_use]
    pub fn evaluate(current_size_bytes: u64, ceiling_bytes: u64, current_count: u64) -> RetentionDecision {
        let due_now = current_size_bytes > ceiling_bytes;
        RetentionDecision {
            due_now,
            delete_count: if due_now { Self::half_of(current_count) } else { 0 },
        }
    }
}
