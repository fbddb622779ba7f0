// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cached storage-size statistic.
//!
//! Asking the database for a table's footprint is comparatively expensive and
//! the engines only report it approximately anyway, so stores keep the last
//! reported figure here and add an estimate for writes made since. The profile
//! is refreshed when it gets too old, drifts too far, or an eviction has made
//! it meaningless.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SizeProfile {
    /// Bytes reported by the backend at the last refresh
    pub reported_bytes: u64,
    /// Estimated bytes appended since the last refresh
    pub pending_bytes: u64,
    /// When the backend was last asked; `None` until the first refresh
    pub last_refreshed: Option<Instant>,
    /// Set after deletes so the next read goes to the backend
    pub invalidated: bool,
}

impl Default for SizeProfile {
    fn default() -> Self {
        Self {
            reported_bytes: 0,
            pending_bytes: 0,
            last_refreshed: None,
            invalidated: true,
        }
    }
}

impl SizeProfile {
    /// Best current estimate.
    #[must_use]
    pub fn estimate(&self) -> u64 {
        self.reported_bytes.saturating_add(self.pending_bytes)
    }

    /// Whether the backend should be asked again.
    #[must_use]
    pub fn needs_refresh(&self, max_staleness: Duration, max_drift_bytes: u64) -> bool {
        if self.invalidated {
            return true;
        }
        match self.last_refreshed {
            None => true,
            Some(at) => at.elapsed() >= max_staleness || self.pending_bytes > max_drift_bytes,
        }
    }

    pub fn add_pending(&mut self, bytes: u64) {
        self.pending_bytes = self.pending_bytes.saturating_add(bytes);
    }

    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    pub fn refresh(&mut self, reported_bytes: u64) {
        self.reported_bytes = reported_bytes;
        self.pending_bytes = 0;
        self.last_refreshed = Some(Instant::now());
        self.invalidated = false;
    }
}
