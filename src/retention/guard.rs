// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Reactive storage guard.
//!
//! After every successful append the write path calls
//! [`StorageGuard::spawn_check`] and returns to its caller immediately. The
//! check runs as a background task:
//!
//! ```text
//! estimated_size_bytes() ──► RetentionPolicy::evaluate(size, ceiling, count())
//!                                   │
//!                     due_now ──────┴──────► EvictionExecutor::evict_oldest_half
//! ```
//!
//! Failures are logged and dropped; the next write re-evaluates.
//!
//! Because the size statistic lags, a burst of writes over the ceiling would
//! otherwise start one eviction per write, each halving the stream again.
//! Only one reactive eviction per stream runs at a time; checks that arrive
//! while one is running are skipped. The scheduled sweeper is not subject to
//! this and may overlap with a reactive eviction.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::record::StreamKind;
use crate::storage::traits::RecordStore;
use super::executor::{EvictionError, EvictionExecutor, EvictionOutcome, EvictionTrigger};
use super::policy::RetentionPolicy;

/// What a single guard check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Stream is within its ceiling (or too small to shrink)
    WithinCeiling { size_bytes: u64 },
    /// An eviction ran
    Evicted(EvictionOutcome),
    /// Another reactive eviction for this stream was already running
    Coalesced,
    /// The check failed; logged, retried on the next write
    Failed(String),
}

/// Clears the eviction flag when dropped, including on panic or task cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Pending(Arc<StorageGuard>);

impl Drop for Pending {
    fn drop(&mut self) {
        self.0.pending.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct StorageGuard {
    stream: StreamKind,
    store: Arc<dyn RecordStore>,
    ceiling_bytes: u64,
    executor: EvictionExecutor,
    evicting: AtomicBool,
    pending: AtomicUsize,
}

impl StorageGuard {
    pub fn new(
        stream: StreamKind,
        store: Arc<dyn RecordStore>,
        ceiling_bytes: u64,
        executor: EvictionExecutor,
    ) -> Self {
        Self {
            stream,
            store,
            ceiling_bytes,
            executor,
            evicting: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    #[must_use]
    pub fn ceiling_bytes(&self) -> u64 {
        self.ceiling_bytes
    }

    /// No spawned checks outstanding.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }

    /// Fire-and-forget check. The returned handle may be dropped; awaiting it
    /// is only useful in tests and at shutdown.
    pub fn spawn_check(self: &Arc<Self>) -> JoinHandle<GuardOutcome> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        let pending = Pending(Arc::clone(self));
        tokio::spawn(async move {
            let outcome = pending.0.check().await;
            drop(pending);
            outcome
        })
    }

    /// Run one check to completion. Never returns an error: failures are
    /// logged and reported as [`GuardOutcome::Failed`].
    pub async fn check(&self) -> GuardOutcome {
        match self.try_check().await {
            Ok(outcome) => {
                crate::metrics::record_guard_check(self.stream.as_str(), outcome_label(&outcome));
                outcome
            }
            Err(e) => {
                warn!(stream = %self.stream, error = %e, "Storage guard check failed; will re-check on next write");
                crate::metrics::record_guard_check(self.stream.as_str(), "failed");
                crate::metrics::record_error(self.stream.as_str(), "guard", error_label(&e));
                GuardOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_check(&self) -> Result<GuardOutcome, EvictionError> {
        let size_bytes = self.store.estimated_size_bytes().await?;
        crate::metrics::set_estimated_bytes(self.stream.as_str(), size_bytes);

        if size_bytes <= self.ceiling_bytes {
            return Ok(GuardOutcome::WithinCeiling { size_bytes });
        }

        let count = self.store.count().await?;
        crate::metrics::set_record_count(self.stream.as_str(), count);
        let decision = RetentionPolicy::evaluate(size_bytes, self.ceiling_bytes, count);
        if decision.is_noop() {
            return Ok(GuardOutcome::WithinCeiling { size_bytes });
        }

        if self
            .evicting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(stream = %self.stream, "Eviction already running, skipping check");
            return Ok(GuardOutcome::Coalesced);
        }
        let _in_flight = InFlight(&self.evicting);

        debug!(
            stream = %self.stream,
            size_bytes,
            ceiling_bytes = self.ceiling_bytes,
            count,
            "Stream over ceiling, evicting oldest half"
        );
        let outcome = self
            .executor
            .evict_oldest_half(self.store.as_ref(), self.stream, EvictionTrigger::Guard)
            .await?;
        Ok(GuardOutcome::Evicted(outcome))
    }
}

fn outcome_label(outcome: &GuardOutcome) -> &'static str {
    match outcome {
        GuardOutcome::WithinCeiling { .. } => "within_ceiling",
        GuardOutcome::Evicted(_) => "evicted",
        GuardOutcome::Coalesced => "coalesced",
        GuardOutcome::Failed(_) => "failed",
    }
}

pub(crate) fn error_label(error: &EvictionError) -> &'static str {
    use crate::storage::traits::StorageError;
    match error {
        EvictionError::TimedOut(_) => "timeout",
        EvictionError::Storage(StorageError::Unavailable(_)) => "unavailable",
        EvictionError::Storage(StorageError::Validation(_)) => "validation",
        EvictionError::Storage(StorageError::Backend(_)) => "backend",
    }
}
