// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Oldest-first bulk eviction.
//!
//! ```text
//! count() ─► half_of(count) ─► oldest(n) ─► delete_by_ids(ids) ─► deleted
//! ```
//!
//! Concurrent evictions against the same stream are allowed. Both may select
//! overlapping identities; deletes are idempotent, so the overlap only shows
//! up as a partial outcome (`deleted < requested`).

use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

use crate::record::StreamKind;
use crate::storage::traits::{RecordStore, StorageError};
use super::policy::RetentionPolicy;

/// What started an eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionTrigger {
    /// Reactive check after a write found the stream over its ceiling
    Guard,
    /// Calendar sweep, regardless of size
    Sweep,
}

impl fmt::Display for EvictionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guard => write!(f, "guard"),
            Self::Sweep => write!(f, "sweep"),
        }
    }
}

#[derive(Error, Debug)]
pub enum EvictionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("eviction did not finish within {0:?}")]
    TimedOut(Duration),
}

/// Result of one eviction batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionOutcome {
    pub stream: StreamKind,
    pub trigger: EvictionTrigger,
    /// Count observed at the start of the batch
    pub count_before: u64,
    /// `half_of(count_before)`
    pub requested: u64,
    /// Rows actually removed by this batch
    pub deleted: u64,
}

impl EvictionOutcome {
    /// Fewer rows removed than requested, usually because a concurrent
    /// eviction got to some of them first. Informational only.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.deleted < self.requested
    }
}

#[derive(Debug, Clone)]
pub struct EvictionExecutor {
    timeout: Duration,
}

impl EvictionExecutor {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Remove the oldest `floor(count / 2)` records of `store`, bounded by the
    /// configured timeout. A batch cut off by the timeout may have deleted
    /// part of its selection; the next trigger picks up from there.
    #[tracing::instrument(skip_all, fields(stream = %stream, trigger = %trigger))]
    pub async fn evict_oldest_half(
        &self,
        store: &dyn RecordStore,
        stream: StreamKind,
        trigger: EvictionTrigger,
    ) -> Result<EvictionOutcome, EvictionError> {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.timeout, Self::run(store, stream, trigger)).await {
            Ok(result) => result?,
            Err(_) => {
                crate::metrics::record_timeout(stream.as_str(), "evict");
                return Err(EvictionError::TimedOut(self.timeout));
            }
        };

        crate::metrics::record_eviction(stream.as_str(), &trigger.to_string(), outcome.deleted);
        crate::metrics::record_eviction_duration(stream.as_str(), started.elapsed());

        if outcome.is_partial() {
            debug!(
                requested = outcome.requested,
                deleted = outcome.deleted,
                "Partial eviction (records already removed concurrently)"
            );
        }
        if outcome.deleted > 0 {
            info!(
                count_before = outcome.count_before,
                deleted = outcome.deleted,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Evicted oldest records"
            );
        }
        Ok(outcome)
    }

    async fn run(
        store: &dyn RecordStore,
        stream: StreamKind,
        trigger: EvictionTrigger,
    ) -> Result<EvictionOutcome, StorageError> {
        let count_before = store.count().await?;
        let requested = RetentionPolicy::half_of(count_before);

        let deleted = if requested == 0 {
            0
        } else {
            let ids = store.oldest(requested as usize).await?;
            store.delete_by_ids(&ids).await?
        };

        Ok(EvictionOutcome {
            stream,
            trigger,
            count_before,
            requested,
            deleted,
        })
    }
}

impl Default for EvictionExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}
