// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Read and write paths for both streams.
//!
//! - `post()` - validate, append, fire the storage guard without waiting
//! - `latest()` - most recent records, oldest first

use tracing::{debug, warn};

use crate::record::{Record, StreamKind};
use crate::storage::traits::StorageError;

use super::Board;

impl Board {
    /// Append a message to `stream`.
    ///
    /// The storage guard check is spawned after the append commits and is not
    /// awaited: the caller gets its record back regardless of whether an
    /// eviction follows, and guard failures never surface here.
    ///
    /// # Errors
    ///
    /// [`StorageError::Validation`] for blank or over-long text; any other
    /// variant means the record was not stored.
    #[tracing::instrument(skip_all, fields(stream = %stream))]
    pub async fn post(&self, stream: StreamKind, text: &str) -> Result<Record, StorageError> {
        let _timer = crate::metrics::LatencyTimer::new(stream.as_str(), "append");
        let handle = self.handle(stream);

        match handle.store.append(text).await {
            Ok(record) => {
                crate::metrics::record_append(stream.as_str(), "success");
                debug!(id = record.id, "Message stored");
                // Dropping the handle detaches the task.
                drop(handle.guard.spawn_check());
                Ok(record)
            }
            Err(e) if e.is_validation() => {
                crate::metrics::record_append(stream.as_str(), "rejected");
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Failed to store message");
                crate::metrics::record_append(stream.as_str(), "error");
                crate::metrics::record_error(stream.as_str(), "append", "storage");
                Err(e)
            }
        }
    }

    /// The newest `recent_limit` records of `stream`, ascending by creation time.
    pub async fn latest(&self, stream: StreamKind) -> Result<Vec<Record>, StorageError> {
        let _timer = crate::metrics::LatencyTimer::new(stream.as_str(), "list_recent");
        self.handle(stream)
            .store
            .list_recent(self.config.recent_limit)
            .await
            .inspect_err(|e| {
                warn!(stream = %stream, error = %e, "Failed to fetch messages");
                crate::metrics::record_error(stream.as_str(), "list_recent", "storage");
            })
    }
}
