// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use thiserror::Error;
use crate::record::Record;

/// Rejection reasons for appended text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text must not be empty")]
    Empty,
    #[error("text is {len} characters, maximum is {max}")]
    TooLong { len: usize, max: usize },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid record: {0}")]
    Validation(#[from] ValidationError),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Whether this failure came from bad input rather than the store.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Check text against the append rules: non-blank, at most `max_chars` characters.
pub fn validate_text(text: &str, max_chars: usize) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    let len = text.chars().count();
    if len > max_chars {
        return Err(ValidationError::TooLong { len, max: max_chars });
    }
    Ok(())
}

/// Durable, ordered collection of records for one stream.
///
/// Implementations own their locking: every method may be called
/// concurrently with any other, and each record is atomically either
/// present or absent to readers.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Validate and persist `text`. Returning `Ok` is a durability acknowledgment.
    async fn append(&self, text: &str) -> Result<Record, StorageError>;

    /// At most `limit` most recent records, ascending by `(created_at, id)`.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Record>, StorageError>;

    /// Current number of records.
    async fn count(&self) -> Result<u64, StorageError>;

    /// Identities of the `n` least recent records, ascending. Returns all when `n > count()`.
    async fn oldest(&self, n: usize) -> Result<Vec<i64>, StorageError>;

    /// Delete the given identities. Absent identities are skipped and not counted.
    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, StorageError>;

    /// Approximate on-disk footprint. May lag recent appends and deletes.
    async fn estimated_size_bytes(&self) -> Result<u64, StorageError>;
}
