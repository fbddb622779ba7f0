use std::collections::BTreeMap;
use async_trait::async_trait;
use parking_lot::RwLock;
use crate::record::{now_millis, Record};
use super::traits::{validate_text, RecordStore, StorageError};

struct Inner {
    /// Keyed by identity; identities and timestamps are assigned under the
    /// same lock, so key order is also `(created_at, id)` order.
    records: BTreeMap<i64, Record>,
    next_id: i64,
    last_created_at: i64,
    size_bytes: u64,
}

/// In-process record store.
///
/// Used when no SQL backend is configured, and as the reference store in tests.
/// Size accounting is exact: payload bytes plus a fixed per-record overhead.
pub struct InMemoryRecordStore {
    inner: RwLock<Inner>,
    max_text_chars: usize,
}

impl InMemoryRecordStore {
    #[must_use]
    pub fn new(max_text_chars: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                records: BTreeMap::new(),
                next_id: 1,
                last_created_at: i64::MIN,
                size_bytes: 0,
            }),
            max_text_chars,
        }
    }

    /// Get current record count
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Snapshot of every identity, ascending.
    #[must_use]
    pub fn ids(&self) -> Vec<i64> {
        self.inner.read().records.keys().copied().collect()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn append(&self, text: &str) -> Result<Record, StorageError> {
        validate_text(text, self.max_text_chars)?;

        let mut inner = self.inner.write();
        let id = inner.next_id;
        inner.next_id += 1;
        let created_at = now_millis().max(inner.last_created_at);
        inner.last_created_at = created_at;

        let record = Record::new(id, text.to_string(), created_at);
        inner.size_bytes += record.size_bytes();
        inner.records.insert(id, record.clone());
        Ok(record)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Record>, StorageError> {
        let inner = self.inner.read();
        let mut recent: Vec<Record> = inner.records.values().rev().take(limit).cloned().collect();
        recent.reverse();
        Ok(recent)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.inner.read().records.len() as u64)
    }

    async fn oldest(&self, n: usize) -> Result<Vec<i64>, StorageError> {
        Ok(self.inner.read().records.keys().take(n).copied().collect())
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, StorageError> {
        let mut inner = self.inner.write();
        let mut deleted = 0u64;
        for id in ids {
            if let Some(record) = inner.records.remove(id) {
                inner.size_bytes = inner.size_bytes.saturating_sub(record.size_bytes());
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn estimated_size_bytes(&self) -> Result<u64, StorageError> {
        Ok(self.inner.read().size_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RECORD_OVERHEAD_BYTES;
    use crate::storage::traits::ValidationError;

    async fn filled(n: usize) -> InMemoryRecordStore {
        let store = InMemoryRecordStore::new(250);
        for i in 0..n {
            store.append(&format!("msg-{}", i)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_new_store_is_empty() {
        let store = InMemoryRecordStore::new(250);
        assert!(store.is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.estimated_size_bytes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_ids_and_timestamps() {
        let store = filled(5).await;
        let all = store.list_recent(10).await.unwrap();
        assert_eq!(all.len(), 5);
        for pair in all.windows(2) {
            assert!(pair[0].id < pair[1].id);
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn test_append_rejects_invalid_text() {
        let store = InMemoryRecordStore::new(5);
        let err = store.append("").await.unwrap_err();
        assert!(matches!(err, StorageError::Validation(ValidationError::Empty)));

        let err = store.append("toolong").await.unwrap_err();
        assert!(matches!(err, StorageError::Validation(ValidationError::TooLong { len: 7, max: 5 })));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_list_recent_returns_newest_ascending() {
        let store = filled(10).await;
        let recent = store.list_recent(3).await.unwrap();
        let texts: Vec<&str> = recent.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["msg-7", "msg-8", "msg-9"]);
    }

    #[tokio::test]
    async fn test_oldest_caps_at_count() {
        let store = filled(4).await;
        assert_eq!(store.oldest(2).await.unwrap(), vec![1, 2]);
        assert_eq!(store.oldest(100).await.unwrap(), vec![1, 2, 3, 4]);
        assert!(store.oldest(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = filled(6).await;
        let ids = store.oldest(3).await.unwrap();
        assert_eq!(store.delete_by_ids(&ids).await.unwrap(), 3);
        assert_eq!(store.delete_by_ids(&ids).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_size_tracks_appends_and_deletes() {
        let store = InMemoryRecordStore::new(250);
        store.append("abc").await.unwrap();
        store.append("defgh").await.unwrap();
        assert_eq!(
            store.estimated_size_bytes().await.unwrap(),
            8 + 2 * RECORD_OVERHEAD_BYTES
        );

        store.delete_by_ids(&[1]).await.unwrap();
        assert_eq!(
            store.estimated_size_bytes().await.unwrap(),
            5 + RECORD_OVERHEAD_BYTES
        );
    }
}
