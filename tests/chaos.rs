//! Chaos Testing for Board Engine
//!
//! Failure scenarios using **FailingStore wrappers**: precise error injection
//! on chosen operations, plus an artificially slow store to exercise the
//! eviction timeout.
//!
//! # Running Chaos Tests
//! ```bash
//! cargo test --test chaos -- --nocapture
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;

use board_engine::{
    Board, BoardConfig, EvictionError, EvictionExecutor, EvictionTrigger, GuardOutcome,
    InMemoryRecordStore, Record, RecordStore, ScheduledSweeper, StorageError, StorageGuard,
    StreamKind, SweepSchedule,
};
use board_engine::retention::SweepTarget;

// =============================================================================
// Failing Store Wrapper - Precise Error Injection
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Append,
    ListRecent,
    Count,
    Oldest,
    Delete,
    Size,
}

/// Wraps an in-memory store; operations listed in `failing` return
/// `StorageError::Unavailable` while `broken` is set.
struct FailingRecordStore {
    inner: InMemoryRecordStore,
    failing: Vec<Op>,
    broken: AtomicBool,
    /// Reported size, so the guard can be pushed over its ceiling
    size_bytes: u64,
}

impl FailingRecordStore {
    fn new(failing: Vec<Op>, size_bytes: u64) -> Self {
        Self {
            inner: InMemoryRecordStore::new(250),
            failing,
            broken: AtomicBool::new(true),
            size_bytes,
        }
    }

    fn heal(&self) {
        self.broken.store(false, Ordering::SeqCst);
    }

    fn maybe_fail(&self, op: Op) -> Result<(), StorageError> {
        if self.broken.load(Ordering::SeqCst) && self.failing.contains(&op) {
            Err(StorageError::Unavailable(format!("injected failure on {:?}", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn append(&self, text: &str) -> Result<Record, StorageError> {
        self.maybe_fail(Op::Append)?;
        self.inner.append(text).await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Record>, StorageError> {
        self.maybe_fail(Op::ListRecent)?;
        self.inner.list_recent(limit).await
    }

    async fn count(&self) -> Result<u64, StorageError> {
        self.maybe_fail(Op::Count)?;
        self.inner.count().await
    }

    async fn oldest(&self, n: usize) -> Result<Vec<i64>, StorageError> {
        self.maybe_fail(Op::Oldest)?;
        self.inner.oldest(n).await
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, StorageError> {
        self.maybe_fail(Op::Delete)?;
        self.inner.delete_by_ids(ids).await
    }

    async fn estimated_size_bytes(&self) -> Result<u64, StorageError> {
        self.maybe_fail(Op::Size)?;
        Ok(self.size_bytes)
    }
}

/// Every eviction step sleeps, so a short executor timeout fires.
struct SlowRecordStore {
    inner: InMemoryRecordStore,
    delay: Duration,
}

#[async_trait]
impl RecordStore for SlowRecordStore {
    async fn append(&self, text: &str) -> Result<Record, StorageError> {
        self.inner.append(text).await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Record>, StorageError> {
        self.inner.list_recent(limit).await
    }

    async fn count(&self) -> Result<u64, StorageError> {
        self.inner.count().await
    }

    async fn oldest(&self, n: usize) -> Result<Vec<i64>, StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.oldest(n).await
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete_by_ids(ids).await
    }

    async fn estimated_size_bytes(&self) -> Result<u64, StorageError> {
        Ok(u64::MAX)
    }
}

/// Commits every append, then reports it as failed, like a connection that
/// drops after the server committed but before the reply arrived.
struct LostReplyStore {
    inner: InMemoryRecordStore,
}

#[async_trait]
impl RecordStore for LostReplyStore {
    async fn append(&self, text: &str) -> Result<Record, StorageError> {
        self.inner.append(text).await?;
        Err(StorageError::Unavailable("connection reset after commit".to_string()))
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Record>, StorageError> {
        self.inner.list_recent(limit).await
    }

    async fn count(&self) -> Result<u64, StorageError> {
        self.inner.count().await
    }

    async fn oldest(&self, n: usize) -> Result<Vec<i64>, StorageError> {
        self.inner.oldest(n).await
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, StorageError> {
        self.inner.delete_by_ids(ids).await
    }

    async fn estimated_size_bytes(&self) -> Result<u64, StorageError> {
        Ok(0)
    }
}

async fn fill(store: &dyn RecordStore, n: usize) {
    for i in 0..n {
        store.append(&format!("message {}", i)).await.unwrap();
    }
}

fn guard_for(store: Arc<dyn RecordStore>) -> Arc<StorageGuard> {
    Arc::new(StorageGuard::new(
        StreamKind::Chat,
        store,
        1,
        EvictionExecutor::new(Duration::from_secs(5)),
    ))
}

// =============================================================================
// Guard
// =============================================================================

#[tokio::test]
async fn chaos_guard_swallows_size_failure() {
    let store = Arc::new(FailingRecordStore::new(vec![Op::Size], 1024));
    store.heal();
    fill(store.as_ref(), 10).await;
    store.broken.store(true, Ordering::SeqCst);

    let guard = guard_for(store.clone());
    let outcome = guard.spawn_check().await.expect("guard task must not panic");
    assert!(matches!(outcome, GuardOutcome::Failed(_)));
    assert_eq!(store.inner.len(), 10);
    assert!(guard.is_idle());
}

#[tokio::test]
async fn chaos_guard_delete_failure_is_retried_on_next_write() {
    let store = Arc::new(FailingRecordStore::new(vec![Op::Delete], 1024));
    store.heal();
    fill(store.as_ref(), 10).await;
    store.broken.store(true, Ordering::SeqCst);

    let guard = guard_for(store.clone());
    assert!(matches!(guard.check().await, GuardOutcome::Failed(_)));
    assert_eq!(store.inner.len(), 10);

    // Coalescing flag must have been released by the failed attempt.
    store.heal();
    assert!(matches!(guard.check().await, GuardOutcome::Evicted(_)));
    assert_eq!(store.inner.len(), 5);
}

#[tokio::test]
async fn chaos_post_succeeds_when_guard_fails() {
    let chat = Arc::new(FailingRecordStore::new(vec![Op::Size, Op::Count], 1024));
    let board = Board::with_stores(
        BoardConfig::default(),
        chat.clone(),
        Arc::new(InMemoryRecordStore::new(250)),
    );

    let record = board.post(StreamKind::Chat, "still stored").await.unwrap();
    assert_eq!(record.text, "still stored");
    board.shutdown().await;
    assert!(board.guard(StreamKind::Chat).is_idle());
    assert_eq!(chat.inner.len(), 1);
}

#[tokio::test]
async fn chaos_append_failure_surfaces_to_caller() {
    let chat = Arc::new(FailingRecordStore::new(vec![Op::Append], 0));
    let board = Board::with_stores(
        BoardConfig::default(),
        chat.clone(),
        Arc::new(InMemoryRecordStore::new(250)),
    );

    let err = board.post(StreamKind::Chat, "lost").await.unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));
    assert!(!err.is_validation());
}

#[tokio::test]
async fn chaos_append_lost_reply_is_not_duplicated() {
    let chat = Arc::new(LostReplyStore { inner: InMemoryRecordStore::new(250) });
    let board = Board::with_stores(
        BoardConfig::default(),
        chat.clone(),
        Arc::new(InMemoryRecordStore::new(250)),
    );

    let err = board.post(StreamKind::Chat, "sent once").await.unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));
    assert_eq!(chat.inner.len(), 1);
    assert_eq!(board.latest(StreamKind::Chat).await.unwrap().len(), 1);
}

#[tokio::test]
async fn chaos_list_failure_surfaces_to_caller() {
    let chat = Arc::new(FailingRecordStore::new(vec![Op::ListRecent], 0));
    let board = Board::with_stores(
        BoardConfig::default(),
        chat,
        Arc::new(InMemoryRecordStore::new(250)),
    );
    assert!(board.latest(StreamKind::Chat).await.is_err());
    assert!(board.latest(StreamKind::Confession).await.is_ok());
}

// =============================================================================
// Sweeper
// =============================================================================

#[tokio::test]
async fn chaos_sweeper_isolates_failing_stream() {
    let chat = Arc::new(FailingRecordStore::new(vec![Op::Count, Op::Oldest], 0));
    chat.heal();
    fill(chat.as_ref(), 8).await;
    chat.broken.store(true, Ordering::SeqCst);

    let confession = Arc::new(InMemoryRecordStore::new(250));
    fill(confession.as_ref(), 8).await;

    let sweeper = ScheduledSweeper::new(
        vec![
            SweepTarget { stream: StreamKind::Chat, store: chat.clone() },
            SweepTarget { stream: StreamKind::Confession, store: confession.clone() },
        ],
        EvictionExecutor::default(),
        SweepSchedule::default(),
    );

    let report = sweeper.run_once().await;
    assert!(!report.is_clean());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, StreamKind::Chat);
    assert_eq!(report.total_deleted(), 4);
    assert_eq!(chat.inner.len(), 8);
    assert_eq!(confession.len(), 4);
}

// =============================================================================
// Timeout
// =============================================================================

#[tokio::test]
async fn chaos_slow_store_times_out() {
    let store = SlowRecordStore {
        inner: InMemoryRecordStore::new(250),
        delay: Duration::from_millis(200),
    };
    fill(&store, 10).await;

    let executor = EvictionExecutor::new(Duration::from_millis(50));
    let err = executor
        .evict_oldest_half(&store, StreamKind::Chat, EvictionTrigger::Guard)
        .await
        .unwrap_err();
    assert!(matches!(err, EvictionError::TimedOut(_)));
    // Timed out before the delete ran.
    assert_eq!(store.inner.len(), 10);
}

#[tokio::test]
async fn chaos_guard_reports_timeout_as_failure() {
    let store = Arc::new(SlowRecordStore {
        inner: InMemoryRecordStore::new(250),
        delay: Duration::from_millis(200),
    });
    fill(store.as_ref(), 10).await;
    let guard = Arc::new(StorageGuard::new(
        StreamKind::Confession,
        store.clone(),
        1,
        EvictionExecutor::new(Duration::from_millis(50)),
    ));

    assert!(matches!(guard.check().await, GuardOutcome::Failed(_)));
    assert!(guard.is_idle());
}
