// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Board lifecycle: connect, sweeper scheduling, shutdown.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::BoardConfig;
use crate::record::StreamKind;
use crate::retention::{EvictionExecutor, ScheduledSweeper, SweepReport, SweepSchedule, SweepTarget};
use crate::storage::memory::InMemoryRecordStore;
use crate::storage::sql::{SqlRecordStore, SqlStoreOptions};
use crate::storage::traits::{RecordStore, StorageError};

use super::{Board, BoardState};

const IDLE_POLL: Duration = Duration::from_millis(20);

impl Board {
    /// Open stores for both streams and return a `Ready` board.
    ///
    /// With `sql_url` set, both streams share one connection pool and the
    /// tables are created if missing. Without it, records live in memory and
    /// are lost on restart.
    #[tracing::instrument(skip(config))]
    pub async fn connect(config: BoardConfig) -> Result<Self, StorageError> {
        let start = Instant::now();
        info!("Connecting board stores...");

        let (chat, confession): (Arc<dyn RecordStore>, Arc<dyn RecordStore>) = match &config.sql_url {
            Some(url) => {
                let pool = SqlRecordStore::connect_pool(url)
                    .await
                    .inspect_err(|_| crate::metrics::set_backend_healthy("sql", false))?;
                let is_sqlite = url.starts_with("sqlite:");
                let options = |kind: StreamKind| SqlStoreOptions {
                    max_text_chars: config.stream(kind).max_text_chars,
                    size_refresh: config.size_refresh(),
                    size_drift_bytes: config.size_drift_bytes,
                };
                let chat: Arc<dyn RecordStore> = Arc::new(
                    SqlRecordStore::from_pool(pool.clone(), is_sqlite, StreamKind::Chat, options(StreamKind::Chat)).await?,
                );
                let confession: Arc<dyn RecordStore> = Arc::new(
                    SqlRecordStore::from_pool(pool, is_sqlite, StreamKind::Confession, options(StreamKind::Confession)).await?,
                );
                crate::metrics::set_backend_healthy("sql", true);
                (chat, confession)
            }
            None => {
                warn!("No SQL URL configured - records are kept in memory only");
                let chat: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new(config.chat.max_text_chars));
                let confession: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new(config.confession.max_text_chars));
                (chat, confession)
            }
        };

        let board = Self::with_stores(config, chat, confession);
        board.set_state(BoardState::Ready);
        info!(elapsed_ms = start.elapsed().as_millis() as u64, "Board ready");
        Ok(board)
    }

    /// A sweeper over both streams, using the configured schedule.
    #[must_use]
    pub fn sweeper(&self) -> ScheduledSweeper {
        let targets = StreamKind::ALL
            .iter()
            .map(|&stream| SweepTarget { stream, store: self.store(stream) })
            .collect();
        ScheduledSweeper::new(
            targets,
            EvictionExecutor::new(self.config.eviction_timeout()),
            SweepSchedule::new(self.config.sweep.every_days, self.config.sweep.hour_utc),
        )
    }

    /// Halve both streams immediately, outside the schedule.
    pub async fn sweep_now(&self) -> SweepReport {
        self.sweeper().run_once().await
    }

    /// Run the sweeper on the current task until shutdown.
    pub async fn run_sweeper(&self) {
        let sweeper = self.sweeper();
        info!(schedule = ?sweeper.schedule(), "Scheduled sweeper started");
        sweeper.run(self.shutdown_tx.subscribe()).await;
    }

    /// Move to `Running` and spawn the sweeper if it is enabled.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        self.set_state(BoardState::Running);
        if !self.config.sweep.enabled {
            info!("Scheduled sweeper disabled");
            return None;
        }
        let board = Arc::clone(self);
        Some(tokio::spawn(async move { board.run_sweeper().await }))
    }

    /// Stop the sweeper and wait for in-flight guard checks.
    ///
    /// The wait is bounded by the eviction timeout; checks still running after
    /// that are abandoned.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) {
        let start = Instant::now();
        info!("Initiating board shutdown...");
        self.set_state(BoardState::ShuttingDown);
        self.shutdown_tx.send_replace(true);

        let deadline = start + self.config.eviction_timeout();
        while !(self.chat.guard.is_idle() && self.confession.guard.is_idle()) {
            if Instant::now() >= deadline {
                warn!("Guard checks still running at shutdown deadline, abandoning");
                break;
            }
            tokio::time::sleep(IDLE_POLL).await;
        }

        info!(elapsed_ms = start.elapsed().as_millis() as u64, "Board shutdown complete");
    }
}
