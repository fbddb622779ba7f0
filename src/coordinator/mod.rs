// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Board coordinator.
//!
//! The [`Board`] is the process-wide context object. It is built once at
//! startup and owns, per stream:
//! - the [`RecordStore`]
//! - the [`StorageGuard`] fired after every append
//!
//! plus the shutdown signal for the [`ScheduledSweeper`](crate::retention::ScheduledSweeper).
//! Components receive their store from the board instead of reaching for a
//! global handle, so tests can inject fakes through [`Board::with_stores`].
//!
//! # Lifecycle
//!
//! ```text
//! Ready → Running → ShuttingDown
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use board_engine::{Board, BoardConfig, BoardState, StreamKind};
//! use board_engine::storage::memory::InMemoryRecordStore;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = BoardConfig::default();
//! let board = Board::with_stores(
//!     config,
//!     Arc::new(InMemoryRecordStore::new(250)),
//!     Arc::new(InMemoryRecordStore::new(250)),
//! );
//! assert_eq!(board.state(), BoardState::Ready);
//!
//! let record = board.post(StreamKind::Chat, "hello").await.unwrap();
//! let latest = board.latest(StreamKind::Chat).await.unwrap();
//! assert_eq!(latest, vec![record]);
//! # }
//! ```

mod types;
mod api;
mod lifecycle;

pub use types::BoardState;

use std::sync::Arc;
use tokio::sync::watch;

use crate::config::BoardConfig;
use crate::record::StreamKind;
use crate::retention::{EvictionExecutor, StorageGuard};
use crate::storage::traits::RecordStore;

/// Store and guard for one stream.
#[derive(Clone)]
pub(super) struct StreamHandle {
    pub(super) store: Arc<dyn RecordStore>,
    pub(super) guard: Arc<StorageGuard>,
}

impl StreamHandle {
    fn new(kind: StreamKind, store: Arc<dyn RecordStore>, config: &BoardConfig) -> Self {
        let guard = Arc::new(StorageGuard::new(
            kind,
            Arc::clone(&store),
            config.stream(kind).ceiling_bytes,
            EvictionExecutor::new(config.eviction_timeout()),
        ));
        Self { store, guard }
    }
}

/// Anonymous board backend: two independently retained streams.
///
/// # Thread Safety
///
/// `Board` is `Send + Sync`; share it behind an `Arc`. Stores handle their
/// own locking.
pub struct Board {
    pub(super) config: BoardConfig,

    /// Board state (broadcast to watchers)
    pub(super) state: watch::Sender<BoardState>,

    /// Board state receiver (for internal use)
    pub(super) state_rx: watch::Receiver<BoardState>,

    pub(super) chat: StreamHandle,
    pub(super) confession: StreamHandle,

    /// Flipped to `true` on shutdown; the sweeper watches it
    pub(super) shutdown_tx: watch::Sender<bool>,
}

impl Board {
    /// Build a board over already-open stores. The board starts `Ready`.
    pub fn with_stores(
        config: BoardConfig,
        chat: Arc<dyn RecordStore>,
        confession: Arc<dyn RecordStore>,
    ) -> Self {
        let (state, state_rx) = watch::channel(BoardState::Ready);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            chat: StreamHandle::new(StreamKind::Chat, chat, &config),
            confession: StreamHandle::new(StreamKind::Confession, confession, &config),
            config,
            state,
            state_rx,
            shutdown_tx,
        }
    }

    /// Get current board state.
    #[must_use]
    pub fn state(&self) -> BoardState {
        *self.state_rx.borrow()
    }

    /// Get a receiver to watch state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<BoardState> {
        self.state_rx.clone()
    }

    /// Check if the board is accepting requests.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state(), BoardState::Ready | BoardState::Running)
    }

    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub(super) fn set_state(&self, state: BoardState) {
        let _ = self.state.send(state);
        crate::metrics::set_board_state(&state.to_string());
    }

    pub(super) fn handle(&self, stream: StreamKind) -> &StreamHandle {
        match stream {
            StreamKind::Chat => &self.chat,
            StreamKind::Confession => &self.confession,
        }
    }

    /// The record store backing `stream`.
    #[must_use]
    pub fn store(&self, stream: StreamKind) -> Arc<dyn RecordStore> {
        Arc::clone(&self.handle(stream).store)
    }

    /// The reactive guard for `stream`.
    #[must_use]
    pub fn guard(&self, stream: StreamKind) -> Arc<StorageGuard> {
        Arc::clone(&self.handle(stream).guard)
    }
}
