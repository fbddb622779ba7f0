//! # Board Engine
//!
//! Backend for an anonymous message board with two independent streams,
//! chat and confessions, each kept under a storage ceiling by halving it
//! oldest-first.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       HTTP (axum)                           │
//! │  • GET/POST /api/chat/messages                             │
//! │  • GET/POST /api/confession/messages                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Board (coordinator)                      │
//! │  • post(): validate, append, spawn guard check             │
//! │  • latest(): newest N records, oldest first                │
//! └─────────────────────────────────────────────────────────────┘
//!              │                                  │
//!     (every write, detached)           (calendar, 1st/16th/31st)
//!              ▼                                  ▼
//! ┌────────────────────────────┐  ┌────────────────────────────┐
//! │       StorageGuard         │  │     ScheduledSweeper       │
//! │  size > ceiling → halve    │  │  halve every stream        │
//! └────────────────────────────┘  └────────────────────────────┘
//!              │                                  │
//!              └──────────► EvictionExecutor ◄────┘
//!                                  │
//!                                  ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  RecordStore (per stream)                   │
//! │  • SQLite / MySQL via sqlx, or in-memory                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use board_engine::{Board, BoardConfig, StreamKind};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = BoardConfig {
//!         sql_url: Some("sqlite://board.db?mode=rwc".into()),
//!         ..Default::default()
//!     };
//!
//!     let board = Arc::new(Board::connect(config).await.expect("Failed to connect"));
//!     let _sweeper = board.spawn_sweeper();
//!
//!     board.post(StreamKind::Chat, "hello").await.expect("Failed to post");
//!     for record in board.latest(StreamKind::Chat).await.unwrap() {
//!         println!("{}: {}", record.id, record.text);
//!     }
//!
//!     board.shutdown().await;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`coordinator`]: the [`Board`] owning both streams
//! - [`storage`]: record stores (SQL, memory)
//! - [`retention`]: policy, executor, guard and sweeper
//! - [`resilience`]: retry with backoff
//! - [`http`]: axum router

pub mod config;
pub mod record;
pub mod storage;
pub mod retention;
pub mod resilience;
pub mod coordinator;
pub mod http;
pub mod metrics;

pub use config::{BoardConfig, ConfigError, StreamConfig, SweepConfig};
pub use record::{Record, StreamKind};
pub use coordinator::{Board, BoardState};
pub use storage::traits::{RecordStore, StorageError, ValidationError};
pub use storage::memory::InMemoryRecordStore;
pub use storage::sql::{SqlRecordStore, SqlStoreOptions};
pub use retention::{
    EvictionError, EvictionExecutor, EvictionOutcome, EvictionTrigger, GuardOutcome,
    RetentionDecision, RetentionPolicy, ScheduledSweeper, StorageGuard, SweepReport,
    SweepSchedule,
};
pub use resilience::retry::RetryConfig;
pub use metrics::LatencyTimer;
