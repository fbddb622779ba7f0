//! Size-bounded retention for record streams.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Retention Module                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  policy.rs    - size vs ceiling → RetentionDecision          │
//! │  executor.rs  - oldest-half bulk delete, bounded by timeout  │
//! │  guard.rs     - reactive check after each append             │
//! │  sweeper.rs   - calendar sweep over every stream             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two independent triggers feed the same executor:
//!
//! ```text
//!  append ──► StorageGuard::spawn_check ──► (over ceiling?) ──┐
//!                                                             ├──► EvictionExecutor
//!  clock  ──► ScheduledSweeper::run_once (every stream) ──────┘
//! ```
//!
//! Neither trigger locks against the other. Deletes are idempotent, so two
//! overlapping batches can at worst remove fewer rows than they selected.

pub mod policy;
pub mod executor;
pub mod guard;
pub mod sweeper;

pub use policy::{RetentionDecision, RetentionPolicy};
pub use executor::{EvictionError, EvictionExecutor, EvictionOutcome, EvictionTrigger};
pub use guard::{GuardOutcome, StorageGuard};
pub use sweeper::{ScheduledSweeper, SweepReport, SweepSchedule, SweepTarget};
