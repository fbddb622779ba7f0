//! Record stores.
//!
//! - [`traits`]: the [`RecordStore`](traits::RecordStore) contract every backend implements
//! - [`memory`]: in-process store (development, tests)
//! - [`sql`]: SQLite/MySQL store via sqlx
//! - [`size`]: cached size statistic shared by the SQL backends

pub mod traits;
pub mod memory;
pub mod sql;
pub mod size;
