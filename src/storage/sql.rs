// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL record store (SQLite or MySQL via the sqlx `Any` driver).
//!
//! Each stream lives in its own table:
//! ```sql
//! CREATE TABLE chat_messages (
//!   id         BIGINT AUTO_INCREMENT PRIMARY KEY,  -- never reused
//!   text       TEXT NOT NULL,
//!   created_at BIGINT NOT NULL,                    -- epoch millis
//!   INDEX idx_chat_messages_created (created_at, id)
//! )
//! ```
//!
//! ## Size statistic
//!
//! The footprint reported by [`RecordStore::estimated_size_bytes`] comes from
//! the engine's own bookkeeping and is cached in a [`SizeProfile`]:
//! - **MySQL**: `information_schema.TABLES` (`data_length + index_length`).
//!   InnoDB refreshes these lazily, so the figure can lag by minutes.
//! - **SQLite**: page accounting from the `dbstat` virtual table. Builds
//!   without `dbstat` fall back to payload bytes plus a per-row overhead.
//!
//! Appends add their approximate size to the cached figure; deletes invalidate
//! it. Callers must treat the result as approximate.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Once;
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::{any::AnyPoolOptions, AnyPool, Row};
use tracing::{debug, info};

use crate::record::{now_millis, Record, StreamKind, RECORD_OVERHEAD_BYTES};
use crate::resilience::retry::{retry, RetryConfig};
use super::size::SizeProfile;
use super::traits::{validate_text, RecordStore, StorageError};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

/// Max identities per `DELETE ... IN (...)` statement.
const DELETE_CHUNK: usize = 500;

fn map_sqlx_error(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(e.to_string()),
        other => StorageError::Backend(other.to_string()),
    }
}

/// Per-store tuning.
#[derive(Debug, Clone)]
pub struct SqlStoreOptions {
    pub max_text_chars: usize,
    /// How long a size statistic may be served from cache
    pub size_refresh: Duration,
    /// Appended bytes after which the statistic is re-read early
    pub size_drift_bytes: u64,
}

impl Default for SqlStoreOptions {
    fn default() -> Self {
        Self {
            max_text_chars: 250,
            size_refresh: Duration::from_secs(30),
            size_drift_bytes: 1024 * 1024,
        }
    }
}

pub struct SqlRecordStore {
    pool: AnyPool,
    is_sqlite: bool,
    stream: StreamKind,
    options: SqlStoreOptions,
    last_created_at: AtomicI64,
    size_profile: Mutex<SizeProfile>,
    /// Cleared the first time a `dbstat` query fails
    dbstat_available: AtomicBool,
}

impl SqlRecordStore {
    /// Open a pool for `connection_string`, with startup-mode retry (fails fast if config is wrong).
    pub async fn connect_pool(connection_string: &str) -> Result<AnyPool, StorageError> {
        install_drivers();
        let is_sqlite = connection_string.starts_with("sqlite:");

        let pool = retry("sql_connect", &RetryConfig::startup(), || async {
            AnyPoolOptions::new()
                .max_connections(if is_sqlite { 5 } else { 10 })
                .min_connections(if is_sqlite { 1 } else { 2 })
                .acquire_timeout(Duration::from_secs(5))
                .idle_timeout(Duration::from_secs(300))
                .connect(connection_string)
                .await
                .map_err(map_sqlx_error)
        })
        .await?;

        if is_sqlite {
            Self::enable_wal_mode(&pool).await?;
        }
        Ok(pool)
    }

    /// Connect and initialise a store for one stream.
    pub async fn connect(
        connection_string: &str,
        stream: StreamKind,
        options: SqlStoreOptions,
    ) -> Result<Self, StorageError> {
        let pool = Self::connect_pool(connection_string).await?;
        Self::from_pool(pool, connection_string.starts_with("sqlite:"), stream, options).await
    }

    /// Build a store over an existing pool; the schema is created if missing.
    pub async fn from_pool(
        pool: AnyPool,
        is_sqlite: bool,
        stream: StreamKind,
        options: SqlStoreOptions,
    ) -> Result<Self, StorageError> {
        let store = Self {
            pool,
            is_sqlite,
            stream,
            options,
            last_created_at: AtomicI64::new(i64::MIN),
            size_profile: Mutex::new(SizeProfile::default()),
            dbstat_available: AtomicBool::new(is_sqlite),
        };
        store.init_schema().await?;
        store.load_last_created_at().await?;
        info!(stream = %stream, table = stream.table_name(), sqlite = is_sqlite, "SQL record store ready");
        Ok(store)
    }

    /// Get a clone of the connection pool for sharing with other stores.
    pub fn pool(&self) -> AnyPool {
        self.pool.clone()
    }

    #[must_use]
    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    /// WAL mode lets readers proceed while an eviction batch is deleting.
    async fn enable_wal_mode(pool: &AnyPool) -> Result<(), StorageError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to enable WAL mode: {}", e)))?;

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to set synchronous mode: {}", e)))?;

        Ok(())
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        let table = self.stream.table_name();
        let statements = if self.is_sqlite {
            vec![
                format!(
                    "CREATE TABLE IF NOT EXISTS {table} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        text TEXT NOT NULL,
                        created_at INTEGER NOT NULL
                    )"
                ),
                format!("CREATE INDEX IF NOT EXISTS idx_{table}_created ON {table} (created_at, id)"),
            ]
        } else {
            vec![format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    text TEXT NOT NULL,
                    created_at BIGINT NOT NULL,
                    INDEX idx_{table}_created (created_at, id)
                ) CHARACTER SET utf8mb4"
            )]
        };

        for sql in &statements {
            retry("sql_init_schema", &RetryConfig::startup(), || async {
                sqlx::query(sql)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)
            })
            .await?;
        }
        Ok(())
    }

    /// Seed the timestamp clamp so a restart never appends before existing records.
    async fn load_last_created_at(&self) -> Result<(), StorageError> {
        let sql = format!(
            "SELECT COALESCE(MAX(created_at), 0) AS last FROM {}",
            self.stream.table_name()
        );
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let last: i64 = row.try_get("last").map_err(map_sqlx_error)?;
        self.last_created_at.fetch_max(last, Ordering::SeqCst);
        Ok(())
    }

    fn next_created_at(&self) -> i64 {
        let now = now_millis();
        let previous = self.last_created_at.fetch_max(now, Ordering::SeqCst);
        now.max(previous)
    }

    /// TEXT comes back as `String` from SQLite and as bytes from MySQL.
    fn read_text(row: &sqlx::any::AnyRow) -> Result<String, StorageError> {
        row.try_get::<String, _>("text")
            .ok()
            .or_else(|| {
                row.try_get::<Vec<u8>, _>("text")
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
            .ok_or_else(|| StorageError::Backend("Unreadable text column".to_string()))
    }

    async fn query_reported_size(&self) -> Result<u64, StorageError> {
        let table = self.stream.table_name();

        if !self.is_sqlite {
            let row = sqlx::query(
                "SELECT CAST(COALESCE(SUM(data_length + index_length), 0) AS SIGNED) AS bytes \
                 FROM information_schema.TABLES WHERE table_schema = DATABASE() AND table_name = ?",
            )
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
            let bytes: i64 = row.try_get("bytes").map_err(map_sqlx_error)?;
            return Ok(bytes.max(0) as u64);
        }

        if self.dbstat_available.load(Ordering::Relaxed) {
            let index = format!("idx_{table}_created");
            let result = sqlx::query(
                "SELECT COALESCE(SUM(pgsize), 0) AS bytes FROM dbstat WHERE name = ? OR name = ?",
            )
            .bind(table)
            .bind(index.as_str())
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(row) => {
                    let bytes: i64 = row.try_get("bytes").map_err(map_sqlx_error)?;
                    return Ok(bytes.max(0) as u64);
                }
                Err(e) => {
                    debug!(error = %e, "dbstat unavailable, estimating size from payload");
                    self.dbstat_available.store(false, Ordering::Relaxed);
                }
            }
        }

        let sql = format!(
            "SELECT COALESCE(SUM(LENGTH(CAST(text AS BLOB))), 0) + COUNT(*) * {} AS bytes FROM {}",
            RECORD_OVERHEAD_BYTES, table
        );
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let bytes: i64 = row.try_get("bytes").map_err(map_sqlx_error)?;
        Ok(bytes.max(0) as u64)
    }
}

#[async_trait]
impl RecordStore for SqlRecordStore {
    async fn append(&self, text: &str) -> Result<Record, StorageError> {
        validate_text(text, self.options.max_text_chars)?;

        let created_at = self.next_created_at();
        let sql = format!(
            "INSERT INTO {} (text, created_at) VALUES (?, ?)",
            self.stream.table_name()
        );

        // Only the acquire is retried: once the INSERT is sent, a lost reply may
        // still have committed, and a second attempt would store a duplicate.
        let mut conn = retry("sql_append_acquire", &RetryConfig::query(), || async {
            self.pool.acquire().await.map_err(map_sqlx_error)
        })
        .await?;
        let result = sqlx::query(&sql)
            .bind(text)
            .bind(created_at)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        let id = result
            .last_insert_id()
            .ok_or_else(|| StorageError::Backend("Insert did not report an id".to_string()))?;

        let record = Record::new(id, text.to_string(), created_at);
        self.size_profile.lock().add_pending(record.size_bytes());
        Ok(record)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Record>, StorageError> {
        let sql = format!(
            "SELECT id, text, created_at FROM {} ORDER BY created_at DESC, id DESC LIMIT ?",
            self.stream.table_name()
        );

        let rows = retry("sql_list_recent", &RetryConfig::query(), || async {
            sqlx::query(&sql)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)
        })
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows.iter().rev() {
            let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
            let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
            records.push(Record::new(id, Self::read_text(row)?, created_at));
        }
        Ok(records)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let sql = format!("SELECT COUNT(*) AS cnt FROM {}", self.stream.table_name());
        let row = retry("sql_count", &RetryConfig::query(), || async {
            sqlx::query(&sql)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)
        })
        .await?;

        let count: i64 = row.try_get("cnt").map_err(map_sqlx_error)?;
        Ok(count as u64)
    }

    async fn oldest(&self, n: usize) -> Result<Vec<i64>, StorageError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id FROM {} ORDER BY created_at ASC, id ASC LIMIT ?",
            self.stream.table_name()
        );

        let rows = retry("sql_oldest", &RetryConfig::query(), || async {
            sqlx::query(&sql)
                .bind(n as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)
        })
        .await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(row.try_get::<i64, _>("id").map_err(map_sqlx_error)?);
        }
        Ok(ids)
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut deleted = 0u64;
        for chunk in ids.chunks(DELETE_CHUNK) {
            let placeholders: Vec<&str> = chunk.iter().map(|_| "?").collect();
            let sql = format!(
                "DELETE FROM {} WHERE id IN ({})",
                self.stream.table_name(),
                placeholders.join(", ")
            );

            let result = retry("sql_delete_by_ids", &RetryConfig::query(), || async {
                let mut query = sqlx::query(&sql);
                for id in chunk {
                    query = query.bind(*id);
                }
                query.execute(&self.pool).await.map_err(map_sqlx_error)
            })
            .await;

            match result {
                Ok(done) => deleted += done.rows_affected(),
                Err(e) => {
                    self.size_profile.lock().invalidate();
                    return Err(e);
                }
            }
        }

        self.size_profile.lock().invalidate();
        Ok(deleted)
    }

    async fn estimated_size_bytes(&self) -> Result<u64, StorageError> {
        {
            let profile = self.size_profile.lock();
            if !profile.needs_refresh(self.options.size_refresh, self.options.size_drift_bytes) {
                return Ok(profile.estimate());
            }
        }

        let reported = self.query_reported_size().await?;
        let mut profile = self.size_profile.lock();
        profile.refresh(reported);
        debug!(stream = %self.stream, bytes = reported, "Size statistic refreshed");
        Ok(profile.estimate())
    }
}
