// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Record and stream types.
//!
//! A [`Record`] is the unit stored in each stream. Records are immutable once
//! appended: the store assigns the identity and the timestamp, and the only
//! way a record leaves the system is through an eviction batch.
//!
//! # Example
//!
//! ```
//! use board_engine::{Record, StreamKind};
//!
//! let record = Record::new(7, "hello".into(), 1_700_000_000_000);
//! assert_eq!(record.id, 7);
//! assert!(record.size_bytes() > 5);
//!
//! assert_eq!(StreamKind::Chat.to_string(), "chat");
//! assert_eq!(StreamKind::ALL.len(), 2);
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use serde::{Deserialize, Serialize};

/// Fixed per-record overhead used when estimating footprint
/// (identity, timestamp, row header and index entry).
pub const RECORD_OVERHEAD_BYTES: u64 = 48;

/// One of the independently retained message streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Chat,
    Confession,
}

impl StreamKind {
    /// Every configured stream, in sweep order.
    pub const ALL: [StreamKind; 2] = [StreamKind::Chat, StreamKind::Confession];

    /// Stable lowercase name, used for table names, metric labels and routes.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Confession => "confession",
        }
    }

    /// Backing table name for SQL stores.
    #[must_use]
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Chat => "chat_messages",
            Self::Confession => "confession_messages",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(Self::Chat),
            "confession" => Ok(Self::Confession),
            other => Err(format!("unknown stream '{}'", other)),
        }
    }
}

/// A timestamped text record.
///
/// Records in a stream are totally ordered by `(created_at, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identity, unique within a stream and never reused
    pub id: i64,
    /// Message body
    pub text: String,
    /// Append timestamp (epoch millis), non-decreasing within a stream
    #[serde(rename = "timestamp")]
    pub created_at: i64,
}

impl Record {
    #[must_use]
    pub fn new(id: i64, text: String, created_at: i64) -> Self {
        Self { id, text, created_at }
    }

    /// Approximate persisted footprint of this record.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.text.len() as u64 + RECORD_OVERHEAD_BYTES
    }

    /// Ordering key: timestamp first, identity breaks ties.
    #[must_use]
    pub fn order_key(&self) -> (i64, i64) {
        (self.created_at, self.id)
    }
}

/// Current wall-clock time in epoch millis.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
