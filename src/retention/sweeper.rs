// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Calendar-anchored sweep.
//!
//! The sweep halves every stream unconditionally, as a backstop for a stale
//! size statistic or a guard that under-fires. It fires at fixed wall-clock
//! points, not relative to process start, so restarts do not push it back:
//! with the default `every_days = 15, hour_utc = 0` it runs at 00:00 UTC on
//! days 1, 16 and 31 of each month (cron `0 0 */15 * *`).

use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Datelike, Utc};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::record::StreamKind;
use crate::storage::traits::RecordStore;
use super::executor::{EvictionExecutor, EvictionOutcome, EvictionTrigger};
use super::guard::error_label;

/// Longest single sleep; the wall clock is re-read after each nap.
const MAX_NAP: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSchedule {
    every_days: u32,
    hour_utc: u32,
}

impl SweepSchedule {
    /// `every_days` must be in `1..=31` and `hour_utc` in `0..=23`
    /// (checked by `BoardConfig::validate`).
    #[must_use]
    pub fn new(every_days: u32, hour_utc: u32) -> Self {
        Self { every_days: every_days.clamp(1, 31), hour_utc: hour_utc.min(23) }
    }

    /// Whether the sweep fires on this day of the month.
    #[must_use]
    pub fn fires_on(&self, day_of_month: u32) -> bool {
        day_of_month >= 1 && (day_of_month - 1) % self.every_days == 0
    }

    /// First firing strictly after `now`.
    ///
    /// ```
    /// use board_engine::retention::SweepSchedule;
    /// use chrono::{TimeZone, Utc};
    ///
    /// let schedule = SweepSchedule::new(15, 0);
    /// let now = Utc.with_ymd_and_hms(2026, 10, 2, 8, 0, 0).unwrap();
    /// let next = schedule.next_after(now).unwrap();
    /// assert_eq!(next, Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap());
    /// ```
    #[must_use]
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut date = now.date_naive();
        // Day 1 of the next month always fires, so 32 days is enough.
        for _ in 0..=32 {
            if self.fires_on(date.day()) {
                let at = date.and_hms_opt(self.hour_utc, 0, 0)?.and_utc();
                if at > now {
                    return Some(at);
                }
            }
            date = date.succ_opt()?;
        }
        None
    }
}

impl Default for SweepSchedule {
    fn default() -> Self {
        Self::new(15, 0)
    }
}

/// One stream the sweeper is responsible for.
#[derive(Clone)]
pub struct SweepTarget {
    pub stream: StreamKind,
    pub store: Arc<dyn RecordStore>,
}

/// Per-stream results of one sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub outcomes: Vec<EvictionOutcome>,
    pub failures: Vec<(StreamKind, String)>,
}

impl SweepReport {
    #[must_use]
    pub fn total_deleted(&self) -> u64 {
        self.outcomes.iter().map(|o| o.deleted).sum()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ScheduledSweeper {
    targets: Vec<SweepTarget>,
    executor: EvictionExecutor,
    schedule: SweepSchedule,
}

impl ScheduledSweeper {
    pub fn new(targets: Vec<SweepTarget>, executor: EvictionExecutor, schedule: SweepSchedule) -> Self {
        Self { targets, executor, schedule }
    }

    #[must_use]
    pub fn schedule(&self) -> SweepSchedule {
        self.schedule
    }

    /// Halve every stream now. A failure on one stream is logged and does not
    /// stop the others.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> SweepReport {
        info!(streams = self.targets.len(), "Running scheduled sweep");
        let mut report = SweepReport::default();

        for target in &self.targets {
            let result = self
                .executor
                .evict_oldest_half(target.store.as_ref(), target.stream, EvictionTrigger::Sweep)
                .await;

            match result {
                Ok(outcome) => {
                    crate::metrics::record_sweep(target.stream.as_str(), "success");
                    report.outcomes.push(outcome);
                }
                Err(e) => {
                    warn!(stream = %target.stream, error = %e, "Scheduled sweep failed for stream; next sweep will retry");
                    crate::metrics::record_sweep(target.stream.as_str(), "failure");
                    crate::metrics::record_error(target.stream.as_str(), "sweep", error_label(&e));
                    report.failures.push((target.stream, e.to_string()));
                }
            }
        }

        info!(
            deleted = report.total_deleted(),
            failed_streams = report.failures.len(),
            "Scheduled sweep finished"
        );
        report
    }

    /// Sweep on schedule until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = Utc::now();
            let Some(next) = self.schedule.next_after(now) else {
                warn!("Sweep schedule produced no future firing; sweeper stopping");
                return;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO).min(MAX_NAP);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    if Utc::now() >= next {
                        self.run_once().await;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("Scheduled sweeper stopped");
    }
}
