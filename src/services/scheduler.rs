// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weekly trigger for the playlist sync.

use crate::services::playlist_sync::{PlaylistSyncer, SyncOutcome};
use chrono::{Datelike, Duration, Local, NaiveDateTime, NaiveTime, Weekday};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A fixed weekday and local wall-clock time, e.g. `Sun 12:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub weekday: Weekday,
    pub at: NaiveTime,
}

impl Default for WeeklySchedule {
    /// Every Sunday at noon.
    fn default() -> Self {
        Self {
            weekday: Weekday::Sun,
            at: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default(),
        }
    }
}

impl WeeklySchedule {
    /// The first fire time strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        let days_ahead = (7 + self.weekday.num_days_from_monday()
            - today.weekday().num_days_from_monday())
            % 7;

        let candidate = NaiveDateTime::new(today + Duration::days(days_ahead as i64), self.at);
        if candidate > now {
            candidate
        } else {
            candidate + Duration::days(7)
        }
    }
}

impl fmt::Display for WeeklySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.weekday, self.at.format("%H:%M"))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("expected \"<weekday> HH:MM\", got {0:?}")]
pub struct ScheduleParseError(String);

impl FromStr for WeeklySchedule {
    type Err = ScheduleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ScheduleParseError(s.to_string());

        let mut parts = s.split_whitespace();
        let (Some(day), Some(time), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(err());
        };

        Ok(Self {
            weekday: day.parse().map_err(|_| err())?,
            at: NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| err())?,
        })
    }
}

/// Spawn the weekly sync loop.
///
/// Each tick calls `sync()` once. Failures are logged and not retried; the
/// following week's run is the retry.
pub fn spawn_weekly_sync(schedule: WeeklySchedule, syncer: Arc<PlaylistSyncer>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now().naive_local();
            let next = schedule.next_after(now);
            let wait = (next - now).to_std().unwrap_or_default();

            tracing::info!(next_run = %next, schedule = %schedule, "Next scheduled sync");
            tokio::time::sleep(wait).await;

            run_logged_sync(&syncer).await;
        }
    })
}

/// Run one sync in the background: every outcome goes to the log.
pub async fn run_logged_sync(syncer: &PlaylistSyncer) {
    match syncer.sync().await {
        Ok(SyncOutcome::Completed { tracks, .. }) => {
            tracing::info!(tracks, "Background sync completed");
        }
        Ok(SyncOutcome::Skipped) => {
            tracing::warn!("Background sync skipped, previous run still in progress");
        }
        Err(e) if e.requires_reauth() => {
            tracing::error!(error = %e, "Background sync failed, visit /login to re-authenticate");
        }
        Err(e) => {
            tracing::error!(error = %e, "Background sync failed");
        }
    }
}
