//! Time utilities for producer
//!
//! Session timing is expressed in wall-clock epoch milliseconds because the
//! session start has to survive controller restarts: it is persisted as
//! `sessionStartTime` and read back by a fresh process.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `PRODUCER_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`), read as UTC.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "PRODUCER_MOCK_TIME";

/// Offset between mock time and real time, fixed at first use so mock time
/// advances naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => {
                        let mock_dt = Utc.from_utc_datetime(&naive_dt);
                        let offset = mock_dt.signed_duration_since(Utc::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// A wall-clock instant in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochMillis(i64);

impl EpochMillis {
    /// Current time, respecting mock time in debug builds
    pub fn now() -> Self {
        let real_now = Utc::now();
        let now = match get_mock_time_offset() {
            Some(offset) => real_now + offset,
            None => real_now,
        };
        Self(now.timestamp_millis())
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Whole seconds elapsed since `earlier`, floored; zero if `earlier` is
    /// in the future.
    pub fn whole_secs_since(&self, earlier: EpochMillis) -> u64 {
        let delta = self.0.saturating_sub(earlier.0);
        if delta <= 0 { 0 } else { (delta / 1000) as u64 }
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0)
            .single()
            .unwrap_or_default()
    }
}

impl fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().to_rfc3339())
    }
}

/// Format seconds as `HH:MM:SS` for the live panel.
pub fn format_clock(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Format seconds in the compact form shown on the block overlay:
/// `Xh Ym`, `Xm Ys` or `Xs`.
///
/// The seconds field is displayed one ahead, so a freshly started session
/// reads `1s` rather than `0s`. Zero renders as `0m`.
pub fn format_compact(secs: u64) -> String {
    if secs == 0 {
        return "0m".to_string();
    }

    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let shown_secs = secs % 60 + 1;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, shown_secs)
    } else {
        format!("{}s", shown_secs)
    }
}
