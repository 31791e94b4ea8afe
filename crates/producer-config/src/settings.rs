//! Validated settings

use crate::schema::{
    RawConfig, RawDaemonConfig, RawPanelConfig, RawQuotesConfig, RawTabsConfig, RawTimerConfig,
};
use producer_util::{default_data_dir, default_log_dir, default_socket_path};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_COMMIT_EVERY_SECONDS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_STALE_AFTER_POLLS: u32 = 5;
pub const DEFAULT_QUOTE_URL: &str =
    "https://api.forismatic.com/api/1.0/?method=getQuote&lang=en&format=json";
pub const DEFAULT_QUOTE_TIMEOUT_SECONDS: u64 = 5;
pub const DEFAULT_QUOTE_FALLBACK: &str = "Stay positive and keep pushing forward!";

/// Validated settings ready for use by the daemon and the panel
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub daemon: DaemonConfig,
    pub timer: TimerConfig,
    pub panel: PanelConfig,
    pub tabs: TabsConfig,
    pub quotes: QuotesConfig,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            daemon: DaemonConfig::from_raw(raw.daemon),
            timer: TimerConfig::from_raw(raw.timer),
            panel: PanelConfig::from_raw(raw.panel),
            tabs: TabsConfig::from_raw(raw.tabs),
            quotes: QuotesConfig::from_raw(raw.quotes),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub socket_path: PathBuf,
    pub log_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl DaemonConfig {
    fn from_raw(raw: RawDaemonConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(default_socket_path),
            log_dir: raw.log_dir.unwrap_or_else(default_log_dir),
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_raw(RawDaemonConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct TimerConfig {
    pub tick_interval: Duration,
    pub commit_every_seconds: u64,
}

impl TimerConfig {
    fn from_raw(raw: RawTimerConfig) -> Self {
        Self {
            tick_interval: Duration::from_millis(
                raw.tick_interval_ms.unwrap_or(DEFAULT_TICK_INTERVAL_MS),
            ),
            commit_every_seconds: raw
                .commit_every_seconds
                .unwrap_or(DEFAULT_COMMIT_EVERY_SECONDS),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::from_raw(RawTimerConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub poll_interval: Duration,
    pub stale_after_polls: u32,
}

impl PanelConfig {
    fn from_raw(raw: RawPanelConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(
                raw.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            stale_after_polls: raw.stale_after_polls.unwrap_or(DEFAULT_STALE_AFTER_POLLS),
        }
    }

    /// Silence after which the panel treats the controller clock as dead
    pub fn stale_after(&self) -> Duration {
        self.poll_interval * self.stale_after_polls
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::from_raw(RawPanelConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct TabsConfig {
    pub privileged_schemes: Vec<String>,
}

impl TabsConfig {
    fn from_raw(raw: RawTabsConfig) -> Self {
        Self {
            privileged_schemes: raw.privileged_schemes.unwrap_or_else(|| {
                vec!["chrome://".to_string(), "chrome-extension://".to_string()]
            }),
        }
    }
}

impl Default for TabsConfig {
    fn default() -> Self {
        Self::from_raw(RawTabsConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct QuotesConfig {
    pub url: String,
    pub timeout: Duration,
    pub fallback: String,
}

impl QuotesConfig {
    fn from_raw(raw: RawQuotesConfig) -> Self {
        Self {
            url: raw.url.unwrap_or_else(|| DEFAULT_QUOTE_URL.to_string()),
            timeout: Duration::from_secs(
                raw.timeout_seconds.unwrap_or(DEFAULT_QUOTE_TIMEOUT_SECONDS),
            ),
            fallback: raw
                .fallback
                .unwrap_or_else(|| DEFAULT_QUOTE_FALLBACK.to_string()),
        }
    }
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self::from_raw(RawQuotesConfig::default())
    }
}
