//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global daemon settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,

    #[serde(default)]
    pub timer: RawTimerConfig,

    #[serde(default)]
    pub panel: RawPanelConfig,

    #[serde(default)]
    pub tabs: RawTabsConfig,

    #[serde(default)]
    pub quotes: RawQuotesConfig,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// IPC socket path (default: $XDG_RUNTIME_DIR/producer/producerd.sock)
    pub socket_path: Option<PathBuf>,

    /// Log directory
    pub log_dir: Option<PathBuf>,

    /// Data directory for store
    pub data_dir: Option<PathBuf>,
}

/// Session timer cadence
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTimerConfig {
    /// Tick period while a session runs
    pub tick_interval_ms: Option<u64>,

    /// Session seconds between durable commits of the focused total
    pub commit_every_seconds: Option<u64>,
}

/// Panel polling
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPanelConfig {
    pub poll_interval_ms: Option<u64>,

    /// Polls without any update before the panel asks the controller to
    /// repair its clock
    pub stale_after_polls: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTabsConfig {
    /// URL prefixes of tabs that are never reloaded
    pub privileged_schemes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawQuotesConfig {
    pub url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub fallback: Option<String>,
}
