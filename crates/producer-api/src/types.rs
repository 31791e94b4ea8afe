//! Shared data types for the producer API

use producer_util::{ClientId, EpochMillis};
use serde::{Deserialize, Serialize};

use crate::RuleSet;

/// Session timer reading, in whole seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    /// Seconds since the current session started, zero when idle
    #[serde(rename = "sessionTime")]
    pub session_elapsed: u64,
    /// Cumulative focused seconds including the running session
    #[serde(rename = "focusedTime")]
    pub total_focused: u64,
}

impl TimerSnapshot {
    pub fn new(session_elapsed: u64, total_focused: u64) -> Self {
        Self {
            session_elapsed,
            total_focused,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.session_elapsed == 0 && self.total_focused == 0
    }
}

/// Controller-owned state as persisted and as reported to panels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionState {
    pub is_active: bool,
    pub rules: RuleSet,
    pub session_blocks: u32,
    pub session_start_time: Option<EpochMillis>,
    /// Cumulative focused seconds as last committed
    pub focused_time: u64,
}

/// Panel-facing view of the controller state, returned by `getState`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateView {
    pub is_active: bool,
    pub rules: RuleSet,
    pub session_blocks: u32,
    #[serde(flatten)]
    pub timer: TimerSnapshot,
}

/// Health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
    pub rule_count: usize,
    pub attached_tabs: usize,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    /// Unix UID if available
    pub uid: Option<u32>,
}
