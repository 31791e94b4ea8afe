//! Command types for the producer protocol

use producer_util::ClientId;
use serde::{Deserialize, Serialize};

use crate::{HealthStatus, RuleSet, StateView, TimerSnapshot, API_VERSION};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    UnsupportedVersion,
    InternalError,
}

/// All requests a panel or navigation client can send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    /// Ask for a verdict on a navigation target
    CheckBlock { url: String },

    /// Replace the live rule set and activation flag (last writer wins)
    UpdateRules { rules: RuleSet, is_active: bool },

    /// Reload every attached tab whose verdict flips between two configurations
    ReloadAffectedTabs {
        rules_before: RuleSet,
        rules_after: RuleSet,
        is_active_before: bool,
        is_active_after: bool,
    },

    StartTimer,
    StopTimer,
    EnsureTimerRunning,
    GetTimerState,
    ClearTimers,
    ResetSessionBlocks,

    /// A navigation was blocked; bump the session counter
    ReportBlock { url: String },

    /// Full state for a panel's initial load
    GetState,

    GetMotivationalQuote,

    /// Register the sending connection as a tab showing `url`.
    /// Sent again on every navigation; the tab goes away on disconnect.
    AttachTab { url: String },

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Get health status
    GetHealth,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ResponsePayload {
    BlockVerdict { should_block: bool },
    TimerState(TimerSnapshot),
    State(StateView),
    Ack { success: bool },
    Quote { success: bool, quote: String },
    TabsReloaded { count: usize },
    Subscribed { client_id: ClientId },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}
