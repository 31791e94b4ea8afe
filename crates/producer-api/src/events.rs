//! Event types for producerd -> client pushes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TimerSnapshot, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: producer_util::EpochMillis::now().to_datetime(),
            payload,
        }
    }
}

/// All unsolicited pushes from the controller. Delivery is best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EventPayload {
    /// Timer reading, once per tick and after a reset
    TimerUpdate(TimerSnapshot),

    /// Session block counter changed
    UpdateBlockCount { count: u32 },

    /// Live rule set or activation flag was replaced
    RulesChanged { rule_count: usize, is_active: bool },

    /// Targeted at a single attached tab: its verdict flipped, navigate again
    ReloadTab { url: String },

    /// Controller is shutting down
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization() {
        let event = Event::new(EventPayload::TimerUpdate(TimerSnapshot::new(1, 61)));

        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.api_version, API_VERSION);
        assert_eq!(
            parsed.payload,
            EventPayload::TimerUpdate(TimerSnapshot::new(1, 61))
        );
    }

    #[test]
    fn push_names_match_panel_listeners() {
        let json = serde_json::to_value(EventPayload::TimerUpdate(TimerSnapshot::zero())).unwrap();
        assert_eq!(json["action"], "timerUpdate");
        assert_eq!(json["sessionTime"], 0);

        let json = serde_json::to_value(EventPayload::UpdateBlockCount { count: 4 }).unwrap();
        assert_eq!(json["action"], "updateBlockCount");
        assert_eq!(json["count"], 4);

        let json = serde_json::to_value(EventPayload::RulesChanged {
            rule_count: 2,
            is_active: false,
        })
        .unwrap();
        assert_eq!(json["ruleCount"], 2);
        assert_eq!(json["isActive"], false);
    }
}
