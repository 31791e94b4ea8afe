//! Core events emitted by the controller

use producer_api::TimerSnapshot;

/// Events emitted by the controller, pushed to panels by the daemon.
/// Delivery is best-effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Timer reading after a tick or a reset
    TimerUpdate(TimerSnapshot),

    /// Session block counter changed
    BlockCountChanged { count: u32 },

    /// Live rule set or activation flag replaced
    RulesUpdated { rule_count: usize, is_active: bool },
}
