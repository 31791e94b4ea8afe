//! What the panel currently believes about the controller
//!
//! Polls and pushes both land here. The panel never computes time on its
//! own; every reading comes from the controller.

use producer_api::{EventPayload, RuleSet, StateView, TimerSnapshot};
use producer_util::{format_clock, format_compact};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

#[derive(Debug, Clone, Default)]
pub struct PanelState {
    pub connected: bool,
    pub is_active: bool,
    pub rules: RuleSet,
    pub session_blocks: u32,
    pub timer: TimerSnapshot,
    /// Last time a timer reading arrived, by poll or push
    pub last_update_received_at: Option<Instant>,
}

impl PanelState {
    pub fn from_view(view: StateView, at: Instant) -> Self {
        Self {
            connected: true,
            is_active: view.is_active,
            rules: view.rules,
            session_blocks: view.session_blocks,
            timer: view.timer,
            last_update_received_at: Some(at),
        }
    }

    pub fn apply_timer(&mut self, snapshot: TimerSnapshot, at: Instant) {
        self.timer = snapshot;
        self.last_update_received_at = Some(at);
    }

    /// Fold a push into the state. Returns whether anything changed.
    pub fn apply_event(&mut self, payload: &EventPayload, at: Instant) -> bool {
        match payload {
            EventPayload::TimerUpdate(snapshot) => {
                self.apply_timer(*snapshot, at);
                true
            }
            EventPayload::UpdateBlockCount { count } => {
                self.session_blocks = *count;
                true
            }
            EventPayload::RulesChanged { is_active, .. } => {
                self.is_active = *is_active;
                true
            }
            EventPayload::Shutdown => {
                self.connected = false;
                true
            }
            EventPayload::ReloadTab { .. } => false,
        }
    }

    /// An active session whose readings stopped arriving
    pub fn is_stale(&self, now: Instant, stale_after: Duration) -> bool {
        if !self.is_active {
            return false;
        }
        match self.last_update_received_at {
            Some(at) => now.saturating_duration_since(at) > stale_after,
            None => true,
        }
    }

    /// Nothing for clear-info to reset
    pub fn info_is_clear(&self) -> bool {
        self.timer.is_zero() && self.session_blocks == 0
    }

    pub fn status_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "Session:  {}",
                if self.is_active { "Active" } else { "Inactive" }
            ),
            format!("Session time:  {}", format_clock(self.timer.session_elapsed)),
            format!("Focused time:  {}", format_clock(self.timer.total_focused)),
            format!("Blocked:  {}", self.session_blocks),
            format!("Rules:  {}", self.rules.len()),
        ];
        if !self.connected {
            lines.push("producerd is not reachable".into());
        }
        lines
    }
}

/// Line shown on a blocked page
pub fn overlay_line(timer: &TimerSnapshot) -> String {
    format!(
        "Focused this session: {}  (total {})",
        format_compact(timer.session_elapsed),
        format_compact(timer.total_focused)
    )
}

/// Panel state shared between the poll task, the push listener and the
/// renderer
#[derive(Clone)]
pub struct SharedState {
    tx: Arc<watch::Sender<PanelState>>,
    rx: watch::Receiver<PanelState>,
}

impl SharedState {
    pub fn new(initial: PanelState) -> Self {
        let (tx, rx) = watch::channel(initial);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn get(&self) -> PanelState {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelState> {
        self.rx.clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut PanelState) -> bool) {
        self.tx.send_if_modified(f);
    }
}
