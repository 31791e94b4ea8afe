//! The controller: sole owner and writer of the extension state

use producer_api::{ExtensionState, RuleSet, StateView, TimerSnapshot};
use producer_config::Settings;
use producer_store::{load_state, StateUpdate, Store};
use producer_util::{EpochMillis, TabId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{evaluate, is_privileged, Configuration, CoreEvent, EnsureOutcome, SessionTimer, Verdict};

/// Controller tuning taken from the validated settings
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub commit_every_seconds: u64,
    pub privileged_schemes: Vec<String>,
}

impl ControllerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            commit_every_seconds: settings.timer.commit_every_seconds,
            privileged_schemes: settings.tabs.privileged_schemes.clone(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Owns the live rule set, activation flag, block counter and session timer.
///
/// Every handler runs to completion. Store failures are logged and never
/// surface: a failed load yields defaults, a failed save is dropped.
pub struct Controller {
    store: Arc<dyn Store>,
    config: ControllerConfig,
    active: bool,
    rules: RuleSet,
    session_blocks: u32,
    timer: SessionTimer,
}

impl Controller {
    /// Load persisted state and build a controller around it
    pub fn load(store: Arc<dyn Store>, config: ControllerConfig) -> Self {
        let state = match load_state(store.as_ref()) {
            Ok(state) => {
                info!(
                    rule_count = state.rules.len(),
                    is_active = state.is_active,
                    session_running = state.session_start_time.is_some(),
                    focused_time = state.focused_time,
                    "State loaded"
                );
                state
            }
            Err(e) => {
                warn!(error = %e, "Failed to load state, using defaults");
                ExtensionState::default()
            }
        };

        Self::from_state(store, config, state)
    }

    pub fn from_state(store: Arc<dyn Store>, config: ControllerConfig, state: ExtensionState) -> Self {
        let timer = SessionTimer::restore(
            state.session_start_time,
            state.focused_time,
            config.commit_every_seconds,
        );

        Self {
            store,
            config,
            active: state.is_active,
            rules: state.rules,
            session_blocks: state.session_blocks,
            timer,
        }
    }

    /// Process start: the block counter is per browser session, the rest
    /// survives. Resumes the timer when blocking was left on.
    pub fn on_startup(&mut self, now: EpochMillis) -> Vec<CoreEvent> {
        self.session_blocks = 0;
        self.persist(StateUpdate::new().session_blocks(0));

        if self.active {
            self.ensure_timer_running(now);
        }

        vec![CoreEvent::BlockCountChanged { count: 0 }]
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn session_blocks(&self) -> u32 {
        self.session_blocks
    }

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    /// Whether the daemon should keep a periodic tick scheduled
    pub fn is_ticking(&self) -> bool {
        self.timer.is_ticking()
    }

    pub fn store_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    // Decisions

    pub fn evaluate(&self, url: &str) -> Verdict {
        let verdict = evaluate(&self.rules, self.active, url);
        debug!(url, ?verdict, "Evaluated");
        verdict
    }

    pub fn should_block(&self, url: &str) -> bool {
        self.evaluate(url).should_block()
    }

    /// Tabs whose verdict flips between two configurations. Tabs on
    /// privileged schemes and tabs without a URL are never included.
    pub fn tabs_to_reload<'t>(
        &self,
        tabs: impl IntoIterator<Item = (&'t TabId, &'t str)>,
        before: Configuration<'_>,
        after: Configuration<'_>,
    ) -> Vec<TabId> {
        tabs.into_iter()
            .filter(|(_, url)| !url.is_empty())
            .filter(|(_, url)| !is_privileged(url, &self.config.privileged_schemes))
            .filter(|(_, url)| crate::verdict_flips(before, after, url))
            .map(|(id, _)| id.clone())
            .collect()
    }

    // Rule updates

    /// Adopt a full replacement (last writer wins) and persist it
    pub fn update_rules(&mut self, rules: RuleSet, active: bool) -> Vec<CoreEvent> {
        self.rules = rules;
        self.active = active;

        self.persist(
            StateUpdate::new()
                .rules(&self.rules)
                .is_active(self.active),
        );

        info!(rule_count = self.rules.len(), is_active = active, "Rules updated");

        vec![CoreEvent::RulesUpdated {
            rule_count: self.rules.len(),
            is_active: active,
        }]
    }

    // Timer

    pub fn start_timer(&mut self, now: EpochMillis) {
        let resumed = self.timer.is_running();
        self.timer.start(now);
        self.persist_timer();

        info!(
            resumed,
            started_at = ?self.timer.session_started_at(),
            "Timer started"
        );
    }

    pub fn stop_timer(&mut self, now: EpochMillis) {
        if self.timer.stop(now) {
            self.persist_timer();
            info!(
                total_focused = self.timer.cumulative_focused(),
                "Timer stopped"
            );
        } else {
            debug!("Timer already stopped");
        }
    }

    pub fn ensure_timer_running(&mut self, now: EpochMillis) -> EnsureOutcome {
        let outcome = self.timer.ensure_running(self.active, now);
        match outcome {
            EnsureOutcome::AlreadyRunning => {}
            EnsureOutcome::Started | EnsureOutcome::Stopped => {
                self.persist_timer();
                info!(?outcome, "Timer reconciled");
            }
        }
        outcome
    }

    pub fn timer_state(&self, now: EpochMillis) -> TimerSnapshot {
        self.timer.get_times(now)
    }

    pub fn clear_timers(&mut self, now: EpochMillis) -> Vec<CoreEvent> {
        self.timer.clear(now);
        self.persist_timer();
        info!(running = self.timer.is_running(), "Timers cleared");

        vec![CoreEvent::TimerUpdate(TimerSnapshot::zero())]
    }

    /// One periodic tick; persists when a commit window is crossed
    pub fn tick(&mut self, now: EpochMillis) -> Vec<CoreEvent> {
        let Some(outcome) = self.timer.tick(now) else {
            return Vec::new();
        };

        if outcome.committed {
            self.persist(StateUpdate::new().focused_time(self.timer.cumulative_focused()));
            debug!(
                session_elapsed = outcome.snapshot.session_elapsed,
                total_focused = outcome.snapshot.total_focused,
                "Focused time committed"
            );
        }

        vec![CoreEvent::TimerUpdate(outcome.snapshot)]
    }

    /// Synchronous commit before the process goes away
    pub fn suspend(&mut self, now: EpochMillis) {
        if self.active && self.timer.suspend(now) {
            self.persist_timer();
            info!(
                total_focused = self.timer.cumulative_focused(),
                "Focused time committed on suspend"
            );
        }
    }

    // Block counter

    pub fn reset_session_blocks(&mut self) -> Vec<CoreEvent> {
        self.session_blocks = 0;
        self.persist(StateUpdate::new().session_blocks(0));
        vec![CoreEvent::BlockCountChanged { count: 0 }]
    }

    pub fn report_block(&mut self, url: &str) -> Vec<CoreEvent> {
        self.session_blocks = self.session_blocks.saturating_add(1);
        self.persist(StateUpdate::new().session_blocks(self.session_blocks));
        info!(url, count = self.session_blocks, "Navigation blocked");

        vec![CoreEvent::BlockCountChanged {
            count: self.session_blocks,
        }]
    }

    // Snapshots

    pub fn state_view(&self, now: EpochMillis) -> StateView {
        StateView {
            is_active: self.active,
            rules: self.rules.clone(),
            session_blocks: self.session_blocks,
            timer: self.timer.get_times(now),
        }
    }

    /// The durable fields as they would be persisted now
    pub fn extension_state(&self) -> ExtensionState {
        ExtensionState {
            is_active: self.active,
            rules: self.rules.clone(),
            session_blocks: self.session_blocks,
            session_start_time: self.timer.session_started_at(),
            focused_time: self.timer.cumulative_focused(),
        }
    }

    fn persist_timer(&self) {
        self.persist(
            StateUpdate::new()
                .session_start_time(self.timer.session_started_at())
                .focused_time(self.timer.cumulative_focused()),
        );
    }

    fn persist(&self, update: StateUpdate) {
        let keys: Vec<&str> = update.keys().collect();
        if let Err(e) = update.apply(self.store.as_ref()) {
            warn!(?keys, error = %e, "Failed to persist state");
        }
    }
}
