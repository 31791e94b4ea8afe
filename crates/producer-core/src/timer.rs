//! Session timer state machine
//!
//! `Idle` (no session start) and `Running` (session start set). The timer is
//! pure bookkeeping over explicit `now` arguments; it never reads the clock
//! and never touches the store. Callers persist whenever a transition says
//! the durable fields changed.
//!
//! `focused_base` is the cumulative total at the moment the running session
//! began (or, after a restart, the persisted total), so the live total is
//! always `focused_base + session_elapsed`.

use producer_api::TimerSnapshot;
use producer_util::EpochMillis;

/// Outcome of a reconciliation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// Blocking is off, so the timer was forced idle
    Stopped,
    /// A session clock or tick was missing and has been started
    Started,
    /// Nothing to repair
    AlreadyRunning,
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub snapshot: TimerSnapshot,
    /// The cumulative total was rolled forward and must be persisted
    pub committed: bool,
}

#[derive(Debug, Clone)]
pub struct SessionTimer {
    session_started_at: Option<EpochMillis>,
    /// Durable cumulative total, persisted as `focusedTime`
    cumulative_focused: u64,
    focused_base: u64,
    /// Whether a periodic tick is scheduled for this session
    ticking: bool,
    commit_every_seconds: u64,
    /// Commit window (`elapsed / commit_every_seconds`) last persisted
    last_commit_window: u64,
}

impl SessionTimer {
    pub fn new(commit_every_seconds: u64) -> Self {
        Self::restore(None, 0, commit_every_seconds)
    }

    /// Rebuild from persisted fields. The base comes from the persisted
    /// total, never from wall-clock guesses. No tick is scheduled yet.
    pub fn restore(
        session_started_at: Option<EpochMillis>,
        cumulative_focused: u64,
        commit_every_seconds: u64,
    ) -> Self {
        Self {
            session_started_at,
            cumulative_focused,
            focused_base: cumulative_focused,
            ticking: false,
            commit_every_seconds: commit_every_seconds.max(1),
            last_commit_window: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.session_started_at.is_some()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    pub fn session_started_at(&self) -> Option<EpochMillis> {
        self.session_started_at
    }

    pub fn cumulative_focused(&self) -> u64 {
        self.cumulative_focused
    }

    /// Current reading. Identical to what `tick` would report at `now`.
    pub fn get_times(&self, now: EpochMillis) -> TimerSnapshot {
        match self.session_started_at {
            Some(started) => {
                let elapsed = now.whole_secs_since(started);
                TimerSnapshot::new(elapsed, self.focused_base + elapsed)
            }
            None => TimerSnapshot::new(0, self.cumulative_focused),
        }
    }

    /// Begin a session, or resume ticking an existing one.
    ///
    /// An already-running session keeps its start and its base.
    pub fn start(&mut self, now: EpochMillis) {
        match self.session_started_at {
            Some(started) => {
                self.last_commit_window = self.window_at(now.whole_secs_since(started));
            }
            None => {
                self.session_started_at = Some(now);
                self.focused_base = self.cumulative_focused;
                self.last_commit_window = 0;
            }
        }
        self.ticking = true;
    }

    /// Per-tick bookkeeping. `None` while idle.
    pub fn tick(&mut self, now: EpochMillis) -> Option<TickOutcome> {
        self.session_started_at?;

        let snapshot = self.get_times(now);
        let window = self.window_at(snapshot.session_elapsed);

        let committed = snapshot.session_elapsed > 0 && window > self.last_commit_window;
        if committed {
            self.cumulative_focused = snapshot.total_focused;
            self.last_commit_window = window;
        }

        Some(TickOutcome {
            snapshot,
            committed,
        })
    }

    /// End the session, committing its total. Returns whether a session
    /// was actually running; stopping an idle timer only cancels the tick.
    pub fn stop(&mut self, now: EpochMillis) -> bool {
        self.ticking = false;

        if self.session_started_at.is_none() {
            return false;
        }

        self.cumulative_focused = self.get_times(now).total_focused;
        self.focused_base = self.cumulative_focused;
        self.session_started_at = None;
        self.last_commit_window = 0;
        true
    }

    /// Zero the cumulative total. A running session restarts its clock at
    /// `now` and keeps running.
    pub fn clear(&mut self, now: EpochMillis) {
        self.cumulative_focused = 0;
        self.focused_base = 0;
        if self.session_started_at.is_some() {
            self.session_started_at = Some(now);
            self.last_commit_window = 0;
        }
    }

    /// Repair entry point for observers attaching and controller startup
    pub fn ensure_running(&mut self, active: bool, now: EpochMillis) -> EnsureOutcome {
        if !active {
            self.stop(now);
            return EnsureOutcome::Stopped;
        }

        if self.session_started_at.is_none() || !self.ticking {
            self.start(now);
            EnsureOutcome::Started
        } else {
            EnsureOutcome::AlreadyRunning
        }
    }

    /// Commit the running total before the process goes away. The session
    /// start is kept so a restarted controller resumes the same session.
    pub fn suspend(&mut self, now: EpochMillis) -> bool {
        if self.session_started_at.is_none() {
            return false;
        }
        self.cumulative_focused = self.get_times(now).total_focused;
        self.ticking = false;
        true
    }

    fn window_at(&self, elapsed: u64) -> u64 {
        elapsed / self.commit_every_seconds
    }
}
