//! Tick-driven breathing session controller.
//!
//! The controller owns one [`SessionState`] and advances it only through
//! [`SessionController::tick`]; there are no timers inside. Every phase
//! entry is pushed synchronously to a [`PhaseObserver`] before the call
//! that caused it returns.
//!
//! ```text
//!  ready ──start──▶ inhale ─▶ [hold] ─▶ exhale ─▶ [holdAfterExhale] ─┐
//!                     ▲                                              │
//!                     └──────────── cycleIndex + 1 < cycleCount ◀────┤
//!                                                                    ▼
//!                                                                complete
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pattern::BreathingPattern;
use crate::phase::Phase;

/// Remaining times at or below this are treated as elapsed, so a phase of
/// `4.0` s driven by forty `0.1` s ticks ends on the fortieth tick.
pub const TIME_EPSILON: f64 = 1e-9;

/// Receives every phase entry, synchronously.
pub trait PhaseObserver {
    fn on_phase_changed(&mut self, phase: Phase);
}

/// Visual-only sessions: nobody listens.
impl PhaseObserver for () {
    fn on_phase_changed(&mut self, _phase: Phase) {}
}

impl<O: PhaseObserver + ?Sized> PhaseObserver for &mut O {
    fn on_phase_changed(&mut self, phase: Phase) {
        (**self).on_phase_changed(phase);
    }
}

impl<O: PhaseObserver + ?Sized> PhaseObserver for Box<O> {
    fn on_phase_changed(&mut self, phase: Phase) {
        (**self).on_phase_changed(phase);
    }
}

/// What happens to tick overshoot when a phase ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimingMode {
    /// The new phase starts at its full duration; overshoot is dropped.
    #[default]
    Clamp,
    /// Overshoot is subtracted from the new phase (floored at zero).
    CarryOver,
}

/// Snapshot of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: Phase,
    /// Seconds left in the current phase, never negative
    pub time_remaining: f64,
    /// Completed cycles in the current run
    pub cycle_index: u32,
    pub is_running: bool,
}

impl SessionState {
    pub const READY: Self = Self {
        phase: Phase::Ready,
        time_remaining: 0.0,
        cycle_index: 0,
        is_running: false,
    };
}

impl Default for SessionState {
    fn default() -> Self {
        Self::READY
    }
}

/// How a successful [`SessionController::start`] was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Fresh run from inhale at cycle 0
    Started,
    /// Same pattern, mid-session: carried on where it was
    Resumed,
}

/// Drives a single breathing session through its phases.
#[derive(Debug)]
pub struct SessionController<O: PhaseObserver = ()> {
    state: SessionState,
    pattern: Option<BreathingPattern>,
    timing: TimingMode,
    observer: O,
}

impl Default for SessionController<()> {
    fn default() -> Self {
        Self::new(())
    }
}

impl<O: PhaseObserver> SessionController<O> {
    pub fn new(observer: O) -> Self {
        Self {
            state: SessionState::READY,
            pattern: None,
            timing: TimingMode::default(),
            observer,
        }
    }

    pub fn with_timing(mut self, timing: TimingMode) -> Self {
        self.timing = timing;
        self
    }

    /// Begin a session, or carry on with the current one.
    ///
    /// When a session is mid-flight (any breathing phase, paused or not)
    /// and `pattern` equals the active one, this resumes instead of
    /// restarting. Any other case restarts from inhale at cycle 0.
    /// An invalid pattern leaves the controller untouched.
    pub fn start(&mut self, pattern: &BreathingPattern) -> Result<StartOutcome> {
        pattern.validate()?;

        if self.state.phase.is_breathing() && self.pattern.as_ref() == Some(pattern) {
            if !self.state.is_running {
                self.state.is_running = true;
                log::info!("session '{}' resumed in {}", pattern.key, self.state.phase);
            }
            return Ok(StartOutcome::Resumed);
        }

        log::info!(
            "session '{}' started: {} cycles of {:.1}s",
            pattern.key,
            pattern.cycle_count,
            pattern.cycle_seconds()
        );
        self.pattern = Some(pattern.clone());
        self.state.cycle_index = 0;
        self.state.is_running = true;
        self.enter(Phase::Inhale, pattern.phase_durations.inhale);
        Ok(StartOutcome::Started)
    }

    /// Continue a paused session. Returns `false` when there is nothing to resume.
    pub fn resume(&mut self) -> bool {
        if self.state.is_running || !self.state.phase.is_breathing() {
            return false;
        }
        self.state.is_running = true;
        log::debug!("resumed in {}", self.state.phase);
        true
    }

    /// Freeze the session. Returns `false` if it was already paused, or idle.
    pub fn pause(&mut self) -> bool {
        if !self.state.is_running || !self.state.phase.is_breathing() {
            return false;
        }
        self.state.is_running = false;
        log::debug!("paused in {} with {:.2}s left", self.state.phase, self.state.time_remaining);
        true
    }

    /// Back to `ready` from anywhere. The active pattern is dropped.
    pub fn reset(&mut self) {
        let previous = self.state.phase;
        self.state = SessionState::READY;
        self.pattern = None;
        if previous != Phase::Ready {
            log::debug!("reset from {previous}");
            self.observer.on_phase_changed(Phase::Ready);
        }
    }

    /// Advance time by `delta_seconds`; performs at most one transition.
    ///
    /// Returns the phase entered, if any. A no-op while paused, idle,
    /// complete, or for a non-positive / non-finite delta.
    pub fn tick(&mut self, delta_seconds: f64) -> Option<Phase> {
        if !(delta_seconds > 0.0 && delta_seconds.is_finite()) {
            log::warn!("ignoring tick with delta {delta_seconds}");
            return None;
        }
        if !self.state.is_running || !self.state.phase.is_breathing() {
            return None;
        }
        let (durations, cycle_count) = match &self.pattern {
            Some(p) => (p.phase_durations, p.cycle_count),
            None => return None,
        };

        self.state.time_remaining -= delta_seconds;
        if self.state.time_remaining > TIME_EPSILON {
            return None;
        }
        let overshoot = (-self.state.time_remaining).max(0.0);

        if let Some(next) = durations.phase_after(self.state.phase) {
            let full = durations.of(next);
            self.enter(next, self.carried(full, overshoot));
            return Some(next);
        }

        // End of cycle.
        self.state.cycle_index += 1;
        if self.state.cycle_index >= cycle_count {
            self.state.is_running = false;
            self.state.cycle_index = 0;
            log::info!("session complete after {cycle_count} cycles");
            self.enter(Phase::Complete, 0.0);
            return Some(Phase::Complete);
        }
        self.enter(Phase::Inhale, self.carried(durations.inhale, overshoot));
        Some(Phase::Inhale)
    }

    fn carried(&self, full: f64, overshoot: f64) -> f64 {
        match self.timing {
            TimingMode::Clamp => full,
            TimingMode::CarryOver => (full - overshoot).max(0.0),
        }
    }

    fn enter(&mut self, phase: Phase, duration: f64) {
        self.state.phase = phase;
        self.state.time_remaining = duration;
        log::debug!(
            "enter {phase} ({duration:.2}s, cycle {})",
            self.state.cycle_index + 1
        );
        self.observer.on_phase_changed(phase);
    }

    // ---------------------------------------------------------------- queries

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn time_remaining(&self) -> f64 {
        self.state.time_remaining
    }

    pub fn cycle_index(&self) -> u32 {
        self.state.cycle_index
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn timing(&self) -> TimingMode {
        self.timing
    }

    pub fn active_pattern(&self) -> Option<&BreathingPattern> {
        self.pattern.as_ref()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    // ---------------------------------------------------------------- display

    /// Whole seconds shown on the countdown (ceiling of the remaining time).
    pub fn display_seconds(&self) -> u32 {
        let t = (self.state.time_remaining - TIME_EPSILON).max(0.0).ceil();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let secs = t as u32;
        secs
    }

    /// Elapsed fraction of the current phase in `[0, 1]`; `0` outside a cycle.
    pub fn phase_progress(&self) -> f64 {
        let Some(pattern) = self.pattern.as_ref() else { return 0.0 };
        if !self.state.phase.is_breathing() {
            return 0.0;
        }
        let full = pattern.duration_of(self.state.phase);
        if full <= 0.0 {
            return 0.0;
        }
        (1.0 - self.state.time_remaining / full).clamp(0.0, 1.0)
    }

    /// Elapsed fraction of the whole session in `[0, 1]`.
    pub fn session_progress(&self) -> f64 {
        match self.state.phase {
            Phase::Complete => return 1.0,
            Phase::Ready => return 0.0,
            _ => {}
        }
        let Some(pattern) = self.pattern.as_ref() else { return 0.0 };
        let total = pattern.session_seconds();
        if total <= 0.0 {
            return 0.0;
        }
        let before: f64 = pattern
            .active_phases()
            .take_while(|&p| p != self.state.phase)
            .map(|p| pattern.duration_of(p))
            .sum();
        let in_phase = (pattern.duration_of(self.state.phase) - self.state.time_remaining).max(0.0);
        let elapsed = f64::from(self.state.cycle_index) * pattern.cycle_seconds() + before + in_phase;
        (elapsed / total).clamp(0.0, 1.0)
    }

    /// `"Cycle n of N"` while a cycle is in progress.
    pub fn cycle_label(&self) -> Option<String> {
        let pattern = self.pattern.as_ref()?;
        self.state.phase.is_breathing().then(|| {
            format!("Cycle {} of {}", self.state.cycle_index + 1, pattern.cycle_count)
        })
    }
}
