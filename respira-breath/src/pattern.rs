//! Breathing pattern definition.
//!
//! A pattern is immutable configuration: per-phase durations (seconds) plus
//! the number of cycles in a session. Hold phases with a duration of `0`
//! are skipped entirely, they never produce a zero-length phase entry.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::{BreathError, Result};
use crate::phase::Phase;

/// Phase timings in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDurations {
    pub inhale: f64,
    #[serde(default)]
    pub hold: f64,
    pub exhale: f64,
    #[serde(default)]
    pub hold_after_exhale: f64,
}

impl PhaseDurations {
    pub const fn new(inhale: f64, hold: f64, exhale: f64, hold_after_exhale: f64) -> Self {
        Self { inhale, hold, exhale, hold_after_exhale }
    }

    /// Duration of `phase`; `0` for the ready/complete markers.
    pub fn of(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Inhale => self.inhale,
            Phase::Hold => self.hold,
            Phase::Exhale => self.exhale,
            Phase::HoldAfterExhale => self.hold_after_exhale,
            Phase::Ready | Phase::Complete => 0.0,
        }
    }

    /// Next phase inside the same cycle, or `None` when `phase` closes the cycle.
    pub fn phase_after(&self, phase: Phase) -> Option<Phase> {
        match phase {
            Phase::Inhale if self.hold > 0.0 => Some(Phase::Hold),
            Phase::Inhale | Phase::Hold => Some(Phase::Exhale),
            Phase::Exhale if self.hold_after_exhale > 0.0 => Some(Phase::HoldAfterExhale),
            Phase::Exhale | Phase::HoldAfterExhale => None,
            Phase::Ready | Phase::Complete => None,
        }
    }

    /// Total cycle duration in seconds
    pub fn cycle_seconds(&self) -> f64 {
        self.inhale + self.hold + self.exhale + self.hold_after_exhale
    }
}

/// Named breathing pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreathingPattern {
    /// Catalog key (`"4-7-8"`, `"4-4-4"`, ...)
    pub key: Cow<'static, str>,
    /// Display label
    pub name: Cow<'static, str>,
    #[serde(default)]
    pub description: Cow<'static, str>,
    pub phase_durations: PhaseDurations,
    /// Full inhale→exhale(→holds) repetitions per session
    pub cycle_count: u32,
}

impl BreathingPattern {
    pub fn new(
        key: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
        phase_durations: PhaseDurations,
        cycle_count: u32,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: Cow::Borrowed(""),
            phase_durations,
            cycle_count,
        }
    }

    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = description.into();
        self
    }

    /// Check the invariants a session relies on.
    pub fn validate(&self) -> Result<()> {
        let d = &self.phase_durations;
        let fail = |what: &str| Err(BreathError::InvalidPattern(format!("{}: {what}", self.key)));

        if !(d.inhale > 0.0 && d.inhale.is_finite()) {
            return fail(&format!("inhale must be positive, got {}", d.inhale));
        }
        if !(d.exhale > 0.0 && d.exhale.is_finite()) {
            return fail(&format!("exhale must be positive, got {}", d.exhale));
        }
        if !(d.hold >= 0.0 && d.hold.is_finite()) {
            return fail(&format!("hold must be zero or positive, got {}", d.hold));
        }
        if !(d.hold_after_exhale >= 0.0 && d.hold_after_exhale.is_finite()) {
            return fail(&format!(
                "holdAfterExhale must be zero or positive, got {}",
                d.hold_after_exhale
            ));
        }
        if self.cycle_count == 0 {
            return fail("cycle count must be positive");
        }
        Ok(())
    }

    pub fn duration_of(&self, phase: Phase) -> f64 {
        self.phase_durations.of(phase)
    }

    /// Ordered phases of one cycle, zero-length holds skipped.
    pub fn active_phases(&self) -> impl Iterator<Item = Phase> + '_ {
        std::iter::successors(Some(Phase::Inhale), move |&p| self.phase_durations.phase_after(p))
    }

    pub fn cycle_seconds(&self) -> f64 {
        self.phase_durations.cycle_seconds()
    }

    pub fn session_seconds(&self) -> f64 {
        self.cycle_seconds() * f64::from(self.cycle_count)
    }

    pub fn breaths_per_minute(&self) -> f64 {
        let cycle = self.cycle_seconds();
        if cycle > 0.0 { 60.0 / cycle } else { 0.0 }
    }
}
