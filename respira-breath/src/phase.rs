//! Breathing phases and the per-phase presentation hints.

use core::fmt;

use serde::{Deserialize, Serialize};

/// One segment of a breathing cycle, or the initial/terminal marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Ready,
    Inhale,
    Hold,
    Exhale,
    HoldAfterExhale,
    Complete,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Ready,
        Phase::Inhale,
        Phase::Hold,
        Phase::Exhale,
        Phase::HoldAfterExhale,
        Phase::Complete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Ready => "ready",
            Phase::Inhale => "inhale",
            Phase::Hold => "hold",
            Phase::Exhale => "exhale",
            Phase::HoldAfterExhale => "holdAfterExhale",
            Phase::Complete => "complete",
        }
    }

    /// True for the four phases that make up a cycle.
    pub fn is_breathing(self) -> bool {
        !matches!(self, Phase::Ready | Phase::Complete)
    }

    pub fn is_hold(self) -> bool {
        matches!(self, Phase::Hold | Phase::HoldAfterExhale)
    }

    /// Guidance line shown to the user while in this phase.
    pub fn instruction(self) -> &'static str {
        match self {
            Phase::Ready => "Tap start when you're ready to begin",
            Phase::Inhale => "Breathe in slowly and deeply",
            Phase::Hold => "Hold your breath gently",
            Phase::Exhale => "Breathe out slowly and completely",
            Phase::HoldAfterExhale => "Rest and hold empty",
            Phase::Complete => "Session complete! Well done.",
        }
    }

    /// Breathing-circle scale factor.
    pub fn visual_scale(self) -> f32 {
        match self {
            Phase::Inhale => 1.5,
            Phase::Exhale => 1.25,
            _ => 1.0,
        }
    }

    /// Breathing-circle opacity; holds dim slightly.
    pub fn visual_opacity(self) -> f32 {
        if self.is_hold() { 0.8 } else { 1.0 }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
