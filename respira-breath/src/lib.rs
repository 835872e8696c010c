//! respira Breath — breathing pattern catalog and session phase machine.
//!
//! Crate layout:
//! - [`phase`]   : `Phase` enum plus guidance text and visual hints
//! - [`pattern`] : `BreathingPattern`, `PhaseDurations`, the phase transition table
//! - [`catalog`] : built-in patterns and a catalog for user-supplied ones
//! - [`session`] : `SessionController`, the tick-driven state machine
//!
//! The controller has no clock of its own. A host calls `tick(dt)` at
//! whatever cadence it likes (the CLI uses 100 ms) and hooks a
//! [`PhaseObserver`] in to hear about phase entries; the ambient signal
//! generator in `respira-engine` is one such observer.

pub mod catalog;
pub mod error;
pub mod pattern;
pub mod phase;
pub mod session;

pub use catalog::{PatternCatalog, DEFAULT_PATTERN};
pub use error::{BreathError, Result};
pub use pattern::{BreathingPattern, PhaseDurations};
pub use phase::Phase;
pub use session::{
    PhaseObserver, SessionController, SessionState, StartOutcome, TimingMode, TIME_EPSILON,
};
