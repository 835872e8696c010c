//! respira Engine — ambient signal generator for breathing sessions.
//!
//! Crate layout:
//! - [`graph`]     : `Generator` trait and `Engine<G>` wrapper
//! - [`nodes`]     : oscillators and LFOs
//! - [`voice`]     : `Voice` / `AudioBackend` capability traits
//! - [`themes`]    : the four theme voice tables with per-start jitter
//! - [`synth`]     : sample-level theme voice
//! - [`mixer`]     : shared block mixer and the backend built on it
//! - [`generator`] : `SignalGenerator`, the phase-aware voice owner
//! - `realtime`    : CPAL device/stream glue (feature `realtime`)
//!
//! Control writes (phase changes, volume, LFO steps from
//! `SignalGenerator::advance`) happen on the caller's thread and are
//! fire-and-forget; the audio thread only pulls samples.

pub mod error;
pub mod generator;
pub mod graph;
pub mod mixer;
pub mod nodes;
pub mod synth;
pub mod themes;
pub mod voice;

#[cfg(feature = "realtime")]
pub mod realtime;

pub use error::{EngineError, Result};
pub use generator::{phase_factor, SignalEngineState, SignalGenerator, DEFAULT_VOLUME, PHASE_RAMP_SECS, VOLUME_RAMP_SECS};
pub use graph::{Engine, Generator};
pub use mixer::{Mixer, MixerBackend, MixerHandle, MixerVoice};
pub use nodes::{Lfo, Osc, Wave};
pub use themes::{SignalTheme, ThemeKind};
pub use voice::{AudioBackend, FilterKind, FilterSpec, Modulation, Voice, VoiceId, VoiceParams};
