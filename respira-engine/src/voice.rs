//! Voice capability interface.
//!
//! The generator tunes, filters and modulates voices only through [`Voice`]
//! and acquires them through an [`AudioBackend`], so the same control logic
//! runs against the realtime mixer, the C ABI, or a recording fake in tests.

use core::fmt;

use respira_core::filters::SvfMode;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::nodes::Wave;

/// Stable identity of a spawned voice. Never reused within one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Lowpass,
    Bandpass,
}

impl FilterKind {
    pub fn svf_mode(self) -> SvfMode {
        match self {
            FilterKind::Lowpass => SvfMode::Lowpass,
            FilterKind::Bandpass => SvfMode::Bandpass,
        }
    }
}

/// Frequency-shaping filter settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub cutoff_hz: f32,
    pub q: f32,
}

/// What the voice's LFO drives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Modulation {
    /// Oscillator frequency swings by `± depth_hz`.
    Frequency { depth_hz: f32 },
    /// Voice gain swings by `± depth` as a fraction of the current gain.
    Gain { depth: f32 },
}

/// Fully realised parameters of one voice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    pub frequency_hz: f32,
    pub wave: Wave,
    pub filter: FilterSpec,
    /// Gain at unit volume and unit phase factor
    pub base_gain: f32,
    pub lfo_rate_hz: f32,
    pub modulation: Modulation,
}

/// One continuously sounding voice: oscillator, filter, gain.
///
/// All setters are fire-and-forget control writes; the latest one wins.
/// Modulation is the caller's job: it writes frequency or gain at control
/// rate and the voice glides between writes.
pub trait Voice {
    fn id(&self) -> VoiceId;

    /// Retune the oscillator. The first write lands immediately; later
    /// ones glide.
    fn set_frequency(&mut self, hz: f32);

    /// Move the output gain to `target`, linearly over `ramp_secs`
    /// (`0` steps immediately). A ramp in flight is redirected.
    fn set_gain(&mut self, target: f32, ramp_secs: f32);

    /// Same landing rule as `set_frequency`, applied to the cutoff.
    fn set_filter(&mut self, filter: FilterSpec);
}

/// Where voices come from.
pub trait AudioBackend {
    type Voice: Voice;

    /// Make sure an output is available before any voice is spawned.
    fn open(&mut self) -> Result<()>;

    /// Start a silent `wave` voice. The caller tunes and filters it, then
    /// raises its gain.
    fn spawn_voice(&mut self, wave: Wave) -> Result<Self::Voice>;

    /// Silence and drop a voice immediately.
    fn release_voice(&mut self, voice: Self::Voice);
}
