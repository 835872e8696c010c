//! Theme voice tables.
//!
//! A theme is a fixed list of [`VoiceSpec`] templates. Each template holds
//! nominal values plus jitter ranges; [`SignalTheme::realize`] draws the
//! jitter once per `start` from the generator's RNG.
//!
//! | theme  | voices (Hz)             | wave     | filter                 | LFO                        |
//! |--------|-------------------------|----------|------------------------|----------------------------|
//! | ocean  | 60 80 120 200 (+0..20)  | sine     | LP 800, Q 0.5          | 0.1..0.3 Hz, freq ±10 Hz   |
//! | forest | 200 .. 2000 (+0..100)   | triangle | BP at nominal, Q 2     | 0.5..2.5 Hz, freq ±10 %    |
//! | sunset | 40 80 160 320           | sawtooth | LP 300..500, Q 0.3     | 0.2..0.5 Hz, gain ±0.03    |
//! | night  | 100 .. 500 (+0..20)     | sine     | LP 400, Q 1            | 0.1..0.2 Hz, gain ±0.02    |

use core::fmt;
use core::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::nodes::Wave;
use crate::voice::{FilterKind, FilterSpec, Modulation, VoiceParams};

/// The fixed set of ambient themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    Ocean,
    Forest,
    #[default]
    Sunset,
    Night,
}

impl ThemeKind {
    pub const ALL: [ThemeKind; 4] = [ThemeKind::Ocean, ThemeKind::Forest, ThemeKind::Sunset, ThemeKind::Night];

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeKind::Ocean => "ocean",
            ThemeKind::Forest => "forest",
            ThemeKind::Sunset => "sunset",
            ThemeKind::Night => "night",
        }
    }

    pub fn theme(self) -> SignalTheme {
        SignalTheme::of(self)
    }
}

impl fmt::Display for ThemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThemeKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::UnknownTheme(s.to_string()))
    }
}

/// Where a voice's filter cutoff comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cutoff {
    /// Fixed cutoff plus `U(0, jitter)`
    Fixed { hz: f32, jitter_hz: f32 },
    /// Centered on the voice's nominal (pre-jitter) frequency
    Nominal,
}

/// How deep the LFO swings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModDepth {
    FrequencyHz(f32),
    /// Fraction of the nominal frequency
    FrequencyRatio(f32),
    /// Absolute gain swing at unit volume; stored relative to base gain
    GainAbs(f32),
}

/// Voice template with jitter ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSpec {
    pub frequency_hz: f32,
    pub frequency_jitter_hz: f32,
    pub wave: Wave,
    pub filter: FilterKind,
    pub cutoff: Cutoff,
    pub q: f32,
    pub base_gain: f32,
    pub lfo_rate_hz: f32,
    pub lfo_rate_jitter_hz: f32,
    pub depth: ModDepth,
}

impl VoiceSpec {
    /// Draw the jitter and produce concrete parameters.
    pub fn realize<R: Rng + ?Sized>(&self, rng: &mut R) -> VoiceParams {
        let frequency_hz = self.frequency_hz + jitter(rng, self.frequency_jitter_hz);
        let cutoff_hz = match self.cutoff {
            Cutoff::Fixed { hz, jitter_hz } => hz + jitter(rng, jitter_hz),
            Cutoff::Nominal => self.frequency_hz,
        };
        let lfo_rate_hz = self.lfo_rate_hz + jitter(rng, self.lfo_rate_jitter_hz);
        let modulation = match self.depth {
            ModDepth::FrequencyHz(d) => Modulation::Frequency { depth_hz: d },
            ModDepth::FrequencyRatio(r) => Modulation::Frequency { depth_hz: self.frequency_hz * r },
            ModDepth::GainAbs(g) => Modulation::Gain {
                depth: if self.base_gain > 0.0 { g / self.base_gain } else { 0.0 },
            },
        };
        VoiceParams {
            frequency_hz,
            wave: self.wave,
            filter: FilterSpec { kind: self.filter, cutoff_hz, q: self.q },
            base_gain: self.base_gain,
            lfo_rate_hz,
            modulation,
        }
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, range: f32) -> f32 {
    if range > 0.0 { rng.gen_range(0.0..range) } else { 0.0 }
}

/// Immutable theme description: a name and its voice templates.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalTheme {
    pub kind: ThemeKind,
    pub voice_specs: Vec<VoiceSpec>,
}

impl SignalTheme {
    pub fn of(kind: ThemeKind) -> Self {
        let voice_specs = match kind {
            ThemeKind::Ocean => [60.0, 80.0, 120.0, 200.0]
                .into_iter()
                .map(|f| VoiceSpec {
                    frequency_hz: f,
                    frequency_jitter_hz: 20.0,
                    wave: Wave::Sine,
                    filter: FilterKind::Lowpass,
                    cutoff: Cutoff::Fixed { hz: 800.0, jitter_hz: 0.0 },
                    q: 0.5,
                    base_gain: 0.1,
                    lfo_rate_hz: 0.1,
                    lfo_rate_jitter_hz: 0.2,
                    depth: ModDepth::FrequencyHz(10.0),
                })
                .collect(),
            ThemeKind::Forest => [200.0, 400.0, 800.0, 1200.0, 2000.0]
                .into_iter()
                .map(|f| VoiceSpec {
                    frequency_hz: f,
                    frequency_jitter_hz: 100.0,
                    wave: Wave::Triangle,
                    filter: FilterKind::Bandpass,
                    cutoff: Cutoff::Nominal,
                    q: 2.0,
                    base_gain: 0.05,
                    lfo_rate_hz: 0.5,
                    lfo_rate_jitter_hz: 2.0,
                    depth: ModDepth::FrequencyRatio(0.1),
                })
                .collect(),
            ThemeKind::Sunset => [40.0, 80.0, 160.0, 320.0]
                .into_iter()
                .map(|f| VoiceSpec {
                    frequency_hz: f,
                    frequency_jitter_hz: 0.0,
                    wave: Wave::Sawtooth,
                    filter: FilterKind::Lowpass,
                    cutoff: Cutoff::Fixed { hz: 300.0, jitter_hz: 200.0 },
                    q: 0.3,
                    base_gain: 0.08,
                    lfo_rate_hz: 0.2,
                    lfo_rate_jitter_hz: 0.3,
                    depth: ModDepth::GainAbs(0.03),
                })
                .collect(),
            ThemeKind::Night => [100.0, 150.0, 220.0, 330.0, 500.0]
                .into_iter()
                .map(|f| VoiceSpec {
                    frequency_hz: f,
                    frequency_jitter_hz: 20.0,
                    wave: Wave::Sine,
                    filter: FilterKind::Lowpass,
                    cutoff: Cutoff::Fixed { hz: 400.0, jitter_hz: 0.0 },
                    q: 1.0,
                    base_gain: 0.06,
                    lfo_rate_hz: 0.1,
                    lfo_rate_jitter_hz: 0.1,
                    depth: ModDepth::GainAbs(0.02),
                })
                .collect(),
        };
        Self { kind, voice_specs }
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn voice_count(&self) -> usize {
        self.voice_specs.len()
    }

    /// Realise every voice template, in table order.
    pub fn realize<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<VoiceParams> {
        self.voice_specs.iter().map(|s| s.realize(rng)).collect()
    }
}
