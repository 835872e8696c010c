//! Oscillator building blocks for theme voices.
//!
//! Zero-allocation components. Frequency is **Hz**; `Osc` steps per sample
//! at the current **sample rate**, `Lfo` steps by elapsed seconds.
//!
//! - `Wave`, `Osc` : naive sine/triangle/sawtooth with stable phase wrap
//! - `Lfo`         : same core as `Osc`, stepped per control tick

use respira_core::dsp::{fast_sin, wrap_phase01, TAU};
use serde::{Deserialize, Serialize};

/// Oscillator waveform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wave {
    Sine,
    Triangle,
    Sawtooth,
}

/// Naive waveforms; aliasing on the saw is part of the sunset texture.
#[inline]
fn osc_sample(phase01: f32, wave: Wave) -> f32 {
    match wave {
        Wave::Sine => fast_sin(TAU * phase01),
        Wave::Triangle => 4.0 * (phase01 - 0.5).abs() - 1.0,
        Wave::Sawtooth => 2.0 * phase01 - 1.0,
    }
}

/// Free-running oscillator.
#[derive(Copy, Clone, Debug)]
pub struct Osc {
    phase: f32, // [0,1)
    freq: f32,  // Hz
    wave: Wave,
}

impl Osc {
    #[inline] pub fn new(freq_hz: f32, wave: Wave) -> Self { Self { phase: 0.0, freq: freq_hz.max(0.0), wave } }
    #[inline] pub fn set_freq(&mut self, hz: f32) { self.freq = hz.max(0.0); }
    #[inline] pub fn freq(&self) -> f32 { self.freq }
    #[inline] pub fn wave(&self) -> Wave { self.wave }

    /// Advance one sample and return the oscillator sample in [-1, 1].
    #[inline]
    pub fn next(&mut self, sr: f32) -> f32 {
        self.phase = wrap_phase01(self.phase + self.freq / sr);
        osc_sample(self.phase, self.wave)
    }

    /// Hard-set phase; wrapped into [0,1).
    #[inline] pub fn set_phase01(&mut self, p: f32) { self.phase = wrap_phase01(p); }
}

/// Low-frequency oscillator.
#[derive(Copy, Clone, Debug)]
pub struct Lfo(Osc);

impl Lfo {
    #[inline] pub fn sine(rate_hz: f32) -> Self { Self(Osc::new(rate_hz, Wave::Sine)) }

    /// Control-rate step: advance by `dt` seconds and return the value in
    /// **[-1,1]**.
    #[inline]
    pub fn advance(&mut self, dt: f32) -> f32 {
        if dt > 0.0 { self.0.next(1.0 / dt) } else { self.value() }
    }

    /// Current value without advancing.
    #[inline] pub fn value(&self) -> f32 { osc_sample(self.0.phase, Wave::Sine) }

    #[inline] pub fn set_rate(&mut self, hz: f32) { self.0.set_freq(hz); }
    #[inline] pub fn rate(&self) -> f32 { self.0.freq() }
}
