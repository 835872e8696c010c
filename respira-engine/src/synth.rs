//! Sample-level theme voice.
//!
//! One voice = oscillator → state-variable filter → linear gain ramp.
//! Frequency and cutoff writes glide so control-rate modulation and
//! `set_filter` never click; the first write of each lands immediately.

use respira_core::envelopes::{GainRamp, SlewLimiter};
use respira_core::filters::{SvfMode, SvfTpt};

use crate::nodes::{Osc, Wave};
use crate::voice::{FilterKind, FilterSpec, VoiceId};

/// Cutoff glide time for `set_filter`.
const CUTOFF_SLEW_MS: f32 = 20.0;
/// Pitch glide between control-rate frequency writes.
const FREQ_SLEW_MS: f32 = 60.0;

/// Cutoff used until the first `set_filter`.
const UNSET_CUTOFF_HZ: f32 = 1_000.0;

/// A slewed control value whose first write lands immediately.
#[derive(Copy, Clone, Debug)]
struct Glide {
    target: f32,
    slew: SlewLimiter,
    time_ms: f32,
    primed: bool,
}

impl Glide {
    fn new(initial: f32, time_ms: f32, sr: f32) -> Self {
        let mut slew = SlewLimiter::new(time_ms, sr);
        slew.reset(initial);
        Self { target: initial, slew, time_ms, primed: false }
    }

    fn set(&mut self, target: f32) {
        self.target = target;
        if !self.primed {
            self.primed = true;
            self.slew.reset(target);
        }
    }

    #[inline]
    fn settled(&self) -> bool {
        #[allow(clippy::float_cmp)]
        let same = self.slew.value() == self.target;
        same
    }

    #[inline]
    fn step(&mut self) -> f32 {
        self.slew.process_settling(self.target)
    }

    fn set_sample_rate(&mut self, sr: f32) {
        self.slew.set_time_ms(self.time_ms, sr);
    }
}

#[derive(Copy, Clone, Debug)]
pub struct SynthVoice {
    id: VoiceId,
    sr: f32,
    // source
    osc: Osc,
    freq: Glide,
    // tone
    filter: SvfTpt,
    mode: SvfMode,
    band_norm: f32,
    cutoff: Glide,
    // output
    gain: GainRamp,
}

impl SynthVoice {
    /// A silent, untuned voice.
    pub fn new(id: VoiceId, wave: Wave, sr: f32) -> Self {
        let sr = sr.max(1.0);
        Self {
            id,
            sr,
            osc: Osc::new(0.0, wave),
            freq: Glide::new(0.0, FREQ_SLEW_MS, sr),
            filter: SvfTpt::new(UNSET_CUTOFF_HZ, core::f32::consts::FRAC_1_SQRT_2, sr),
            mode: SvfMode::Lowpass,
            band_norm: 1.0,
            cutoff: Glide::new(UNSET_CUTOFF_HZ, CUTOFF_SLEW_MS, sr),
            gain: GainRamp::new(0.0, sr),
        }
    }

    #[inline] pub fn id(&self) -> VoiceId { self.id }
    #[inline] pub fn wave(&self) -> Wave { self.osc.wave() }
    #[inline] pub fn frequency(&self) -> f32 { self.freq.target }
    /// Frequency the oscillator is running at right now.
    #[inline] pub fn sounding_frequency(&self) -> f32 { self.osc.freq() }
    #[inline] pub fn cutoff_hz(&self) -> f32 { self.cutoff.target }
    /// Cutoff the filter is set to right now.
    #[inline] pub fn sounding_cutoff_hz(&self) -> f32 { self.filter.cutoff_hz() }
    #[inline] pub fn gain(&self) -> f32 { self.gain.value() }
    #[inline] pub fn gain_target(&self) -> f32 { self.gain.target() }

    pub fn set_frequency(&mut self, hz: f32) {
        self.freq.set(hz.max(0.0));
        self.osc.set_freq(self.freq.slew.value());
    }

    #[inline]
    pub fn set_gain(&mut self, target: f32, ramp_secs: f32) {
        self.gain.ramp_to(target.max(0.0), ramp_secs);
    }

    pub fn set_filter(&mut self, spec: FilterSpec) {
        self.mode = spec.kind.svf_mode();
        self.band_norm = band_norm(spec);
        self.filter.set_q(spec.q);
        self.cutoff.set(spec.cutoff_hz.max(0.0));
        self.filter.set_cutoff_hz(self.cutoff.slew.value());
    }

    pub fn set_sample_rate(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.filter.set_sample_rate(self.sr);
        self.freq.set_sample_rate(self.sr);
        self.cutoff.set_sample_rate(self.sr);
        self.gain.set_sample_rate(self.sr);
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        if !self.freq.settled() {
            self.osc.set_freq(self.freq.step());
        }
        if !self.cutoff.settled() {
            self.filter.set_cutoff_hz(self.cutoff.step());
        }

        let x = self.osc.next(self.sr);
        let y = self.filter.process(x, self.mode) * self.band_norm;
        y * self.gain.next()
    }
}

/// Bandpass tap peaks at `Q`; scale it back to unity.
#[inline]
fn band_norm(spec: FilterSpec) -> f32 {
    match spec.kind {
        FilterKind::Bandpass => 1.0 / spec.q.max(1e-4),
        FilterKind::Lowpass => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const LOWPASS_2K: FilterSpec = FilterSpec { kind: FilterKind::Lowpass, cutoff_hz: 2_000.0, q: 0.7 };

    fn voice(wave: Wave, gain: f32, sr: f32) -> SynthVoice {
        let mut v = SynthVoice::new(VoiceId(1), wave, sr);
        v.set_frequency(220.0);
        v.set_filter(LOWPASS_2K);
        v.set_gain(gain, 0.0);
        v
    }

    fn peak(v: &mut SynthVoice, n: usize) -> f32 {
        (0..n).map(|_| v.next().abs()).fold(0.0, f32::max)
    }

    #[test]
    fn first_writes_land_immediately() {
        let v = voice(Wave::Sine, 0.1, 48_000.0);
        assert_eq!(v.sounding_frequency(), 220.0);
        assert_eq!(v.sounding_cutoff_hz(), 2_000.0);
    }

    #[test]
    fn silent_until_gain_is_raised() {
        let mut v = SynthVoice::new(VoiceId(1), Wave::Sawtooth, 48_000.0);
        v.set_frequency(110.0);
        assert_eq!(peak(&mut v, 1_000), 0.0);
    }

    #[test]
    fn gain_ramp_lands_on_target() {
        let mut v = voice(Wave::Sine, 0.1, 48_000.0);
        v.set_gain(0.05, 0.3);
        for _ in 0..14_400 {
            v.next();
        }
        assert_abs_diff_eq!(v.gain(), 0.05);
        // a second write mid-ramp redirects it
        v.set_gain(0.08, 0.1);
        v.next();
        assert!(v.gain() > 0.05 && v.gain() < 0.08);
        assert_abs_diff_eq!(v.gain_target(), 0.08);
    }

    #[test]
    fn output_scales_with_gain() {
        let sr = 48_000.0;
        let mut loud = voice(Wave::Sine, 0.2, sr);
        let mut quiet = voice(Wave::Sine, 0.1, sr);
        let a = peak(&mut loud, 4_800);
        let b = peak(&mut quiet, 4_800);
        assert!(a > 0.0);
        assert_abs_diff_eq!(a / b, 2.0, epsilon = 1e-3);
    }

    #[test]
    fn filter_change_glides_to_new_cutoff() {
        let mut v = voice(Wave::Sine, 0.1, 48_000.0);
        v.set_filter(FilterSpec { kind: FilterKind::Bandpass, cutoff_hz: 500.0, q: 2.0 });
        assert_eq!(v.cutoff_hz(), 500.0);
        v.next();
        assert!(v.sounding_cutoff_hz() < 2_000.0 && v.sounding_cutoff_hz() > 500.0);
        for _ in 0..48_000 {
            v.next();
        }
        assert_eq!(v.sounding_cutoff_hz(), 500.0);
    }

    #[test]
    fn upward_cutoff_change_lands_too() {
        let mut v = voice(Wave::Triangle, 0.05, 48_000.0);
        v.set_filter(FilterSpec { kind: FilterKind::Lowpass, cutoff_hz: 3_000.0, q: 0.7 });
        for _ in 0..5 * 48_000 {
            v.next();
        }
        assert_eq!(v.sounding_cutoff_hz(), 3_000.0);
    }

    #[test]
    fn retune_glides_then_settles() {
        let mut v = voice(Wave::Sine, 0.1, 48_000.0);
        v.set_frequency(230.0);
        v.next();
        let mid = v.sounding_frequency();
        assert!(mid > 220.0 && mid < 230.0);
        for _ in 0..48_000 {
            v.next();
        }
        assert_eq!(v.sounding_frequency(), 230.0);
    }
}
