//! Filters: a one-pole high-pass / DC blocker and a TPT state-variable filter.
//!
//! Goals
//! - `no_std`-friendly, allocation free
//! - Stable under per-sample parameter modulation
//! - Clear APIs and predictable parameterization
//!
//! Contents
//! - `OnePoleHP`  : “RC-style” one-pole high-pass
//! - `DcBlock`    : convenience wrapper specialized for DC removal
//! - `SvfMode`    : LP/HP/BP/Notch taps for the SVF
//! - `SvfTpt`     : State-Variable Filter via Topology Preserving Transform
//!
//! Notes
//! - `SvfTpt` uses the “g = tan(π fc / sr)” formulation with `R = 1/(2Q)`.
//!   Voices retune it every sample while their cutoff slews, so `recalc` stays cheap.

use crate::dsp::{kill_denormals, one_pole_coeff_hz, tpt_g};

/// One-pole high-pass using the standard “leaky integrator” form:
///
/// Difference equation:
/// `y[n] = x[n] - x[n-1] + b * y[n-1]`, with `b = exp(-2π fc / sr)`.
#[derive(Copy, Clone, Debug)]
pub struct OnePoleHP {
    b: f32,
    x1: f32,
    y1: f32,
    sr: f32,
    fc: f32,
}

impl OnePoleHP {
    #[inline]
    pub fn new(cut_hz: f32, sr: f32) -> Self {
        let mut s = Self {
            b: 0.0,
            x1: 0.0,
            y1: 0.0,
            sr: sr.max(1.0),
            fc: cut_hz.max(0.0),
        };
        s.update_coeffs();
        s
    }

    #[inline] pub fn set_sample_rate(&mut self, sr: f32) { self.sr = sr.max(1.0); self.update_coeffs(); }
    #[inline] pub fn set_cutoff_hz(&mut self, cut_hz: f32) { self.fc = cut_hz.max(0.0); self.update_coeffs(); }

    #[inline]
    fn update_coeffs(&mut self) {
        self.b = one_pole_coeff_hz(self.fc, self.sr);
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = x - self.x1 + self.b * self.y1;
        self.x1 = x;
        self.y1 = kill_denormals(y);
        self.y1
    }

    #[inline] pub fn value(&self) -> f32 { self.y1 }
}

/// Convenience DC blocker: a high-pass with a very low cutoff (e.g., 5–30 Hz).
#[derive(Copy, Clone, Debug)]
pub struct DcBlock {
    hp: OnePoleHP,
}

impl DcBlock {
    /// `cut_hz` default recommendation: 20 Hz. The sunset theme's 40 Hz
    /// fundamental sits close to that, so the mixer uses 10 Hz.
    #[inline]
    pub fn new(cut_hz: f32, sr: f32) -> Self {
        Self { hp: OnePoleHP::new(cut_hz, sr) }
    }

    #[inline] pub fn set_sample_rate(&mut self, sr: f32) { self.hp.set_sample_rate(sr); }
    #[inline] pub fn process(&mut self, x: f32) -> f32 { self.hp.process(x) }
}

/// SVF output tap selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SvfMode {
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
}

/// Topology-Preserving Transform SVF (State-Variable Filter).
///
/// Parameters:
/// - `cut_hz`  : cutoff / center frequency in Hz
/// - `q`       : quality factor (>= ~0.3 typical; lower increases damping)
///
/// Internals:
/// - `g = tan(π fc / sr)`
/// - `R = 1 / (2Q)`
#[derive(Copy, Clone, Debug)]
pub struct SvfTpt {
    sr: f32,
    cut: f32,
    q: f32,
    // derived
    g: f32,
    r: f32,
    // states
    ic1eq: f32,
    ic2eq: f32,
}

impl SvfTpt {
    #[inline]
    pub fn new(cut_hz: f32, q: f32, sr: f32) -> Self {
        let mut s = Self {
            sr: sr.max(1.0),
            cut: cut_hz.max(0.0),
            q: q.max(1e-4),
            g: 0.0,
            r: 0.0,
            ic1eq: 0.0,
            ic2eq: 0.0,
        };
        s.recalc();
        s
    }

    #[inline] pub fn set_sample_rate(&mut self, sr: f32) { self.sr = sr.max(1.0); self.recalc(); }
    #[inline] pub fn set_cutoff_hz(&mut self, cut_hz: f32) { self.cut = cut_hz.max(0.0); self.recalc(); }
    #[inline] pub fn set_q(&mut self, q: f32) { self.q = q.max(1e-4); self.recalc(); }
    #[inline] pub fn cutoff_hz(&self) -> f32 { self.cut }
    #[inline] pub fn q(&self) -> f32 { self.q }

    /// Clear the integrator state (e.g., when a voice is re-used).
    #[inline]
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    #[inline]
    fn recalc(&mut self) {
        self.g = tpt_g(self.cut, self.sr);       // tan(π fc / sr)
        self.r = 1.0 / (2.0 * self.q);           // damping
    }

    /// Process one sample and return all four taps `(lp, bp, hp, notch)`.
    #[inline]
    pub fn process_all(&mut self, x: f32) -> (f32, f32, f32, f32) {
        // Zavalishin's TPT SVF, solved for the zero-delay feedback loop.
        let g = self.g;
        let h = 1.0 / (1.0 + 2.0 * self.r * g + g * g);
        let hp = (x - (2.0 * self.r + g) * self.ic1eq - self.ic2eq) * h;
        let v1 = g * hp;
        let bp = v1 + self.ic1eq;
        self.ic1eq = kill_denormals(bp + v1);
        let v2 = g * bp;
        let lp = v2 + self.ic2eq;
        self.ic2eq = kill_denormals(lp + v2);

        (lp, bp, hp, hp + lp)
    }

    /// Process one sample, returning only the mode requested.
    #[inline]
    pub fn process(&mut self, x: f32, mode: SvfMode) -> f32 {
        let (lp, bp, hp, n) = self.process_all(x);
        match mode {
            SvfMode::Lowpass => lp,
            SvfMode::Highpass => hp,
            SvfMode::Bandpass => bp,
            SvfMode::Notch => n,
        }
    }
}

// ------------------------------------ Tests --------------------------------------
