//! Generic DSP utilities and math helpers.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Optional `fast-math` approximations for hot paths
//! - Clean, side-effect free helpers that are easy to test
//!
//! Features used by this file:
//! - `fast-math` : enables polynomial/rational approximations (faster, approx.)
//! - `simd`      : vectorised [`mix_in_place`] via `wide::f32x8`
//!
//! Conventions:
//! - All functions are `#[inline]` where useful to help the optimizer.
//! - Argument and return domains are documented per function.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested (works in no_std)
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] fn m_cos(x: f32) -> f32 { x.cos() }
        #[inline] fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] fn m_tanh(x: f32) -> f32 { let e = (2.0 * x).exp(); (e - 1.0) / (e + 1.0) }
        #[inline] fn m_tan(x: f32) -> f32 { (x.sin()) / (x.cos()) }
        #[inline] fn m_sqrt(x: f32) -> f32 { x.sqrt() }
        #[inline] fn m_floor(x: f32) -> f32 { x.floor() }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] fn m_sin(x: f32) -> f32 { libm::sinf(x) }
        #[inline] fn m_cos(x: f32) -> f32 { libm::cosf(x) }
        #[inline] fn m_exp(x: f32) -> f32 { libm::expf(x) }
        #[inline] fn m_tanh(x: f32) -> f32 { libm::tanhf(x) }
        #[inline] fn m_tan(x: f32) -> f32 { libm::tanf(x) }
        #[inline] fn m_sqrt(x: f32) -> f32 { libm::sqrtf(x) }
        #[inline] fn m_floor(x: f32) -> f32 { libm::floorf(x) }
    // std backend
    } else {
        #[inline] fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] fn m_cos(x: f32) -> f32 { x.cos() }
        #[inline] fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] fn m_tanh(x: f32) -> f32 { x.tanh() }
        #[inline] fn m_tan(x: f32) -> f32 { x.tan() }
        #[inline] fn m_sqrt(x: f32) -> f32 { x.sqrt() }
        #[inline] fn m_floor(x: f32) -> f32 { x.floor() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π (commonly useful)
pub const TAU: f32 = 2.0 * PI;

/// A very small epsilon used in denormal handling and safe divisions.
pub const EPS_SMALL: f32 = 1.0e-20;

// --------------------------------- Utilities -------------------------------------

/// Clamp `x` into `[lo, hi]`. NaN passes through unchanged.
#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo { lo } else if x > hi { hi } else { x }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Absolute value without relying on `std` float methods.
#[inline]
pub fn abs(x: f32) -> f32 {
    if x < 0.0 { -x } else { x }
}

/// Wrap phase into [0, 1).
#[inline]
pub fn wrap_phase01(p: f32) -> f32 {
    let w = p - m_floor(p);
    if w >= 1.0 { 0.0 } else { w }
}

/// Kill denormal/subnormal values. Returns 0.0 if |x| < EPS_SMALL.
#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if abs(x) < EPS_SMALL { 0.0 } else { x }
}

// --------------------------------- Trig ------------------------------------------

/// Sine used by the oscillators.
///
/// With `fast-math`: range reduction into [-π, π] and a 5th-order odd polynomial,
/// max abs error ~1e-3 (fine for drones and LFOs). Exact backend otherwise.
#[inline]
pub fn fast_sin(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let k = m_floor(x / TAU + 0.5);
            let xr = x - k * TAU;
            let x2 = xr * xr;
            xr * (0.999_979_313_3 + x2 * (-0.166_624_432_0 + x2 * 0.008_308_978_98))
        } else {
            m_sin(x)
        }
    }
}

#[inline]
pub fn fast_cos(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            // cos(x) = sin(x + π/2)
            fast_sin(x + PI * 0.5)
        } else {
            m_cos(x)
        }
    }
}

// --------------------------------- Nonlinearities --------------------------------

/// Soft clip via tanh. If `fast-math` is enabled, uses a stable rational approximation.
///
/// Approximation used when `fast-math`:
/// `tanh(x) ≈ x * (27 + x^2) / (27 + 9 x^2)`
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let x = clamp(x, -3.0, 3.0);
            let x2 = x * x;
            x * (27.0 + x2) / (27.0 + 9.0 * x2)
        } else {
            m_tanh(x)
        }
    }
}

// --------------------------------- Exponentials / smoothing ----------------------

/// One-pole smoothing coefficient for a time constant `t_ms` (milliseconds).
///
/// The discrete one-pole form: `y[n] += (1 - a) * (x[n] - y[n])`
/// where `a = exp(-1/(tau * sr))`. `t_ms` is the time to reach ~63%.
#[inline]
pub fn one_pole_coeff_ms(t_ms: f32, sr: f32) -> f32 {
    if t_ms <= 0.0 { return 0.0; }
    let tau = t_ms * 0.001;
    m_exp(-1.0 / (tau * sr))
}

/// Convert cutoff in Hz to a one-pole coefficient `exp(-2π fc / sr)`.
#[inline]
pub fn one_pole_coeff_hz(cut_hz: f32, sr: f32) -> f32 {
    let fc = clamp(cut_hz, 0.0, 0.499 * sr);
    m_exp(-2.0 * PI * fc / sr)
}

/// TPT `g = tan(π fc / sr)` helper for state-variable filters.
///
/// Cutoff is kept below Nyquist so modulated filters never blow up.
#[inline]
pub fn tpt_g(cut_hz: f32, sr: f32) -> f32 {
    let fc = clamp(cut_hz, 1.0, 0.49 * sr);
    let x = PI * (fc / sr);
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            fast_sin(x) / fast_cos(x)
        } else {
            m_tan(x)
        }
    }
}

// --------------------------------- Meters ----------------------------------------

/// Running RMS meter (windowed via exponential smoothing). Call once per sample.
///
/// `alpha` is the smoothing factor in [0,1]; a good choice is `one_pole_coeff_ms(300, sr)`.
#[derive(Copy, Clone, Debug)]
pub struct Rms {
    alpha: f32,
    state: f32,
}

impl Rms {
    #[inline]
    pub fn new(alpha: f32) -> Self { Self { alpha: clamp(alpha, 0.0, 1.0), state: 0.0 } }

    #[inline]
    pub fn reset(&mut self) { self.state = 0.0; }

    #[inline]
    pub fn tick(&mut self, x: f32) -> f32 {
        self.state += (1.0 - self.alpha) * (x * x - self.state);
        m_sqrt(self.state)
    }

    #[inline]
    pub fn value(&self) -> f32 { m_sqrt(self.state) }
}

// --------------------------------- Block mixing ----------------------------------

/// In-place mix: `dst[i] += src[i] * gain`.
///
/// Lengths must match; mismatched or empty slices are left untouched.
#[inline]
pub fn mix_in_place(dst: &mut [f32], src: &[f32], gain: f32) {
    if dst.len() != src.len() || dst.is_empty() {
        return;
    }
    cfg_if! {
        if #[cfg(feature = "simd")] {
            use wide::f32x8;
            let g = f32x8::splat(gain);
            let mut d_chunks = dst.chunks_exact_mut(8);
            let mut s_chunks = src.chunks_exact(8);
            for (d, s) in (&mut d_chunks).zip(&mut s_chunks) {
                let mut dv = [0.0f32; 8];
                let mut sv = [0.0f32; 8];
                dv.copy_from_slice(d);
                sv.copy_from_slice(s);
                let out = f32x8::from(dv) + f32x8::from(sv) * g;
                d.copy_from_slice(&out.to_array());
            }
            for (d, s) in d_chunks.into_remainder().iter_mut().zip(s_chunks.remainder()) {
                *d += *s * gain;
            }
        } else {
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d += *s * gain;
            }
        }
    }
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn clamp_respects_both_bounds() {
        assert_eq!(clamp(2.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-2.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.25, 0.0, 1.0), 0.25);
    }

    #[test]
    fn wrap_phase_stays_in_unit_interval() {
        for p in [-2.25, -0.5, 0.0, 0.999, 1.0, 3.75] {
            let w = wrap_phase01(p);
            assert!((0.0..1.0).contains(&w), "p={p} w={w}");
        }
        assert_abs_diff_eq!(wrap_phase01(3.75), 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(wrap_phase01(-0.25), 0.75, epsilon = 1e-6);
    }

    #[test]
    fn soft_clip_is_bounded() {
        for x in [-10.0, -2.0, -1.0, 0.0, 1.0, 2.0, 10.0] {
            let y = soft_clip(x);
            assert!(y <= 1.0 + 1e-4 && y >= -1.0 - 1e-4, "x={} y={}", x, y);
        }
    }

    #[test]
    fn tpt_g_is_finite_above_nyquist() {
        let g = tpt_g(40_000.0, 48_000.0);
        assert!(g.is_finite() && g > 0.0);
    }

    #[test]
    fn rms_of_full_scale_square_is_one() {
        let mut rms = Rms::new(one_pole_coeff_ms(10.0, 48_000.0));
        let mut v = 0.0;
        for i in 0..48_000 {
            v = rms.tick(if i % 2 == 0 { 1.0 } else { -1.0 });
        }
        assert_abs_diff_eq!(v, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn mix_in_place_handles_ragged_tail() {
        let mut dst = [1.0f32; 11];
        let src = [2.0f32; 11];
        mix_in_place(&mut dst, &src, 0.5);
        assert!(dst.iter().all(|&d| (d - 2.0).abs() < 1e-6));

        let mut short = [0.0f32; 3];
        mix_in_place(&mut short, &src, 1.0);
        assert_eq!(short, [0.0; 3]);
    }
}
