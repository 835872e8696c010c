//! Gain ramps and parameter slewing primitives.
//!
//! Provided:
//! - `GainRamp`    : linear ramp that lands exactly on its target after a fixed time
//! - `SlewLimiter` : one-pole slew/smoother for arbitrary control signals,
//!                   with a settling variant that reaches its target exactly
//!
//! Both are `no_std` friendly and avoid heap allocations. Control-rate code
//! writes targets; the audio thread pulls one value per sample with `next()`.

use crate::dsp::one_pole_coeff_ms;

// --------------------------------- Linear ramp -----------------------------------

/// Linear, retargetable gain ramp.
///
/// `ramp_to(target, secs)` starts from the *current* value, so a second call
/// issued mid-ramp simply redirects it: the latest target always wins.
#[derive(Copy, Clone, Debug)]
pub struct GainRamp {
    sr: f32,
    value: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl GainRamp {
    #[inline]
    pub fn new(initial: f32, sr: f32) -> Self {
        Self { sr: sr.max(1.0), value: initial, target: initial, step: 0.0, remaining: 0 }
    }

    #[inline]
    pub fn set_sample_rate(&mut self, sr: f32) {
        // Keep the ramp's remaining wall-clock time roughly intact.
        let new_sr = sr.max(1.0);
        if self.remaining > 0 {
            let secs_left = self.remaining as f32 / self.sr;
            self.sr = new_sr;
            self.ramp_to(self.target, secs_left);
        } else {
            self.sr = new_sr;
        }
    }

    /// Jump immediately to `value`, cancelling any ramp in flight.
    #[inline]
    pub fn jump(&mut self, value: f32) {
        self.value = value;
        self.target = value;
        self.step = 0.0;
        self.remaining = 0;
    }

    /// Ramp from the current value to `target` over `secs` seconds.
    #[inline]
    pub fn ramp_to(&mut self, target: f32, secs: f32) {
        let samples = secs * self.sr;
        if !(samples >= 1.0) {
            self.jump(target);
            return;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = samples.round() as u32;
        self.target = target;
        self.remaining = n;
        self.step = (target - self.value) / n as f32;
    }

    /// Advance by one sample and return the gain to apply.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.value = self.target;
            } else {
                self.value += self.step;
            }
        }
        self.value
    }

    #[inline] pub fn value(&self) -> f32 { self.value }
    #[inline] pub fn target(&self) -> f32 { self.target }
    #[inline] pub fn is_ramping(&self) -> bool { self.remaining > 0 }
}

// -------------------------------- Slew Limiter -----------------------------------

/// One-pole slew/smoother: `y += (x - y) * (1 - a)`
///
/// `a = one_pole_coeff_ms(t_ms, sr)`; `t_ms <= 0` passes input straight through.
#[derive(Copy, Clone, Debug)]
pub struct SlewLimiter {
    alpha: f32,
    y:     f32,
}

impl SlewLimiter {
    #[inline]
    pub fn new(t_ms: f32, sr: f32) -> Self {
        Self { alpha: one_pole_coeff_ms(t_ms, sr), y: 0.0 }
    }

    #[inline]
    pub fn set_time_ms(&mut self, t_ms: f32, sr: f32) {
        self.alpha = one_pole_coeff_ms(t_ms, sr);
    }

    #[inline]
    pub fn reset(&mut self, y0: f32) { self.y = y0; }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.y += (x - self.y) * (1.0 - self.alpha);
        self.y
    }

    /// `process` that lands exactly on `x`: once within `1e-4 * |x| + 1e-3`,
    /// or as soon as an f32 step no longer moves the output.
    #[inline]
    pub fn process_settling(&mut self, x: f32) -> f32 {
        let y = self.y + (x - self.y) * (1.0 - self.alpha);
        #[allow(clippy::float_cmp)]
        let stalled = y == self.y;
        self.y = if stalled || (x - y).abs() <= x.abs() * 1e-4 + 1e-3 { x } else { y };
        self.y
    }

    #[inline]
    pub fn value(&self) -> f32 { self.y }
}

// ------------------------------------ Tests --------------------------------------
