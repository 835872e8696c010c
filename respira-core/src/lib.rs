#![cfg_attr(not(feature = "std"), no_std)]
//! respira Core — no_std-ready DSP primitives with optional fast-math and SIMD hooks.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm`/`micromath` math backends
//! - `fast-math`: enable approximations (polys/rationals) for sine/tanh
//! - `simd`     : vectorised block mixing via `wide`
//!
//! Modules
//! - [`dsp`]       : math backend, utils (clamp, phase wrap, fast trig, meters, mixing)
//! - [`envelopes`] : linear gain ramp, slew limiter
//! - [`filters`]   : one-pole HP/DC blocker, TPT SVF
//!
//! Design
//! - No heap allocations; pure sample-by-sample primitives
//! - Control-rate writers set targets, the audio thread pulls samples
//! - Friendly to embedded / real-time targets

pub mod dsp;
pub mod envelopes;
pub mod filters;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{
        clamp, fast_sin, kill_denormals, lerp, mix_in_place, one_pole_coeff_ms, soft_clip,
        tpt_g, wrap_phase01, Rms, TAU,
    };
    pub use crate::envelopes::{GainRamp, SlewLimiter};
    pub use crate::filters::{DcBlock, OnePoleHP, SvfMode, SvfTpt};
}
