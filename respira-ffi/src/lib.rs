//! C ABI over a breathing session and its ambient signal generator.
//!
//! A host UI owns one `RespiraSession`: it drives the session clock and the
//! voice LFOs with `respira_session_tick`, reads phase/countdown for display, and pulls
//! rendered audio with `respira_render_interleaved_f32` from its own audio
//! callback.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `RespiraSession` (heap-allocated; you own/delete it).
//! - Status codes: `>= 0` success, negative `RESPIRA_ERR_*` on failure.
//! - Render path produces **mono** internally and duplicates to N channels.
//!
//! Threading
//! - The object is NOT thread-safe; serialize all calls on one thread, or
//!   guard the handle with a lock shared by the UI and audio threads.

use std::ffi::{c_char, CStr};

use respira_breath::{catalog, BreathError, Phase, SessionController, StartOutcome};
use respira_engine::{
    Engine, EngineError, MixerBackend, MixerHandle, SignalGenerator, ThemeKind,
};

pub const RESPIRA_OK: i32 = 0;
/// `start` continued a paused session instead of restarting.
pub const RESPIRA_RESUMED: i32 = 1;
pub const RESPIRA_ERR_NULL: i32 = -1;
pub const RESPIRA_ERR_UTF8: i32 = -2;
pub const RESPIRA_ERR_UNKNOWN_PATTERN: i32 = -3;
pub const RESPIRA_ERR_INVALID_PATTERN: i32 = -4;
pub const RESPIRA_ERR_INVALID_VOLUME: i32 = -5;
pub const RESPIRA_ERR_UNKNOWN_THEME: i32 = -6;
pub const RESPIRA_ERR_AUDIO_UNAVAILABLE: i32 = -7;

/// Phase codes returned by `respira_session_phase`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespiraPhase {
    Ready = 0,
    Inhale = 1,
    Hold = 2,
    Exhale = 3,
    HoldAfterExhale = 4,
    Complete = 5,
}

impl From<Phase> for RespiraPhase {
    fn from(p: Phase) -> Self {
        match p {
            Phase::Ready => RespiraPhase::Ready,
            Phase::Inhale => RespiraPhase::Inhale,
            Phase::Hold => RespiraPhase::Hold,
            Phase::Exhale => RespiraPhase::Exhale,
            Phase::HoldAfterExhale => RespiraPhase::HoldAfterExhale,
            Phase::Complete => RespiraPhase::Complete,
        }
    }
}

fn breath_code(e: &BreathError) -> i32 {
    match e {
        BreathError::UnknownPattern(_) => RESPIRA_ERR_UNKNOWN_PATTERN,
        BreathError::InvalidPattern(_) => RESPIRA_ERR_INVALID_PATTERN,
    }
}

fn engine_code(e: &EngineError) -> i32 {
    match e {
        EngineError::AudioUnavailable(_) => RESPIRA_ERR_AUDIO_UNAVAILABLE,
        EngineError::InvalidVolume(_) => RESPIRA_ERR_INVALID_VOLUME,
        EngineError::UnknownTheme(_) => RESPIRA_ERR_UNKNOWN_THEME,
    }
}

/// Opaque session handle we hand to C.
pub struct RespiraSession {
    sr: f32,
    session: SessionController<SignalGenerator<MixerBackend>>,
    engine: Engine<MixerHandle>,
    scratch: Vec<f32>,
}

impl RespiraSession {
    fn new(sr: f32, seed: u64) -> Self {
        let sr = if sr.is_finite() { sr.max(1.0) } else { 48_000.0 };
        let mixer = MixerHandle::new(sr);
        let backend = MixerBackend::new(mixer.clone());
        let generator = if seed == 0 {
            SignalGenerator::new(backend)
        } else {
            SignalGenerator::with_seed(backend, seed)
        };
        Self {
            sr,
            session: SessionController::new(generator),
            engine: Engine::new(mixer, sr),
            scratch: Vec::new(),
        }
    }

    fn generator(&mut self) -> &mut SignalGenerator<MixerBackend> {
        self.session.observer_mut()
    }
}

/// Run `f` on the session behind `ptr`, or return `fallback` for null.
#[inline]
fn with_session<R>(ptr: *mut RespiraSession, fallback: R, f: impl FnOnce(&mut RespiraSession) -> R) -> R {
    if ptr.is_null() {
        return fallback;
    }
    let s = unsafe { &mut *ptr };
    f(s)
}

#[inline]
fn read_str<'a>(ptr: *const c_char) -> Result<&'a str, i32> {
    if ptr.is_null() {
        return Err(RESPIRA_ERR_NULL);
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().map_err(|_| RESPIRA_ERR_UTF8)
}

// --- Creation / destruction -------------------------------------------------------

/// Create a session rendering at `sample_rate`. `seed == 0` seeds the voice
/// jitter from entropy. Sound stays off until `respira_unmute`.
#[no_mangle]
pub extern "C" fn respira_session_create(sample_rate: f32, seed: u64) -> *mut RespiraSession {
    Box::into_raw(Box::new(RespiraSession::new(sample_rate, seed)))
}

/// Destroy a session previously returned by `respira_session_create`.
#[no_mangle]
pub extern "C" fn respira_session_destroy(session: *mut RespiraSession) {
    if !session.is_null() {
        unsafe { drop(Box::from_raw(session)) };
    }
}

// --- Session control -------------------------------------------------------------

/// Start the built-in pattern `pattern_key` (e.g. `"4-7-8"`).
///
/// Returns `RESPIRA_OK`, `RESPIRA_RESUMED`, or a negative error code.
#[no_mangle]
pub extern "C" fn respira_session_start(session: *mut RespiraSession, pattern_key: *const c_char) -> i32 {
    with_session(session, RESPIRA_ERR_NULL, |s| {
        let key = match read_str(pattern_key) {
            Ok(k) => k,
            Err(code) => return code,
        };
        let started = catalog::lookup(key).and_then(|p| s.session.start(p));
        match started {
            Ok(StartOutcome::Started) => RESPIRA_OK,
            Ok(StartOutcome::Resumed) => RESPIRA_RESUMED,
            Err(e) => {
                log::warn!("{e}");
                breath_code(&e)
            }
        }
    })
}

/// Returns 1 if the session was paused by this call, 0 if it was a no-op.
#[no_mangle]
pub extern "C" fn respira_session_pause(session: *mut RespiraSession) -> i32 {
    with_session(session, RESPIRA_ERR_NULL, |s| i32::from(s.session.pause()))
}

/// Returns 1 if a paused session was resumed, 0 otherwise.
#[no_mangle]
pub extern "C" fn respira_session_resume(session: *mut RespiraSession) -> i32 {
    with_session(session, RESPIRA_ERR_NULL, |s| i32::from(s.session.resume()))
}

#[no_mangle]
pub extern "C" fn respira_session_reset(session: *mut RespiraSession) {
    with_session(session, (), |s| s.session.reset());
}

/// Advance the session clock and the voice modulation. Returns 1 if a new
/// phase was entered, 0 if not.
///
/// Keep ticking while paused or idle: the soundscape only moves on ticks.
#[no_mangle]
pub extern "C" fn respira_session_tick(session: *mut RespiraSession, delta_seconds: f64) -> i32 {
    with_session(session, RESPIRA_ERR_NULL, |s| {
        let entered = s.session.tick(delta_seconds).is_some();
        s.generator().advance(delta_seconds);
        i32::from(entered)
    })
}

// --- Session queries -------------------------------------------------------------

#[no_mangle]
pub extern "C" fn respira_session_phase(session: *mut RespiraSession) -> RespiraPhase {
    with_session(session, RespiraPhase::Ready, |s| s.session.phase().into())
}

#[no_mangle]
pub extern "C" fn respira_session_time_remaining(session: *mut RespiraSession) -> f64 {
    with_session(session, 0.0, |s| s.session.time_remaining())
}

/// Whole seconds for a countdown display.
#[no_mangle]
pub extern "C" fn respira_session_display_seconds(session: *mut RespiraSession) -> u32 {
    with_session(session, 0, |s| s.session.display_seconds())
}

#[no_mangle]
pub extern "C" fn respira_session_cycle_index(session: *mut RespiraSession) -> u32 {
    with_session(session, 0, |s| s.session.cycle_index())
}

#[no_mangle]
pub extern "C" fn respira_session_is_running(session: *mut RespiraSession) -> bool {
    with_session(session, false, |s| s.session.is_running())
}

/// Elapsed fraction of the current phase in [0, 1].
#[no_mangle]
pub extern "C" fn respira_session_phase_progress(session: *mut RespiraSession) -> f64 {
    with_session(session, 0.0, |s| s.session.phase_progress())
}

// --- Sound -----------------------------------------------------------------------

/// Master volume in [0, 1]; out-of-range values return `RESPIRA_ERR_INVALID_VOLUME`.
#[no_mangle]
pub extern "C" fn respira_set_volume(session: *mut RespiraSession, volume: f32) -> i32 {
    with_session(session, RESPIRA_ERR_NULL, |s| match s.generator().set_volume(volume) {
        Ok(()) => RESPIRA_OK,
        Err(e) => engine_code(&e),
    })
}

/// Select `"ocean"`, `"forest"`, `"sunset"` or `"night"`; switches immediately if sounding.
#[no_mangle]
pub extern "C" fn respira_set_theme(session: *mut RespiraSession, theme: *const c_char) -> i32 {
    with_session(session, RESPIRA_ERR_NULL, |s| {
        let name = match read_str(theme) {
            Ok(n) => n,
            Err(code) => return code,
        };
        match name.parse::<ThemeKind>().and_then(|t| s.generator().select_theme(t)) {
            Ok(()) => RESPIRA_OK,
            Err(e) => engine_code(&e),
        }
    })
}

#[no_mangle]
pub extern "C" fn respira_mute(session: *mut RespiraSession) {
    with_session(session, (), |s| s.generator().mute());
}

#[no_mangle]
pub extern "C" fn respira_unmute(session: *mut RespiraSession) -> i32 {
    with_session(session, RESPIRA_ERR_NULL, |s| match s.generator().unmute() {
        Ok(()) => RESPIRA_OK,
        Err(e) => engine_code(&e),
    })
}

// --- Rendering -------------------------------------------------------------------

/// Tell the renderer the host changed its sample rate.
#[no_mangle]
pub extern "C" fn respira_reset_sample_rate(session: *mut RespiraSession, sample_rate: f32) {
    with_session(session, (), |s| {
        if sample_rate.is_finite() && sample_rate >= 1.0 {
            s.sr = sample_rate;
        }
    });
}

/// Render `frames` of audio into an interleaved f32 buffer with `channels` channels.
///
/// Returns the number of frames rendered (0 on error).
#[no_mangle]
pub extern "C" fn respira_render_interleaved_f32(
    session: *mut RespiraSession,
    out_interleaved: *mut f32,
    frames: u32,
    channels: u32,
) -> u32 {
    if out_interleaved.is_null() || frames == 0 || channels == 0 {
        return 0;
    }
    with_session(session, 0, |s| {
        let ch = channels as usize;
        let out = unsafe { std::slice::from_raw_parts_mut(out_interleaved, frames as usize * ch) };
        let rendered = s.engine.render_interleaved(s.sr, ch, &mut s.scratch, out);
        u32::try_from(rendered).unwrap_or(frames)
    })
}
