//! Ambient signal generator.
//!
//! Owns every voice of the playing theme, tunes and filters them through the
//! [`Voice`] interface, and drives their LFOs at control rate through the
//! same interface: [`SignalGenerator::advance`] writes frequency for
//! pitch-modulated voices and gain for level-modulated ones. Voices are never
//! restarted for a gain change; only `start`/`stop`/theme switches touch
//! voice lifetimes, and those always release the old set first.
//!
//! Voice gain = `base_gain * amplitude_target`, where
//! `amplitude_target = phase_factor(phase) * master_volume`.

use rand::rngs::StdRng;
use rand::SeedableRng;
use respira_breath::{Phase, PhaseObserver};
use respira_core::dsp::lerp;
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::nodes::Lfo;
use crate::themes::ThemeKind;
use crate::voice::{AudioBackend, Modulation, Voice, VoiceId, VoiceParams};

/// Gain glide on a phase change (seconds).
pub const PHASE_RAMP_SECS: f32 = 0.3;
/// Gain glide on a volume change (seconds).
pub const VOLUME_RAMP_SECS: f32 = 0.1;
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Loudness multiplier for each breathing phase.
pub fn phase_factor(phase: Phase) -> f32 {
    match phase {
        Phase::Ready | Phase::Inhale | Phase::Complete => 1.0,
        Phase::Hold | Phase::HoldAfterExhale => 0.5,
        Phase::Exhale => 0.7,
    }
}

/// Snapshot of the generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEngineState {
    /// Playing theme; `None` while stopped
    pub theme: Option<ThemeKind>,
    pub master_volume: f32,
    pub is_playing: bool,
    pub amplitude_target: f32,
}

/// Control-side copy of the linear level glide the voices run, so
/// level-modulated voices can be written mid-ramp.
#[derive(Debug, Clone, Copy)]
struct LevelGlide {
    from: f32,
    to: f32,
    secs: f32,
    elapsed: f32,
}

impl LevelGlide {
    fn at(value: f32) -> Self {
        Self { from: value, to: value, secs: 0.0, elapsed: 0.0 }
    }

    fn value(&self) -> f32 {
        if self.elapsed >= self.secs {
            self.to
        } else {
            lerp(self.from, self.to, self.elapsed / self.secs)
        }
    }

    fn retarget(&mut self, to: f32, secs: f32) {
        self.from = self.value();
        self.to = to;
        self.secs = secs.max(0.0);
        self.elapsed = 0.0;
    }

    fn advance(&mut self, dt: f32) {
        self.elapsed = (self.elapsed + dt).min(self.secs);
    }
}

#[derive(Debug)]
struct ActiveVoice<V> {
    voice: V,
    params: VoiceParams,
    lfo: Lfo,
}

impl<V> ActiveVoice<V> {
    /// Gain multiplier from the LFO's current position.
    fn tremolo(&self) -> f32 {
        match self.params.modulation {
            Modulation::Gain { depth } => (1.0 + self.lfo.value() * depth).max(0.0),
            Modulation::Frequency { .. } => 1.0,
        }
    }

    fn gain_at(&self, level: f32) -> f32 {
        self.params.base_gain * level * self.tremolo()
    }
}

/// Layered ambient tone generator over an [`AudioBackend`].
#[derive(Debug)]
pub struct SignalGenerator<B: AudioBackend> {
    backend: B,
    /// Remembered across stop/mute
    selected: ThemeKind,
    playing: Option<ThemeKind>,
    voices: Vec<ActiveVoice<B::Voice>>,
    master_volume: f32,
    phase_factor: f32,
    level: LevelGlide,
    rng: StdRng,
}

impl<B: AudioBackend> SignalGenerator<B> {
    pub fn new(backend: B) -> Self {
        Self::with_rng(backend, StdRng::from_entropy())
    }

    /// Reproducible voice jitter.
    pub fn with_seed(backend: B, seed: u64) -> Self {
        Self::with_rng(backend, StdRng::seed_from_u64(seed))
    }

    fn with_rng(backend: B, rng: StdRng) -> Self {
        Self {
            backend,
            selected: ThemeKind::default(),
            playing: None,
            voices: Vec::new(),
            master_volume: DEFAULT_VOLUME,
            phase_factor: 1.0,
            level: LevelGlide::at(DEFAULT_VOLUME),
            rng,
        }
    }

    /// Tear down whatever is playing and build one voice per theme entry.
    ///
    /// Each voice is spawned silent, tuned and filtered, then opened at the
    /// current amplitude target. On [`EngineError::AudioUnavailable`] the
    /// generator is left stopped (with `theme` remembered for a later retry).
    pub fn start(&mut self, theme: ThemeKind) -> Result<()> {
        self.release_all();
        self.selected = theme;

        if let Err(e) = self.backend.open() {
            log::warn!("cannot start {theme}: {e}");
            return Err(e);
        }

        let amplitude = self.amplitude_target();
        self.level = LevelGlide::at(amplitude);
        for params in theme.theme().realize(&mut self.rng) {
            let mut voice = match self.backend.spawn_voice(params.wave) {
                Ok(voice) => voice,
                Err(e) => {
                    log::warn!("voice spawn failed for {theme}: {e}");
                    self.release_all();
                    return Err(e);
                }
            };
            voice.set_frequency(params.frequency_hz);
            voice.set_filter(params.filter);
            let mut active = ActiveVoice { voice, params, lfo: Lfo::sine(params.lfo_rate_hz) };
            let gain = active.gain_at(amplitude);
            active.voice.set_gain(gain, 0.0);
            self.voices.push(active);
        }
        self.playing = Some(theme);
        log::info!(
            "theme {theme} started: {} voices at amplitude {amplitude:.3}",
            self.voices.len()
        );
        Ok(())
    }

    /// Release all voices immediately. Idempotent.
    pub fn stop(&mut self) {
        if let Some(theme) = self.playing.take() {
            log::info!("theme {theme} stopped");
        }
        self.release_all();
    }

    fn release_all(&mut self) {
        for active in self.voices.drain(..) {
            self.backend.release_voice(active.voice);
        }
        self.playing = None;
    }

    /// Change master volume; live voices glide to the new level.
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            log::warn!("ignoring volume {volume}");
            return Err(EngineError::InvalidVolume(volume));
        }
        self.master_volume = volume;
        self.retarget(VOLUME_RAMP_SECS);
        Ok(())
    }

    /// Re-target every voice for a new breathing phase.
    ///
    /// The target is tracked while stopped too, so the next `start`
    /// opens at the right level.
    pub fn on_phase_changed(&mut self, phase: Phase) {
        self.phase_factor = phase_factor(phase);
        self.retarget(PHASE_RAMP_SECS);
    }

    fn retarget(&mut self, ramp_secs: f32) {
        let amplitude = self.amplitude_target();
        self.level.retarget(amplitude, ramp_secs);
        for active in &mut self.voices {
            let gain = active.gain_at(amplitude);
            active.voice.set_gain(gain, ramp_secs);
        }
    }

    /// Step every voice's LFO by `dt` seconds and write the result.
    ///
    /// Pitch-modulated voices get `nominal ± depth_hz`; level-modulated
    /// voices get their current glide level times `1 ± depth`, reached over
    /// `dt`. Call it from the same tick that drives the session.
    pub fn advance(&mut self, dt: f64) {
        #[allow(clippy::cast_possible_truncation)]
        let dt = dt as f32;
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        self.level.advance(dt);
        let level = self.level.value();
        for active in &mut self.voices {
            let swing = active.lfo.advance(dt);
            match active.params.modulation {
                Modulation::Frequency { depth_hz } => {
                    active.voice.set_frequency(active.params.frequency_hz + swing * depth_hz);
                }
                Modulation::Gain { .. } => {
                    let gain = active.gain_at(level);
                    active.voice.set_gain(gain, dt);
                }
            }
        }
    }

    pub fn mute(&mut self) {
        self.stop();
    }

    /// Restart the remembered theme.
    pub fn unmute(&mut self) -> Result<()> {
        self.start(self.selected)
    }

    /// Remember `theme`; switch over immediately only while playing.
    pub fn select_theme(&mut self, theme: ThemeKind) -> Result<()> {
        self.selected = theme;
        if self.is_playing() {
            self.start(theme)
        } else {
            Ok(())
        }
    }

    #[inline] pub fn is_playing(&self) -> bool { self.playing.is_some() }
    #[inline] pub fn master_volume(&self) -> f32 { self.master_volume }
    #[inline] pub fn amplitude_target(&self) -> f32 { self.phase_factor * self.master_volume }
    #[inline] pub fn selected_theme(&self) -> ThemeKind { self.selected }
    #[inline] pub fn playing_theme(&self) -> Option<ThemeKind> { self.playing }

    pub fn voice_ids(&self) -> Vec<VoiceId> {
        self.voices.iter().map(|a| a.voice.id()).collect()
    }

    pub fn state(&self) -> SignalEngineState {
        SignalEngineState {
            theme: self.playing,
            master_volume: self.master_volume,
            is_playing: self.is_playing(),
            amplitude_target: self.amplitude_target(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: AudioBackend> PhaseObserver for SignalGenerator<B> {
    fn on_phase_changed(&mut self, phase: Phase) {
        SignalGenerator::on_phase_changed(self, phase);
    }
}

impl<B: AudioBackend> Drop for SignalGenerator<B> {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::Wave;
    use crate::voice::{FilterKind, FilterSpec};
    use approx::assert_abs_diff_eq;
    use respira_breath::{catalog, SessionController};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Event {
        Spawn(VoiceId, Wave),
        Release(VoiceId),
        Gain(VoiceId, f32, f32),
        Frequency(VoiceId, f32),
        Filter(VoiceId, FilterSpec),
    }

    /// Records every backend and voice call in order.
    #[derive(Debug, Default)]
    pub struct RecordingBackend {
        pub log: Rc<RefCell<Vec<Event>>>,
        pub unavailable: bool,
        next_id: u64,
    }

    #[derive(Debug)]
    pub struct RecordingVoice {
        id: VoiceId,
        log: Rc<RefCell<Vec<Event>>>,
    }

    impl Voice for RecordingVoice {
        fn id(&self) -> VoiceId {
            self.id
        }
        fn set_frequency(&mut self, hz: f32) {
            self.log.borrow_mut().push(Event::Frequency(self.id, hz));
        }
        fn set_gain(&mut self, target: f32, ramp_secs: f32) {
            self.log.borrow_mut().push(Event::Gain(self.id, target, ramp_secs));
        }
        fn set_filter(&mut self, filter: FilterSpec) {
            self.log.borrow_mut().push(Event::Filter(self.id, filter));
        }
    }

    impl AudioBackend for RecordingBackend {
        type Voice = RecordingVoice;

        fn open(&mut self) -> Result<()> {
            if self.unavailable {
                Err(EngineError::AudioUnavailable("test device unplugged".into()))
            } else {
                Ok(())
            }
        }

        fn spawn_voice(&mut self, wave: Wave) -> Result<RecordingVoice> {
            self.next_id += 1;
            let id = VoiceId(self.next_id);
            self.log.borrow_mut().push(Event::Spawn(id, wave));
            Ok(RecordingVoice { id, log: Rc::clone(&self.log) })
        }

        fn release_voice(&mut self, voice: RecordingVoice) {
            self.log.borrow_mut().push(Event::Release(voice.id));
        }
    }

    fn generator() -> (SignalGenerator<RecordingBackend>, Rc<RefCell<Vec<Event>>>) {
        let backend = RecordingBackend::default();
        let log = Rc::clone(&backend.log);
        (SignalGenerator::with_seed(backend, 11), log)
    }

    fn gains(log: &[Event]) -> Vec<(f32, f32)> {
        log.iter()
            .filter_map(|e| match e {
                Event::Gain(_, target, secs) => Some((*target, *secs)),
                _ => None,
            })
            .collect()
    }

    fn frequencies(log: &[Event]) -> Vec<f32> {
        log.iter()
            .filter_map(|e| if let Event::Frequency(_, hz) = e { Some(*hz) } else { None })
            .collect()
    }

    #[test]
    fn start_tunes_filters_then_opens_each_voice() {
        let (mut g, log) = generator();
        g.start(ThemeKind::Ocean).unwrap();
        assert!(g.is_playing());
        assert_eq!(g.voice_ids().len(), 4);

        let events = log.borrow();
        assert_eq!(events.len(), 16);
        for (chunk, nominal) in events.chunks(4).zip([60.0, 80.0, 120.0, 200.0]) {
            let [Event::Spawn(id, wave), Event::Frequency(f_id, hz), Event::Filter(c_id, filter), Event::Gain(g_id, gain, secs)] =
                chunk
            else {
                panic!("unexpected order {chunk:?}")
            };
            assert_eq!([id, f_id, c_id], [g_id; 3]);
            assert_eq!(*wave, Wave::Sine);
            assert!((nominal..=nominal + 20.0).contains(hz), "{hz} not near {nominal}");
            assert_eq!(*filter, FilterSpec { kind: FilterKind::Lowpass, cutoff_hz: 800.0, q: 0.5 });
            assert_abs_diff_eq!(*gain, 0.1 * DEFAULT_VOLUME);
            assert_eq!(*secs, 0.0);
        }
    }

    #[test]
    fn volume_change_keeps_voices_alive() {
        let (mut g, log) = generator();
        g.start(ThemeKind::Sunset).unwrap();
        let before = g.voice_ids();
        log.borrow_mut().clear();

        g.set_volume(0.3).unwrap();

        assert_eq!(g.voice_ids(), before);
        let events = log.borrow();
        assert!(events.iter().all(|e| matches!(e, Event::Gain(..))));
        for (target, secs) in gains(&events) {
            assert_abs_diff_eq!(target, 0.08 * 0.3);
            assert_eq!(secs, VOLUME_RAMP_SECS);
        }
        assert_eq!(gains(&events).len(), before.len());
    }

    #[test]
    fn hold_halves_amplitude() {
        let (mut g, log) = generator();
        g.start(ThemeKind::Night).unwrap();
        g.set_volume(0.8).unwrap();
        log.borrow_mut().clear();

        g.on_phase_changed(Phase::Hold);

        assert_abs_diff_eq!(g.amplitude_target(), 0.4);
        for (target, secs) in gains(&log.borrow()) {
            assert_abs_diff_eq!(target, 0.06 * 0.4);
            assert_eq!(secs, PHASE_RAMP_SECS);
        }
    }

    #[test]
    fn phase_factors() {
        let (mut g, _) = generator();
        g.set_volume(1.0).unwrap();
        for (phase, expected) in [
            (Phase::Ready, 1.0),
            (Phase::Inhale, 1.0),
            (Phase::Hold, 0.5),
            (Phase::Exhale, 0.7),
            (Phase::HoldAfterExhale, 0.5),
            (Phase::Complete, 1.0),
        ] {
            g.on_phase_changed(phase);
            assert_abs_diff_eq!(g.amplitude_target(), expected);
        }
    }

    #[test]
    fn start_opens_at_current_phase_level() {
        let (mut g, log) = generator();
        g.on_phase_changed(Phase::Exhale);
        g.start(ThemeKind::Ocean).unwrap();
        let opened = gains(&log.borrow());
        assert_eq!(opened.len(), 4);
        for (gain, secs) in opened {
            assert_abs_diff_eq!(gain, 0.1 * 0.7 * DEFAULT_VOLUME);
            assert_eq!(secs, 0.0);
        }
    }

    #[test]
    fn out_of_range_volume_is_rejected() {
        let (mut g, log) = generator();
        g.start(ThemeKind::Forest).unwrap();
        log.borrow_mut().clear();
        for bad in [-0.1, 1.5, f32::NAN] {
            assert!(matches!(g.set_volume(bad), Err(EngineError::InvalidVolume(_))));
        }
        assert_eq!(g.master_volume(), DEFAULT_VOLUME);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn theme_switch_releases_before_spawning() {
        let (mut g, log) = generator();
        g.start(ThemeKind::Ocean).unwrap();
        let old = g.voice_ids();
        log.borrow_mut().clear();

        g.select_theme(ThemeKind::Forest).unwrap();

        let events = log.borrow();
        let first_spawn = events.iter().position(|e| matches!(e, Event::Spawn(..))).unwrap();
        let releases: Vec<_> = events[..first_spawn]
            .iter()
            .filter_map(|e| if let Event::Release(id) = e { Some(*id) } else { None })
            .collect();
        assert_eq!(releases, old);
        assert_eq!(g.voice_ids().len(), 5);
        assert_eq!(g.playing_theme(), Some(ThemeKind::Forest));
    }

    #[test]
    fn stop_is_idempotent_and_mute_remembers_theme() {
        let (mut g, log) = generator();
        g.select_theme(ThemeKind::Night).unwrap();
        assert!(log.borrow().is_empty());

        g.unmute().unwrap();
        assert_eq!(g.playing_theme(), Some(ThemeKind::Night));
        g.mute();
        g.stop();
        assert!(!g.is_playing());
        assert!(g.voice_ids().is_empty());
        let releases = log.borrow().iter().filter(|e| matches!(e, Event::Release(_))).count();
        assert_eq!(releases, 5);

        g.unmute().unwrap();
        assert_eq!(g.playing_theme(), Some(ThemeKind::Night));
    }

    #[test]
    fn unavailable_audio_does_not_block_the_session() {
        let backend = RecordingBackend { unavailable: true, ..Default::default() };
        let mut g = SignalGenerator::with_seed(backend, 1);
        assert!(matches!(g.start(ThemeKind::Ocean), Err(EngineError::AudioUnavailable(_))));
        assert!(!g.is_playing());
        assert_eq!(g.selected_theme(), ThemeKind::Ocean);

        let mut session = SessionController::new(g);
        session.start(catalog::lookup("4-6").unwrap()).unwrap();
        while session.is_running() {
            session.tick(0.5);
        }
        assert_eq!(session.phase(), Phase::Complete);
        assert_abs_diff_eq!(session.observer().amplitude_target(), DEFAULT_VOLUME);
    }

    #[test]
    fn session_drives_generator_gains() {
        let (g, log) = generator();
        let mut session = SessionController::new(g);
        session.observer_mut().start(ThemeKind::Sunset).unwrap();
        log.borrow_mut().clear();

        session.start(catalog::lookup("4-7-8").unwrap()).unwrap();
        session.tick(4.0);
        session.tick(7.0);

        // inhale, hold, exhale: 4 voices each
        let targets: Vec<f32> = gains(&log.borrow()).into_iter().map(|(t, _)| t).collect();
        assert_eq!(targets.len(), 12);
        assert_abs_diff_eq!(targets[0], 0.08 * 1.0 * DEFAULT_VOLUME);
        assert_abs_diff_eq!(targets[4], 0.08 * 0.5 * DEFAULT_VOLUME);
        assert_abs_diff_eq!(targets[8], 0.08 * 0.7 * DEFAULT_VOLUME);
    }

    #[test]
    fn pitch_lfo_is_written_as_frequency() {
        let (mut g, log) = generator();
        g.start(ThemeKind::Forest).unwrap();
        let tuned = frequencies(&log.borrow());
        log.borrow_mut().clear();

        g.advance(0.1);

        let events = log.borrow();
        assert!(gains(&events).is_empty());
        let swung = frequencies(&events);
        assert_eq!(swung.len(), 5);
        for ((hz, f0), nominal) in swung.iter().zip(&tuned).zip([200.0, 400.0, 800.0, 1_200.0, 2_000.0]) {
            assert_ne!(hz, f0);
            assert!((hz - f0).abs() <= 0.1 * nominal + 1e-3, "{hz} swung too far from {f0}");
        }
    }

    #[test]
    fn level_lfo_is_written_as_gain_over_the_tick() {
        let (mut g, log) = generator();
        g.start(ThemeKind::Sunset).unwrap();
        log.borrow_mut().clear();

        g.advance(0.1);

        let events = log.borrow();
        assert!(frequencies(&events).is_empty());
        let written = gains(&events);
        assert_eq!(written.len(), 4);
        let level = 0.08 * DEFAULT_VOLUME;
        for (target, secs) in written {
            assert_ne!(target, level);
            // 0.03 absolute swing at unit volume
            assert!((target - level).abs() <= 0.03 * DEFAULT_VOLUME + 1e-6);
            assert_abs_diff_eq!(secs, 0.1);
        }
    }

    #[test]
    fn level_lfo_rides_the_phase_glide() {
        let (mut g, log) = generator();
        g.start(ThemeKind::Night).unwrap();
        g.on_phase_changed(Phase::Hold);
        log.borrow_mut().clear();

        // halfway through the 0.3 s glide from 0.5 to 0.25
        g.advance(0.15);

        let halfway = 0.06 * 0.375;
        for (target, _) in gains(&log.borrow()) {
            assert!(target > halfway && target < halfway * 1.07, "{target}");
        }
    }

    #[test]
    fn bad_control_steps_write_nothing() {
        let (mut g, log) = generator();
        g.start(ThemeKind::Forest).unwrap();
        log.borrow_mut().clear();
        for dt in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            g.advance(dt);
        }
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn state_snapshot() {
        let (mut g, _) = generator();
        assert_eq!(
            g.state(),
            SignalEngineState { theme: None, master_volume: 0.5, is_playing: false, amplitude_target: 0.5 }
        );
        g.start(ThemeKind::Forest).unwrap();
        assert_eq!(g.state().theme, Some(ThemeKind::Forest));
    }
}
