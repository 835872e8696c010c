//! Block mixer shared between the control thread and the audio callback.
//!
//! The control side spawns, retunes and releases voices through
//! [`MixerBackend`] / [`MixerVoice`]; the audio side pulls blocks through
//! [`MixerHandle`]'s [`Generator`] impl. Both go through one
//! `Arc<parking_lot::Mutex<Mixer>>`: control writes lock briefly, the
//! callback locks once per block.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use respira_core::dsp::{mix_in_place, soft_clip};
use respira_core::filters::DcBlock;

use crate::error::{EngineError, Result};
use crate::graph::Generator;
use crate::synth::SynthVoice;
use crate::nodes::Wave;
use crate::voice::{AudioBackend, FilterSpec, Voice, VoiceId};

/// Output DC blocker corner (Hz).
const DC_CUT_HZ: f32 = 10.0;

/// Sum of all live voices, DC-blocked and soft-clipped.
#[derive(Debug)]
pub struct Mixer {
    sr: f32,
    voices: Vec<SynthVoice>,
    scratch: Vec<f32>,
    dc: DcBlock,
    next_id: u64,
}

impl Mixer {
    pub fn new(sr: f32) -> Self {
        let sr = sr.max(1.0);
        Self { sr, voices: Vec::new(), scratch: Vec::new(), dc: DcBlock::new(DC_CUT_HZ, sr), next_id: 1 }
    }

    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }

    /// Add a silent, untuned voice.
    pub fn add_voice(&mut self, wave: Wave) -> VoiceId {
        let id = VoiceId(self.next_id);
        self.next_id += 1;
        self.voices.push(SynthVoice::new(id, wave, self.sr));
        id
    }

    pub fn remove_voice(&mut self, id: VoiceId) -> bool {
        let before = self.voices.len();
        self.voices.retain(|v| v.id() != id);
        before != self.voices.len()
    }

    pub fn voice(&self, id: VoiceId) -> Option<&SynthVoice> {
        self.voices.iter().find(|v| v.id() == id)
    }

    pub fn voice_mut(&mut self, id: VoiceId) -> Option<&mut SynthVoice> {
        self.voices.iter_mut().find(|v| v.id() == id)
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn clear(&mut self) {
        self.voices.clear();
    }

    #[inline]
    fn finish(&mut self, x: f32) -> f32 {
        soft_clip(self.dc.process(x))
    }
}

impl Generator for Mixer {
    fn reset(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.dc.set_sample_rate(self.sr);
        for v in &mut self.voices {
            v.set_sample_rate(self.sr);
        }
    }

    #[inline]
    fn next(&mut self) -> f32 {
        let x: f32 = self.voices.iter_mut().map(SynthVoice::next).sum();
        self.finish(x)
    }

    fn fill(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        // Grows on the first oversized block only.
        if self.scratch.len() < out.len() {
            self.scratch.resize(out.len(), 0.0);
        }
        let scratch = &mut self.scratch[..out.len()];
        for v in &mut self.voices {
            for s in scratch.iter_mut() {
                *s = v.next();
            }
            mix_in_place(out, scratch, 1.0);
        }
        for s in out.iter_mut() {
            *s = soft_clip(self.dc.process(*s));
        }
    }
}

/// Cloneable, thread-safe handle to a [`Mixer`].
#[derive(Clone, Debug)]
pub struct MixerHandle(Arc<Mutex<Mixer>>);

impl MixerHandle {
    pub fn new(sr: f32) -> Self {
        Self(Arc::new(Mutex::new(Mixer::new(sr))))
    }

    pub fn lock(&self) -> MutexGuard<'_, Mixer> {
        self.0.lock()
    }
}

impl Generator for MixerHandle {
    fn reset(&mut self, sr: f32) {
        self.0.lock().reset(sr);
    }

    fn next(&mut self) -> f32 {
        self.0.lock().next()
    }

    fn fill(&mut self, out: &mut [f32]) {
        self.0.lock().fill(out);
    }
}

/// Voice source backed by the shared mixer.
///
/// A disconnected backend stands in when no output device could be opened:
/// `open` then reports [`EngineError::AudioUnavailable`].
#[derive(Clone, Debug)]
pub struct MixerBackend {
    handle: Option<MixerHandle>,
    reason: String,
}

impl MixerBackend {
    pub fn new(handle: MixerHandle) -> Self {
        Self { handle: Some(handle), reason: String::new() }
    }

    pub fn disconnected(reason: impl Into<String>) -> Self {
        Self { handle: None, reason: reason.into() }
    }

    pub fn handle(&self) -> Option<&MixerHandle> {
        self.handle.as_ref()
    }

    fn connected(&self) -> Result<&MixerHandle> {
        self.handle
            .as_ref()
            .ok_or_else(|| EngineError::AudioUnavailable(self.reason.clone()))
    }
}

impl AudioBackend for MixerBackend {
    type Voice = MixerVoice;

    fn open(&mut self) -> Result<()> {
        self.connected().map(|_| ())
    }

    fn spawn_voice(&mut self, wave: Wave) -> Result<MixerVoice> {
        let handle = self.connected()?.clone();
        let id = handle.lock().add_voice(wave);
        log::debug!("spawned {id} ({wave:?})");
        Ok(MixerVoice { id, handle })
    }

    fn release_voice(&mut self, voice: MixerVoice) {
        if voice.handle.lock().remove_voice(voice.id) {
            log::debug!("released {}", voice.id);
        }
    }
}

/// Control-side view of one mixer voice.
#[derive(Debug)]
pub struct MixerVoice {
    id: VoiceId,
    handle: MixerHandle,
}

impl Voice for MixerVoice {
    fn id(&self) -> VoiceId {
        self.id
    }

    fn set_frequency(&mut self, hz: f32) {
        if let Some(v) = self.handle.lock().voice_mut(self.id) {
            v.set_frequency(hz);
        }
    }

    fn set_gain(&mut self, target: f32, ramp_secs: f32) {
        if let Some(v) = self.handle.lock().voice_mut(self.id) {
            v.set_gain(target, ramp_secs);
        }
    }

    fn set_filter(&mut self, filter: FilterSpec) {
        if let Some(v) = self.handle.lock().voice_mut(self.id) {
            v.set_filter(filter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::themes::ThemeKind;
    use crate::voice::{FilterKind, VoiceParams};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SR: f32 = 48_000.0;

    fn night_voices() -> Vec<VoiceParams> {
        ThemeKind::Night.theme().realize(&mut StdRng::seed_from_u64(5))
    }

    fn add(m: &mut Mixer, p: &VoiceParams, gain: f32) -> VoiceId {
        let id = m.add_voice(p.wave);
        let v = m.voice_mut(id).unwrap();
        v.set_frequency(p.frequency_hz);
        v.set_filter(p.filter);
        v.set_gain(gain, 0.0);
        id
    }

    fn render(handle: &MixerHandle, secs: f32) -> Vec<f32> {
        let mut out = vec![0.0; (secs * SR) as usize];
        handle.lock().fill(&mut out);
        out
    }

    fn upward_crossings(x: &[f32]) -> usize {
        x.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count()
    }

    fn rms(x: &[f32]) -> f32 {
        (x.iter().map(|s| s * s).sum::<f32>() / x.len() as f32).sqrt()
    }

    #[test]
    fn block_and_sample_paths_agree() {
        let mut a = Mixer::new(SR);
        let mut b = Mixer::new(SR);
        for p in night_voices() {
            add(&mut a, &p, p.base_gain);
            add(&mut b, &p, p.base_gain);
        }
        let mut block = vec![0.0; 512];
        a.fill(&mut block);
        for (i, &s) in block.iter().enumerate() {
            let t = b.next();
            assert!((s - t).abs() < 1e-5, "sample {i}: {s} vs {t}");
        }
    }

    #[test]
    fn output_is_bounded_and_nonzero() {
        let mut m = Mixer::new(44_100.0);
        for p in ThemeKind::Sunset.theme().realize(&mut StdRng::seed_from_u64(9)) {
            add(&mut m, &p, 1.0);
        }
        let mut block = vec![0.0; 4_410];
        m.fill(&mut block);
        assert!(block.iter().all(|s| s.abs() <= 1.0));
        assert!(block.iter().any(|s| s.abs() > 1e-3));
    }

    #[test]
    fn backend_spawns_and_releases_through_handle() {
        let handle = MixerHandle::new(SR);
        let mut backend = MixerBackend::new(handle.clone());
        backend.open().unwrap();

        let mut voice = backend.spawn_voice(Wave::Sine).unwrap();
        assert_eq!(handle.lock().voice_count(), 1);
        assert_eq!(handle.lock().voice(voice.id()).map(SynthVoice::gain), Some(0.0));

        voice.set_gain(0.03, 0.0);
        assert_eq!(handle.lock().voice(voice.id()).map(SynthVoice::gain_target), Some(0.03));

        let id = voice.id();
        backend.release_voice(voice);
        assert_eq!(handle.lock().voice_count(), 0);
        assert!(handle.lock().voice(id).is_none());
    }

    #[test]
    fn retuned_voice_changes_pitch() {
        let handle = MixerHandle::new(SR);
        let mut backend = MixerBackend::new(handle.clone());
        let mut voice = backend.spawn_voice(Wave::Sine).unwrap();
        voice.set_frequency(220.0);
        voice.set_filter(FilterSpec { kind: FilterKind::Lowpass, cutoff_hz: 8_000.0, q: 0.7 });
        voice.set_gain(0.3, 0.0);

        let low = upward_crossings(&render(&handle, 1.0));
        assert!((218..=222).contains(&low), "{low} crossings at 220 Hz");

        voice.set_frequency(440.0);
        render(&handle, 1.0);
        assert_eq!(handle.lock().voice(voice.id()).map(SynthVoice::sounding_frequency), Some(440.0));
        let high = upward_crossings(&render(&handle, 1.0));
        assert!((438..=442).contains(&high), "{high} crossings at 440 Hz");
    }

    #[test]
    fn refiltered_voice_changes_tone_and_settles() {
        let handle = MixerHandle::new(SR);
        let mut backend = MixerBackend::new(handle.clone());
        let mut voice = backend.spawn_voice(Wave::Sawtooth).unwrap();
        voice.set_frequency(220.0);
        voice.set_filter(FilterSpec { kind: FilterKind::Lowpass, cutoff_hz: 3_000.0, q: 0.7 });
        voice.set_gain(0.3, 0.0);
        let bright = rms(&render(&handle, 0.5));

        voice.set_filter(FilterSpec { kind: FilterKind::Lowpass, cutoff_hz: 150.0, q: 0.7 });
        render(&handle, 0.5);
        let dark = rms(&render(&handle, 0.5));
        assert!(dark < bright * 0.6, "bright {bright}, dark {dark}");

        voice.set_filter(FilterSpec { kind: FilterKind::Lowpass, cutoff_hz: 3_000.0, q: 0.7 });
        render(&handle, 5.0);
        let cut = handle.lock().voice(voice.id()).map(SynthVoice::sounding_cutoff_hz);
        assert_eq!(cut, Some(3_000.0));
    }

    #[test]
    fn ids_are_never_reused() {
        let mut m = Mixer::new(SR);
        let a = m.add_voice(Wave::Sine);
        assert!(m.remove_voice(a));
        let b = m.add_voice(Wave::Sine);
        assert_ne!(a, b);
        assert!(!m.remove_voice(a));
    }

    #[test]
    fn disconnected_backend_reports_unavailable() {
        let mut backend = MixerBackend::disconnected("no output device");
        assert_eq!(
            backend.open(),
            Err(EngineError::AudioUnavailable("no output device".into()))
        );
        assert!(backend.spawn_voice(Wave::Sine).is_err());
    }
}
