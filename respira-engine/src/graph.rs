//! Realtime rendering core.
//!
//! `Generator` is the minimal pull interface the audio callback sees, and
//! `Engine<G>` owns one generator, tracks sample rate and time, and hands
//! out mono samples or whole interleaved blocks.
//!
//! Generic over the generator type so the CLI, the C ABI and the benches
//! can all drive the same mixer without trait objects.

/// Anything that can generate one sample at a time.
pub trait Generator {
    /// Called when the engine is (re)initialized or when the sample rate changes.
    fn reset(&mut self, sr: f32);

    /// Generate the next mono sample. Implementations should assume the sample
    /// rate has been communicated via `reset`.
    fn next(&mut self) -> f32;

    /// Fill a mono block. Override when per-block work (locking, mixing)
    /// is cheaper than per-sample calls.
    fn fill(&mut self, out: &mut [f32]) {
        for s in out.iter_mut() {
            *s = self.next();
        }
    }
}

/// Lightweight realtime engine that owns a generator.
///
/// If the `sr` reported by the host changes, the engine calls `reset(sr)` on
/// the inner generator once and continues.
pub struct Engine<G: Generator> {
    sr: f32,
    t: f64,
    gen: G,
}

impl<G: Generator> Engine<G> {
    /// Wrap an already-configured generator and announce `sr` to it.
    #[inline]
    pub fn new(mut gen: G, sr: f32) -> Self {
        let sr = sr.max(1.0);
        gen.reset(sr);
        Self { sr, t: 0.0, gen }
    }

    #[inline]
    fn sync_rate(&mut self, sr: f32) {
        #[allow(clippy::float_cmp)]
        if sr != self.sr && sr >= 1.0 {
            log::debug!("sample rate {} -> {}", self.sr, sr);
            self.sr = sr;
            self.gen.reset(sr);
        }
    }

    /// Produce **one** mono sample at the given sample rate.
    #[inline]
    pub fn next(&mut self, sr: f32) -> f32 {
        self.sync_rate(sr);
        self.t += 1.0 / f64::from(self.sr);
        self.gen.next()
    }

    /// Fill a mono block.
    pub fn fill(&mut self, sr: f32, out: &mut [f32]) {
        self.sync_rate(sr);
        self.gen.fill(out);
        #[allow(clippy::cast_precision_loss)]
        let n = out.len() as f64;
        self.t += n / f64::from(self.sr);
    }

    /// Render `frames` mono samples and duplicate each one across `channels`.
    ///
    /// `scratch` is grown to `frames` if needed; `out` must hold
    /// `frames * channels` samples, extra space is left untouched.
    pub fn render_interleaved(
        &mut self,
        sr: f32,
        channels: usize,
        scratch: &mut Vec<f32>,
        out: &mut [f32],
    ) -> usize {
        let channels = channels.max(1);
        let frames = out.len() / channels;
        if scratch.len() < frames {
            scratch.resize(frames, 0.0);
        }
        let mono = &mut scratch[..frames];
        self.fill(sr, mono);
        for (frame, &s) in out.chunks_exact_mut(channels).zip(mono.iter()) {
            frame.fill(s);
        }
        frames
    }

    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }

    /// Seconds rendered since this engine was created.
    #[inline] pub fn time(&self) -> f64 { self.t }

    /// Replace the inner generator and announce the current rate to it.
    #[inline]
    pub fn swap_generator(&mut self, mut gen: G) {
        gen.reset(self.sr);
        self.gen = gen;
    }

    #[inline] pub fn generator(&self) -> &G { &self.gen }

    #[inline] pub fn generator_mut(&mut self) -> &mut G { &mut self.gen }
}
