//! CPAL output glue: device lookup, config negotiation, and a stream that
//! pulls mono blocks from an [`Engine`] and fans them out to every channel.
//!
//! Any failure here maps to [`EngineError::AudioUnavailable`]; callers are
//! expected to fall back to a visual-only session.

use core::fmt::Display;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use respira_core::dsp::{one_pole_coeff_ms, Rms};

use crate::error::{EngineError, Result};
use crate::graph::{Engine, Generator};

fn unavailable(e: impl Display) -> EngineError {
    EngineError::AudioUnavailable(e.to_string())
}

/// What the caller asked for; `None` means "device default".
#[derive(Debug, Clone, Default)]
pub struct OutputRequest {
    pub device: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// A playing output stream. Dropping it stops playback.
pub struct OutputStream {
    _stream: cpal::Stream,
    pub device_name: String,
    pub config: cpal::StreamConfig,
    pub sample_format: cpal::SampleFormat,
}

pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    for dev in host.output_devices().map_err(unavailable)? {
        names.push(dev.name().map_err(unavailable)?);
    }
    Ok(names)
}

pub fn pick_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.output_devices().map_err(unavailable)? {
            if d.name().map_err(unavailable)? == name {
                return Ok(d);
            }
        }
        return Err(unavailable(format_args!("requested device not found: {name}")));
    }
    host.default_output_device()
        .ok_or_else(|| unavailable("no default output device"))
}

/// Closest supported config to the requested rate/channels.
pub fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig> {
    if req_sr.is_none() && req_ch.is_none() {
        return device.default_output_config().map_err(unavailable);
    }

    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs().map_err(unavailable)? {
        let ch = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = req_ch.map_or(0, |c| u64::from(ch.abs_diff(c)));
        let sr_pen = match req_sr {
            Some(sr) if (sr_min..=sr_max).contains(&sr) => 0,
            Some(sr) => u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr))),
            None => 0,
        };

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| unavailable("no supported output configs"))?;
    let pick_sr = match req_sr {
        Some(sr) => cpal::SampleRate(sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0)),
        None => range.max_sample_rate(),
    };
    Ok(range.with_sample_rate(pick_sr))
}

/// Build (not start) an output stream rendering `engine`.
///
/// Logs a once-per-second peak/RMS meter at debug level.
pub fn build_stream<T, G>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut engine: Engine<G>,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
    G: Generator + Send + 'static,
{
    #[allow(clippy::cast_precision_loss)]
    let sr = cfg.sample_rate.0 as f32;
    let channels = usize::from(cfg.channels.max(1));

    let meter_interval = cfg.sample_rate.0.max(1) as usize;
    let mut meter_count = 0usize;
    let mut meter_peak = 0.0f32;
    let mut meter_rms = Rms::new(one_pole_coeff_ms(300.0, sr));
    let mut mono: Vec<f32> = Vec::new();

    let stream = device
        .build_output_stream(
            cfg,
            move |output: &mut [T], _| {
                let frames = output.len() / channels;
                if mono.len() < frames {
                    mono.resize(frames, 0.0);
                }
                let block = &mut mono[..frames];
                engine.fill(sr, block);

                for (frame, &s) in output.chunks_exact_mut(channels).zip(block.iter()) {
                    let s = s.clamp(-1.0, 1.0);
                    frame.fill(T::from_sample(s));

                    meter_peak = meter_peak.max(s.abs());
                    meter_rms.tick(s);
                    meter_count += 1;
                    if meter_count >= meter_interval {
                        log::debug!("meter: peak {meter_peak:.3}, rms {:.3}", meter_rms.value());
                        meter_peak = 0.0;
                        meter_count = 0;
                    }
                }
            },
            |e| log::warn!("audio stream error: {e}"),
            None,
        )
        .map_err(unavailable)?;
    Ok(stream)
}

/// Pick a device, negotiate a config, and start playing `gen`.
pub fn open_output<G>(req: &OutputRequest, gen: G) -> Result<OutputStream>
where
    G: Generator + Send + 'static,
{
    let device = pick_device(req.device.as_deref())?;
    let device_name = device.name().map_err(unavailable)?;
    let supported = choose_config(&device, req.sample_rate, req.channels)?;
    let sample_format = supported.sample_format();
    let config = supported.config();

    #[allow(clippy::cast_precision_loss)]
    let engine = Engine::new(gen, config.sample_rate.0 as f32);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32, G>(&device, &config, engine)?,
        cpal::SampleFormat::I16 => build_stream::<i16, G>(&device, &config, engine)?,
        cpal::SampleFormat::U16 => build_stream::<u16, G>(&device, &config, engine)?,
        other => return Err(unavailable(format_args!("unsupported device sample format: {other:?}"))),
    };
    stream.play().map_err(unavailable)?;

    log::info!(
        "audio out: {device_name} @ {} Hz, {} ch ({sample_format:?})",
        config.sample_rate.0,
        config.channels
    );
    Ok(OutputStream { _stream: stream, device_name, config, sample_format })
}
