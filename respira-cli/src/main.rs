//! respira CLI — guided breathing in the terminal with an ambient soundscape.
//!
//! The main thread is the tick source: every `tick_ms` it drains pending
//! stdin commands, then advances the session by the measured wall-clock
//! delta. Audio renders on the CPAL callback thread from the shared mixer.

mod app;
mod command;
mod config;

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use respira_breath::PatternCatalog;
use respira_engine::realtime::{self, OutputRequest};
use respira_engine::{MixerBackend, MixerHandle, SignalGenerator, ThemeKind};

use crate::app::{App, Flow};
use crate::command::{Command, HELP};
use crate::config::Config;

#[derive(Parser, Debug, Default)]
#[command(name = "respira", version)]
#[command(about = "Guided breathing sessions with an ambient soundscape")]
struct Args {
    /// Breathing pattern key (4-7-8, 4-4-4, 4-6, 6-2-6 or a custom one)
    #[arg(short, long)]
    pattern: Option<String>,

    /// Soundscape theme: ocean, forest, sunset, night
    #[arg(short, long)]
    theme: Option<ThemeKind>,

    /// Master volume in [0, 1]
    #[arg(long)]
    volume: Option<f32>,

    /// Start with sound off
    #[arg(long)]
    mute: bool,

    /// Tick cadence in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Carry tick overshoot into the next phase instead of dropping it
    #[arg(long)]
    carry_over: bool,

    /// Seed for the voice jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Output device name
    #[arg(long)]
    device: Option<String>,

    #[arg(long)]
    sample_rate: Option<u32>,

    #[arg(long)]
    channels: Option<u16>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    list_devices: bool,

    #[arg(long)]
    list_patterns: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::builder()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list_devices {
        println!("Available output devices:");
        for name in realtime::list_output_devices()? {
            println!("- {name}");
        }
        return Ok(());
    }

    let cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    }
    .with_args(&args)?;

    let catalog = PatternCatalog::with_custom(cfg.custom_patterns.iter().cloned())
        .context("invalid custom pattern in config")?;
    if args.list_patterns {
        for p in catalog.iter() {
            println!("{:<8} {:<18} {}", p.key, p.name, p.description);
        }
        return Ok(());
    }
    let pattern = catalog.lookup(&cfg.pattern)?.clone();

    // Audio is best effort: without a device the session runs visual-only.
    let mixer = MixerHandle::new(48_000.0);
    let request = OutputRequest {
        device: cfg.device.clone(),
        sample_rate: cfg.sample_rate,
        channels: cfg.channels,
    };
    let (backend, _stream) = match realtime::open_output(&request, mixer.clone()) {
        Ok(stream) => (MixerBackend::new(mixer), Some(stream)),
        Err(e) => {
            log::warn!("{e}; continuing without sound");
            (MixerBackend::disconnected(e.to_string()), None)
        }
    };

    let mut generator = match cfg.seed {
        Some(seed) => SignalGenerator::with_seed(backend, seed),
        None => SignalGenerator::new(backend),
    };
    generator.set_volume(cfg.volume)?;
    generator.select_theme(cfg.theme)?;
    if !cfg.muted {
        if let Err(e) = generator.start(cfg.theme) {
            log::warn!("{e}");
        }
    }

    let mut app = App::new(generator, cfg.timing, catalog, pattern);
    println!("respira — type `help` for commands\n");
    log::debug!("{HELP}");

    let (tx, rx) = mpsc::channel::<Command>();
    let _reader = command::spawn_reader(tx);

    app.start();
    let tick = Duration::from_millis(cfg.tick_ms);
    let mut last = Instant::now();
    loop {
        while let Ok(cmd) = rx.try_recv() {
            if app.handle(cmd) == Flow::Quit {
                return Ok(());
            }
        }

        let now = Instant::now();
        app.tick(now.duration_since(last).as_secs_f64());
        last = now;

        if app.is_complete() {
            return Ok(());
        }
        thread::sleep(tick);
    }
}
