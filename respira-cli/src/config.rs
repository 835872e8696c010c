//! Optional JSON configuration file. Command-line flags win over file values.

use std::fs;
use std::path::Path;

use anyhow::{ensure, Context};
use respira_breath::{BreathingPattern, TimingMode, DEFAULT_PATTERN};
use respira_engine::{ThemeKind, DEFAULT_VOLUME};
use serde::{Deserialize, Serialize};

use crate::Args;

/// File keys are camelCase, matching the nested pattern fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Catalog key of the pattern to run
    pub pattern: String,
    pub theme: ThemeKind,
    pub volume: f32,
    /// Start without sound
    pub muted: bool,
    /// Tick cadence in milliseconds
    pub tick_ms: u64,
    pub timing: TimingMode,
    /// Fixed RNG seed for voice jitter
    pub seed: Option<u64>,
    pub device: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub custom_patterns: Vec<BreathingPattern>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            theme: ThemeKind::default(),
            volume: DEFAULT_VOLUME,
            muted: false,
            tick_ms: 100,
            timing: TimingMode::default(),
            seed: None,
            device: None,
            sample_rate: None,
            channels: None,
            custom_patterns: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Layer command-line flags on top.
    pub fn with_args(mut self, args: &Args) -> anyhow::Result<Self> {
        if let Some(p) = &args.pattern {
            self.pattern.clone_from(p);
        }
        if let Some(t) = args.theme {
            self.theme = t;
        }
        if let Some(v) = args.volume {
            self.volume = v;
        }
        if args.mute {
            self.muted = true;
        }
        if let Some(ms) = args.tick_ms {
            self.tick_ms = ms;
        }
        if args.carry_over {
            self.timing = TimingMode::CarryOver;
        }
        if args.seed.is_some() {
            self.seed = args.seed;
        }
        if args.device.is_some() {
            self.device.clone_from(&args.device);
        }
        if args.sample_rate.is_some() {
            self.sample_rate = args.sample_rate;
        }
        if args.channels.is_some() {
            self.channels = args.channels;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!((0.0..=1.0).contains(&self.volume), "volume must be within [0, 1], got {}", self.volume);
        ensure!(self.tick_ms > 0, "tick_ms must be positive");
        Ok(())
    }
}
