//! Breathing pattern catalog.
//!
//! The built-in table is immutable process-wide state. [`PatternCatalog`]
//! layers validated user patterns on top of it; custom keys shadow built-in ones.

use std::borrow::Cow;

use crate::error::{BreathError, Result};
use crate::pattern::{BreathingPattern, PhaseDurations};

/// Pattern selected when nothing else is configured.
pub const DEFAULT_PATTERN: &str = "4-7-8";

const fn builtin(
    key: &'static str,
    name: &'static str,
    description: &'static str,
    durations: PhaseDurations,
    cycle_count: u32,
) -> BreathingPattern {
    BreathingPattern {
        key: Cow::Borrowed(key),
        name: Cow::Borrowed(name),
        description: Cow::Borrowed(description),
        phase_durations: durations,
        cycle_count,
    }
}

/// Built-in patterns, in display order.
pub static BUILTIN: [BreathingPattern; 4] = [
    builtin(
        "4-7-8",
        "4-7-8 Relaxation",
        "Inhale for 4, hold for 7, exhale for 8",
        PhaseDurations::new(4.0, 7.0, 8.0, 0.0),
        4,
    ),
    builtin(
        "4-4-4",
        "Box Breathing",
        "Inhale 4, hold 4, exhale 4, hold 4",
        PhaseDurations::new(4.0, 4.0, 4.0, 4.0),
        6,
    ),
    builtin(
        "4-6",
        "Calm Breathing",
        "Inhale for 4, exhale for 6",
        PhaseDurations::new(4.0, 0.0, 6.0, 0.0),
        8,
    ),
    builtin(
        "6-2-6",
        "Deep Relaxation",
        "Inhale for 6, hold for 2, exhale for 6",
        PhaseDurations::new(6.0, 2.0, 6.0, 0.0),
        5,
    ),
];

/// Look up a built-in pattern by key.
pub fn lookup(key: &str) -> Result<&'static BreathingPattern> {
    BUILTIN
        .iter()
        .find(|p| p.key == key)
        .ok_or_else(|| BreathError::UnknownPattern(key.to_string()))
}

/// Keys of the built-in patterns.
pub fn keys() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|p| p.key.as_ref())
}

/// Built-in patterns plus validated user-supplied ones.
#[derive(Debug, Clone, Default)]
pub struct PatternCatalog {
    custom: Vec<BreathingPattern>,
}

impl PatternCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom(patterns: impl IntoIterator<Item = BreathingPattern>) -> Result<Self> {
        let mut catalog = Self::new();
        for p in patterns {
            catalog.insert(p)?;
        }
        Ok(catalog)
    }

    /// Add (or replace) a custom pattern. Invalid patterns are rejected.
    pub fn insert(&mut self, pattern: BreathingPattern) -> Result<()> {
        pattern.validate()?;
        if lookup(&pattern.key).is_ok() {
            log::info!("custom pattern '{}' shadows the built-in one", pattern.key);
        }
        match self.custom.iter_mut().find(|p| p.key == pattern.key) {
            Some(slot) => *slot = pattern,
            None => self.custom.push(pattern),
        }
        Ok(())
    }

    pub fn lookup(&self, key: &str) -> Result<&BreathingPattern> {
        match self.custom.iter().find(|p| p.key == key) {
            Some(p) => Ok(p),
            None => lookup(key),
        }
    }

    /// Every reachable pattern: custom first, then unshadowed built-ins.
    pub fn iter(&self) -> impl Iterator<Item = &BreathingPattern> {
        let shadowed = |key: &str| self.custom.iter().any(|c| c.key == key);
        self.custom
            .iter()
            .chain(BUILTIN.iter().filter(move |b| !shadowed(b.key.as_ref())))
    }
}
