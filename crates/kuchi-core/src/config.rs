//! Configuration
//!
//! Every section has a working default; a JSON file only needs the fields it
//! changes. Durations are written as human-readable strings ("40ms", "2s").

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::{CharacterFamily, KuchiError, KuchiResult};

/// Lip-sync sampling configuration
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LipSyncConfig {
    /// Cadence of spectrum sampling while audio plays
    #[serde(deserialize_with = "deserialize_duration")]
    pub sample_interval: Duration,
    /// Analyser transform size; half of it is the number of bins
    pub fft_size: usize,
    /// Averaging constant between successive analyser reads [0.0 - 1.0)
    pub smoothing: f32,
    /// Magnitude mapped to byte 0
    pub min_decibels: f32,
    /// Magnitude mapped to byte 255
    pub max_decibels: f32,
}

impl Default for LipSyncConfig {
    fn default() -> Self {
        LipSyncConfig {
            sample_interval: Duration::from_millis(40),
            fft_size: 512,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

/// Which controls go busy while a session plays
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlScope {
    /// Every playback control is disabled while anything plays
    #[default]
    Global,
    /// Only the playing slot's controls are disabled
    PerSlot,
}

/// Sprite location
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub base: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        AssetConfig {
            base: "/static/assets".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `KUCHI_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Millisecond range, lower bound inclusive, upper bound exclusive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct MillisRange {
    pub min: u64,
    pub max: u64,
}

impl MillisRange {
    pub const fn new(min: u64, max: u64) -> Self {
        MillisRange { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min < self.max
    }

    pub fn contains(&self, d: Duration) -> bool {
        let ms = d.as_millis() as u64;
        ms >= self.min && ms < self.max
    }
}

/// Blink timing for one character family
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct BlinkTiming {
    /// Delay before the first blink
    pub initial_delay: MillisRange,
    /// Period of the repeating blink check, drawn once per attach
    pub interval: MillisRange,
    /// How long the eyes stay closed
    pub hold: MillisRange,
    /// Chance that a periodic check actually blinks [0.0 - 1.0]
    pub probability: f64,
}

impl BlinkTiming {
    pub fn validate(&self) -> KuchiResult<()> {
        for (name, range) in [
            ("initial_delay", self.initial_delay),
            ("interval", self.interval),
            ("hold", self.hold),
        ] {
            if !range.is_valid() {
                return Err(KuchiError::Config(format!(
                    "blink {name} range {}..{} is empty",
                    range.min, range.max
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(KuchiError::Config(format!(
                "blink probability {} outside [0, 1]",
                self.probability
            )));
        }
        if self.hold.max > self.interval.min {
            return Err(KuchiError::Config(
                "blink hold must be shorter than the blink interval".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct KuchiConfig {
    pub lipsync: LipSyncConfig,
    pub assets: AssetConfig,
    pub controls: ControlScope,
    pub logging: LoggingConfig,
    /// Per-family replacements for the built-in blink table
    pub blink_overrides: HashMap<CharacterFamily, BlinkTiming>,
}

impl KuchiConfig {
    pub fn from_json_str(body: &str) -> KuchiResult<Self> {
        let config: KuchiConfig =
            serde_json::from_str(body).map_err(|e| KuchiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> KuchiResult<Self> {
        let path = path.as_ref();
        let body = std::fs::read_to_string(path)
            .map_err(|e| KuchiError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&body)
    }

    pub fn validate(&self) -> KuchiResult<()> {
        let lipsync = &self.lipsync;
        if lipsync.sample_interval.is_zero() {
            return Err(KuchiError::Config("sample_interval must be positive".into()));
        }
        if lipsync.fft_size < 32 || !lipsync.fft_size.is_power_of_two() {
            return Err(KuchiError::Config(format!(
                "fft_size {} must be a power of two >= 32",
                lipsync.fft_size
            )));
        }
        if !(0.0..1.0).contains(&lipsync.smoothing) {
            return Err(KuchiError::Config(format!(
                "smoothing {} outside [0, 1)",
                lipsync.smoothing
            )));
        }
        if lipsync.min_decibels >= lipsync.max_decibels {
            return Err(KuchiError::Config("min_decibels must be below max_decibels".into()));
        }
        for timing in self.blink_overrides.values() {
            timing.validate()?;
        }
        Ok(())
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}
