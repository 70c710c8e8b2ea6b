use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::timing::NoteLength;
use crate::viewport::{DEFAULT_HORIZONTAL_FACTOR, DEFAULT_SCROLL_THRESHOLD, MAX_OCTAVE};

/// Tunables for the sequencer store. Every field falls back to its default
/// when missing from the config file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub min_bpm: u32,
    pub max_bpm: u32,
    pub bpm: u32,
    pub base_octave: u8,
    pub note_length: NoteLength,
    /// Accumulated wheel delta needed for one octave shift.
    pub scroll_threshold: f64,
    /// Multiplier applied to horizontal wheel deltas.
    pub horizontal_scroll_factor: f64,
    /// Delta reported per notch by line-based wheels (terminals).
    pub wheel_tick_delta: f64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            min_bpm: 20,
            max_bpm: 300,
            bpm: 120,
            base_octave: 3,
            note_length: NoteLength::Quarter,
            scroll_threshold: DEFAULT_SCROLL_THRESHOLD,
            horizontal_scroll_factor: DEFAULT_HORIZONTAL_FACTOR,
            wheel_tick_delta: 10.0,
        }
    }
}

impl SequencerConfig {
    /// Repair values that would break the store's invariants.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        self.min_bpm = self.min_bpm.max(1);
        self.max_bpm = self.max_bpm.max(self.min_bpm);
        self.bpm = self.bpm.clamp(self.min_bpm, self.max_bpm);
        self.base_octave = self.base_octave.min(MAX_OCTAVE);
        if !(self.scroll_threshold.is_finite() && self.scroll_threshold > 0.0) {
            self.scroll_threshold = defaults.scroll_threshold;
        }
        if !self.horizontal_scroll_factor.is_finite() {
            self.horizontal_scroll_factor = defaults.horizontal_scroll_factor;
        }
        if !(self.wheel_tick_delta.is_finite() && self.wheel_tick_delta > 0.0) {
            self.wheel_tick_delta = defaults.wheel_tick_delta;
        }
        self
    }

    pub fn from_json(data: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(data).context("invalid sequencer config")?;
        Ok(config.normalized())
    }

    /// Read a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = SequencerConfig::from_json(r#"{ "bpm": 90, "note_length": "eighth" }"#).unwrap();
        assert_eq!(cfg.bpm, 90);
        assert_eq!(cfg.note_length, NoteLength::Eighth);
        assert_eq!(cfg.scroll_threshold, 30.0);
        assert_eq!(cfg.min_bpm, 20);
    }

    #[test]
    fn test_normalizes_bad_values() {
        let cfg = SequencerConfig::from_json(
            r#"{ "min_bpm": 0, "max_bpm": 0, "bpm": 0, "base_octave": 12, "scroll_threshold": -1 }"#,
        )
        .unwrap();
        assert_eq!((cfg.min_bpm, cfg.max_bpm, cfg.bpm), (1, 1, 1));
        assert_eq!(cfg.base_octave, MAX_OCTAVE);
        assert_eq!(cfg.scroll_threshold, 30.0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(SequencerConfig::from_json("not json").is_err());
        assert!(SequencerConfig::from_json(r#"{ "note_length": "forever" }"#).is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("fmseq-config-does-not-exist.json");
        assert_eq!(SequencerConfig::load(&path).unwrap(), SequencerConfig::default());
    }
}
