/// Hand-off to the audio renderer: a normalized copy of the grid plus the
/// step length. The live grid is never touched.
use serde::Serialize;

use crate::grid::{trim_trailing_empty, Grid, Step};

/// The renderer sounds one octave above the edited register.
pub const PLAYBACK_OCTAVE_OFFSET: u8 = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackRequest {
    pub grid: Vec<Step>,
    /// Seconds per step.
    pub step_len: f64,
}

impl PlaybackRequest {
    pub fn new(grid: &Grid, step_len: f64) -> Self {
        let grid = trim_trailing_empty(grid.steps())
            .iter()
            .map(|s| s.shifted(PLAYBACK_OCTAVE_OFFSET))
            .collect();
        Self { grid, step_len }
    }

    pub fn is_silent(&self) -> bool {
        self.grid.is_empty()
    }

    /// Total length of the rendered sequence in seconds, release tail excluded.
    pub fn duration_secs(&self) -> f64 {
        self.grid.len() as f64 * self.step_len
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
