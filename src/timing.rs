/// Tempo and note length, and the step duration derived from them.
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Seconds per step for a tempo and a note length expressed in beats.
/// A zero tempo is treated as 1 bpm so the result is always finite.
pub fn step_duration(bpm: u32, beats: f64) -> f64 {
    60.0 / f64::from(bpm.max(1)) * beats
}

/// Step length selector. Each variant is a fixed multiple of one beat
/// (a quarter note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteLength {
    Whole,
    DottedHalf,
    Half,
    DottedQuarter,
    #[default]
    Quarter,
    TripletQuarter,
    DottedEighth,
    Eighth,
    TripletEighth,
    Sixteenth,
    ThirtySecond,
}

// token, legacy numeric spellings, (numerator, denominator) in beats
static TABLE: [(NoteLength, &str, &[&str], (u32, u32)); 11] = [
    (NoteLength::Whole,          "whole",           &["4"],            (4, 1)),
    (NoteLength::DottedHalf,     "dotted-half",     &["3"],            (3, 1)),
    (NoteLength::Half,           "half",            &["2"],            (2, 1)),
    (NoteLength::DottedQuarter,  "dotted-quarter",  &["1.5", "3/2"],   (3, 2)),
    (NoteLength::Quarter,        "quarter",         &["1"],            (1, 1)),
    (NoteLength::TripletQuarter, "triplet-quarter", &["2/3"],          (2, 3)),
    (NoteLength::DottedEighth,   "dotted-eighth",   &["0.75", "3/4"],  (3, 4)),
    (NoteLength::Eighth,         "eighth",          &["0.5", "1/2"],   (1, 2)),
    (NoteLength::TripletEighth,  "triplet-eighth",  &["1/3"],          (1, 3)),
    (NoteLength::Sixteenth,      "sixteenth",       &["0.25", "1/4"],  (1, 4)),
    (NoteLength::ThirtySecond,   "thirty-second",   &["0.125", "1/8"], (1, 8)),
];

impl NoteLength {
    pub const ALL: [NoteLength; 11] = [
        NoteLength::Whole,
        NoteLength::DottedHalf,
        NoteLength::Half,
        NoteLength::DottedQuarter,
        NoteLength::Quarter,
        NoteLength::TripletQuarter,
        NoteLength::DottedEighth,
        NoteLength::Eighth,
        NoteLength::TripletEighth,
        NoteLength::Sixteenth,
        NoteLength::ThirtySecond,
    ];

    fn entry(self) -> &'static (NoteLength, &'static str, &'static [&'static str], (u32, u32)) {
        // TABLE and ALL share the same order
        &TABLE[self as usize]
    }

    /// Stable name stored in snapshots.
    pub fn token(self) -> &'static str {
        self.entry().1
    }

    /// Resolve a stored token. Accepts the named tokens and the numeric
    /// spellings written by older snapshots ("1", "0.5", "1/4", ...).
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        TABLE
            .iter()
            .find(|(_, name, legacy, _)| *name == token || legacy.contains(&token))
            .map(|(len, ..)| *len)
    }

    pub fn ratio(self) -> (u32, u32) {
        self.entry().3
    }

    /// Length in beats.
    pub fn beats(self) -> f64 {
        let (num, den) = self.ratio();
        f64::from(num) / f64::from(den)
    }

    pub fn next(self) -> Self {
        let idx = self as usize;
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = self as usize;
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for NoteLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    bpm: u32,
    note_length: NoteLength,
    step_secs: f64,
    min_bpm: u32,
    max_bpm: u32,
}

impl Timing {
    /// `min_bpm` is raised to 1 and `max_bpm` to `min_bpm` if needed.
    pub fn new(bpm: i64, note_length: NoteLength, min_bpm: u32, max_bpm: u32) -> Self {
        let min_bpm = min_bpm.max(1);
        let max_bpm = max_bpm.max(min_bpm);
        let mut timing = Self { bpm: min_bpm, note_length, step_secs: 0.0, min_bpm, max_bpm };
        timing.set_tempo(bpm);
        timing
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn note_length(&self) -> NoteLength {
        self.note_length
    }

    pub fn bounds(&self) -> (u32, u32) {
        (self.min_bpm, self.max_bpm)
    }

    /// Seconds per step.
    pub fn step_secs(&self) -> f64 {
        self.step_secs
    }

    pub fn step_duration(&self) -> Duration {
        Duration::from_secs_f64(self.step_secs)
    }

    /// Clamp into the configured bounds and recompute. Returns the applied tempo.
    pub fn set_tempo(&mut self, bpm: i64) -> u32 {
        let clamped = bpm.clamp(i64::from(self.min_bpm), i64::from(self.max_bpm)) as u32;
        if i64::from(clamped) != bpm {
            debug!(requested = bpm, applied = clamped, "bpm clamped");
        }
        self.bpm = clamped;
        self.recompute();
        clamped
    }

    pub fn set_note_length(&mut self, note_length: NoteLength) {
        self.note_length = note_length;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.step_secs = step_duration(self.bpm, self.note_length.beats());
    }
}
