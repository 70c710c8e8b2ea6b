/// Note grid: fixed number of steps, each holding a small sorted chord.
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::pitch::{transpose_clamped, Pitch};

pub const MAX_STEPS: usize = 64;
pub const MAX_POLYPHONY: usize = 6;

/// Pitch placed on step 0 of a fresh grid.
pub const DEFAULT_PITCH: Pitch = 36;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid has {len} steps, at most {MAX_STEPS} allowed")]
    TooManySteps { len: usize },
    #[error("step {step} holds {count} notes, at most {MAX_POLYPHONY} allowed")]
    TooManyNotes { step: usize, count: usize },
    #[error("step {step} has pitch {pitch} outside 0..=255")]
    PitchOutOfRange { step: usize, pitch: i64 },
}

/// One time slot. `None` is the only representation of "no notes": a chord
/// is never stored empty, always sorted ascending and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Step(Option<Vec<Pitch>>);

impl Step {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn notes(&self) -> &[Pitch] {
        self.0.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.notes().len()
    }

    pub fn contains(&self, pitch: Pitch) -> bool {
        self.notes().binary_search(&pitch).is_ok()
    }

    /// Build a step from arbitrary pitches, sorting and deduplicating them.
    /// Returns `None` when the chord would exceed `MAX_POLYPHONY`.
    pub fn from_pitches(pitches: impl IntoIterator<Item = Pitch>) -> Option<Self> {
        let mut notes: Vec<Pitch> = pitches.into_iter().collect();
        notes.sort_unstable();
        notes.dedup();
        match notes.len() {
            0 => Some(Self(None)),
            n if n > MAX_POLYPHONY => None,
            _ => Some(Self(Some(notes))),
        }
    }

    /// Copy of this step with every pitch raised by `offset`, saturating at 255.
    pub fn shifted(&self, offset: u8) -> Self {
        Self(self.0.as_ref().map(|notes| notes.iter().map(|p| p.saturating_add(offset)).collect()))
    }
}

/// Result of a single cell toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
    /// The step already holds `MAX_POLYPHONY` notes.
    Rejected,
    OutOfRange,
}

impl Toggle {
    pub fn changed(self) -> bool {
        matches!(self, Toggle::Added | Toggle::Removed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Grid {
    steps: Vec<Step>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    /// A grid with every step empty.
    pub fn new() -> Self {
        Self { steps: vec![Step::empty(); MAX_STEPS] }
    }

    /// The startup grid: a single C3 on the first step.
    pub fn with_default_note() -> Self {
        let mut grid = Self::new();
        grid.steps[0] = Step(Some(vec![DEFAULT_PITCH]));
        grid
    }

    /// Validate a raw step list, as found in a loaded snapshot.
    /// Shorter lists are padded with empty steps.
    pub fn from_raw(raw: Vec<Option<Vec<i64>>>) -> Result<Self, GridError> {
        if raw.len() > MAX_STEPS {
            return Err(GridError::TooManySteps { len: raw.len() });
        }
        let mut steps = Vec::with_capacity(MAX_STEPS);
        for (idx, entry) in raw.into_iter().enumerate() {
            let values = entry.unwrap_or_default();
            let mut pitches = Vec::with_capacity(values.len());
            for value in values {
                let pitch = Pitch::try_from(value)
                    .map_err(|_| GridError::PitchOutOfRange { step: idx, pitch: value })?;
                pitches.push(pitch);
            }
            let count = pitches.len();
            let step = Step::from_pitches(pitches)
                .ok_or(GridError::TooManyNotes { step: idx, count })?;
            steps.push(step);
        }
        steps.resize(MAX_STEPS, Step::empty());
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, idx: usize) -> Option<&Step> {
        self.steps.get(idx)
    }

    pub fn is_active(&self, idx: usize, pitch: Pitch) -> bool {
        self.steps.get(idx).is_some_and(|s| s.contains(pitch))
    }

    pub fn is_blank(&self) -> bool {
        self.steps.iter().all(Step::is_empty)
    }

    pub fn toggle(&mut self, idx: usize, pitch: Pitch) -> Toggle {
        let Some(step) = self.steps.get_mut(idx) else {
            warn!(step = idx, pitch, "toggle outside the grid ignored");
            return Toggle::OutOfRange;
        };
        let notes = step.0.get_or_insert_with(Vec::new);
        match notes.binary_search(&pitch) {
            Ok(pos) => {
                notes.remove(pos);
                if notes.is_empty() {
                    step.0 = None;
                }
                Toggle::Removed
            }
            Err(_) if notes.len() >= MAX_POLYPHONY => {
                warn!(
                    step = idx + 1,
                    pitch,
                    "max polyphony reached ({MAX_POLYPHONY} notes)"
                );
                Toggle::Rejected
            }
            Err(pos) => {
                notes.insert(pos, pitch);
                Toggle::Added
            }
        }
    }

    /// Shift every stored pitch by `semitones`, clamping each into the
    /// transposable range. Pitches that collide after clamping are merged.
    /// Returns whether any step held notes.
    pub fn transpose(&mut self, semitones: i32) -> bool {
        let mut touched = false;
        for notes in self.steps.iter_mut().filter_map(|s| s.0.as_mut()) {
            for p in notes.iter_mut() {
                *p = transpose_clamped(*p, semitones);
            }
            notes.sort_unstable();
            notes.dedup();
            touched = true;
        }
        touched
    }

    pub fn clear(&mut self) {
        self.steps.fill(Step::empty());
    }
}

/// Drop trailing empty steps. Interior gaps are kept.
pub fn trim_trailing_empty(steps: &[Step]) -> &[Step] {
    let end = steps.iter().rposition(|s| !s.is_empty()).map_or(0, |i| i + 1);
    &steps[..end]
}
