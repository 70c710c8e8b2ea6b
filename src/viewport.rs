/// Visible pitch window over the grid and the wheel handling that moves it.
use tracing::debug;

use crate::pitch::Pitch;

pub const MIN_OCTAVE: u8 = 0;
pub const MAX_OCTAVE: u8 = 8;
pub const VISIBLE_OCTAVES: u8 = 3;
pub const VISIBLE_ROWS: usize = VISIBLE_OCTAVES as usize * 12;

pub const DEFAULT_SCROLL_THRESHOLD: f64 = 30.0;
pub const DEFAULT_HORIZONTAL_FACTOR: f64 = 2.1;

/// What a wheel event did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scroll {
    /// Horizontal offset change for the render surface; the window is unchanged.
    Horizontal(f64),
    /// Below threshold, stored in the accumulator.
    Accumulating,
    /// Threshold crossed; the new (clamped) base octave.
    Octave(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    base_octave: u8,
    accumulator: f64,
    threshold: f64,
    horizontal_factor: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(3, DEFAULT_SCROLL_THRESHOLD, DEFAULT_HORIZONTAL_FACTOR)
    }
}

fn clamp_octave(value: i64) -> u8 {
    value.clamp(i64::from(MIN_OCTAVE), i64::from(MAX_OCTAVE)) as u8
}

impl Viewport {
    pub fn new(base_octave: i64, threshold: f64, horizontal_factor: f64) -> Self {
        Self {
            base_octave: clamp_octave(base_octave),
            accumulator: 0.0,
            threshold,
            horizontal_factor,
        }
    }

    pub fn base_octave(&self) -> u8 {
        self.base_octave
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    pub fn set_base_octave(&mut self, value: i64) -> u8 {
        self.base_octave = clamp_octave(value);
        self.base_octave
    }

    /// Feed one wheel event.
    ///
    /// With `horizontal` held the delta is scaled and handed back for the
    /// render surface. Otherwise deltas accumulate until their sum reaches
    /// the threshold, then the window moves one octave against the scroll
    /// direction and the accumulator resets. Small deltas from
    /// high-resolution wheels therefore never skip octaves.
    pub fn scroll(&mut self, delta: f64, horizontal: bool) -> Scroll {
        if !delta.is_finite() {
            return Scroll::Accumulating;
        }
        if horizontal {
            return Scroll::Horizontal(delta * self.horizontal_factor);
        }
        self.accumulator += delta;
        if self.accumulator.abs() < self.threshold {
            return Scroll::Accumulating;
        }
        let direction: i64 = if self.accumulator > 0.0 { -1 } else { 1 };
        self.accumulator = 0.0;
        let octave = self.set_base_octave(i64::from(self.base_octave) + direction);
        debug!(octave, "octave scrolled");
        Scroll::Octave(octave)
    }

    pub fn lowest_pitch(&self) -> u16 {
        u16::from(self.base_octave) * 12
    }

    pub fn contains(&self, pitch: Pitch) -> bool {
        let low = self.lowest_pitch();
        (low..low + VISIBLE_ROWS as u16).contains(&u16::from(pitch))
    }

    /// Visible rows, highest pitch first.
    pub fn rows(&self) -> impl Iterator<Item = Pitch> {
        let low = self.lowest_pitch();
        (low..low + VISIBLE_ROWS as u16)
            .rev()
            .filter_map(|p| Pitch::try_from(p).ok())
    }
}
