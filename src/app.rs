use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use ratatui::layout::Rect;
use tracing::{error, info};

use fmseq::{
    note_name, parse_leading_int, Change, InputEvent, NoteLength, Outcome, Pitch, Scroll,
    Sequencer, SequencerConfig, Toggle, MAX_STEPS,
};
use fmseq::viewport::{MAX_OCTAVE, VISIBLE_ROWS};

use crate::save::{self, SequenceLibrary};
use crate::ui;

/// Horizontal wheel offset that moves the grid by one step column.
pub const OFFSET_PER_STEP: f64 = 21.0;

// ── Text prompts ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    None,
    SaveName,
    ConfirmOverwrite(String),
    LoadIndex,
    Bpm,
}

// ── App state ─────────────────────────────────────────────────────────────────

pub struct App {
    pub seq:         Sequencer,
    pub cursor_step: usize,
    pub cursor_pitch: Pitch,
    /// Horizontal scroll offset of the grid, in wheel units.
    pub scroll_x:    f64,
    pub should_quit: bool,
    pub status_msg:  String,
    pub input_mode:  InputMode,
    pub input_buf:   String,

    library_path: PathBuf,
    export_path:  PathBuf,
    wheel_tick:   f64,
    min_bpm:      u32,
    dirty:        Rc<Cell<bool>>,
}

impl App {
    pub fn new(config: &SequencerConfig, library_path: PathBuf, export_path: PathBuf) -> Self {
        let dirty = Rc::new(Cell::new(true));
        let flag = Rc::clone(&dirty);
        let seq = Sequencer::new(config).with_listener(move |_: Change| flag.set(true));
        let cursor_pitch = (u16::from(seq.base_octave()) * 12) as Pitch;
        Self {
            seq,
            cursor_step:  0,
            cursor_pitch,
            scroll_x:     0.0,
            should_quit:  false,
            status_msg:   "Ready".to_string(),
            input_mode:   InputMode::None,
            input_buf:    String::new(),
            library_path,
            export_path,
            wheel_tick:   config.wheel_tick_delta,
            min_bpm:      config.min_bpm.max(1),
            dirty,
        }
    }

    /// True once after any state change or UI update; clears the flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.replace(false)
    }

    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    pub fn first_visible_step(&self) -> usize {
        ((self.scroll_x / OFFSET_PER_STEP) as usize).min(MAX_STEPS - 1)
    }

    // ── Grid editing ──────────────────────────────────────────────────────

    pub fn toggle_at(&mut self, step: usize, pitch: Pitch) {
        let outcome = self.seq.handle(InputEvent::CellToggled { step, pitch });
        self.status_msg = match outcome {
            Outcome::Toggled(Toggle::Added)   => format!("Step {}: + {}", step + 1, note_name(pitch)),
            Outcome::Toggled(Toggle::Removed) => format!("Step {}: - {}", step + 1, note_name(pitch)),
            Outcome::Toggled(Toggle::Rejected) => format!("Step {}: max polyphony reached", step + 1),
            _ => return,
        };
        self.mark_dirty();
    }

    pub fn toggle_cursor(&mut self) {
        self.toggle_at(self.cursor_step, self.cursor_pitch);
    }

    pub fn transpose(&mut self, semitones: i32) {
        if let Outcome::Transposed(true) = self.seq.handle(InputEvent::TransposeRequested(semitones)) {
            self.status_msg = format!("Transposed {:+}", semitones);
        } else {
            self.status_msg = "Nothing to transpose".to_string();
        }
        self.mark_dirty();
    }

    pub fn clear_grid(&mut self) {
        self.status_msg = if self.seq.clear() { "Grid cleared".to_string() }
                          else               { "Grid already empty".to_string() };
        self.mark_dirty();
    }

    // ── Cursor ────────────────────────────────────────────────────────────

    pub fn cursor_left(&mut self, visible_steps: usize) {
        self.cursor_step = if self.cursor_step == 0 { MAX_STEPS - 1 } else { self.cursor_step - 1 };
        self.follow_cursor(visible_steps);
    }

    pub fn cursor_right(&mut self, visible_steps: usize) {
        self.cursor_step = (self.cursor_step + 1) % MAX_STEPS;
        self.follow_cursor(visible_steps);
    }

    /// Move the cursor one semitone; leaving the window shifts the octave.
    pub fn cursor_up(&mut self) {
        let next = self.cursor_pitch.saturating_add(1);
        if !self.seq.viewport().contains(next) {
            if self.seq.base_octave() >= MAX_OCTAVE { return; }
            self.set_octave(i64::from(self.seq.base_octave()) + 1);
        }
        self.cursor_pitch = next;
        self.mark_dirty();
    }

    pub fn cursor_down(&mut self) {
        let Some(next) = self.cursor_pitch.checked_sub(1) else { return };
        if !self.seq.viewport().contains(next) {
            if self.seq.base_octave() == 0 { return; }
            self.set_octave(i64::from(self.seq.base_octave()) - 1);
        }
        self.cursor_pitch = next;
        self.mark_dirty();
    }

    fn follow_cursor(&mut self, visible_steps: usize) {
        let first = self.first_visible_step();
        let visible = visible_steps.max(1);
        if self.cursor_step < first {
            self.scroll_x = self.cursor_step as f64 * OFFSET_PER_STEP;
        } else if self.cursor_step >= first + visible {
            self.scroll_x = (self.cursor_step + 1 - visible) as f64 * OFFSET_PER_STEP;
        }
        self.mark_dirty();
    }

    /// Keep the cursor inside the visible window after it moved.
    fn clamp_cursor_pitch(&mut self) {
        let low = u16::from(self.seq.base_octave()) * 12;
        let high = low + VISIBLE_ROWS as u16 - 1;
        let clamped = u16::from(self.cursor_pitch).clamp(low, high);
        self.cursor_pitch = clamped.min(u16::from(Pitch::MAX)) as Pitch;
    }

    // ── Viewport ──────────────────────────────────────────────────────────

    pub fn set_octave(&mut self, octave: i64) {
        if let Outcome::Octave(o) = self.seq.handle(InputEvent::OctaveInputChanged(octave)) {
            self.status_msg = format!("Octave: {}", o);
        }
        self.clamp_cursor_pitch();
    }

    pub fn octave_up(&mut self) {
        self.set_octave(i64::from(self.seq.base_octave()) + 1);
    }

    pub fn octave_down(&mut self) {
        self.set_octave(i64::from(self.seq.base_octave()) - 1);
    }

    /// One wheel notch. Positive `notches` scroll down.
    pub fn wheel(&mut self, notches: f64, shift: bool) {
        let delta = notches * self.wheel_tick;
        match self.seq.handle(InputEvent::Scrolled { delta, shift }) {
            Outcome::Scrolled(Scroll::Horizontal(dx)) => {
                let max = (MAX_STEPS - 1) as f64 * OFFSET_PER_STEP;
                self.scroll_x = (self.scroll_x + dx).clamp(0.0, max);
                self.mark_dirty();
            }
            Outcome::Scrolled(Scroll::Octave(o)) => {
                self.status_msg = format!("Octave: {}", o);
                self.clamp_cursor_pitch();
            }
            _ => {}
        }
    }

    /// Mouse click inside the frame.
    pub fn click(&mut self, frame: Rect, column: u16, row: u16) {
        if let Some((step, pitch)) = ui::hit_test(frame, self, column, row) {
            self.cursor_step = step;
            self.cursor_pitch = pitch;
            self.toggle_at(step, pitch);
        }
    }

    // ── Timing ────────────────────────────────────────────────────────────

    pub fn bpm_up(&mut self) {
        let bpm = i64::from(self.seq.bpm()) + 5;
        self.set_bpm(bpm);
    }

    pub fn bpm_down(&mut self) {
        let bpm = i64::from(self.seq.bpm()) - 5;
        self.set_bpm(bpm);
    }

    fn set_bpm(&mut self, bpm: i64) {
        if let Outcome::Bpm(applied) = self.seq.handle(InputEvent::BpmInputChanged(bpm)) {
            self.status_msg = format!("BPM: {}  step {:.3}s", applied, self.seq.step_secs());
        }
    }

    pub fn cycle_note_length(&mut self, forward: bool) {
        let current = self.seq.note_length();
        let next = if forward { current.next() } else { current.prev() };
        self.set_note_length(next);
    }

    fn set_note_length(&mut self, len: NoteLength) {
        self.seq.handle(InputEvent::NoteLengthChanged(len));
        self.status_msg = format!("Note length: {}  step {:.3}s", len, self.seq.step_secs());
    }

    // ── Prompts ───────────────────────────────────────────────────────────

    pub fn begin_input(&mut self, mode: InputMode) {
        self.input_buf.clear();
        if mode == InputMode::LoadIndex {
            match SequenceLibrary::load(&self.library_path) {
                Ok(lib) if lib.sequences.is_empty() => {
                    self.status_msg = "There are no sequences saved".to_string();
                    self.mark_dirty();
                    return;
                }
                Ok(lib) => self.status_msg = lib.listing(),
                Err(e) => {
                    error!("loading library failed: {:#}", e);
                    self.status_msg = format!("Load failed: {}", e);
                    self.mark_dirty();
                    return;
                }
            }
        }
        self.input_mode = mode;
        self.mark_dirty();
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::None;
        self.input_buf.clear();
        self.status_msg = "Cancelled".to_string();
        self.mark_dirty();
    }

    pub fn commit_input(&mut self) {
        let mode = std::mem::replace(&mut self.input_mode, InputMode::None);
        let text = std::mem::take(&mut self.input_buf);
        match mode {
            InputMode::None => {}
            InputMode::SaveName => self.save_named(text.trim()),
            InputMode::ConfirmOverwrite(name) => {
                if text.trim().eq_ignore_ascii_case("y") {
                    self.write_sequence(&name);
                } else {
                    info!("save cancelled by user");
                    self.status_msg = "Save cancelled".to_string();
                }
            }
            InputMode::LoadIndex => match text.trim().parse::<usize>() {
                Ok(idx) => self.load_index(idx),
                Err(_) => self.status_msg = "Load cancelled".to_string(),
            },
            InputMode::Bpm => {
                let bpm = parse_leading_int(&text).unwrap_or(i64::from(self.min_bpm));
                self.set_bpm(bpm);
            }
        }
        self.mark_dirty();
    }

    fn save_named(&mut self, name: &str) {
        if name.is_empty() {
            self.status_msg = "Save cancelled".to_string();
            return;
        }
        match SequenceLibrary::load(&self.library_path) {
            Ok(lib) if lib.find_by_name(name).is_some() => {
                self.status_msg = format!("Sequence '{}' already exists. Overwrite? (y/n)", name);
                self.input_mode = InputMode::ConfirmOverwrite(name.to_string());
            }
            Ok(_) => self.write_sequence(name),
            Err(e) => {
                error!("loading library failed: {:#}", e);
                self.status_msg = format!("Save failed: {}", e);
            }
        }
    }

    fn write_sequence(&mut self, name: &str) {
        let result = SequenceLibrary::load(&self.library_path).and_then(|mut lib| {
            let replaced = lib.upsert(name, &self.seq.export())?;
            lib.write(&self.library_path)?;
            Ok(replaced)
        });
        self.status_msg = match result {
            Ok(true)  => { info!(name, "sequence overwritten"); format!("Sequence '{}' overwritten", name) }
            Ok(false) => { info!(name, "sequence saved"); format!("Saved '{}'", name) }
            Err(e) => {
                error!("saving sequence failed: {:#}", e);
                format!("Save failed: {}", e)
            }
        };
    }

    fn load_index(&mut self, idx: usize) {
        let patch = SequenceLibrary::load(&self.library_path).and_then(|lib| lib.patch(idx));
        match patch {
            Ok(patch) => {
                if let Outcome::Loaded(report) = self.seq.handle(InputEvent::LoadRequested(patch)) {
                    self.status_msg = if report.is_clean() {
                        format!("Loaded sequence #{}", idx)
                    } else {
                        let reasons: Vec<String> = report.rejected.iter().map(|(_, e)| e.to_string()).collect();
                        format!("Loaded #{} with errors: {}", idx, reasons.join("; "))
                    };
                }
                self.clamp_cursor_pitch();
            }
            Err(e) => {
                error!("loading sequence failed: {:#}", e);
                self.status_msg = format!("Load failed: {}", e);
            }
        }
    }

    pub fn export_playback(&mut self) {
        let req = self.seq.playback_request();
        if req.is_silent() {
            self.status_msg = "Nothing to export".to_string();
        } else {
            self.status_msg = match save::write_playback(&self.export_path, &req) {
                Ok(()) => {
                    info!(path = %self.export_path.display(), steps = req.grid.len(), "playback exported");
                    format!("Exported {} steps ({:.2}s) to {}", req.grid.len(), req.duration_secs(),
                            self.export_path.display())
                }
                Err(e) => {
                    error!("export failed: {:#}", e);
                    format!("Export failed: {}", e)
                }
            };
        }
        self.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        let dir = std::env::temp_dir();
        let tag = std::process::id();
        App::new(
            &SequencerConfig::default(),
            dir.join(format!("fmseq-app-{tag}-lib.json")),
            dir.join(format!("fmseq-app-{tag}-play.json")),
        )
    }

    #[test]
    fn test_listener_marks_dirty() {
        let mut app = app();
        assert!(app.take_dirty());
        assert!(!app.take_dirty());
        app.seq.toggle_note(1, 40);
        assert!(app.take_dirty());
    }

    #[test]
    fn test_cursor_crosses_octave_window() {
        let mut app = app();
        assert_eq!(app.cursor_pitch, 36);
        app.cursor_down();
        assert_eq!(app.cursor_pitch, 35);
        assert_eq!(app.seq.base_octave(), 2);
    }

    #[test]
    fn test_horizontal_wheel_moves_columns() {
        let mut app = app();
        app.wheel(1.0, true);
        assert_eq!(app.first_visible_step(), 1);
        app.wheel(-5.0, true);
        assert_eq!(app.first_visible_step(), 0);
    }

    #[test]
    fn test_vertical_wheel_needs_three_notches() {
        let mut app = app();
        app.wheel(1.0, false);
        app.wheel(1.0, false);
        assert_eq!(app.seq.base_octave(), 3);
        app.wheel(1.0, false);
        assert_eq!(app.seq.base_octave(), 2);
    }

    #[test]
    fn test_bpm_prompt_falls_back_to_minimum() {
        let mut app = app();
        app.begin_input(InputMode::Bpm);
        app.input_buf = "fast".to_string();
        app.commit_input();
        assert_eq!(app.seq.bpm(), 20);
    }

    #[test]
    fn test_empty_save_name_cancels() {
        let mut app = app();
        app.begin_input(InputMode::SaveName);
        app.commit_input();
        assert_eq!(app.status_msg, "Save cancelled");
        assert_eq!(app.input_mode, InputMode::None);
    }
}
