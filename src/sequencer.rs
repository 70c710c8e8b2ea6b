/// The sequencer store: grid, viewport and timing behind one owner.
///
/// All mutation goes through the methods here. Each mutating call finishes
/// synchronously and then tells the listener (usually the renderer) what
/// changed, so two quick edits produce two notifications.
use tracing::{debug, info, warn};

use crate::config::SequencerConfig;
use crate::grid::{Grid, Toggle};
use crate::pitch::Pitch;
use crate::playback::PlaybackRequest;
use crate::snapshot::{Field, ImportReport, Snapshot, SnapshotPatch};
use crate::timing::{NoteLength, Timing};
use crate::viewport::{Scroll, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Grid,
    Viewport,
    Timing,
    /// The grid was replaced by an import.
    Loaded,
}

/// Receives a notification after every state change.
pub trait Listener {
    fn state_changed(&mut self, change: Change);
}

impl<F: FnMut(Change)> Listener for F {
    fn state_changed(&mut self, change: Change) {
        self(change)
    }
}

pub struct Sequencer {
    grid: Grid,
    viewport: Viewport,
    timing: Timing,
    listener: Option<Box<dyn Listener>>,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(&SequencerConfig::default())
    }
}

impl Sequencer {
    pub fn new(config: &SequencerConfig) -> Self {
        let config = config.clone().normalized();
        Self {
            grid: Grid::with_default_note(),
            viewport: Viewport::new(
                i64::from(config.base_octave),
                config.scroll_threshold,
                config.horizontal_scroll_factor,
            ),
            timing: Timing::new(
                i64::from(config.bpm),
                config.note_length,
                config.min_bpm,
                config.max_bpm,
            ),
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: impl Listener + 'static) -> Self {
        self.set_listener(listener);
        self
    }

    pub fn set_listener(&mut self, listener: impl Listener + 'static) {
        self.listener = Some(Box::new(listener));
    }

    fn notify(&mut self, change: Change) {
        debug!(?change, "state changed");
        if let Some(listener) = self.listener.as_mut() {
            listener.state_changed(change);
        }
    }

    // ── Read access ───────────────────────────────────────────────────────

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn base_octave(&self) -> u8 {
        self.viewport.base_octave()
    }

    pub fn bpm(&self) -> u32 {
        self.timing.bpm()
    }

    pub fn note_length(&self) -> NoteLength {
        self.timing.note_length()
    }

    pub fn step_secs(&self) -> f64 {
        self.timing.step_secs()
    }

    pub fn is_active(&self, step: usize, pitch: Pitch) -> bool {
        self.grid.is_active(step, pitch)
    }

    // ── Grid ──────────────────────────────────────────────────────────────

    pub fn toggle_note(&mut self, step: usize, pitch: Pitch) -> Toggle {
        let outcome = self.grid.toggle(step, pitch);
        if outcome.changed() {
            self.notify(Change::Grid);
        }
        outcome
    }

    /// Returns whether the grid held any notes (and so was redrawn).
    pub fn transpose_all(&mut self, semitones: i32) -> bool {
        let touched = self.grid.transpose(semitones);
        if touched {
            self.notify(Change::Grid);
        }
        touched
    }

    pub fn clear(&mut self) -> bool {
        if self.grid.is_blank() {
            return false;
        }
        self.grid.clear();
        self.notify(Change::Grid);
        true
    }

    // ── Viewport ──────────────────────────────────────────────────────────

    pub fn scroll(&mut self, delta: f64, horizontal: bool) -> Scroll {
        let outcome = self.viewport.scroll(delta, horizontal);
        if let Scroll::Octave(_) = outcome {
            self.notify(Change::Viewport);
        }
        outcome
    }

    pub fn set_base_octave(&mut self, octave: i64) -> u8 {
        let applied = self.viewport.set_base_octave(octave);
        self.notify(Change::Viewport);
        applied
    }

    // ── Timing ────────────────────────────────────────────────────────────

    pub fn set_tempo(&mut self, bpm: i64) -> u32 {
        let applied = self.timing.set_tempo(bpm);
        self.notify(Change::Timing);
        applied
    }

    pub fn set_note_length(&mut self, note_length: NoteLength) {
        self.timing.set_note_length(note_length);
        self.notify(Change::Timing);
    }

    // ── Serialization ─────────────────────────────────────────────────────

    pub fn export(&self) -> Snapshot {
        Snapshot {
            sequence: self.grid.clone(),
            base_octave: self.viewport.base_octave(),
            bpm: self.timing.bpm(),
            note_length: self.timing.note_length(),
        }
    }

    /// Apply each present field independently through the live setters.
    /// Invalid fields are skipped and reported; the rest still apply.
    pub fn import(&mut self, patch: &SnapshotPatch) -> ImportReport {
        let mut report = ImportReport::default();

        match patch.grid() {
            Some(Ok(grid)) => {
                self.grid = grid;
                self.notify(Change::Loaded);
                report.applied.push(Field::Sequence);
            }
            Some(Err(e)) => {
                warn!(error = %e, "snapshot sequence rejected");
                report.rejected.push((Field::Sequence, e));
            }
            None => {}
        }
        if let Some(octave) = patch.octave() {
            self.set_base_octave(octave);
            report.applied.push(Field::BaseOctave);
        }
        if let Some(bpm) = patch.tempo() {
            self.set_tempo(bpm);
            report.applied.push(Field::Bpm);
        }
        match patch.note_length() {
            Some(Ok(len)) => {
                self.set_note_length(len);
                report.applied.push(Field::NoteType);
            }
            Some(Err(e)) => {
                warn!(error = %e, "snapshot note length rejected");
                report.rejected.push((Field::NoteType, e));
            }
            None => {}
        }

        info!(applied = report.applied.len(), rejected = report.rejected.len(), "snapshot imported");
        report
    }

    pub fn playback_request(&self) -> PlaybackRequest {
        PlaybackRequest::new(&self.grid, self.timing.step_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{MAX_POLYPHONY, MAX_STEPS};
    use crate::snapshot::SnapshotError;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorded() -> (Sequencer, Rc<RefCell<Vec<Change>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let seq = Sequencer::default().with_listener(move |c: Change| sink.borrow_mut().push(c));
        (seq, log)
    }

    #[test]
    fn test_starts_with_default_note() {
        let seq = Sequencer::default();
        assert!(seq.is_active(0, 36));
        assert_eq!(seq.base_octave(), 3);
        assert_eq!(seq.bpm(), 120);
        assert_eq!(seq.step_secs(), 0.5);
    }

    #[test]
    fn test_toggle_notifies_only_on_change() {
        let (mut seq, log) = recorded();
        for p in 60..60 + MAX_POLYPHONY as u8 {
            seq.toggle_note(3, p);
        }
        assert_eq!(seq.toggle_note(3, 90), Toggle::Rejected);
        assert_eq!(seq.toggle_note(MAX_STEPS, 60), Toggle::OutOfRange);
        assert_eq!(log.borrow().len(), MAX_POLYPHONY);
        assert!(log.borrow().iter().all(|c| *c == Change::Grid));
    }

    #[test]
    fn test_transpose_notifies_when_notes_exist() {
        let (mut seq, log) = recorded();
        assert!(seq.transpose_all(2));
        assert!(seq.is_active(0, 38));
        assert!(seq.clear());
        assert!(!seq.transpose_all(2));
        assert!(!seq.clear());
        assert_eq!(*log.borrow(), vec![Change::Grid, Change::Grid]);
    }

    #[test]
    fn test_scroll_notifies_on_octave_shift() {
        let (mut seq, log) = recorded();
        seq.scroll(10.0, false);
        seq.scroll(10.0, true);
        assert!(log.borrow().is_empty());
        seq.scroll(25.0, false);
        assert_eq!(*log.borrow(), vec![Change::Viewport]);
        assert_eq!(seq.base_octave(), 2);
    }

    #[test]
    fn test_set_base_octave_always_notifies() {
        let (mut seq, log) = recorded();
        assert_eq!(seq.set_base_octave(3), 3);
        assert_eq!(seq.set_base_octave(42), 8);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_timing_setters() {
        let mut seq = Sequencer::default();
        assert_eq!(seq.set_tempo(0), 20);
        seq.set_tempo(60);
        seq.set_note_length(NoteLength::Eighth);
        assert_eq!(seq.step_secs(), 0.5);
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut seq = Sequencer::default();
        seq.toggle_note(5, 64);
        seq.toggle_note(5, 67);
        seq.set_base_octave(5);
        seq.set_tempo(93);
        seq.set_note_length(NoteLength::DottedEighth);
        let snap = seq.export();

        let report = seq.import(&SnapshotPatch::from(&snap));
        assert!(report.is_clean());
        assert_eq!(seq.export(), snap);

        let mut fresh = Sequencer::default();
        let patch = SnapshotPatch::from_json(&snap.to_json().unwrap()).unwrap();
        fresh.import(&patch);
        assert_eq!(fresh.export(), snap);
    }

    #[test]
    fn test_export_is_a_copy() {
        let mut seq = Sequencer::default();
        let snap = seq.export();
        seq.toggle_note(1, 50);
        assert!(!snap.sequence.is_active(1, 50));
    }

    #[test]
    fn test_import_merges_missing_fields() {
        let mut seq = Sequencer::default();
        seq.set_tempo(140);
        let patch = SnapshotPatch::from_json(r#"{"baseOctave": 6}"#).unwrap();
        let report = seq.import(&patch);
        assert_eq!(report.applied, vec![Field::BaseOctave]);
        assert_eq!(seq.base_octave(), 6);
        assert_eq!(seq.bpm(), 140);
        assert!(seq.is_active(0, 36));
    }

    #[test]
    fn test_import_clamps_through_setters() {
        let mut seq = Sequencer::default();
        let patch = SnapshotPatch::from_json(r#"{"baseOctave": 40, "bpm": 5}"#).unwrap();
        seq.import(&patch);
        assert_eq!(seq.base_octave(), 8);
        assert_eq!(seq.bpm(), 20);
        assert!(seq.step_secs().is_finite());

        let patch = SnapshotPatch::from_json(r#"{"baseOctave": -2, "bpm": -40}"#).unwrap();
        seq.import(&patch);
        assert_eq!(seq.base_octave(), 0);
        assert_eq!(seq.bpm(), 20);
    }

    #[test]
    fn test_import_ignores_zero_scalars() {
        let (mut seq, log) = recorded();
        seq.set_tempo(140);
        seq.set_base_octave(5);
        log.borrow_mut().clear();

        let patch = SnapshotPatch::from_json(r#"{"bpm": 0, "baseOctave": 0, "note_type": ""}"#).unwrap();
        let report = seq.import(&patch);
        assert!(report.applied.is_empty());
        assert!(report.is_clean());
        assert_eq!(seq.bpm(), 140);
        assert_eq!(seq.base_octave(), 5);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_empty_sequence_still_replaces_grid() {
        let mut seq = Sequencer::default();
        let report = seq.import(&SnapshotPatch::from_json(r#"{"sequence": []}"#).unwrap());
        assert_eq!(report.applied, vec![Field::Sequence]);
        assert!(seq.grid().is_blank());
    }

    #[test]
    fn test_new_normalizes_config() {
        let config = SequencerConfig {
            scroll_threshold: 0.0,
            min_bpm: 0,
            ..SequencerConfig::default()
        };
        let mut seq = Sequencer::new(&config);
        assert_eq!(seq.scroll(0.0, false), Scroll::Accumulating);
        assert_eq!(seq.scroll(5.0, false), Scroll::Accumulating);
        assert_eq!(seq.base_octave(), 3);
        assert_eq!(seq.set_tempo(0), 1);
        assert!(seq.step_secs().is_finite());

        let config = SequencerConfig { scroll_threshold: f64::NAN, ..SequencerConfig::default() };
        let mut seq = Sequencer::new(&config);
        assert_eq!(seq.scroll(0.0, false), Scroll::Accumulating);
    }

    #[test]
    fn test_import_rejects_bad_grid_but_applies_rest() {
        let (mut seq, log) = recorded();
        let patch = SnapshotPatch::from_json(
            r#"{"sequence": [[1,2,3,4,5,6,7]], "bpm": 100, "note_type": "nope"}"#,
        )
        .unwrap();
        let report = seq.import(&patch);
        assert_eq!(report.applied, vec![Field::Bpm]);
        assert_eq!(report.rejected.len(), 2);
        assert!(matches!(report.rejected[0], (Field::Sequence, SnapshotError::Grid(_))));
        assert!(matches!(report.rejected[1], (Field::NoteType, SnapshotError::NoteLength(_))));
        assert!(seq.is_active(0, 36));
        assert_eq!(seq.bpm(), 100);
        assert_eq!(*log.borrow(), vec![Change::Timing]);
    }

    #[test]
    fn test_playback_request_uses_current_timing() {
        let mut seq = Sequencer::default();
        seq.toggle_note(2, 40);
        seq.set_note_length(NoteLength::Sixteenth);
        let req = seq.playback_request();
        assert_eq!(req.grid.len(), 3);
        assert_eq!(req.grid[0].notes(), &[48]);
        assert_eq!(req.step_len, 0.125);
        assert!(seq.is_active(0, 36));
    }
}
