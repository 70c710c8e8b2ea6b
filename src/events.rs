/// Inbound input events and their dispatch onto the store.
use crate::grid::Toggle;
use crate::pitch::Pitch;
use crate::sequencer::Sequencer;
use crate::snapshot::{ImportReport, SnapshotPatch};
use crate::timing::NoteLength;
use crate::viewport::Scroll;

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    CellToggled { step: usize, pitch: Pitch },
    Scrolled { delta: f64, shift: bool },
    OctaveInputChanged(i64),
    BpmInputChanged(i64),
    NoteLengthChanged(NoteLength),
    TransposeRequested(i32),
    LoadRequested(SnapshotPatch),
}

/// What handling an event did, for status lines and tests.
#[derive(Debug)]
pub enum Outcome {
    Toggled(Toggle),
    Scrolled(Scroll),
    Octave(u8),
    Bpm(u32),
    NoteLength(NoteLength),
    Transposed(bool),
    Loaded(ImportReport),
}

impl Sequencer {
    pub fn handle(&mut self, event: InputEvent) -> Outcome {
        match event {
            InputEvent::CellToggled { step, pitch } => Outcome::Toggled(self.toggle_note(step, pitch)),
            InputEvent::Scrolled { delta, shift }   => Outcome::Scrolled(self.scroll(delta, shift)),
            InputEvent::OctaveInputChanged(v)       => Outcome::Octave(self.set_base_octave(v)),
            InputEvent::BpmInputChanged(v)          => Outcome::Bpm(self.set_tempo(v)),
            InputEvent::NoteLengthChanged(len)      => {
                self.set_note_length(len);
                Outcome::NoteLength(len)
            }
            InputEvent::TransposeRequested(st)      => Outcome::Transposed(self.transpose_all(st)),
            InputEvent::LoadRequested(patch)        => Outcome::Loaded(self.import(&patch)),
        }
    }
}

/// Leading integer of a text field: optional sign then digits, anything
/// after the digits ignored. `None` when no digits lead the text.
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (sign, rest) = match text.as_bytes().first() {
        Some(b'-') => (-1, &text[1..]),
        Some(b'+') => (1, &text[1..]),
        _ => (1, text),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    // very long inputs saturate instead of failing
    let value = rest[..digits].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_covers_inputs() {
        let mut seq = Sequencer::default();
        assert!(matches!(
            seq.handle(InputEvent::CellToggled { step: 4, pitch: 50 }),
            Outcome::Toggled(Toggle::Added)
        ));
        assert!(seq.is_active(4, 50));
        assert!(matches!(seq.handle(InputEvent::OctaveInputChanged(-1)), Outcome::Octave(0)));
        assert!(matches!(seq.handle(InputEvent::BpmInputChanged(999)), Outcome::Bpm(300)));
        assert!(matches!(
            seq.handle(InputEvent::Scrolled { delta: 4.0, shift: true }),
            Outcome::Scrolled(Scroll::Horizontal(_))
        ));
        seq.handle(InputEvent::NoteLengthChanged(NoteLength::Half));
        assert_eq!(seq.note_length(), NoteLength::Half);
        assert!(matches!(seq.handle(InputEvent::TransposeRequested(12)), Outcome::Transposed(true)));
        assert!(seq.is_active(4, 62));

        let patch = SnapshotPatch { bpm: Some(77), ..Default::default() };
        match seq.handle(InputEvent::LoadRequested(patch)) {
            Outcome::Loaded(report) => assert!(report.is_clean()),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(seq.bpm(), 77);
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("120"), Some(120));
        assert_eq!(parse_leading_int("  95bpm"), Some(95));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("+7"), Some(7));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("99999999999999999999999"), Some(i64::MAX));
    }
}
