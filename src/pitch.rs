/// Note numbers as stored in the grid. 36 is the default C3.
pub type Pitch = u8;

/// Lowest pitch a transpose may produce.
pub const MIN_TRANSPOSED_PITCH: Pitch = 12;
/// Highest pitch a transpose may produce.
pub const MAX_TRANSPOSED_PITCH: Pitch = 95;

const NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Display name using the grid's octave numbering (`pitch / 12`), so 36 is "C3".
pub fn note_name(pitch: Pitch) -> String {
    format!("{}{}", NAMES[(pitch % 12) as usize], pitch / 12)
}

pub fn is_black_key(pitch: Pitch) -> bool {
    matches!(pitch % 12, 1 | 3 | 6 | 8 | 10)
}

/// Row label for the piano column: only C rows are labelled.
pub fn row_label(pitch: Pitch) -> Option<String> {
    (pitch % 12 == 0).then(|| format!("C{}", pitch / 12))
}

/// Add `delta` semitones and clamp into the transposable range.
pub fn transpose_clamped(pitch: Pitch, delta: i32) -> Pitch {
    let moved = i32::from(pitch).saturating_add(delta);
    moved.clamp(i32::from(MIN_TRANSPOSED_PITCH), i32::from(MAX_TRANSPOSED_PITCH)) as Pitch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_name_uses_grid_octaves() {
        assert_eq!(note_name(36), "C3");
        assert_eq!(note_name(61), "C#5");
        assert_eq!(note_name(0), "C0");
    }

    #[test]
    fn test_black_keys() {
        let black: Vec<Pitch> = (48..60).filter(|&p| is_black_key(p)).collect();
        assert_eq!(black, vec![49, 51, 54, 56, 58]);
    }

    #[test]
    fn test_row_label_only_on_c() {
        assert_eq!(row_label(48).as_deref(), Some("C4"));
        assert_eq!(row_label(50), None);
    }

    #[test]
    fn test_transpose_clamps_both_ends() {
        assert_eq!(transpose_clamped(10, -5), 12);
        assert_eq!(transpose_clamped(90, 12), 95);
        assert_eq!(transpose_clamped(60, 7), 67);
        assert_eq!(transpose_clamped(60, i32::MIN / 2), 12);
    }

    #[test]
    fn test_transpose_extreme_deltas_saturate() {
        assert_eq!(transpose_clamped(60, i32::MAX), 95);
        assert_eq!(transpose_clamped(255, i32::MAX), 95);
        assert_eq!(transpose_clamped(60, i32::MIN), 12);
        assert_eq!(transpose_clamped(0, i32::MIN), 12);
    }
}
