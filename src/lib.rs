/// fmseq - step sequencer model for an FM synth front end
///
/// The library holds the editable state and its rules:
/// - a 64-step note grid with per-step polyphony limits and transpose
/// - tempo and note length, and the step duration derived from them
/// - the visible octave window and its wheel hysteresis
/// - snapshot export/import and the playback hand-off
///
/// Rendering, audio and storage live outside and talk to `Sequencer`.

pub mod config;
pub mod events;
pub mod grid;
pub mod pitch;
pub mod playback;
pub mod sequencer;
pub mod snapshot;
pub mod timing;
pub mod viewport;

pub use config::SequencerConfig;
pub use events::{parse_leading_int, InputEvent, Outcome};
pub use grid::{trim_trailing_empty, Grid, GridError, Step, Toggle, MAX_POLYPHONY, MAX_STEPS};
pub use pitch::{note_name, Pitch};
pub use playback::PlaybackRequest;
pub use sequencer::{Change, Listener, Sequencer};
pub use snapshot::{Field, ImportReport, Snapshot, SnapshotError, SnapshotPatch};
pub use timing::{step_duration, NoteLength, Timing};
pub use viewport::{Scroll, Viewport};
