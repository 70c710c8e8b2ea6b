/// Persistence shape of the sequencer.
///
/// Field names follow the documents the web front end already stores
/// (`sequence`, `baseOctave`, `bpm`, `note_type`), so existing saves load
/// unchanged. The note length is stored as its token, never as a number,
/// and resolved again on import.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{Grid, GridError};
use crate::timing::NoteLength;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid sequence: {0}")]
    Grid(#[from] GridError),
    #[error("unknown note length {0:?}")]
    NoteLength(String),
}

/// Full export of the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub sequence: Grid,
    #[serde(rename = "baseOctave")]
    pub base_octave: u8,
    pub bpm: u32,
    #[serde(rename = "note_type")]
    pub note_length: NoteLength,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Inbound partial update. Every field is optional; missing, null, zero or
/// empty scalar fields leave the live state alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SnapshotPatch {
    #[serde(default)]
    pub sequence: Option<Vec<Option<Vec<i64>>>>,
    #[serde(default, rename = "baseOctave")]
    pub base_octave: Option<i64>,
    #[serde(default)]
    pub bpm: Option<i64>,
    #[serde(default)]
    pub note_type: Option<String>,
}

impl SnapshotPatch {
    pub fn from_json(data: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Base octave to apply. Zero counts as absent, like a missing field.
    pub fn octave(&self) -> Option<i64> {
        self.base_octave.filter(|&o| o != 0)
    }

    /// Tempo to apply. Zero counts as absent.
    pub fn tempo(&self) -> Option<i64> {
        self.bpm.filter(|&b| b != 0)
    }

    /// Resolve the note length token. An empty token counts as absent.
    pub fn note_length(&self) -> Option<Result<NoteLength, SnapshotError>> {
        let token = self.note_type.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        Some(NoteLength::from_token(token).ok_or_else(|| SnapshotError::NoteLength(token.to_string())))
    }

    pub fn grid(&self) -> Option<Result<Grid, SnapshotError>> {
        let raw = self.sequence.clone()?;
        Some(Grid::from_raw(raw).map_err(SnapshotError::from))
    }
}

impl From<&Snapshot> for SnapshotPatch {
    fn from(snap: &Snapshot) -> Self {
        Self {
            sequence: Some(
                snap.sequence
                    .steps()
                    .iter()
                    .map(|s| (!s.is_empty()).then(|| s.notes().iter().map(|&p| i64::from(p)).collect()))
                    .collect(),
            ),
            base_octave: Some(i64::from(snap.base_octave)),
            bpm: Some(i64::from(snap.bpm)),
            note_type: Some(snap.note_length.token().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Sequence,
    BaseOctave,
    Bpm,
    NoteType,
}

/// What an import changed and what it refused.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub applied: Vec<Field>,
    pub rejected: Vec<(Field, SnapshotError)>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}
