use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use fmseq::{PlaybackRequest, Snapshot, SnapshotPatch};

/// Document type tag shared with the web front end's store.
pub const SEQUENCE_DOC_TYPE: &str = "sequencer_data";

/// A named saved sequence. `content` holds the snapshot as a JSON string.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SequenceDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

#[derive(Serialize, Deserialize, Default, Debug)]
pub struct SequenceLibrary {
    pub sequences: Vec<SequenceDoc>,
}

impl SequenceLibrary {
    /// A missing file is an empty library.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.sequences.iter().position(|d| d.name == name)
    }

    /// Store `snap` under `name`, replacing a document of the same name.
    /// Returns true when an existing document was overwritten.
    pub fn upsert(&mut self, name: &str, snap: &Snapshot) -> Result<bool> {
        let doc = SequenceDoc {
            name: name.to_string(),
            kind: SEQUENCE_DOC_TYPE.to_string(),
            content: snap.to_json()?,
        };
        match self.find_by_name(name) {
            Some(idx) => {
                self.sequences[idx] = doc;
                Ok(true)
            }
            None => {
                self.sequences.push(doc);
                Ok(false)
            }
        }
    }

    pub fn patch(&self, idx: usize) -> Result<SnapshotPatch> {
        let doc = self.sequences.get(idx)
            .with_context(|| format!("no sequence #{idx}"))?;
        Ok(SnapshotPatch::from_json(&doc.content)?)
    }

    /// "0: name  1: name ..." for the load prompt.
    pub fn listing(&self) -> String {
        self.sequences.iter().enumerate()
            .map(|(i, d)| format!("{}: {}", i, d.name))
            .collect::<Vec<_>>()
            .join("  ")
    }
}

/// Write the playback hand-off the audio renderer consumes.
pub fn write_playback(path: &Path, req: &PlaybackRequest) -> Result<()> {
    let json = req.to_json()?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmseq::Sequencer;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fmseq-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_upsert_overwrites_by_name() {
        let mut seq = Sequencer::default();
        let mut lib = SequenceLibrary::default();
        assert!(!lib.upsert("intro", &seq.export()).unwrap());
        seq.toggle_note(4, 60);
        assert!(lib.upsert("intro", &seq.export()).unwrap());
        assert_eq!(lib.sequences.len(), 1);
        assert_eq!(lib.sequences[0].kind, SEQUENCE_DOC_TYPE);

        let patch = lib.patch(0).unwrap();
        let mut other = Sequencer::default();
        other.import(&patch);
        assert!(other.is_active(4, 60));
        assert!(lib.patch(3).is_err());
    }

    #[test]
    fn test_library_file_round_trip() {
        let path = temp_path("library.json");
        let mut lib = SequenceLibrary::default();
        lib.upsert("a", &Sequencer::default().export()).unwrap();
        lib.upsert("b", &Sequencer::default().export()).unwrap();
        lib.write(&path).unwrap();

        let loaded = SequenceLibrary::load(&path).unwrap();
        assert_eq!(loaded.sequences, lib.sequences);
        assert_eq!(loaded.find_by_name("b"), Some(1));
        assert_eq!(loaded.listing(), "0: a  1: b");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_library_is_empty() {
        let lib = SequenceLibrary::load(&temp_path("absent.json")).unwrap();
        assert!(lib.sequences.is_empty());
    }

    #[test]
    fn test_write_playback() {
        let path = temp_path("playback.json");
        let seq = Sequencer::default();
        write_playback(&path, &seq.playback_request()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, r#"{"grid":[[48]],"step_len":0.5}"#);
        let _ = std::fs::remove_file(&path);
    }
}
