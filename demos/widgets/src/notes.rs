//! File-backed persistence for the note widget

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads and writes the persistent note
#[derive(Clone, Debug)]
pub struct NoteStore {
    path: PathBuf,
}

impl NoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/dom-dispatch/note.txt`, if the platform has a data dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("dom-dispatch").join("note.txt"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved note; `None` if nothing (or only an empty note) was saved
    pub fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(note) if !note.is_empty() => Some(note),
            Ok(_) => None,
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read note");
                None
            }
        }
    }

    /// Save `note`, creating the parent directory if needed
    pub fn save(&self, note: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::new(dir.path().join("nested").join("note.txt"));

        assert_eq!(store.load(), None);
        store.save("remember the milk").unwrap();
        assert_eq!(store.load().as_deref(), Some("remember the milk"));

        store.save("").unwrap();
        assert_eq!(store.load(), None);
    }
}
