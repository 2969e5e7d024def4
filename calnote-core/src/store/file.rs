//! Directory-backed store: one file per slot.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{CalNoteError, CalNoteResult};
use crate::store::KeyValueStore;

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, slot: &str) -> CalNoteResult<PathBuf> {
        let valid = !slot.is_empty()
            && slot
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !slot.starts_with('.');

        if !valid {
            return Err(CalNoteError::Store(format!("Invalid slot name '{slot}'")));
        }
        Ok(self.dir.join(slot))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, slot: &str) -> CalNoteResult<Option<String>> {
        let path = self.path(slot)?;

        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, slot: &str, value: &str) -> CalNoteResult<()> {
        let path = self.path(slot)?;
        std::fs::create_dir_all(&self.dir)?;

        // Write to a sibling file first so readers never see a partial value
        let temp = self.dir.join(format!(".{slot}.tmp"));
        std::fs::write(&temp, value)?;
        std::fs::rename(&temp, &path)?;
        Ok(())
    }

    fn remove(&self, slot: &str) -> CalNoteResult<()> {
        let path = self.path(slot)?;

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn claim(&self, slot: &str, value: &str) -> CalNoteResult<bool> {
        self.path(slot)?;
        std::fs::create_dir_all(&self.dir)?;

        // Exclusive creation of the marker serializes claims across processes
        let marker = self.dir.join(format!(".{slot}.claim"));
        let _marker = match OpenOptions::new().write(true).create_new(true).open(&marker) {
            Ok(_) => ClaimMarker(marker),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!(slot, "Claim already in progress");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        if self.get(slot)?.is_some_and(|v| v.trim() == value) {
            return Ok(false);
        }
        self.put(slot, value)?;
        Ok(true)
    }
}

/// Removes the claim marker when the claim finishes, whichever way.
struct ClaimMarker(PathBuf);

impl Drop for ClaimMarker {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            tracing::warn!(path = %self.0.display(), error = %e, "Failed to remove claim marker");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_slot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state"));
        assert_eq!(store.get("snapshot").unwrap(), None);
    }

    #[test]
    fn test_put_replaces_whole_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state"));

        store.put("snapshot", "first value, quite long").unwrap();
        store.put("snapshot", "second").unwrap();

        assert_eq!(store.get("snapshot").unwrap().as_deref(), Some("second"));
        assert!(!dir.path().join("state/.snapshot.tmp").exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.put("lock", "true").unwrap();
        store.remove("lock").unwrap();
        store.remove("lock").unwrap();
        assert_eq!(store.get("lock").unwrap(), None);
    }

    #[test]
    fn test_rejects_path_like_slots() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.put("../escape", "x").is_err());
        assert!(store.get(".hidden").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_claim_is_exclusive_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileStore::new(dir.path());
        let second = FileStore::new(dir.path());

        assert!(first.claim("lock", "true").unwrap());
        assert!(!second.claim("lock", "true").unwrap());
        assert!(!dir.path().join(".lock.claim").exists());

        second.put("lock", "false").unwrap();
        assert!(second.claim("lock", "true").unwrap());
    }

    #[test]
    fn test_claim_in_progress_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(dir.path().join(".lock.claim"), "").unwrap();

        assert!(!store.claim("lock", "true").unwrap());
        assert_eq!(store.get("lock").unwrap(), None);
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = FileStore::new(path.clone());
                std::thread::spawn(move || store.claim("lock", "true").unwrap())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(FileStore::new(path).get("lock").unwrap().as_deref(), Some("true"));
    }
}
