//! File-backed store

use std::cell::Cell;
use std::path::{Path, PathBuf};

use pref_fs::PreferenceFile;

use super::{MemoryStore, PreferenceStore, StoreListener, SubscriptionId};
use crate::key::StoreId;
use crate::{Error, Result};

/// A store whose explicit values persist to a preference file on flush.
///
/// Defaults are never written to disk; they are registered at startup from
/// the key schema.
pub struct FileStore {
    memory: MemoryStore,
    file: PreferenceFile,
    dirty: Cell<bool>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(id: impl Into<StoreId>, path: impl Into<PathBuf>) -> Result<Self> {
        let file = PreferenceFile::new(path)?;
        let values = file.load()?;
        let id = id.into();
        tracing::debug!(store = %id, path = ?file.path(), entries = values.len(), "Opened preference store");
        Ok(Self {
            memory: MemoryStore::with_values(id, values),
            file,
            dirty: Cell::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Whether there are writes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }
}

impl PreferenceStore for FileStore {
    fn id(&self) -> &StoreId {
        self.memory.id()
    }

    fn read(&self, name: &str) -> Option<String> {
        self.memory.read(name)
    }

    fn read_default(&self, name: &str) -> Option<String> {
        self.memory.read_default(name)
    }

    fn set_default(&self, name: &str, value: &str) {
        self.memory.set_default(name, value);
    }

    fn write(&self, name: &str, value: &str) {
        if self.memory.put(name, value) {
            self.dirty.set(true);
        }
    }

    fn remove(&self, name: &str) {
        if self.memory.take(name) {
            self.dirty.set(true);
        }
    }

    fn flush(&self) -> Result<()> {
        if !self.dirty.get() {
            return Ok(());
        }
        self.file
            .save(&self.memory.snapshot())
            .map_err(|e| Error::Persistence {
                store: self.id().clone(),
                message: e.to_string(),
            })?;
        self.dirty.set(false);
        tracing::debug!(store = %self.id(), path = ?self.file.path(), "Flushed preference store");
        Ok(())
    }

    fn subscribe(&self, listener: StoreListener) -> SubscriptionId {
        self.memory.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.memory.unsubscribe(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn flush_persists_only_explicit_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ui.toml");

        let store = FileStore::open("ui", &path).unwrap();
        store.set_default("editor.tab_width", "4");
        store.write("editor.folding", "false");
        assert!(store.is_dirty());
        store.flush().unwrap();
        assert!(!store.is_dirty());

        let reopened = FileStore::open("ui", &path).unwrap();
        assert_eq!(reopened.read("editor.folding").as_deref(), Some("false"));
        assert_eq!(reopened.read("editor.tab_width"), None);
    }

    #[test]
    fn clean_store_does_not_touch_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("core.json");

        let store = FileStore::open("core", &path).unwrap();
        store.flush().unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn rewriting_same_value_stays_clean() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("core.toml");
        std::fs::write(&path, "\"indexer.strategy\" = \"fast\"\n").unwrap();

        let store = FileStore::open("core", &path).unwrap();
        store.write("indexer.strategy", "fast");

        assert!(!store.is_dirty());
    }

    #[test]
    fn flush_failure_names_the_store_and_stays_dirty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ui.toml");

        let store = FileStore::open("ui", &path).unwrap();
        // A directory in place of the file makes the final rename fail
        std::fs::create_dir(&path).unwrap();
        store.write("editor.folding", "true");
        let err = store.flush().unwrap_err();

        match err {
            Error::Persistence { store: id, .. } => assert_eq!(id.as_str(), "ui"),
            other => panic!("expected persistence error, got {other:?}"),
        }
        assert!(store.is_dirty());
    }
}
