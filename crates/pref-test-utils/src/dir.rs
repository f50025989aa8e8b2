//! [`TestStoreDir`]: file-backed stores in a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use pref_core::{FileStore, StoreRegistry};
use tempfile::TempDir;

/// A temporary directory holding `<store>.toml` preference files.
///
/// # Example
///
/// ```rust,no_run
/// use pref_test_utils::dir::TestStoreDir;
///
/// let dir = TestStoreDir::new();
/// dir.write_store("ui", "[editor]\ntab_width = 8\n");
/// let ui = dir.open("ui");
/// ```
pub struct TestStoreDir {
    temp_dir: TempDir,
}

impl Default for TestStoreDir {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStoreDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of the file backing store `id`.
    pub fn store_path(&self, id: &str) -> PathBuf {
        self.root().join(format!("{id}.toml"))
    }

    /// Write raw TOML content for store `id`.
    pub fn write_store(&self, id: &str, content: &str) {
        fs::write(self.store_path(id), content).unwrap();
    }

    /// Read back the file for store `id`; empty if it was never flushed.
    pub fn read_store(&self, id: &str) -> String {
        fs::read_to_string(self.store_path(id)).unwrap_or_default()
    }

    pub fn open(&self, id: &'static str) -> Rc<FileStore> {
        Rc::new(FileStore::open(id, self.store_path(id)).unwrap())
    }

    /// Open a [`FileStore`] for every id and register them.
    pub fn registry(&self, ids: &[&'static str]) -> (StoreRegistry, Vec<Rc<FileStore>>) {
        let stores: Vec<Rc<FileStore>> = ids.iter().map(|&id| self.open(id)).collect();
        let mut registry = StoreRegistry::new();
        for store in &stores {
            registry.register(store.clone());
        }
        (registry, stores)
    }

    /// Make store `id` unwritable by putting a directory at its path.
    pub fn block_store(&self, id: &str) {
        fs::create_dir_all(self.store_path(id)).unwrap();
    }

    pub fn unblock_store(&self, id: &str) {
        fs::remove_dir_all(self.store_path(id)).unwrap();
    }
}
