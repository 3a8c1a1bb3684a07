//! Persistence of the group registry.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use super::registry::RegistrySnapshot;
use crate::common::collections::HashMap;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not serialize registry: {0}")]
    Serialize(#[from] ron::Error),
    #[error("could not parse registry backup: {0}")]
    Deserialize(#[from] ron::error::SpannedError),
}

/// Key/value storage for registry snapshots.
pub trait BackupStore {
    fn save(&mut self, key: &str, snapshot: &RegistrySnapshot) -> Result<(), BackupError>;

    /// `Ok(None)` when nothing was ever saved under `key`.
    fn load(&self, key: &str) -> Result<Option<RegistrySnapshot>, BackupError>;
}

/// Stores each snapshot as ron text in `<dir>/<key>.ron`.
#[derive(Debug, Clone)]
pub struct RonFileStore {
    dir: PathBuf,
}

impl RonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { RonFileStore { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn path_for(&self, key: &str) -> PathBuf { self.dir.join(format!("{key}.ron")) }
}

impl BackupStore for RonFileStore {
    fn save(&mut self, key: &str, snapshot: &RegistrySnapshot) -> Result<(), BackupError> {
        let path = self.path_for(key);
        let text = ron::ser::to_string_pretty(snapshot, ron::ser::PrettyConfig::default())?;
        fs::create_dir_all(&self.dir)?;
        File::create(&path)?.write_all(text.as_bytes())?;
        trace!(?path, "Registry saved");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<RegistrySnapshot>, BackupError> {
        let path = self.path_for(key);
        let mut buf = String::new();
        match File::open(&path) {
            Ok(mut file) => file.read_to_string(&mut buf)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(?path, "No registry backup yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(ron::from_str(&buf)?))
    }
}

/// Keeps snapshots in memory. Used by tests and by hosts that don't want
/// anything on disk.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, RegistrySnapshot>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Number of successful saves so far.
    pub fn saves(&self) -> usize { self.saves }

    pub fn get(&self, key: &str) -> Option<&RegistrySnapshot> { self.entries.get(key) }
}

impl BackupStore for MemoryStore {
    fn save(&mut self, key: &str, snapshot: &RegistrySnapshot) -> Result<(), BackupError> {
        self.entries.insert(key.to_string(), snapshot.clone());
        self.saves += 1;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<RegistrySnapshot>, BackupError> {
        Ok(self.entries.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::registry::{GroupId, GroupRegistry, WindowEntry};
    use crate::sys::window_server::WindowHandle;

    fn sample() -> RegistrySnapshot {
        let mut registry = GroupRegistry::new();
        registry.add_window(&GroupId::Name("work".into()), WindowEntry::new(WindowHandle::new(4), 1));
        registry.add_window(&GroupId::None, WindowEntry::new(WindowHandle::new(5), 0));
        registry.snapshot()
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RonFileStore::new(dir.path().join("nested"));
        assert!(store.load("registry").unwrap().is_none());

        store.save("registry", &sample()).unwrap();
        assert!(store.path_for("registry").exists());
        assert_eq!(store.load("registry").unwrap(), Some(sample()));
        assert!(store.load("other").unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_a_deserialize_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = RonFileStore::new(dir.path());
        fs::write(store.path_for("registry"), "not ron at all (").unwrap();
        assert!(matches!(store.load("registry"), Err(BackupError::Deserialize(_))));
    }

    #[test]
    fn memory_store_counts_saves() {
        let mut store = MemoryStore::new();
        assert!(store.load("k").unwrap().is_none());
        store.save("k", &sample()).unwrap();
        store.save("k", &RegistrySnapshot::default()).unwrap();
        assert_eq!(store.saves(), 2);
        assert_eq!(store.get("k"), Some(&RegistrySnapshot::default()));
    }
}
