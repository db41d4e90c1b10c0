//! JSON file keybind store for native platforms.

use super::{KeyBindChange, KeyBindStore, StorageError, StorageResult, Watchers};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use std::sync::mpsc::Receiver;

/// Keybindings kept in a single JSON object on disk.
///
/// The file is read once on open and rewritten on every `set`.
#[derive(Debug)]
pub struct FileKeyBindStore {
    path: PathBuf,
    chords: RwLock<BTreeMap<String, String>>,
    watchers: Watchers,
}

impl FileKeyBindStore {
    /// Open (or start) the store at `path`.
    pub fn open(path: PathBuf) -> StorageResult<Self> {
        let chords = if path.exists() {
            let json = fs::read_to_string(&path).map_err(|e| {
                StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&json).map_err(|e| {
                StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            BTreeMap::new()
        };
        log::info!("Loaded {} keybinds from {}", chords.len(), path.display());
        Ok(Self {
            path,
            chords: RwLock::new(chords),
            watchers: Watchers::default(),
        })
    }

    /// Store in the default location.
    ///
    /// On Unix: `~/.local/share/stagegraph/keybinds.json`
    /// On Windows: `%LOCALAPPDATA%\stagegraph\keybinds.json`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        let dir = base.join("stagegraph");
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Self::open(dir.join("keybinds.json"))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn flush(&self, chords: &BTreeMap<String, String>) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(chords)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| {
            StorageError::Io(format!("Failed to write {}: {}", self.path.display(), e))
        })
    }
}

impl KeyBindStore for FileKeyBindStore {
    fn get(&self, id: &str) -> StorageResult<Option<String>> {
        let chords = self
            .chords
            .read()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        Ok(chords.get(id).cloned())
    }

    fn set(&self, id: &str, chord: &str) -> StorageResult<()> {
        {
            let mut chords = self
                .chords
                .write()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            let mut updated = chords.clone();
            updated.insert(id.to_string(), chord.to_string());
            self.flush(&updated)?;
            *chords = updated;
        }
        self.watchers.notify(KeyBindChange {
            id: id.to_string(),
            chord: chord.to_string(),
        });
        Ok(())
    }

    fn entries(&self) -> StorageResult<Vec<(String, String)>> {
        let chords = self
            .chords
            .read()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        Ok(chords.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    fn watch(&self) -> Receiver<KeyBindChange> {
        self.watchers.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keybinds.json");
        {
            let store = FileKeyBindStore::open(path.clone()).unwrap();
            store.set("undo", "C-z").unwrap();
        }
        let reopened = FileKeyBindStore::open(path).unwrap();
        assert_eq!(reopened.get("undo").unwrap(), Some("C-z".to_string()));
    }

    #[test]
    fn test_failed_write_keeps_cache_and_stays_silent() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("gone");
        fs::create_dir(&sub).unwrap();
        let store = FileKeyBindStore::open(sub.join("keybinds.json")).unwrap();
        store.set("undo", "C-z").unwrap();
        let changes = store.watch();
        fs::remove_dir_all(&sub).unwrap();

        assert!(matches!(store.set("undo", "C-u"), Err(StorageError::Io(_))));
        assert_eq!(store.get("undo").unwrap(), Some("C-z".to_string()));
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileKeyBindStore::open(dir.path().join("none.json")).unwrap();
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FileKeyBindStore::open(path),
            Err(StorageError::Serialization(_))
        ));
    }
}
