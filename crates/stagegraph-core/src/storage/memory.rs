//! In-memory keybind store.

use super::{KeyBindChange, KeyBindStore, StorageError, StorageResult, Watchers};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::mpsc::Receiver;

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyBindStore {
    chords: RwLock<HashMap<String, String>>,
    watchers: Watchers,
}

impl MemoryKeyBindStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyBindStore for MemoryKeyBindStore {
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
            chords.insert(id.to_string(), chord.to_string());
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
        let mut entries: Vec<_> = chords.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort();
        Ok(entries)
    }

    fn watch(&self) -> Receiver<KeyBindChange> {
        self.watchers.subscribe()
    }
}
