//! Persistence for user keybindings.
//!
//! The core treats the store as an opaque key-value map from binding id to
//! chord string, with change notification.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use memory::MemoryKeyBindStore;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileKeyBindStore;

use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A binding changed its chord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindChange {
    pub id: String,
    pub chord: String,
}

/// Backend for the id → chord map.
pub trait KeyBindStore: Send + Sync {
    /// Stored chord for `id`, if any.
    fn get(&self, id: &str) -> StorageResult<Option<String>>;

    /// Store a chord and notify watchers.
    fn set(&self, id: &str, chord: &str) -> StorageResult<()>;

    /// Every stored pair.
    fn entries(&self) -> StorageResult<Vec<(String, String)>>;

    /// Subscribe to changes made through [`KeyBindStore::set`].
    fn watch(&self) -> Receiver<KeyBindChange>;
}

/// Fan-out of change notifications to every live subscriber.
#[derive(Debug, Default)]
pub(crate) struct Watchers {
    senders: Mutex<Vec<Sender<KeyBindChange>>>,
}

impl Watchers {
    pub(crate) fn subscribe(&self) -> Receiver<KeyBindChange> {
        let (tx, rx) = mpsc::channel();
        match self.senders.lock() {
            Ok(mut senders) => senders.push(tx),
            Err(e) => log::error!("Keybind watcher lock poisoned: {}", e),
        }
        rx
    }

    pub(crate) fn notify(&self, change: KeyBindChange) {
        if let Ok(mut senders) = self.senders.lock() {
            senders.retain(|tx| tx.send(change.clone()).is_ok());
        }
    }
}
