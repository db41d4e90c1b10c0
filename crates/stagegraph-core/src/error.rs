//! Error types for stage mutations and keybinding registration.

use crate::objects::ObjectId;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors reported by the stage, history and keybind layers.
///
/// None of these are fatal. Mutators that return an error leave the
/// object graph exactly as it was before the call.
#[derive(Debug, Error)]
pub enum StageError {
    /// Duplicate uuid, dangling reference or broken containment.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),
    /// The edge would close a directed cycle.
    #[error("Edge {from} -> {to} would create a cycle")]
    CycleRejected { from: ObjectId, to: ObjectId },
    #[error("Keybind already registered: {0}")]
    DuplicateBinding(String),
    #[error("Keybind not found: {0}")]
    BindingNotFound(String),
    #[error("Invalid chord: {0}")]
    InvalidChord(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for stage operations.
pub type StageResult<T> = Result<T, StageError>;

impl StageError {
    pub(crate) fn missing(id: ObjectId) -> Self {
        StageError::IntegrityViolation(format!("no stage object with uuid {}", id))
    }
}
