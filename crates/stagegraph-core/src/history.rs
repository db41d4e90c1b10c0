//! Bounded undo/redo over completed steps.

use crate::stage::{StageManager, StageSnapshot};
use std::collections::VecDeque;

/// Default number of entries kept.
pub const DEFAULT_HISTORY_SIZE: usize = 20;

/// Linear undo log of stage snapshots with a cursor.
///
/// Entry 0 is the oldest state that can be restored. The cursor points at
/// the entry matching the live stage. Recording after an undo discards the
/// redo entries; recording past the bound discards the oldest entry.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    entries: VecDeque<StageSnapshot>,
    cursor: usize,
    history_size: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl HistoryManager {
    /// History holding a single empty-stage baseline.
    pub fn new(history_size: usize) -> Self {
        let mut entries = VecDeque::new();
        entries.push_back(StageSnapshot::default());
        Self {
            entries,
            cursor: 0,
            history_size: history_size.max(1),
        }
    }

    /// Forget every step and use the current stage as the only entry.
    pub fn reset(&mut self, stage: &StageManager) {
        self.entries.clear();
        self.entries.push_back(stage.snapshot());
        self.cursor = 0;
        log::info!("History reset");
    }

    /// Checkpoint the stage after a completed operation.
    ///
    /// Returns false when the stage equals the current entry; nothing is
    /// recorded and redo entries are kept.
    pub fn record_step(&mut self, stage: &StageManager) -> bool {
        let snapshot = stage.snapshot();
        if self.entries.get(self.cursor) == Some(&snapshot) {
            return false;
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(snapshot);
        self.cursor = self.entries.len() - 1;
        while self.entries.len() > self.history_size {
            self.entries.pop_front();
            self.cursor -= 1;
        }
        log::debug!("Recorded step, {}", self.status_text());
        true
    }

    /// Step back. Returns true if the stage changed.
    pub fn undo(&mut self, stage: &mut StageManager) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.cursor -= 1;
        if let Some(snapshot) = self.entries.get(self.cursor) {
            stage.restore(snapshot);
        }
        true
    }

    /// Step forward. Returns true if the stage changed.
    pub fn redo(&mut self, stage: &mut StageManager) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        if let Some(snapshot) = self.entries.get(self.cursor) {
            stage.restore(snapshot);
        }
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn history_size(&self) -> usize {
        self.history_size
    }

    /// Change the bound. A cursor outside the new bound collapses the log to
    /// the current entry; otherwise redo entries past the bound are dropped.
    pub fn set_history_size(&mut self, history_size: usize) {
        let history_size = history_size.max(1);
        self.history_size = history_size;
        if self.cursor >= history_size {
            if let Some(current) = self.entries.remove(self.cursor) {
                self.entries.clear();
                self.entries.push_back(current);
            }
            self.cursor = 0;
        } else {
            self.entries.truncate(history_size);
        }
    }

    pub fn status_text(&self) -> String {
        format!("history: {}/{}", self.cursor + 1, self.entries.len())
    }
}
