//! Associations between entities.

use super::{new_id, ObjectId, StageColor};
use serde::{Deserialize, Serialize};

/// Directed edge between two connectable entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub(crate) id: ObjectId,
    pub from: ObjectId,
    pub to: ObjectId,
    #[serde(default)]
    pub text: String,
    pub color: StageColor,
    #[serde(skip)]
    pub(crate) is_selected: bool,
}

impl Edge {
    pub fn new(from: ObjectId, to: ObjectId) -> Self {
        Self {
            id: new_id(),
            from,
            to,
            text: String::new(),
            color: StageColor::transparent(),
            is_selected: false,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub(crate) fn reverse(&mut self) {
        std::mem::swap(&mut self.from, &mut self.to);
    }
}

/// Undirected hyperedge over two or more entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiTargetUndirectedEdge {
    pub(crate) id: ObjectId,
    pub targets: Vec<ObjectId>,
    #[serde(default)]
    pub text: String,
    pub color: StageColor,
    #[serde(skip)]
    pub(crate) is_selected: bool,
}

impl MultiTargetUndirectedEdge {
    pub fn new(targets: Vec<ObjectId>) -> Self {
        Self {
            id: new_id(),
            targets,
            text: String::new(),
            color: StageColor::transparent(),
            is_selected: false,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
}
