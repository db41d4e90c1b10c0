//! StageGraph Core Library
//!
//! Headless core of a node-and-edge diagram editor: the stage object graph,
//! section hierarchy, undo history, chord keybindings and edit modes.

pub mod collision;
pub mod config;
pub mod error;
pub mod history;
pub mod input;
pub mod keybind;
pub mod objects;
pub mod project;
pub mod stage;
pub mod storage;
pub mod tools;

pub use collision::{CollisionBox, CollisionShape};
pub use config::StageSettings;
pub use error::{StageError, StageResult};
pub use history::HistoryManager;
pub use input::{InputEvent, InputState, Modifiers, MouseButton, WheelDirection};
pub use keybind::{Chord, KeyBind, KeyBinds};
pub use objects::{Association, Entity, ObjectId, Section, StageObject, TextNode};
pub use project::{Editor, Project};
pub use stage::{Direction, StageManager, StageSnapshot};
pub use storage::{KeyBindStore, MemoryKeyBindStore, StorageError};
pub use tools::{Notification, ToolKind, ToolManager};
