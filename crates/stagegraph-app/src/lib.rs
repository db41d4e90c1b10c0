//! StageGraph Application
//!
//! Headless shell around the core: loads settings, keybindings and a
//! document, then replays recorded input through a project.

mod replay;
mod shortcuts;

pub use replay::{
    open_project, replay, run, KeyBindSource, ReplayConfig, ReplayError, ReplayReport,
};
pub use shortcuts::{print_all, shortcuts, Shortcut};
