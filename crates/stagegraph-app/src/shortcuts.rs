//! Keybinding listing.

use stagegraph_core::{Editor, KeyBinds};

/// One row of the keybinding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    pub id: String,
    pub chord: String,
    pub description: String,
}

impl Shortcut {
    /// Format the shortcut for display (e.g., "C-S-g  Unpack selected sections").
    pub fn format(&self) -> String {
        format!("{:12} {}", self.chord, self.description)
    }
}

/// Current bindings in registration order.
pub fn shortcuts(keybinds: &KeyBinds<Editor>) -> Vec<Shortcut> {
    keybinds
        .iter()
        .map(|bind| Shortcut {
            id: bind.id().to_string(),
            chord: bind.chord().to_string(),
            description: bind.description().unwrap_or(bind.id()).to_string(),
        })
        .collect()
}

/// Print all shortcuts to console.
pub fn print_all(keybinds: &KeyBinds<Editor>) {
    println!("\n=== Keyboard Shortcuts ===");
    for shortcut in shortcuts(keybinds) {
        println!("  {}", shortcut.format());
    }
    println!();
}
