//! Default keybindings of the editor.

use super::KeyBinds;
use crate::error::StageResult;
use crate::project::Editor;
use crate::stage::Direction;
use crate::tools::ToolKind;

/// Register every built-in binding. Chords already stored for these ids
/// take precedence over the defaults listed here.
pub fn register_default_keybinds(keybinds: &mut KeyBinds<Editor>) -> StageResult<()> {
    keybinds
        .register("undo", "C-z", |editor: &mut Editor| {
            editor.undo();
        })?
        .describe("Undo");
    keybinds
        .register("redo", "C-y", |editor: &mut Editor| {
            editor.redo();
        })?
        .describe("Redo");
    keybinds
        .register("delete", "delete", Editor::delete_selected)?
        .describe("Delete selected objects");
    keybinds
        .register("select_all", "C-a", Editor::select_all)?
        .describe("Select everything");

    keybinds
        .register("pack_to_section", "C-g", |editor: &mut Editor| {
            editor.pack_selected();
        })?
        .describe("Pack selected entities into a section");
    keybinds
        .register("unpack_sections", "C-S-g", |editor: &mut Editor| {
            editor.unpack_selected();
        })?
        .describe("Unpack selected sections");
    keybinds
        .register("toggle_section_collapse", "C-t", Editor::toggle_collapse_selected)?
        .describe("Collapse or expand selected sections");
    keybinds
        .register("text_node_to_section", "C-A-g", |editor: &mut Editor| {
            editor.selected_text_nodes_to_sections();
        })?
        .describe("Turn selected text nodes into sections");

    keybinds
        .register("reverse_edges", "C-S-t", Editor::reverse_selected_edges)?
        .describe("Reverse selected edges");
    keybinds
        .register("undirected_edge", "S-g", |editor: &mut Editor| {
            editor.connect_selected_undirected();
        })?
        .describe("Join selected entities with an undirected edge");
    keybinds
        .register("toggle_tag", "C-S-2", Editor::toggle_tags)?
        .describe("Tag or untag selected entities");
    keybinds
        .register("align_to_integer", "i n t j", Editor::align_to_integer)?
        .describe("Snap entities to whole coordinates");

    keybinds
        .register("copy", "C-c", |editor: &mut Editor| {
            editor.copy_selected();
        })?
        .describe("Copy selected entities");
    keybinds
        .register("paste", "C-v", |editor: &mut Editor| {
            editor.paste();
        })?
        .describe("Paste at the pointer");
    keybinds
        .register("paste_in_place", "C-S-v", |editor: &mut Editor| {
            editor.paste_in_place();
        })?
        .describe("Paste where the copy was taken");
    keybinds
        .register("align_to_entities", "C-l", Editor::align_selected_to_entities)?
        .describe("Line up selected entities with their neighbours");
    keybinds
        .register("align_to_grid", "C-S-l", Editor::align_selected_to_grid)?
        .describe("Snap selected entities to the grid");

    for direction in Direction::ALL {
        let (name, key) = (direction.name(), direction.key());
        keybinds
            .register(&format!("move_{}", name), &format!("C-{}", key), move |editor: &mut Editor| {
                editor.move_selected(direction)
            })?
            .describe(format!("Move selection {}", name));
        keybinds
            .register(
                &format!("jump_move_{}", name),
                &format!("C-A-{}", key),
                move |editor: &mut Editor| editor.jump_move_selected(direction),
            )?
            .describe(format!("Move selection {} across section borders", name));
        keybinds
            .register(&format!("select_{}", name), key, move |editor: &mut Editor| {
                editor.select_toward(direction, false);
            })?
            .describe(format!("Select the next entity {}", name));
        keybinds
            .register(
                &format!("select_additional_{}", name),
                &format!("S-{}", key),
                move |editor: &mut Editor| {
                    editor.select_toward(direction, true);
                },
            )?
            .describe(format!("Add the next entity {} to the selection", name));
    }

    keybinds
        .register("mode_select", "v", |editor: &mut Editor| {
            editor.set_mode(ToolKind::SelectAndMove)
        })?
        .describe("Select and move mode");
    keybinds
        .register("mode_drawing", "p", |editor: &mut Editor| {
            editor.set_mode(ToolKind::Drawing)
        })?
        .describe("Drawing mode");
    keybinds
        .register("mode_connect", "c", |editor: &mut Editor| {
            editor.set_mode(ToolKind::ConnectAndCutting)
        })?
        .describe("Connect and cut mode");
    keybinds
        .create("hold_connect", "z")?
        .down(|editor: &mut Editor| editor.set_mode(ToolKind::ConnectAndCutting))
        .up(|editor: &mut Editor| editor.set_mode(ToolKind::SelectAndMove))
        .describe("Connect and cut while held");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyBindStore, MemoryKeyBindStore};
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_defaults_are_distinct_and_persisted() {
        let store = Arc::new(MemoryKeyBindStore::new());
        let mut keybinds: KeyBinds<Editor> = KeyBinds::new(store.clone(), 20);
        register_default_keybinds(&mut keybinds).unwrap();

        let chords: HashSet<String> = keybinds.iter().map(|b| b.chord().to_string()).collect();
        assert_eq!(chords.len(), keybinds.len());
        assert_eq!(store.entries().unwrap().len(), keybinds.len());
        assert!(keybinds.iter().all(|b| b.description().is_some()));
    }

    #[test]
    fn test_registering_twice_fails() {
        let store = Arc::new(MemoryKeyBindStore::new());
        let mut keybinds: KeyBinds<Editor> = KeyBinds::new(store, 20);
        register_default_keybinds(&mut keybinds).unwrap();
        assert!(register_default_keybinds(&mut keybinds).is_err());
    }

    #[test]
    fn test_stored_overrides_survive_restart() {
        let store = Arc::new(MemoryKeyBindStore::new());
        store.set("undo", "C-u").unwrap();
        let mut keybinds: KeyBinds<Editor> = KeyBinds::new(store, 20);
        register_default_keybinds(&mut keybinds).unwrap();
        assert_eq!(keybinds.chord_of("undo").unwrap().to_string(), "C-u");
        assert_eq!(keybinds.get("undo").unwrap().default_chord().to_string(), "C-z");
    }
}
