//! Top-level editing context.
//!
//! A [`Project`] owns one stage with its history, tools and keybindings.
//! Several projects can live side by side; nothing here is global.

use crate::config::StageSettings;
use crate::error::{StageError, StageResult};
use crate::history::HistoryManager;
use crate::input::{InputEvent, InputState, MouseButton};
use crate::keybind::{register_default_keybinds, KeyBinds};
use crate::objects::{Entity, ObjectId};
use crate::stage::{clip_bounds, Direction, StageManager, StageSnapshot};
use crate::storage::{KeyBindStore, MemoryKeyBindStore};
use crate::tools::{Notification, ToolContext, ToolKind, ToolManager};
use kurbo::{Point, Vec2};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Stage, history, tools and input state of one project.
///
/// Every public mutator records at most one history step.
#[derive(Debug)]
pub struct Editor {
    pub stage: StageManager,
    pub history: HistoryManager,
    pub tools: ToolManager,
    pub input: InputState,
    settings: StageSettings,
    notifications: Vec<Notification>,
    /// Object whose text is being edited.
    editing: Option<ObjectId>,
    /// Last copied subgraph.
    clipboard: Option<StageSnapshot>,
}

impl Editor {
    pub fn new(settings: StageSettings) -> Self {
        let mut stage = StageManager::new();
        stage.set_hit_tolerance(settings.hit_tolerance);
        let mut history = HistoryManager::new(settings.history_size);
        history.reset(&stage);
        let input = InputState::new(
            Duration::from_millis(settings.double_click_interval_ms),
            settings.double_click_distance,
        );
        Self {
            stage,
            history,
            tools: ToolManager::new(),
            input,
            settings,
            notifications: Vec::new(),
            editing: None,
            clipboard: None,
        }
    }

    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }

    /// Replace the stage with a document and start a fresh history.
    pub fn load_document(&mut self, json: &str) -> StageResult<()> {
        let mut stage = StageManager::from_json(json)?;
        stage.set_hit_tolerance(self.settings.hit_tolerance);
        self.stage = stage;
        self.history.reset(&self.stage);
        self.editing = None;
        log::info!("Loaded document with {} objects", self.stage.len());
        Ok(())
    }

    pub fn set_history_size(&mut self, size: usize) {
        self.settings.history_size = size.max(1);
        self.history.set_history_size(size);
    }

    pub fn set_allow_cycles(&mut self, allow: bool) {
        self.settings.allow_add_cycle_edge = allow;
    }

    // --- notifications ---

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Drain queued notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn rejected(&mut self, action: &str, error: StageError) {
        log::warn!("{} rejected: {}", action, error);
        self.notify(Notification::Warning(format!("{}: {}", action, error)));
    }

    fn step(&mut self) {
        self.history.record_step(&self.stage);
    }

    // --- tools ---

    fn with_tools<R>(&mut self, f: impl FnOnce(&mut ToolManager, &mut ToolContext<'_>) -> R) -> R {
        let mut ctx = ToolContext {
            stage: &mut self.stage,
            history: &mut self.history,
            settings: &self.settings,
            notifications: &mut self.notifications,
            modifiers: self.input.modifiers,
        };
        f(&mut self.tools, &mut ctx)
    }

    pub fn mode(&self) -> ToolKind {
        self.tools.current_tool()
    }

    /// Switch edit mode, running the exit action of the current one.
    pub fn set_mode(&mut self, mode: ToolKind) {
        self.with_tools(|tools, ctx| tools.switch(mode, ctx));
    }

    /// Abandon the gesture in progress.
    pub fn cancel_gesture(&mut self) {
        self.with_tools(|tools, ctx| tools.cancel(ctx));
        self.editing = None;
    }

    /// Route a pointer event to the active tool. Only the left button drives
    /// tools.
    fn route_pointer(&mut self, event: &InputEvent) {
        match event {
            InputEvent::MouseDown {
                button: MouseButton::Left,
                position,
                ..
            } => {
                self.editing = None;
                self.with_tools(|tools, ctx| tools.mouse_down(ctx, *position));
            }
            InputEvent::MouseMove { position, .. } => {
                self.with_tools(|tools, ctx| tools.mouse_move(ctx, *position));
            }
            InputEvent::MouseUp {
                button: MouseButton::Left,
                position,
                ..
            } => {
                self.with_tools(|tools, ctx| tools.mouse_up(ctx, *position));
                if self.input.double_clicked() {
                    let target = self.with_tools(|tools, ctx| tools.double_click(ctx, *position));
                    if target.is_some() {
                        self.editing = target;
                    }
                }
            }
            _ => {}
        }
    }

    // --- text editing ---

    pub fn editing(&self) -> Option<ObjectId> {
        self.editing
    }

    pub fn start_editing(&mut self, id: ObjectId) -> StageResult<()> {
        self.stage.select(id)?;
        self.editing = Some(id);
        Ok(())
    }

    /// Apply text to the object being edited and end editing.
    pub fn commit_text(&mut self, text: &str) -> StageResult<()> {
        let Some(id) = self.editing.take() else {
            return Ok(());
        };
        self.stage.set_text(id, text)?;
        self.step();
        Ok(())
    }

    // --- actions bound to keys ---

    pub fn undo(&mut self) -> bool {
        self.cancel_gesture();
        let changed = self.history.undo(&mut self.stage);
        if changed {
            log::debug!("Undo, {}", self.history.status_text());
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        self.cancel_gesture();
        let changed = self.history.redo(&mut self.stage);
        if changed {
            log::debug!("Redo, {}", self.history.status_text());
        }
        changed
    }

    pub fn select_all(&mut self) {
        self.stage.select_all();
    }

    pub fn delete_selected(&mut self) {
        match self.stage.delete_selected_stage_objects() {
            Ok(0) => {}
            Ok(count) => {
                log::debug!("Deleted {} objects", count);
                self.step();
            }
            Err(e) => self.rejected("Delete", e),
        }
    }

    pub fn pack_selected(&mut self) -> Option<ObjectId> {
        match self.stage.pack_entity_to_section_by_selected() {
            Ok(Some(section)) => {
                self.step();
                Some(section)
            }
            Ok(None) => None,
            Err(e) => {
                self.rejected("Pack", e);
                None
            }
        }
    }

    pub fn unpack_selected(&mut self) -> Vec<ObjectId> {
        let promoted = self.stage.unpack_selected_sections();
        self.step();
        promoted
    }

    pub fn toggle_collapse_selected(&mut self) {
        if self.stage.toggle_selected_sections_collapse() > 0 {
            self.step();
        }
    }

    pub fn reverse_selected_edges(&mut self) {
        match self
            .stage
            .reverse_selected_edges(self.settings.allow_add_cycle_edge)
        {
            Ok(0) => {}
            Ok(_) => self.step(),
            Err(e) => self.rejected("Reverse edges", e),
        }
    }

    /// Turn every selected text node into an empty section.
    pub fn selected_text_nodes_to_sections(&mut self) -> Vec<ObjectId> {
        let nodes: Vec<ObjectId> = self
            .stage
            .get_selected_entities()
            .into_iter()
            .filter(|e| matches!(e, Entity::TextNode(_)))
            .map(|e| e.id())
            .collect();
        let mut sections = Vec::with_capacity(nodes.len());
        for node in nodes {
            match self.stage.text_node_to_section(node) {
                Ok(section) => sections.push(section),
                Err(e) => self.rejected("Convert to section", e),
            }
        }
        if !sections.is_empty() {
            self.step();
        }
        sections
    }

    pub fn connect_selected_undirected(&mut self) -> Option<ObjectId> {
        match self.stage.create_undirected_edge_from_selected() {
            Ok(id) => {
                self.step();
                Some(id)
            }
            Err(e) => {
                self.rejected("Undirected edge", e);
                None
            }
        }
    }

    pub fn toggle_tags(&mut self) {
        if self.stage.add_tag_by_selected() > 0 {
            self.step();
        }
    }

    /// Snap the outermost selected entities, or all top-level entities when
    /// nothing is selected, to whole-number coordinates.
    pub fn align_to_integer(&mut self) {
        let mut targets = self.stage.shallower_entities(&self.stage.selected_entity_ids());
        if targets.is_empty() {
            targets = self
                .stage
                .entities()
                .map(Entity::id)
                .filter(|id| self.stage.parent_section_of(*id).is_none())
                .collect();
        }
        for id in targets {
            let origin = self.stage.entity_collision_box(id).bounding_rectangle().origin();
            let delta = Vec2::new(origin.x.round() - origin.x, origin.y.round() - origin.y);
            if delta != Vec2::ZERO {
                if let Err(e) = self.stage.move_entities(&[id], delta) {
                    self.rejected("Align", e);
                }
            }
        }
        self.step();
    }

    /// Nudge the selected entities one step in `direction`.
    pub fn move_selected(&mut self, direction: Direction) {
        if self.stage.selected_entity_ids().is_empty() {
            return;
        }
        let delta = direction.unit() * self.settings.move_step;
        match self.stage.move_selected_entities(delta) {
            Ok(()) => self.step(),
            Err(e) => self.rejected("Move", e),
        }
    }

    /// Move the selected entities one step, entering or leaving sections.
    pub fn jump_move_selected(&mut self, direction: Direction) {
        let delta = direction.unit() * self.settings.move_step;
        match self.stage.jump_move_selected_entities(delta) {
            Ok(0) => {}
            Ok(_) => self.step(),
            Err(e) => self.rejected("Jump move", e),
        }
    }

    /// Move the selection toward `direction`. With nothing selected, picks
    /// the entity nearest the pointer.
    pub fn select_toward(&mut self, direction: Direction, additive: bool) -> Option<ObjectId> {
        let pointer = self.input.pointer_position;
        self.stage.select_in_direction(direction, additive, pointer)
    }

    pub fn clipboard(&self) -> Option<&StageSnapshot> {
        self.clipboard.as_ref()
    }

    /// Copy the selection. An empty selection keeps the previous clip.
    pub fn copy_selected(&mut self) -> bool {
        match self.stage.copy_selected() {
            Some(clip) => {
                log::debug!("Copied {} objects", clip.objects.len());
                self.clipboard = Some(clip);
                true
            }
            None => false,
        }
    }

    /// Paste the clip centered on the pointer.
    pub fn paste(&mut self) -> Vec<ObjectId> {
        let delta = self
            .clipboard
            .as_ref()
            .and_then(clip_bounds)
            .map(|bounds| self.input.pointer_position - bounds.center())
            .unwrap_or(Vec2::ZERO);
        self.paste_moved(delta)
    }

    /// Paste the clip where it was copied from.
    pub fn paste_in_place(&mut self) -> Vec<ObjectId> {
        self.paste_moved(Vec2::ZERO)
    }

    fn paste_moved(&mut self, delta: Vec2) -> Vec<ObjectId> {
        let Some(clip) = self.clipboard.as_ref() else {
            return Vec::new();
        };
        match self.stage.paste(clip, delta) {
            Ok(pasted) => {
                self.step();
                pasted
            }
            Err(e) => {
                self.rejected("Paste", e);
                Vec::new()
            }
        }
    }

    pub fn align_selected_to_grid(&mut self) {
        match self.stage.align_selected_to_grid(self.settings.align_grid) {
            Ok(0) => {}
            Ok(_) => self.step(),
            Err(e) => self.rejected("Align", e),
        }
    }

    pub fn align_selected_to_entities(&mut self) {
        match self.stage.align_selected_to_entities(self.settings.align_threshold) {
            Ok(0) => {}
            Ok(_) => self.step(),
            Err(e) => self.rejected("Align", e),
        }
    }

    /// Create a text node at a point, as a host menu action would.
    pub fn create_text_node_at(&mut self, text: &str, point: Point) -> StageResult<ObjectId> {
        let id = self.stage.add_text_node(text, point)?;
        self.step();
        Ok(id)
    }
}

/// An editor plus the keybindings that drive it.
pub struct Project {
    pub editor: Editor,
    pub keybinds: KeyBinds<Editor>,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("editor", &self.editor)
            .field("keybinds", &self.keybinds)
            .finish()
    }
}

impl Project {
    /// Project with the default keybindings, persisted in `store`.
    pub fn new(settings: StageSettings, store: Arc<dyn KeyBindStore>) -> StageResult<Self> {
        let window = settings.key_sequence_window;
        let mut keybinds = KeyBinds::new(store, window);
        register_default_keybinds(&mut keybinds)?;
        log::info!("Project ready with {} keybinds", keybinds.len());
        Ok(Self {
            editor: Editor::new(settings),
            keybinds,
        })
    }

    /// Project whose keybindings live only in memory.
    pub fn in_memory(settings: StageSettings) -> StageResult<Self> {
        Self::new(settings, Arc::new(MemoryKeyBindStore::new()))
    }

    pub fn handle_event(&mut self, event: &InputEvent) {
        self.handle_event_at(event, Instant::now());
    }

    /// Process one input event received at `now`.
    ///
    /// Keybindings see the event first. Escape then cancels the gesture in
    /// progress, and pointer events not consumed by a binding reach the
    /// active tool.
    pub fn handle_event_at(&mut self, event: &InputEvent, now: Instant) {
        self.editor.input.handle_at(event, now);
        let fired = self.keybinds.handle(event, &mut self.editor);
        if event.is_escape() {
            self.editor.cancel_gesture();
        }
        let consumed = matches!(event, InputEvent::MouseDown { .. }) && !fired.is_empty();
        if !consumed {
            self.editor.route_pointer(event);
        }
    }
}
