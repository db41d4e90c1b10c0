//! Edit modes and pointer routing.
//!
//! Exactly one tool is active. Pointer events reach only the active tool,
//! and switching tools runs the exit action of the one being left.

mod connect;
mod drawing;
mod select;

pub use connect::ConnectTool;
pub use drawing::DrawingTool;
pub use select::SelectTool;

use crate::config::StageSettings;
use crate::error::StageError;
use crate::history::HistoryManager;
use crate::input::Modifiers;
use crate::objects::ObjectId;
use crate::stage::StageManager;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Available edit modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    SelectAndMove,
    Drawing,
    ConnectAndCutting,
}

impl ToolKind {
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::SelectAndMove => "select",
            ToolKind::Drawing => "drawing",
            ToolKind::ConnectAndCutting => "connect",
        }
    }
}

/// Non-fatal message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Info(String),
    Warning(String),
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Notification::Info(message) | Notification::Warning(message) => message,
        }
    }
}

/// Everything a tool may touch while handling an event.
pub struct ToolContext<'a> {
    pub stage: &'a mut StageManager,
    pub history: &'a mut HistoryManager,
    pub settings: &'a StageSettings,
    pub notifications: &'a mut Vec<Notification>,
    /// Modifiers of the event being handled.
    pub modifiers: Modifiers,
}

impl ToolContext<'_> {
    /// Checkpoint a completed gesture.
    pub fn record_step(&mut self) {
        self.history.record_step(self.stage);
    }

    /// Report a rejected operation to the user.
    pub fn reject(&mut self, action: &str, error: StageError) {
        log::warn!("{} rejected: {}", action, error);
        self.notifications
            .push(Notification::Warning(format!("{}: {}", action, error)));
    }
}

/// Pointer handlers of one edit mode. Positions are world coordinates.
pub trait Tool {
    fn mouse_down(&mut self, ctx: &mut ToolContext<'_>, point: Point);

    fn mouse_move(&mut self, ctx: &mut ToolContext<'_>, point: Point);

    fn mouse_up(&mut self, ctx: &mut ToolContext<'_>, point: Point);

    /// Returns the object whose text editing starts, if any.
    fn double_click(&mut self, _ctx: &mut ToolContext<'_>, _point: Point) -> Option<ObjectId> {
        None
    }

    /// Exit action run when another tool becomes active.
    fn finish(&mut self, ctx: &mut ToolContext<'_>) {
        self.cancel(ctx);
    }

    /// Abandon the gesture in progress.
    fn cancel(&mut self, ctx: &mut ToolContext<'_>);

    /// Is a gesture in progress?
    fn is_active(&self) -> bool;
}

/// Owns every tool and routes events to the current one.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    current_tool: ToolKind,
    pub select: SelectTool,
    pub drawing: DrawingTool,
    pub connect: ConnectTool,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tool(&self) -> ToolKind {
        self.current_tool
    }

    /// Make `tool` current, finishing the gesture of the previous one.
    pub fn switch(&mut self, tool: ToolKind, ctx: &mut ToolContext<'_>) {
        if tool == self.current_tool {
            return;
        }
        self.active_mut().finish(ctx);
        log::info!("Mode: {} -> {}", self.current_tool.name(), tool.name());
        self.current_tool = tool;
    }

    pub fn active(&self) -> &dyn Tool {
        match self.current_tool {
            ToolKind::SelectAndMove => &self.select,
            ToolKind::Drawing => &self.drawing,
            ToolKind::ConnectAndCutting => &self.connect,
        }
    }

    pub fn active_mut(&mut self) -> &mut dyn Tool {
        match self.current_tool {
            ToolKind::SelectAndMove => &mut self.select,
            ToolKind::Drawing => &mut self.drawing,
            ToolKind::ConnectAndCutting => &mut self.connect,
        }
    }

    pub fn mouse_down(&mut self, ctx: &mut ToolContext<'_>, point: Point) {
        self.active_mut().mouse_down(ctx, point);
    }

    pub fn mouse_move(&mut self, ctx: &mut ToolContext<'_>, point: Point) {
        self.active_mut().mouse_move(ctx, point);
    }

    pub fn mouse_up(&mut self, ctx: &mut ToolContext<'_>, point: Point) {
        self.active_mut().mouse_up(ctx, point);
    }

    pub fn double_click(&mut self, ctx: &mut ToolContext<'_>, point: Point) -> Option<ObjectId> {
        self.active_mut().double_click(ctx, point)
    }

    pub fn cancel(&mut self, ctx: &mut ToolContext<'_>) {
        self.active_mut().cancel(ctx);
    }
}

/// Test harness owning the state a [`ToolContext`] borrows.
#[cfg(test)]
pub(crate) struct Harness {
    pub stage: StageManager,
    pub history: HistoryManager,
    pub settings: StageSettings,
    pub notifications: Vec<Notification>,
}

#[cfg(test)]
impl Harness {
    pub fn new() -> Self {
        let stage = StageManager::new();
        let mut history = HistoryManager::default();
        history.reset(&stage);
        Self {
            stage,
            history,
            settings: StageSettings::default(),
            notifications: Vec::new(),
        }
    }

    pub fn ctx(&mut self) -> ToolContext<'_> {
        self.ctx_with(Modifiers::NONE)
    }

    pub fn ctx_with(&mut self, modifiers: Modifiers) -> ToolContext<'_> {
        ToolContext {
            stage: &mut self.stage,
            history: &mut self.history,
            settings: &self.settings,
            notifications: &mut self.notifications,
            modifiers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_finishes_drawing() {
        let mut h = Harness::new();
        let mut tools = ToolManager::new();
        tools.switch(ToolKind::Drawing, &mut h.ctx());
        tools.mouse_down(&mut h.ctx(), Point::new(0.0, 0.0));
        tools.mouse_move(&mut h.ctx(), Point::new(10.0, 0.0));
        assert!(tools.active().is_active());

        tools.switch(ToolKind::SelectAndMove, &mut h.ctx());
        assert_eq!(tools.current_tool(), ToolKind::SelectAndMove);
        assert!(!tools.drawing.is_active());
        assert_eq!(h.stage.len(), 1);
        assert!(h.history.can_undo());
    }

    #[test]
    fn test_switch_cancels_connection() {
        let mut h = Harness::new();
        let a = h.stage.add_text_node("a", Point::ZERO).unwrap();
        let mut tools = ToolManager::new();
        tools.switch(ToolKind::ConnectAndCutting, &mut h.ctx());
        let start = h.stage.entity_collision_box(a).bounding_rectangle().center();
        tools.mouse_down(&mut h.ctx(), start);
        assert!(tools.connect.is_active());

        tools.switch(ToolKind::Drawing, &mut h.ctx());
        assert!(!tools.connect.is_active());
        assert_eq!(h.stage.associations().count(), 0);
    }

    #[test]
    fn test_only_active_tool_receives_events() {
        let mut h = Harness::new();
        let mut tools = ToolManager::new();
        tools.mouse_down(&mut h.ctx(), Point::ZERO);
        tools.mouse_move(&mut h.ctx(), Point::new(20.0, 20.0));
        assert!(!tools.drawing.is_active());
        tools.mouse_up(&mut h.ctx(), Point::new(20.0, 20.0));
        assert!(h.stage.is_empty());
    }

    #[test]
    fn test_reject_queues_warning() {
        let mut h = Harness::new();
        let id = crate::objects::ObjectId::nil();
        h.ctx().reject("Connect", StageError::missing(id));
        assert_eq!(h.notifications.len(), 1);
        assert!(h.notifications[0].message().starts_with("Connect:"));
    }
}
