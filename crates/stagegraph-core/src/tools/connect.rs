//! Connect and cut tool.

use super::{Tool, ToolContext};
use crate::objects::ObjectId;
use kurbo::Point;

#[derive(Debug, Clone, Default, PartialEq)]
enum Gesture {
    #[default]
    Idle,
    Connecting {
        sources: Vec<ObjectId>,
        start: Point,
        current: Point,
    },
    Cutting {
        start: Point,
        current: Point,
    },
}

/// Drag from an entity to another to connect them; drag across edges on
/// empty space to cut them.
#[derive(Debug, Clone, Default)]
pub struct ConnectTool {
    gesture: Gesture,
}

impl ConnectTool {
    /// Line being dragged, for previews.
    pub fn pending_line(&self) -> Option<(Point, Point)> {
        match &self.gesture {
            Gesture::Connecting { start, current, .. } | Gesture::Cutting { start, current } => {
                Some((*start, *current))
            }
            Gesture::Idle => None,
        }
    }

    pub fn is_cutting(&self) -> bool {
        matches!(self.gesture, Gesture::Cutting { .. })
    }

    fn connect(ctx: &mut ToolContext<'_>, sources: &[ObjectId], point: Point) {
        let Some(target) = ctx.stage.find_connectable_entity_by_location(point) else {
            log::debug!("Connection released over nothing");
            return;
        };
        let froms: Vec<ObjectId> = sources.iter().copied().filter(|s| *s != target).collect();
        if froms.is_empty() {
            return;
        }
        let allow_cycle = ctx.settings.allow_add_cycle_edge;
        match ctx.stage.connect_multiple_entities(&froms, target, allow_cycle) {
            Ok(edges) => {
                log::debug!("Connected {} sources to {}", edges.len(), target);
                ctx.record_step();
            }
            Err(e) => ctx.reject("Connect", e),
        }
    }

    fn cut(ctx: &mut ToolContext<'_>, start: Point, end: Point) {
        let crossed: Vec<ObjectId> = ctx
            .stage
            .associations()
            .filter(|a| {
                ctx.stage
                    .association_collision_box(a)
                    .intersects_segment(start, end)
            })
            .map(|a| a.id())
            .collect();
        if crossed.is_empty() {
            return;
        }
        match ctx.stage.delete_associations(&crossed) {
            Ok(count) => {
                log::debug!("Cut {} associations", count);
                ctx.record_step();
            }
            Err(e) => ctx.reject("Cut", e),
        }
    }
}

impl Tool for ConnectTool {
    fn mouse_down(&mut self, ctx: &mut ToolContext<'_>, point: Point) {
        self.gesture = match ctx.stage.find_connectable_entity_by_location(point) {
            Some(id) => {
                let pressed_selected = ctx.stage.get_entity(id).is_some_and(|e| e.is_selected());
                let sources = if pressed_selected {
                    ctx.stage
                        .get_selected_entities()
                        .into_iter()
                        .filter(|e| e.is_connectable())
                        .map(|e| e.id())
                        .collect()
                } else {
                    vec![id]
                };
                Gesture::Connecting {
                    sources,
                    start: point,
                    current: point,
                }
            }
            None => Gesture::Cutting {
                start: point,
                current: point,
            },
        };
    }

    fn mouse_move(&mut self, _ctx: &mut ToolContext<'_>, point: Point) {
        match &mut self.gesture {
            Gesture::Connecting { current, .. } | Gesture::Cutting { current, .. } => {
                *current = point
            }
            Gesture::Idle => {}
        }
    }

    fn mouse_up(&mut self, ctx: &mut ToolContext<'_>, point: Point) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Connecting { sources, .. } => Self::connect(ctx, &sources, point),
            Gesture::Cutting { start, .. } => Self::cut(ctx, start, point),
            Gesture::Idle => {}
        }
    }

    fn cancel(&mut self, _ctx: &mut ToolContext<'_>) {
        self.gesture = Gesture::Idle;
    }

    fn is_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }
}
