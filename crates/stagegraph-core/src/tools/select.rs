//! Select and move tool.

use super::{Tool, ToolContext};
use crate::objects::{ObjectId, Section, StageObject};
use crate::stage::StageManager;
use kurbo::{Point, Rect, Vec2};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum Gesture {
    #[default]
    Idle,
    /// Dragging the selection; `last` is where the selection was last moved to.
    Moving { start: Point, last: Point },
    Marquee {
        start: Point,
        current: Point,
        additive: bool,
    },
}

/// Click to select, drag to move, drag on empty space for a marquee.
#[derive(Debug, Clone, Default)]
pub struct SelectTool {
    gesture: Gesture,
}

impl SelectTool {
    /// Marquee rectangle while one is being dragged.
    pub fn marquee(&self) -> Option<Rect> {
        match self.gesture {
            Gesture::Marquee { start, current, .. } => Some(Rect::from_points(start, current)),
            _ => None,
        }
    }

    fn drag_to(&mut self, ctx: &mut ToolContext<'_>, point: Point) {
        let Gesture::Moving { start, last } = self.gesture else {
            return;
        };
        let delta = point - last;
        if delta == Vec2::ZERO {
            return;
        }
        match ctx.stage.move_selected_entities(delta) {
            Ok(()) => self.gesture = Gesture::Moving { start, last: point },
            Err(e) => {
                ctx.reject("Move", e);
                self.gesture = Gesture::Idle;
            }
        }
    }

    fn end_move(&mut self, ctx: &mut ToolContext<'_>) {
        if let Gesture::Moving { start, last } = self.gesture {
            if start != last {
                ctx.record_step();
            }
        }
        self.gesture = Gesture::Idle;
    }
}

/// Is `point` in the body of an expanded section rather than on its title bar?
fn in_section_body(stage: &StageManager, id: ObjectId, point: Point) -> bool {
    stage.get_section(id).is_some_and(|section| {
        let frame = stage.entity_collision_box(id).bounding_rectangle();
        !section.collapsed && point.y > frame.y0 + Section::TITLE_HEIGHT
    })
}

impl Tool for SelectTool {
    fn mouse_down(&mut self, ctx: &mut ToolContext<'_>, point: Point) {
        let additive = ctx.modifiers.shift;
        let Some(id) = ctx.stage.find_stage_object_by_location(point) else {
            self.gesture = Gesture::Marquee {
                start: point,
                current: point,
                additive,
            };
            return;
        };
        let already = ctx.stage.get(id).is_some_and(StageObject::is_selected);
        let result = if additive {
            ctx.stage.add_to_selection(id)
        } else if already {
            // Keep the multi-selection so the drag moves all of it
            Ok(())
        } else {
            ctx.stage.select(id)
        };
        match result {
            Ok(()) => {
                self.gesture = Gesture::Moving {
                    start: point,
                    last: point,
                }
            }
            Err(e) => ctx.reject("Select", e),
        }
    }

    fn mouse_move(&mut self, ctx: &mut ToolContext<'_>, point: Point) {
        match &mut self.gesture {
            Gesture::Moving { .. } => self.drag_to(ctx, point),
            Gesture::Marquee { current, .. } => *current = point,
            Gesture::Idle => {}
        }
    }

    fn mouse_up(&mut self, ctx: &mut ToolContext<'_>, point: Point) {
        match self.gesture {
            Gesture::Moving { .. } => {
                self.drag_to(ctx, point);
                self.end_move(ctx);
            }
            Gesture::Marquee { start, additive, .. } => {
                let rect = Rect::from_points(start, point);
                if rect.area() > 0.0 {
                    let count = ctx.stage.select_in_rect(rect, additive);
                    log::debug!("Marquee selected {} objects", count);
                } else if !additive {
                    ctx.stage.clear_selection();
                }
                self.gesture = Gesture::Idle;
            }
            Gesture::Idle => {}
        }
    }

    fn double_click(&mut self, ctx: &mut ToolContext<'_>, point: Point) -> Option<ObjectId> {
        self.gesture = Gesture::Idle;
        let stage = &mut *ctx.stage;

        let hit = stage.find_association_by_location(point).or_else(|| {
            stage
                .find_entity_by_location(point)
                .filter(|id| !in_section_body(stage, *id, point))
        });
        if let Some(id) = hit {
            if let Err(e) = stage.select(id) {
                ctx.reject("Edit", e);
                return None;
            }
            return Some(id);
        }

        let parent = stage.get_sections_by_inner_location(point).last().copied();
        let created = stage.add_text_node("", point).and_then(|node| {
            if let Some(section) = parent {
                stage.go_in_section(&[node], section)?;
            }
            stage.select(node)?;
            Ok(node)
        });
        match created {
            Ok(node) => {
                log::debug!("Created text node {} by double-click", node);
                ctx.record_step();
                Some(node)
            }
            Err(e) => {
                ctx.reject("Create node", e);
                None
            }
        }
    }

    fn finish(&mut self, ctx: &mut ToolContext<'_>) {
        match self.gesture {
            Gesture::Moving { .. } => self.end_move(ctx),
            _ => self.gesture = Gesture::Idle,
        }
    }

    fn cancel(&mut self, ctx: &mut ToolContext<'_>) {
        if let Gesture::Moving { start, last } = self.gesture {
            if let Err(e) = ctx.stage.move_selected_entities(start - last) {
                ctx.reject("Cancel move", e);
            }
        }
        self.gesture = Gesture::Idle;
    }

    fn is_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use crate::objects::{Entity, TextNode};
    use crate::tools::Harness;

    fn center(h: &Harness, id: ObjectId) -> Point {
        h.stage.entity_collision_box(id).bounding_rectangle().center()
    }

    fn location(h: &Harness, id: ObjectId) -> Point {
        match h.stage.get_entity(id) {
            Some(Entity::TextNode(node)) => node.location,
            _ => panic!("not a text node"),
        }
    }

    #[test]
    fn test_click_selects_and_shift_adds() {
        let mut h = Harness::new();
        let a = h.stage.add_text_node("a", Point::ZERO).unwrap();
        let b = h.stage.add_text_node("b", Point::new(300.0, 0.0)).unwrap();
        let mut tool = SelectTool::default();

        let pa = center(&h, a);
        tool.mouse_down(&mut h.ctx(), pa);
        tool.mouse_up(&mut h.ctx(), pa);
        assert_eq!(h.stage.selected_entity_ids(), vec![a]);

        let pb = center(&h, b);
        tool.mouse_down(&mut h.ctx_with(Modifiers::shift()), pb);
        tool.mouse_up(&mut h.ctx_with(Modifiers::shift()), pb);
        assert_eq!(h.stage.get_selected_entities().len(), 2);

        // Click on empty space clears
        tool.mouse_down(&mut h.ctx(), Point::new(-500.0, -500.0));
        tool.mouse_up(&mut h.ctx(), Point::new(-500.0, -500.0));
        assert!(h.stage.get_selected_entities().is_empty());
        assert!(!h.history.can_undo());
    }

    #[test]
    fn test_drag_moves_selection_as_one_step() {
        let mut h = Harness::new();
        let a = h.stage.add_text_node("a", Point::ZERO).unwrap();
        h.history.record_step(&h.stage);
        let mut tool = SelectTool::default();
        let p = center(&h, a);

        tool.mouse_down(&mut h.ctx(), p);
        tool.mouse_move(&mut h.ctx(), p + Vec2::new(10.0, 0.0));
        tool.mouse_move(&mut h.ctx(), p + Vec2::new(20.0, 5.0));
        tool.mouse_up(&mut h.ctx(), p + Vec2::new(30.0, 10.0));

        let moved = location(&h, a);
        assert!((moved.x - 30.0).abs() < f64::EPSILON);
        assert!((moved.y - 10.0).abs() < f64::EPSILON);
        assert_eq!(h.history.len(), 3);

        assert!(h.history.undo(&mut h.stage));
        assert!(location(&h, a).x.abs() < f64::EPSILON);
        assert!(h.history.undo(&mut h.stage));
        assert!(h.stage.is_empty());
    }

    #[test]
    fn test_cancel_reverts_drag() {
        let mut h = Harness::new();
        let a = h.stage.add_text_node("a", Point::new(5.0, 5.0)).unwrap();
        let mut tool = SelectTool::default();
        let p = center(&h, a);

        tool.mouse_down(&mut h.ctx(), p);
        tool.mouse_move(&mut h.ctx(), p + Vec2::new(40.0, 40.0));
        tool.cancel(&mut h.ctx());
        tool.mouse_up(&mut h.ctx(), p + Vec2::new(50.0, 50.0));

        let back = location(&h, a);
        assert!((back.x - 5.0).abs() < f64::EPSILON);
        assert!((back.y - 5.0).abs() < f64::EPSILON);
        assert!(!h.history.can_undo());
    }

    #[test]
    fn test_marquee_selects_overlapping() {
        let mut h = Harness::new();
        let a = h.stage.add_text_node("a", Point::ZERO).unwrap();
        let far = h.stage.add_text_node("far", Point::new(1000.0, 1000.0)).unwrap();
        let mut tool = SelectTool::default();

        tool.mouse_down(&mut h.ctx(), Point::new(-10.0, -10.0));
        tool.mouse_move(&mut h.ctx(), Point::new(15.0, 15.0));
        assert!(tool.marquee().is_some());
        tool.mouse_up(&mut h.ctx(), Point::new(20.0, 20.0));

        assert!(h.stage.get_entity(a).unwrap().is_selected());
        assert!(!h.stage.get_entity(far).unwrap().is_selected());
        assert!(tool.marquee().is_none());
    }

    #[test]
    fn test_double_click_edits_hit_object() {
        let mut h = Harness::new();
        let a = h.stage.add_text_node("a", Point::ZERO).unwrap();
        let b = h.stage.add_text_node("b", Point::new(400.0, 0.0)).unwrap();
        let edge = h.stage.connect_entity(a, b, false).unwrap();
        let mut tool = SelectTool::default();

        let mid = center(&h, a).midpoint(center(&h, b));
        assert_eq!(tool.double_click(&mut h.ctx(), mid), Some(edge));
        let pa = center(&h, a);
        assert_eq!(tool.double_click(&mut h.ctx(), pa), Some(a));
        assert_eq!(h.stage.len(), 3);
        assert!(!h.history.can_undo());
    }

    #[test]
    fn test_double_click_in_section_body_creates_child() {
        let mut h = Harness::new();
        let a = h.stage.add_text_node("a", Point::ZERO).unwrap();
        let section = h.stage.add_section("S", Point::ZERO, vec![a]).unwrap();
        let size = TextNode::estimate_size("a");
        let mut tool = SelectTool::default();

        let body = Point::new(size.width + 15.0, size.height + 15.0);
        let node = tool.double_click(&mut h.ctx(), body).unwrap();
        assert_eq!(h.stage.parent_section_of(node), Some(section));
        assert_eq!(h.stage.selected_entity_ids(), vec![node]);
        assert_eq!(h.history.len(), 2);

        // The title bar edits the section itself
        let title = Point::new(0.0, -Section::PADDING - Section::TITLE_HEIGHT + 10.0);
        assert_eq!(tool.double_click(&mut h.ctx(), title), Some(section));
    }

    #[test]
    fn test_double_click_on_empty_space_creates_node() {
        let mut h = Harness::new();
        let mut tool = SelectTool::default();
        let node = tool.double_click(&mut h.ctx(), Point::new(50.0, 60.0)).unwrap();
        assert!(h.stage.get_text_node(node).is_some());
        assert_eq!(h.stage.parent_section_of(node), None);
        assert!((location(&h, node).y - 60.0).abs() < f64::EPSILON);
    }
}
