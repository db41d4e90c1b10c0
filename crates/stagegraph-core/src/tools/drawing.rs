//! Freehand pen tool.

use super::{Tool, ToolContext};
use kurbo::Point;

/// Default stroke width for new pen strokes.
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

/// Collects pointer positions into a pen stroke.
#[derive(Debug, Clone)]
pub struct DrawingTool {
    points: Vec<Point>,
    pub width: f64,
}

impl Default for DrawingTool {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            width: DEFAULT_STROKE_WIDTH,
        }
    }
}

impl DrawingTool {
    /// Points of the stroke in progress.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    fn push(&mut self, point: Point) {
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
    }

    /// Turn the collected points into a stroke. A single point is dropped.
    fn commit(&mut self, ctx: &mut ToolContext<'_>) {
        let points = std::mem::take(&mut self.points);
        if points.len() < 2 {
            return;
        }
        match ctx.stage.add_pen_stroke(points, self.width) {
            Ok(id) => {
                log::debug!("Committed pen stroke {}", id);
                ctx.record_step();
            }
            Err(e) => ctx.reject("Draw", e),
        }
    }
}

impl Tool for DrawingTool {
    fn mouse_down(&mut self, _ctx: &mut ToolContext<'_>, point: Point) {
        self.points.clear();
        self.points.push(point);
    }

    fn mouse_move(&mut self, _ctx: &mut ToolContext<'_>, point: Point) {
        if self.is_active() {
            self.push(point);
        }
    }

    fn mouse_up(&mut self, ctx: &mut ToolContext<'_>, point: Point) {
        if self.is_active() {
            self.push(point);
            self.commit(ctx);
        }
    }

    fn finish(&mut self, ctx: &mut ToolContext<'_>) {
        self.commit(ctx);
    }

    fn cancel(&mut self, _ctx: &mut ToolContext<'_>) {
        self.points.clear();
    }

    fn is_active(&self) -> bool {
        !self.points.is_empty()
    }
}
