//! Text node entity.

use super::{new_id, EntityTrait, ObjectId, StageColor};
use crate::collision::CollisionBox;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// How a text node's size is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizeAdjust {
    /// Size follows the text.
    #[default]
    Auto,
    /// Size was set by the user and stays put.
    Manual,
}

/// A node displaying a block of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub(crate) id: ObjectId,
    pub text: String,
    #[serde(default)]
    pub details: String,
    pub color: StageColor,
    /// Top-left corner.
    pub location: Point,
    pub size: Size,
    pub size_adjust: SizeAdjust,
    #[serde(skip)]
    pub(crate) is_selected: bool,
}

impl TextNode {
    pub const FONT_SIZE: f64 = 32.0;
    pub const PADDING: f64 = 14.0;

    pub fn new(text: impl Into<String>, location: Point) -> Self {
        let text = text.into();
        let size = Self::estimate_size(&text);
        Self {
            id: new_id(),
            text,
            details: String::new(),
            color: StageColor::transparent(),
            location,
            size,
            size_adjust: SizeAdjust::Auto,
            is_selected: false,
        }
    }

    /// Rough layout size for text without a font system.
    pub fn estimate_size(text: &str) -> Size {
        let lines = text.lines().count().max(1) as f64;
        let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0) as f64;
        Size::new(
            longest * Self::FONT_SIZE * 0.5 + Self::PADDING * 2.0,
            lines * Self::FONT_SIZE + Self::PADDING * 2.0,
        )
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.location, self.size)
    }

    pub(crate) fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        if self.size_adjust == SizeAdjust::Auto {
            self.size = Self::estimate_size(&self.text);
        }
    }

    pub(crate) fn resize_to(&mut self, size: Size) {
        self.size = size;
        self.size_adjust = SizeAdjust::Manual;
    }
}

impl EntityTrait for TextNode {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn collision_box(&self) -> CollisionBox {
        CollisionBox::from_rect(self.rect())
    }

    fn translate(&mut self, delta: Vec2) {
        self.location += delta;
    }

    fn is_selected(&self) -> bool {
        self.is_selected
    }

    fn set_selected(&mut self, selected: bool) {
        self.is_selected = selected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_size_follows_text() {
        let mut node = TextNode::new("ab", Point::ZERO);
        let short = node.size.width;
        node.set_text("abcdef");
        assert!(node.size.width > short);

        node.set_text("one\ntwo");
        let expected = 2.0 * TextNode::FONT_SIZE + TextNode::PADDING * 2.0;
        assert!((node.size.height - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_manual_size_is_kept() {
        let mut node = TextNode::new("ab", Point::ZERO);
        node.resize_to(Size::new(300.0, 80.0));
        node.set_text("a much longer line of text");
        assert_eq!(node.size_adjust, SizeAdjust::Manual);
        assert!((node.size.width - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_collision_box_is_rect() {
        let node = TextNode::new("x", Point::new(10.0, 10.0));
        let cb = node.collision_box();
        assert_eq!(cb.shapes.len(), 1);
        assert!(cb.is_point_in(Point::new(12.0, 12.0)));
        assert!(!cb.is_point_in(Point::new(9.0, 12.0)));
    }
}
