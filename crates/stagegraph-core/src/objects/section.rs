//! Section: a collapsible container entity.

use super::{new_id, EntityTrait, ObjectId, StageColor};
use crate::collision::CollisionBox;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Container grouping child entities by uuid.
///
/// The expanded box is derived from the children by the stage on every
/// query. The section itself only stores the rectangle used when it has
/// no children or is collapsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub(crate) id: ObjectId,
    pub text: String,
    pub color: StageColor,
    /// Top-left of the fallback rectangle.
    pub location: Point,
    pub(crate) children: Vec<ObjectId>,
    pub collapsed: bool,
    /// Rectangle captured when the section was collapsed.
    pub(crate) collapsed_rect: Option<Rect>,
    #[serde(skip)]
    pub(crate) is_selected: bool,
}

impl Section {
    /// Space between children and the section border.
    pub const PADDING: f64 = 30.0;
    /// Height of the title bar above the children.
    pub const TITLE_HEIGHT: f64 = 50.0;
    /// Size of a section without children.
    pub const EMPTY_SIZE: Size = Size::new(100.0, 100.0);

    pub fn new(text: impl Into<String>, location: Point, children: Vec<ObjectId>) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            color: StageColor::transparent(),
            location,
            children,
            collapsed: false,
            collapsed_rect: None,
            is_selected: false,
        }
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// Rectangle used when the box cannot be derived from children.
    pub fn fixed_rect(&self) -> Rect {
        match (self.collapsed, self.collapsed_rect) {
            (true, Some(rect)) => rect,
            _ => Rect::from_origin_size(self.location, Self::EMPTY_SIZE),
        }
    }

    /// Wrap the union of the children's bounds with padding and a title bar.
    pub fn frame_around(children_bounds: Rect) -> Rect {
        Rect::new(
            children_bounds.x0 - Self::PADDING,
            children_bounds.y0 - Self::PADDING - Self::TITLE_HEIGHT,
            children_bounds.x1 + Self::PADDING,
            children_bounds.y1 + Self::PADDING,
        )
    }
}

impl EntityTrait for Section {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn collision_box(&self) -> CollisionBox {
        CollisionBox::from_rect(self.fixed_rect())
    }

    fn translate(&mut self, delta: Vec2) {
        self.location += delta;
        if let Some(rect) = self.collapsed_rect.as_mut() {
            *rect = *rect + delta;
        }
    }

    fn is_selected(&self) -> bool {
        self.is_selected
    }

    fn set_selected(&mut self, selected: bool) {
        self.is_selected = selected;
    }
}
