//! Image and SVG entities.

use super::{new_id, EntityTrait, ObjectId, StageColor};
use crate::collision::CollisionBox;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// A raster image placed on the stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageNode {
    pub(crate) id: ObjectId,
    /// Path or key of the image data, resolved by the host.
    pub source: String,
    pub location: Point,
    /// Size at scale 1.
    pub original_size: Size,
    pub scale: f64,
    #[serde(skip)]
    pub(crate) is_selected: bool,
}

impl ImageNode {
    pub fn new(source: impl Into<String>, location: Point, original_size: Size) -> Self {
        Self {
            id: new_id(),
            source: source.into(),
            location,
            original_size,
            scale: 1.0,
            is_selected: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.location, self.original_size * self.scale)
    }

    pub(crate) fn set_scale(&mut self, scale: f64) {
        self.scale = scale.max(0.01);
    }
}

impl EntityTrait for ImageNode {
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

/// Inline SVG content placed on the stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvgNode {
    pub(crate) id: ObjectId,
    pub content: String,
    pub color: StageColor,
    pub location: Point,
    pub original_size: Size,
    pub scale: f64,
    #[serde(skip)]
    pub(crate) is_selected: bool,
}

impl SvgNode {
    pub fn new(content: impl Into<String>, location: Point, original_size: Size) -> Self {
        Self {
            id: new_id(),
            content: content.into(),
            color: StageColor::transparent(),
            location,
            original_size,
            scale: 1.0,
            is_selected: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.location, self.original_size * self.scale)
    }

    pub(crate) fn set_scale(&mut self, scale: f64) {
        self.scale = scale.max(0.01);
    }
}

impl EntityTrait for SvgNode {
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
