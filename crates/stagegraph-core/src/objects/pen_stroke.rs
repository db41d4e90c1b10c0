//! Freehand pen stroke entity.

use super::{new_id, EntityTrait, ObjectId, StageColor};
use crate::collision::CollisionBox;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// A polyline drawn in drawing mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenStroke {
    pub(crate) id: ObjectId,
    pub points: Vec<Point>,
    pub width: f64,
    pub color: StageColor,
    #[serde(skip)]
    pub(crate) is_selected: bool,
}

impl PenStroke {
    pub fn new(points: Vec<Point>, width: f64) -> Self {
        Self {
            id: new_id(),
            points,
            width,
            color: StageColor::new(0, 0, 0, 255),
            is_selected: false,
        }
    }
}

impl EntityTrait for PenStroke {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn collision_box(&self) -> CollisionBox {
        CollisionBox::from_polyline(&self.points, self.width / 2.0 + 2.0)
    }

    fn translate(&mut self, delta: Vec2) {
        for p in &mut self.points {
            *p += delta;
        }
    }

    fn is_selected(&self) -> bool {
        self.is_selected
    }

    fn set_selected(&mut self, selected: bool) {
        self.is_selected = selected;
    }
}
