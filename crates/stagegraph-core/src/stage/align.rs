//! Snapping the selection to a grid or to neighbouring entities.

use super::StageManager;
use crate::collision::CollisionShape;
use crate::error::StageResult;
use crate::objects::{Entity, ObjectId};
use kurbo::{Rect, Vec2};
use std::collections::HashSet;

/// Grid pitch for [`StageManager::align_selected_to_grid`].
pub const ALIGN_GRID: f64 = 50.0;

/// Largest gap [`StageManager::align_selected_to_entities`] will close.
pub const ALIGN_THRESHOLD: f64 = 25.0;

/// Shift putting whichever of `low` and `high` is nearer a grid line onto it.
fn grid_shift(low: f64, high: f64, grid: f64) -> f64 {
    let snap = |v: f64| {
        let rest = v.rem_euclid(grid);
        if rest < grid - rest { -rest } else { grid - rest }
    };
    let (low, high) = (snap(low), snap(high));
    if low.abs() < high.abs() { low } else { high }
}

/// Smallest of the start, middle and end offsets from `own` to `other`,
/// when it is under `threshold`.
fn edge_shift(own: (f64, f64), other: (f64, f64), threshold: f64) -> Option<f64> {
    let mid = |(lo, hi): (f64, f64)| (lo + hi) / 2.0;
    [other.0 - own.0, mid(other) - mid(own), other.1 - own.1]
        .into_iter()
        .min_by(|a, b| a.abs().total_cmp(&b.abs()))
        .filter(|d| d.abs() < threshold)
}

impl StageManager {
    /// Outermost selected entities that take part in alignment.
    fn alignable_selection(&self) -> Vec<ObjectId> {
        self.shallower_entities(&self.selected_entity_ids())
            .into_iter()
            .filter(|id| !matches!(self.get_entity(*id), Some(Entity::PenStroke(_))))
            .collect()
    }

    fn entity_rect(&self, id: ObjectId) -> Rect {
        self.entity_collision_box(id).bounding_rectangle()
    }

    /// Move every selected entity so that, on each axis, the edge closer to
    /// a grid line lies on it. Pen strokes stay put. Returns how many
    /// entities moved.
    pub fn align_selected_to_grid(&mut self, grid: f64) -> StageResult<usize> {
        if grid <= 0.0 {
            return Ok(0);
        }
        let mut moved = 0;
        for id in self.alignable_selection() {
            let rect = self.entity_rect(id);
            let delta = Vec2::new(
                grid_shift(rect.x0, rect.x1, grid),
                grid_shift(rect.y0, rect.y1, grid),
            );
            if delta != Vec2::ZERO {
                self.move_entities(&[id], delta)?;
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Line up each selected entity with the nearest unselected entities.
    ///
    /// Per axis, the closest non-overlapping neighbour whose left, center or
    /// right (top, center or bottom) line is within `threshold` decides the
    /// shift. Pen strokes and entities hidden by a collapsed section take no
    /// part. Returns how many entities moved.
    pub fn align_selected_to_entities(&mut self, threshold: f64) -> StageResult<usize> {
        let movers = self.alignable_selection();
        let mut moving: HashSet<ObjectId> = HashSet::new();
        for id in &movers {
            moving.insert(*id);
            moving.extend(self.descendants_of(*id));
        }
        let others: Vec<Rect> = self
            .entities()
            .filter(|e| !e.is_selected() && !matches!(e, Entity::PenStroke(_)))
            .map(Entity::id)
            .filter(|id| !moving.contains(id) && !self.is_hidden_by_collapse(*id))
            .map(|id| self.entity_rect(id))
            .collect();

        let mut moved = 0;
        for id in movers {
            let rect = self.entity_rect(id);
            let center = rect.center();
            let mut near: Vec<Rect> = others
                .iter()
                .copied()
                .filter(|other| !CollisionShape::Rectangle(rect).overlaps_rectangle(*other))
                .collect();
            near.sort_by(|a, b| {
                (a.center() - center)
                    .hypot()
                    .total_cmp(&(b.center() - center).hypot())
            });

            let dx = near
                .iter()
                .find_map(|other| edge_shift((rect.x0, rect.x1), (other.x0, other.x1), threshold))
                .unwrap_or(0.0);
            let dy = near
                .iter()
                .find_map(|other| edge_shift((rect.y0, rect.y1), (other.y0, other.y1), threshold))
                .unwrap_or(0.0);
            let delta = Vec2::new(dx, dy);
            if delta != Vec2::ZERO {
                self.move_entities(&[id], delta)?;
                moved += 1;
            }
        }
        Ok(moved)
    }
}
