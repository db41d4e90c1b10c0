//! Keyboard-driven movement and directional selection.

use super::StageManager;
use crate::collision::border_point;
use crate::error::StageResult;
use crate::objects::{Entity, ObjectId};
use kurbo::{Point, Vec2};
use std::collections::HashSet;

/// One of the four arrow directions, in stage coordinates (y grows down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn unit(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Key name of the matching arrow key.
    pub fn key(self) -> &'static str {
        match self {
            Direction::Up => "arrowup",
            Direction::Down => "arrowdown",
            Direction::Left => "arrowleft",
            Direction::Right => "arrowright",
        }
    }

    /// How far `to` lies past `from` in this direction.
    fn ahead(self, from: Point, to: Point) -> f64 {
        (to - from).dot(self.unit())
    }

    /// Offset of `to` from `from` across this direction.
    fn across(self, from: Point, to: Point) -> f64 {
        let d = to - from;
        match self {
            Direction::Up | Direction::Down => d.x.abs(),
            Direction::Left | Direction::Right => d.y.abs(),
        }
    }
}

impl StageManager {
    fn center_of(&self, id: ObjectId) -> Point {
        self.entity_collision_box(id).bounding_rectangle().center()
    }

    fn is_navigable(&self, id: ObjectId) -> bool {
        self.get_entity(id).is_some_and(Entity::is_connectable) && !self.is_hidden_by_collapse(id)
    }

    /// Move the selected connectable entities by `delta`, changing section
    /// membership on the way.
    ///
    /// An entity whose new center lands in a section joins the innermost such
    /// section; one that lands outside every section leaves to the top level.
    /// Returns how many entities moved. On error the stage is unchanged.
    pub fn jump_move_selected_entities(&mut self, delta: Vec2) -> StageResult<usize> {
        let movers: Vec<ObjectId> = self
            .shallower_entities(&self.selected_entity_ids())
            .into_iter()
            .filter(|id| self.get_entity(*id).is_some_and(Entity::is_connectable))
            .collect();
        let before = self.snapshot();
        if let Err(e) = self.jump_each(&movers, delta) {
            self.restore(&before);
            return Err(e);
        }
        Ok(movers.len())
    }

    fn jump_each(&mut self, movers: &[ObjectId], delta: Vec2) -> StageResult<()> {
        for id in movers {
            let landing = self.center_of(*id) + delta;
            // Sections that move in this same jump cannot take it in
            let mut own: HashSet<ObjectId> = self.descendants_of(*id).into_iter().collect();
            own.extend(movers.iter().copied());
            let target = self
                .get_sections_by_inner_location(landing)
                .into_iter()
                .rfind(|s| !own.contains(s));
            match target {
                Some(section) => {
                    if self.parent_section_of(*id) != Some(section) {
                        self.go_in_section(&[*id], section)?;
                    }
                }
                None => {
                    while self.parent_section_of(*id).is_some() {
                        self.go_out_section(&[*id])?;
                    }
                }
            }
            self.move_entities(&[*id], delta)?;
        }
        Ok(())
    }

    /// Visible connectable entity closest to `point`, measured to its border.
    pub fn nearest_connectable_entity(&self, point: Point) -> Option<ObjectId> {
        self.entities()
            .map(Entity::id)
            .filter(|id| self.is_navigable(*id))
            .map(|id| {
                let rect = self.entity_collision_box(id).bounding_rectangle();
                (border_point(rect, point).distance(point), id)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }

    /// Move the selection one step in `direction`.
    ///
    /// Starts from the selected entity furthest in that direction. Entities
    /// joined to it by a directed edge are preferred; without any ahead, every
    /// visible connectable entity is a candidate. The candidate closest along
    /// the direction wins, ties going to the one closest across it. With
    /// `additive` the target joins the selection instead of replacing it.
    /// With nothing selected, the entity nearest `fallback` is selected.
    pub fn select_in_direction(
        &mut self,
        direction: Direction,
        additive: bool,
        fallback: Point,
    ) -> Option<ObjectId> {
        let selected: Vec<ObjectId> = self
            .selected_entity_ids()
            .into_iter()
            .filter(|id| self.is_navigable(*id))
            .collect();
        let Some(anchor) = selected.iter().copied().max_by(|a, b| {
            let (a, b) = (self.center_of(*a), self.center_of(*b));
            direction
                .ahead(Point::ZERO, a)
                .total_cmp(&direction.ahead(Point::ZERO, b))
        }) else {
            let nearest = self.nearest_connectable_entity(fallback)?;
            self.clear_selection();
            self.set_selected(nearest, true);
            return Some(nearest);
        };

        let origin = self.center_of(anchor);
        let is_ahead = |id: &ObjectId| {
            !selected.contains(id)
                && self.is_navigable(*id)
                && direction.ahead(origin, self.center_of(*id)) > 0.0
        };
        let mut pool: Vec<ObjectId> = self
            .children_of(anchor)
            .into_iter()
            .chain(self.parents_of(anchor))
            .filter(is_ahead)
            .collect();
        if pool.is_empty() {
            pool = self.entities().map(Entity::id).filter(is_ahead).collect();
        }
        let next = pool.into_iter().min_by(|a, b| {
            let (a, b) = (self.center_of(*a), self.center_of(*b));
            direction
                .ahead(origin, a)
                .total_cmp(&direction.ahead(origin, b))
                .then(direction.across(origin, a).total_cmp(&direction.across(origin, b)))
        })?;

        if !additive {
            self.clear_selection();
        }
        self.set_selected(next, true);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_at(stage: &mut StageManager, x: f64, y: f64) -> ObjectId {
        stage.add_text_node("n", Point::new(x, y)).unwrap()
    }

    #[test]
    fn test_direction_units() {
        for direction in Direction::ALL {
            assert!((direction.unit().hypot() - 1.0).abs() < f64::EPSILON);
        }
        assert_eq!(Direction::Up.key(), "arrowup");
        assert!(Direction::Down.ahead(Point::ZERO, Point::new(0.0, 5.0)) > 0.0);
    }

    #[test]
    fn test_select_nearest_when_nothing_selected() {
        let mut stage = StageManager::new();
        let _far = node_at(&mut stage, 1000.0, 0.0);
        let near = node_at(&mut stage, 100.0, 0.0);
        assert_eq!(stage.select_in_direction(Direction::Up, false, Point::ZERO), Some(near));
        assert_eq!(stage.selected_entity_ids(), vec![near]);
    }

    #[test]
    fn test_select_prefers_connected_neighbour() {
        let mut stage = StageManager::new();
        let root = node_at(&mut stage, 0.0, 0.0);
        let close = node_at(&mut stage, 0.0, 100.0);
        let child = node_at(&mut stage, 400.0, 300.0);
        stage.connect_entity(root, child, false).unwrap();
        stage.select(root).unwrap();

        assert_eq!(stage.select_in_direction(Direction::Down, false, Point::ZERO), Some(child));
        assert_eq!(stage.selected_entity_ids(), vec![child]);
        assert!(!stage.selected_entity_ids().contains(&close));
    }

    #[test]
    fn test_select_falls_back_to_closest_ahead() {
        let mut stage = StageManager::new();
        let start = node_at(&mut stage, 0.0, 0.0);
        let right = node_at(&mut stage, 200.0, 0.0);
        let _further = node_at(&mut stage, 400.0, 0.0);
        let _left = node_at(&mut stage, -200.0, 0.0);
        stage.select(start).unwrap();

        assert_eq!(stage.select_in_direction(Direction::Right, false, Point::ZERO), Some(right));
        assert_eq!(stage.selected_entity_ids(), vec![right]);
    }

    #[test]
    fn test_select_ties_broken_across_direction() {
        let mut stage = StageManager::new();
        let start = node_at(&mut stage, 0.0, 0.0);
        let _offset = node_at(&mut stage, 300.0, 0.0);
        let aligned = node_at(&mut stage, 0.0, 200.0);
        let _diagonal = node_at(&mut stage, 150.0, 200.0);
        stage.select(start).unwrap();
        assert_eq!(stage.select_in_direction(Direction::Down, false, Point::ZERO), Some(aligned));
    }

    #[test]
    fn test_additive_selection_extends_from_edge() {
        let mut stage = StageManager::new();
        let a = node_at(&mut stage, 0.0, 0.0);
        let b = node_at(&mut stage, 200.0, 0.0);
        let c = node_at(&mut stage, 400.0, 0.0);
        stage.select(a).unwrap();
        stage.select_in_direction(Direction::Right, true, Point::ZERO);
        stage.select_in_direction(Direction::Right, true, Point::ZERO);
        let mut selected = stage.selected_entity_ids();
        selected.sort();
        let mut expected = vec![a, b, c];
        expected.sort();
        assert_eq!(selected, expected);
        // Nothing further right
        assert_eq!(stage.select_in_direction(Direction::Right, true, Point::ZERO), None);
    }

    #[test]
    fn test_select_skips_collapsed_contents() {
        let mut stage = StageManager::new();
        let start = node_at(&mut stage, 0.0, 0.0);
        let hidden = node_at(&mut stage, 200.0, 0.0);
        let section = stage.add_section("s", Point::new(180.0, -20.0), vec![hidden]).unwrap();
        stage.select(section).unwrap();
        stage.toggle_selected_sections_collapse();
        stage.select(start).unwrap();
        assert_eq!(stage.select_in_direction(Direction::Right, false, Point::ZERO), Some(section));
    }

    #[test]
    fn test_jump_into_and_out_of_section() {
        let mut stage = StageManager::new();
        let inner = node_at(&mut stage, 0.0, 0.0);
        let section = stage.add_section("s", Point::new(-20.0, -20.0), vec![inner]).unwrap();
        let mover = node_at(&mut stage, 0.0, 300.0);

        // Land on the section's contents
        stage.select(mover).unwrap();
        assert_eq!(stage.jump_move_selected_entities(Vec2::new(0.0, -300.0)).unwrap(), 1);
        assert_eq!(stage.parent_section_of(mover), Some(section));
        let rect = stage.entity_collision_box(mover).bounding_rectangle();
        assert!(rect.y0.abs() < f64::EPSILON);

        // Far away from any section
        assert_eq!(stage.jump_move_selected_entities(Vec2::new(1000.0, 0.0)).unwrap(), 1);
        assert_eq!(stage.parent_section_of(mover), None);
        stage.check_integrity().unwrap();
    }

    #[test]
    fn test_jump_never_enters_own_contents() {
        let mut stage = StageManager::new();
        let inner = node_at(&mut stage, 0.0, 0.0);
        let section = stage.add_section("s", Point::new(-20.0, -20.0), vec![inner]).unwrap();
        stage.select(section).unwrap();
        stage.jump_move_selected_entities(Vec2::new(10.0, 0.0)).unwrap();
        assert_eq!(stage.parent_section_of(section), None);
        assert_eq!(stage.parent_section_of(inner), Some(section));
        stage.check_integrity().unwrap();
    }

    #[test]
    fn test_jump_does_not_enter_section_moving_with_it() {
        let mut stage = StageManager::new();
        let inner = node_at(&mut stage, 0.0, 0.0);
        let section = stage.add_section("s", Point::new(-20.0, -20.0), vec![inner]).unwrap();
        let other = node_at(&mut stage, 0.0, 150.0);
        stage.select(section).unwrap();
        stage.add_to_selection(other).unwrap();

        assert_eq!(stage.jump_move_selected_entities(Vec2::new(0.0, -100.0)).unwrap(), 2);
        assert_eq!(stage.parent_section_of(other), None);
        let rect = stage.entity_collision_box(other).bounding_rectangle();
        assert!((rect.y0 - 50.0).abs() < f64::EPSILON);
        let rect = stage.entity_collision_box(inner).bounding_rectangle();
        assert!((rect.y0 + 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_jump_skips_pen_strokes() {
        let mut stage = StageManager::new();
        let stroke = stage
            .add_pen_stroke(vec![Point::ZERO, Point::new(10.0, 10.0)], 2.0)
            .unwrap();
        stage.select(stroke).unwrap();
        assert_eq!(stage.jump_move_selected_entities(Vec2::new(100.0, 0.0)).unwrap(), 0);
    }
}
