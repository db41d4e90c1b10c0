//! The stage: authoritative registry of every stage object.

mod align;
mod clipboard;
mod connect;
mod delete;
mod navigate;
mod section;
mod tag;

pub use align::{ALIGN_GRID, ALIGN_THRESHOLD};
pub use clipboard::clip_bounds;
pub use navigate::Direction;

use crate::collision::{border_point, CollisionBox, CollisionShape};
use crate::error::{StageError, StageResult};
use crate::objects::{
    Association, Entity, ImageNode, ObjectId, PenStroke, Section, StageObject,
    SvgNode, TextNode,
};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Radius of the loop drawn for an edge whose ends coincide.
const SELF_LOOP_RADIUS: f64 = 15.0;

/// Serializable copy of the stage contents, in z-order.
///
/// Snapshots never carry selection state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub objects: Vec<StageObject>,
    pub tags: Vec<ObjectId>,
}

/// Registry of entities and associations.
///
/// All mutation goes through named operations so the invariants checked by
/// [`StageManager::check_integrity`] hold after every call. Operations that
/// fail return an error and leave the stage untouched.
#[derive(Debug, Clone)]
pub struct StageManager {
    objects: HashMap<ObjectId, StageObject>,
    /// Z-order (back to front).
    z_order: Vec<ObjectId>,
    /// Tagged entities in display order.
    tags: Vec<ObjectId>,
    hit_tolerance: f64,
}

impl Default for StageManager {
    fn default() -> Self {
        Self {
            objects: HashMap::new(),
            z_order: Vec::new(),
            tags: Vec::new(),
            hit_tolerance: 4.0,
        }
    }
}

impl StageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hit distance used for line-like association boxes.
    pub fn set_hit_tolerance(&mut self, tolerance: f64) {
        self.hit_tolerance = tolerance.max(0.0);
    }

    // --- lookup ---

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&StageObject> {
        self.objects.get(&id)
    }

    pub fn get_entity(&self, id: ObjectId) -> Option<&Entity> {
        self.objects.get(&id).and_then(StageObject::as_entity)
    }

    pub fn get_association(&self, id: ObjectId) -> Option<&Association> {
        self.objects.get(&id).and_then(StageObject::as_association)
    }

    pub fn get_section(&self, id: ObjectId) -> Option<&Section> {
        self.get_entity(id).and_then(Entity::as_section)
    }

    pub fn get_text_node(&self, id: ObjectId) -> Option<&TextNode> {
        match self.get_entity(id) {
            Some(Entity::TextNode(node)) => Some(node),
            _ => None,
        }
    }

    /// Object ids back to front.
    pub fn z_order(&self) -> &[ObjectId] {
        &self.z_order
    }

    /// Entities back to front.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.z_order
            .iter()
            .filter_map(|id| self.objects.get(id).and_then(StageObject::as_entity))
    }

    /// Associations back to front.
    pub fn associations(&self) -> impl Iterator<Item = &Association> {
        self.z_order
            .iter()
            .filter_map(|id| self.objects.get(id).and_then(StageObject::as_association))
    }

    pub(crate) fn entity_mut(&mut self, id: ObjectId) -> Option<&mut Entity> {
        match self.objects.get_mut(&id) {
            Some(StageObject::Entity(e)) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn section_mut(&mut self, id: ObjectId) -> Option<&mut Section> {
        self.entity_mut(id).and_then(Entity::as_section_mut)
    }

    pub(crate) fn association_mut(&mut self, id: ObjectId) -> Option<&mut Association> {
        match self.objects.get_mut(&id) {
            Some(StageObject::Association(a)) => Some(a),
            _ => None,
        }
    }

    // --- insertion ---

    /// Insert an entity or association.
    ///
    /// Rejects duplicate uuids, associations with unresolved or
    /// non-connectable endpoints, and sections whose children are missing or
    /// already owned by another section.
    pub fn add(&mut self, object: impl Into<StageObject>) -> StageResult<ObjectId> {
        let object = object.into();
        let id = object.id();
        if self.objects.contains_key(&id) {
            return Err(StageError::IntegrityViolation(format!(
                "uuid {} already present",
                id
            )));
        }

        match &object {
            StageObject::Association(association) => self.validate_association(association)?,
            StageObject::Entity(Entity::Section(section)) => self.validate_new_section(section)?,
            StageObject::Entity(_) => {}
        }

        // Sections render beneath their first child
        let z_index = match &object {
            StageObject::Entity(Entity::Section(section)) => self
                .z_order
                .iter()
                .position(|z| section.children.contains(z))
                .unwrap_or(self.z_order.len()),
            _ => self.z_order.len(),
        };
        self.z_order.insert(z_index, id);
        self.objects.insert(id, object);
        log::debug!("Added stage object {}", id);
        Ok(id)
    }

    pub fn add_text_node(&mut self, text: impl Into<String>, location: Point) -> StageResult<ObjectId> {
        self.add(Entity::TextNode(TextNode::new(text, location)))
    }

    pub fn add_image_node(
        &mut self,
        source: impl Into<String>,
        location: Point,
        size: Size,
    ) -> StageResult<ObjectId> {
        self.add(Entity::ImageNode(ImageNode::new(source, location, size)))
    }

    pub fn add_svg_node(
        &mut self,
        content: impl Into<String>,
        location: Point,
        size: Size,
    ) -> StageResult<ObjectId> {
        self.add(Entity::SvgNode(SvgNode::new(content, location, size)))
    }

    pub fn add_pen_stroke(&mut self, points: Vec<Point>, width: f64) -> StageResult<ObjectId> {
        self.add(Entity::PenStroke(PenStroke::new(points, width)))
    }

    /// Create a section around existing top-level or sibling entities.
    pub fn add_section(
        &mut self,
        text: impl Into<String>,
        location: Point,
        children: Vec<ObjectId>,
    ) -> StageResult<ObjectId> {
        self.add(Entity::Section(Section::new(text, location, children)))
    }

    fn validate_association(&self, association: &Association) -> StageResult<()> {
        let targets = association.targets();
        if let Association::MultiTargetUndirectedEdge(_) = association {
            let distinct: HashSet<_> = targets.iter().collect();
            if distinct.len() < 2 || distinct.len() != targets.len() {
                return Err(StageError::IntegrityViolation(format!(
                    "undirected edge {} needs at least two distinct targets",
                    association.id()
                )));
            }
        }
        for target in targets {
            match self.get_entity(target) {
                Some(entity) if entity.is_connectable() => {}
                Some(_) => {
                    return Err(StageError::IntegrityViolation(format!(
                        "entity {} is not connectable",
                        target
                    )));
                }
                None => return Err(StageError::missing(target)),
            }
        }
        Ok(())
    }

    fn validate_new_section(&self, section: &Section) -> StageResult<()> {
        let mut seen = HashSet::new();
        for &child in &section.children {
            if child == section.id || !seen.insert(child) {
                return Err(StageError::IntegrityViolation(format!(
                    "section {} lists child {} twice or itself",
                    section.id, child
                )));
            }
            if self.get_entity(child).is_none() {
                return Err(StageError::missing(child));
            }
            if let Some(parent) = self.parent_section_of(child) {
                return Err(StageError::IntegrityViolation(format!(
                    "entity {} already belongs to section {}",
                    child, parent
                )));
            }
        }
        Ok(())
    }

    // --- geometry ---

    /// Collision box of an entity. Expanded non-empty sections are derived
    /// from their children at call time.
    pub fn entity_collision_box(&self, id: ObjectId) -> CollisionBox {
        match self.get_entity(id) {
            Some(Entity::Section(section)) if !section.collapsed && !section.children.is_empty() => {
                let bounds = section
                    .children
                    .iter()
                    .map(|child| self.entity_collision_box(*child).bounding_rectangle())
                    .reduce(|acc, r| acc.union(r))
                    .unwrap_or(Rect::ZERO);
                CollisionBox::from_rect(Section::frame_around(bounds))
            }
            Some(entity) => entity.collision_box(),
            None => CollisionBox::default(),
        }
    }

    /// Collision box of an association. Lines run between the borders of the
    /// visible representative of each endpoint.
    pub fn association_collision_box(&self, association: &Association) -> CollisionBox {
        let frame = |id: ObjectId| {
            self.entity_collision_box(self.visible_representative(id))
                .bounding_rectangle()
        };
        match association {
            Association::Edge(edge) => {
                if edge.from == edge.to {
                    let rect = frame(edge.from);
                    return CollisionBox::new(vec![CollisionShape::Circle {
                        center: Point::new(rect.x1, rect.y0),
                        radius: SELF_LOOP_RADIUS + self.hit_tolerance,
                    }]);
                }
                let (from, to) = (frame(edge.from), frame(edge.to));
                let a = border_point(from, to.center());
                let b = border_point(to, from.center());
                CollisionBox::from_polyline(&[a, b], self.hit_tolerance)
            }
            Association::MultiTargetUndirectedEdge(edge) => {
                let frames: Vec<Rect> = edge.targets.iter().map(|t| frame(*t)).collect();
                if frames.is_empty() {
                    return CollisionBox::default();
                }
                let sum = frames
                    .iter()
                    .fold(Vec2::ZERO, |acc, r| acc + r.center().to_vec2());
                let centroid = (sum / frames.len() as f64).to_point();
                CollisionBox::new(
                    frames
                        .iter()
                        .map(|r| CollisionShape::Segment {
                            a: centroid,
                            b: border_point(*r, centroid),
                            tolerance: self.hit_tolerance,
                        })
                        .collect(),
                )
            }
        }
    }

    /// The entity itself, or its outermost collapsed ancestor.
    fn visible_representative(&self, id: ObjectId) -> ObjectId {
        self.ancestors_of(id)
            .into_iter()
            .rev()
            .find(|a| self.get_section(*a).is_some_and(|s| s.collapsed))
            .unwrap_or(id)
    }

    /// Topmost visible entity under `point`. Nested entities win over the
    /// sections that contain them; children of collapsed sections are skipped.
    pub fn find_entity_by_location(&self, point: Point) -> Option<ObjectId> {
        let mut best: Option<(usize, ObjectId)> = None;
        for id in self.z_order.iter().rev() {
            if self.get_entity(*id).is_none() || self.is_hidden_by_collapse(*id) {
                continue;
            }
            if !self.entity_collision_box(*id).is_point_in(point) {
                continue;
            }
            let depth = self.section_depth(*id);
            if best.is_none_or(|(d, _)| depth > d) {
                best = Some((depth, *id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Topmost association under `point`.
    pub fn find_association_by_location(&self, point: Point) -> Option<ObjectId> {
        self.z_order.iter().rev().copied().find(|id| {
            self.get_association(*id)
                .is_some_and(|a| self.association_collision_box(a).is_point_in(point))
        })
    }

    /// Association first, then entity.
    pub fn find_stage_object_by_location(&self, point: Point) -> Option<ObjectId> {
        self.find_association_by_location(point)
            .or_else(|| self.find_entity_by_location(point))
    }

    /// Connectable entity under `point`.
    pub fn find_connectable_entity_by_location(&self, point: Point) -> Option<ObjectId> {
        self.find_entity_by_location(point)
            .filter(|id| self.get_entity(*id).is_some_and(Entity::is_connectable))
    }

    // --- selection ---

    fn require(&self, id: ObjectId) -> StageResult<()> {
        if self.objects.contains_key(&id) {
            Ok(())
        } else {
            Err(StageError::missing(id))
        }
    }

    fn set_selected(&mut self, id: ObjectId, selected: bool) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.set_selected(selected);
        }
    }

    /// Select only `id`.
    pub fn select(&mut self, id: ObjectId) -> StageResult<()> {
        self.require(id)?;
        self.clear_selection();
        self.set_selected(id, true);
        Ok(())
    }

    pub fn add_to_selection(&mut self, id: ObjectId) -> StageResult<()> {
        self.require(id)?;
        self.set_selected(id, true);
        Ok(())
    }

    pub fn deselect(&mut self, id: ObjectId) -> StageResult<()> {
        self.require(id)?;
        self.set_selected(id, false);
        Ok(())
    }

    pub fn toggle_selection(&mut self, id: ObjectId) -> StageResult<()> {
        let selected = self.objects.get(&id).map(StageObject::is_selected);
        match selected {
            Some(selected) => {
                self.set_selected(id, !selected);
                Ok(())
            }
            None => Err(StageError::missing(id)),
        }
    }

    pub fn clear_selection(&mut self) {
        for object in self.objects.values_mut() {
            object.set_selected(false);
        }
    }

    pub fn select_all(&mut self) {
        for object in self.objects.values_mut() {
            object.set_selected(true);
        }
    }

    /// Marquee selection. Returns the number of objects newly selected.
    pub fn select_in_rect(&mut self, rect: Rect, additive: bool) -> usize {
        if !additive {
            self.clear_selection();
        }
        let hits: Vec<ObjectId> = self
            .z_order
            .iter()
            .copied()
            .filter(|id| match self.objects.get(id) {
                Some(StageObject::Entity(_)) => {
                    !self.is_hidden_by_collapse(*id)
                        && self.entity_collision_box(*id).overlaps_rectangle(rect)
                }
                Some(StageObject::Association(a)) => {
                    self.association_collision_box(a).overlaps_rectangle(rect)
                }
                None => false,
            })
            .collect();
        let mut count = 0;
        for id in hits {
            if self.objects.get(&id).is_some_and(|o| !o.is_selected()) {
                count += 1;
            }
            self.set_selected(id, true);
        }
        count
    }

    pub fn get_selected_entities(&self) -> Vec<&Entity> {
        self.entities().filter(|e| e.is_selected()).collect()
    }

    pub fn get_selected_associations(&self) -> Vec<&Association> {
        self.associations().filter(|a| a.is_selected()).collect()
    }

    pub fn selected_entity_ids(&self) -> Vec<ObjectId> {
        self.get_selected_entities().iter().map(|e| e.id()).collect()
    }

    pub fn selected_association_ids(&self) -> Vec<ObjectId> {
        self.get_selected_associations().iter().map(|a| a.id()).collect()
    }

    // --- in-place edits ---

    /// Move entities; sections carry their descendants along.
    pub fn move_entities(&mut self, ids: &[ObjectId], delta: Vec2) -> StageResult<()> {
        for id in ids {
            if self.get_entity(*id).is_none() {
                return Err(StageError::missing(*id));
            }
        }
        let mut moved = HashSet::new();
        for id in ids {
            moved.insert(*id);
            moved.extend(self.descendants_of(*id));
        }
        for id in moved {
            if let Some(entity) = self.entity_mut(id) {
                entity.translate(delta);
            }
        }
        Ok(())
    }

    pub fn move_selected_entities(&mut self, delta: Vec2) -> StageResult<()> {
        let selected = self.shallower_entities(&self.selected_entity_ids());
        self.move_entities(&selected, delta)
    }

    /// Change the text of a text node, section or association.
    pub fn set_text(&mut self, id: ObjectId, text: impl Into<String>) -> StageResult<()> {
        let text = text.into();
        match self.objects.get_mut(&id) {
            Some(StageObject::Entity(Entity::TextNode(node))) => node.set_text(text),
            Some(StageObject::Entity(Entity::Section(section))) => section.text = text,
            Some(StageObject::Association(Association::Edge(edge))) => edge.text = text,
            Some(StageObject::Association(Association::MultiTargetUndirectedEdge(edge))) => {
                edge.text = text
            }
            Some(_) => {
                return Err(StageError::IntegrityViolation(format!(
                    "object {} has no text",
                    id
                )));
            }
            None => return Err(StageError::missing(id)),
        }
        Ok(())
    }

    /// Resize a text node, switching it to manual sizing.
    pub fn resize_text_node(&mut self, id: ObjectId, size: Size) -> StageResult<()> {
        match self.entity_mut(id) {
            Some(Entity::TextNode(node)) => {
                node.resize_to(size);
                Ok(())
            }
            Some(_) => Err(StageError::IntegrityViolation(format!(
                "entity {} is not a text node",
                id
            ))),
            None => Err(StageError::missing(id)),
        }
    }

    pub fn set_scale(&mut self, id: ObjectId, scale: f64) -> StageResult<()> {
        match self.entity_mut(id) {
            Some(Entity::ImageNode(image)) => image.set_scale(scale),
            Some(Entity::SvgNode(svg)) => svg.set_scale(scale),
            Some(_) => {
                return Err(StageError::IntegrityViolation(format!(
                    "entity {} cannot be scaled",
                    id
                )));
            }
            None => return Err(StageError::missing(id)),
        }
        Ok(())
    }

    // --- snapshots and documents ---

    /// Copy of the stage contents without selection state.
    pub fn snapshot(&self) -> StageSnapshot {
        let objects = self
            .z_order
            .iter()
            .filter_map(|id| self.objects.get(id))
            .map(|object| {
                let mut object = object.clone();
                object.set_selected(false);
                object
            })
            .collect();
        StageSnapshot {
            objects,
            tags: self.tags.clone(),
        }
    }

    /// Replace the contents with a snapshot. Objects that still exist keep
    /// their selection.
    pub fn restore(&mut self, snapshot: &StageSnapshot) {
        let selected: HashSet<ObjectId> = self
            .objects
            .values()
            .filter(|o| o.is_selected())
            .map(StageObject::id)
            .collect();
        self.objects.clear();
        self.z_order.clear();
        for object in &snapshot.objects {
            let mut object = object.clone();
            object.set_selected(selected.contains(&object.id()));
            self.z_order.push(object.id());
            self.objects.insert(object.id(), object);
        }
        self.tags = snapshot.tags.clone();
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Load a stage document, rejecting documents that break an invariant.
    pub fn from_json(json: &str) -> StageResult<Self> {
        let snapshot: StageSnapshot = serde_json::from_str(json)
            .map_err(|e| StageError::IntegrityViolation(format!("invalid document: {}", e)))?;
        let mut stage = Self::new();
        stage.restore(&snapshot);
        if stage.objects.len() != snapshot.objects.len() {
            return Err(StageError::IntegrityViolation(
                "document contains duplicate uuids".to_string(),
            ));
        }
        stage.check_integrity()?;
        Ok(stage)
    }

    /// Verify every structural invariant of the stage.
    pub fn check_integrity(&self) -> StageResult<()> {
        let z_unique: HashSet<_> = self.z_order.iter().collect();
        if z_unique.len() != self.z_order.len() || self.z_order.len() != self.objects.len() {
            return Err(StageError::IntegrityViolation(
                "z-order out of sync with registry".to_string(),
            ));
        }
        for id in &self.z_order {
            self.require(*id)?;
        }

        let mut parent: HashMap<ObjectId, ObjectId> = HashMap::new();
        for entity in self.entities() {
            let Entity::Section(section) = entity else { continue };
            for child in &section.children {
                if self.get_entity(*child).is_none() {
                    return Err(StageError::missing(*child));
                }
                if parent.insert(*child, section.id).is_some() {
                    return Err(StageError::IntegrityViolation(format!(
                        "entity {} has more than one parent section",
                        child
                    )));
                }
            }
        }
        for start in parent.keys() {
            let mut current = *start;
            let mut steps = 0;
            while let Some(p) = parent.get(&current) {
                if *p == *start || steps > parent.len() {
                    return Err(StageError::IntegrityViolation(format!(
                        "section containment cycle through {}",
                        start
                    )));
                }
                current = *p;
                steps += 1;
            }
        }

        for association in self.associations() {
            self.validate_association(association)?;
        }

        let tag_unique: HashSet<_> = self.tags.iter().collect();
        if tag_unique.len() != self.tags.len() {
            return Err(StageError::IntegrityViolation("duplicate tag".to_string()));
        }
        for tag in &self.tags {
            if self.get_entity(*tag).is_none() {
                return Err(StageError::missing(*tag));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Edge;

    fn stage_with_nodes(n: usize) -> (StageManager, Vec<ObjectId>) {
        let mut stage = StageManager::new();
        let ids = (0..n)
            .map(|i| {
                stage
                    .add_text_node(format!("n{}", i), Point::new(i as f64 * 200.0, 0.0))
                    .unwrap()
            })
            .collect();
        (stage, ids)
    }

    #[test]
    fn test_add_rejects_duplicate_uuid() {
        let mut stage = StageManager::new();
        let node = TextNode::new("a", Point::ZERO);
        stage.add(Entity::TextNode(node.clone())).unwrap();
        let err = stage.add(Entity::TextNode(node)).unwrap_err();
        assert!(matches!(err, StageError::IntegrityViolation(_)));
        assert_eq!(stage.len(), 1);
    }

    #[test]
    fn test_add_rejects_dangling_association() {
        let (mut stage, ids) = stage_with_nodes(1);
        let edge = Edge::new(ids[0], crate::objects::new_id());
        assert!(stage.add(Association::Edge(edge)).is_err());
        assert_eq!(stage.len(), 1);
        stage.check_integrity().unwrap();
    }

    #[test]
    fn test_add_rejects_unconnectable_endpoint() {
        let (mut stage, ids) = stage_with_nodes(1);
        let stroke = stage
            .add_pen_stroke(vec![Point::ZERO, Point::new(10.0, 10.0)], 2.0)
            .unwrap();
        assert!(stage.add(Association::Edge(Edge::new(ids[0], stroke))).is_err());
    }

    #[test]
    fn test_find_entity_topmost_wins() {
        let mut stage = StageManager::new();
        let bottom = stage.add_text_node("bottom", Point::ZERO).unwrap();
        let top = stage.add_text_node("top", Point::new(10.0, 10.0)).unwrap();
        assert_eq!(stage.find_entity_by_location(Point::new(20.0, 20.0)), Some(top));
        assert_eq!(stage.find_entity_by_location(Point::new(2.0, 2.0)), Some(bottom));
        assert_eq!(stage.find_entity_by_location(Point::new(-50.0, -50.0)), None);
    }

    #[test]
    fn test_collapsed_section_hit_target() {
        let mut stage = StageManager::new();
        let child = stage.add_text_node("child", Point::new(100.0, 100.0)).unwrap();
        let section = stage.add_section("group", Point::ZERO, vec![child]).unwrap();
        let inside_child = Point::new(110.0, 110.0);

        assert_eq!(stage.find_entity_by_location(inside_child), Some(child));

        stage.select(section).unwrap();
        stage.collapse_selected_sections();
        assert_eq!(stage.find_entity_by_location(inside_child), Some(section));

        stage.expand_selected_sections();
        assert_eq!(stage.find_entity_by_location(inside_child), Some(child));
    }

    #[test]
    fn test_section_title_bar_hits_section() {
        let mut stage = StageManager::new();
        let child = stage.add_text_node("child", Point::new(100.0, 100.0)).unwrap();
        let section = stage.add_section("group", Point::ZERO, vec![child]).unwrap();
        // Above the child, inside the title bar
        assert_eq!(stage.find_entity_by_location(Point::new(110.0, 40.0)), Some(section));
    }

    #[test]
    fn test_section_box_follows_children() {
        let mut stage = StageManager::new();
        let child = stage.add_text_node("child", Point::new(100.0, 100.0)).unwrap();
        let section = stage.add_section("group", Point::ZERO, vec![child]).unwrap();
        let before = stage.entity_collision_box(section).bounding_rectangle();
        stage.move_entities(&[child], Vec2::new(50.0, 0.0)).unwrap();
        let after = stage.entity_collision_box(section).bounding_rectangle();
        assert!((after.x0 - before.x0 - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_find_association_by_location() {
        let (mut stage, ids) = stage_with_nodes(2);
        let edge = stage.connect_entity(ids[0], ids[1], false).unwrap();
        let a = stage.entity_collision_box(ids[0]).bounding_rectangle().center();
        let b = stage.entity_collision_box(ids[1]).bounding_rectangle().center();
        let mid = a.midpoint(b);
        assert_eq!(stage.find_association_by_location(mid), Some(edge));
        assert_eq!(stage.find_stage_object_by_location(mid), Some(edge));
        // The line stops at the node border
        assert_eq!(stage.find_stage_object_by_location(a), Some(ids[0]));
        assert_eq!(stage.find_association_by_location(Point::new(mid.x, mid.y + 500.0)), None);
    }

    #[test]
    fn test_selection_queries() {
        let (mut stage, ids) = stage_with_nodes(3);
        let edge = stage.connect_entity(ids[0], ids[1], false).unwrap();
        stage.select(ids[0]).unwrap();
        stage.add_to_selection(edge).unwrap();
        assert_eq!(stage.selected_entity_ids(), vec![ids[0]]);
        assert_eq!(stage.selected_association_ids(), vec![edge]);

        stage.toggle_selection(ids[0]).unwrap();
        assert!(stage.get_selected_entities().is_empty());

        stage.select_all();
        assert_eq!(stage.get_selected_entities().len(), 3);
        stage.clear_selection();
        assert!(stage.get_selected_associations().is_empty());
        assert!(stage.select(crate::objects::new_id()).is_err());
    }

    #[test]
    fn test_select_in_rect() {
        let (mut stage, ids) = stage_with_nodes(3);
        let count = stage.select_in_rect(Rect::new(-10.0, -10.0, 250.0, 50.0), false);
        assert_eq!(count, 2);
        let selected = stage.selected_entity_ids();
        assert!(selected.contains(&ids[0]) && selected.contains(&ids[1]));
        assert!(!selected.contains(&ids[2]));
    }

    #[test]
    fn test_snapshot_restore_keeps_selection() {
        let (mut stage, ids) = stage_with_nodes(2);
        let snapshot = stage.snapshot();
        stage.select(ids[0]).unwrap();
        stage.add_text_node("extra", Point::ZERO).unwrap();
        stage.restore(&snapshot);
        assert_eq!(stage.len(), 2);
        assert_eq!(stage.selected_entity_ids(), vec![ids[0]]);
        assert!(snapshot.objects.iter().all(|o| !o.is_selected()));
    }

    #[test]
    fn test_json_roundtrip() {
        let (mut stage, ids) = stage_with_nodes(3);
        stage.connect_entity(ids[0], ids[1], false).unwrap();
        stage.add_section("s", Point::ZERO, vec![ids[2]]).unwrap();
        let json = stage.to_json().unwrap();
        let loaded = StageManager::from_json(&json).unwrap();
        assert_eq!(loaded.snapshot(), stage.snapshot());
    }

    #[test]
    fn test_from_json_rejects_dangling_edge() {
        let (mut stage, ids) = stage_with_nodes(2);
        stage.connect_entity(ids[0], ids[1], false).unwrap();
        let mut snapshot = stage.snapshot();
        snapshot
            .objects
            .retain(|o| o.id() != ids[1]);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(StageManager::from_json(&json).is_err());
    }

    #[test]
    fn test_set_text_and_scale() {
        let (mut stage, ids) = stage_with_nodes(1);
        stage.set_text(ids[0], "renamed").unwrap();
        assert_eq!(stage.get_text_node(ids[0]).unwrap().text, "renamed");
        assert!(stage.set_scale(ids[0], 2.0).is_err());

        let image = stage
            .add_image_node("a.png", Point::ZERO, Size::new(10.0, 10.0))
            .unwrap();
        stage.set_scale(image, 3.0).unwrap();
        let rect = stage.entity_collision_box(image).bounding_rectangle();
        assert!((rect.width() - 30.0).abs() < f64::EPSILON);
    }
}
