//! Copying the selection as a detached subgraph and pasting it back.

use super::{StageManager, StageSnapshot};
use crate::error::StageResult;
use crate::objects::{new_id, ObjectId, StageObject};
use kurbo::{Rect, Vec2};
use std::collections::{HashMap, HashSet};

impl StageManager {
    /// Detached copy of the selected entities.
    ///
    /// Selected sections bring their whole contents. Associations come along
    /// only when every target is part of the copy. Tags are not copied.
    /// Returns `None` when no entity is selected.
    pub fn copy_selected(&self) -> Option<StageSnapshot> {
        let roots = self.shallower_entities(&self.selected_entity_ids());
        if roots.is_empty() {
            return None;
        }
        let mut copied: HashSet<ObjectId> = HashSet::new();
        for root in roots {
            copied.insert(root);
            copied.extend(self.descendants_of(root));
        }
        let objects = self
            .z_order
            .iter()
            .filter_map(|id| self.objects.get(id))
            .filter(|object| match object {
                StageObject::Entity(e) => copied.contains(&e.id()),
                StageObject::Association(a) => a.targets().iter().all(|t| copied.contains(t)),
            })
            .map(|object| {
                let mut object = object.clone();
                object.set_selected(false);
                object
            })
            .collect();
        Some(StageSnapshot {
            objects,
            tags: Vec::new(),
        })
    }

    /// Insert a copy of `clip` moved by `delta`, with a fresh uuid for every
    /// object.
    ///
    /// Section children and association targets are remapped to the new
    /// uuids. References to objects outside the clip are kept as they are and
    /// must resolve on this stage. The pasted top-level entities become the
    /// selection. All or nothing: on error the stage is unchanged.
    pub fn paste(&mut self, clip: &StageSnapshot, delta: Vec2) -> StageResult<Vec<ObjectId>> {
        let fresh: HashMap<ObjectId, ObjectId> =
            clip.objects.iter().map(|o| (o.id(), new_id())).collect();
        let remap = |id: ObjectId| fresh.get(&id).copied().unwrap_or(id);

        let mut pasted = Vec::with_capacity(clip.objects.len());
        for object in &clip.objects {
            let mut object = object.clone();
            object.set_selected(false);
            match &mut object {
                StageObject::Entity(entity) => {
                    entity.set_id(remap(entity.id()));
                    entity.translate(delta);
                    if let Some(section) = entity.as_section_mut() {
                        for child in &mut section.children {
                            *child = remap(*child);
                        }
                    }
                }
                StageObject::Association(association) => {
                    association.set_id(remap(association.id()));
                    for target in association.targets() {
                        association.retarget(target, remap(target));
                    }
                }
            }
            pasted.push(object);
        }

        let before = self.snapshot();
        for object in pasted {
            self.z_order.push(object.id());
            self.objects.insert(object.id(), object);
        }
        if let Err(e) = self.check_integrity() {
            self.restore(&before);
            return Err(e);
        }

        let entities: Vec<ObjectId> = clip
            .objects
            .iter()
            .filter_map(StageObject::as_entity)
            .map(|e| remap(e.id()))
            .collect();
        self.clear_selection();
        for id in self.shallower_entities(&entities) {
            self.set_selected(id, true);
        }
        log::debug!("Pasted {} objects", fresh.len());
        Ok(entities)
    }
}

/// Bounding rectangle of the entities in a clip, before pasting.
pub fn clip_bounds(clip: &StageSnapshot) -> Option<Rect> {
    let mut staged = StageManager::new();
    staged.restore(clip);
    staged
        .entities()
        .map(|e| staged.entity_collision_box(e.id()).bounding_rectangle())
        .reduce(|acc, r| acc.union(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Entity;
    use kurbo::Point;

    fn nodes(stage: &mut StageManager, n: usize) -> Vec<ObjectId> {
        (0..n)
            .map(|i| {
                stage
                    .add_text_node(format!("n{}", i), Point::new(i as f64 * 200.0, 0.0))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_copy_nothing_selected() {
        let mut stage = StageManager::new();
        nodes(&mut stage, 2);
        assert!(stage.copy_selected().is_none());
    }

    #[test]
    fn test_copy_keeps_only_inner_associations() {
        let mut stage = StageManager::new();
        let ids = nodes(&mut stage, 3);
        stage.connect_entity(ids[0], ids[1], false).unwrap();
        stage.connect_entity(ids[1], ids[2], false).unwrap();
        stage.select(ids[0]).unwrap();
        stage.add_to_selection(ids[1]).unwrap();

        let clip = stage.copy_selected().unwrap();
        assert_eq!(clip.objects.len(), 3);
        assert_eq!(clip.objects.iter().filter(|o| o.as_association().is_some()).count(), 1);
        assert!(clip.objects.iter().all(|o| !o.is_selected()));
        assert!(clip.tags.is_empty());
    }

    #[test]
    fn test_paste_uses_fresh_uuids() {
        let mut stage = StageManager::new();
        let ids = nodes(&mut stage, 2);
        stage.connect_entity(ids[0], ids[1], false).unwrap();
        stage.select_all();
        let clip = stage.copy_selected().unwrap();

        let pasted = stage.paste(&clip, Vec2::new(0.0, 300.0)).unwrap();
        assert_eq!(pasted.len(), 2);
        assert_eq!(stage.len(), 6);
        assert!(pasted.iter().all(|id| !ids.contains(id)));
        assert!(stage.is_connected(pasted[0], pasted[1]));
        assert!(!stage.is_connected(ids[0], pasted[1]));
        stage.check_integrity().unwrap();

        let moved = stage.entity_collision_box(pasted[0]).bounding_rectangle();
        assert!((moved.y0 - 300.0).abs() < f64::EPSILON);
        let mut selected = stage.selected_entity_ids();
        selected.sort();
        let mut expected = pasted.clone();
        expected.sort();
        assert_eq!(selected, expected);
    }

    #[test]
    fn test_paste_twice_gives_distinct_copies() {
        let mut stage = StageManager::new();
        let ids = nodes(&mut stage, 1);
        stage.select(ids[0]).unwrap();
        let clip = stage.copy_selected().unwrap();
        let first = stage.paste(&clip, Vec2::new(50.0, 0.0)).unwrap();
        let second = stage.paste(&clip, Vec2::new(100.0, 0.0)).unwrap();
        assert_ne!(first, second);
        assert_eq!(stage.len(), 3);
    }

    #[test]
    fn test_paste_section_remaps_children() {
        let mut stage = StageManager::new();
        let ids = nodes(&mut stage, 2);
        let section = stage
            .add_section("box", Point::new(-20.0, -20.0), ids.clone())
            .unwrap();
        stage.select(section).unwrap();
        let clip = stage.copy_selected().unwrap();
        assert_eq!(clip.objects.len(), 3);

        let pasted = stage.paste(&clip, Vec2::new(0.0, 500.0)).unwrap();
        let copy = pasted
            .iter()
            .copied()
            .find(|id| stage.get_section(*id).is_some())
            .unwrap();
        let children = stage.get_section(copy).unwrap().children().to_vec();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| !ids.contains(c) && pasted.contains(c)));
        assert_eq!(stage.get_section(section).unwrap().children(), ids.as_slice());
        assert_eq!(stage.selected_entity_ids(), vec![copy]);
        stage.check_integrity().unwrap();
    }

    #[test]
    fn test_paste_with_unresolved_reference_changes_nothing() {
        let mut stage = StageManager::new();
        let ids = nodes(&mut stage, 2);
        stage.connect_entity(ids[0], ids[1], false).unwrap();
        stage.select_all();
        let clip = stage.copy_selected().unwrap();

        let mut other = StageManager::new();
        let keep = other.add_text_node("keep", Point::ZERO).unwrap();
        other.select(keep).unwrap();
        // Only the edge: its targets are not in the clip and not on this stage
        let edge_only = StageSnapshot {
            objects: clip
                .objects
                .iter()
                .filter(|o| o.as_association().is_some())
                .cloned()
                .collect(),
            tags: Vec::new(),
        };
        let before = other.snapshot();
        assert!(other.paste(&edge_only, Vec2::ZERO).is_err());
        assert_eq!(other.snapshot(), before);
        assert_eq!(other.selected_entity_ids(), vec![keep]);
    }

    #[test]
    fn test_clip_bounds() {
        let mut stage = StageManager::new();
        let ids = nodes(&mut stage, 2);
        stage.select_all();
        let clip = stage.copy_selected().unwrap();
        let bounds = clip_bounds(&clip).unwrap();
        let last = stage.entity_collision_box(ids[1]).bounding_rectangle();
        assert!(bounds.x0.abs() < f64::EPSILON);
        assert!((bounds.x1 - last.x1).abs() < f64::EPSILON);
        assert!(matches!(
            clip.objects[0].as_entity(),
            Some(Entity::TextNode(_))
        ));
    }
}
