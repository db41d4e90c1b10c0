//! Deletion with cascade cleanup.

use super::StageManager;
use crate::error::{StageError, StageResult};
use crate::objects::{Association, Entity, ObjectId, StageObject};
use std::collections::HashSet;

impl StageManager {
    /// Delete entities and everything that depends on them.
    ///
    /// - Edges touching a deleted entity are deleted.
    /// - Undirected edges lose the reference, and are deleted once fewer
    ///   than two members remain.
    /// - Children of an expanded deleted section move to its parent scope;
    ///   children of a collapsed one are deleted with it.
    /// - Sections left without children stay on the stage.
    ///
    /// Returns the number of objects removed.
    pub fn delete_entities(&mut self, ids: &[ObjectId]) -> StageResult<usize> {
        for id in ids {
            if self.get_entity(*id).is_none() {
                return Err(StageError::missing(*id));
            }
        }

        let mut doomed: HashSet<ObjectId> = HashSet::new();
        for id in ids {
            self.collect_doomed(*id, &mut doomed);
        }

        // Promotions out of deleted expanded sections, resolved before mutating
        let mut promotions: Vec<(ObjectId, Vec<ObjectId>)> = Vec::new();
        for id in &doomed {
            let Some(section) = self.get_section(*id) else { continue };
            let survivors: Vec<ObjectId> = section
                .children
                .iter()
                .copied()
                .filter(|c| !doomed.contains(c))
                .collect();
            if !survivors.is_empty() {
                promotions.push((*id, survivors));
            }
        }
        let mut relocations = Vec::new();
        for (section_id, survivors) in promotions {
            let target = self
                .ancestors_of(section_id)
                .into_iter()
                .find(|a| !doomed.contains(a));
            relocations.push((section_id, target, survivors));
        }

        // Surviving sections that end up empty keep their current frame
        let mut settle = Vec::new();
        for entity in self.entities() {
            let Entity::Section(section) = entity else { continue };
            if doomed.contains(&section.id) || section.children.is_empty() {
                continue;
            }
            if section.children.iter().all(|c| doomed.contains(c)) {
                let rect = self.entity_collision_box(section.id).bounding_rectangle();
                settle.push((section.id, rect.origin()));
            }
        }

        for (section_id, target, survivors) in relocations {
            if let Some(parent) = target {
                self.splice_children(parent, section_id, &survivors);
            }
        }
        for (id, origin) in settle {
            if let Some(section) = self.section_mut(id) {
                section.location = origin;
            }
        }
        for object in self.objects.values_mut() {
            if let StageObject::Entity(Entity::Section(section)) = object {
                section.children.retain(|c| !doomed.contains(c));
            }
        }

        let mut removed = self.cascade_associations(&doomed);
        self.tags.retain(|t| !doomed.contains(t));
        removed += self.remove_objects(&doomed);
        log::debug!("Deleted {} stage objects", removed);
        Ok(removed)
    }

    /// Delete associations only.
    pub fn delete_associations(&mut self, ids: &[ObjectId]) -> StageResult<usize> {
        for id in ids {
            if self.get_association(*id).is_none() {
                return Err(StageError::missing(*id));
            }
        }
        let doomed: HashSet<ObjectId> = ids.iter().copied().collect();
        Ok(self.remove_objects(&doomed))
    }

    /// Delete every selected object.
    pub fn delete_selected_stage_objects(&mut self) -> StageResult<usize> {
        let associations = self.selected_association_ids();
        let entities = self.selected_entity_ids();
        let mut removed = self.delete_associations(&associations)?;
        removed += self.delete_entities(&entities)?;
        Ok(removed)
    }

    fn collect_doomed(&self, id: ObjectId, doomed: &mut HashSet<ObjectId>) {
        if !doomed.insert(id) {
            return;
        }
        if let Some(section) = self.get_section(id) {
            if section.collapsed {
                for child in section.children.clone() {
                    self.collect_doomed(child, doomed);
                }
            }
        }
    }

    /// Apply the association policy for removed entities. Returns the number
    /// of associations deleted.
    fn cascade_associations(&mut self, doomed: &HashSet<ObjectId>) -> usize {
        let mut dead = HashSet::new();
        for object in self.objects.values_mut() {
            let StageObject::Association(association) = object else { continue };
            match association {
                Association::Edge(edge) => {
                    if doomed.contains(&edge.from) || doomed.contains(&edge.to) {
                        dead.insert(edge.id);
                    }
                }
                Association::MultiTargetUndirectedEdge(edge) => {
                    edge.targets.retain(|t| !doomed.contains(t));
                    if edge.targets.len() < 2 {
                        dead.insert(edge.id);
                    }
                }
            }
        }
        self.remove_objects(&dead)
    }

    /// Remove ids from the registry and z-order.
    pub(super) fn remove_objects(&mut self, ids: &HashSet<ObjectId>) -> usize {
        let before = self.objects.len();
        self.objects.retain(|id, _| !ids.contains(id));
        self.z_order.retain(|id| !ids.contains(id));
        before - self.objects.len()
    }
}
