//! Section hierarchy: queries, packing and collapsing.

use super::StageManager;
use crate::error::{StageError, StageResult};
use crate::objects::{Entity, ObjectId, Section, StageObject};
use kurbo::Point;
use std::collections::HashSet;

/// Title given to sections created by packing.
pub const DEFAULT_SECTION_TITLE: &str = "Section";

impl StageManager {
    // --- queries ---

    /// Section whose child list contains `id`.
    pub fn parent_section_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.entities()
            .filter_map(Entity::as_section)
            .find(|s| s.children.contains(&id))
            .map(|s| s.id)
    }

    /// Enclosing sections, nearest first.
    pub fn ancestors_of(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut chain = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent_section_of(current) {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Number of sections enclosing `id`.
    pub fn section_depth(&self, id: ObjectId) -> usize {
        self.ancestors_of(id).len()
    }

    /// Nesting depth below a section (1 for a section holding no sections).
    pub fn max_section_depth(&self, id: ObjectId) -> usize {
        match self.get_section(id) {
            Some(section) => {
                1 + section
                    .children
                    .iter()
                    .map(|c| self.max_section_depth(*c))
                    .max()
                    .unwrap_or(0)
            }
            None => 0,
        }
    }

    /// Every entity nested (at any depth) inside `id`.
    pub fn descendants_of(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack: Vec<ObjectId> = self
            .get_section(id)
            .map(|s| s.children.clone())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            if out.contains(&current) {
                continue;
            }
            out.push(current);
            if let Some(section) = self.get_section(current) {
                stack.extend(section.children.iter().copied());
            }
        }
        out
    }

    pub fn is_entity_in_section(&self, entity: ObjectId, section: ObjectId) -> bool {
        self.ancestors_of(entity).contains(&section)
    }

    /// True when some enclosing section is collapsed.
    pub fn is_hidden_by_collapse(&self, id: ObjectId) -> bool {
        self.ancestors_of(id)
            .iter()
            .any(|a| self.get_section(*a).is_some_and(|s| s.collapsed))
    }

    /// Drop entities whose enclosing section is also in the list.
    pub fn shallower_entities(&self, ids: &[ObjectId]) -> Vec<ObjectId> {
        let set: HashSet<ObjectId> = ids.iter().copied().collect();
        ids.iter()
            .copied()
            .filter(|id| !self.ancestors_of(*id).iter().any(|a| set.contains(a)))
            .collect()
    }

    /// Visible expanded sections containing `point`, outermost first.
    pub fn get_sections_by_inner_location(&self, point: Point) -> Vec<ObjectId> {
        let mut hits: Vec<(usize, ObjectId)> = self
            .entities()
            .filter_map(Entity::as_section)
            .filter(|s| !s.collapsed && !self.is_hidden_by_collapse(s.id))
            .filter(|s| self.entity_collision_box(s.id).is_point_in(point))
            .map(|s| (self.section_depth(s.id), s.id))
            .collect();
        hits.sort_by_key(|(depth, _)| *depth);
        hits.into_iter().map(|(_, id)| id).collect()
    }

    // --- structure edits ---

    /// Replace `old` in a section's child list by `replacement`, in place.
    pub(super) fn splice_children(&mut self, parent: ObjectId, old: ObjectId, replacement: &[ObjectId]) {
        if let Some(section) = self.section_mut(parent) {
            match section.children.iter().position(|c| *c == old) {
                Some(index) => {
                    section.children.splice(index..=index, replacement.iter().copied());
                }
                None => section.children.extend(replacement.iter().copied()),
            }
        }
    }

    fn detach(&mut self, id: ObjectId) {
        if let Some(parent) = self.parent_section_of(id) {
            if let Some(section) = self.section_mut(parent) {
                section.children.retain(|c| *c != id);
            }
        }
    }

    /// Move entities into a section, taking them out of their current one.
    pub fn go_in_section(&mut self, ids: &[ObjectId], section: ObjectId) -> StageResult<()> {
        if self.get_section(section).is_none() {
            return Err(StageError::IntegrityViolation(format!(
                "{} is not a section",
                section
            )));
        }
        let section_ancestors = self.ancestors_of(section);
        for id in ids {
            if self.get_entity(*id).is_none() {
                return Err(StageError::missing(*id));
            }
            if *id == section || section_ancestors.contains(id) {
                return Err(StageError::IntegrityViolation(format!(
                    "section {} cannot contain {}",
                    section, id
                )));
            }
        }
        for id in ids {
            if self.parent_section_of(*id) == Some(section) {
                continue;
            }
            self.detach(*id);
            if let Some(target) = self.section_mut(section) {
                target.children.push(*id);
            }
        }
        Ok(())
    }

    /// Move entities one level out, into the parent of their section.
    pub fn go_out_section(&mut self, ids: &[ObjectId]) -> StageResult<()> {
        for id in ids {
            if self.get_entity(*id).is_none() {
                return Err(StageError::missing(*id));
            }
        }
        for id in ids {
            let Some(parent) = self.parent_section_of(*id) else { continue };
            let grandparent = self.parent_section_of(parent);
            self.detach(*id);
            if let Some(grandparent) = grandparent {
                if let Some(target) = self.section_mut(grandparent) {
                    target.children.push(*id);
                }
            }
        }
        Ok(())
    }

    /// Wrap the selected entities in a new section.
    ///
    /// Nested selections are reduced to their outermost members, which must
    /// all share one parent scope. The new section takes their place in that
    /// scope and becomes the selection. Returns `None` when nothing is
    /// selected.
    pub fn pack_entity_to_section_by_selected(&mut self) -> StageResult<Option<ObjectId>> {
        let selected = self.shallower_entities(&self.selected_entity_ids());
        if selected.is_empty() {
            return Ok(None);
        }
        let parents: HashSet<Option<ObjectId>> =
            selected.iter().map(|id| self.parent_section_of(*id)).collect();
        if parents.len() > 1 {
            return Err(StageError::IntegrityViolation(
                "selected entities belong to different sections".to_string(),
            ));
        }
        let parent = parents.into_iter().next().flatten();

        let bounds = selected
            .iter()
            .map(|id| self.entity_collision_box(*id).bounding_rectangle())
            .reduce(|acc, r| acc.union(r))
            .unwrap_or_default();
        let mut section = Section::new(DEFAULT_SECTION_TITLE, bounds.origin(), selected.clone());
        section.is_selected = true;
        let section_id = section.id;

        if let Some(parent) = parent {
            let index = self.get_section(parent).and_then(|p| {
                p.children.iter().position(|c| selected.contains(c))
            });
            if let Some(p) = self.section_mut(parent) {
                p.children.retain(|c| !selected.contains(c));
                let at = index.unwrap_or(p.children.len()).min(p.children.len());
                p.children.insert(at, section_id);
            }
        }
        for id in &selected {
            self.set_selected(*id, false);
        }
        // Children were detached above, so the section validates as new
        self.add(Entity::Section(section))?;
        log::debug!("Packed {} entities into section {}", selected.len(), section_id);
        Ok(Some(section_id))
    }

    /// Dissolve the selected sections, promoting their children to each
    /// section's parent scope. Returns the promoted children.
    pub fn unpack_selected_sections(&mut self) -> Vec<ObjectId> {
        let sections: Vec<ObjectId> = self
            .get_selected_entities()
            .iter()
            .filter_map(|e| e.as_section())
            .map(|s| s.id)
            .collect();

        let mut promoted = Vec::new();
        for section_id in sections {
            let Some(section) = self.get_section(section_id) else { continue };
            let children = section.children.clone();
            if let Some(parent) = self.parent_section_of(section_id) {
                self.splice_children(parent, section_id, &children);
            }
            if let Some(section) = self.section_mut(section_id) {
                section.children.clear();
            }
            for child in &children {
                self.set_selected(*child, true);
            }
            self.tags.retain(|t| *t != section_id);
            let doomed = HashSet::from([section_id]);
            self.drop_associations_touching(&doomed);
            self.remove_objects(&doomed);
            promoted.extend(children);
        }
        promoted
    }

    fn drop_associations_touching(&mut self, doomed: &HashSet<ObjectId>) {
        let dead: HashSet<ObjectId> = self
            .associations()
            .filter(|a| doomed.iter().any(|d| a.references(*d)))
            .map(|a| a.id())
            .collect();
        self.remove_objects(&dead);
    }

    fn collapse_section(&mut self, id: ObjectId) {
        let frame = self.entity_collision_box(id).bounding_rectangle();
        if let Some(section) = self.section_mut(id) {
            section.collapsed = true;
            section.collapsed_rect = Some(frame);
        }
    }

    /// Expanding puts the section where its collapsed box was.
    fn expand_section(&mut self, id: ObjectId) {
        if let Some(section) = self.section_mut(id) {
            if let Some(rect) = section.collapsed_rect.take() {
                section.location = rect.origin();
            }
            section.collapsed = false;
        }
    }

    fn selected_sections(&self, collapsed: Option<bool>) -> Vec<(ObjectId, bool)> {
        self.get_selected_entities()
            .iter()
            .filter_map(|e| e.as_section())
            .filter(|s| collapsed.is_none_or(|c| s.collapsed == c))
            .map(|s| (s.id, s.collapsed))
            .collect()
    }

    /// Collapse selected sections. Returns how many changed.
    pub fn collapse_selected_sections(&mut self) -> usize {
        let targets = self.selected_sections(Some(false));
        for (id, _) in &targets {
            self.collapse_section(*id);
        }
        targets.len()
    }

    /// Expand selected sections. Returns how many changed.
    pub fn expand_selected_sections(&mut self) -> usize {
        let targets = self.selected_sections(Some(true));
        for (id, _) in &targets {
            self.expand_section(*id);
        }
        targets.len()
    }

    /// Flip the collapsed state of each selected section.
    pub fn toggle_selected_sections_collapse(&mut self) -> usize {
        let targets = self.selected_sections(None);
        for (id, collapsed) in &targets {
            if *collapsed {
                self.expand_section(*id);
            } else {
                self.collapse_section(*id);
            }
        }
        targets.len()
    }

    /// Replace a text node by an empty section with the same text and place.
    /// Edges and tags follow the new section.
    pub fn text_node_to_section(&mut self, id: ObjectId) -> StageResult<ObjectId> {
        let node = match self.get_entity(id) {
            Some(Entity::TextNode(node)) => node.clone(),
            Some(_) => {
                return Err(StageError::IntegrityViolation(format!(
                    "{} is not a text node",
                    id
                )));
            }
            None => return Err(StageError::missing(id)),
        };
        let mut section = Section::new(node.text.clone(), node.location, Vec::new());
        section.color = node.color;
        section.is_selected = node.is_selected;
        let section_id = section.id;

        if let Some(parent) = self.parent_section_of(id) {
            self.splice_children(parent, id, &[section_id]);
        }
        for object in self.objects.values_mut() {
            if let StageObject::Association(association) = object {
                association.retarget(id, section_id);
            }
        }
        for tag in &mut self.tags {
            if *tag == id {
                *tag = section_id;
            }
        }
        if let Some(z) = self.z_order.iter_mut().find(|z| **z == id) {
            *z = section_id;
        }
        self.objects.remove(&id);
        self.objects
            .insert(section_id, StageObject::Entity(Entity::Section(section)));
        Ok(section_id)
    }
}
