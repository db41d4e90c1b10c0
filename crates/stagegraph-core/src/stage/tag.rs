//! Tags: an ordered list of bookmarked entities.

use super::StageManager;
use crate::objects::ObjectId;

impl StageManager {
    /// Tagged entities in display order.
    pub fn tags(&self) -> &[ObjectId] {
        &self.tags
    }

    pub fn is_tagged(&self, id: ObjectId) -> bool {
        self.tags.contains(&id)
    }

    /// Tag list paired with each entity's label.
    pub fn tag_labels(&self) -> Vec<(ObjectId, String)> {
        self.tags
            .iter()
            .filter_map(|id| self.get_entity(*id).map(|e| (*id, e.label().to_string())))
            .collect()
    }

    /// Toggle the tag of every selected entity. New tags go to the end of the
    /// list. Returns the number of entities toggled.
    pub fn add_tag_by_selected(&mut self) -> usize {
        let selected = self.selected_entity_ids();
        for id in &selected {
            if let Some(index) = self.tags.iter().position(|t| t == id) {
                self.tags.remove(index);
            } else {
                self.tags.push(*id);
            }
        }
        selected.len()
    }

    /// Swap a tag with its predecessor. No-op for the first tag or an
    /// untagged id.
    pub fn move_up_tag(&mut self, id: ObjectId) -> bool {
        match self.tags.iter().position(|t| *t == id) {
            Some(index) if index > 0 => {
                self.tags.swap(index, index - 1);
                true
            }
            _ => false,
        }
    }

    /// Swap a tag with its successor. No-op for the last tag or an untagged id.
    pub fn move_down_tag(&mut self, id: ObjectId) -> bool {
        match self.tags.iter().position(|t| *t == id) {
            Some(index) if index + 1 < self.tags.len() => {
                self.tags.swap(index, index + 1);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    fn tagged_stage() -> (StageManager, Vec<ObjectId>) {
        let mut stage = StageManager::new();
        let ids: Vec<ObjectId> = (0..3)
            .map(|i| stage.add_text_node(format!("t{}", i), Point::ZERO).unwrap())
            .collect();
        for id in &ids {
            stage.select(*id).unwrap();
            stage.add_tag_by_selected();
        }
        (stage, ids)
    }

    #[test]
    fn test_tags_keep_explicit_order() {
        let (mut stage, ids) = tagged_stage();
        assert_eq!(stage.tags(), ids.as_slice());

        assert!(stage.move_up_tag(ids[2]));
        assert_eq!(stage.tags(), &[ids[0], ids[2], ids[1]]);
        assert!(stage.move_down_tag(ids[0]));
        assert_eq!(stage.tags(), &[ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn test_move_at_boundaries_is_noop() {
        let (mut stage, ids) = tagged_stage();
        assert!(!stage.move_up_tag(ids[0]));
        assert!(!stage.move_down_tag(ids[2]));
        assert!(!stage.move_up_tag(crate::objects::new_id()));
        assert_eq!(stage.tags(), ids.as_slice());
    }

    #[test]
    fn test_toggle_removes_tag() {
        let (mut stage, ids) = tagged_stage();
        stage.select(ids[1]).unwrap();
        assert_eq!(stage.add_tag_by_selected(), 1);
        assert!(!stage.is_tagged(ids[1]));
        assert_eq!(
            stage.tag_labels(),
            vec![(ids[0], "t0".to_string()), (ids[2], "t2".to_string())]
        );
    }
}
