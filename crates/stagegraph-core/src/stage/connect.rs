//! Edges: creation, graph queries and edge transforms.

use super::StageManager;
use crate::error::{StageError, StageResult};
use crate::objects::{Association, Edge, MultiTargetUndirectedEdge, ObjectId, StageObject};
use std::collections::HashSet;

impl StageManager {
    fn require_connectable(&self, id: ObjectId) -> StageResult<()> {
        match self.get_entity(id) {
            Some(entity) if entity.is_connectable() => Ok(()),
            Some(_) => Err(StageError::IntegrityViolation(format!(
                "entity {} is not connectable",
                id
            ))),
            None => Err(StageError::missing(id)),
        }
    }

    /// Would a new edge `from -> to` close a directed cycle?
    fn closes_cycle(&self, from: ObjectId, to: ObjectId) -> bool {
        from == to || self.successor_set(to).contains(&from)
    }

    /// Connect two entities with a directed edge.
    ///
    /// Connecting an already connected ordered pair returns the existing
    /// edge. Without `allow_cycle`, an edge whose source is reachable from
    /// its target is rejected with [`StageError::CycleRejected`].
    pub fn connect_entity(
        &mut self,
        from: ObjectId,
        to: ObjectId,
        allow_cycle: bool,
    ) -> StageResult<ObjectId> {
        self.require_connectable(from)?;
        self.require_connectable(to)?;
        if let Some(existing) = self.edges_between(from, to).first() {
            log::debug!("{} -> {} already connected", from, to);
            return Ok(*existing);
        }
        if !allow_cycle && self.closes_cycle(from, to) {
            return Err(StageError::CycleRejected { from, to });
        }
        self.add(Association::Edge(Edge::new(from, to)))
    }

    /// Connect several sources to one target. Nothing is created unless every
    /// edge is allowed.
    pub fn connect_multiple_entities(
        &mut self,
        froms: &[ObjectId],
        to: ObjectId,
        allow_cycle: bool,
    ) -> StageResult<Vec<ObjectId>> {
        self.require_connectable(to)?;
        for from in froms {
            self.require_connectable(*from)?;
            if !allow_cycle && !self.is_connected(*from, to) && self.closes_cycle(*from, to) {
                return Err(StageError::CycleRejected { from: *from, to });
            }
        }
        froms
            .iter()
            .map(|from| self.connect_entity(*from, to, allow_cycle))
            .collect()
    }

    /// Join every selected connectable entity with one undirected edge.
    pub fn create_undirected_edge_from_selected(&mut self) -> StageResult<ObjectId> {
        let targets: Vec<ObjectId> = self
            .get_selected_entities()
            .iter()
            .filter(|e| e.is_connectable())
            .map(|e| e.id())
            .collect();
        if targets.len() < 2 {
            return Err(StageError::IntegrityViolation(
                "an undirected edge needs at least two selected entities".to_string(),
            ));
        }
        self.add(Association::MultiTargetUndirectedEdge(MultiTargetUndirectedEdge::new(
            targets,
        )))
    }

    /// Flip the direction of every selected edge.
    pub fn reverse_selected_edges(&mut self, allow_cycle: bool) -> StageResult<usize> {
        let edges: Vec<ObjectId> = self
            .get_selected_associations()
            .iter()
            .filter(|a| matches!(a, Association::Edge(_)))
            .map(|a| a.id())
            .collect();

        let mut staged = self.clone();
        for id in &edges {
            let Some(Association::Edge(edge)) = staged.get_association(*id).cloned() else {
                continue;
            };
            if !allow_cycle {
                let mut trial = staged.clone();
                trial.remove_objects(&HashSet::from([*id]));
                if trial.closes_cycle(edge.to, edge.from) {
                    return Err(StageError::CycleRejected {
                        from: edge.to,
                        to: edge.from,
                    });
                }
            }
            if let Some(Association::Edge(edge)) = staged.association_mut(*id) {
                edge.reverse();
            }
        }
        *self = staged;
        Ok(edges.len())
    }

    /// Replace a directed edge by an undirected one over the same pair.
    pub fn switch_edge_to_undirected(&mut self, id: ObjectId) -> StageResult<ObjectId> {
        let edge = match self.get_association(id) {
            Some(Association::Edge(edge)) => edge.clone(),
            _ => {
                return Err(StageError::IntegrityViolation(format!(
                    "{} is not a directed edge",
                    id
                )));
            }
        };
        if edge.from == edge.to {
            return Err(StageError::IntegrityViolation(
                "a self loop cannot become an undirected edge".to_string(),
            ));
        }
        let mut undirected = MultiTargetUndirectedEdge::new(vec![edge.from, edge.to]);
        undirected.id = edge.id;
        undirected.text = edge.text;
        undirected.color = edge.color;
        undirected.is_selected = edge.is_selected;
        self.objects.insert(
            id,
            StageObject::Association(Association::MultiTargetUndirectedEdge(undirected)),
        );
        Ok(id)
    }

    /// Replace a two-member undirected edge by a directed edge from the first
    /// member to the second.
    pub fn switch_undirected_to_edge(&mut self, id: ObjectId, allow_cycle: bool) -> StageResult<ObjectId> {
        let undirected = match self.get_association(id) {
            Some(Association::MultiTargetUndirectedEdge(edge)) if edge.targets.len() == 2 => {
                edge.clone()
            }
            _ => {
                return Err(StageError::IntegrityViolation(format!(
                    "{} is not an undirected edge with two members",
                    id
                )));
            }
        };
        let (from, to) = (undirected.targets[0], undirected.targets[1]);
        if !allow_cycle && self.closes_cycle(from, to) {
            return Err(StageError::CycleRejected { from, to });
        }
        let mut edge = Edge::new(from, to);
        edge.id = undirected.id;
        edge.text = undirected.text;
        edge.color = undirected.color;
        edge.is_selected = undirected.is_selected;
        self.objects
            .insert(id, StageObject::Association(Association::Edge(edge)));
        Ok(id)
    }

    // --- graph queries ---

    fn directed_edges(&self) -> impl Iterator<Item = &Edge> {
        self.associations().filter_map(|a| match a {
            Association::Edge(edge) => Some(edge),
            Association::MultiTargetUndirectedEdge(_) => None,
        })
    }

    /// Direct successors of an entity.
    pub fn children_of(&self, id: ObjectId) -> Vec<ObjectId> {
        self.directed_edges()
            .filter(|e| e.from == id)
            .map(|e| e.to)
            .collect()
    }

    /// Direct predecessors of an entity.
    pub fn parents_of(&self, id: ObjectId) -> Vec<ObjectId> {
        self.directed_edges()
            .filter(|e| e.to == id)
            .map(|e| e.from)
            .collect()
    }

    /// Every entity reachable from `id` along directed edges.
    pub fn successor_set(&self, id: ObjectId) -> HashSet<ObjectId> {
        let mut visited = HashSet::new();
        let mut stack = self.children_of(id);
        while let Some(current) = stack.pop() {
            if visited.insert(current) {
                stack.extend(self.children_of(current));
            }
        }
        visited
    }

    pub fn is_connected(&self, from: ObjectId, to: ObjectId) -> bool {
        self.directed_edges().any(|e| e.from == from && e.to == to)
    }

    /// Directed edges from `from` to `to`.
    pub fn edges_between(&self, from: ObjectId, to: ObjectId) -> Vec<ObjectId> {
        self.directed_edges()
            .filter(|e| e.from == from && e.to == to)
            .map(|e| e.id)
            .collect()
    }

    /// True when everything reachable from `root` forms a tree.
    pub fn is_tree(&self, root: ObjectId) -> bool {
        let mut visited = HashSet::from([root]);
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            for child in self.children_of(current) {
                if !visited.insert(child) {
                    return false;
                }
                stack.push(child);
            }
        }
        true
    }

    /// Entities with no incoming edge among those that have any edge.
    pub fn root_entities(&self) -> Vec<ObjectId> {
        self.entities()
            .filter(|e| e.is_connectable())
            .map(|e| e.id())
            .filter(|id| self.parents_of(*id).is_empty() && !self.children_of(*id).is_empty())
            .collect()
    }
}
