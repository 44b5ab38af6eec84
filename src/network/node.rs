//! Node registry with a spatial index for position lookups

use std::collections::BTreeMap;
use std::fmt;

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::geom::{almost_same, Position};

/// Network node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub position: Position,
}

impl Node {
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            position,
        }
    }
}

/// Node position with its id for the R-tree
#[derive(Clone, Debug, PartialEq)]
struct IndexedNode {
    coords: [f64; 2],
    id: String,
}

impl RTreeObject for IndexedNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.coords)
    }
}

impl PointDistance for IndexedNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.coords[0] - point[0];
        let dy = self.coords[1] - point[1];
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.coords == *point
    }
}

/// Nodes keyed by id
#[derive(Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, Node>,
    index: RTree<IndexedNode>,
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn retrieve_by_name(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Node located exactly at `pos`
    pub fn retrieve_by_position(&self, pos: Position) -> Option<&Node> {
        self.index
            .locate_at_point(&[pos.x, pos.y])
            .and_then(|indexed| self.nodes.get(&indexed.id))
    }

    /// Add a node; `false` if its id is already taken
    pub fn insert(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        log::debug!(
            "Inserting node '{}' at ({}, {})",
            node.id,
            node.position.x,
            node.position.y
        );
        self.index.insert(IndexedNode {
            coords: [node.position.x, node.position.y],
            id: node.id.clone(),
        });
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Register `pos` under `name`.
    ///
    /// Creates the node if the name is new. An existing node accepts the
    /// registration only if it already lies at (almost) the same position.
    pub fn insert_position_for_name(&mut self, name: &str, pos: Position) -> bool {
        match self.nodes.get(name) {
            Some(existing) => almost_same(existing.position, pos),
            None => self.insert(Node::new(name, pos)),
        }
    }

    /// Unused id of the form `generated<N>`
    pub fn fresh_id(&self) -> String {
        (self.nodes.len()..)
            .map(|n| format!("generated{n}"))
            .find(|id| !self.nodes.contains_key(id))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    fn pos(x: f64, y: f64) -> Position {
        Coord { x, y }
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut nodes = NodeRegistry::new();
        assert!(nodes.insert(Node::new("a", pos(0.0, 0.0))));
        assert!(!nodes.insert(Node::new("a", pos(5.0, 5.0))));
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes.retrieve_by_name("a").unwrap().position, pos(0.0, 0.0));
    }

    #[test]
    fn test_retrieve_by_exact_position() {
        let mut nodes = NodeRegistry::new();
        nodes.insert(Node::new("a", pos(10.0, 20.0)));
        assert_eq!(nodes.retrieve_by_position(pos(10.0, 20.0)).unwrap().id, "a");
        assert!(nodes.retrieve_by_position(pos(10.0, 20.05)).is_none());
    }

    #[test]
    fn test_insert_position_for_name() {
        let mut nodes = NodeRegistry::new();
        assert!(nodes.insert_position_for_name("a", pos(1.0, 1.0)));
        assert!(nodes.insert_position_for_name("a", pos(1.05, 1.0)));
        assert!(!nodes.insert_position_for_name("a", pos(3.0, 1.0)));
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_fresh_id_skips_taken_ids() {
        let mut nodes = NodeRegistry::new();
        assert_eq!(nodes.fresh_id(), "generated0");
        nodes.insert(Node::new("generated1", pos(0.0, 0.0)));
        assert_eq!(nodes.fresh_id(), "generated2");
        let id = nodes.fresh_id();
        nodes.insert(Node::new(id, pos(1.0, 0.0)));
        assert_eq!(nodes.fresh_id(), "generated3");
    }
}
