//! Edges, lanes and the edge registry
//!
//! The registry owns every edge by id. Lane-to-lane connections are kept in a
//! separate [`ConnectionTable`] as `(edge, lane) -> (edge, lane)` pairs, so
//! splitting an edge only has to rewrite ids.

use std::collections::BTreeMap;

use crate::core::error::{ImportError, Result};
use crate::geom::{almost_same, Position, PositionVector};
use crate::vclass::VehicleClasses;

use super::node::Node;

/// How lanes are laid out relative to the edge geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaneSpread {
    /// Geometry is the left border of the rightmost lane
    #[default]
    Right,
    /// Geometry is the center of the lane bundle
    Center,
}

impl LaneSpread {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "right" => Some(LaneSpread::Right),
            "center" => Some(LaneSpread::Center),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LaneSpread::Right => "right",
            LaneSpread::Center => "center",
        }
    }
}

/// Per-lane attributes; lanes are indexed from the right
#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    pub permissions: VehicleClasses,
    pub preferred: VehicleClasses,
    pub width: Option<f64>,
    pub end_offset: Option<f64>,
    /// Inherits the edge speed when unset
    pub speed: Option<f64>,
}

impl Lane {
    pub fn new(permissions: VehicleClasses) -> Self {
        Self {
            permissions,
            preferred: VehicleClasses::empty(),
            width: None,
            end_offset: None,
            speed: None,
        }
    }
}

/// Directed road segment between two nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub type_id: String,
    pub speed: f64,
    pub priority: i32,
    pub width: Option<f64>,
    pub end_offset: Option<f64>,
    pub street_name: String,
    pub spread: LaneSpread,
    pub geometry: PositionVector,
    /// Length given in the input, overriding the geometric length
    pub loaded_length: Option<f64>,
    lanes: Vec<Lane>,
}

impl Edge {
    /// Edge with `num_lanes` lanes (at least one) allowing every class
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        num_lanes: usize,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            type_id: String::new(),
            speed: super::types::DEFAULT_SPEED,
            priority: super::types::DEFAULT_PRIORITY,
            width: None,
            end_offset: None,
            street_name: String::new(),
            spread: LaneSpread::Right,
            geometry: PositionVector::default(),
            loaded_length: None,
            lanes: vec![Lane::new(VehicleClasses::all()); num_lanes.max(1)],
        }
    }

    pub fn num_lanes(&self) -> usize {
        self.lanes.len()
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane(&self, index: usize) -> Option<&Lane> {
        self.lanes.get(index)
    }

    pub fn lane_mut(&mut self, index: usize) -> Option<&mut Lane> {
        self.lanes.get_mut(index)
    }

    /// Resize to `num_lanes` lanes (at least one), keeping the overrides of
    /// lanes that remain
    pub fn set_num_lanes(&mut self, num_lanes: usize) {
        let template = Lane::new(self.permissions());
        self.lanes.resize(num_lanes.max(1), template);
    }

    /// Union of the lanes' permissions
    pub fn permissions(&self) -> VehicleClasses {
        self.lanes
            .iter()
            .fold(VehicleClasses::empty(), |acc, lane| acc | lane.permissions)
    }

    /// Set the same permissions on every lane
    pub fn set_permissions(&mut self, permissions: VehicleClasses) {
        for lane in &mut self.lanes {
            lane.permissions = permissions;
        }
    }

    pub fn has_loaded_length(&self) -> bool {
        self.loaded_length.is_some()
    }

    /// Loaded length if given, geometric length otherwise
    pub fn length(&self) -> f64 {
        self.loaded_length.unwrap_or_else(|| self.geometry.length())
    }

    /// Whether the geometry is just the straight line between the endpoints
    pub fn has_default_geometry(&self, from: Position, to: Position) -> bool {
        let points = self.geometry.points();
        points.len() == 2 && almost_same(points[0], from) && almost_same(points[1], to)
    }

    /// Copy of this edge under a new id, endpoints and geometry.
    ///
    /// Lane overrides are kept for lanes that exist in both; the loaded
    /// length is dropped.
    fn derive(
        &self,
        id: &str,
        from: &str,
        to: &str,
        geometry: PositionVector,
        num_lanes: usize,
    ) -> Edge {
        let mut edge = self.clone();
        edge.id = id.to_string();
        edge.from = from.to_string();
        edge.to = to.to_string();
        edge.geometry = geometry;
        edge.loaded_length = None;
        edge.set_num_lanes(num_lanes);
        edge
    }
}

/// Lane of a specific edge
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LaneRef {
    pub edge: String,
    pub lane: usize,
}

impl LaneRef {
    pub fn new(edge: impl Into<String>, lane: usize) -> Self {
        Self {
            edge: edge.into(),
            lane,
        }
    }
}

/// Lane-to-lane connection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Connection {
    pub from: LaneRef,
    pub to: LaneRef,
    /// Set explicitly; later connection guessing must keep it
    pub validated: bool,
}

/// Lane connections of the whole network
#[derive(Debug, Clone, Default)]
pub struct ConnectionTable {
    connections: Vec<Connection>,
}

impl ConnectionTable {
    /// Add a connection unless the same lane pair is already connected
    pub fn add(&mut self, from: LaneRef, to: LaneRef, validated: bool) -> bool {
        if self
            .connections
            .iter()
            .any(|c| c.from == from && c.to == to)
        {
            return false;
        }
        self.connections.push(Connection {
            from,
            to,
            validated,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn outgoing<'a>(&'a self, edge: &'a str) -> impl Iterator<Item = &'a Connection> {
        self.connections.iter().filter(move |c| c.from.edge == edge)
    }

    pub fn incoming<'a>(&'a self, edge: &'a str) -> impl Iterator<Item = &'a Connection> {
        self.connections.iter().filter(move |c| c.to.edge == edge)
    }

    /// Drop every connection leaving `edge`
    pub fn invalidate_outgoing(&mut self, edge: &str) {
        self.connections.retain(|c| c.from.edge != edge);
    }

    /// Drop every connection touching `edge`
    pub fn remove_edge(&mut self, edge: &str) {
        self.connections
            .retain(|c| c.from.edge != edge && c.to.edge != edge);
    }

    /// Move connections leaving `old` to leave `new` instead; connections
    /// from lanes `new` does not have are dropped
    fn retarget_outgoing(&mut self, old: &str, new: &str, num_lanes: usize) {
        self.connections
            .retain(|c| c.from.edge != old || c.from.lane < num_lanes);
        for c in &mut self.connections {
            if c.from.edge == old {
                c.from.edge = new.to_string();
            }
        }
    }

    /// Move connections reaching `old` to reach `new` instead
    fn retarget_incoming(&mut self, old: &str, new: &str, num_lanes: usize) {
        self.connections
            .retain(|c| c.to.edge != old || c.to.lane < num_lanes);
        for c in &mut self.connections {
            if c.to.edge == old {
                c.to.edge = new.to_string();
            }
        }
    }
}

/// Edges keyed by id
#[derive(Debug, Default)]
pub struct EdgeRegistry {
    edges: BTreeMap<String, Edge>,
    connections: ConnectionTable,
    extracted: Vec<Edge>,
}

impl EdgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    pub fn retrieve(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn retrieve_mut(&mut self, id: &str) -> Option<&mut Edge> {
        self.edges.get_mut(id)
    }

    /// Add an edge; `false` if its id is already taken
    pub fn insert(&mut self, edge: Edge) -> bool {
        if self.edges.contains_key(&edge.id) {
            return false;
        }
        log::debug!("Inserting edge '{}' ({} -> {})", edge.id, edge.from, edge.to);
        self.edges.insert(edge.id.clone(), edge);
        true
    }

    /// Remove an edge for good, together with its connections
    pub fn erase(&mut self, id: &str) -> Option<Edge> {
        let edge = self.edges.remove(id)?;
        log::debug!("Erasing edge '{id}'");
        self.connections.remove_edge(id);
        Some(edge)
    }

    /// Remove an edge from the network but keep it in the extracted list
    pub fn extract(&mut self, id: &str) -> bool {
        match self.erase(id) {
            Some(edge) => {
                self.extracted.push(edge);
                true
            }
            None => false,
        }
    }

    /// Edges removed by [`EdgeRegistry::extract`]
    pub fn extracted(&self) -> &[Edge] {
        &self.extracted
    }

    /// Remove an edge temporarily; its connections stay in place
    pub fn take(&mut self, id: &str) -> Option<Edge> {
        self.edges.remove(id)
    }

    pub fn connections(&self) -> &ConnectionTable {
        &self.connections
    }

    pub fn connections_mut(&mut self) -> &mut ConnectionTable {
        &mut self.connections
    }

    /// Split edge `id` at `offset` along its geometry.
    ///
    /// The predecessor `pred_id` runs from the original start to `node` with
    /// `pred_lanes` lanes, the successor `succ_id` from `node` to the
    /// original end with `succ_lanes` lanes. Outgoing connections move to
    /// the successor, incoming ones stay with the predecessor.
    #[allow(clippy::too_many_arguments)]
    pub fn split_at(
        &mut self,
        id: &str,
        offset: f64,
        node: &Node,
        pred_id: &str,
        succ_id: &str,
        pred_lanes: usize,
        succ_lanes: usize,
    ) -> Result<()> {
        let edge = self.edges.get(id).ok_or_else(|| ImportError::UnknownEdge {
            edge: id.to_string(),
        })?;

        if pred_id == succ_id {
            return Err(split_failed(id, "predecessor and successor share an id"));
        }
        for new_id in [pred_id, succ_id] {
            if new_id != id && self.edges.contains_key(new_id) {
                return Err(split_failed(id, format!("edge '{new_id}' already exists")));
            }
        }

        let (first, second) = edge
            .geometry
            .split_at(offset)
            .ok_or_else(|| split_failed(id, format!("offset {offset} lies outside the geometry")))?;

        let pred = edge.derive(pred_id, &edge.from, &node.id, first, pred_lanes);
        let succ = edge.derive(succ_id, &node.id, &edge.to, second, succ_lanes);
        log::debug!(
            "Splitting edge '{id}' at {offset:.2} into '{pred_id}' and '{succ_id}' at node '{}'",
            node.id
        );

        self.edges.remove(id);
        self.connections
            .retarget_outgoing(id, succ_id, succ.num_lanes());
        self.connections
            .retarget_incoming(id, pred_id, pred.num_lanes());
        self.edges.insert(pred.id.clone(), pred);
        self.edges.insert(succ.id.clone(), succ);
        Ok(())
    }
}

fn split_failed(edge: &str, reason: impl Into<String>) -> ImportError {
    ImportError::SplitFailed {
        edge: edge.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    fn straight_edge(id: &str, from: &str, to: &str, x0: f64, x1: f64, lanes: usize) -> Edge {
        let mut edge = Edge::new(id, from, to, lanes);
        edge.geometry = PositionVector::between(Coord { x: x0, y: 0.0 }, Coord { x: x1, y: 0.0 });
        edge
    }

    #[test]
    fn test_lane_count_changes_keep_overrides() {
        let mut edge = Edge::new("e", "a", "b", 2);
        edge.lane_mut(0).unwrap().width = Some(3.0);
        edge.set_num_lanes(4);
        assert_eq!(edge.num_lanes(), 4);
        assert_eq!(edge.lane(0).unwrap().width, Some(3.0));
        edge.set_num_lanes(1);
        assert_eq!(edge.num_lanes(), 1);
        edge.set_num_lanes(0);
        assert_eq!(edge.num_lanes(), 1);
    }

    #[test]
    fn test_permissions_union_of_lanes() {
        let mut edge = Edge::new("e", "a", "b", 2);
        edge.set_permissions(VehicleClasses::BUS);
        edge.lane_mut(1).unwrap().permissions = VehicleClasses::TAXI;
        assert_eq!(edge.permissions(), VehicleClasses::BUS | VehicleClasses::TAXI);
    }

    #[test]
    fn test_insert_extract_erase() {
        let mut edges = EdgeRegistry::new();
        assert!(edges.insert(Edge::new("e", "a", "b", 1)));
        assert!(!edges.insert(Edge::new("e", "b", "c", 1)));
        assert!(edges.extract("e"));
        assert!(!edges.contains("e"));
        assert_eq!(edges.extracted()[0].id, "e");
        assert!(!edges.extract("e"));
        assert!(edges.erase("e").is_none());
    }

    #[test]
    fn test_split_moves_outgoing_connections() {
        let mut edges = EdgeRegistry::new();
        edges.insert(straight_edge("in", "x", "a", -50.0, 0.0, 1));
        edges.insert(straight_edge("e", "a", "b", 0.0, 100.0, 2));
        edges.insert(straight_edge("out", "b", "y", 100.0, 150.0, 2));
        edges
            .connections_mut()
            .add(LaneRef::new("in", 0), LaneRef::new("e", 0), false);
        edges
            .connections_mut()
            .add(LaneRef::new("e", 0), LaneRef::new("out", 0), false);
        edges
            .connections_mut()
            .add(LaneRef::new("e", 1), LaneRef::new("out", 1), false);

        let node = Node::new("e.30", Coord { x: 30.0, y: 0.0 });
        edges.split_at("e", 30.0, &node, "e", "e.30", 2, 1).unwrap();

        let pred = edges.retrieve("e").unwrap();
        let succ = edges.retrieve("e.30").unwrap();
        assert_eq!((pred.from.as_str(), pred.to.as_str()), ("a", "e.30"));
        assert_eq!((succ.from.as_str(), succ.to.as_str()), ("e.30", "b"));
        assert!((pred.geometry.length() - 30.0).abs() < 1e-9);
        assert!((succ.geometry.length() - 70.0).abs() < 1e-9);
        assert_eq!(succ.num_lanes(), 1);

        let table = edges.connections();
        assert_eq!(table.incoming("e").count(), 1);
        assert_eq!(table.outgoing("e").count(), 0);
        let moved: Vec<_> = table.outgoing("e.30").collect();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].to, LaneRef::new("out", 0));
    }

    #[test]
    fn test_split_refuses_taken_successor_id() {
        let mut edges = EdgeRegistry::new();
        edges.insert(straight_edge("e", "a", "b", 0.0, 100.0, 1));
        edges.insert(straight_edge("e.50", "b", "c", 100.0, 200.0, 1));
        let node = Node::new("n", Coord { x: 50.0, y: 0.0 });
        let err = edges.split_at("e", 50.0, &node, "e", "e.50", 1, 1).unwrap_err();
        assert!(matches!(err, ImportError::SplitFailed { .. }));
        assert!(edges.contains("e"));
        assert_eq!(edges.len(), 2);
    }
}
