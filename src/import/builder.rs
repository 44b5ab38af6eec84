//! Per-edge scratch state between edge-open and edge-close

use crate::core::error::{ImportError, Result};
use crate::core::report::Diagnostics;
use crate::network::{Edge, Network};

use super::splits::SplitPlanner;
use super::splitter::{EdgeSplitter, SplitOutcome};

/// Edge under construction.
///
/// Created when an edge record opens, receives the nested lane and split
/// records, and is committed to the edge registry when the record closes.
/// An edge being updated is taken out of the registry for that time.
#[derive(Debug, Clone)]
pub struct EdgeBuilder {
    pub edge: Edge,
    pub splits: SplitPlanner,
}

impl EdgeBuilder {
    pub fn new(edge: Edge) -> Self {
        Self {
            edge,
            splits: SplitPlanner::new(),
        }
    }

    /// Insert the edge and run its staged splits
    pub fn finish(
        self,
        network: &mut Network,
        diag: &mut Diagnostics<'_>,
    ) -> Result<Option<SplitOutcome>> {
        let id = self.edge.id.clone();
        let splits = self.splits.finalize(&self.edge)?;

        if !network.edges.insert(self.edge) {
            return Err(ImportError::DuplicateEdge { edge: id });
        }
        if splits.is_empty() {
            return Ok(None);
        }

        EdgeSplitter::new(network, diag)
            .run(&id, &splits)
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::CollectingReporter;
    use crate::geom::PositionVector;
    use crate::network::Node;
    use geo::Coord;

    fn builder(id: &str) -> EdgeBuilder {
        let mut edge = Edge::new(id, "a", "b", 1);
        edge.geometry =
            PositionVector::between(Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 0.0 });
        EdgeBuilder::new(edge)
    }

    #[test]
    fn test_finish_without_splits() {
        let mut network = Network::default();
        let mut reporter = CollectingReporter::new();
        let mut diag = Diagnostics::new(&mut reporter);

        let outcome = builder("e").finish(&mut network, &mut diag).unwrap();
        assert!(outcome.is_none());
        assert!(network.edges.contains("e"));
    }

    #[test]
    fn test_finish_runs_splits() {
        let mut network = Network::default();
        network.nodes.insert(Node::new("a", Coord { x: 0.0, y: 0.0 }));
        network.nodes.insert(Node::new("b", Coord { x: 100.0, y: 0.0 }));
        let mut reporter = CollectingReporter::new();
        let mut diag = Diagnostics::new(&mut reporter);

        let mut builder = builder("e");
        builder.splits.add("e", 100.0, 40.0, vec![]).unwrap();
        let outcome = builder.finish(&mut network, &mut diag).unwrap().unwrap();
        assert_eq!(outcome.chain, vec!["e", "e.40"]);
        assert_eq!(network.edges.len(), 2);
    }

    #[test]
    fn test_duplicate_insert_discards_edge() {
        let mut network = Network::default();
        network.edges.insert(Edge::new("e", "x", "y", 3));
        let mut reporter = CollectingReporter::new();
        let mut diag = Diagnostics::new(&mut reporter);

        let err = builder("e").finish(&mut network, &mut diag).unwrap_err();
        assert!(matches!(err, ImportError::DuplicateEdge { .. }));
        assert_eq!(network.edges.retrieve("e").unwrap().num_lanes(), 3);
    }
}
