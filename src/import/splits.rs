//! Split requests of the open edge
//!
//! Splits are validated against the edge geometry when declared and
//! completed (default lane subset, ordering, geometric point) when the edge
//! is closed.

use crate::core::error::{ImportError, Result};
use crate::core::report::Diagnostics;
use crate::geom::Position;
use crate::input::Record;
use crate::network::Edge;

/// One longitudinal split of an edge
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRequest {
    /// Offset from the edge start, negative offsets already normalized
    pub pos: f64,
    /// Id suffix of the split node and the successor edge
    pub name_tag: i64,
    /// Lanes retained after the split, ascending; empty until finalized
    pub lanes: Vec<usize>,
    /// Point on the edge geometry; set when finalized
    pub position: Option<Position>,
}

impl SplitRequest {
    /// Leftmost retained lane
    pub fn leftmost_lane(&self) -> Option<usize> {
        self.lanes.last().copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SplitPlanner {
    splits: Vec<SplitRequest>,
}

impl SplitPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SplitRequest> {
        self.splits.iter()
    }

    /// Declare a split from a split record.
    ///
    /// Lane entries that fail to parse are reported and left out; the split
    /// itself is still staged.
    pub fn declare(&mut self, edge: &Edge, record: &Record, diag: &mut Diagnostics<'_>) -> Result<()> {
        let pos = record.f64(&edge.id, "pos")?.ok_or_else(|| ImportError::MissingField {
            edge: edge.id.clone(),
            field: "pos".to_string(),
        })?;

        let mut lanes = Vec::new();
        for entry in record.list("lanes").unwrap_or_default() {
            match entry.parse::<usize>() {
                Ok(lane) => lanes.push(lane),
                Err(_) => diag.error(&format!(
                    "Error on parsing a split (edge '{}'): invalid lane '{entry}'.",
                    edge.id
                )),
            }
        }

        self.add(&edge.id, edge.geometry.length(), pos, lanes)
    }

    /// Stage a split at raw position `pos` on an edge of geometric length
    /// `length`. An empty `lanes` means every lane at finalization.
    pub fn add(&mut self, edge_id: &str, length: f64, pos: f64, lanes: Vec<usize>) -> Result<()> {
        if pos.abs() > length {
            return Err(ImportError::SplitOutOfRange {
                edge: edge_id.to_string(),
                pos,
            });
        }
        // The successor id keeps the position as written, sign included
        let name_tag = pos.trunc() as i64;
        let pos = if pos < 0.0 { pos + length } else { pos };
        if self.splits.iter().any(|s| s.pos == pos) {
            return Err(ImportError::DuplicateSplit {
                edge: edge_id.to_string(),
                pos,
            });
        }

        log::debug!("Staging split of edge '{edge_id}' at {pos}");
        self.splits.push(SplitRequest {
            pos,
            name_tag,
            lanes,
            position: None,
        });
        Ok(())
    }

    /// Complete the staged splits against the finished edge: default lane
    /// subsets, geometric points and ascending order.
    pub fn finalize(self, edge: &Edge) -> Result<Vec<SplitRequest>> {
        let mut splits = self.splits;
        for split in &mut splits {
            if split.lanes.is_empty() {
                split.lanes = (0..edge.num_lanes()).collect();
            }
            split.lanes.sort_unstable();
            split.lanes.dedup();
            split.position = Some(edge.geometry.position_at_offset(split.pos).ok_or_else(
                || ImportError::MissingEdgeState {
                    edge: edge.id.clone(),
                },
            )?);
        }
        splits.sort_by(|a, b| a.pos.total_cmp(&b.pos));
        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::CollectingReporter;
    use crate::geom::PositionVector;
    use crate::input::Tag;
    use geo::Coord;

    fn edge(length: f64, lanes: usize) -> Edge {
        let mut edge = Edge::new("e", "a", "b", lanes);
        edge.geometry =
            PositionVector::between(Coord { x: 0.0, y: 0.0 }, Coord { x: length, y: 0.0 });
        edge
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut planner = SplitPlanner::new();
        assert!(matches!(
            planner.add("e", 100.0, 120.0, vec![]),
            Err(ImportError::SplitOutOfRange { .. })
        ));
        assert!(matches!(
            planner.add("e", 100.0, -101.0, vec![]),
            Err(ImportError::SplitOutOfRange { .. })
        ));
        assert!(planner.is_empty());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut planner = SplitPlanner::new();
        planner.add("e", 100.0, 50.0, vec![]).unwrap();
        assert!(matches!(
            planner.add("e", 100.0, 50.0, vec![0]),
            Err(ImportError::DuplicateSplit { .. })
        ));
        // Equality, not tolerance
        planner.add("e", 100.0, 50.001, vec![]).unwrap();
        assert_eq!(planner.len(), 2);
    }

    #[test]
    fn test_negative_position_measured_from_end() {
        let mut planner = SplitPlanner::new();
        planner.add("e", 100.0, -25.0, vec![]).unwrap();
        let split = planner.iter().next().unwrap();
        assert_eq!(split.pos, 75.0);
        assert_eq!(split.name_tag, -25);
    }

    #[test]
    fn test_finalize_defaults_lanes_and_sorts() {
        let edge = edge(100.0, 3);
        let mut planner = SplitPlanner::new();
        planner.add("e", 100.0, 70.0, vec![2, 1]).unwrap();
        planner.add("e", 100.0, 30.5, vec![]).unwrap();

        let splits = planner.finalize(&edge).unwrap();
        assert_eq!(splits[0].pos, 30.5);
        assert_eq!(splits[0].name_tag, 30);
        assert_eq!(splits[0].lanes, vec![0, 1, 2]);
        let point = splits[0].position.unwrap();
        assert!((point.x - 30.5).abs() < 1e-9 && point.y.abs() < 1e-9);
        assert_eq!(splits[1].lanes, vec![1, 2]);
        assert_eq!(splits[1].leftmost_lane(), Some(2));
    }

    #[test]
    fn test_declare_skips_bad_lane_entries() {
        let edge = edge(100.0, 2);
        let mut planner = SplitPlanner::new();
        let mut reporter = CollectingReporter::new();
        let mut diag = Diagnostics::new(&mut reporter);

        let record = Record::new(Tag::Split).with("pos", "40").with("lanes", "0 x 1");
        planner.declare(&edge, &record, &mut diag).unwrap();
        drop(diag);

        assert_eq!(planner.iter().next().unwrap().lanes, vec![0, 1]);
        assert_eq!(reporter.error_count(), 1);
    }
}
