//! Longitudinal edge splitting
//!
//! Turns a finished edge and its ordered splits into a chain of edges. Each
//! boundary gets a new node and explicit lane connections; edges whose lane
//! subset lost lanes on the left are shifted sideways afterwards.

use crate::core::error::{ImportError, Result};
use crate::core::report::Diagnostics;
use crate::geom::LANE_WIDTH_AND_OFFSET;
use crate::network::{ConnectionTable, LaneRef, Network, Node};

use super::splits::SplitRequest;

/// Edges produced by one splitter run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitOutcome {
    /// Edge ids of the chain, head first
    pub chain: Vec<String>,
    /// Splits that were not applied
    pub skipped: usize,
}

pub struct EdgeSplitter<'a, 'd> {
    network: &'a mut Network,
    diag: &'a mut Diagnostics<'d>,
}

impl<'a, 'd> EdgeSplitter<'a, 'd> {
    pub fn new(network: &'a mut Network, diag: &'a mut Diagnostics<'d>) -> Self {
        Self { network, diag }
    }

    /// Apply `splits` (finalized, ascending) to edge `edge_id`
    pub fn run(&mut self, edge_id: &str, splits: &[SplitRequest]) -> Result<SplitOutcome> {
        let head = self.edge_lanes(edge_id)?;
        let max_lanes = splits.iter().map(|s| s.lanes.len()).fold(head, usize::max);

        let mut outcome = SplitOutcome {
            chain: vec![edge_id.to_string()],
            skipped: 0,
        };
        // Edge whose geometry follows each applied split's lane subset
        let mut shifted: Vec<(String, &SplitRequest)> = Vec::new();
        let mut current_id = edge_id.to_string();
        let mut current_lanes: Vec<usize> = (0..head).collect();
        let mut seen = 0.0;

        for split in splits {
            let remaining = self
                .network
                .edges
                .retrieve(&current_id)
                .map(|e| e.geometry.length())
                .ok_or_else(|| missing(edge_id))?;

            if split.pos > 0.0 && remaining + seen > split.pos && split.pos > seen {
                let succ_id = format!("{edge_id}.{}", split.name_tag);
                if self.split_once(&current_id, &succ_id, split, seen, &current_lanes, max_lanes)? {
                    seen = split.pos;
                    current_id = succ_id;
                    current_lanes = split.lanes.clone();
                    outcome.chain.push(current_id.clone());
                    shifted.push((current_id.clone(), split));
                } else {
                    outcome.skipped += 1;
                }
            } else if split.pos == 0.0 {
                let edge = self
                    .network
                    .edges
                    .retrieve_mut(&current_id)
                    .ok_or_else(|| missing(edge_id))?;
                log::debug!(
                    "Resizing edge '{current_id}' from {} to {} lanes",
                    edge.num_lanes(),
                    split.lanes.len()
                );
                edge.set_num_lanes(split.lanes.len());
                current_lanes = split.lanes.clone();
                shifted.push((current_id.clone(), split));
            } else {
                self.diag.warn(&format!(
                    "Split at '{}' lies beyond the edge's length (edge '{edge_id}').",
                    split.pos
                ));
                outcome.skipped += 1;
            }
        }

        for (id, split) in shifted {
            let Some(max_left) = split.leftmost_lane() else {
                continue;
            };
            if max_left + 1 >= max_lanes {
                continue;
            }
            let amount = LANE_WIDTH_AND_OFFSET * (max_lanes - 1 - max_left) as f64;
            if let Some(edge) = self.network.edges.retrieve_mut(&id) {
                log::debug!("Moving edge '{id}' by {amount:.2} to the right");
                edge.geometry.move_to_side(amount);
            }
        }

        Ok(outcome)
    }

    /// Split `current_id` at the split's position; `false` if the split was
    /// skipped
    fn split_once(
        &mut self,
        current_id: &str,
        succ_id: &str,
        split: &SplitRequest,
        seen: f64,
        current_lanes: &[usize],
        max_lanes: usize,
    ) -> Result<bool> {
        let position = split.position.ok_or_else(|| missing(current_id))?;
        let node = Node::new(succ_id, position);
        if !self.network.nodes.insert(node.clone()) {
            self.diag.warn(&format!(
                "Error on parsing a split (edge '{current_id}'): node '{succ_id}' already exists."
            ));
            return Ok(false);
        }

        let pred_lanes = self.edge_lanes(current_id)?;
        let succ_lanes = split.lanes.len();
        match self.network.edges.split_at(
            current_id,
            split.pos - seen,
            &node,
            current_id,
            succ_id,
            pred_lanes,
            succ_lanes,
        ) {
            Ok(()) => {}
            Err(ImportError::UnknownEdge { edge }) => {
                return Err(ImportError::MissingEdgeState { edge })
            }
            Err(err) => {
                self.diag.warn(&err.to_string());
                return Ok(false);
            }
        }

        reconnect(
            self.network.edges.connections_mut(),
            (current_id, pred_lanes, current_lanes),
            (succ_id, succ_lanes, &split.lanes),
            max_lanes,
        );
        Ok(true)
    }

    fn edge_lanes(&self, id: &str) -> Result<usize> {
        self.network
            .edges
            .retrieve(id)
            .map(|e| e.num_lanes())
            .ok_or_else(|| missing(id))
    }
}

fn missing(edge: &str) -> ImportError {
    ImportError::MissingEdgeState {
        edge: edge.to_string(),
    }
}

/// Connect the lanes of predecessor `pred` to successor `succ` across a
/// split boundary.
///
/// Each side is `(edge id, lane count, retained lane indices)`. Retained
/// indices refer to the lanes of the unsplit edge; the rightmost retained
/// index becomes lane 0 of its edge. Connections to lanes an edge does not
/// have are left out.
pub fn reconnect(
    table: &mut ConnectionTable,
    (pred, pred_count, curr): (&str, usize, &[usize]),
    (succ, succ_count, next): (&str, usize, &[usize]),
    max_lanes: usize,
) {
    table.invalidate_outgoing(pred);
    let (Some(&right_p), Some(&left_p)) = (curr.first(), curr.last()) else {
        return;
    };
    let (Some(&right_n), Some(&left_n)) = (next.first(), next.last()) else {
        return;
    };
    let (right_p, left_p, right_n, left_n) = (
        right_p as i64,
        left_p as i64,
        right_n as i64,
        left_n as i64,
    );

    let mut connect = |from: i64, to: i64| {
        if (0..pred_count as i64).contains(&from) && (0..succ_count as i64).contains(&to) {
            table.add(
                LaneRef::new(pred, from as usize),
                LaneRef::new(succ, to as usize),
                true,
            );
        }
    };

    // Lanes added on the right are fed from the predecessor's rightmost lane
    for l in 0..(right_p - right_n) {
        connect(0, l);
    }
    // Lanes added on the left are fed from the predecessor's leftmost lane
    for l in 0..(left_n - left_p) {
        connect(pred_count as i64 - 1, left_n - l - right_n);
    }
    // Continuing lanes run straight through
    for l in 0..max_lanes {
        if curr.contains(&l) && next.contains(&l) {
            let l = l as i64;
            connect(l - right_p, l - right_n);
        }
    }
}
