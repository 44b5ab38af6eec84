//! Endpoint node resolution
//!
//! An endpoint is given by name, by position, or both. Unnamed positions
//! reuse a node already lying exactly there before a new one is created.

use geo::Coord;

use crate::core::error::{suggest_identifier, ImportError, Result};
use crate::core::report::{Diagnostics, WarningKind};
use crate::geom::{Position, Transformer};
use crate::input::{FieldAlias, Record, FROM_NODE, FROM_POSITION, TO_NODE, TO_POSITION};
use crate::network::{Node, NodeRegistry};

pub struct NodeResolver<'a> {
    nodes: &'a mut NodeRegistry,
    transformer: &'a dyn Transformer,
}

impl<'a> NodeResolver<'a> {
    pub fn new(nodes: &'a mut NodeRegistry, transformer: &'a dyn Transformer) -> Self {
        Self { nodes, transformer }
    }

    /// Resolve an endpoint to a node id.
    ///
    /// `name` may be empty, `pos` is already transformed.
    pub fn resolve(
        &mut self,
        edge: &str,
        dir: &'static str,
        name: &str,
        pos: Option<Position>,
    ) -> Result<String> {
        match (name.is_empty(), pos) {
            (true, None) => Err(ImportError::MissingEndpoint {
                edge: edge.to_string(),
                dir,
            }),
            (false, Some(pos)) => {
                if !self.nodes.insert_position_for_name(name, pos) {
                    return Err(ImportError::PositionConflict {
                        node: name.to_string(),
                        dir,
                    });
                }
                self.by_name(edge, dir, name)
            }
            (false, None) => self.by_name(edge, dir, name),
            (true, Some(pos)) => {
                if let Some(node) = self.nodes.retrieve_by_position(pos) {
                    return Ok(node.id.clone());
                }
                let id = self.nodes.fresh_id();
                if !self.nodes.insert(Node::new(id.clone(), pos)) {
                    return Err(ImportError::NodeInsertFailed {
                        dir,
                        x: pos.x,
                        y: pos.y,
                    });
                }
                Ok(id)
            }
        }
    }

    fn by_name(&self, edge: &str, dir: &'static str, name: &str) -> Result<String> {
        match self.nodes.retrieve_by_name(name) {
            Some(node) => Ok(node.id.clone()),
            None => Err(ImportError::UnknownNode {
                edge: edge.to_string(),
                node: name.to_string(),
                dir,
                suggestion: suggest_identifier(name, self.nodes.ids()),
            }),
        }
    }

    /// Resolve both endpoints of an edge record.
    ///
    /// `previous` holds the endpoints of the edge being updated; they are
    /// used when the record names none.
    pub fn endpoints(
        &mut self,
        edge: &str,
        record: &Record,
        previous: Option<(&str, &str)>,
        diag: &mut Diagnostics<'_>,
    ) -> Result<(String, String)> {
        let (prev_from, prev_to) = previous.unwrap_or(("", ""));
        let from_name = endpoint_name(edge, record, &FROM_NODE, prev_from, diag)?;
        let to_name = endpoint_name(edge, record, &TO_NODE, prev_to, diag)?;
        let from_pos = self.deprecated_position(edge, record, FROM_POSITION, diag)?;
        let to_pos = self.deprecated_position(edge, record, TO_POSITION, diag)?;

        let from = self.resolve(edge, "from", &from_name, from_pos)?;
        let to = self.resolve(edge, "to", &to_name, to_pos)?;
        Ok((from, to))
    }

    fn deprecated_position(
        &self,
        edge: &str,
        record: &Record,
        (x_field, y_field): (&str, &str),
        diag: &mut Diagnostics<'_>,
    ) -> Result<Option<Position>> {
        let (Some(x), Some(y)) = (record.f64(edge, x_field)?, record.f64(edge, y_field)?) else {
            return Ok(None);
        };
        diag.deprecated(WarningKind::DeprecatedFromTo);
        self.transformer
            .transform(Coord { x, y })
            .map(Some)
            .ok_or_else(|| {
                ImportError::malformed(
                    edge,
                    x_field,
                    &format!("{x},{y}"),
                    "position cannot be projected",
                )
            })
    }
}

fn endpoint_name(
    edge: &str,
    record: &Record,
    alias: &FieldAlias,
    previous: &str,
    diag: &mut Diagnostics<'_>,
) -> Result<String> {
    for kind in alias.deprecated_uses(record) {
        diag.deprecated(kind);
    }
    match alias.resolve(record) {
        Some(field) => Ok(record.required_str(edge, field)?.to_string()),
        None => Ok(previous.to_string()),
    }
}
