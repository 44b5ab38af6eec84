//! Road network registries
//!
//! The [`Network`] exclusively owns the node, edge and type registries for
//! the duration of an import session.

pub mod edge;
pub mod node;
pub mod types;

pub use edge::{Connection, ConnectionTable, Edge, EdgeRegistry, Lane, LaneRef, LaneSpread};
pub use node::{Node, NodeRegistry};
pub use types::{EdgeType, TypeRegistry};

use crate::core::config::ImportOptions;
use crate::core::error::Result;

#[derive(Debug, Default)]
pub struct Network {
    pub nodes: NodeRegistry,
    pub edges: EdgeRegistry,
    pub types: TypeRegistry,
}

impl Network {
    pub fn new(types: TypeRegistry) -> Self {
        Self {
            nodes: NodeRegistry::new(),
            edges: EdgeRegistry::new(),
            types,
        }
    }

    /// Empty network with the type definitions of `options`
    pub fn from_options(options: &ImportOptions) -> Result<Self> {
        Ok(Self::new(TypeRegistry::from_options(options)?))
    }

    /// Position of node `id`, if known
    pub fn node_position(&self, id: &str) -> Option<crate::geom::Position> {
        self.nodes.retrieve_by_name(id).map(|node| node.position)
    }
}
