//! JSON export of an imported network

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::core::error::{ImportError, Result};
use crate::network::{Connection, Edge, Lane, Network, Node};

#[derive(Debug, Serialize)]
pub struct NetworkDocument<'a> {
    pub nodes: Vec<NodeEntry<'a>>,
    pub edges: Vec<EdgeEntry<'a>>,
    pub connections: Vec<ConnectionEntry<'a>>,
    pub extracted: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct NodeEntry<'a> {
    pub id: &'a str,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeEntry<'a> {
    pub id: &'a str,
    pub from: &'a str,
    pub to: &'a str,
    #[serde(rename = "type", skip_serializing_if = "str::is_empty")]
    pub type_id: &'a str,
    pub speed: f64,
    pub priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<f64>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub name: &'a str,
    pub spread_type: &'static str,
    pub length: f64,
    pub shape: Vec<[f64; 2]>,
    pub lanes: Vec<LaneEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneEntry {
    pub index: usize,
    pub allow: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prefer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEntry<'a> {
    pub from: &'a str,
    pub from_lane: usize,
    pub to: &'a str,
    pub to_lane: usize,
    pub validated: bool,
}

impl<'a> From<&'a Node> for NodeEntry<'a> {
    fn from(node: &'a Node) -> Self {
        Self {
            id: &node.id,
            x: node.position.x,
            y: node.position.y,
        }
    }
}

impl From<(usize, &Lane)> for LaneEntry {
    fn from((index, lane): (usize, &Lane)) -> Self {
        Self {
            index,
            allow: lane.permissions.to_list_string(),
            prefer: lane.preferred.to_list_string(),
            width: lane.width,
            end_offset: lane.end_offset,
            speed: lane.speed,
        }
    }
}

impl<'a> From<&'a Edge> for EdgeEntry<'a> {
    fn from(edge: &'a Edge) -> Self {
        Self {
            id: &edge.id,
            from: &edge.from,
            to: &edge.to,
            type_id: &edge.type_id,
            speed: edge.speed,
            priority: edge.priority,
            width: edge.width,
            end_offset: edge.end_offset,
            name: &edge.street_name,
            spread_type: edge.spread.name(),
            length: edge.length(),
            shape: edge.geometry.points().iter().map(|p| [p.x, p.y]).collect(),
            lanes: edge.lanes().iter().enumerate().map(LaneEntry::from).collect(),
        }
    }
}

impl<'a> From<&'a Connection> for ConnectionEntry<'a> {
    fn from(connection: &'a Connection) -> Self {
        Self {
            from: &connection.from.edge,
            from_lane: connection.from.lane,
            to: &connection.to.edge,
            to_lane: connection.to.lane,
            validated: connection.validated,
        }
    }
}

impl<'a> NetworkDocument<'a> {
    pub fn new(network: &'a Network) -> Self {
        Self {
            nodes: network.nodes.iter().map(NodeEntry::from).collect(),
            edges: network.edges.iter().map(EdgeEntry::from).collect(),
            connections: network
                .edges
                .connections()
                .iter()
                .map(ConnectionEntry::from)
                .collect(),
            extracted: network
                .edges
                .extracted()
                .iter()
                .map(|edge| edge.id.as_str())
                .collect(),
        }
    }
}

/// Serialize `network` as pretty JSON into `writer`
pub fn write_json_to<W: Write>(network: &Network, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, &NetworkDocument::new(network))
        .map_err(|e| ImportError::Io(e.into()))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write `network` as pretty JSON to the file at `path`
pub fn write_json<P: AsRef<Path>>(network: &Network, path: P) -> Result<()> {
    let file = File::create(path)?;
    write_json_to(network, BufWriter::new(file))
}

pub fn to_json_string(network: &Network) -> Result<String> {
    serde_json::to_string_pretty(&NetworkDocument::new(network)).map_err(|e| ImportError::Io(e.into()))
}
