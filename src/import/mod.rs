//! Edge import session
//!
//! Consumes record events one at a time and applies them to a [`Network`].
//! Errors are recovered at the record boundary: they are reported and the
//! record (or the single lane or split) is skipped. Only fatal errors are
//! returned to the caller.

pub mod attributes;
pub mod builder;
pub mod lanes;
pub mod nodes;
pub mod splits;
pub mod splitter;

pub use attributes::{AttributeResolver, EdgeAttributes};
pub use builder::EdgeBuilder;
pub use lanes::LaneConfigurator;
pub use nodes::NodeResolver;
pub use splits::{SplitPlanner, SplitRequest};
pub use splitter::{EdgeSplitter, SplitOutcome};

use geo::Coord;

use crate::core::config::ImportOptions;
use crate::core::error::{ImportError, Result};
use crate::core::report::{Diagnostics, Reporter, WarningKind};
use crate::geom::Transformer;
use crate::input::{Record, RecordEvent, Tag};
use crate::network::Network;

pub struct ImportSession<'a> {
    network: &'a mut Network,
    options: &'a ImportOptions,
    transformer: Box<dyn Transformer>,
    diag: Diagnostics<'a>,
    /// Id of the most recent edge or delete record
    current_id: String,
    current: Option<EdgeBuilder>,
    records: usize,
}

impl<'a> ImportSession<'a> {
    pub fn new(
        network: &'a mut Network,
        options: &'a ImportOptions,
        reporter: &'a mut dyn Reporter,
    ) -> Self {
        Self {
            network,
            options,
            transformer: options.transformer(),
            diag: Diagnostics::new(reporter),
            current_id: String::new(),
            current: None,
            records: 0,
        }
    }

    /// Number of records opened so far
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn network(&self) -> &Network {
        self.network
    }

    /// Feed all `events` in order
    pub fn run<I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = RecordEvent>,
    {
        for event in events {
            self.handle(event)?;
        }
        Ok(())
    }

    /// Process one event; only fatal errors are returned
    pub fn handle(&mut self, event: RecordEvent) -> Result<()> {
        match event {
            RecordEvent::Open(record) => {
                self.records += 1;
                let result = match record.tag() {
                    Tag::Edge => {
                        if self.current.is_some() {
                            let closed = self.close_edge();
                            self.recover(closed)?;
                        }
                        self.open_edge(&record)
                    }
                    Tag::Lane => self.add_lane(&record),
                    Tag::Split => self.add_split(&record),
                    Tag::Delete => self.delete_edge(&record),
                    Tag::Node => self.add_node(&record),
                    Tag::Other(_) => Ok(()),
                };
                self.recover(result)
            }
            RecordEvent::Close(Tag::Edge) => {
                let result = self.close_edge();
                self.recover(result)
            }
            RecordEvent::Close(_) => Ok(()),
        }
    }

    /// Close an edge left open at the end of the input
    pub fn finish(mut self) -> Result<()> {
        let result = self.close_edge();
        self.recover(result)
    }

    fn recover(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                self.diag.report(&err);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    fn open_edge(&mut self, record: &Record) -> Result<()> {
        self.current = None;
        let id = record.required_str("", "id")?.to_string();
        self.current_id = id.clone();

        let is_update = self.network.edges.contains(&id);
        if is_update {
            self.diag.message_once(
                WarningKind::DuplicateEdgeOverwrite,
                &format!("Duplicate edge id occurred ('{id}'); assuming overwriting is wished."),
            );
            if record.bool(&id, "remove")?.unwrap_or(false) {
                self.network.edges.erase(&id);
                return Ok(());
            }
        }

        match self.build_edge(&id, record, is_update) {
            Ok(builder) => {
                self.current = Some(builder);
                Ok(())
            }
            Err(err) => {
                // A failed update leaves the edge as it was; nested records
                // still apply to it
                if is_update {
                    self.current = self
                        .network
                        .edges
                        .take(&id)
                        .map(EdgeBuilder::new);
                }
                Err(err)
            }
        }
    }

    fn build_edge(&mut self, id: &str, record: &Record, is_update: bool) -> Result<EdgeBuilder> {
        let network = &mut *self.network;
        let existing = network.edges.retrieve(id);
        let previous = existing.map(|e| (e.from.clone(), e.to.clone()));
        let default_geometry = existing.map(|e| {
            match (network.nodes.retrieve_by_name(&e.from), network.nodes.retrieve_by_name(&e.to)) {
                (Some(from), Some(to)) => e.has_default_geometry(from.position, to.position),
                _ => false,
            }
        });

        let resolver = AttributeResolver::new(&network.types, self.options, self.transformer.as_ref());
        let mut attrs = resolver.resolve(
            id,
            record,
            existing.zip(default_geometry),
            &mut self.diag,
        )?;

        let (from, to) = NodeResolver::new(&mut network.nodes, self.transformer.as_ref()).endpoints(
            id,
            record,
            previous.as_ref().map(|(f, t)| (f.as_str(), t.as_str())),
            &mut self.diag,
        )?;
        if let Some((prev_from, prev_to)) = &previous {
            if *prev_from != from || *prev_to != to {
                attrs.reset_shape();
            }
        }

        let carried = std::mem::take(&mut attrs.shape);
        attrs.shape = resolver.shape(id, record, carried, &mut self.diag)?;

        let from_pos = network.node_position(&from).ok_or_else(|| missing(id))?;
        let to_pos = network.node_position(&to).ok_or_else(|| missing(id))?;
        if is_update {
            network.edges.take(id).ok_or_else(|| missing(id))?;
        }

        let edge = attrs.into_edge(
            id,
            (&from, from_pos),
            (&to, to_pos),
            self.options.plain.keep_edge_shape,
        );
        Ok(EdgeBuilder::new(edge))
    }

    fn close_edge(&mut self) -> Result<()> {
        let Some(builder) = self.current.take() else {
            return Ok(());
        };
        builder.finish(self.network, &mut self.diag).map(|_| ())
    }

    fn add_lane(&mut self, record: &Record) -> Result<()> {
        let Some(builder) = self.current.as_mut() else {
            return self.edge_not_known();
        };
        LaneConfigurator::new(self.options).apply(&mut builder.edge, record, &mut self.diag)
    }

    fn add_split(&mut self, record: &Record) -> Result<()> {
        let Some(builder) = self.current.as_mut() else {
            self.diag
                .warn("Ignoring 'split' because it cannot be assigned to an edge");
            return Ok(());
        };
        builder.splits.declare(&builder.edge, record, &mut self.diag)
    }

    fn edge_not_known(&self) -> Result<()> {
        if self.options.is_explicitly_removed(&self.current_id) {
            return Ok(());
        }
        Err(ImportError::UnknownEdge {
            edge: self.current_id.clone(),
        })
    }

    fn delete_edge(&mut self, record: &Record) -> Result<()> {
        let id = record.required_str("", "id")?.to_string();
        if !self.network.edges.extract(&id) {
            self.diag.warn(&format!(
                "Ignoring tag 'delete' for unknown edge '{id}'"
            ));
        }
        self.current_id = id;
        Ok(())
    }

    fn add_node(&mut self, record: &Record) -> Result<()> {
        let id = record.required_str("", "id")?;
        let coord = |field: &str| {
            record.f64(id, field)?.ok_or_else(|| ImportError::MissingField {
                edge: id.to_string(),
                field: field.to_string(),
            })
        };
        let raw = Coord {
            x: coord("x")?,
            y: coord("y")?,
        };
        let pos = self.transformer.transform(raw).ok_or_else(|| {
            ImportError::malformed(id, "x", &format!("{},{}", raw.x, raw.y), "position cannot be projected")
        })?;
        if !self.network.nodes.insert_position_for_name(id, pos) {
            return Err(ImportError::PositionConflict {
                node: id.to_string(),
                dir: "declared",
            });
        }
        Ok(())
    }
}

fn missing(edge: &str) -> ImportError {
    ImportError::MissingEdgeState {
        edge: edge.to_string(),
    }
}
