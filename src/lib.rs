//! # Butterfly-edges Library
//!
//! Imports plain edge definitions into a road network for traffic simulation.
//!
//! ## Features
//!
//! - **Layered attributes**: explicit fields over a previous declaration, over
//!   a named type, over system defaults
//! - **Updates and removal**: redeclaring an edge id patches the existing edge
//! - **Longitudinal splits**: one edge becomes a chain with changing lane
//!   counts and explicit lane connections
//! - **Deprecated field names**: still accepted, with a one-time advisory
//!
//! ## Basic Usage
//!
//! ```rust
//! use butterfly_edges::{CollectingReporter, ImportOptions};
//!
//! let xml = r#"<edges>
//!     <edge id="main" xfrom="0" yfrom="0" xto="100" yto="0" numLanes="2">
//!         <split pos="40" lanes="1"/>
//!     </edge>
//! </edges>"#;
//!
//! let mut reporter = CollectingReporter::new();
//! let network = butterfly_edges::import_str(xml, &ImportOptions::default(), &mut reporter)?;
//! assert_eq!(network.edges.len(), 2);
//! # Ok::<(), butterfly_edges::ImportError>(())
//! ```

pub mod core;
pub mod geom;
pub mod import;
pub mod input;
pub mod network;
pub mod output;
pub mod vclass;

use std::path::Path;

pub use crate::core::{
    CollectingReporter, Diagnostics, ImportError, ImportOptions, Reporter, Result, Severity,
    TypeDef, WarningKind,
};
pub use crate::import::ImportSession;
pub use crate::input::{Record, RecordEvent, Tag, XmlRecordReader};
pub use crate::network::{Edge, Network, Node};

/// Import a single plain XML document into a fresh network
pub fn import_str(
    content: &str,
    options: &ImportOptions,
    reporter: &mut dyn Reporter,
) -> Result<Network> {
    let events = XmlRecordReader::read_str(content)?;
    import_events(events, options, reporter)
}

/// Import plain XML files in order into a fresh network.
///
/// Node files should come before the edge files referencing them.
pub fn import_files<P: AsRef<Path>>(
    paths: &[P],
    options: &ImportOptions,
    reporter: &mut dyn Reporter,
) -> Result<Network> {
    let mut events = Vec::new();
    for path in paths {
        events.extend(XmlRecordReader::read_file(path)?);
    }
    import_events(events, options, reporter)
}

/// Run one import session over `events`
pub fn import_events<I>(
    events: I,
    options: &ImportOptions,
    reporter: &mut dyn Reporter,
) -> Result<Network>
where
    I: IntoIterator<Item = RecordEvent>,
{
    let mut network = Network::from_options(options)?;
    let mut session = ImportSession::new(&mut network, options, reporter);
    session.run(events)?;
    session.finish()?;
    Ok(network)
}
