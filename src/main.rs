//! # Butterfly-edges CLI
//!
//! Command-line interface for the butterfly-edges library.
//! Imports plain node and edge files into a road network and writes it as JSON.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;

use butterfly_edges::{CollectingReporter, ImportOptions, ImportSession, Network, XmlRecordReader};

mod cli;

/// Command-line interface for butterfly-edges
#[derive(Parser, Debug)]
#[command(name = "butterfly-edges")]
#[command(version)]
#[command(about = "Plain edge definitions importer for road networks")]
#[command(long_about = "Imports plain XML node and edge definitions into a road network:
  butterfly-edges --nodes net.nod.xml --edges net.edg.xml -o net.json
  butterfly-edges --edges net.edg.xml --speed-in-kmh          # JSON to stdout

Edge files are applied in order; a later file may update, remove or
delete edges declared by an earlier one.")]
struct Cli {
    /// Plain XML node files, read before any edge file
    #[arg(long = "nodes", value_name = "FILE")]
    nodes: Vec<PathBuf>,

    /// Plain XML edge files
    #[arg(long = "edges", value_name = "FILE", required = true)]
    edges: Vec<PathBuf>,

    /// TOML file with import options and type definitions
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Speeds in the input are given in km/h
    #[arg(long)]
    speed_in_kmh: bool,

    /// Use explicit shapes as given, without attaching the endpoint positions
    #[arg(long)]
    keep_edge_shape: bool,

    /// Edge ids removed on purpose; lane and split records for them are not errors
    #[arg(long = "remove-edges-explicit", value_name = "ID")]
    remove_edges_explicit: Vec<String>,

    /// Output file, or "-" for stdout
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Options from the config file, overridden by command-line flags
    fn options(&self) -> Result<ImportOptions> {
        let mut options = match &self.config {
            Some(path) => ImportOptions::from_toml_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ImportOptions::default(),
        };
        options.speed_in_kmh |= self.speed_in_kmh;
        options.plain.keep_edge_shape |= self.keep_edge_shape;
        options
            .remove_edges
            .explicit
            .extend(self.remove_edges_explicit.iter().cloned());
        Ok(options)
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run(&cli) {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.verbose {
        eprintln!("🦋 Butterfly-edges v{} starting...", env!("CARGO_PKG_VERSION"));
    }

    let options = cli.options()?;
    let mut network = Network::from_options(&options).context("Invalid type definitions")?;
    let mut reporter = CollectingReporter::new();
    let progress = if io::stderr().is_terminal() {
        cli::ProgressManager::new("importing")
    } else {
        cli::ProgressManager::hidden()
    };

    {
        let mut session = ImportSession::new(&mut network, &options, &mut reporter);
        for path in cli.nodes.iter().chain(&cli.edges) {
            progress.set_stage(&path.display().to_string());
            let events = XmlRecordReader::read_file(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            for event in events {
                if matches!(event, butterfly_edges::RecordEvent::Open(_)) {
                    progress.record();
                }
                session
                    .handle(event)
                    .with_context(|| format!("Import aborted in {}", path.display()))?;
            }
        }
        session.finish().context("Import aborted")?;
    }
    progress.finish();

    eprintln!(
        "📊 {} records: {} nodes, {} edges, {} warnings, {} errors",
        progress.records(),
        network.nodes.len(),
        network.edges.len(),
        reporter.warning_count(),
        reporter.error_count()
    );

    write_output(&network, &cli.output)
}

fn write_output(network: &Network, output: &str) -> Result<()> {
    if output == "-" || output.is_empty() {
        butterfly_edges::output::write_json_to(network, io::stdout().lock())
            .context("Failed to write network to stdout")?;
    } else {
        butterfly_edges::output::write_json(network, output)
            .with_context(|| format!("Failed to write {output}"))?;
        eprintln!("📁 Saved to: {output}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "butterfly-edges",
            "--edges",
            "a.xml",
            "--speed-in-kmh",
            "--remove-edges-explicit",
            "x",
            "--remove-edges-explicit",
            "y",
        ]);
        let options = cli.options().unwrap();
        assert!(options.speed_in_kmh);
        assert!(!options.plain.keep_edge_shape);
        assert_eq!(options.remove_edges.explicit, vec!["x", "y"]);
        assert_eq!(cli.output, "-");
    }

    #[test]
    fn test_edges_required() {
        assert!(Cli::try_parse_from(["butterfly-edges", "--nodes", "n.xml"]).is_err());
    }
}
