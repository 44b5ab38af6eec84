//! Core library modules for butterfly-edges
//!
//! Error taxonomy, import options and diagnostic reporting shared by the
//! importer and the command-line interface.

pub mod config;
pub mod error;
pub mod report;

pub use config::{ImportOptions, TypeDef};
pub use error::{suggest_identifier, ImportError, Result, Severity};
pub use report::{CollectingReporter, Diagnostics, Reporter, WarningKind};
