//! Error types and utilities for butterfly-edges
//!
//! Provides the import error taxonomy and fuzzy matching for misspelled
//! type and node identifiers.

use strsim::{jaro_winkler, normalized_levenshtein};
use thiserror::Error;

/// How far an error reaches when it is recovered.
///
/// Record and sub-operation errors are reported and the import continues;
/// fatal errors abort the whole import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Aborts the current record only
    Record,
    /// Aborts one lane or one split without touching the rest of the edge record
    SubOperation,
    /// Terminates the import
    Fatal,
}

/// Main error type for butterfly-edges operations
#[derive(Debug, Error)]
pub enum ImportError {
    /// A field is present but cannot be decoded into the expected type
    #[error("Invalid value '{value}' for attribute '{field}' of '{edge}': {reason}")]
    MalformedField {
        edge: String,
        field: String,
        value: String,
        reason: String,
    },

    /// A mandatory field is missing
    #[error("Missing attribute '{field}' for '{edge}'")]
    MissingField { edge: String, field: String },

    /// The record names a type that was never defined
    #[error("Type '{type_id}' used by edge '{edge}' was not defined{}", did_you_mean(.suggestion))]
    UnknownType {
        edge: String,
        type_id: String,
        suggestion: Option<String>,
    },

    /// Neither a name nor a position was given for an endpoint
    #[error("Neither the name nor the position of the {dir}-node is given for edge '{edge}'")]
    MissingEndpoint { edge: String, dir: &'static str },

    /// A named node was registered before at a materially different position
    #[error("Position of {dir} node '{node}' mismatches previous positions")]
    PositionConflict { node: String, dir: &'static str },

    /// A node referenced by name only does not exist
    #[error("Edge's '{edge}' {dir}-node '{node}' is not known{}", did_you_mean(.suggestion))]
    UnknownNode {
        edge: String,
        node: String,
        dir: &'static str,
        suggestion: Option<String>,
    },

    /// A synthesized node could not be inserted into the node registry
    #[error("Could not insert {dir}-node at position ({x}, {y})")]
    NodeInsertFailed { dir: &'static str, x: f64, y: f64 },

    /// A lane record addresses a lane the edge does not have
    #[error("Lane index {index} is larger than number of lanes ({num_lanes}) of edge '{edge}'")]
    LaneIndexOutOfRange {
        edge: String,
        index: usize,
        num_lanes: usize,
    },

    /// A split lies outside the edge's geometric length
    #[error("Edge '{edge}' has a split at invalid position {pos}")]
    SplitOutOfRange { edge: String, pos: f64 },

    /// A second split at a position that is already staged
    #[error("Edge '{edge}' has already a split at position {pos}")]
    DuplicateSplit { edge: String, pos: f64 },

    /// An edge id is already taken in the edge registry
    #[error("Duplicate edge occurred. ID='{edge}'")]
    DuplicateEdge { edge: String },

    /// A record references an edge that is not in the registry
    #[error("The edge with id '{edge}' is not known")]
    UnknownEdge { edge: String },

    /// The edge registry refused a split
    #[error("Could not split edge '{edge}': {reason}")]
    SplitFailed { edge: String, reason: String },

    /// Mandatory edge state vanished between edge-open and edge-close
    #[error("An important information is missing in edge '{edge}'")]
    MissingEdgeState { edge: String },

    /// Malformed XML input
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid options or type definitions
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ImportError {
    /// Classify this error according to how far its effect reaches
    pub fn severity(&self) -> Severity {
        match self {
            ImportError::LaneIndexOutOfRange { .. }
            | ImportError::SplitOutOfRange { .. }
            | ImportError::DuplicateSplit { .. }
            | ImportError::SplitFailed { .. } => Severity::SubOperation,
            ImportError::MissingEdgeState { .. }
            | ImportError::Xml(_)
            | ImportError::Io(_)
            | ImportError::Config(_) => Severity::Fatal,
            _ => Severity::Record,
        }
    }

    /// Whether this error must terminate the import
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    pub(crate) fn malformed(
        edge: &str,
        field: &str,
        value: &str,
        reason: impl Into<String>,
    ) -> Self {
        ImportError::MalformedField {
            edge: edge.to_string(),
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for ImportError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ImportError::Xml(err.into())
    }
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{s}'?)"),
        None => String::new(),
    }
}

/// Find the closest known identifier to a misspelled one.
///
/// Blends Jaro-Winkler (70%) with normalized Levenshtein (30%); candidates
/// below 0.8 similarity and exact matches are never suggested.
pub fn suggest_identifier<'a, I>(input: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let input_lower = input.to_lowercase();
    if input_lower.is_empty() {
        return None;
    }

    let min_threshold = 0.8;
    let mut best_match = None;
    let mut best_score = 0.0f64;

    for candidate in candidates {
        let candidate_lower = candidate.to_lowercase();
        if candidate_lower == input_lower {
            return None;
        }

        let score = jaro_winkler(&input_lower, &candidate_lower) * 0.7
            + normalized_levenshtein(&input_lower, &candidate_lower) * 0.3;

        if score > best_score && score >= min_threshold {
            best_score = score;
            best_match = Some(candidate.to_string());
        }
    }

    best_match
}

/// Convenience result type for butterfly-edges operations
pub type Result<T> = std::result::Result<T, ImportError>;
