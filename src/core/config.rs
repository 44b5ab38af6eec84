//! Import options and type definitions
//!
//! Options are read from a TOML file and may be overridden from the command
//! line. Missing keys take their defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ImportError, Result};
use crate::geom::{Identity, Offset, Transformer};

/// Options recognized by an import session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ImportOptions {
    /// Explicit speeds are given in km/h
    pub speed_in_kmh: bool,
    pub plain: PlainOptions,
    pub remove_edges: RemoveEdgesOptions,
    /// Constant shift applied to every input coordinate
    pub offset: Option<OffsetOptions>,
    /// Values used for the empty type id
    pub defaults: TypeDef,
    pub types: BTreeMap<String, TypeDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PlainOptions {
    /// Keep explicit shapes as given instead of attaching the node positions
    pub keep_edge_shape: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoveEdgesOptions {
    /// Edge ids removed on purpose; records referencing them are not errors
    pub explicit: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetOptions {
    pub x: f64,
    pub y: f64,
}

/// Partially specified type defaults; missing values fall back to the
/// system defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypeDef {
    pub speed: Option<f64>,
    pub priority: Option<i32>,
    pub num_lanes: Option<usize>,
    pub allow: Option<String>,
    pub disallow: Option<String>,
    pub width: Option<f64>,
}

impl ImportOptions {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content).map_err(|e| ImportError::Config(e.to_string()))
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| ImportError::Config(format!("{}: {e}", path.display())))
    }

    /// Whether `id` was removed on purpose
    pub fn is_explicitly_removed(&self, id: &str) -> bool {
        self.remove_edges.explicit.iter().any(|e| e == id)
    }

    /// Coordinate transformer for raw input positions
    pub fn transformer(&self) -> Box<dyn Transformer> {
        match self.offset {
            Some(OffsetOptions { x, y }) if x != 0.0 || y != 0.0 => {
                Box::new(Offset { dx: x, dy: y })
            }
            _ => Box::new(Identity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let options = ImportOptions::from_toml_str("").unwrap();
        assert_eq!(options, ImportOptions::default());
        assert!(!options.speed_in_kmh);
        assert!(!options.plain.keep_edge_shape);
        assert!(options.types.is_empty());
    }

    #[test]
    fn test_full_document() {
        let options = ImportOptions::from_toml_str(
            r#"
speed-in-kmh = true

[plain]
keep-edge-shape = true

[remove-edges]
explicit = ["gone", "ramp"]

[offset]
x = 100.0
y = -50.0

[defaults]
speed = 10.0

[types.residential]
speed = 8.33
priority = 3
numLanes = 1
allow = "passenger bicycle"
width = 3.0
"#,
        )
        .unwrap();

        assert!(options.speed_in_kmh);
        assert!(options.plain.keep_edge_shape);
        assert!(options.is_explicitly_removed("ramp"));
        assert!(!options.is_explicitly_removed("main"));
        assert_eq!(options.defaults.speed, Some(10.0));

        let residential = &options.types["residential"];
        assert_eq!(residential.priority, Some(3));
        assert_eq!(residential.num_lanes, Some(1));
        assert_eq!(residential.allow.as_deref(), Some("passenger bicycle"));

        let moved = options
            .transformer()
            .transform(geo::Coord { x: 1.0, y: 1.0 })
            .unwrap();
        assert_eq!(moved, geo::Coord { x: 101.0, y: -49.0 });
    }

    #[test]
    fn test_invalid_document_is_config_error() {
        let err = ImportOptions::from_toml_str("speed-in-kmh = \"maybe\"").unwrap_err();
        assert!(matches!(err, ImportError::Config(_)));
    }
}
