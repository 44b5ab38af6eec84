//! Edge type registry
//!
//! A type is a named bundle of defaults assignable to edges. The empty type
//! id always resolves to the system defaults.

use std::collections::BTreeMap;

use crate::core::config::{ImportOptions, TypeDef};
use crate::core::error::{ImportError, Result};
use crate::vclass::{parse_permissions, VehicleClasses};

pub const DEFAULT_SPEED: f64 = 13.89;
pub const DEFAULT_PRIORITY: i32 = -1;
pub const DEFAULT_NUM_LANES: usize = 1;

/// Defaults carried by a type
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeType {
    pub speed: f64,
    pub priority: i32,
    pub num_lanes: usize,
    pub permissions: VehicleClasses,
    pub width: Option<f64>,
}

impl Default for EdgeType {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            priority: DEFAULT_PRIORITY,
            num_lanes: DEFAULT_NUM_LANES,
            permissions: VehicleClasses::all(),
            width: None,
        }
    }
}

impl EdgeType {
    /// Complete a partial definition from `base`
    pub fn from_def(id: &str, def: &TypeDef, base: &EdgeType) -> Result<Self> {
        let permissions = if def.allow.is_some() || def.disallow.is_some() {
            let parsed = parse_permissions(def.allow.as_deref(), def.disallow.as_deref());
            if !parsed.unknown.is_empty() {
                return Err(ImportError::Config(format!(
                    "type '{id}' uses unknown vehicle classes: {}",
                    parsed.unknown.join(", ")
                )));
            }
            parsed.classes
        } else {
            base.permissions
        };

        let num_lanes = def.num_lanes.unwrap_or(base.num_lanes);
        if num_lanes == 0 {
            return Err(ImportError::Config(format!(
                "type '{id}' must have at least one lane"
            )));
        }

        Ok(Self {
            speed: def.speed.unwrap_or(base.speed),
            priority: def.priority.unwrap_or(base.priority),
            num_lanes,
            permissions,
            width: def.width.or(base.width),
        })
    }
}

/// Type definitions keyed by id
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    defaults: EdgeType,
    types: BTreeMap<String, EdgeType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: EdgeType) -> Self {
        Self {
            defaults,
            types: BTreeMap::new(),
        }
    }

    /// Build the registry from the `[defaults]` and `[types.*]` tables
    pub fn from_options(options: &ImportOptions) -> Result<Self> {
        let defaults = EdgeType::from_def("", &options.defaults, &EdgeType::default())?;
        let mut registry = Self::with_defaults(defaults);
        for (id, def) in &options.types {
            let edge_type = EdgeType::from_def(id, def, &registry.defaults)?;
            registry.insert(id.clone(), edge_type);
        }
        Ok(registry)
    }

    /// Add or replace a type; the empty id replaces the system defaults
    pub fn insert(&mut self, id: impl Into<String>, edge_type: EdgeType) {
        let id = id.into();
        if id.is_empty() {
            self.defaults = edge_type;
        } else {
            self.types.insert(id, edge_type);
        }
    }

    pub fn knows(&self, id: &str) -> bool {
        id.is_empty() || self.types.contains_key(id)
    }

    /// Type for `id`; the empty id yields the system defaults
    pub fn get(&self, id: &str) -> Option<&EdgeType> {
        if id.is_empty() {
            return Some(&self.defaults);
        }
        self.types.get(id)
    }

    fn get_or_defaults(&self, id: &str) -> &EdgeType {
        self.get(id).unwrap_or(&self.defaults)
    }

    pub fn speed(&self, id: &str) -> f64 {
        self.get_or_defaults(id).speed
    }

    pub fn priority(&self, id: &str) -> i32 {
        self.get_or_defaults(id).priority
    }

    pub fn num_lanes(&self, id: &str) -> usize {
        self.get_or_defaults(id).num_lanes
    }

    pub fn permissions(&self, id: &str) -> VehicleClasses {
        self.get_or_defaults(id).permissions
    }

    pub fn width(&self, id: &str) -> Option<f64> {
        self.get_or_defaults(id).width
    }

    /// Ids of all named types
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
