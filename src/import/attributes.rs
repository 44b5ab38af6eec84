//! Effective attributes of an edge record
//!
//! Attributes are resolved in tiers: system defaults, then the named type,
//! then the previous state of the edge when updating, then the fields given
//! explicitly in the record.

use crate::core::config::ImportOptions;
use crate::core::error::{suggest_identifier, ImportError, Result};
use crate::core::report::{Diagnostics, WarningKind};
use crate::geom::{Position, PositionVector, Transformer};
use crate::input::{Record, NUM_LANES, SPREAD_TYPE};
use crate::network::{Edge, EdgeType, LaneSpread, TypeRegistry};
use crate::vclass::{parse_permissions, VehicleClasses};

const KMH_PER_MS: f64 = 3.6;

/// Attribute bundle of an edge before it is materialized
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeAttributes {
    pub type_id: String,
    pub speed: f64,
    pub num_lanes: usize,
    pub priority: i32,
    pub permissions: VehicleClasses,
    pub width: Option<f64>,
    pub end_offset: Option<f64>,
    pub street_name: String,
    pub spread: LaneSpread,
    pub shape: PositionVector,
    pub loaded_length: Option<f64>,
}

impl EdgeAttributes {
    /// System defaults, taken from the empty type
    pub fn defaults(types: &TypeRegistry) -> Self {
        Self {
            type_id: String::new(),
            speed: types.speed(""),
            num_lanes: types.num_lanes(""),
            priority: types.priority(""),
            permissions: types.permissions(""),
            width: types.width(""),
            end_offset: None,
            street_name: String::new(),
            spread: LaneSpread::Right,
            shape: PositionVector::default(),
            loaded_length: None,
        }
    }

    fn apply_type(&mut self, type_id: &str, edge_type: &EdgeType) {
        self.type_id = type_id.to_string();
        self.speed = edge_type.speed;
        self.priority = edge_type.priority;
        self.num_lanes = edge_type.num_lanes;
        self.permissions = edge_type.permissions;
        self.width = edge_type.width;
    }

    /// Carry forward the current state of an edge being updated
    fn carry_forward(&mut self, edge: &Edge, default_geometry: bool) {
        self.speed = edge.speed;
        self.priority = edge.priority;
        self.num_lanes = edge.num_lanes();
        self.type_id = edge.type_id.clone();
        self.permissions = edge.permissions();
        if !default_geometry {
            self.shape = edge.geometry.clone();
        }
        self.width = edge.width;
        self.end_offset = edge.end_offset;
        self.spread = edge.spread;
        if edge.has_loaded_length() {
            self.loaded_length = edge.loaded_length;
        }
        self.street_name = edge.street_name.clone();
    }

    /// Drop the carried shape; the endpoints define a new baseline
    pub fn reset_shape(&mut self) {
        self.shape = PositionVector::default();
    }

    /// Materialize into an edge between `from` and `to`.
    ///
    /// Lanes are always built fresh; per-lane overrides of an edge being
    /// updated do not carry over.
    pub fn into_edge(
        self,
        id: &str,
        (from, from_pos): (&str, Position),
        (to, to_pos): (&str, Position),
        keep_shape: bool,
    ) -> Edge {
        let geometry = edge_geometry(&self.shape, from_pos, to_pos, keep_shape);
        let mut edge = Edge::new(id, from, to, self.num_lanes);
        edge.type_id = self.type_id;
        edge.speed = self.speed;
        edge.priority = self.priority;
        edge.width = self.width;
        edge.end_offset = self.end_offset;
        edge.street_name = self.street_name;
        edge.spread = self.spread;
        edge.geometry = geometry;
        edge.loaded_length = self.loaded_length;
        edge.set_permissions(self.permissions);
        edge
    }
}

/// Geometry from an optional explicit shape and the endpoint positions
pub fn edge_geometry(
    shape: &PositionVector,
    from: Position,
    to: Position,
    keep_shape: bool,
) -> PositionVector {
    if shape.is_empty() {
        return PositionVector::between(from, to);
    }
    let mut geometry = shape.clone();
    if !keep_shape {
        geometry.push_front_no_double(from);
        geometry.push_back_no_double(to);
    }
    geometry
}

pub struct AttributeResolver<'a> {
    types: &'a TypeRegistry,
    options: &'a ImportOptions,
    transformer: &'a dyn Transformer,
}

impl<'a> AttributeResolver<'a> {
    pub fn new(
        types: &'a TypeRegistry,
        options: &'a ImportOptions,
        transformer: &'a dyn Transformer,
    ) -> Self {
        Self {
            types,
            options,
            transformer,
        }
    }

    /// Resolve every attribute except the endpoints and the explicit shape.
    ///
    /// `existing` is the edge being updated together with whether its
    /// geometry is just the line between its endpoints.
    pub fn resolve(
        &self,
        id: &str,
        record: &Record,
        existing: Option<(&Edge, bool)>,
        diag: &mut Diagnostics<'_>,
    ) -> Result<EdgeAttributes> {
        let mut attrs = EdgeAttributes::defaults(self.types);

        if let Some(type_id) = record.get("type") {
            let edge_type = self.types.get(type_id).ok_or_else(|| ImportError::UnknownType {
                edge: id.to_string(),
                type_id: type_id.to_string(),
                suggestion: suggest_identifier(type_id, self.types.ids()),
            })?;
            attrs.apply_type(type_id, edge_type);
        }

        if let Some((edge, default_geometry)) = existing {
            attrs.carry_forward(edge, default_geometry);
        }

        if let Some(speed) = record.f64(id, "speed")? {
            attrs.speed = self.convert_speed(speed, diag);
        }

        for kind in NUM_LANES.deprecated_uses(record) {
            diag.deprecated(kind);
        }
        if let Some(field) = NUM_LANES.resolve(record) {
            attrs.num_lanes = positive_count(id, field, record)?;
        }

        if let Some(priority) = record.i64(id, "priority")? {
            attrs.priority = i32::try_from(priority).map_err(|_| {
                ImportError::malformed(id, "priority", &priority.to_string(), "out of range")
            })?;
        }

        if let Some(width) = record.f64(id, "width")? {
            attrs.width = Some(width);
        }
        if let Some(end_offset) = record.f64(id, "endOffset")? {
            attrs.end_offset = Some(end_offset);
        }
        if let Some(name) = record.get("name") {
            attrs.street_name = name.to_string();
        }

        // Allow/disallow replace whatever permissions were resolved so far
        if record.has("allow") || record.has("disallow") {
            attrs.permissions = permissions_of(
                id,
                record.get("allow"),
                record.get("disallow"),
                diag,
            );
        }

        attrs.spread = self.lane_spread(id, record, attrs.spread, diag);

        if let Some(length) = record.f64(id, "length")? {
            attrs.loaded_length = Some(length);
        }

        Ok(attrs)
    }

    /// Explicit shape of the record, or `carried` when none is given
    pub fn shape(
        &self,
        id: &str,
        record: &Record,
        carried: PositionVector,
        diag: &mut Diagnostics<'_>,
    ) -> Result<PositionVector> {
        let Some(points) = record.shape(id, "shape")? else {
            return Ok(carried);
        };
        let mut shape = PositionVector::new(points);
        if !self.transformer.transform_shape(&mut shape) {
            diag.error(&format!("Unable to project coordinates for edge '{id}'."));
        }
        Ok(shape)
    }

    /// Explicit speeds may be given in km/h
    pub fn convert_speed(&self, speed: f64, diag: &mut Diagnostics<'_>) -> f64 {
        convert_speed(self.options, speed, diag)
    }

    fn lane_spread(
        &self,
        id: &str,
        record: &Record,
        current: LaneSpread,
        diag: &mut Diagnostics<'_>,
    ) -> LaneSpread {
        for kind in SPREAD_TYPE.deprecated_uses(record) {
            diag.deprecated(kind);
        }
        let Some(value) = SPREAD_TYPE.resolve(record).and_then(|f| record.get(f)) else {
            return current;
        };
        match LaneSpread::from_name(value) {
            Some(spread) => spread,
            None => {
                diag.warn(&format!(
                    "Ignoring unknown spreadType '{value}' for edge '{id}'."
                ));
                current
            }
        }
    }
}

pub(crate) fn convert_speed(options: &ImportOptions, speed: f64, diag: &mut Diagnostics<'_>) -> f64 {
    if !options.speed_in_kmh {
        return speed;
    }
    diag.warn_once(
        WarningKind::SpeedConversion,
        WarningKind::SpeedConversion.advisory(),
    );
    speed / KMH_PER_MS
}

/// Permission set from allow/disallow lists, reporting unknown class names
pub(crate) fn permissions_of(
    id: &str,
    allow: Option<&str>,
    disallow: Option<&str>,
    diag: &mut Diagnostics<'_>,
) -> VehicleClasses {
    let parsed = parse_permissions(allow, disallow);
    for name in &parsed.unknown {
        diag.error(&format!(
            "Unknown vehicle class '{name}' in edge '{id}' is ignored."
        ));
    }
    if parsed.ignored_disallow {
        diag.warn(&format!(
            "Edge '{id}' gives both allowed and disallowed classes; disallow is ignored."
        ));
    }
    parsed.classes
}

fn positive_count(id: &str, field: &str, record: &Record) -> Result<usize> {
    let value = record.i64(id, field)?.unwrap_or_default();
    usize::try_from(value)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ImportError::malformed(id, field, &value.to_string(), "must be positive"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TypeDef;
    use crate::core::report::CollectingReporter;
    use crate::geom::Identity;
    use crate::input::Tag;
    use geo::Coord;

    fn registry() -> TypeRegistry {
        let mut options = ImportOptions::default();
        options.types.insert(
            "residential".to_string(),
            TypeDef {
                speed: Some(8.0),
                priority: Some(3),
                num_lanes: Some(2),
                allow: Some("passenger bicycle".to_string()),
                width: Some(3.0),
                ..TypeDef::default()
            },
        );
        TypeRegistry::from_options(&options).unwrap()
    }

    fn resolve(
        record: &Record,
        existing: Option<(&Edge, bool)>,
        options: &ImportOptions,
        reporter: &mut CollectingReporter,
    ) -> Result<EdgeAttributes> {
        let types = registry();
        let resolver = AttributeResolver::new(&types, options, &Identity);
        let mut diag = Diagnostics::new(reporter);
        resolver.resolve("e", record, existing, &mut diag)
    }

    #[test]
    fn test_type_then_explicit() {
        let mut reporter = CollectingReporter::new();
        let record = Record::new(Tag::Edge)
            .with("type", "residential")
            .with("priority", "7");
        let attrs = resolve(&record, None, &ImportOptions::default(), &mut reporter).unwrap();

        assert_eq!(attrs.type_id, "residential");
        assert_eq!(attrs.speed, 8.0);
        assert_eq!(attrs.num_lanes, 2);
        assert_eq!(attrs.priority, 7);
        assert_eq!(attrs.width, Some(3.0));
        assert_eq!(
            attrs.permissions,
            VehicleClasses::PASSENGER | VehicleClasses::BICYCLE
        );
    }

    #[test]
    fn test_unknown_type_suggests_close_match() {
        let mut reporter = CollectingReporter::new();
        let record = Record::new(Tag::Edge).with("type", "residental");
        let err = resolve(&record, None, &ImportOptions::default(), &mut reporter).unwrap_err();
        match err {
            ImportError::UnknownType { suggestion, .. } => {
                assert_eq!(suggestion.as_deref(), Some("residential"))
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_existing_edge_overrides_type() {
        let mut reporter = CollectingReporter::new();
        let mut previous = Edge::new("e", "a", "b", 3);
        previous.speed = 20.0;
        previous.street_name = "Main".to_string();
        previous.loaded_length = Some(42.0);

        let record = Record::new(Tag::Edge).with("type", "residential");
        let attrs = resolve(
            &record,
            Some((&previous, true)),
            &ImportOptions::default(),
            &mut reporter,
        )
        .unwrap();

        assert_eq!(attrs.speed, 20.0);
        assert_eq!(attrs.num_lanes, 3);
        assert_eq!(attrs.street_name, "Main");
        assert_eq!(attrs.loaded_length, Some(42.0));
        // The previous edge had no type; it is carried forward as well
        assert_eq!(attrs.type_id, "");
    }

    #[test]
    fn test_allow_replaces_type_permissions() {
        let mut reporter = CollectingReporter::new();
        let record = Record::new(Tag::Edge)
            .with("type", "residential")
            .with("disallow", "bicycle");
        let attrs = resolve(&record, None, &ImportOptions::default(), &mut reporter).unwrap();

        // Computed from scratch, not intersected with the type's set
        assert!(attrs.permissions.contains(VehicleClasses::BUS));
        assert!(!attrs.permissions.contains(VehicleClasses::BICYCLE));
    }

    #[test]
    fn test_speed_in_kmh_warns_once() {
        let mut reporter = CollectingReporter::new();
        let options = ImportOptions {
            speed_in_kmh: true,
            ..ImportOptions::default()
        };
        let types = registry();
        let resolver = AttributeResolver::new(&types, &options, &Identity);
        let mut diag = Diagnostics::new(&mut reporter);
        let record = Record::new(Tag::Edge).with("speed", "36");

        let first = resolver.resolve("e", &record, None, &mut diag).unwrap();
        let second = resolver.resolve("f", &record, None, &mut diag).unwrap();
        drop(diag);

        assert!((first.speed - 10.0).abs() < 1e-9);
        assert!((second.speed - 10.0).abs() < 1e-9);
        assert_eq!(reporter.warning_count(), 1);
    }

    #[test]
    fn test_deprecated_lane_count_and_spread() {
        let mut reporter = CollectingReporter::new();
        let record = Record::new(Tag::Edge)
            .with("nolanes", "4")
            .with("spreadFunc", "center");
        let attrs = resolve(&record, None, &ImportOptions::default(), &mut reporter).unwrap();
        assert_eq!(attrs.num_lanes, 4);
        assert_eq!(attrs.spread, LaneSpread::Center);
        assert_eq!(reporter.warning_count(), 2);
    }

    #[test]
    fn test_malformed_fields_abort() {
        let mut reporter = CollectingReporter::new();
        for (field, value) in [("speed", "fast"), ("numLanes", "0"), ("priority", "high")] {
            let record = Record::new(Tag::Edge).with(field, value);
            let err = resolve(&record, None, &ImportOptions::default(), &mut reporter).unwrap_err();
            assert!(matches!(err, ImportError::MalformedField { .. }), "{field}");
        }
    }

    #[test]
    fn test_unknown_spread_keeps_previous() {
        let mut reporter = CollectingReporter::new();
        let record = Record::new(Tag::Edge).with("spreadType", "diagonal");
        let attrs = resolve(&record, None, &ImportOptions::default(), &mut reporter).unwrap();
        assert_eq!(attrs.spread, LaneSpread::Right);
        assert_eq!(reporter.warning_count(), 1);
    }

    #[test]
    fn test_edge_geometry_attaches_endpoints() {
        let from = Coord { x: 0.0, y: 0.0 };
        let to = Coord { x: 10.0, y: 0.0 };
        let shape = PositionVector::new(vec![Coord { x: 5.0, y: 2.0 }]);

        assert_eq!(edge_geometry(&PositionVector::default(), from, to, false).len(), 2);
        assert_eq!(
            edge_geometry(&shape, from, to, false).points(),
            &[from, Coord { x: 5.0, y: 2.0 }, to]
        );
        assert_eq!(edge_geometry(&shape, from, to, true).len(), 1);
    }
}
