//! Record model for plain network descriptions
//!
//! A record source delivers a totally ordered sequence of [`RecordEvent`]s.
//! Each opened [`Record`] carries its raw field values; typed accessors decode
//! them and report malformed values as [`ImportError::MalformedField`].

pub mod xml;

pub use xml::XmlRecordReader;

use geo::Coord;

use crate::core::error::{ImportError, Result};
use crate::core::report::WarningKind;
use crate::geom::Position;

/// Record kinds understood by the importer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Edge,
    Lane,
    Split,
    Delete,
    Node,
    /// Any other element; passed through and ignored
    Other(String),
}

impl Tag {
    pub fn from_name(name: &str) -> Self {
        match name {
            "edge" => Tag::Edge,
            "lane" => Tag::Lane,
            "split" => Tag::Split,
            "delete" => Tag::Delete,
            "node" => Tag::Node,
            other => Tag::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Tag::Edge => "edge",
            Tag::Lane => "lane",
            Tag::Split => "split",
            Tag::Delete => "delete",
            Tag::Node => "node",
            Tag::Other(name) => name,
        }
    }
}

/// One opened element with its fields in document order
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    tag: Tag,
    fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordEvent {
    Open(Record),
    Close(Tag),
}

impl Record {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            fields: Vec::new(),
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing a previous value of the same name
    pub fn set(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Raw value of a field
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Mandatory non-empty string field; `ctx` names the edge for messages
    pub fn required_str(&self, ctx: &str, name: &str) -> Result<&str> {
        match self.get(name) {
            None => Err(ImportError::MissingField {
                edge: ctx.to_string(),
                field: name.to_string(),
            }),
            Some("") => Err(ImportError::malformed(ctx, name, "", "must not be empty")),
            Some(value) => Ok(value),
        }
    }

    pub fn f64(&self, ctx: &str, name: &str) -> Result<Option<f64>> {
        self.parse_with(ctx, name, |v| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or("not a number")
        })
    }

    pub fn i64(&self, ctx: &str, name: &str) -> Result<Option<i64>> {
        self.parse_with(ctx, name, |v| v.trim().parse::<i64>().map_err(|_| "not an integer"))
    }

    pub fn bool(&self, ctx: &str, name: &str) -> Result<Option<bool>> {
        self.parse_with(ctx, name, |v| match v.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" | "x" => Ok(true),
            "false" | "0" | "no" | "off" | "-" => Ok(false),
            _ => Err("not a boolean"),
        })
    }

    /// Shape field `"x,y x,y ..."`; a third coordinate is ignored and an
    /// empty value yields an empty shape
    pub fn shape(&self, ctx: &str, name: &str) -> Result<Option<Vec<Position>>> {
        self.parse_with(ctx, name, parse_shape)
    }

    /// Whitespace separated list field
    pub fn list(&self, name: &str) -> Option<Vec<&str>> {
        self.get(name).map(|v| v.split_whitespace().collect())
    }

    fn parse_with<T, E, F>(&self, ctx: &str, name: &str, parse: F) -> Result<Option<T>>
    where
        F: FnOnce(&str) -> std::result::Result<T, E>,
        E: ToString,
    {
        match self.get(name) {
            None => Ok(None),
            Some(value) => parse(value)
                .map(Some)
                .map_err(|reason| ImportError::malformed(ctx, name, value, reason.to_string())),
        }
    }
}

fn parse_shape(value: &str) -> std::result::Result<Vec<Position>, String> {
    value
        .split_whitespace()
        .map(|pair| {
            let coords: Vec<&str> = pair.split(',').collect();
            if coords.len() < 2 || coords.len() > 3 {
                return Err(format!("'{pair}' is not a position"));
            }
            let coord = |raw: &str, axis: &str| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| format!("bad {axis} in '{pair}'"))
            };
            Ok(Coord {
                x: coord(coords[0], "x")?,
                y: coord(coords[1], "y")?,
            })
        })
        .collect()
}

/// Field synonyms evaluated in a fixed order, primary name first.
///
/// Deprecated names carry the warning kind reported (once per session)
/// whenever they appear.
#[derive(Debug, Clone, Copy)]
pub struct FieldAlias {
    pub primary: &'static str,
    pub deprecated: &'static [(&'static str, WarningKind)],
}

impl FieldAlias {
    /// First present name, primary first
    pub fn resolve(&self, record: &Record) -> Option<&'static str> {
        if record.has(self.primary) {
            return Some(self.primary);
        }
        self.deprecated
            .iter()
            .map(|(name, _)| *name)
            .find(|name| record.has(name))
    }

    /// Warning kinds of the deprecated names present in `record`
    pub fn deprecated_uses(&self, record: &Record) -> Vec<WarningKind> {
        self.deprecated
            .iter()
            .filter(|(name, _)| record.has(name))
            .map(|(_, kind)| *kind)
            .collect()
    }
}

pub const NUM_LANES: FieldAlias = FieldAlias {
    primary: "numLanes",
    deprecated: &[("nolanes", WarningKind::DeprecatedNumLanes)],
};

pub const FROM_NODE: FieldAlias = FieldAlias {
    primary: "from",
    deprecated: &[("fromnode", WarningKind::DeprecatedFromTo)],
};

pub const TO_NODE: FieldAlias = FieldAlias {
    primary: "to",
    deprecated: &[("tonode", WarningKind::DeprecatedFromTo)],
};

pub const SPREAD_TYPE: FieldAlias = FieldAlias {
    primary: "spreadType",
    deprecated: &[("spreadFunc", WarningKind::DeprecatedSpreadType)],
};

pub const LANE_INDEX: FieldAlias = FieldAlias {
    primary: "index",
    deprecated: &[("id", WarningKind::DeprecatedLaneId)],
};

/// Deprecated raw coordinate pairs of the from and to nodes
pub const FROM_POSITION: (&str, &str) = ("xfrom", "yfrom");
pub const TO_POSITION: (&str, &str) = ("xto", "yto");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let record = Record::new(Tag::Edge)
            .with("speed", "13.9")
            .with("priority", "-2")
            .with("remove", "yes")
            .with("width", "wide");

        assert_eq!(record.f64("e", "speed").unwrap(), Some(13.9));
        assert_eq!(record.i64("e", "priority").unwrap(), Some(-2));
        assert_eq!(record.bool("e", "remove").unwrap(), Some(true));
        assert_eq!(record.f64("e", "length").unwrap(), None);

        let err = record.f64("e", "width").unwrap_err();
        assert!(matches!(err, ImportError::MalformedField { ref field, .. } if field == "width"));
    }

    #[test]
    fn test_required_str() {
        let record = Record::new(Tag::Edge).with("id", "");
        assert!(matches!(
            record.required_str("", "id"),
            Err(ImportError::MalformedField { .. })
        ));
        assert!(matches!(
            record.required_str("", "type"),
            Err(ImportError::MissingField { .. })
        ));
    }

    #[test]
    fn test_shape_field() {
        let record = Record::new(Tag::Edge)
            .with("shape", "0,0 10.5,2 20,4,1")
            .with("bad", "0,0 1")
            .with("empty", "");

        let shape = record.shape("e", "shape").unwrap().unwrap();
        assert_eq!(shape.len(), 3);
        assert_eq!(shape[1], Coord { x: 10.5, y: 2.0 });
        assert!(record.shape("e", "bad").is_err());
        assert_eq!(record.shape("e", "empty").unwrap(), Some(vec![]));
    }

    #[test]
    fn test_shape_rejects_non_finite_coordinates() {
        for value in ["0,0 nan,5 100,0", "0,0 50,inf", "-infinity,0 1,1", "0,0 NaN,0,1"] {
            let record = Record::new(Tag::Edge).with("shape", value);
            let err = record.shape("e", "shape").unwrap_err();
            assert!(
                matches!(err, ImportError::MalformedField { ref field, .. } if field == "shape"),
                "{value}"
            );
        }
    }

    #[test]
    fn test_alias_prefers_primary() {
        let record = Record::new(Tag::Edge)
            .with("nolanes", "1")
            .with("numLanes", "3");
        assert_eq!(NUM_LANES.resolve(&record), Some("numLanes"));
        assert_eq!(
            NUM_LANES.deprecated_uses(&record),
            vec![WarningKind::DeprecatedNumLanes]
        );

        let old_only = Record::new(Tag::Lane).with("id", "0");
        assert_eq!(LANE_INDEX.resolve(&old_only), Some("id"));
        assert_eq!(LANE_INDEX.resolve(&Record::new(Tag::Lane)), None);
    }

    #[test]
    fn test_tag_names() {
        assert_eq!(Tag::from_name("split"), Tag::Split);
        assert_eq!(Tag::from_name("roundabout"), Tag::Other("roundabout".to_string()));
        assert_eq!(Tag::Delete.name(), "delete");
    }
}
