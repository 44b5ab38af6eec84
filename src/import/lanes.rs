//! Per-lane overrides of the open edge

use crate::core::config::ImportOptions;
use crate::core::error::{ImportError, Result};
use crate::core::report::Diagnostics;
use crate::input::{Record, LANE_INDEX};
use crate::network::Edge;
use crate::vclass::{parse_classes, VehicleClasses};

use super::attributes::{convert_speed, permissions_of};

/// Overrides parsed from a lane record; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaneOverrides {
    pub permissions: Option<VehicleClasses>,
    pub preferred: Option<VehicleClasses>,
    pub width: Option<f64>,
    pub end_offset: Option<f64>,
    pub speed: Option<f64>,
}

pub struct LaneConfigurator<'a> {
    options: &'a ImportOptions,
}

impl<'a> LaneConfigurator<'a> {
    pub fn new(options: &'a ImportOptions) -> Self {
        Self { options }
    }

    /// Apply a lane record to `edge`.
    ///
    /// Every field is parsed before anything is written, so a failing record
    /// leaves the edge unmodified.
    pub fn apply(&self, edge: &mut Edge, record: &Record, diag: &mut Diagnostics<'_>) -> Result<()> {
        let index = self.lane_index(&edge.id, record, diag)?;
        let overrides = self.overrides(&edge.id, record, diag)?;
        apply_overrides(edge, index, overrides)
    }

    fn lane_index(&self, id: &str, record: &Record, diag: &mut Diagnostics<'_>) -> Result<usize> {
        for kind in LANE_INDEX.deprecated_uses(record) {
            diag.deprecated(kind);
        }
        let field = LANE_INDEX.resolve(record).ok_or_else(|| ImportError::MissingField {
            edge: id.to_string(),
            field: LANE_INDEX.primary.to_string(),
        })?;
        let value = record.i64(id, field)?.unwrap_or_default();
        usize::try_from(value)
            .map_err(|_| ImportError::malformed(id, field, &value.to_string(), "must not be negative"))
    }

    fn overrides(
        &self,
        id: &str,
        record: &Record,
        diag: &mut Diagnostics<'_>,
    ) -> Result<LaneOverrides> {
        let width = record.f64(id, "width")?;
        let end_offset = record.f64(id, "endOffset")?;
        let speed = record.f64(id, "speed")?;

        let permissions = (record.has("allow") || record.has("disallow"))
            .then(|| permissions_of(id, record.get("allow"), record.get("disallow"), diag));
        let preferred = record.get("prefer").map(|prefer| {
            let parsed = parse_classes(prefer);
            for name in &parsed.unknown {
                diag.error(&format!(
                    "Unknown vehicle class '{name}' in edge '{id}' is ignored."
                ));
            }
            parsed.classes
        });

        Ok(LaneOverrides {
            permissions,
            preferred,
            width,
            end_offset,
            speed: speed.map(|s| convert_speed(self.options, s, diag)),
        })
    }
}

/// Write `overrides` to lane `index`, rejecting lanes the edge does not have
pub fn apply_overrides(edge: &mut Edge, index: usize, overrides: LaneOverrides) -> Result<()> {
    let num_lanes = edge.num_lanes();
    let edge_id = edge.id.clone();
    let lane = edge
        .lane_mut(index)
        .ok_or(ImportError::LaneIndexOutOfRange {
            edge: edge_id,
            index,
            num_lanes,
        })?;

    if let Some(permissions) = overrides.permissions {
        lane.permissions = permissions;
    }
    if let Some(preferred) = overrides.preferred {
        lane.preferred = preferred;
    }
    if let Some(width) = overrides.width {
        lane.width = Some(width);
    }
    if let Some(end_offset) = overrides.end_offset {
        lane.end_offset = Some(end_offset);
    }
    if let Some(speed) = overrides.speed {
        lane.speed = Some(speed);
    }
    Ok(())
}
