//! Planar geometry for edge shapes
//!
//! Positions live in the projected working coordinate space (meters).
//! Shapes are polylines on top of `geo`'s `LineString`.

use geo::{Coord, Distance, Euclidean, Length, LineInterpolatePoint, LineString};

/// A point in the working coordinate space
pub type Position = Coord<f64>;

/// Two positions closer than this are considered the same node position
pub const POSITION_EPS: f64 = 0.1;

/// Lane width plus the gap between lanes, used for lateral shifts
pub const LANE_WIDTH_AND_OFFSET: f64 = 3.3;

/// Sharper bends are not mitered; the offset would run far past the vertex
const MIN_MITER_COS: f64 = 0.1;

pub fn distance(a: Position, b: Position) -> f64 {
    Euclidean::distance(a, b)
}

pub fn almost_same(a: Position, b: Position) -> bool {
    distance(a, b) < POSITION_EPS
}

/// Ordered sequence of positions describing an edge's course
#[derive(Debug, Clone, PartialEq)]
pub struct PositionVector(LineString<f64>);

impl Default for PositionVector {
    fn default() -> Self {
        Self(LineString::new(vec![]))
    }
}

impl PositionVector {
    pub fn new(points: Vec<Position>) -> Self {
        Self(LineString::new(points))
    }

    /// Straight line between two positions
    pub fn between(from: Position, to: Position) -> Self {
        Self::new(vec![from, to])
    }

    pub fn points(&self) -> &[Position] {
        &self.0 .0
    }

    pub fn len(&self) -> usize {
        self.0 .0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0 .0.is_empty()
    }

    pub fn first(&self) -> Option<Position> {
        self.0 .0.first().copied()
    }

    pub fn last(&self) -> Option<Position> {
        self.0 .0.last().copied()
    }

    /// Euclidean length along all segments
    pub fn length(&self) -> f64 {
        self.0.length::<Euclidean>()
    }

    /// Prepend `pos` unless the shape already starts there
    pub fn push_front_no_double(&mut self, pos: Position) {
        if self.first().map_or(true, |first| !almost_same(first, pos)) {
            self.0 .0.insert(0, pos);
        }
    }

    /// Append `pos` unless the shape already ends there
    pub fn push_back_no_double(&mut self, pos: Position) {
        if self.last().map_or(true, |last| !almost_same(last, pos)) {
            self.0 .0.push(pos);
        }
    }

    /// Position at `offset` along the shape, clamped to its ends
    pub fn position_at_offset(&self, offset: f64) -> Option<Position> {
        let first = self.first()?;
        let length = self.length();
        if offset <= 0.0 || length <= 0.0 {
            return Some(first);
        }
        if offset >= length {
            return self.last();
        }
        self.0
            .line_interpolate_point(offset / length)
            .map(|point| point.0)
    }

    /// Cut the shape in two at `offset`.
    ///
    /// Returns `None` unless `offset` lies strictly inside the shape. Both
    /// halves share the cut position.
    pub fn split_at(&self, offset: f64) -> Option<(PositionVector, PositionVector)> {
        let total = self.length();
        if self.len() < 2 || offset <= 0.0 || offset >= total {
            return None;
        }
        let cut = self.position_at_offset(offset)?;

        let points = self.points();
        let mut first = vec![points[0]];
        let mut second = Vec::new();
        let mut seen = 0.0;
        let mut cut_done = false;

        for window in points.windows(2) {
            let (start, end) = (window[0], window[1]);
            let seg_len = distance(start, end);
            if cut_done {
                second.push(end);
                continue;
            }
            if seen + seg_len < offset {
                first.push(end);
                seen += seg_len;
                continue;
            }
            first.push(cut);
            second.push(cut);
            if !almost_same(cut, end) {
                second.push(end);
            }
            cut_done = true;
        }

        if first.len() >= 3 && almost_same(first[first.len() - 2], cut) {
            first.remove(first.len() - 2);
        }

        Some((Self::new(first), Self::new(second)))
    }

    /// Move every point `amount` to the right of the direction of travel
    /// (to the left for negative amounts).
    pub fn move_to_side(&mut self, amount: f64) {
        let points = self.points().to_vec();
        if points.len() < 2 || amount == 0.0 {
            return;
        }

        let normals: Vec<Option<Position>> = points
            .windows(2)
            .map(|w| right_normal(w[0], w[1]))
            .collect();

        let moved = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let before = if i > 0 { normals[i - 1] } else { None };
                let after = normals.get(i).copied().flatten();
                let normal = match (before, after) {
                    (Some(a), Some(b)) => miter(a, b),
                    (Some(n), None) | (None, Some(n)) => n,
                    (None, None) => Coord { x: 0.0, y: 0.0 },
                };
                Coord {
                    x: p.x + normal.x * amount,
                    y: p.y + normal.y * amount,
                }
            })
            .collect();

        self.0 = LineString::new(moved);
    }
}

fn unit(v: Position) -> Option<Position> {
    let len = v.x.hypot(v.y);
    if len == 0.0 {
        return None;
    }
    Some(Coord {
        x: v.x / len,
        y: v.y / len,
    })
}

/// Offset direction at a bend between segments with unit normals `a` and
/// `b`, scaled so both adjacent segments end up `amount` away
fn miter(a: Position, b: Position) -> Position {
    let Some(bisector) = unit(Coord {
        x: a.x + b.x,
        y: a.y + b.y,
    }) else {
        return a;
    };
    let cos_half = bisector.x * a.x + bisector.y * a.y;
    if cos_half < MIN_MITER_COS {
        return bisector;
    }
    Coord {
        x: bisector.x / cos_half,
        y: bisector.y / cos_half,
    }
}

fn right_normal(from: Position, to: Position) -> Option<Position> {
    unit(Coord {
        x: to.y - from.y,
        y: from.x - to.x,
    })
}

/// Projection of raw input coordinates into the working space
pub trait Transformer {
    fn transform(&self, pos: Position) -> Option<Position>;

    /// Transform every point of `shape` in place; `false` if any point failed
    fn transform_shape(&self, shape: &mut PositionVector) -> bool {
        let mut ok = true;
        let points = shape
            .points()
            .iter()
            .map(|p| {
                self.transform(*p).unwrap_or_else(|| {
                    ok = false;
                    *p
                })
            })
            .collect();
        *shape = PositionVector::new(points);
        ok
    }
}

/// Input coordinates are already in the working space
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl Transformer for Identity {
    fn transform(&self, pos: Position) -> Option<Position> {
        Some(pos)
    }
}

/// Shift every input coordinate by a constant offset
#[derive(Debug, Clone, Copy)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

impl Transformer for Offset {
    fn transform(&self, pos: Position) -> Option<Position> {
        if !pos.x.is_finite() || !pos.y.is_finite() {
            return None;
        }
        Some(Coord {
            x: pos.x + self.dx,
            y: pos.y + self.dy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: f64, y: f64) -> Position {
        Coord { x, y }
    }

    fn assert_near(actual: &[Position], expected: &[Position]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!(distance(*a, *e) < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_length_and_offset() {
        let shape = PositionVector::new(vec![pos(0.0, 0.0), pos(30.0, 0.0), pos(30.0, 40.0)]);
        assert!((shape.length() - 70.0).abs() < 1e-9);
        assert_near(&[shape.position_at_offset(50.0).unwrap()], &[pos(30.0, 20.0)]);
        assert_eq!(shape.position_at_offset(-5.0), Some(pos(0.0, 0.0)));
        assert_eq!(shape.position_at_offset(500.0), Some(pos(30.0, 40.0)));
    }

    #[test]
    fn test_split_at_inside_segment() {
        let shape = PositionVector::between(pos(0.0, 0.0), pos(100.0, 0.0));
        let (first, second) = shape.split_at(30.0).unwrap();
        assert_near(first.points(), &[pos(0.0, 0.0), pos(30.0, 0.0)]);
        assert_near(second.points(), &[pos(30.0, 0.0), pos(100.0, 0.0)]);
    }

    #[test]
    fn test_split_at_vertex() {
        let shape = PositionVector::new(vec![pos(0.0, 0.0), pos(30.0, 0.0), pos(30.0, 40.0)]);
        let (first, second) = shape.split_at(30.0).unwrap();
        assert_near(first.points(), &[pos(0.0, 0.0), pos(30.0, 0.0)]);
        assert_near(second.points(), &[pos(30.0, 0.0), pos(30.0, 40.0)]);
        assert!((first.length() + second.length() - shape.length()).abs() < 1e-9);
    }

    #[test]
    fn test_split_outside_is_rejected() {
        let shape = PositionVector::between(pos(0.0, 0.0), pos(10.0, 0.0));
        assert!(shape.split_at(0.0).is_none());
        assert!(shape.split_at(10.0).is_none());
        assert!(shape.split_at(12.0).is_none());
    }

    #[test]
    fn test_move_to_side_goes_right() {
        // Heading east, right is south
        let mut shape = PositionVector::between(pos(0.0, 0.0), pos(10.0, 0.0));
        shape.move_to_side(3.3);
        assert!((shape.points()[0].y + 3.3).abs() < 1e-9);
        assert!((shape.points()[1].y + 3.3).abs() < 1e-9);
        assert!((shape.points()[1].x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_move_to_side_keeps_distance_at_bend() {
        // East then north; the outer corner moves diagonally by amount * sqrt(2)
        let mut shape =
            PositionVector::new(vec![pos(0.0, 0.0), pos(10.0, 0.0), pos(10.0, 10.0)]);
        shape.move_to_side(1.0);
        let corner = shape.points()[1];
        assert!((corner.x - 11.0).abs() < 1e-9);
        assert!((corner.y + 1.0).abs() < 1e-9);
        // Both shifted segments stay parallel at the full distance
        assert!((shape.points()[0].y + 1.0).abs() < 1e-9);
        assert!((shape.points()[2].x - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_shapes() {
        assert_eq!(PositionVector::default().length(), 0.0);
        assert!(PositionVector::default().position_at_offset(1.0).is_none());
        let point = PositionVector::new(vec![pos(3.0, 4.0)]);
        assert_eq!(point.position_at_offset(2.0), Some(pos(3.0, 4.0)));
        assert!((distance(pos(0.0, 0.0), pos(3.0, 4.0)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_push_no_double() {
        let mut shape = PositionVector::new(vec![pos(5.0, 5.0)]);
        shape.push_front_no_double(pos(5.05, 5.0));
        shape.push_back_no_double(pos(9.0, 5.0));
        assert_eq!(shape.points(), &[pos(5.0, 5.0), pos(9.0, 5.0)]);
    }

    #[test]
    fn test_offset_transformer() {
        let offset = Offset { dx: 10.0, dy: -2.0 };
        let mut shape = PositionVector::between(pos(0.0, 0.0), pos(1.0, 1.0));
        assert!(offset.transform_shape(&mut shape));
        assert_eq!(shape.points(), &[pos(10.0, -2.0), pos(11.0, -1.0)]);
        assert!(offset.transform(pos(f64::NAN, 0.0)).is_none());
    }
}
