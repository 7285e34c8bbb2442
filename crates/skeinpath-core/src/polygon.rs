//! Closed loop helpers
//!
//! Loops are slices of points that never restate their first point; the
//! closing edge runs from the last point back to the first.

use crate::geometry::{Point2, EPSILON};
use crate::types::Winding;

/// Shoelace signed area, positive for widdershins loops
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice_area += a.cross(b);
    }
    twice_area * 0.5
}

pub fn winding(points: &[Point2]) -> Winding {
    Winding::from_signed_area(signed_area(points))
}

pub fn is_widdershins(points: &[Point2]) -> bool {
    signed_area(points) > 0.0
}

/// Ray parity containment test; points exactly on an edge may go either way
pub fn is_point_inside_loop(loop_: &[Point2], point: Point2) -> bool {
    let n = loop_.len();
    let mut inside = false;
    for i in 0..n {
        let a = loop_[i];
        let b = loop_[(i + 1) % n];
        if (a.y > point.y) != (b.y > point.y) {
            let x = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if point.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

/// True when every point of `path` is inside `loop_`
pub fn is_path_inside_loop(loop_: &[Point2], path: &[Point2]) -> bool {
    !path.is_empty() && path.iter().all(|&p| is_point_inside_loop(loop_, p))
}

/// True when no point of `path` is inside `loop_`
pub fn is_path_outside_loop(loop_: &[Point2], path: &[Point2]) -> bool {
    !path.is_empty() && !path.iter().any(|&p| is_point_inside_loop(loop_, p))
}

/// Parameter of the projection of `point` onto the segment, clamped to [0, 1]
pub fn segment_parameter(begin: Point2, end: Point2, point: Point2) -> f64 {
    let segment = end - begin;
    let length_squared = segment.length_squared();
    if length_squared <= EPSILON * EPSILON {
        return 0.0;
    }
    ((point - begin).dot(segment) / length_squared).clamp(0.0, 1.0)
}

pub fn nearest_point_on_segment(begin: Point2, end: Point2, point: Point2) -> Point2 {
    begin + (end - begin) * segment_parameter(begin, end, point)
}

/// Index of the loop edge nearest to `point` and its squared distance
///
/// Edge `i` runs from `loop_[i]` to `loop_[i + 1]`, wrapping.
pub fn nearest_segment_index(loop_: &[Point2], point: Point2) -> Option<(usize, f64)> {
    let n = loop_.len();
    let mut nearest: Option<(usize, f64)> = None;
    for i in 0..n {
        let closest = nearest_point_on_segment(loop_[i], loop_[(i + 1) % n], point);
        let distance_squared = closest.distance_squared(point);
        if nearest.is_none_or(|(_, best)| distance_squared < best) {
            nearest = Some((i, distance_squared));
        }
    }
    nearest
}

/// Distance from `point` to the nearest edge of `loop_`
pub fn distance_to_loop(loop_: &[Point2], point: Point2) -> f64 {
    nearest_segment_index(loop_, point)
        .map(|(_, distance_squared)| distance_squared.sqrt())
        .unwrap_or(f64::INFINITY)
}

/// Points from index `begin` walking forward up to but excluding `end`
///
/// When `end <= begin` the walk wraps around, so equal indices yield the
/// whole loop.
pub fn around_loop(begin: usize, end: usize, loop_: &[Point2]) -> Vec<Point2> {
    let n = loop_.len();
    if n == 0 {
        return Vec::new();
    }
    let end = if end <= begin { end + n } else { end };
    (begin..end).map(|i| loop_[i % n]).collect()
}

/// Length of an open path
pub fn path_length(path: &[Point2]) -> f64 {
    path.windows(2).map(|pair| pair[0].distance(pair[1])).sum()
}

/// Perimeter of a closed loop
pub fn loop_length(loop_: &[Point2]) -> f64 {
    match (loop_.first(), loop_.last()) {
        (Some(&first), Some(&last)) => path_length(loop_) + last.distance(first),
        _ => 0.0,
    }
}

/// Larger side of the bounding box
pub fn maximum_span(points: &[Point2]) -> f64 {
    let Some(&first) = points.first() else {
        return 0.0;
    };
    let (mut min, mut max) = (first, first);
    for p in points {
        min = Point2::new(min.x.min(p.x), min.y.min(p.y));
        max = Point2::new(max.x.max(p.x), max.y.max(p.y));
    }
    (max.x - min.x).max(max.y - min.y)
}

/// Rotate every point of a path by a unit plane angle
pub fn rotate_path(path: &[Point2], plane_angle: Point2) -> Vec<Point2> {
    path.iter().map(|p| p.rotate_by(plane_angle)).collect()
}

/// Crossing of a loop edge with a horizontal line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XIntersection {
    /// Index of the loop that owns the crossed edge
    pub index: usize,
    pub x: f64,
}

/// Append the crossings of `loop_` with the line at height `y`
pub fn add_x_intersections(loop_: &[Point2], index: usize, y: f64, out: &mut Vec<XIntersection>) {
    let n = loop_.len();
    for i in 0..n {
        let a = loop_[i];
        let b = loop_[(i + 1) % n];
        if (a.y > y) != (b.y > y) {
            let x = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
            out.push(XIntersection { index, x });
        }
    }
}

/// Drop points closer than `radius` to the previously kept point
///
/// The first and last points always survive; a last point that lands on the
/// previous kept point replaces it.
pub fn away_path(path: &[Point2], radius: f64) -> Vec<Point2> {
    let Some((&last, rest)) = path.split_last() else {
        return Vec::new();
    };
    let mut away: Vec<Point2> = Vec::with_capacity(path.len());
    for &point in rest {
        match away.last() {
            Some(&kept) if kept.distance(point) <= radius => {}
            _ => away.push(point),
        }
    }
    match away.last_mut() {
        Some(kept) if kept.distance(last) <= 0.001 * radius => *kept = last,
        _ => away.push(last),
    }
    away
}

/// Remove interior points that deviate less than `tolerance` from the chord
/// of their neighbours
pub fn drop_collinear(path: &[Point2], tolerance: f64) -> Vec<Point2> {
    if path.len() < 3 {
        return path.to_vec();
    }
    let mut kept = vec![path[0]];
    for i in 1..path.len() - 1 {
        let previous = kept[kept.len() - 1];
        let next = path[i + 1];
        let chord = next - previous;
        let deviation = match chord.normalized() {
            Some(unit) => unit.cross(path[i] - previous).abs(),
            None => path[i].distance(previous),
        };
        if deviation > tolerance {
            kept.push(path[i]);
        }
    }
    kept.push(path[path.len() - 1]);
    kept
}
