//! Material-side loop offsets ("corridors")
//!
//! Offsets are computed by `cavalier_contours`, which joins offset edges
//! around each vertex with a round arc. The arcs come back as bulges and are
//! flattened into chords here. A loop that pinches narrower than twice the
//! offset splits into one piece per lobe.
//!
//! A corridor is the "center" loop at the full inset distance pushed back
//! toward the boundary by half the inset, so features narrower than the
//! inset produce no corridor at all.

use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use skeinpath_core::{polygon, GeometryError, LoopId, Point2, Winding, EPSILON};
use std::f64::consts::PI;
use std::panic;

use crate::layer_store::LayerPolygonStore;

/// Largest angle covered by one chord of a flattened arc
const ARC_JOIN_STEP: f64 = PI / 12.0;

/// Bulges below this are straight segments
const MINIMUM_BULGE: f64 = 1e-9;

/// A travel rail derived from a boundary loop
#[derive(Debug, Clone, PartialEq)]
pub struct Corridor {
    pub points: Vec<Point2>,
    /// Boundary loop it was derived from
    pub source: LoopId,
    pub winding: Winding,
}

/// Vertices with duplicates and straight-through points removed
fn distinct_vertices(loop_: &[Point2]) -> Vec<Point2> {
    let mut points: Vec<Point2> = Vec::with_capacity(loop_.len());
    for &p in loop_ {
        if points.last().is_none_or(|last| last.distance(p) > EPSILON) {
            points.push(p);
        }
    }
    while points.len() > 1 && points[0].distance(points[points.len() - 1]) <= EPSILON {
        points.pop();
    }

    let mut changed = true;
    while changed && points.len() >= 3 {
        changed = false;
        let n = points.len();
        for i in 0..n {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            let a = points[i] - prev;
            let b = next - points[i];
            if a.cross(b).abs() <= EPSILON * a.length() * b.length() && a.dot(b) > 0.0 {
                points.remove(i);
                changed = true;
                break;
            }
        }
    }
    points
}

fn to_polyline(points: &[Point2]) -> Polyline<f64> {
    let mut polyline = Polyline::new();
    for p in points {
        polyline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
    }
    polyline.set_is_closed(true);
    polyline
}

/// Closed polyline as points, with bulge arcs replaced by chords
fn flatten(polyline: &Polyline<f64>) -> Vec<Point2> {
    let count = polyline.vertex_count();
    let mut points = Vec::with_capacity(count);
    for i in 0..count {
        let v1 = polyline.at(i);
        let v2 = polyline.at((i + 1) % count);
        let start = Point2::new(v1.x, v1.y);
        let end = Point2::new(v2.x, v2.y);
        points.push(start);

        let chord = end - start;
        if v1.bulge.abs() <= MINIMUM_BULGE || chord.length() <= EPSILON {
            continue;
        }
        let sweep = 4.0 * v1.bulge.atan();
        // signed distance from the chord midpoint to the center, left positive
        let apothem = 0.5 * chord.length() / (0.5 * sweep).tan();
        let center = (start + end) * 0.5 + chord.left_normal() * (apothem / chord.length());
        let steps = (sweep.abs() / ARC_JOIN_STEP).ceil().max(1.0) as usize;
        let radius = start - center;
        for step in 1..steps {
            let rotation = Point2::from_angle(sweep * step as f64 / steps as f64);
            points.push(center + radius.rotate_by(rotation));
        }
    }
    points
}

/// Offset `loop_` by `distance`, positive toward the material side (left of
/// travel), negative away from it
///
/// Returns one piece per lobe that keeps the winding of `loop_`.
pub fn offset_loop(loop_: &[Point2], distance: f64) -> Result<Vec<Vec<Point2>>, GeometryError> {
    let source = distinct_vertices(loop_);
    if source.len() < 3 {
        return Err(GeometryError::DegenerateLoop {
            points: source.len(),
        });
    }
    if distance.abs() <= EPSILON {
        return Ok(vec![source]);
    }

    let source_area = polygon::signed_area(&source);
    let polyline = to_polyline(&source);
    let offsets = match panic::catch_unwind(panic::AssertUnwindSafe(|| {
        polyline.parallel_offset(distance)
    })) {
        Ok(offsets) => offsets,
        Err(_) => {
            tracing::warn!(
                "Panic during parallel offset of a {}-point loop by {}",
                source.len(),
                distance
            );
            return Ok(Vec::new());
        }
    };

    Ok(offsets
        .iter()
        .map(flatten)
        .filter(|piece| {
            let area = polygon::signed_area(piece);
            piece.len() >= 3 && area.abs() > EPSILON && area.signum() == source_area.signum()
        })
        .collect())
}

/// Corridor and source winding agree and the corridor is not a sliver
fn is_large_same_direction(corridor: &[Point2], center: &[Point2], fill_inset: f64) -> bool {
    polygon::is_widdershins(corridor) == polygon::is_widdershins(center)
        && polygon::maximum_span(corridor) > fill_inset
}

/// Corridor lies on the material side: inside an outer loop, outside a hole
fn is_on_material_side(source: &[Point2], corridor: &[Point2]) -> bool {
    if polygon::is_widdershins(source) {
        polygon::is_path_inside_loop(source, corridor)
    } else {
        polygon::is_path_outside_loop(source, corridor)
    }
}

/// Corridors for one boundary loop at the given layer inset
pub fn corridors_for_loop(
    source: LoopId,
    loop_: &[Point2],
    fill_inset: f64,
) -> Result<Vec<Corridor>, GeometryError> {
    let half_fill_inset = 0.5 * fill_inset;
    let source_widdershins = polygon::is_widdershins(loop_);
    let mut corridors = Vec::new();

    for center in offset_loop(loop_, fill_inset)? {
        if polygon::is_widdershins(&center) != source_widdershins {
            continue;
        }
        for inset in offset_loop(&center, -half_fill_inset)? {
            if is_large_same_direction(&inset, &center, fill_inset) && is_on_material_side(loop_, &inset) {
                let winding = polygon::winding(&inset);
                corridors.push(Corridor {
                    points: inset,
                    source,
                    winding,
                });
            }
        }
    }
    Ok(corridors)
}

/// Corridors of one layer, computed on first use
///
/// Holds a single layer; asking for a different layer replaces the cached
/// set.
#[derive(Debug, Clone, Default)]
pub struct CorridorCache {
    layer: Option<(i64, i64)>,
    corridors: Vec<Corridor>,
}

impl CorridorCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached layer
    pub fn invalidate(&mut self) {
        self.layer = None;
        self.corridors.clear();
    }

    pub fn is_cached(&self) -> bool {
        self.layer.is_some()
    }

    /// Corridors of layer `z` at `fill_inset`, computing them if needed
    pub fn corridors(&mut self, store: &LayerPolygonStore, z: f64, fill_inset: f64) -> &[Corridor] {
        let key = ((z * 1e6).round() as i64, (fill_inset * 1e9).round() as i64);
        if self.layer != Some(key) {
            self.corridors = store
                .loops(z)
                .into_iter()
                .flat_map(|boundary| {
                    corridors_for_loop(boundary.id, &boundary.points_2d(), fill_inset)
                        .unwrap_or_else(|e| {
                            tracing::warn!("No corridors for {}: {}", boundary.id, e);
                            Vec::new()
                        })
                })
                .collect();
            tracing::debug!(
                "Layer z={} inset={}: {} corridors",
                z,
                fill_inset,
                self.corridors.len()
            );
            self.layer = Some(key);
        }
        &self.corridors
    }
}
