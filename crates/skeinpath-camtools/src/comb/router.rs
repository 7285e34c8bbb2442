//! Travel routing around corridors
//!
//! A travel move is examined in a frame rotated so that it runs along +X.
//! Every corridor edge crossing that line between the two endpoints is an
//! entry or exit; each entry/exit pair on the same corridor is replaced by
//! the shorter walk around that corridor.

use skeinpath_core::{polygon, Point2, Point3, XIntersection, EPSILON};
use skeinpath_gcode::{StageReport, StreamParameters};

use super::CombParameters;
use crate::inset::{Corridor, CorridorCache};
use crate::layer_store::LayerPolygonStore;

/// How far past the nearest corridor point a cataloged endpoint is pushed
const OUTLOOP_PUSH: f64 = 1.5;

/// Points closer than this fraction of the layer inset are dropped from a
/// routed path
const AWAY_RADIUS_OVER_INSET: f64 = 0.2;

/// Interior points closer than this fraction of the away radius to the chord
/// of their neighbours are dropped
const COLLINEAR_OVER_AWAY_RADIUS: f64 = 0.01;

/// Whole trips a departure walk may make around a short loop
const MAX_DEPARTURE_TRIPS: usize = 64;

/// Geometry for the layer currently being routed
#[derive(Debug, Clone)]
pub struct LayerGeometry {
    pub z: f64,
    fill_inset: f64,
    cache: CorridorCache,
}

impl LayerGeometry {
    /// Start routing a new layer; corridors are computed on first use
    pub fn new(z: f64, fill_inset: f64) -> Self {
        Self {
            z,
            fill_inset,
            cache: CorridorCache::new(),
        }
    }

    pub fn fill_inset(&self) -> f64 {
        self.fill_inset
    }

    /// Change the inset, for bridge layers
    pub fn set_fill_inset(&mut self, fill_inset: f64) {
        self.fill_inset = fill_inset;
    }

    /// Corridors of this layer
    pub fn corridors(&mut self, store: &LayerPolygonStore) -> &[Corridor] {
        self.cache.corridors(store, self.z, self.fill_inset)
    }
}

/// Combing decisions for one pass over the stream
pub struct TravelRouter<'a> {
    parameters: &'a CombParameters,
    store: &'a LayerPolygonStore,
}

impl<'a> TravelRouter<'a> {
    /// Create a router over a finished layer store
    pub fn new(parameters: &'a CombParameters, store: &'a LayerPolygonStore) -> Self {
        Self { parameters, store }
    }

    /// Points to visit before the travel move from `from` to `to`
    ///
    /// The travel move itself is not included. An empty result means the
    /// straight move is kept as is.
    pub fn route(
        &self,
        from: Point3,
        to: Point3,
        layer: &mut LayerGeometry,
        stream: &StreamParameters,
        report: &mut StageReport,
    ) -> Vec<Point3> {
        let mut path = Vec::new();
        let mut start = from;

        let departure_distance =
            self.parameters.minimum_departure_distance_over_perimeter_width * stream.extrusion_width;
        if departure_distance > 0.0 {
            let departure = self.departure_path(from, departure_distance);
            if let Some(&last) = departure.last() {
                report.increment("departures");
                start = last;
            }
            path.extend(departure);
        }

        let fill_inset = layer.fill_inset();
        let corridors = layer.corridors(self.store);
        let next_beginning = self.outloop_location(to, corridors, report);
        let path_end = self.outloop_location(start, corridors, report);
        path.extend(self.insert_paths_between(next_beginning, path_end, corridors, fill_inset));
        path
    }

    /// Push a cataloged boundary point just past its nearest corridor edge
    ///
    /// Points that are not on a cataloged loop are returned unchanged. When the
    /// layer has no corridor at all the anomaly is counted and the point is
    /// returned unchanged.
    pub fn outloop_location(
        &self,
        point: Point3,
        corridors: &[Corridor],
        report: &mut StageReport,
    ) -> Point3 {
        if !self.store.is_cataloged(point) {
            return point;
        }

        let mut closest: Option<(f64, usize, usize)> = None;
        for (index, corridor) in corridors.iter().enumerate() {
            if let Some((segment, distance_squared)) =
                polygon::nearest_segment_index(&corridor.points, point.xy())
            {
                if closest.is_none_or(|(best, _, _)| distance_squared < best) {
                    closest = Some((distance_squared, index, segment));
                }
            }
        }

        let Some((_, index, segment)) = closest else {
            tracing::warn!("No corridor found for boundary point {}, leaving it in place", point);
            report.increment("missing_corridor");
            return point;
        };

        let loop_ = &corridors[index].points;
        let nearest = polygon::nearest_point_on_segment(
            loop_[segment],
            loop_[(segment + 1) % loop_.len()],
            point.xy(),
        );
        let pushed = point.xy() + (nearest - point.xy()) * OUTLOOP_PUSH;
        pushed.with_z(point.z)
    }

    /// Detours around every corridor the segment from `path_end` to
    /// `next_beginning` passes through
    pub fn insert_paths_between(
        &self,
        next_beginning: Point3,
        path_end: Point3,
        corridors: &[Corridor],
        fill_inset: f64,
    ) -> Vec<Point3> {
        let Some(direction) = (next_beginning.xy() - path_end.xy()).normalized() else {
            return Vec::new();
        };
        let mirror = direction.conjugate();
        let path_end_rotated = path_end.xy().rotate_by(mirror);
        let next_beginning_rotated = next_beginning.xy().rotate_by(mirror);
        let y = path_end_rotated.y;

        let mut switch_x: Vec<XIntersection> = Vec::new();
        for (index, corridor) in corridors.iter().enumerate() {
            let rotated = polygon::rotate_path(&corridor.points, mirror);
            polygon::add_x_intersections(&rotated, index, y, &mut switch_x);
        }
        switch_x.sort_by(|a, b| a.x.total_cmp(&b.x));

        let min_x = path_end_rotated.x.min(next_beginning_rotated.x);
        let max_x = path_end_rotated.x.max(next_beginning_rotated.x);
        let between: Vec<XIntersection> = switch_x
            .into_iter()
            .filter(|crossing| crossing.x > min_x && crossing.x < max_x)
            .collect();

        let mut path = Vec::new();
        let mut k = 0;
        while k + 1 < between.len() {
            let (first, second) = (between[k], between[k + 1]);
            if first.index == second.index {
                let entry = Point2::new(first.x, y).rotate_by(direction);
                let exit = Point2::new(second.x, y).rotate_by(direction);
                let around = self.path_between(entry, exit, &corridors[first.index].points, fill_inset);
                path.extend(around.into_iter().map(|p| p.with_z(path_end.z)));
                k += 1;
            }
            k += 1;
        }
        path
    }

    /// Shorter walk along `loop_` from `first` to `second`, clockwise on a tie
    pub fn path_between(&self, first: Point2, second: Point2, loop_: &[Point2], fill_inset: f64) -> Vec<Point2> {
        let n = loop_.len();
        let (Some((first_segment, _)), Some((second_segment, _))) = (
            polygon::nearest_segment_index(loop_, first),
            polygon::nearest_segment_index(loop_, second),
        ) else {
            return Vec::new();
        };
        let first_begin = (first_segment + 1) % n;
        let second_begin = (second_segment + 1) % n;

        let mut widdershins = vec![first];
        widdershins.extend(polygon::around_loop(first_begin, second_begin, loop_));
        widdershins.push(second);

        let mut clockwise_around = polygon::around_loop(second_begin, first_begin, loop_);
        clockwise_around.reverse();
        let mut clockwise = vec![first];
        clockwise.extend(clockwise_around);
        clockwise.push(second);

        if first_segment == second_segment {
            let begin = loop_[first_segment];
            let end = loop_[first_begin];
            let ahead = polygon::segment_parameter(begin, end, second)
                >= polygon::segment_parameter(begin, end, first);
            if ahead {
                widdershins = vec![first, second];
            } else {
                clockwise = vec![first, second];
            }
        }

        let chosen = if polygon::path_length(&widdershins) < polygon::path_length(&clockwise) {
            widdershins
        } else {
            clockwise
        };
        let away_radius = AWAY_RADIUS_OVER_INSET * fill_inset;
        let away = polygon::away_path(&chosen, away_radius);
        polygon::drop_collinear(&away, COLLINEAR_OVER_AWAY_RADIUS * away_radius)
    }

    /// Walk forward along the widdershins loop `from` sits on until the
    /// walked length exceeds `distance`
    ///
    /// Returns nothing when `from` is not a cataloged vertex of an outer loop.
    pub fn departure_path(&self, from: Point3, distance: f64) -> Vec<Point3> {
        let Some(vertex) = self.store.vertex_ref(from) else {
            return Vec::new();
        };
        let Some(boundary) = self.store.get(vertex.loop_id) else {
            return Vec::new();
        };
        if !boundary.is_widdershins() {
            return Vec::new();
        }
        let points = &boundary.points;
        let perimeter = polygon::loop_length(&boundary.points_2d());
        if perimeter <= EPSILON {
            return Vec::new();
        }

        let n = points.len();
        let mut path = Vec::new();
        let mut walked = 0.0;
        let mut previous = from;
        let mut index = vertex.vertex;
        while walked <= distance && path.len() < n * MAX_DEPARTURE_TRIPS {
            index = (index + 1) % n;
            let next = points[index].xy().with_z(from.z);
            walked += previous.xy().distance(next.xy());
            path.push(next);
            previous = next;
        }
        path
    }
}
