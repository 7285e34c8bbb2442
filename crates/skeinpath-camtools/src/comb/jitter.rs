//! Loop-start jitter
//!
//! A closed perimeter printed as travel, extruder on, moves back to the
//! start, extruder off is restarted at a point shifted along its own
//! perimeter. The shift for layer `k` is the fractional part of `k` times the
//! golden ratio conjugate, scaled by the jitter distance, so seams of
//! consecutive layers spread out evenly and identically on every run.

use skeinpath_core::{polygon, Point2, Point3, EPSILON};
use skeinpath_gcode::{AxisMask, GcodeLine, StreamParameters, ToolpathEvent};

use super::CombParameters;
use crate::layer_store::LayerPolygonStore;

const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_894_9;

/// Largest gap between the last extrusion point and the start for a run to
/// count as closed
const CLOSE_TOLERANCE: f64 = 1e-4;

/// Fraction of the jitter distance used for layer `layer_index`
pub fn jitter_fraction(layer_index: usize) -> f64 {
    (layer_index as f64 * GOLDEN_RATIO_CONJUGATE).fract()
}

/// A closed extrusion run inside a perimeter block
#[derive(Debug, Clone)]
struct PrintedLoop {
    travel_index: usize,
    on_index: usize,
    off_index: usize,
    /// Start point followed by every distinct vertex, not restating the start
    ring: Vec<Point3>,
    /// Feed rate in effect on the move that reaches each ring point
    ring_feeds: Vec<Option<f64>>,
    layer_index: usize,
    stream: StreamParameters,
}

impl PrintedLoop {
    fn scan(
        lines: &[GcodeLine],
        travel_index: usize,
        on_index: usize,
        feed_rate: Option<f64>,
        layer_index: usize,
        stream: StreamParameters,
    ) -> Option<Self> {
        let start = lines[travel_index].move_target()?;
        let mut feed_rate = feed_rate;
        let mut vertices = Vec::new();
        let mut feeds = Vec::new();

        let mut index = on_index + 1;
        let off_index = loop {
            match &lines.get(index)?.event {
                ToolpathEvent::LinearMove(m) => {
                    if m.feed_rate.is_some() {
                        feed_rate = m.feed_rate;
                    }
                    vertices.push(m.target);
                    feeds.push(feed_rate);
                }
                ToolpathEvent::ExtruderOff => break index,
                _ => return None,
            }
            index += 1;
        };

        let (&last, _) = vertices.split_last()?;
        if vertices.len() < 3 || last.distance(start) > CLOSE_TOLERANCE {
            return None;
        }

        let mut ring = vec![start];
        ring.extend_from_slice(&vertices[..vertices.len() - 1]);
        let mut ring_feeds = vec![feeds[feeds.len() - 1]];
        ring_feeds.extend_from_slice(&feeds[..feeds.len() - 1]);

        Some(Self {
            travel_index,
            on_index,
            off_index,
            ring,
            ring_feeds,
            layer_index,
            stream,
        })
    }

    fn ring_2d(&self) -> Vec<Point2> {
        self.ring.iter().map(|p| p.xy()).collect()
    }
}

/// Point `distance` along the closed ring and the index of the edge it is on
fn point_along(ring: &[Point2], distance: f64) -> (Point2, usize) {
    let n = ring.len();
    let mut remaining = distance;
    for i in 0..n {
        let begin = ring[i];
        let end = ring[(i + 1) % n];
        let length = begin.distance(end);
        if remaining <= length {
            let direction = (end - begin).normalized().unwrap_or_default();
            return (begin + direction * remaining, i);
        }
        remaining -= length;
    }
    (ring[0], n - 1)
}

/// Restate `feed_rate` on the first move after `index` unless it sets its own
fn restore_feed_rate(lines: &mut [GcodeLine], index: usize, feed_rate: f64) {
    for line in lines.iter_mut().skip(index + 1) {
        match &mut line.event {
            ToolpathEvent::LinearMove(m) => {
                if m.feed_rate.is_none() {
                    m.feed_rate = Some(feed_rate);
                    m.axes = AxisMask::ALL;
                    line.text = None;
                }
                return;
            }
            ToolpathEvent::ArcMove(_) => return,
            _ => {}
        }
    }
}

/// Find closed perimeter runs
fn find_printed_loops(lines: &[GcodeLine], defaults: StreamParameters) -> Vec<PrintedLoop> {
    let mut stream = defaults;
    let mut layer_index: Option<usize> = None;
    let mut in_perimeter = false;
    let mut extruder_on = false;
    let mut last_travel: Option<usize> = None;
    let mut feed_rate: Option<f64> = None;
    let mut found = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        match &line.event {
            ToolpathEvent::LayerStart { .. } => {
                layer_index = Some(layer_index.map_or(0, |k| k + 1));
                last_travel = None;
            }
            ToolpathEvent::Parameter { .. } => stream.observe(&line.event),
            ToolpathEvent::PerimeterStart => in_perimeter = true,
            ToolpathEvent::PerimeterEnd => in_perimeter = false,
            ToolpathEvent::LinearMove(m) => {
                if !extruder_on {
                    last_travel = Some(index);
                }
                if m.feed_rate.is_some() {
                    feed_rate = m.feed_rate;
                }
            }
            ToolpathEvent::ExtruderOn => {
                extruder_on = true;
                if let (true, Some(travel_index)) = (in_perimeter, last_travel) {
                    if let Some(run) = PrintedLoop::scan(
                        lines,
                        travel_index,
                        index,
                        feed_rate,
                        layer_index.unwrap_or(0),
                        stream,
                    ) {
                        found.push(run);
                    }
                }
                last_travel = None;
            }
            ToolpathEvent::ExtruderOff => extruder_on = false,
            _ => {}
        }
    }
    found
}

/// Shift the start of every closed perimeter run; returns how many moved
pub fn apply_loop_jitter(
    lines: &mut Vec<GcodeLine>,
    store: &mut LayerPolygonStore,
    parameters: &CombParameters,
) -> usize {
    let runs = find_printed_loops(lines, parameters.stream);
    let mut jittered = 0;

    for run in runs.iter().rev() {
        let ring = run.ring_2d();
        let n = ring.len();
        let z = run.ring[0].z;
        let perimeter = polygon::loop_length(&ring);
        if perimeter <= EPSILON {
            continue;
        }

        let jitter_distance = parameters.jitter_over_perimeter_width * run.stream.extrusion_width;
        let follow = parameters.arrival_inset_follow_distance_over_inset_width * run.stream.fill_inset;
        let shift = (jitter_fraction(run.layer_index) * jitter_distance).rem_euclid(perimeter);
        if shift <= EPSILON && follow <= EPSILON {
            continue;
        }

        let (jittered_start, edge) = point_along(&ring, shift);
        let jittered_start = jittered_start.with_z(z);
        let join_feed = run.ring_feeds[(edge + 1) % n];

        let mut extrusion: Vec<GcodeLine> = Vec::with_capacity(n + 1);
        let mut previous = jittered_start;
        for step in 1..=n {
            let index = (edge + step) % n;
            let target = run.ring[index];
            if target.distance(previous) > EPSILON {
                extrusion.push(GcodeLine::linear_move(target, run.ring_feeds[index]));
                previous = target;
            }
        }
        if jittered_start.distance(previous) > EPSILON {
            extrusion.push(GcodeLine::linear_move(jittered_start, join_feed));
        }

        // the run used to end at the feed of its last move
        let final_feed = extrusion.iter().rev().find_map(|line| match &line.event {
            ToolpathEvent::LinearMove(m) => m.feed_rate,
            _ => None,
        });
        if let (Some(final_feed), Some(original_feed)) = (final_feed, run.ring_feeds[0]) {
            if final_feed != original_feed {
                restore_feed_rate(lines, run.off_index, original_feed);
            }
        }

        let mut approach = Vec::with_capacity(2);
        if follow > EPSILON {
            let (behind, behind_edge) = point_along(&ring, (shift - follow).rem_euclid(perimeter));
            let edge_direction = (ring[(behind_edge + 1) % n] - ring[behind_edge])
                .normalized()
                .unwrap_or_default();
            let arrival = behind + edge_direction.left_normal() * (0.5 * run.stream.fill_inset);
            approach.push(GcodeLine::linear_move(arrival.with_z(z), None));
        }
        let travel_feed = match &lines[run.travel_index].event {
            ToolpathEvent::LinearMove(m) => m.feed_rate,
            _ => None,
        };
        approach.push(GcodeLine::linear_move(jittered_start, travel_feed));

        if let Some(vertex) = store.vertex_ref(run.ring[edge]) {
            store.register_point(jittered_start, vertex);
        }

        lines.splice(run.on_index + 1..run.off_index, extrusion);
        lines.splice(run.travel_index..=run.travel_index, approach);
        jittered += 1;
        tracing::debug!(
            "Layer {} loop start moved {:.3} along a {:.3} perimeter",
            run.layer_index,
            shift,
            perimeter
        );
    }
    jittered
}
