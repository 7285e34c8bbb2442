//! Comb stage
//!
//! Keeps idle travel inside the part: travel moves that would pass over a
//! hole are detoured along the corridor around it, perimeter loops get a
//! jittered start, and travel leaving an outer perimeter can first follow it
//! for a minimum distance.

pub mod jitter;
pub mod router;

use serde::{Deserialize, Serialize};
use skeinpath_core::Point3;
use skeinpath_gcode::{GcodeLine, StageReport, StreamParameters, ToolpathEvent, ToolpathStage};

use crate::layer_store::LayerPolygonStore;
pub use jitter::{apply_loop_jitter, jitter_fraction};
pub use router::{LayerGeometry, TravelRouter};

/// Comb settings resolved once per run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombParameters {
    /// Whether the stage runs at all
    pub enabled: bool,
    /// Values used until the stream states its own
    pub stream: StreamParameters,
    /// Loop-start jitter distance in extrusion widths
    pub jitter_over_perimeter_width: f64,
    /// Arrival approach distance in fill insets
    pub arrival_inset_follow_distance_over_inset_width: f64,
    /// Distance to follow an outer perimeter before leaving it, in extrusion widths
    pub minimum_departure_distance_over_perimeter_width: f64,
}

impl Default for CombParameters {
    fn default() -> Self {
        Self {
            enabled: true,
            stream: StreamParameters::default(),
            jitter_over_perimeter_width: 2.0,
            arrival_inset_follow_distance_over_inset_width: 3.0,
            minimum_departure_distance_over_perimeter_width: 0.0,
        }
    }
}

/// Routes travel moves around corridors
#[derive(Debug, Clone, Default)]
pub struct CombStage {
    parameters: CombParameters,
}

impl CombStage {
    /// Create a new comb stage
    pub fn new(parameters: CombParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &CombParameters {
        &self.parameters
    }
}

impl ToolpathStage for CombStage {
    fn name(&self) -> &str {
        "comb"
    }

    fn description(&self) -> &str {
        "Routes travel moves around holes along inset corridors"
    }

    fn is_enabled(&self) -> bool {
        self.parameters.enabled
    }

    fn process(&self, lines: &mut Vec<GcodeLine>) -> StageReport {
        let mut report = StageReport::new(self.name());

        let mut store = LayerPolygonStore::from_lines(lines);
        report.add("jittered_loops", apply_loop_jitter(lines, &mut store, &self.parameters));

        let router = TravelRouter::new(&self.parameters, &store);
        let mut stream = self.parameters.stream;
        let mut layer: Option<LayerGeometry> = None;
        let mut routed: Vec<GcodeLine> = Vec::with_capacity(lines.len());
        let mut old_location: Option<Point3> = None;
        let mut extruder_on = false;

        for line in std::mem::take(lines) {
            match &line.event {
                ToolpathEvent::LayerStart { z } => {
                    layer = Some(LayerGeometry::new(*z, stream.fill_inset));
                }
                ToolpathEvent::BridgeLayer => {
                    if let Some(layer) = layer.as_mut() {
                        layer.set_fill_inset(stream.fill_inset * stream.bridge_extrusion_width_over_solid);
                    }
                }
                ToolpathEvent::Parameter { .. } => stream.observe(&line.event),
                ToolpathEvent::ExtruderOn => extruder_on = true,
                ToolpathEvent::ExtruderOff => extruder_on = false,
                ToolpathEvent::LinearMove(m) => {
                    if let (false, Some(from)) = (extruder_on, old_location) {
                        let layer = layer.get_or_insert_with(|| LayerGeometry::new(from.z, stream.fill_inset));
                        let path = router.route(from, m.target, layer, &stream, &mut report);
                        if !path.is_empty() {
                            report.increment("routed_travels");
                            report.add("inserted_moves", path.len());
                            // detour moves travel at the feed of the move they lead into
                            routed.extend(path.into_iter().map(|p| GcodeLine::linear_move(p, m.feed_rate)));
                        }
                    }
                    old_location = Some(m.target);
                }
                _ => {}
            }
            routed.push(line);
        }

        *lines = routed;
        report
    }
}
