//! Per-layer boundary loops
//!
//! Loops live in one arena and are addressed by `LoopId`. Every boundary
//! point is also indexed by its quantized coordinates so a travel endpoint
//! can be traced back to the loop and vertex it sits on.

use skeinpath_core::{polygon, LoopId, Point2, Point3, VertexRef, Winding};
use skeinpath_gcode::{GcodeLine, ToolpathEvent};
use std::collections::HashMap;

/// Grid used to quantize coordinates for point lookup
const POINT_KEY_SCALE: f64 = 1e6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PointKey(i64, i64, i64);

impl PointKey {
    fn new(point: Point3) -> Self {
        Self(
            (point.x * POINT_KEY_SCALE).round() as i64,
            (point.y * POINT_KEY_SCALE).round() as i64,
            (point.z * POINT_KEY_SCALE).round() as i64,
        )
    }
}

/// Layer key from a Z value
fn layer_key(z: f64) -> i64 {
    (z * POINT_KEY_SCALE).round() as i64
}

/// A closed boundary loop belonging to one layer
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryLoop {
    pub id: LoopId,
    pub layer_z: f64,
    pub points: Vec<Point3>,
}

impl BoundaryLoop {
    /// Points projected onto the XY plane
    pub fn points_2d(&self) -> Vec<Point2> {
        self.points.iter().map(|p| p.xy()).collect()
    }

    pub fn winding(&self) -> Winding {
        polygon::winding(&self.points_2d())
    }

    pub fn is_widdershins(&self) -> bool {
        self.winding().is_widdershins()
    }
}

#[derive(Debug, Clone, Default)]
struct LayerEntry {
    loops: Vec<LoopId>,
}

/// Boundary loops grouped by layer
#[derive(Debug, Clone, Default)]
pub struct LayerPolygonStore {
    loops: Vec<BoundaryLoop>,
    layers: Vec<LayerEntry>,
    layer_index: HashMap<i64, usize>,
    point_index: HashMap<PointKey, VertexRef>,
    current_layer: Option<f64>,
    current_loop: Option<LoopId>,
}

impl LayerPolygonStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the store from the boundary markers of a parsed stream
    pub fn from_lines(lines: &[GcodeLine]) -> Self {
        let mut store = Self::new();
        for line in lines {
            match &line.event {
                ToolpathEvent::LayerStart { z } => store.begin_layer(*z),
                ToolpathEvent::LoopStart
                | ToolpathEvent::LoopEnd
                | ToolpathEvent::PerimeterStart
                | ToolpathEvent::PerimeterEnd
                | ToolpathEvent::ExtruderOff => store.end_loop(),
                ToolpathEvent::BoundaryPoint(point) => {
                    let z = store.current_layer.unwrap_or(point.z);
                    store.add_boundary_point(z, *point);
                }
                _ => {}
            }
        }
        tracing::debug!(
            "Layer store built: {} layers, {} loops",
            store.layers.len(),
            store.loops.len()
        );
        store
    }

    /// Start a new layer context; the next boundary point opens a new loop
    pub fn begin_layer(&mut self, z: f64) {
        self.current_layer = Some(z);
        self.current_loop = None;
    }

    /// Close the current loop; the next boundary point opens a new one
    pub fn end_loop(&mut self) {
        self.current_loop = None;
    }

    /// Append `point` to the current loop of layer `z`
    pub fn add_boundary_point(&mut self, z: f64, point: Point3) -> LoopId {
        let loop_id = match self.current_loop {
            Some(id) if self.loops[id.0].layer_z == z => id,
            _ => self.open_loop(z),
        };
        let boundary = &mut self.loops[loop_id.0];
        let vertex = boundary.points.len();
        boundary.points.push(point);
        self.point_index
            .insert(PointKey::new(point), VertexRef { loop_id, vertex });
        loop_id
    }

    fn open_loop(&mut self, z: f64) -> LoopId {
        let id = LoopId(self.loops.len());
        self.loops.push(BoundaryLoop {
            id,
            layer_z: z,
            points: Vec::new(),
        });
        let layer = *self.layer_index.entry(layer_key(z)).or_insert_with(|| {
            self.layers.push(LayerEntry::default());
            self.layers.len() - 1
        });
        self.layers[layer].loops.push(id);
        self.current_loop = Some(id);
        id
    }

    /// Loops of layer `z`; an unknown layer has none
    pub fn loops(&self, z: f64) -> Vec<&BoundaryLoop> {
        self.layer_index
            .get(&layer_key(z))
            .map(|&layer| {
                self.layers[layer]
                    .loops
                    .iter()
                    .map(|id| &self.loops[id.0])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, id: LoopId) -> Option<&BoundaryLoop> {
        self.loops.get(id.0)
    }

    /// The loop and vertex `point` was cataloged as, if any
    pub fn vertex_ref(&self, point: Point3) -> Option<VertexRef> {
        self.point_index.get(&PointKey::new(point)).copied()
    }

    /// True when `point` is a cataloged boundary point
    pub fn is_cataloged(&self, point: Point3) -> bool {
        self.point_index.contains_key(&PointKey::new(point))
    }

    /// Catalog an extra point as belonging to an existing loop vertex
    pub fn register_point(&mut self, point: Point3, vertex: VertexRef) {
        self.point_index.insert(PointKey::new(point), vertex);
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }
}
