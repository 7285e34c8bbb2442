//! # SkeinPath CAM Tools
//!
//! Geometry-heavy toolpath stages:
//! - `LayerPolygonStore`: per-layer boundary loops rebuilt from the stream
//! - `inset`: material-side corridor offsets with a per-layer cache
//! - `comb`: travel routing around corridors, loop-start jitter, departure loops
//! - `fillet`: bevel and arc replacement of sharp extrusion corners

pub mod arc_expander;
pub mod comb;
pub mod fillet;
pub mod inset;
pub mod layer_store;

pub use arc_expander::{ArcExpander, ArcExpanderConfig};
pub use comb::{CombParameters, CombStage, TravelRouter};
pub use fillet::{
    fit_corner, ArcFit, CornerEvent, CornerFit, CornerSmoother, FilletParameters, FilletStage,
};
pub use inset::{corridors_for_loop, offset_loop, Corridor, CorridorCache};
pub use layer_store::{BoundaryLoop, LayerPolygonStore};
