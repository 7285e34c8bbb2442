//! # SkeinPath Core
//!
//! Core value types shared by every SkeinPath crate:
//! - `Point2` / `Point3` coordinates with plane arithmetic
//! - Polygon helpers for closed loops (winding, containment, nearest segment)
//! - Loop identifiers and winding direction
//! - Error types for parsing and geometry

pub mod error;
pub mod geometry;
pub mod polygon;
pub mod types;

pub use error::{Error, GcodeError, GeometryError, Result};
pub use geometry::{angle_difference, Point2, Point3, EPSILON};
pub use polygon::XIntersection;
pub use types::{FilletMode, LoopId, VertexRef, Winding};
