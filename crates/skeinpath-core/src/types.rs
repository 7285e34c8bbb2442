//! Shared identifiers and enums

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a loop in a layer store arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoopId(pub usize);

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loop#{}", self.0)
    }
}

/// Back-reference from a cataloged point to its owning loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexRef {
    pub loop_id: LoopId,
    /// Index of the point within the loop
    pub vertex: usize,
}

/// Winding direction of a closed loop
///
/// Outer boundaries wind widdershins and holes wind clockwise, so the
/// material is always on the left of the direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winding {
    /// Counterclockwise, positive signed area
    Widdershins,
    /// Clockwise, negative signed area
    Clockwise,
}

impl Winding {
    /// Winding for a signed area
    pub fn from_signed_area(area: f64) -> Self {
        if area > 0.0 {
            Winding::Widdershins
        } else {
            Winding::Clockwise
        }
    }

    pub fn is_widdershins(self) -> bool {
        self == Winding::Widdershins
    }
}

impl fmt::Display for Winding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winding::Widdershins => write!(f, "widdershins"),
            Winding::Clockwise => write!(f, "clockwise"),
        }
    }
}

/// How a filleted corner is written out
///
/// All modes share one corner geometry; the mode only selects the emitted
/// commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilletMode {
    /// Two straight cut points
    #[default]
    Bevel,
    /// Arc approximated by short linear moves
    ArcSegment,
    /// Native arc with a center offset relative to the arc start
    ArcPoint,
    /// Native arc with a radius word
    ArcRadius,
}

impl fmt::Display for FilletMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilletMode::Bevel => write!(f, "bevel"),
            FilletMode::ArcSegment => write!(f, "arc_segment"),
            FilletMode::ArcPoint => write!(f, "arc_point"),
            FilletMode::ArcRadius => write!(f, "arc_radius"),
        }
    }
}
