//! Toolpath event representation
//!
//! Each input line becomes one `GcodeLine`: the typed event plus the original
//! text. Lines synthesized by a stage carry no text and are formatted by the
//! emitter.

use serde::{Deserialize, Serialize};
use skeinpath_core::{Point2, Point3};

/// Which axes a move line stated explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisMask {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisMask {
    /// All three axes present
    pub const ALL: Self = Self {
        x: true,
        y: true,
        z: true,
    };

    pub fn is_complete(self) -> bool {
        self.x && self.y && self.z
    }
}

/// A `G1` move with its target resolved against the carried position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearMove {
    /// Absolute target after carrying omitted axes forward
    pub target: Point3,
    /// Axes written on the line
    pub axes: AxisMask,
    /// Feed rate written on the line, or in effect for synthesized moves
    pub feed_rate: Option<f64>,
}

impl LinearMove {
    /// A synthesized move stating every axis
    pub fn to(target: Point3, feed_rate: Option<f64>) -> Self {
        Self {
            target,
            axes: AxisMask::ALL,
            feed_rate,
        }
    }
}

/// How an arc command locates its center
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcCenter {
    /// `I J` offset from the arc start
    Relative(Point2),
    /// `R` radius magnitude
    Radius(f64),
}

/// A `G2`/`G3` arc synthesized by the corner smoother
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcMove {
    pub clockwise: bool,
    pub end: Point3,
    pub center: ArcCenter,
    pub feed_rate: Option<f64>,
}

/// Named numeric parameter comments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    ExtrusionWidth,
    FillInset,
    BridgeExtrusionWidthOverSolid,
    DecimalPlacesCarried,
}

impl ParameterKind {
    /// Tag name used inside `(<tag> value )`
    pub fn tag(self) -> &'static str {
        match self {
            ParameterKind::ExtrusionWidth => "extrusionWidth",
            ParameterKind::FillInset => "fillInset",
            ParameterKind::BridgeExtrusionWidthOverSolid => "bridgeExtrusionWidthOverSolid",
            ParameterKind::DecimalPlacesCarried => "decimalPlacesCarried",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "extrusionWidth" => Some(ParameterKind::ExtrusionWidth),
            "fillInset" => Some(ParameterKind::FillInset),
            "bridgeExtrusionWidthOverSolid" => Some(ParameterKind::BridgeExtrusionWidthOverSolid),
            "decimalPlacesCarried" => Some(ParameterKind::DecimalPlacesCarried),
            _ => None,
        }
    }
}

/// Typed classification of one toolpath line
#[derive(Debug, Clone, PartialEq)]
pub enum ToolpathEvent {
    LinearMove(LinearMove),
    ArcMove(ArcMove),
    ExtruderOn,
    ExtruderOff,
    LayerStart { z: f64 },
    BoundaryPoint(Point3),
    LoopStart,
    LoopEnd,
    PerimeterStart,
    PerimeterEnd,
    BridgeLayer,
    ExtrusionStart,
    ProcedureDone(String),
    Parameter { kind: ParameterKind, value: f64 },
    /// Anything else, passed through untouched
    Other,
}

/// One line of the toolpath
#[derive(Debug, Clone, PartialEq)]
pub struct GcodeLine {
    /// Original text, absent for lines a stage synthesized
    pub text: Option<String>,
    pub event: ToolpathEvent,
}

impl GcodeLine {
    /// A line read from the input
    pub fn parsed(text: impl Into<String>, event: ToolpathEvent) -> Self {
        Self {
            text: Some(text.into()),
            event,
        }
    }

    /// A line created by a stage
    pub fn synthesized(event: ToolpathEvent) -> Self {
        Self { text: None, event }
    }

    /// A synthesized linear move
    pub fn linear_move(target: Point3, feed_rate: Option<f64>) -> Self {
        Self::synthesized(ToolpathEvent::LinearMove(LinearMove::to(target, feed_rate)))
    }

    pub fn is_synthesized(&self) -> bool {
        self.text.is_none()
    }

    /// The move target, if this line is a linear move
    pub fn move_target(&self) -> Option<Point3> {
        match &self.event {
            ToolpathEvent::LinearMove(m) => Some(m.target),
            _ => None,
        }
    }
}

/// Thresholds the stream can reconfigure through parameter comments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamParameters {
    pub extrusion_width: f64,
    pub fill_inset: f64,
    pub bridge_extrusion_width_over_solid: f64,
    pub decimal_places: u32,
}

impl Default for StreamParameters {
    fn default() -> Self {
        Self {
            extrusion_width: 0.4,
            fill_inset: 0.36,
            bridge_extrusion_width_over_solid: 1.0,
            decimal_places: 3,
        }
    }
}

impl StreamParameters {
    /// Apply a parameter comment
    pub fn apply(&mut self, kind: ParameterKind, value: f64) {
        match kind {
            ParameterKind::ExtrusionWidth => self.extrusion_width = value,
            ParameterKind::FillInset => self.fill_inset = value,
            ParameterKind::BridgeExtrusionWidthOverSolid => {
                self.bridge_extrusion_width_over_solid = value
            }
            ParameterKind::DecimalPlacesCarried => {
                self.decimal_places = value.round().clamp(0.0, 10.0) as u32
            }
        }
    }

    /// Apply the parameter carried by `event`, if any
    pub fn observe(&mut self, event: &ToolpathEvent) {
        if let ToolpathEvent::Parameter { kind, value } = event {
            self.apply(*kind, *value);
        }
    }

    pub fn half_extrusion_width(&self) -> f64 {
        0.5 * self.extrusion_width
    }
}
