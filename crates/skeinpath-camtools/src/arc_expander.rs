//! Arc Expander
//!
//! Approximates a fitted fillet arc with short linear moves for machines
//! that are fed line segments only.

use skeinpath_core::{Point2, Point3};

/// Arc expansion configuration
#[derive(Debug, Clone)]
pub struct ArcExpanderConfig {
    /// Largest angle, in radians, covered by one segment
    pub max_step_angle: f64,
    /// Largest arc length covered by one segment
    pub max_step_length: f64,
}

impl Default for ArcExpanderConfig {
    fn default() -> Self {
        Self {
            max_step_angle: 1.0 / 2.4,
            max_step_length: 0.5,
        }
    }
}

/// Converts arcs to line segments
#[derive(Debug, Default)]
pub struct ArcExpander {
    config: ArcExpanderConfig,
}

impl ArcExpander {
    /// Create a new arc expander
    pub fn new(config: ArcExpanderConfig) -> Self {
        Self { config }
    }

    /// Number of segments for an arc of `sweep` radians and `radius`
    ///
    /// Whichever bound is tighter wins, so sharper turns and larger radii both
    /// get denser segments.
    pub fn step_count(&self, sweep: f64, radius: f64) -> usize {
        let by_angle = sweep.abs() / self.config.max_step_angle;
        let by_length = sweep.abs() * radius / self.config.max_step_length;
        by_angle.max(by_length).ceil().max(1.0) as usize
    }

    /// Points along the arc from `start` around `center` by `sweep`
    ///
    /// The start point is not included; the last point is `end`, which is
    /// passed in so the exact tangent point is kept rather than a rotated
    /// approximation of it.
    pub fn expand_arc(
        &self,
        start: Point3,
        end: Point3,
        center: Point2,
        sweep: f64,
        radius: f64,
    ) -> Vec<Point3> {
        let steps = self.step_count(sweep, radius);
        let step_rotation = Point2::from_angle(sweep / steps as f64);
        let mut offset = start.xy() - center;
        let mut points = Vec::with_capacity(steps);
        for _ in 1..steps {
            offset = offset.rotate_by(step_rotation);
            points.push((center + offset).with_z(start.z));
        }
        points.push(end);
        points
    }
}
