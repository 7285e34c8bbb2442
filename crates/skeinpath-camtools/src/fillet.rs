//! Corner filleting
//!
//! Every extrusion vertex with an extruded segment on both sides is replaced
//! by a bevel cut or by an arc tangent to both segments. The corner geometry
//! is computed once by [`fit_corner`]; [`CornerSmoother`] only decides how the
//! result is written out.

use serde::{Deserialize, Serialize};
use skeinpath_core::{angle_difference, FilletMode, GeometryError, Point2, Point3, EPSILON};
use skeinpath_gcode::{
    ArcCenter, ArcMove, GcodeLine, StageReport, StreamParameters, ToolpathEvent, ToolpathStage,
};

use crate::arc_expander::ArcExpander;

/// Shortest bisector of the two unit directions that still counts as a
/// turn, in half extrusion widths
const MINIMUM_BISECTOR_OVER_HALF_WIDTH: f64 = 0.01;

/// Smallest bisector component across the incoming direction
const MINIMUM_PLANE_DOT: f64 = 1e-6;

/// Fillet settings resolved once per run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilletParameters {
    pub enabled: bool,
    pub mode: FilletMode,
    /// Corner radius in half extrusion widths
    pub fillet_radius_over_half_extrusion_width: f64,
    /// Values used until the stream states its own
    pub stream: StreamParameters,
}

impl Default for FilletParameters {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: FilletMode::default(),
            fillet_radius_over_half_extrusion_width: 0.7,
            stream: StreamParameters::default(),
        }
    }
}

impl FilletParameters {
    /// Corner radius for the given stream state
    pub fn radius(&self, stream: &StreamParameters) -> f64 {
        stream.half_extrusion_width() * self.fillet_radius_over_half_extrusion_width
    }
}

/// A direction change between two extrusion moves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerEvent {
    /// Where the incoming segment starts
    pub incoming: Point3,
    pub vertex: Point3,
    /// Where the outgoing segment ends
    pub outgoing: Point3,
    /// Corner radius budget
    pub radius: f64,
    pub half_extrusion_width: f64,
}

/// Circle tangent to both segments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcFit {
    pub center: Point2,
    /// Signed angle from `arc_start` to `after_point` around the center
    pub sweep: f64,
    pub radius: f64,
}

/// Replacement geometry for one vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerFit {
    /// Cut point on the incoming segment; `None` when that segment is too
    /// short to cut and the corner starts at the incoming point
    pub before_point: Option<Point3>,
    /// Where the replacement starts
    pub arc_start: Point3,
    /// Cut point on the outgoing segment, where the replacement ends
    pub after_point: Point3,
    /// Tangent circle, for the arc modes
    pub arc: Option<ArcFit>,
}

/// Compute the cut points, and for the arc modes the tangent circle, of a corner
pub fn fit_corner(event: &CornerEvent, mode: FilletMode) -> Result<CornerFit, GeometryError> {
    let before = event.incoming - event.vertex;
    let after = event.outgoing - event.vertex;
    let before_length = before.length();
    let after_length = after.length();
    for length in [before_length, after_length] {
        if length <= EPSILON {
            return Err(GeometryError::DegenerateSegment { length });
        }
    }

    let before_unit = before * (1.0 / before_length);
    let after_unit = after * (1.0 / after_length);
    let bisector = before_unit + after_unit;
    if bisector.length() < MINIMUM_BISECTOR_OVER_HALF_WIDTH * event.half_extrusion_width {
        return Err(GeometryError::DegenerateCorner {
            reason: "segments continue in a straight line".to_string(),
        });
    }
    let half_after = 0.5 * after_length;
    let radius = event.radius;

    if mode == FilletMode::Bevel {
        let mut bevel = half_after.min(0.5 * radius);
        let before_point = if before_length < bevel {
            bevel = before_length;
            None
        } else {
            Some(event.vertex.plus_segment_with_length(bevel, before))
        };
        return Ok(CornerFit {
            before_point,
            arc_start: before_point.unwrap_or(event.incoming),
            after_point: event.vertex.plus_segment_with_length(bevel, after),
            arc: None,
        });
    }

    let bisector = bisector * (1.0 / bisector.length());
    let plane_dot = bisector.xy().dot(before_unit.xy().left_normal()).abs();
    if plane_dot < MINIMUM_PLANE_DOT {
        return Err(GeometryError::DegenerateCorner {
            reason: "corner doubles back on itself".to_string(),
        });
    }
    let center_distance = radius / plane_dot;
    let mut tangent = (center_distance * center_distance - radius * radius).max(0.0).sqrt();
    if tangent <= EPSILON {
        return Err(GeometryError::DegenerateCorner {
            reason: "tangent length vanishes".to_string(),
        });
    }

    let radius_over_tangent = radius / tangent;
    tangent = tangent.min(radius).min(half_after);
    let before_point = if before_length < tangent {
        tangent = before_length;
        None
    } else {
        Some(event.vertex.plus_segment_with_length(tangent, before))
    };
    let arc_start = before_point.unwrap_or(event.incoming);
    let after_point = event.vertex.plus_segment_with_length(tangent, after);

    let radius = tangent * radius_over_tangent;
    let center = (event.vertex + bisector * (radius / plane_dot)).xy();
    let sweep = angle_difference(after_point.xy() - center, arc_start.xy() - center);

    Ok(CornerFit {
        before_point,
        arc_start,
        after_point,
        arc: Some(ArcFit {
            center,
            sweep,
            radius,
        }),
    })
}

/// Writes a fitted corner out in one of the four fillet modes
#[derive(Debug, Default)]
pub struct CornerSmoother {
    mode: FilletMode,
    expander: ArcExpander,
}

impl CornerSmoother {
    pub fn new(mode: FilletMode) -> Self {
        Self {
            mode,
            expander: ArcExpander::default(),
        }
    }

    pub fn mode(&self) -> FilletMode {
        self.mode
    }

    /// Lines replacing the vertex move, and the point they end on
    pub fn smooth(
        &self,
        event: &CornerEvent,
        feed_rate: Option<f64>,
    ) -> Result<(Vec<GcodeLine>, Point3), GeometryError> {
        let fit = fit_corner(event, self.mode)?;
        let mut lines = Vec::new();
        if let Some(before_point) = fit.before_point {
            lines.push(GcodeLine::linear_move(before_point, feed_rate));
        }

        match (self.mode, fit.arc) {
            (FilletMode::ArcSegment, Some(arc)) => {
                let points =
                    self.expander
                        .expand_arc(fit.arc_start, fit.after_point, arc.center, arc.sweep, arc.radius);
                lines.extend(points.into_iter().map(|p| GcodeLine::linear_move(p, feed_rate)));
            }
            (FilletMode::ArcPoint | FilletMode::ArcRadius, Some(arc)) => {
                let offset = arc.center - fit.arc_start.xy();
                let center = if self.mode == FilletMode::ArcPoint {
                    ArcCenter::Relative(offset)
                } else {
                    ArcCenter::Radius(offset.length())
                };
                lines.push(GcodeLine::synthesized(ToolpathEvent::ArcMove(ArcMove {
                    clockwise: arc.sweep <= 0.0,
                    end: fit.after_point,
                    center,
                    feed_rate,
                })));
            }
            _ => lines.push(GcodeLine::linear_move(fit.after_point, feed_rate)),
        }
        Ok((lines, fit.after_point))
    }
}

/// Target of the next move before the extruder turns off
fn next_active(lines: &[GcodeLine], index: usize) -> Option<Point3> {
    for line in &lines[index + 1..] {
        match &line.event {
            ToolpathEvent::LinearMove(m) => return Some(m.target),
            ToolpathEvent::ExtruderOff => return None,
            _ => {}
        }
    }
    None
}

/// Replaces sharp extrusion corners
#[derive(Debug, Default)]
pub struct FilletStage {
    parameters: FilletParameters,
    smoother: CornerSmoother,
}

impl FilletStage {
    pub fn new(parameters: FilletParameters) -> Self {
        Self {
            parameters,
            smoother: CornerSmoother::new(parameters.mode),
        }
    }

    pub fn parameters(&self) -> &FilletParameters {
        &self.parameters
    }
}

impl ToolpathStage for FilletStage {
    fn name(&self) -> &str {
        "fillet"
    }

    fn description(&self) -> &str {
        "Replaces extrusion corners with bevels or tangent arcs"
    }

    fn is_enabled(&self) -> bool {
        self.parameters.enabled
    }

    fn process(&self, lines: &mut Vec<GcodeLine>) -> StageReport {
        let mut report = StageReport::new(self.name());
        let source = std::mem::take(lines);
        let mut stream = self.parameters.stream;
        let mut extruder_on = false;
        let mut position: Option<Point3> = None;
        let mut old_active: Option<Point3> = None;
        let mut feed_rate: Option<f64> = None;

        for (index, line) in source.iter().enumerate() {
            match &line.event {
                ToolpathEvent::Parameter { .. } => stream.observe(&line.event),
                ToolpathEvent::ExtruderOn => {
                    extruder_on = true;
                    old_active = position;
                }
                ToolpathEvent::ExtruderOff => {
                    extruder_on = false;
                    old_active = None;
                }
                ToolpathEvent::ArcMove(arc) => position = Some(arc.end),
                ToolpathEvent::LinearMove(m) => {
                    if m.feed_rate.is_some() {
                        feed_rate = m.feed_rate;
                    }
                    position = Some(m.target);
                    if !extruder_on {
                        lines.push(line.clone());
                        continue;
                    }

                    let corner = old_active.zip(next_active(&source, index)).map(|(incoming, outgoing)| {
                        CornerEvent {
                            incoming,
                            vertex: m.target,
                            outgoing,
                            radius: self.parameters.radius(&stream),
                            half_extrusion_width: stream.half_extrusion_width(),
                        }
                    });
                    old_active = Some(m.target);
                    if let Some(corner) = corner {
                        match self.smoother.smooth(&corner, feed_rate) {
                            Ok((replacement, end)) => {
                                report.increment("filleted_corners");
                                lines.extend(replacement);
                                old_active = Some(end);
                                continue;
                            }
                            Err(e) => {
                                tracing::debug!("Corner at {} left unchanged: {}", m.target, e);
                                report.increment("degenerate_corners");
                            }
                        }
                    }
                }
                _ => {}
            }
            lines.push(line.clone());
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner(radius: f64) -> CornerEvent {
        CornerEvent {
            incoming: Point3::new(0.0, 0.0, 0.4),
            vertex: Point3::new(5.0, 0.0, 0.4),
            outgoing: Point3::new(5.0, 5.0, 0.4),
            radius,
            half_extrusion_width: radius,
        }
    }

    #[test]
    fn test_bevel_cuts_half_radius() {
        let fit = fit_corner(&corner(1.0), FilletMode::Bevel).unwrap();
        let before_point = fit.before_point.unwrap();
        assert!(before_point.distance(Point3::new(4.5, 0.0, 0.4)) < 1e-12);
        assert!(fit.after_point.distance(Point3::new(5.0, 0.5, 0.4)) < 1e-12);
        assert!(fit.arc.is_none());
    }

    #[test]
    fn test_arc_center_and_sweep() {
        let fit = fit_corner(&corner(1.0), FilletMode::ArcPoint).unwrap();
        let arc = fit.arc.unwrap();
        assert!(arc.center.distance(Point2::new(4.0, 1.0)) < 1e-9);
        assert!((arc.radius - 1.0).abs() < 1e-9);
        assert!((arc.sweep - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_straight_run_is_degenerate() {
        let event = CornerEvent {
            outgoing: Point3::new(9.0, 0.0, 0.4),
            ..corner(1.0)
        };
        assert!(matches!(
            fit_corner(&event, FilletMode::ArcSegment),
            Err(GeometryError::DegenerateCorner { .. })
        ));
    }

    #[test]
    fn test_zero_length_segment_is_degenerate() {
        let event = CornerEvent {
            incoming: Point3::new(5.0, 0.0, 0.4),
            ..corner(1.0)
        };
        assert!(matches!(
            fit_corner(&event, FilletMode::Bevel),
            Err(GeometryError::DegenerateSegment { .. })
        ));
    }

    #[test]
    fn test_next_active_stops_at_extruder_off() {
        let lines = vec![
            GcodeLine::linear_move(Point3::new(1.0, 0.0, 0.0), None),
            GcodeLine::synthesized(ToolpathEvent::ExtruderOff),
            GcodeLine::linear_move(Point3::new(2.0, 0.0, 0.0), None),
        ];
        assert_eq!(next_active(&lines, 0), None);
        assert_eq!(next_active(&lines[1..], 0), Some(Point3::new(2.0, 0.0, 0.0)));
    }
}
