//! Serializes toolpath events back to text
//!
//! Unmodified input lines are written verbatim. Synthesized moves are
//! formatted with coordinates rounded to the carried number of decimal
//! places, and a feed rate word only when it differs from the last one
//! written.

use skeinpath_core::Point3;

use super::command::{ArcCenter, ArcMove, AxisMask, GcodeLine, LinearMove, ParameterKind, ToolpathEvent};

/// Round `value` to `decimal_places` and format without trailing zeros
pub fn format_number(value: f64, decimal_places: u32) -> String {
    let multiplier = 10_f64.powi(decimal_places as i32);
    let rounded = (value * multiplier).round() / multiplier;
    // avoid "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{}", rounded)
}

/// The stage-completion marker line for `name`
pub fn procedure_marker(name: &str) -> String {
    format!("(<procedureDone> {} )", name)
}

/// True when a stage-completion marker for `name` is present
pub fn is_procedure_done(lines: &[GcodeLine], name: &str) -> bool {
    lines
        .iter()
        .any(|line| matches!(&line.event, ToolpathEvent::ProcedureDone(done) if done == name))
}

/// Insert the marker for `name` before the extrusion start line, or after
/// the markers leading the stream
pub fn insert_procedure_marker(lines: &mut Vec<GcodeLine>, name: &str) {
    let index = lines
        .iter()
        .position(|line| line.event == ToolpathEvent::ExtrusionStart)
        .unwrap_or_else(|| {
            lines
                .iter()
                .take_while(|line| matches!(line.event, ToolpathEvent::ProcedureDone(_)))
                .count()
        });
    lines.insert(
        index,
        GcodeLine::synthesized(ToolpathEvent::ProcedureDone(name.to_string())),
    );
}

/// Writes a line list back to text
#[derive(Debug, Clone)]
pub struct StreamEmitter {
    decimal_places: u32,
    last_feed_rate: Option<f64>,
    position: Option<Point3>,
}

impl StreamEmitter {
    /// Create an emitter with the default precision for streams that do not
    /// carry their own
    pub fn new(decimal_places: u32) -> Self {
        Self {
            decimal_places,
            last_feed_rate: None,
            position: None,
        }
    }

    pub fn decimal_places(&self) -> u32 {
        self.decimal_places
    }

    /// Serialize every line, one newline after each
    pub fn emit(&mut self, lines: &[GcodeLine]) -> String {
        let mut out = String::with_capacity(lines.len() * 24);
        for line in lines {
            out.push_str(&self.emit_line(line));
            out.push('\n');
        }
        out
    }

    /// Serialize one line and update the carried output state
    pub fn emit_line(&mut self, line: &GcodeLine) -> String {
        match (&line.event, &line.text) {
            (ToolpathEvent::LinearMove(m), Some(text)) => {
                let out = if self.carries_unchanged(m) {
                    text.clone()
                } else {
                    self.format_linear_move(&LinearMove {
                        axes: AxisMask::ALL,
                        ..*m
                    })
                };
                self.position = Some(m.target);
                if m.feed_rate.is_some() {
                    self.last_feed_rate = m.feed_rate;
                }
                out
            }
            (ToolpathEvent::LinearMove(m), None) => {
                let out = self.format_linear_move(m);
                self.position = Some(m.target);
                out
            }
            (ToolpathEvent::ArcMove(arc), _) => {
                let out = self.format_arc_move(arc);
                self.position = Some(arc.end);
                out
            }
            (ToolpathEvent::Parameter { kind, value }, text) => {
                if *kind == ParameterKind::DecimalPlacesCarried {
                    self.decimal_places = value.round().clamp(0.0, 10.0) as u32;
                }
                text.clone().unwrap_or_else(|| {
                    format!("(<{}> {} )", kind.tag(), format_number(*value, self.decimal_places))
                })
            }
            (_, Some(text)) => text.clone(),
            (event, None) => Self::format_event(event),
        }
    }

    /// A verbatim move is safe when every omitted axis still holds the value
    /// it was resolved against
    fn carries_unchanged(&self, m: &LinearMove) -> bool {
        let Some(position) = self.position else {
            return true;
        };
        (m.axes.x || position.x == m.target.x)
            && (m.axes.y || position.y == m.target.y)
            && (m.axes.z || position.z == m.target.z)
    }

    fn format_linear_move(&mut self, m: &LinearMove) -> String {
        let mut out = String::from("G1");
        if m.axes.x {
            out.push_str(&format!(" X{}", format_number(m.target.x, self.decimal_places)));
        }
        if m.axes.y {
            out.push_str(&format!(" Y{}", format_number(m.target.y, self.decimal_places)));
        }
        if m.axes.z {
            out.push_str(&format!(" Z{}", format_number(m.target.z, self.decimal_places)));
        }
        self.push_feed_rate(&mut out, m.feed_rate);
        out
    }

    fn format_arc_move(&mut self, arc: &ArcMove) -> String {
        let places = self.decimal_places;
        let mut out = format!(
            "{} X{} Y{} Z{}",
            if arc.clockwise { "G2" } else { "G3" },
            format_number(arc.end.x, places),
            format_number(arc.end.y, places),
            format_number(arc.end.z, places),
        );
        match arc.center {
            ArcCenter::Relative(offset) => out.push_str(&format!(
                " I{} J{}",
                format_number(offset.x, places),
                format_number(offset.y, places)
            )),
            ArcCenter::Radius(radius) => {
                out.push_str(&format!(" R{}", format_number(radius, places)))
            }
        }
        self.push_feed_rate(&mut out, arc.feed_rate);
        out
    }

    fn push_feed_rate(&mut self, out: &mut String, feed_rate: Option<f64>) {
        let Some(feed_rate) = feed_rate else {
            return;
        };
        let changed = match self.last_feed_rate {
            Some(last) => {
                format_number(last, self.decimal_places)
                    != format_number(feed_rate, self.decimal_places)
            }
            None => true,
        };
        if changed {
            out.push_str(&format!(" F{}", format_number(feed_rate, self.decimal_places)));
            self.last_feed_rate = Some(feed_rate);
        }
    }

    fn format_event(event: &ToolpathEvent) -> String {
        match event {
            ToolpathEvent::ExtruderOn => "M101".to_string(),
            ToolpathEvent::ExtruderOff => "M103".to_string(),
            ToolpathEvent::LayerStart { z } => format!("(<layerStart> {} )", z),
            ToolpathEvent::ProcedureDone(name) => procedure_marker(name),
            ToolpathEvent::ExtrusionStart => "(<extrusionStart> )".to_string(),
            ToolpathEvent::PerimeterStart => "(<perimeter> )".to_string(),
            ToolpathEvent::PerimeterEnd => "(</perimeter> )".to_string(),
            ToolpathEvent::LoopStart => "(<surroundingLoop> )".to_string(),
            ToolpathEvent::LoopEnd => "(</surroundingLoop> )".to_string(),
            ToolpathEvent::BridgeLayer => "(<bridgeLayer> )".to_string(),
            ToolpathEvent::BoundaryPoint(p) => {
                format!("(<boundaryPoint> X{} Y{} Z{} )", p.x, p.y, p.z)
            }
            _ => String::new(),
        }
    }
}

impl Default for StreamEmitter {
    fn default() -> Self {
        Self::new(3)
    }
}
