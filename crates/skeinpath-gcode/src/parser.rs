//! Toolpath stream parser with carried position tracking

use regex::Regex;
use skeinpath_core::{GcodeError, Point3};
use std::sync::OnceLock;

use super::command::{AxisMask, GcodeLine, LinearMove, ParameterKind, ToolpathEvent};

/// Running state carried from line to line
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParserState {
    /// Last resolved move target
    pub position: Option<Point3>,
    /// Last feed rate written on a move
    pub feed_rate: Option<f64>,
    pub extruder_on: bool,
    /// Lines consumed so far
    pub line_number: usize,
}

/// Classifies toolpath lines into typed events
///
/// Move lines may omit axes; omitted axes keep the previous target's value.
/// Lines that cannot be classified, including malformed moves, come back as
/// `ToolpathEvent::Other` so they pass through verbatim.
#[derive(Debug, Clone, Default)]
pub struct StreamParser {
    state: ParserState,
}

impl StreamParser {
    /// Create a new parser at the start of a stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Current carried state
    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Parse a whole stream into lines
    pub fn parse_text(&mut self, text: &str) -> Vec<GcodeLine> {
        text.lines().map(|line| self.parse_line(line)).collect()
    }

    /// Parse one line and update the carried state
    pub fn parse_line(&mut self, line: &str) -> GcodeLine {
        self.state.line_number += 1;
        let event = match self.classify(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("Passing through line: {}", e);
                ToolpathEvent::Other
            }
        };

        match &event {
            ToolpathEvent::LinearMove(m) => {
                self.state.position = Some(m.target);
                if m.feed_rate.is_some() {
                    self.state.feed_rate = m.feed_rate;
                }
            }
            ToolpathEvent::ExtruderOn => self.state.extruder_on = true,
            ToolpathEvent::ExtruderOff => self.state.extruder_on = false,
            _ => {}
        }

        GcodeLine::parsed(line, event)
    }

    fn classify(&self, line: &str) -> Result<ToolpathEvent, GcodeError> {
        let trimmed = line.trim();
        if trimmed.starts_with('(') {
            return self.classify_tag(trimmed);
        }

        let code = strip_comment(trimmed);
        let mut words = code.split_whitespace();
        match words.next() {
            Some("G1") => {
                let words: Vec<&str> = words.collect();
                let m = self.linear_move(&words)?;
                Ok(ToolpathEvent::LinearMove(m))
            }
            Some("M101") => Ok(ToolpathEvent::ExtruderOn),
            Some("M103") => Ok(ToolpathEvent::ExtruderOff),
            _ => Ok(ToolpathEvent::Other),
        }
    }

    fn classify_tag(&self, line: &str) -> Result<ToolpathEvent, GcodeError> {
        static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = TAG_REGEX.get_or_init(|| {
            Regex::new(r"^\(<(/?)([A-Za-z]+)>\s*(.*?)\s*\)$").expect("invalid regex pattern")
        });

        let Some(captures) = regex.captures(line) else {
            return Ok(ToolpathEvent::Other);
        };
        let closing = !captures[1].is_empty();
        let tag = &captures[2];
        let payload = captures.get(3).map_or("", |m| m.as_str());

        if closing {
            return Ok(match tag {
                "surroundingLoop" => ToolpathEvent::LoopEnd,
                "perimeter" => ToolpathEvent::PerimeterEnd,
                _ => ToolpathEvent::Other,
            });
        }

        let event = match tag {
            "layerStart" => ToolpathEvent::LayerStart {
                z: self.number(payload, 'Z')?,
            },
            "boundaryPoint" => {
                let words: Vec<&str> = payload.split_whitespace().collect();
                let (target, _, _) = self.resolve_words(&words, None)?;
                ToolpathEvent::BoundaryPoint(target)
            }
            "surroundingLoop" => ToolpathEvent::LoopStart,
            "perimeter" => ToolpathEvent::PerimeterStart,
            "bridgeLayer" => ToolpathEvent::BridgeLayer,
            "extrusionStart" => ToolpathEvent::ExtrusionStart,
            "procedureDone" => ToolpathEvent::ProcedureDone(payload.to_string()),
            other => match ParameterKind::from_tag(other) {
                Some(kind) => ToolpathEvent::Parameter {
                    kind,
                    value: self.number(payload, 'P')?,
                },
                None => ToolpathEvent::Other,
            },
        };
        Ok(event)
    }

    fn linear_move(&self, words: &[&str]) -> Result<LinearMove, GcodeError> {
        let (target, axes, feed_rate) = self.resolve_words(words, self.state.position)?;
        Ok(LinearMove {
            target,
            axes,
            feed_rate,
        })
    }

    /// Resolve axis words against `carried`, defaulting missing axes to zero
    fn resolve_words(
        &self,
        words: &[&str],
        carried: Option<Point3>,
    ) -> Result<(Point3, AxisMask, Option<f64>), GcodeError> {
        let mut target = carried.unwrap_or_default();
        let mut axes = AxisMask::default();
        let mut feed_rate = None;

        for word in words {
            let mut chars = word.chars();
            let Some(letter) = chars.next() else {
                continue;
            };
            let letter = letter.to_ascii_uppercase();
            match letter {
                'X' => {
                    target.x = self.number(chars.as_str(), letter)?;
                    axes.x = true;
                }
                'Y' => {
                    target.y = self.number(chars.as_str(), letter)?;
                    axes.y = true;
                }
                'Z' => {
                    target.z = self.number(chars.as_str(), letter)?;
                    axes.z = true;
                }
                'F' => feed_rate = Some(self.number(chars.as_str(), letter)?),
                'E' => {}
                axis => {
                    return Err(GcodeError::UnknownAxis {
                        line_number: self.state.line_number,
                        axis,
                    })
                }
            }
        }

        if !axes.x && !axes.y && !axes.z && feed_rate.is_none() {
            return Err(GcodeError::MalformedLine {
                line_number: self.state.line_number,
                reason: "move without axis words".to_string(),
            });
        }
        Ok((target, axes, feed_rate))
    }

    fn number(&self, text: &str, word: char) -> Result<f64, GcodeError> {
        text.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| GcodeError::InvalidNumber {
                line_number: self.state.line_number,
                word,
                value: text.to_string(),
            })
    }
}

/// Remove a trailing `;` or `(` comment from a command line
fn strip_comment(line: &str) -> &str {
    match line.find([';', '(']) {
        Some(index) => line[..index].trim_end(),
        None => line,
    }
}
