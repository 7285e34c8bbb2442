//! Error handling for SkeinPath
//!
//! Provides error types for the toolpath transform layers:
//! - G-code errors (line classification and field extraction)
//! - Geometry errors (degenerate segments, corners and loops)
//!
//! None of these abort a run. The parser turns a `GcodeError` into a
//! pass-through line and the smoother turns a `GeometryError` into an
//! untouched vertex.

use thiserror::Error;

/// G-Code parsing error type
///
/// Represents problems extracting typed fields from a single toolpath line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcodeError {
    /// A line could not be classified or split into words
    #[error("Malformed line {line_number}: {reason}")]
    MalformedLine {
        /// One-based line number in the input stream.
        line_number: usize,
        /// The reason the line was rejected.
        reason: String,
    },

    /// A word carried a value that is not a number
    #[error("Invalid number '{value}' for word '{word}' on line {line_number}")]
    InvalidNumber {
        /// One-based line number in the input stream.
        line_number: usize,
        /// The axis or parameter letter.
        word: char,
        /// The text that failed to parse.
        value: String,
    },

    /// A move carried an axis letter the transform does not understand
    #[error("Unknown axis '{axis}' on line {line_number}")]
    UnknownAxis {
        /// One-based line number in the input stream.
        line_number: usize,
        /// The offending letter.
        axis: char,
    },
}

/// Geometry error type
///
/// Raised by corner fitting and loop offsetting when the input is too
/// degenerate to embellish.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A segment adjacent to a corner has zero length
    #[error("Degenerate segment of length {length}")]
    DegenerateSegment {
        /// The measured segment length.
        length: f64,
    },

    /// Incoming and outgoing directions are nearly antiparallel or reversed
    #[error("Degenerate corner: {reason}")]
    DegenerateCorner {
        /// Which threshold rejected the corner.
        reason: String,
    },

    /// A loop has too few distinct points to enclose area
    #[error("Degenerate loop with {points} distinct points")]
    DegenerateLoop {
        /// Number of distinct points found.
        points: usize,
    },
}

/// Main error type for SkeinPath
///
/// Unified error type that can represent any error in the system.
#[derive(Error, Debug)]
pub enum Error {
    /// G-Code error
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new generic error with a custom message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a G-Code error
    pub fn is_gcode_error(&self) -> bool {
        matches!(self, Error::Gcode(_))
    }

    /// Check if this is a geometry error
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, Error::Geometry(_))
    }
}

/// Result type using SkeinPath Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcode_error_display() {
        let err = GcodeError::InvalidNumber {
            line_number: 12,
            word: 'X',
            value: "1.2.3".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid number '1.2.3' for word 'X' on line 12"
        );
    }

    #[test]
    fn test_geometry_error_display() {
        let err = GeometryError::DegenerateSegment { length: 0.0 };
        assert_eq!(err.to_string(), "Degenerate segment of length 0");
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = GeometryError::DegenerateLoop { points: 2 }.into();
        assert!(err.is_geometry_error());
        assert!(!err.is_gcode_error());

        let err: Error = GcodeError::UnknownAxis {
            line_number: 3,
            axis: 'Q',
        }
        .into();
        assert!(err.is_gcode_error());
        assert_eq!(err.to_string(), "Unknown axis 'Q' on line 3");
    }

    #[test]
    fn test_other_error() {
        let err = Error::other("boom");
        assert!(matches!(err, Error::Other(_)));
        assert_eq!(err.to_string(), "boom");
    }
}
