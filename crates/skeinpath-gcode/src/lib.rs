//! # SkeinPath G-Code
//!
//! Turns toolpath text into a typed event list, runs transform stages over
//! that list in place, and serializes it back to text once at the end.

pub mod command;
pub mod emitter;
pub mod parser;
pub mod pipeline;

pub use command::{
    ArcCenter, ArcMove, AxisMask, GcodeLine, LinearMove, ParameterKind, StreamParameters,
    ToolpathEvent,
};
pub use emitter::{format_number, insert_procedure_marker, is_procedure_done, procedure_marker, StreamEmitter};
pub use parser::{ParserState, StreamParser};
pub use pipeline::{PipelineReport, StageHandle, StagePipeline, StageReport, ToolpathStage};
