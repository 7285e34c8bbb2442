//! # SkeinPath
//!
//! A toolpath post-processor for skein-style 3D printer G-code:
//! - Combing: travel moves that would cross a hole are routed around it
//!   along an inset corridor, perimeter seams are jittered per layer
//! - Filleting: sharp extrusion corners are replaced by a bevel, an arc
//!   of short segments, or a native `G2`/`G3` arc
//!
//! ## Architecture
//!
//! SkeinPath is organized as a workspace with multiple crates:
//!
//! 1. **skeinpath-core** - Points, polygon helpers, loop ids, errors
//! 2. **skeinpath-gcode** - Stream parsing, the stage pipeline, emission
//! 3. **skeinpath-camtools** - Layer store, corridors, comb and fillet stages
//! 4. **skeinpath-settings** - Configuration files and validation
//! 5. **skeinpath** - This crate: wiring and the command-line runner
//!
//! The stream is parsed once into an event list, every stage transforms the
//! list in place, and the result is serialized once.

use std::sync::Arc;

pub use skeinpath_camtools::{CombParameters, CombStage, FilletParameters, FilletStage};
pub use skeinpath_core::{Error, FilletMode, Result};
pub use skeinpath_gcode::{PipelineReport, StagePipeline, StreamEmitter, StreamParser};
pub use skeinpath_settings::{default_config_path, Config};

use skeinpath_gcode::StreamParameters;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Pretty console output on stderr, leaving stdout to the toolpath
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Stream defaults taken from the configuration
pub fn stream_parameters(config: &Config) -> StreamParameters {
    StreamParameters {
        extrusion_width: config.stream.extrusion_width,
        fill_inset: config.stream.fill_inset,
        bridge_extrusion_width_over_solid: config.stream.bridge_extrusion_width_over_solid,
        decimal_places: config.output.decimal_places,
    }
}

/// Comb and fillet stages, in that order
pub fn build_pipeline(config: &Config) -> StagePipeline {
    let stream = stream_parameters(config);
    let comb = CombParameters {
        enabled: config.comb.enabled,
        stream,
        jitter_over_perimeter_width: config.comb.jitter_over_perimeter_width,
        arrival_inset_follow_distance_over_inset_width: config
            .comb
            .arrival_inset_follow_distance_over_inset_width,
        minimum_departure_distance_over_perimeter_width: config
            .comb
            .minimum_departure_distance_over_perimeter_width,
    };
    let fillet = FilletParameters {
        enabled: config.fillet.enabled,
        mode: config.fillet.mode,
        fillet_radius_over_half_extrusion_width: config.fillet.fillet_radius_over_half_extrusion_width,
        stream,
    };

    let mut pipeline = StagePipeline::new();
    pipeline
        .register(Arc::new(CombStage::new(comb)))
        .register(Arc::new(FilletStage::new(fillet)));
    pipeline
}

/// Output of one run
#[derive(Debug, Clone)]
pub struct ProcessedText {
    pub text: String,
    pub report: PipelineReport,
}

/// Run every enabled stage over `text`
///
/// When no stage runs, because the input is empty, every stage is disabled,
/// or every stage marker is already present, the input is returned byte for
/// byte.
pub fn process_text(text: &str, config: &Config) -> ProcessedText {
    let mut lines = StreamParser::new().parse_text(text);
    let report = build_pipeline(config).run(&mut lines);
    if !report.any_ran() {
        return ProcessedText {
            text: text.to_string(),
            report,
        };
    }

    let text = StreamEmitter::new(config.output.decimal_places).emit(&lines);
    ProcessedText { text, report }
}
