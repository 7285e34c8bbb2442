//! Toolpath stage pipeline
//!
//! Stages transform the shared line list in place, in registration order.
//! Each stage is identified by the name written into its completion marker;
//! a stage whose marker is already present is skipped.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::command::GcodeLine;
use super::emitter::{insert_procedure_marker, is_procedure_done};

/// Counters a stage reports after one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    /// Stage name
    pub stage: String,
    /// True when the stage found its own marker and did nothing
    pub skipped: bool,
    /// Named event counts, for example `missing_corridor`
    pub counters: BTreeMap<String, usize>,
}

impl StageReport {
    /// Create an empty report for `stage`
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ..Self::default()
        }
    }

    /// Report for a stage that was already done
    pub fn skipped(stage: impl Into<String>) -> Self {
        Self {
            skipped: true,
            ..Self::new(stage)
        }
    }

    /// Increase counter `key` by `amount`
    pub fn add(&mut self, key: &str, amount: usize) {
        *self.counters.entry(key.to_string()).or_insert(0) += amount;
    }

    /// Increase counter `key` by one
    pub fn increment(&mut self, key: &str) {
        self.add(key, 1);
    }

    /// Value of counter `key`, zero when never counted
    pub fn count(&self, key: &str) -> usize {
        self.counters.get(key).copied().unwrap_or(0)
    }
}

/// Reports from every stage of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    /// True when at least one stage ran
    pub fn any_ran(&self) -> bool {
        self.stages.iter().any(|s| !s.skipped)
    }

    /// Report for the stage called `name`
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == name)
    }

    /// Sum of counter `key` across stages
    pub fn total(&self, key: &str) -> usize {
        self.stages.iter().map(|s| s.count(key)).sum()
    }
}

/// A transform over the whole toolpath
///
/// Implementations walk the line list once or more and may insert or replace
/// lines next to the event that triggered them, but never reorder unrelated
/// lines.
pub trait ToolpathStage: Send + Sync {
    /// Name written into the completion marker
    fn name(&self) -> &str;

    /// Get a description of what this stage does
    fn description(&self) -> &str;

    /// Transform `lines` in place and report what happened
    fn process(&self, lines: &mut Vec<GcodeLine>) -> StageReport;

    /// Check if this stage is enabled
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Arc-wrapped stage for thread-safe sharing
pub type StageHandle = Arc<dyn ToolpathStage>;

/// Ordered list of toolpath stages
///
/// # Example
/// ```ignore
/// let mut pipeline = StagePipeline::new();
/// pipeline.register(Arc::new(CombStage::new(comb_parameters)));
/// pipeline.register(Arc::new(FilletStage::new(fillet_parameters)));
///
/// let report = pipeline.run(&mut lines);
/// ```
#[derive(Default)]
pub struct StagePipeline {
    stages: Vec<StageHandle>,
}

impl StagePipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Register a stage; stages run in registration order
    pub fn register(&mut self, stage: StageHandle) -> &mut Self {
        self.stages.push(stage);
        self
    }

    /// Run every enabled stage over `lines`
    ///
    /// An empty stream is left empty; no marker is added to it.
    pub fn run(&self, lines: &mut Vec<GcodeLine>) -> PipelineReport {
        let mut report = PipelineReport::default();
        if lines.is_empty() {
            return report;
        }

        for stage in &self.stages {
            if !stage.is_enabled() {
                tracing::debug!("Stage '{}' disabled", stage.name());
                continue;
            }
            if is_procedure_done(lines, stage.name()) {
                tracing::debug!("Stage '{}' already done, passing through", stage.name());
                report.stages.push(StageReport::skipped(stage.name()));
                continue;
            }

            tracing::debug!("Running stage '{}': {}", stage.name(), stage.description());
            let stage_report = stage.process(lines);
            insert_procedure_marker(lines, stage.name());
            tracing::info!(
                "Stage '{}' finished: {:?}",
                stage.name(),
                stage_report.counters
            );
            report.stages.push(stage_report);
        }
        report
    }
}
