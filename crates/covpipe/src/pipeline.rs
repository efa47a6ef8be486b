//! Report pipeline driver
//!
//! Sequences the stages as a linear state machine:
//!
//! ```text
//! Clean -> BuildUnit -> CaptureUnit -> CleanKeepingUnitRecord
//!       -> BuildIntegration -> CaptureIntegration -> Merge -> Filter
//!       -> Render (skipped in CI) -> Done
//! ```
//!
//! Any stage error stops the walk and is returned as a [`PipelineFailure`]
//! naming the state it happened in. Nothing is retried. On failure the
//! merged and final records are removed, so a failed run never publishes a
//! partial `final.info`.

use crate::capture::capture_target;
use crate::filter::{filter_stage, OwnedRoots};
use crate::instrument::{BuildTarget, InstrumentationConfig};
use crate::merge::merge_records;
use crate::record::{CoverageRecord, CoverageSummary};
use crate::render::Renderer;
use crate::result::{PipelineError, PipelineResult};
use crate::toolchain::Toolchain;
use crate::translator::Translator;
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Driver states, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Remove every artifact of earlier runs
    Clean,
    /// Instrumented build of the unit-test target
    BuildUnit,
    /// Run unit tests, capture `unit.info`
    CaptureUnit,
    /// Clean again, keeping only `unit.info`
    CleanKeepingUnitRecord,
    /// Instrumented build of the integration-test target
    BuildIntegration,
    /// Run integration tests, capture `integration.info`
    CaptureIntegration,
    /// Merge both captures
    Merge,
    /// Restrict to owned sources
    Filter,
    /// Render the HTML report
    Render,
    /// Finished
    Done,
}

impl PipelineState {
    /// All states in the order the driver visits them
    pub const ORDER: [Self; 10] = [
        Self::Clean,
        Self::BuildUnit,
        Self::CaptureUnit,
        Self::CleanKeepingUnitRecord,
        Self::BuildIntegration,
        Self::CaptureIntegration,
        Self::Merge,
        Self::Filter,
        Self::Render,
        Self::Done,
    ];

    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::BuildUnit => "build unit tests",
            Self::CaptureUnit => "capture unit coverage",
            Self::CleanKeepingUnitRecord => "clean (keep unit record)",
            Self::BuildIntegration => "build integration tests",
            Self::CaptureIntegration => "capture integration coverage",
            Self::Merge => "merge",
            Self::Filter => "filter",
            Self::Render => "render",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a render failure does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFailurePolicy {
    /// The run fails
    #[default]
    Fatal,
    /// The failure is logged and the run succeeds without a report
    Warn,
}

/// Inputs of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Unit-test target
    pub unit: BuildTarget,
    /// Integration-test target
    pub integration: BuildTarget,
    /// Compiler settings for both builds
    pub instrumentation: InstrumentationConfig,
    /// Source roots whose files are kept by the filter
    pub owned_roots: Vec<PathBuf>,
    /// File name of the merged record
    pub merged_name: String,
    /// File name of the filtered record
    pub final_name: String,
    /// HTML output directory, relative to the workspace root
    pub report_dir: PathBuf,
    /// Skip rendering
    pub ci: bool,
    /// Render failure handling
    pub render_failure: RenderFailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            unit: BuildTarget::unit(),
            integration: BuildTarget::integration("tests"),
            instrumentation: InstrumentationConfig::default(),
            owned_roots: vec![PathBuf::from("src")],
            merged_name: "coverage.info".to_string(),
            final_name: "final.info".to_string(),
            report_dir: PathBuf::from("target/coverage"),
            ci: false,
            render_failure: RenderFailurePolicy::Fatal,
        }
    }
}

impl PipelineConfig {
    /// Default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unit-test target
    #[must_use]
    pub fn with_unit(mut self, target: BuildTarget) -> Self {
        self.unit = target;
        self
    }

    /// Set the integration-test target
    #[must_use]
    pub fn with_integration(mut self, target: BuildTarget) -> Self {
        self.integration = target;
        self
    }

    /// Set the instrumentation
    #[must_use]
    pub fn with_instrumentation(mut self, config: InstrumentationConfig) -> Self {
        self.instrumentation = config;
        self
    }

    /// Replace the owned roots
    #[must_use]
    pub fn with_owned_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.owned_roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Set CI mode
    #[must_use]
    pub const fn with_ci(mut self, ci: bool) -> Self {
        self.ci = ci;
        self
    }

    /// Set the render failure policy
    #[must_use]
    pub const fn with_render_failure(mut self, policy: RenderFailurePolicy) -> Self {
        self.render_failure = policy;
        self
    }

    /// Check that every record written by a run has its own file
    pub fn validate(&self) -> PipelineResult<()> {
        let names = [
            self.unit.record_file_name(),
            self.integration.record_file_name(),
            self.merged_name.clone(),
            self.final_name.clone(),
        ];
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(PipelineError::invalid_argument(format!(
                    "record file `{name}` is used by two stages"
                )));
            }
        }
        if self.owned_roots.is_empty() {
            return Err(PipelineError::invalid_argument("no owned source roots given"));
        }
        Ok(())
    }
}

/// Receives stage transitions, e.g. to drive a progress display
pub trait StageObserver {
    /// A stage is about to run
    fn stage_started(&self, _state: PipelineState) {}

    /// A stage completed
    fn stage_finished(&self, _state: PipelineState) {}

    /// A stage was not run
    fn stage_skipped(&self, _state: PipelineState, _reason: &str) {}

    /// A stage failed
    fn stage_failed(&self, _state: PipelineState, _error: &PipelineError) {}
}

/// A failed run: the state it stopped in and why
#[derive(Debug, Error)]
#[error("{state} failed: {error}")]
pub struct PipelineFailure {
    /// State whose stage failed
    pub state: PipelineState,
    /// Stage error
    #[source]
    pub error: PipelineError,
}

/// A successful run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    /// Path of the filtered record
    pub final_record: PathBuf,
    /// Totals of the filtered record
    pub summary: CoverageSummary,
    /// Whether an HTML report was produced
    pub rendered: bool,
    /// States that completed, in order
    pub completed: Vec<PipelineState>,
}

/// The report pipeline driver
pub struct Pipeline<'a> {
    toolchain: &'a dyn Toolchain,
    translator: &'a dyn Translator,
    renderer: &'a dyn Renderer,
    workspace: Workspace,
    config: PipelineConfig,
    observer: Option<&'a dyn StageObserver>,
}

impl fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("translator", &self.translator.name())
            .field("renderer", &self.renderer.name())
            .field("workspace", &self.workspace)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> Pipeline<'a> {
    /// Create a driver over `workspace`
    #[must_use]
    pub fn new(
        toolchain: &'a dyn Toolchain,
        translator: &'a dyn Translator,
        renderer: &'a dyn Renderer,
        workspace: Workspace,
        config: PipelineConfig,
    ) -> Self {
        Self {
            toolchain,
            translator,
            renderer,
            workspace,
            config,
            observer: None,
        }
    }

    /// Report transitions to `observer`
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn StageObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The workspace
    #[must_use]
    pub const fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// The configuration
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Path of the merged record
    #[must_use]
    pub fn merged_record(&self) -> PathBuf {
        self.workspace.record_path(&self.config.merged_name)
    }

    /// Path of the filtered record
    #[must_use]
    pub fn final_record(&self) -> PathBuf {
        self.workspace.record_path(&self.config.final_name)
    }

    /// Walk every state from `Clean` to `Done`
    pub fn run(&self) -> Result<PipelineOutcome, PipelineFailure> {
        let mut completed = Vec::with_capacity(PipelineState::ORDER.len());
        match self.execute(&mut completed) {
            Ok(outcome) => Ok(outcome),
            Err(failure) => {
                tracing::error!(state = %failure.state, error = %failure.error, "pipeline failed");
                self.discard_outputs();
                Err(failure)
            }
        }
    }

    fn execute(&self, completed: &mut Vec<PipelineState>) -> Result<PipelineOutcome, PipelineFailure> {
        let ws = &self.workspace;
        let cfg = &self.config;
        let unit_record = ws.record_path(&cfg.unit.record_file_name());
        let integration_record = ws.record_path(&cfg.integration.record_file_name());
        let merged = self.merged_record();
        let final_record = self.final_record();

        self.step(PipelineState::Clean, completed, || {
            cfg.validate()?;
            ws.clean().map(drop)
        })?;

        let built = self.step(PipelineState::BuildUnit, completed, || {
            self.toolchain.build(&cfg.unit, &cfg.instrumentation, ws)
        })?;
        let _ = self.step(PipelineState::CaptureUnit, completed, || {
            capture_target(self.toolchain, self.translator, ws, &built, &unit_record)
        })?;

        self.step(PipelineState::CleanKeepingUnitRecord, completed, || {
            ws.preserve_and_clean(std::slice::from_ref(&unit_record)).map(drop)
        })?;

        let built = self.step(PipelineState::BuildIntegration, completed, || {
            self.toolchain.build(&cfg.integration, &cfg.instrumentation, ws)
        })?;
        let _ = self.step(PipelineState::CaptureIntegration, completed, || {
            capture_target(self.toolchain, self.translator, ws, &built, &integration_record)
        })?;

        let _ = self.step(PipelineState::Merge, completed, || {
            merge_records(
                self.translator,
                &[unit_record.clone(), integration_record.clone()],
                &merged,
            )
        })?;

        let summary = self.step(PipelineState::Filter, completed, || {
            let roots = OwnedRoots::resolve(ws.root(), &cfg.owned_roots)?;
            let path = filter_stage(self.translator, &merged, &roots, ws.root(), &final_record)?;
            Ok(CoverageRecord::load(&path)?.summary())
        })?;

        let rendered = self.render_step(&final_record, completed)?;

        self.notify(|o| o.stage_started(PipelineState::Done));
        completed.push(PipelineState::Done);
        self.notify(|o| o.stage_finished(PipelineState::Done));
        tracing::info!(final_record = %final_record.display(), rendered, "pipeline finished");

        Ok(PipelineOutcome {
            final_record,
            summary,
            rendered,
            completed: completed.clone(),
        })
    }

    fn render_step(&self, final_record: &Path, completed: &mut Vec<PipelineState>) -> Result<bool, PipelineFailure> {
        if self.config.ci {
            tracing::info!("CI mode, skipping render");
            self.notify(|o| o.stage_skipped(PipelineState::Render, "CI mode"));
            return Ok(false);
        }

        let out_dir = self.workspace.root().join(&self.config.report_dir);
        match self.step(PipelineState::Render, completed, || {
            self.renderer.render(final_record, &out_dir)
        }) {
            Ok(()) => Ok(true),
            Err(failure) if self.config.render_failure == RenderFailurePolicy::Warn => {
                tracing::warn!(error = %failure.error, "report not rendered");
                Ok(false)
            }
            Err(failure) => Err(failure),
        }
    }

    fn step<T>(
        &self,
        state: PipelineState,
        completed: &mut Vec<PipelineState>,
        stage: impl FnOnce() -> PipelineResult<T>,
    ) -> Result<T, PipelineFailure> {
        tracing::info!(state = %state, "entering state");
        self.notify(|o| o.stage_started(state));
        match stage() {
            Ok(value) => {
                completed.push(state);
                self.notify(|o| o.stage_finished(state));
                Ok(value)
            }
            Err(error) => {
                self.notify(|o| o.stage_failed(state, &error));
                Err(PipelineFailure { state, error })
            }
        }
    }

    fn notify(&self, f: impl FnOnce(&dyn StageObserver)) {
        if let Some(observer) = self.observer {
            f(observer);
        }
    }

    fn discard_outputs(&self) {
        for path in [self.merged_record(), self.final_record()] {
            if path.is_file() {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), error = %e, "could not remove partial output");
                } else {
                    tracing::debug!(path = %path.display(), "removed partial output");
                }
            }
        }
    }
}
