//! covpipe: coverage pipeline for Cargo projects
//!
//! Builds the unit-test and integration-test binaries with counter
//! instrumentation, runs them, captures their counters as LCOV records,
//! merges the two captures and filters the result down to the project's
//! own sources. An HTML report is rendered on request.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │ build    │──►│ capture  │──►│ merge    │──►│ filter   │──►│ render   │
//! │ (cargo)  │   │ (lcov)   │   │ (lcov -a)│   │ (extract)│   │ (genhtml)│
//! └──────────┘   └──────────┘   └──────────┘   └──────────┘   └──────────┘
//!       ▲  unit, then integration      │
//!       └──── Workspace (shared dir) ──┘
//! ```
//!
//! External programs sit behind the [`Toolchain`], [`Translator`] and
//! [`Renderer`] traits; [`Pipeline`] sequences the stages.

#![warn(missing_docs)]

mod capture;
mod filter;
mod instrument;
mod merge;
mod pipeline;
pub mod record;
mod render;
mod result;
mod toolchain;
mod translator;
mod workspace;

pub use capture::capture_target;
pub use filter::{filter_record, filter_stage, resolve_path, OwnedRoots};
pub use instrument::{ArtifactKind, BuildTarget, BuiltTarget, InstrumentationConfig};
pub use merge::merge_records;
pub use pipeline::{
    Pipeline, PipelineConfig, PipelineFailure, PipelineOutcome, PipelineState, RenderFailurePolicy,
    StageObserver,
};
pub use record::{
    parse_lcov, BranchId, CoverageRecord, CoverageSummary, FileCoverage, FunctionCoverage,
    LcovFormatter,
};
pub use render::{GenHtml, Renderer};
pub use result::{PipelineError, PipelineResult};
pub use toolchain::{parse_artifacts, CargoToolchain, RunStatus, Toolchain};
pub use translator::{reports_no_data, CaptureRequest, Lcov, NativeTranslator, Translator};
pub use workspace::{
    scan_files_recursive, CleanReport, RawCounterTree, Workspace, COUNTER_EXTENSION,
    RECORD_EXTENSION,
};
