//! Counter Capture Step
//!
//! Runs every artifact of a built target and translates the counter files
//! they leave behind into `<target>.info`. Precondition: the workspace holds
//! no counter data. Postcondition: the record exists and is non-empty.

use crate::instrument::BuiltTarget;
use crate::result::{PipelineError, PipelineResult};
use crate::toolchain::Toolchain;
use crate::translator::{CaptureRequest, Translator};
use crate::workspace::Workspace;
use std::path::{Path, PathBuf};

/// Execute `built` and capture its counters into `output`
///
/// A failing artifact aborts before the translator runs, so no record is
/// written for a target whose tests fail.
pub fn capture_target(
    toolchain: &dyn Toolchain,
    translator: &dyn Translator,
    workspace: &Workspace,
    built: &BuiltTarget,
    output: &Path,
) -> PipelineResult<PathBuf> {
    let target = &built.target.name;

    let stale = workspace.counter_files();
    if !stale.is_empty() {
        return Err(PipelineError::StaleCounterData {
            directory: workspace.root().to_path_buf(),
            count: stale.len(),
        });
    }

    for artifact in &built.artifacts {
        let status = toolchain.run_artifact(artifact, workspace)?;
        if !status.success() {
            tracing::warn!(build = %target, artifact = %artifact.display(), code = ?status.code, "tests failed");
            return Err(PipelineError::TestFailure {
                target: target.clone(),
                artifact: artifact.clone(),
                code: status.code,
            });
        }
    }

    let counters = workspace.counter_files();
    if counters.is_empty() {
        return Err(PipelineError::NoCounterData {
            target: target.clone(),
            directory: workspace.root().to_path_buf(),
        });
    }
    tracing::info!(build = %target, counter_files = counters.len(), translator = translator.name(), "capturing counters");

    translator.capture(&CaptureRequest {
        target,
        directory: workspace.root(),
        base_directory: workspace.root(),
        output,
    })?;

    if !output.is_file() {
        return Err(PipelineError::NoCounterData {
            target: target.clone(),
            directory: workspace.root().to_path_buf(),
        });
    }
    Ok(output.to_path_buf())
}
