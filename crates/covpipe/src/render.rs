//! HTML report rendering
//!
//! The renderer is a pure consumer of the final record. [`GenHtml`] drives
//! the `genhtml` program.

use crate::result::{PipelineError, PipelineResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Turns a coverage record into a human-readable report
pub trait Renderer {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Render `input` into `out_dir`
    fn render(&self, input: &Path, out_dir: &Path) -> PipelineResult<()>;
}

/// [`Renderer`] backed by `genhtml`
#[derive(Debug, Clone)]
pub struct GenHtml {
    program: PathBuf,
    branch_coverage: bool,
    demangle: bool,
    ignore_source_errors: bool,
}

impl Default for GenHtml {
    fn default() -> Self {
        Self {
            program: PathBuf::from("genhtml"),
            branch_coverage: true,
            demangle: true,
            ignore_source_errors: true,
        }
    }
}

impl GenHtml {
    /// `genhtml` from `PATH` with branch coverage and demangling
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific genhtml binary
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Show branch coverage in the report
    #[must_use]
    pub const fn with_branch_coverage(mut self, enabled: bool) -> Self {
        self.branch_coverage = enabled;
        self
    }

    /// Arguments of a render run
    #[must_use]
    pub fn args(&self, input: &Path, out_dir: &Path) -> Vec<String> {
        let mut args = vec![
            input.display().to_string(),
            "--output-directory".to_string(),
            out_dir.display().to_string(),
        ];
        if self.branch_coverage {
            args.push("--branch-coverage".to_string());
        }
        if self.demangle {
            args.push("--demangle-cpp".to_string());
        }
        if self.ignore_source_errors {
            args.push("--ignore-errors".to_string());
            args.push("source".to_string());
        }
        args
    }
}

impl Renderer for GenHtml {
    fn name(&self) -> &str {
        "genhtml"
    }

    fn render(&self, input: &Path, out_dir: &Path) -> PipelineResult<()> {
        if !input.is_file() {
            return Err(PipelineError::MissingInputRecord {
                path: input.to_path_buf(),
            });
        }
        tracing::info!(input = %input.display(), out_dir = %out_dir.display(), "rendering HTML report");

        let output = Command::new(&self.program)
            .args(self.args(input, out_dir))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| PipelineError::render(format!("failed to start {}: {e}", self.program.display())))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(PipelineError::render(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}
