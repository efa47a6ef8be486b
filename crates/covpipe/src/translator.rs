//! Counter-to-coverage translation
//!
//! The translator turns a raw counter tree into a tracefile and performs
//! location-wise merging and path extraction on tracefiles. [`Lcov`] drives
//! the `lcov` program; [`NativeTranslator`] does merge and extract in-process
//! on parsed [`CoverageRecord`]s and cannot capture.

use crate::record::CoverageRecord;
use crate::result::{PipelineError, PipelineResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Translator messages meaning "there was nothing to capture"
const NO_DATA_MARKERS: &[&str] = &[
    "no .gcda files found",
    "no data found",
    "no valid records found",
];

/// Inputs of a capture
#[derive(Debug, Clone, Copy)]
pub struct CaptureRequest<'a> {
    /// Target the counters belong to
    pub target: &'a str,
    /// Directory holding the raw counter tree
    pub directory: &'a Path,
    /// Directory relative source paths are resolved against
    pub base_directory: &'a Path,
    /// Tracefile to write
    pub output: &'a Path,
}

/// Converts counters to records, merges records and extracts paths
pub trait Translator {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Translate the counter tree under `request.directory` into one record
    fn capture(&self, request: &CaptureRequest<'_>) -> PipelineResult<()>;

    /// Sum `inputs` location-wise into `output`
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> PipelineResult<()>;

    /// Keep only the files of `input` matching one of `patterns`
    ///
    /// Patterns use lcov's wildcard syntax: `*` and `?` are wildcards,
    /// every other character (brackets included) is literal.
    fn extract(&self, input: &Path, patterns: &[String], output: &Path) -> PipelineResult<()>;
}

/// [`Translator`] backed by the `lcov` program
#[derive(Debug, Clone)]
pub struct Lcov {
    program: PathBuf,
    gcov_tool: Option<PathBuf>,
    branch_coverage: bool,
    exclude_line: Option<String>,
}

impl Default for Lcov {
    fn default() -> Self {
        Self {
            program: PathBuf::from("lcov"),
            gcov_tool: None,
            branch_coverage: true,
            exclude_line: Some("assert".to_string()),
        }
    }
}

impl Lcov {
    /// `lcov` from `PATH` with branch coverage on and assertion lines excluded
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific lcov binary
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Counter tool override (`--gcov-tool`)
    #[must_use]
    pub fn with_gcov_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.gcov_tool = Some(tool.into());
        self
    }

    /// Enable or disable branch coverage
    #[must_use]
    pub const fn with_branch_coverage(mut self, enabled: bool) -> Self {
        self.branch_coverage = enabled;
        self
    }

    /// Regex of source lines excluded from accounting, `None` to keep all
    #[must_use]
    pub fn with_exclude_line(mut self, pattern: Option<String>) -> Self {
        self.exclude_line = pattern;
        self
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.branch_coverage {
            args.push("--rc".to_string());
            args.push("lcov_branch_coverage=1".to_string());
        }
        args
    }

    /// Arguments of a capture run
    #[must_use]
    pub fn capture_args(&self, request: &CaptureRequest<'_>) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ref tool) = self.gcov_tool {
            args.push("--gcov-tool".to_string());
            args.push(tool.display().to_string());
        }
        args.extend(self.common_args());
        if let Some(ref pattern) = self.exclude_line {
            args.push("--rc".to_string());
            args.push(format!("lcov_excl_line={pattern}"));
        }
        args.extend([
            "--capture".to_string(),
            "--directory".to_string(),
            request.directory.display().to_string(),
            "--base-directory".to_string(),
            request.base_directory.display().to_string(),
            "--output-file".to_string(),
            request.output.display().to_string(),
        ]);
        args
    }

    /// Arguments of a merge run
    #[must_use]
    pub fn merge_args(&self, inputs: &[PathBuf], output: &Path) -> Vec<String> {
        let mut args = self.common_args();
        for input in inputs {
            args.push("--add-tracefile".to_string());
            args.push(input.display().to_string());
        }
        args.push("--output-file".to_string());
        args.push(output.display().to_string());
        args
    }

    /// Arguments of an extract run
    #[must_use]
    pub fn extract_args(&self, input: &Path, patterns: &[String], output: &Path) -> Vec<String> {
        let mut args = self.common_args();
        args.push("--extract".to_string());
        args.push(input.display().to_string());
        args.extend(patterns.iter().cloned());
        args.push("--output-file".to_string());
        args.push(output.display().to_string());
        args
    }

    fn run(&self, operation: &'static str, args: &[String], cwd: Option<&Path>) -> PipelineResult<String> {
        let mut cmd = Command::new(&self.program);
        let _ = cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(dir) = cwd {
            let _ = cmd.current_dir(dir);
        }
        tracing::debug!(program = %self.program.display(), operation, ?args, "invoking translator");

        let output = cmd
            .output()
            .map_err(|e| PipelineError::spawn(self.program.display().to_string(), e))?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(text)
        } else {
            Err(PipelineError::Translator {
                program: self.program.display().to_string(),
                operation,
                message: text.trim().to_string(),
            })
        }
    }
}

/// Whether translator output says no counter data was found
#[must_use]
pub fn reports_no_data(output: &str) -> bool {
    let lower = output.to_ascii_lowercase();
    NO_DATA_MARKERS.iter().any(|m| lower.contains(m))
}

impl Translator for Lcov {
    fn name(&self) -> &str {
        "lcov"
    }

    fn capture(&self, request: &CaptureRequest<'_>) -> PipelineResult<()> {
        let no_data = || PipelineError::NoCounterData {
            target: request.target.to_string(),
            directory: request.directory.to_path_buf(),
        };

        let args = self.capture_args(request);
        match self.run("capture", &args, Some(request.base_directory)) {
            Ok(_) => {}
            Err(PipelineError::Translator { ref message, .. }) if reports_no_data(message) => {
                return Err(no_data());
            }
            Err(e) => return Err(e),
        }

        // lcov exits 0 when it skipped every counter file
        if !request.output.is_file() || CoverageRecord::load(request.output)?.is_empty() {
            return Err(no_data());
        }
        Ok(())
    }

    fn merge(&self, inputs: &[PathBuf], output: &Path) -> PipelineResult<()> {
        let args = self.merge_args(inputs, output);
        self.run("merge", &args, None).map(drop)
    }

    fn extract(&self, input: &Path, patterns: &[String], output: &Path) -> PipelineResult<()> {
        let args = self.extract_args(input, patterns, output);
        self.run("extract", &args, None).map(drop)
    }
}

/// In-process [`Translator`] for merge and extract
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeTranslator;

impl NativeTranslator {
    /// Create a native translator
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Translator for NativeTranslator {
    fn name(&self) -> &str {
        "native"
    }

    fn capture(&self, _request: &CaptureRequest<'_>) -> PipelineResult<()> {
        Err(PipelineError::Translator {
            program: "native".to_string(),
            operation: "capture",
            message: "raw counters can only be captured by lcov".to_string(),
        })
    }

    fn merge(&self, inputs: &[PathBuf], output: &Path) -> PipelineResult<()> {
        let records = inputs
            .iter()
            .map(|p| CoverageRecord::load(p))
            .collect::<PipelineResult<Vec<_>>>()?;
        let merged = CoverageRecord::merge_all(&records).unwrap_or_default();
        merged.save(output)
    }

    fn extract(&self, input: &Path, patterns: &[String], output: &Path) -> PipelineResult<()> {
        let patterns = patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(&wildcard_to_glob(p))
                    .map_err(|e| PipelineError::invalid_argument(format!("bad pattern `{p}`: {e}")))
            })
            .collect::<PipelineResult<Vec<_>>>()?;
        let record = CoverageRecord::load(input)?;
        record
            .retain_files(|path| patterns.iter().any(|p| p.matches(path)))
            .save(output)
    }
}

/// Translate an lcov wildcard into a `glob` pattern with literal brackets
fn wildcard_to_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '[' => out.push_str("[[]"),
            ']' => out.push_str("[]]"),
            _ => out.push(c),
        }
    }
    out
}
