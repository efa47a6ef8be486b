//! Result and error types for covpipe.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while producing coverage
///
/// None of these are retried: every variant describes a systemic problem
/// (broken build, failing tests, inactive instrumentation) that needs an
/// operator to fix it.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The compiler rejected the target
    #[error("Build of `{target}` failed:\n{stderr}")]
    BuildFailure {
        /// Target name
        target: String,
        /// Compiler output, verbatim
        stderr: String,
    },

    /// An instrumented test artifact exited unsuccessfully
    #[error("Tests of `{target}` failed ({} exited with {})", .artifact.display(), exit_label(.code))]
    TestFailure {
        /// Target name
        target: String,
        /// Artifact that failed
        artifact: PathBuf,
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
    },

    /// No counter files were produced; instrumentation was not active
    #[error("No counter data found for `{target}` under {}: is the instrumented runtime linked?", .directory.display())]
    NoCounterData {
        /// Target name
        target: String,
        /// Directory that was scanned
        directory: PathBuf,
    },

    /// Counter files from an earlier run are still present
    #[error("Workspace {} still holds {count} counter file(s) from a previous run", .directory.display())]
    StaleCounterData {
        /// Workspace root
        directory: PathBuf,
        /// Number of leftover files
        count: usize,
    },

    /// A stage was handed a record path that does not exist
    #[error("Coverage record not found: {}", .path.display())]
    MissingInputRecord {
        /// Missing path
        path: PathBuf,
    },

    /// Report generation failed
    #[error("Report rendering failed: {message}")]
    RenderFailure {
        /// Error message
        message: String,
    },

    /// The translator exited unsuccessfully for another reason
    #[error("{program} {operation} failed: {message}")]
    Translator {
        /// Translator program
        program: String,
        /// Operation (capture, merge, extract)
        operation: &'static str,
        /// Translator output
        message: String,
    },

    /// An external program could not be started
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A tracefile line could not be parsed
    #[error("Invalid coverage record {}:{line}: {message}", .path.display())]
    InvalidRecord {
        /// Tracefile path (or `<memory>`)
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[allow(clippy::ref_option)]
fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
}

impl PipelineError {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a render failure
    #[must_use]
    pub fn render(message: impl Into<String>) -> Self {
        Self::RenderFailure {
            message: message.into(),
        }
    }

    /// Create a spawn error for `program`
    #[must_use]
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// True for errors that mean instrumentation was never active
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::NoCounterData { .. } | Self::InvalidArgument { .. })
    }
}
