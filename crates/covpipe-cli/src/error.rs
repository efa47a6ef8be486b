//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// The pipeline stopped in a stage
    #[error("Pipeline failed in state `{}`: {}", .0.state, .0.error)]
    Pipeline(#[from] covpipe::PipelineFailure),

    /// A single stage run from its own subcommand failed
    #[error("{0}")]
    Stage(#[from] covpipe::PipelineError),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use covpipe::{PipelineError, PipelineFailure, PipelineState};
    use std::path::PathBuf;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("bad arg");
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_pipeline_failure_names_state() {
        let failure = PipelineFailure {
            state: PipelineState::CaptureUnit,
            error: PipelineError::TestFailure {
                target: "unit".into(),
                artifact: PathBuf::from("target/debug/deps/mesabox-1a2b"),
                code: Some(101),
            },
        };
        let err: CliError = failure.into();
        let text = err.to_string();
        assert!(text.contains("capture unit coverage"));
        assert!(text.contains("status 101"));
    }

    #[test]
    fn test_stage_error_passes_message_through() {
        let err: CliError = PipelineError::MissingInputRecord {
            path: PathBuf::from("unit.info"),
        }
        .into();
        assert_eq!(err.to_string(), "Coverage record not found: unit.info");
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }
}
