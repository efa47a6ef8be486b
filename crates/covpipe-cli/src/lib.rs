//! covpipe CLI library
//!
//! Command definitions, configuration, handlers and terminal output for the
//! `covpipe` binary.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod logging;
mod output;

pub use commands::{
    CleanArgs, Cli, ColorArg, Commands, ConfigArgs, ConfigFormat, FilterArgs, LogFormatArg,
    MergeArgs, RenderFailureArg, RunArgs, SummaryArgs, SummaryFormat, TranslatorArg,
};
pub use config::{CliConfig, ColorChoice, LogFormat, PipelineFile, Verbosity, PIPELINE_FILE_NAME};
pub use error::{CliError, CliResult};
pub use logging::{env_filter, init_logging};
pub use output::{format_file_table, format_summary, ProgressReporter};
