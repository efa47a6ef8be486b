//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use covpipe::RenderFailurePolicy;
use std::path::PathBuf;

/// covpipe: instrumented coverage for Cargo projects
#[derive(Parser, Debug)]
#[command(name = "covpipe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline: build, capture, merge, filter, render
    Run(RunArgs),

    /// Merge coverage records
    Merge(MergeArgs),

    /// Restrict a coverage record to owned source roots
    Filter(FilterArgs),

    /// Print line, function and branch totals of a coverage record
    Summary(SummaryArgs),

    /// Remove build output, counter files and coverage records
    Clean(CleanArgs),

    /// Show the effective pipeline configuration
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Project directory (the workspace every stage works in)
    #[arg(short = 'C', long, default_value = ".")]
    pub directory: PathBuf,

    /// Pipeline file (defaults to covpipe.yaml in the project directory)
    #[arg(short, long, env = "COVPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// CI mode: skip HTML rendering
    #[arg(long, env = "CI", value_parser = clap::builder::FalseyValueParser::new())]
    pub ci: bool,

    /// Package to build
    #[arg(short, long)]
    pub package: Option<String>,

    /// Integration test to run (file name under tests/, without extension)
    #[arg(long)]
    pub integration_test: Option<String>,

    /// Features to enable for both builds
    #[arg(short = 'F', long, value_delimiter = ',')]
    pub features: Vec<String>,

    /// Enable all features
    #[arg(long)]
    pub all_features: bool,

    /// Build with the release profile
    #[arg(long)]
    pub release: bool,

    /// Owned source root (repeatable)
    #[arg(short = 'r', long = "owned-root")]
    pub owned_roots: Vec<PathBuf>,

    /// HTML report directory
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// What a failed render does to the run
    #[arg(long)]
    pub render_failure: Option<RenderFailureArg>,

    /// lcov binary
    #[arg(long, env = "COVPIPE_LCOV")]
    pub lcov: Option<PathBuf>,

    /// Counter tool handed to lcov (--gcov-tool)
    #[arg(long, env = "COVPIPE_GCOV_TOOL")]
    pub gcov_tool: Option<PathBuf>,

    /// genhtml binary
    #[arg(long, env = "COVPIPE_GENHTML")]
    pub genhtml: Option<PathBuf>,

    /// Output format of the final summary
    #[arg(long, default_value = "text")]
    pub format: SummaryFormat,
}

/// Arguments for the merge command
#[derive(Parser, Debug)]
pub struct MergeArgs {
    /// Records to merge (at least two)
    #[arg(required = true, num_args = 2..)]
    pub inputs: Vec<PathBuf>,

    /// Output record
    #[arg(short, long, default_value = "coverage.info")]
    pub output: PathBuf,

    /// Merge implementation
    #[arg(long, default_value = "lcov")]
    pub translator: TranslatorArg,

    /// lcov binary
    #[arg(long, env = "COVPIPE_LCOV")]
    pub lcov: Option<PathBuf>,
}

/// Arguments for the filter command
#[derive(Parser, Debug)]
pub struct FilterArgs {
    /// Record to filter
    #[arg(default_value = "coverage.info")]
    pub input: PathBuf,

    /// Output record
    #[arg(short, long, default_value = "final.info")]
    pub output: PathBuf,

    /// Owned source root (repeatable)
    #[arg(short = 'r', long = "owned-root", default_value = "src")]
    pub owned_roots: Vec<PathBuf>,

    /// Directory relative roots and source paths are resolved against
    #[arg(long, default_value = ".")]
    pub base: PathBuf,

    /// Extract implementation
    #[arg(long, default_value = "lcov")]
    pub translator: TranslatorArg,

    /// lcov binary
    #[arg(long, env = "COVPIPE_LCOV")]
    pub lcov: Option<PathBuf>,
}

/// Arguments for the summary command
#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Record to summarize
    #[arg(default_value = "final.info")]
    pub input: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: SummaryFormat,

    /// Also list per-file line coverage
    #[arg(long)]
    pub files: bool,
}

/// Arguments for the clean command
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Project directory
    #[arg(short = 'C', long, default_value = ".")]
    pub directory: PathBuf,

    /// Path to keep (repeatable)
    #[arg(short, long)]
    pub keep: Vec<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Project directory
    #[arg(short = 'C', long, default_value = ".")]
    pub directory: PathBuf,

    /// Pipeline file (defaults to covpipe.yaml in the project directory)
    #[arg(short, long, env = "COVPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print built-in defaults, ignoring any pipeline file
    #[arg(long)]
    pub defaults: bool,

    /// Output format
    #[arg(long, default_value = "yaml")]
    pub format: ConfigFormat,
}

/// Merge and extract implementation
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TranslatorArg {
    /// The lcov program
    #[default]
    Lcov,
    /// In-process, no external program
    Native,
}

/// Render failure handling
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderFailureArg {
    /// Fail the run
    #[default]
    Fatal,
    /// Log a warning and succeed
    Warn,
}

impl From<RenderFailureArg> for RenderFailurePolicy {
    fn from(arg: RenderFailureArg) -> Self {
        match arg {
            RenderFailureArg::Fatal => Self::Fatal,
            RenderFailureArg::Warn => Self::Warn,
        }
    }
}

/// Summary output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SummaryFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

/// Configuration output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML, the pipeline file format
    #[default]
    Yaml,
    /// JSON
    Json,
}

/// Log line format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl From<LogFormatArg> for crate::config::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
