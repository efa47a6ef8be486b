//! Log subscriber setup
//!
//! `RUST_LOG` wins when set; otherwise the level follows `-q`/`-v`. Logs go
//! to stderr so stdout stays machine-readable.

use crate::config::{CliConfig, LogFormat};
use crate::error::{CliError, CliResult};
use tracing_subscriber::EnvFilter;

/// Build the filter for `config`
#[must_use]
pub fn env_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.verbosity.default_filter()))
}

/// Install the global subscriber
pub fn init_logging(config: &CliConfig) -> CliResult<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr);

    let result = match config.log_format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Text => builder
            .with_ansi(config.color.should_color())
            .with_target(false)
            .try_init(),
    };
    result.map_err(|e| CliError::config(format!("cannot install log subscriber: {e}")))
}
