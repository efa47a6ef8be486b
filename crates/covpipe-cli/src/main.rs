//! covpipe: instrumented coverage runs for Cargo projects
//!
//! ## Usage
//!
//! ```bash
//! covpipe run                          # Full pipeline with HTML report
//! covpipe run --ci                     # Stop after the final record
//! covpipe merge unit.info integration.info -o coverage.info
//! covpipe filter coverage.info -r src  # Keep only owned sources
//! covpipe summary final.info --files
//! ```

use clap::Parser;
use covpipe_cli::{
    handlers, init_logging, Cli, CliConfig, CliResult, ColorChoice, Commands, LogFormat, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    // Build configuration from CLI args
    let config = build_config(&cli);
    init_logging(&config)?;

    match cli.command {
        Commands::Run(args) => handlers::execute_run(&config, &args),
        Commands::Merge(args) => handlers::execute_merge(&config, &args),
        Commands::Filter(args) => handlers::execute_filter(&config, &args),
        Commands::Summary(args) => handlers::execute_summary(&config, &args),
        Commands::Clean(args) => handlers::execute_clean(&config, &args),
        Commands::Config(args) => handlers::execute_config(&config, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.clone().into();
    let log_format: LogFormat = cli.log_format.into();

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_log_format(log_format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_verbosity() {
        let cli = Cli::parse_from(["covpipe", "-vv", "summary"]);
        assert_eq!(build_config(&cli).verbosity, Verbosity::Debug);

        let cli = Cli::parse_from(["covpipe", "-q", "-v", "summary"]);
        assert_eq!(build_config(&cli).verbosity, Verbosity::Quiet);
    }

    #[test]
    fn test_build_config_log_format() {
        let cli = Cli::parse_from(["covpipe", "--log-format", "json", "clean"]);
        assert_eq!(build_config(&cli).log_format, LogFormat::Json);
    }
}
