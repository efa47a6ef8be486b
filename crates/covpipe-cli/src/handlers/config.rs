//! Config command handler: show the effective pipeline file

use crate::commands::{ConfigArgs, ConfigFormat};
use crate::config::{CliConfig, PipelineFile};
use crate::error::CliResult;
use crate::handlers::existing_dir;

/// Execute the config command
pub fn execute_config(_config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    let file = if args.defaults {
        PipelineFile::default()
    } else {
        let root = existing_dir(&args.directory)?;
        PipelineFile::discover(&root, args.config.as_deref())?
    };
    print!("{}", render_config(&file, args.format)?);
    Ok(())
}

/// Pipeline file in the requested format
pub fn render_config(file: &PipelineFile, format: ConfigFormat) -> CliResult<String> {
    match format {
        ConfigFormat::Yaml => file.to_yaml(),
        ConfigFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(file)?)),
    }
}
