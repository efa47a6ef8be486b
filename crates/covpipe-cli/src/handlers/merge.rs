//! Merge command handler

use crate::commands::MergeArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::handlers::translator_for;
use covpipe::{merge_records, CoverageRecord};
use std::path::Path;

/// Execute the merge command
pub fn execute_merge(config: &CliConfig, args: &MergeArgs) -> CliResult<()> {
    let translator = translator_for(args.translator, args.lcov.as_deref());
    let output = merge_records(translator.as_ref(), &args.inputs, &args.output)?;
    let merged = CoverageRecord::load(&output)?;

    if !config.verbosity.is_quiet() {
        println!("{}", merge_message(args.inputs.len(), &output, &merged));
    }
    Ok(())
}

/// One-line result of a merge
#[must_use]
pub fn merge_message(inputs: usize, output: &Path, merged: &CoverageRecord) -> String {
    format!(
        "Merged {inputs} records into {} ({} files)",
        output.display(),
        merged.files().len()
    )
}
