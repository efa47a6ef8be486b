//! Filter command handler

use crate::commands::FilterArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::handlers::{existing_dir, translator_for};
use covpipe::{filter_stage, CoverageRecord, OwnedRoots};
use std::path::Path;

/// Execute the filter command
pub fn execute_filter(config: &CliConfig, args: &FilterArgs) -> CliResult<()> {
    let base = existing_dir(&args.base)?;
    let roots = OwnedRoots::resolve(&base, &args.owned_roots)?;
    let translator = translator_for(args.translator, args.lcov.as_deref());

    let output = filter_stage(translator.as_ref(), &args.input, &roots, &base, &args.output)?;
    let filtered = CoverageRecord::load(&output)?;

    if !config.verbosity.is_quiet() {
        println!("{}", filter_message(&roots, &output, &filtered));
    }
    Ok(())
}

/// One-line result of a filter
#[must_use]
pub fn filter_message(roots: &OwnedRoots, output: &Path, filtered: &CoverageRecord) -> String {
    let roots: Vec<String> = roots.roots().iter().map(|r| r.display().to_string()).collect();
    format!(
        "Kept {} files under {} in {}",
        filtered.files().len(),
        roots.join(", "),
        output.display()
    )
}
