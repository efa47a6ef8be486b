//! Command handlers
//!
//! Each handler module contains:
//! - The execution logic for a CLI command
//! - Pure helper functions that render its output
//! - Tests

pub mod clean;
pub mod config;
pub mod filter;
pub mod merge;
pub mod run;
pub mod summary;

use crate::commands::TranslatorArg;
use crate::error::{CliError, CliResult};
use covpipe::{Lcov, NativeTranslator, Translator};
use std::path::{Path, PathBuf};

pub use clean::execute_clean;
pub use config::{execute_config, render_config};
pub use filter::execute_filter;
pub use merge::execute_merge;
pub use run::{apply_overrides, execute_run, render_outcome};
pub use summary::{execute_summary, render_summary};

/// Translator selected on the command line
#[must_use]
pub fn translator_for(arg: TranslatorArg, lcov: Option<&Path>) -> Box<dyn Translator> {
    match arg {
        TranslatorArg::Native => Box::new(NativeTranslator::new()),
        TranslatorArg::Lcov => {
            let mut translator = Lcov::new();
            if let Some(program) = lcov {
                translator = translator.with_program(program);
            }
            Box::new(translator)
        }
    }
}

/// Absolute form of an existing directory
pub fn existing_dir(dir: &Path) -> CliResult<PathBuf> {
    let resolved = dir
        .canonicalize()
        .map_err(|e| CliError::invalid_argument(format!("{}: {e}", dir.display())))?;
    if resolved.is_dir() {
        Ok(resolved)
    } else {
        Err(CliError::invalid_argument(format!(
            "{} is not a directory",
            dir.display()
        )))
    }
}
