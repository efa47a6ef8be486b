//! Record merge step

use crate::result::{PipelineError, PipelineResult};
use crate::translator::Translator;
use std::path::{Path, PathBuf};

/// Combine at least two records into `output` by location-wise summation
///
/// Every input must exist before the translator is invoked. The output may
/// be one of the inputs; nothing is written when validation fails.
pub fn merge_records(translator: &dyn Translator, inputs: &[PathBuf], output: &Path) -> PipelineResult<PathBuf> {
    if inputs.len() < 2 {
        return Err(PipelineError::invalid_argument(format!(
            "merging needs at least two records, got {}",
            inputs.len()
        )));
    }
    if let Some(missing) = inputs.iter().find(|p| !p.is_file()) {
        return Err(PipelineError::MissingInputRecord {
            path: missing.clone(),
        });
    }

    tracing::info!(
        inputs = inputs.len(),
        output = %output.display(),
        translator = translator.name(),
        "merging coverage records"
    );
    translator.merge(inputs, output)?;

    if !output.is_file() {
        return Err(PipelineError::MissingInputRecord {
            path: output.to_path_buf(),
        });
    }
    Ok(output.to_path_buf())
}
