//! Coverage filter stage
//!
//! Restricts a record to the files under the project's own source roots.
//! Ownership is decided on resolved paths with component-wise prefix
//! matching, so `/proj/src-other/x.rs` is not under `/proj/src` while
//! `/proj/vendor/../src/x.rs` is.

use crate::record::CoverageRecord;
use crate::result::{PipelineError, PipelineResult};
use crate::translator::Translator;
use path_clean::PathClean;
use std::path::{Path, PathBuf};

/// Resolve `path` against `base`
///
/// Existing files are canonicalized (symlinks followed); anything else is
/// normalized lexically.
#[must_use]
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    joined.canonicalize().unwrap_or_else(|_| joined.clean())
}

/// The set of directories whose descendants are "owned" source files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedRoots {
    roots: Vec<PathBuf>,
}

impl OwnedRoots {
    /// Canonicalize `dirs` against `base`
    ///
    /// Every root must exist; an empty list is rejected.
    pub fn resolve<P: AsRef<Path>>(base: &Path, dirs: &[P]) -> PipelineResult<Self> {
        if dirs.is_empty() {
            return Err(PipelineError::invalid_argument("no owned source roots given"));
        }
        let roots = dirs
            .iter()
            .map(|dir| {
                let dir = dir.as_ref();
                let joined = if dir.is_absolute() {
                    dir.to_path_buf()
                } else {
                    base.join(dir)
                };
                joined.canonicalize().map_err(|e| {
                    PipelineError::invalid_argument(format!(
                        "owned root {} cannot be resolved: {e}",
                        joined.display()
                    ))
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;
        Ok(Self { roots })
    }

    /// Use already-resolved roots as given
    #[must_use]
    pub fn from_resolved<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(|r| r.into().clean()).collect(),
        }
    }

    /// The resolved roots
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Whether a resolved path lies under one of the roots
    #[must_use]
    pub fn owns(&self, resolved: &Path) -> bool {
        self.roots.iter().any(|root| resolved.starts_with(root))
    }
}

/// The record restricted to owned files
///
/// Source paths are resolved against `base` before matching; kept entries
/// retain their original `SF:` spelling. Applying it twice changes nothing.
#[must_use]
pub fn filter_record(record: &CoverageRecord, roots: &OwnedRoots, base: &Path) -> CoverageRecord {
    record.retain_files(|path| roots.owns(&resolve_path(base, Path::new(path))))
}

/// Run the filter stage: `input` restricted to `roots`, written to `output`
///
/// The owned `SF:` paths are computed here and handed to the translator as
/// exact patterns, so the translator never decides ownership itself.
pub fn filter_stage(
    translator: &dyn Translator,
    input: &Path,
    roots: &OwnedRoots,
    base: &Path,
    output: &Path,
) -> PipelineResult<PathBuf> {
    let record = CoverageRecord::load(input)?;
    let owned = filter_record(&record, roots, base);
    let dropped = record.files().len() - owned.files().len();

    tracing::info!(
        input = %input.display(),
        kept = owned.files().len(),
        dropped,
        translator = translator.name(),
        "filtering to owned sources"
    );
    for path in record.files().keys().filter(|p| !owned.observes(p)) {
        tracing::debug!(path = %path, "not owned");
    }

    if owned.is_empty() {
        owned.save(output)?;
        return Ok(output.to_path_buf());
    }

    let patterns: Vec<String> = owned.files().keys().cloned().collect();
    translator.extract(input, &patterns, output)?;
    Ok(output.to_path_buf())
}
