//! The shared working tree
//!
//! Every stage reads and writes the same directory. [`Workspace`] is the
//! single owner of that directory and exposes the only operations that
//! change it: scanning for counter data, removing dep-info files and
//! cleaning with an explicit keep-list.

use crate::result::PipelineResult;
use path_clean::PathClean;
use std::path::{Path, PathBuf};

/// Extension of the per-run counter files emitted by instrumented binaries
pub const COUNTER_EXTENSION: &str = "gcda";

/// Extension of coverage records written at the workspace root
pub const RECORD_EXTENSION: &str = "info";

/// Counter files left on disk by one instrumented run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCounterTree {
    files: Vec<PathBuf>,
}

impl RawCounterTree {
    /// Collect every counter file under `dir`
    #[must_use]
    pub fn scan(dir: &Path) -> Self {
        let mut files = Vec::new();
        scan_files_recursive(dir, COUNTER_EXTENSION, &mut files);
        files.sort();
        Self { files }
    }

    /// Counter file paths, sorted
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Number of counter files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when the run emitted nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Find all files with the given extension recursively
///
/// Hidden directories (`.git`, ...) are skipped.
pub fn scan_files_recursive(dir: &Path, extension: &str, files: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if !name.starts_with('.') {
                    scan_files_recursive(&path, extension, files);
                }
            } else if path.extension().is_some_and(|ext| ext == extension) {
                files.push(path);
            }
        }
    }
}

/// The pipeline's working directory and build directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    target_dir: PathBuf,
}

impl Workspace {
    /// Workspace rooted at `root` with the build directory `root/target`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let target_dir = root.join("target");
        Self { root, target_dir }
    }

    /// Use a different build directory
    #[must_use]
    pub fn with_target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.target_dir = if dir.is_absolute() {
            dir
        } else {
            self.root.join(dir)
        };
        self
    }

    /// Invocation directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build directory
    #[must_use]
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Path of a record file at the workspace root
    #[must_use]
    pub fn record_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Counter files currently on disk
    #[must_use]
    pub fn counter_files(&self) -> RawCounterTree {
        RawCounterTree::scan(&self.root)
    }

    /// Delete the compiler's dep-info file next to a built artifact
    ///
    /// Returns whether a file was removed.
    pub fn remove_dep_info(&self, artifact: &Path) -> PipelineResult<bool> {
        let dep_info = artifact.with_extension("d");
        if dep_info.is_file() {
            std::fs::remove_file(&dep_info)?;
            tracing::debug!(path = %dep_info.display(), "removed dep-info");
            return Ok(true);
        }
        Ok(false)
    }

    /// Delete every counter file on disk, keeping the build output
    ///
    /// Instrumented build scripts and proc-macros run during compilation and
    /// write counters of their own. Returns the number of files removed.
    pub fn remove_counter_files(&self) -> PipelineResult<usize> {
        let counters = self.counter_files();
        for path in counters.files() {
            std::fs::remove_file(path)?;
            tracing::debug!(path = %path.display(), "removed build-time counter file");
        }
        Ok(counters.len())
    }

    /// Return the workspace to its initial state
    pub fn clean(&self) -> PipelineResult<CleanReport> {
        self.preserve_and_clean(&[])
    }

    /// Remove build output, counter files and root-level records, except
    /// the paths in `keep`
    ///
    /// Relative keep paths are resolved against the workspace root. A kept
    /// file inside the build directory keeps its parent directories alive.
    pub fn preserve_and_clean(&self, keep: &[PathBuf]) -> PipelineResult<CleanReport> {
        let keep: Vec<PathBuf> = keep.iter().map(|p| self.normalize(p)).collect();
        let mut report = CleanReport::default();

        if self.target_dir.exists() {
            self.remove_tree(&self.target_dir, &keep, &mut report)?;
        }

        for counter in self.counter_files().files() {
            if !keep.contains(&self.normalize(counter)) {
                std::fs::remove_file(counter)?;
                report.removed_files += 1;
            }
        }

        let mut records = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() && path.extension().is_some_and(|e| e == RECORD_EXTENSION) {
                    records.push(path);
                }
            }
        }
        for record in records {
            if keep.contains(&self.normalize(&record)) {
                report.preserved.push(record);
            } else {
                std::fs::remove_file(&record)?;
                report.removed_files += 1;
            }
        }

        tracing::info!(
            root = %self.root.display(),
            removed_files = report.removed_files,
            removed_dirs = report.removed_dirs,
            preserved = report.preserved.len(),
            "workspace cleaned"
        );
        Ok(report)
    }

    fn remove_tree(&self, dir: &Path, keep: &[PathBuf], report: &mut CleanReport) -> PipelineResult<()> {
        let dir_norm = self.normalize(dir);
        if !keep.iter().any(|k| k.starts_with(&dir_norm)) {
            std::fs::remove_dir_all(dir)?;
            report.removed_dirs += 1;
            return Ok(());
        }
        for entry in std::fs::read_dir(dir)?.flatten() {
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.remove_tree(&path, keep, report)?;
            } else if keep.contains(&self.normalize(&path)) {
                report.preserved.push(path);
            } else {
                std::fs::remove_file(&path)?;
                report.removed_files += 1;
            }
        }
        Ok(())
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.starts_with(&self.root) {
            path.clean()
        } else {
            self.root.join(path).clean()
        }
    }
}

/// What a cleanup removed and kept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Files deleted one by one
    pub removed_files: usize,
    /// Directory trees deleted whole
    pub removed_dirs: usize,
    /// Kept paths that were present
    pub preserved: Vec<PathBuf>,
}
