//! Coverage records ("info files")
//!
//! A [`CoverageRecord`] maps source file paths to per-line execution counts,
//! per-branch taken counts and per-function entry counts. Records are plain
//! values: merging or filtering one produces a new record and leaves the
//! inputs untouched.
//!
//! A file missing from [`CoverageRecord::files`] was never observed. That is
//! not the same as a file present with every count at zero.

mod lcov;
mod summary;

pub use lcov::{parse_lcov, LcovFormatter};
pub use summary::CoverageSummary;

use crate::result::{PipelineError, PipelineResult};
use std::collections::BTreeMap;
use std::path::Path;

/// Identifies one branch arm: `BRDA:<line>,<block>,<branch>,...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchId {
    /// Source line
    pub line: u32,
    /// Basic block number
    pub block: u32,
    /// Branch number within the block
    pub branch: u32,
}

impl BranchId {
    /// Create a branch identifier
    #[must_use]
    pub const fn new(line: u32, block: u32, branch: u32) -> Self {
        Self {
            line,
            block,
            branch,
        }
    }
}

/// Entry count of one function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FunctionCoverage {
    /// First line of the function; `None` until an `FN` line names it
    pub start_line: Option<u32>,
    /// Number of times the function was entered
    pub hits: u64,
}

/// Earlier of two start lines, ignoring unknown ones
fn earliest(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Coverage of one source file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileCoverage {
    /// Line number to execution count
    pub lines: BTreeMap<u32, u64>,
    /// Branch arm to taken count; `None` means the enclosing block never ran
    pub branches: BTreeMap<BranchId, Option<u64>>,
    /// Function name to entry count
    pub functions: BTreeMap<String, FunctionCoverage>,
}

impl FileCoverage {
    /// Create empty file coverage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` executions of `line`
    pub fn record_line(&mut self, line: u32, count: u64) {
        let entry = self.lines.entry(line).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Record a branch arm; `None` marks an arm whose block never ran
    pub fn record_branch(&mut self, id: BranchId, taken: Option<u64>) {
        let entry = self.branches.entry(id).or_insert(None);
        *entry = add_taken(*entry, taken);
    }

    /// Record a function declared at `start_line`
    pub fn record_function(&mut self, name: &str, start_line: u32) {
        let entry = self.functions.entry(name.to_string()).or_default();
        entry.start_line = earliest(entry.start_line, Some(start_line));
    }

    /// Record `hits` entries into function `name`
    pub fn record_function_hits(&mut self, name: &str, hits: u64) {
        let entry = self.functions.entry(name.to_string()).or_default();
        entry.hits = entry.hits.saturating_add(hits);
    }

    /// Pointwise sum of two file coverages
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (&line, &count) in &other.lines {
            merged.record_line(line, count);
        }
        for (&id, &taken) in &other.branches {
            merged.record_branch(id, taken);
        }
        for (name, func) in &other.functions {
            match merged.functions.get_mut(name) {
                Some(existing) => {
                    existing.start_line = earliest(existing.start_line, func.start_line);
                    existing.hits = existing.hits.saturating_add(func.hits);
                }
                None => {
                    let _ = merged.functions.insert(name.clone(), *func);
                }
            }
        }
        merged
    }

    /// Number of lines executed at least once
    #[must_use]
    pub fn lines_hit(&self) -> usize {
        self.lines.values().filter(|&&c| c > 0).count()
    }

    /// Execution count of `line`, `None` when the line is not instrumented
    #[must_use]
    pub fn line_count(&self, line: u32) -> Option<u64> {
        self.lines.get(&line).copied()
    }
}

fn add_taken(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) | (None, Some(x)) => Some(x),
        (Some(x), Some(y)) => Some(x.saturating_add(y)),
    }
}

/// A translated, self-contained coverage dataset
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoverageRecord {
    test_name: Option<String>,
    files: BTreeMap<String, FileCoverage>,
}

impl CoverageRecord {
    /// Create an empty record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty record carrying a test name (`TN:`)
    #[must_use]
    pub fn with_test_name(name: impl Into<String>) -> Self {
        Self {
            test_name: Some(name.into()),
            files: BTreeMap::new(),
        }
    }

    /// Test name, if any
    #[must_use]
    pub fn test_name(&self) -> Option<&str> {
        self.test_name.as_deref()
    }

    /// Per-file coverage keyed by source path as written in the tracefile
    #[must_use]
    pub const fn files(&self) -> &BTreeMap<String, FileCoverage> {
        &self.files
    }

    /// Coverage of one file
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&FileCoverage> {
        self.files.get(path)
    }

    /// Whether `path` was observed at all
    #[must_use]
    pub fn observes(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// True when the record observes no files
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Mutable coverage of `path`, inserting an empty entry when absent
    pub fn file_mut(&mut self, path: impl Into<String>) -> &mut FileCoverage {
        self.files.entry(path.into()).or_default()
    }

    /// Add a whole file, summing with any coverage already recorded for it
    pub fn insert_file(&mut self, path: impl Into<String>, coverage: FileCoverage) {
        let path = path.into();
        let merged = match self.files.get(&path) {
            Some(existing) => existing.merge(&coverage),
            None => coverage,
        };
        let _ = self.files.insert(path, merged);
    }

    /// Pointwise sum over the union of both file sets
    ///
    /// Commutative and associative. Entries present on only one side carry
    /// through unchanged. The test name survives only when both sides agree.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (path, coverage) in &other.files {
            merged.insert_file(path.clone(), coverage.clone());
        }
        merged.test_name = match (&self.test_name, &other.test_name) {
            (Some(a), Some(b)) if a == b => Some(a.clone()),
            _ => None,
        };
        merged
    }

    /// Fold any number of records with [`CoverageRecord::merge`]
    #[must_use]
    pub fn merge_all<'a>(records: impl IntoIterator<Item = &'a Self>) -> Option<Self> {
        records
            .into_iter()
            .fold(None, |acc: Option<Self>, record| match acc {
                None => Some(record.clone()),
                Some(acc) => Some(acc.merge(record)),
            })
    }

    /// New record holding only the files accepted by `keep`
    #[must_use]
    pub fn retain_files(&self, mut keep: impl FnMut(&str) -> bool) -> Self {
        Self {
            test_name: self.test_name.clone(),
            files: self
                .files
                .iter()
                .filter(|(path, _)| keep(path))
                .map(|(path, cov)| (path.clone(), cov.clone()))
                .collect(),
        }
    }

    /// Line, function and branch totals
    #[must_use]
    pub fn summary(&self) -> CoverageSummary {
        CoverageSummary::of(self)
    }

    /// Parse LCOV text
    pub fn from_lcov(text: &str) -> PipelineResult<Self> {
        parse_lcov(text, Path::new("<memory>"))
    }

    /// Read and parse a tracefile
    ///
    /// A missing file is reported as [`PipelineError::MissingInputRecord`].
    pub fn load(path: &Path) -> PipelineResult<Self> {
        if !path.is_file() {
            return Err(PipelineError::MissingInputRecord {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        parse_lcov(&text, path)
    }

    /// Render as LCOV text
    #[must_use]
    pub fn to_lcov(&self) -> String {
        LcovFormatter::new(self).generate()
    }

    /// Write as an LCOV tracefile
    pub fn save(&self, path: &Path) -> PipelineResult<()> {
        LcovFormatter::new(self).save(path)
    }
}
