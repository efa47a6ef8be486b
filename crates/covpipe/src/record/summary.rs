//! Coverage totals

use super::CoverageRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Found/hit totals over a whole record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Number of files observed
    pub files: usize,
    /// Instrumented lines
    pub lines_found: usize,
    /// Lines executed at least once
    pub lines_hit: usize,
    /// Functions
    pub functions_found: usize,
    /// Functions entered at least once
    pub functions_hit: usize,
    /// Branch arms
    pub branches_found: usize,
    /// Branch arms taken at least once
    pub branches_hit: usize,
}

impl CoverageSummary {
    /// Compute totals for `record`
    #[must_use]
    pub fn of(record: &CoverageRecord) -> Self {
        record
            .files()
            .values()
            .fold(Self::default(), |mut acc, file| {
                acc.files += 1;
                acc.lines_found += file.lines.len();
                acc.lines_hit += file.lines_hit();
                acc.functions_found += file.functions.len();
                acc.functions_hit += file.functions.values().filter(|f| f.hits > 0).count();
                acc.branches_found += file.branches.len();
                acc.branches_hit += file
                    .branches
                    .values()
                    .filter(|taken| matches!(taken, Some(n) if *n > 0))
                    .count();
                acc
            })
    }

    /// Line coverage in percent, `None` when nothing is instrumented
    #[must_use]
    pub fn line_percent(&self) -> Option<f64> {
        percent(self.lines_hit, self.lines_found)
    }

    /// Function coverage in percent
    #[must_use]
    pub fn function_percent(&self) -> Option<f64> {
        percent(self.functions_hit, self.functions_found)
    }

    /// Branch coverage in percent
    #[must_use]
    pub fn branch_percent(&self) -> Option<f64> {
        percent(self.branches_hit, self.branches_found)
    }
}

fn percent(hit: usize, found: usize) -> Option<f64> {
    (found > 0).then(|| hit as f64 * 100.0 / found as f64)
}

impl fmt::Display for CoverageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |f: &mut fmt::Formatter<'_>, label: &str, hit: usize, found: usize| {
            match percent(hit, found) {
                Some(p) => writeln!(f, "  {label:<10} {p:>6.1}% ({hit} of {found})"),
                None => writeln!(f, "  {label:<10} no data found"),
            }
        };
        writeln!(f, "Summary coverage rate ({} files):", self.files)?;
        row(f, "lines", self.lines_hit, self.lines_found)?;
        row(f, "functions", self.functions_hit, self.functions_found)?;
        row(f, "branches", self.branches_hit, self.branches_found)
    }
}
