//! Output formatting and progress reporting

use console::{style, Style, Term};
use covpipe::{
    CoverageRecord, CoverageSummary, PipelineError, PipelineState, RenderFailurePolicy, StageObserver,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::fmt::Write as _;
use std::time::Duration;

/// Stage progress and status lines on stderr
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: RefCell<Option<ProgressBar>>,
    render_failure: RenderFailurePolicy,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: RefCell::new(None),
            render_failure: RenderFailurePolicy::default(),
            use_color,
            quiet,
        }
    }

    /// Report render failures the way the run will treat them
    #[must_use]
    pub fn with_render_failure(mut self, policy: RenderFailurePolicy) -> Self {
        self.render_failure = policy;
        self
    }

    /// Whether a failure in `state` ends the run
    #[must_use]
    pub fn fails_run(&self, state: PipelineState) -> bool {
        state != PipelineState::Render || self.render_failure == RenderFailurePolicy::Fatal
    }

    fn start_spinner(&self, message: &str) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        if let Some(previous) = self.spinner.replace(Some(pb)) {
            previous.finish_and_clear();
        }
    }

    fn stop_spinner(&self) {
        if let Some(pb) = self.spinner.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }
}

impl StageObserver for ProgressReporter {
    fn stage_started(&self, state: PipelineState) {
        if state != PipelineState::Done {
            self.start_spinner(state.label());
        }
    }

    fn stage_finished(&self, state: PipelineState) {
        self.stop_spinner();
        if state != PipelineState::Done {
            self.success(state.label());
        }
    }

    fn stage_skipped(&self, state: PipelineState, reason: &str) {
        self.stop_spinner();
        self.info(&format!("{state} skipped ({reason})"));
    }

    fn stage_failed(&self, state: PipelineState, error: &PipelineError) {
        self.stop_spinner();
        if self.fails_run(state) {
            self.failure(&format!("{state}: {error}"));
        } else {
            self.warning(&format!("{state}: {error}"));
        }
    }
}

fn rate_style(percent: f64) -> Style {
    if percent >= 80.0 {
        Style::new().green().bold()
    } else if percent >= 50.0 {
        Style::new().yellow().bold()
    } else {
        Style::new().red().bold()
    }
}

/// Coverage totals as text, one row per metric
#[must_use]
pub fn format_summary(summary: &CoverageSummary, use_color: bool) -> String {
    if !use_color {
        return summary.to_string();
    }
    let mut out = format!("Summary coverage rate ({} files):\n", summary.files);
    let rows = [
        ("lines", summary.line_percent(), summary.lines_hit, summary.lines_found),
        (
            "functions",
            summary.function_percent(),
            summary.functions_hit,
            summary.functions_found,
        ),
        (
            "branches",
            summary.branch_percent(),
            summary.branches_hit,
            summary.branches_found,
        ),
    ];
    for (label, percent, hit, found) in rows {
        match percent {
            Some(p) => {
                let rate = rate_style(p).apply_to(format!("{p:>6.1}%"));
                let _ = writeln!(out, "  {label:<10} {rate} ({hit} of {found})");
            }
            None => {
                let _ = writeln!(out, "  {label:<10} {}", style("no data found").dim());
            }
        }
    }
    out
}

/// Per-file line coverage table
#[must_use]
pub fn format_file_table(record: &CoverageRecord) -> String {
    let width = record.files().keys().map(String::len).max().unwrap_or(4).max(4);
    let mut out = format!("{:<width$}  {:>7}  {:>11}\n", "File", "Lines", "Hit/Found");
    for (path, file) in record.files() {
        let found = file.lines.len();
        let hit = file.lines_hit();
        let rate = if found == 0 {
            "-".to_string()
        } else {
            format!("{:.1}%", hit as f64 * 100.0 / found as f64)
        };
        let _ = writeln!(out, "{path:<width$}  {rate:>7}  {:>11}", format!("{hit}/{found}"));
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod progress_reporter_tests {
        use super::*;

        #[test]
        fn test_new_reporter() {
            let reporter = ProgressReporter::new(true, false);
            assert!(reporter.use_color);
            assert!(!reporter.quiet);
        }

        #[test]
        fn test_default_reporter() {
            let reporter = ProgressReporter::default();
            assert!(reporter.use_color);
            assert!(!reporter.quiet);
        }

        #[test]
        fn test_messages() {
            let reporter = ProgressReporter::new(false, false);
            reporter.success("built");
            reporter.failure("capture failed");
            reporter.warning("render failed");
            reporter.info("render skipped");
            // No panic = success
        }

        #[test]
        fn test_stage_lifecycle_clears_spinner() {
            let reporter = ProgressReporter::new(false, false);
            reporter.stage_started(PipelineState::BuildUnit);
            assert!(reporter.spinner.borrow().is_some());
            reporter.stage_finished(PipelineState::BuildUnit);
            assert!(reporter.spinner.borrow().is_none());

            reporter.stage_started(PipelineState::Merge);
            reporter.stage_failed(PipelineState::Merge, &PipelineError::invalid_argument("x"));
            assert!(reporter.spinner.borrow().is_none());
        }

        #[test]
        fn test_render_failure_follows_policy() {
            let fatal = ProgressReporter::new(false, false);
            assert!(fatal.fails_run(PipelineState::Render));
            assert!(fatal.fails_run(PipelineState::CaptureUnit));

            let warn = ProgressReporter::new(false, false).with_render_failure(RenderFailurePolicy::Warn);
            assert!(!warn.fails_run(PipelineState::Render));
            assert!(warn.fails_run(PipelineState::Filter));

            warn.stage_started(PipelineState::Render);
            warn.stage_failed(PipelineState::Render, &PipelineError::render("genhtml: ERROR"));
            assert!(warn.spinner.borrow().is_none());
        }

        #[test]
        fn test_quiet_mode_has_no_spinner() {
            let reporter = ProgressReporter::new(false, true);
            reporter.stage_started(PipelineState::Clean);
            assert!(reporter.spinner.borrow().is_none());
            reporter.stage_skipped(PipelineState::Render, "CI mode");
            // Failure is still printed
            reporter.failure("shown");
        }
    }

    mod format_tests {
        use super::*;

        fn record() -> CoverageRecord {
            let mut record = CoverageRecord::new();
            let a = record.file_mut("src/a.rs");
            a.record_line(1, 3);
            a.record_line(2, 0);
            record.file_mut("src/empty.rs");
            record
        }

        #[test]
        fn test_plain_summary_matches_display() {
            let summary = record().summary();
            assert_eq!(format_summary(&summary, false), summary.to_string());
        }

        #[test]
        fn test_colored_summary_has_rows() {
            let text = format_summary(&record().summary(), true);
            assert!(text.contains("2 files"));
            assert!(text.contains("(1 of 2)"));
            assert!(text.contains("branches"));
        }

        #[test]
        fn test_file_table() {
            let table = format_file_table(&record());
            assert!(table.starts_with("File"));
            assert!(table.contains("src/a.rs"));
            assert!(table.contains("50.0%"));
            assert!(table.contains("1/2"));
            assert!(table.lines().any(|l| l.starts_with("src/empty.rs") && l.contains('-')));
        }
    }
}
