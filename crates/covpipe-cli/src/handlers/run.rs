//! Run command handler: the full pipeline

use crate::commands::{RunArgs, SummaryFormat};
use crate::config::{CliConfig, PipelineFile};
use crate::error::CliResult;
use crate::handlers::existing_dir;
use crate::output::{format_summary, ProgressReporter};
use covpipe::{
    ArtifactKind, CargoToolchain, CoverageSummary, GenHtml, Lcov, Pipeline, PipelineOutcome, Workspace,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Result of a run, as printed with `--format json`
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    final_record: &'a Path,
    rendered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    report_dir: Option<&'a Path>,
    summary: &'a CoverageSummary,
}

/// Execute the run command
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let root = existing_dir(&args.directory)?;
    let mut file = PipelineFile::discover(&root, args.config.as_deref())?;
    apply_overrides(&mut file, args);

    let toolchain = CargoToolchain::new();
    let mut lcov = Lcov::new();
    if let Some(ref program) = file.lcov {
        lcov = lcov.with_program(program);
    }
    if let Some(ref tool) = file.gcov_tool {
        lcov = lcov.with_gcov_tool(tool);
    }
    let mut genhtml = GenHtml::new();
    if let Some(ref program) = file.genhtml {
        genhtml = genhtml.with_program(program);
    }

    let use_color = config.color.should_color();
    let reporter = ProgressReporter::new(use_color, config.verbosity.is_quiet())
        .with_render_failure(file.pipeline.render_failure);
    let report_dir = root.join(&file.pipeline.report_dir);
    tracing::info!(root = %root.display(), ci = file.pipeline.ci, "starting coverage run");

    let pipeline =
        Pipeline::new(&toolchain, &lcov, &genhtml, Workspace::new(&root), file.pipeline).with_observer(&reporter);
    let outcome = pipeline.run()?;

    println!("{}", render_outcome(&outcome, &report_dir, args.format, use_color)?);
    Ok(())
}

/// Fold command-line flags into the pipeline file; flags win
pub fn apply_overrides(file: &mut PipelineFile, args: &RunArgs) {
    let pipeline = &mut file.pipeline;
    if args.ci {
        pipeline.ci = true;
    }
    if let Some(ref test) = args.integration_test {
        pipeline.integration.kind = ArtifactKind::IntegrationTest { test: test.clone() };
    }
    for target in [&mut pipeline.unit, &mut pipeline.integration] {
        if let Some(ref package) = args.package {
            target.package = Some(package.clone());
        }
        if !args.features.is_empty() {
            target.features.clone_from(&args.features);
        }
        if args.all_features {
            target.all_features = true;
        }
        if args.release {
            target.release = true;
        }
    }
    if !args.owned_roots.is_empty() {
        pipeline.owned_roots.clone_from(&args.owned_roots);
    }
    if let Some(ref dir) = args.report_dir {
        pipeline.report_dir.clone_from(dir);
    }
    if let Some(policy) = args.render_failure {
        pipeline.render_failure = policy.into();
    }
    override_path(&mut file.lcov, args.lcov.as_ref());
    override_path(&mut file.gcov_tool, args.gcov_tool.as_ref());
    override_path(&mut file.genhtml, args.genhtml.as_ref());
}

fn override_path(slot: &mut Option<PathBuf>, value: Option<&PathBuf>) {
    if let Some(value) = value {
        *slot = Some(value.clone());
    }
}

/// Final output of a successful run
pub fn render_outcome(
    outcome: &PipelineOutcome,
    report_dir: &Path,
    format: SummaryFormat,
    use_color: bool,
) -> CliResult<String> {
    let report_dir = outcome.rendered.then_some(report_dir);
    match format {
        SummaryFormat::Json => Ok(serde_json::to_string_pretty(&RunReport {
            final_record: &outcome.final_record,
            rendered: outcome.rendered,
            report_dir,
            summary: &outcome.summary,
        })?),
        SummaryFormat::Text => {
            let mut out = format_summary(&outcome.summary, use_color);
            out.push_str(&format!("Coverage record: {}", outcome.final_record.display()));
            if let Some(dir) = report_dir {
                out.push_str(&format!("\nHTML report: {}", dir.join("index.html").display()));
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreachable)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;
    use covpipe::{CoverageRecord, PipelineState, RenderFailurePolicy};

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["covpipe", "run"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            _ => unreachable!("parsed a run command"),
        }
    }

    #[test]
    fn test_overrides_apply_to_both_targets() {
        let mut file = PipelineFile::default();
        apply_overrides(
            &mut file,
            &run_args(&["-p", "mesabox", "--features", "latest", "--release", "--integration-test", "it"]),
        );
        for target in [&file.pipeline.unit, &file.pipeline.integration] {
            assert_eq!(target.package.as_deref(), Some("mesabox"));
            assert_eq!(target.features, ["latest"]);
            assert!(target.release);
        }
        assert_eq!(
            file.pipeline.integration.kind,
            ArtifactKind::IntegrationTest { test: "it".into() }
        );
        assert_eq!(file.pipeline.unit.kind, ArtifactKind::LibTest);
    }

    #[test]
    fn test_flags_win_over_file() {
        let mut file = PipelineFile::parse("owned_roots: [lib]\nrender_failure: warn\ngcov_tool: gcov-7\n").unwrap();
        apply_overrides(
            &mut file,
            &run_args(&["-r", "src", "--render-failure", "fatal", "--gcov-tool", "gcov-9"]),
        );
        assert_eq!(file.pipeline.owned_roots, [PathBuf::from("src")]);
        assert_eq!(file.pipeline.render_failure, RenderFailurePolicy::Fatal);
        assert_eq!(file.gcov_tool, Some(PathBuf::from("gcov-9")));
    }

    #[test]
    fn test_file_values_kept_without_flags() {
        let mut file = PipelineFile::parse("owned_roots: [lib]\nci: true\n").unwrap();
        let args = RunArgs {
            ci: false,
            ..run_args(&[])
        };
        apply_overrides(&mut file, &args);
        assert_eq!(file.pipeline.owned_roots, [PathBuf::from("lib")]);
        assert!(file.pipeline.ci);
    }

    fn outcome(rendered: bool) -> PipelineOutcome {
        let mut record = CoverageRecord::new();
        record.file_mut("/p/src/a.rs").record_line(1, 1);
        PipelineOutcome {
            final_record: PathBuf::from("/p/final.info"),
            summary: record.summary(),
            rendered,
            completed: PipelineState::ORDER.to_vec(),
        }
    }

    #[test]
    fn test_render_outcome_text() {
        let text = render_outcome(&outcome(true), Path::new("/p/target/coverage"), SummaryFormat::Text, false).unwrap();
        assert!(text.contains("Summary coverage rate (1 files)"));
        assert!(text.contains("Coverage record: /p/final.info"));
        assert!(text.contains("HTML report: /p/target/coverage/index.html"));

        let text = render_outcome(&outcome(false), Path::new("/p/target/coverage"), SummaryFormat::Text, false).unwrap();
        assert!(!text.contains("HTML report"));
    }

    #[test]
    fn test_render_outcome_json() {
        let json = render_outcome(&outcome(false), Path::new("/p/target/coverage"), SummaryFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["final_record"], "/p/final.info");
        assert_eq!(value["rendered"], false);
        assert!(value.get("report_dir").is_none());
        assert_eq!(value["summary"]["lines_hit"], 1);
    }
}
