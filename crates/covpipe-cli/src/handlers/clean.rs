//! Clean command handler

use crate::commands::CleanArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::handlers::existing_dir;
use covpipe::{CleanReport, Workspace};

/// Execute the clean command
pub fn execute_clean(config: &CliConfig, args: &CleanArgs) -> CliResult<()> {
    let root = existing_dir(&args.directory)?;
    let report = Workspace::new(root).preserve_and_clean(&args.keep)?;
    if !config.verbosity.is_quiet() {
        print!("{}", clean_message(&report));
    }
    Ok(())
}

/// Human-readable cleanup report
#[must_use]
pub fn clean_message(report: &CleanReport) -> String {
    let mut out = format!(
        "Removed {} files and {} directories\n",
        report.removed_files, report.removed_dirs
    );
    for path in &report.preserved {
        out.push_str(&format!("Kept {}\n", path.display()));
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_clean_keeps_requested_record() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("target/debug/deps")).unwrap();
        std::fs::write(root.join("target/debug/deps/lib.gcda"), "").unwrap();
        std::fs::write(root.join("unit.info"), "end_of_record\n").unwrap();
        std::fs::write(root.join("coverage.info"), "end_of_record\n").unwrap();

        let args = CleanArgs {
            directory: root.to_path_buf(),
            keep: vec![PathBuf::from("unit.info")],
        };
        execute_clean(&CliConfig::new(), &args).unwrap();

        assert!(root.join("unit.info").exists());
        assert!(!root.join("coverage.info").exists());
        assert!(!root.join("target").exists());
    }

    #[test]
    fn test_clean_missing_directory() {
        let temp = TempDir::new().unwrap();
        let args = CleanArgs {
            directory: temp.path().join("missing"),
            keep: Vec::new(),
        };
        assert!(execute_clean(&CliConfig::new(), &args).is_err());
    }

    #[test]
    fn test_clean_message() {
        let report = CleanReport {
            removed_files: 3,
            removed_dirs: 1,
            preserved: vec![PathBuf::from("/p/unit.info")],
        };
        assert_eq!(
            clean_message(&report),
            "Removed 3 files and 1 directories\nKept /p/unit.info\n"
        );
    }
}
