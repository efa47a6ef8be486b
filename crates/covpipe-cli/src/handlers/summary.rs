//! Summary command handler

use crate::commands::{SummaryArgs, SummaryFormat};
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{format_file_table, format_summary};
use covpipe::CoverageRecord;

/// Execute the summary command
pub fn execute_summary(config: &CliConfig, args: &SummaryArgs) -> CliResult<()> {
    let record = CoverageRecord::load(&args.input)?;
    let text = render_summary(&record, args.format, args.files, config.color.should_color())?;
    print!("{text}");
    Ok(())
}

/// Summary output for `record`
pub fn render_summary(
    record: &CoverageRecord,
    format: SummaryFormat,
    files: bool,
    use_color: bool,
) -> CliResult<String> {
    let summary = record.summary();
    match format {
        SummaryFormat::Json => {
            let mut value = serde_json::to_value(summary)?;
            if files {
                let per_file: serde_json::Map<String, serde_json::Value> = record
                    .files()
                    .iter()
                    .map(|(path, file)| {
                        (
                            path.clone(),
                            serde_json::json!({
                                "lines_found": file.lines.len(),
                                "lines_hit": file.lines_hit(),
                            }),
                        )
                    })
                    .collect();
                value["files_detail"] = serde_json::Value::Object(per_file);
            }
            Ok(format!("{}\n", serde_json::to_string_pretty(&value)?))
        }
        SummaryFormat::Text => {
            let mut out = format_summary(&summary, use_color);
            if files {
                out.push('\n');
                out.push_str(&format_file_table(record));
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record() -> CoverageRecord {
        let mut record = CoverageRecord::new();
        let a = record.file_mut("/p/src/a.rs");
        a.record_line(10, 3);
        a.record_line(11, 0);
        a.record_function("main", 10);
        a.record_function_hits("main", 1);
        record
    }

    #[test]
    fn test_text_summary() {
        let text = render_summary(&record(), SummaryFormat::Text, false, false).unwrap();
        assert!(text.starts_with("Summary coverage rate (1 files):"));
        assert!(text.contains("50.0% (1 of 2)"));
        assert!(!text.contains("Hit/Found"));
    }

    #[test]
    fn test_text_summary_with_files() {
        let text = render_summary(&record(), SummaryFormat::Text, true, false).unwrap();
        assert!(text.contains("Hit/Found"));
        assert!(text.contains("/p/src/a.rs"));
    }

    #[test]
    fn test_json_summary() {
        let json = render_summary(&record(), SummaryFormat::Json, true, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["lines_found"], 2);
        assert_eq!(value["lines_hit"], 1);
        assert_eq!(value["functions_hit"], 1);
        assert_eq!(value["files_detail"]["/p/src/a.rs"]["lines_hit"], 1);
    }

    #[test]
    fn test_empty_record() {
        let text = render_summary(&CoverageRecord::new(), SummaryFormat::Text, false, false).unwrap();
        assert!(text.contains("(0 files)"));
        assert!(text.contains("no data found"));
    }
}
