//! LCOV tracefile codec
//!
//! ```text
//! TN:<test name>
//! SF:<source file>
//! FN:<line>[,<end line>],<function name>
//! FNDA:<execution count>,<function name>
//! FNL:<index>,<line>[,<end line>]
//! FNA:<index>,<execution count>,<function name>
//! FNF:<functions found>
//! FNH:<functions hit>
//! BRDA:<line>,<block>,<branch>,<taken | ->
//! BRF:<branches found>
//! BRH:<branches hit>
//! DA:<line>,<execution count>[,<checksum>]
//! LF:<lines found>
//! LH:<lines hit>
//! end_of_record
//! ```
//!
//! Output is fully sorted, so the same record always serializes to the same
//! bytes.

use super::{BranchId, CoverageRecord, FileCoverage};
use crate::result::{PipelineError, PipelineResult};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

/// LCOV format writer
#[derive(Debug)]
pub struct LcovFormatter<'a> {
    record: &'a CoverageRecord,
    test_name: Option<String>,
}

impl<'a> LcovFormatter<'a> {
    /// Create a formatter for `record`
    #[must_use]
    pub fn new(record: &'a CoverageRecord) -> Self {
        Self {
            record,
            test_name: record.test_name().map(String::from),
        }
    }

    /// Override the test name written in each `TN:` line
    #[must_use]
    pub fn with_test_name(mut self, name: impl Into<String>) -> Self {
        self.test_name = Some(name.into());
        self
    }

    /// Generate the tracefile text
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();
        let test_name = self.test_name.as_deref().unwrap_or("");

        for (path, file) in self.record.files() {
            let _ = writeln!(output, "TN:{test_name}");
            let _ = writeln!(output, "SF:{path}");
            write_functions(&mut output, file);
            write_branches(&mut output, file);
            write_lines(&mut output, file);
            output.push_str("end_of_record\n");
        }

        output
    }

    /// Write the tracefile to `path`
    pub fn save(&self, path: &Path) -> PipelineResult<()> {
        std::fs::write(path, self.generate())?;
        Ok(())
    }
}

fn write_functions(output: &mut String, file: &FileCoverage) {
    let mut by_line: Vec<_> = file.functions.iter().collect();
    by_line.sort_by(|(an, af), (bn, bf)| af.start_line.cmp(&bf.start_line).then(an.cmp(bn)));

    for (name, func) in &by_line {
        if let Some(start) = func.start_line {
            let _ = writeln!(output, "FN:{start},{name}");
        }
    }
    for (name, func) in &by_line {
        let _ = writeln!(output, "FNDA:{},{name}", func.hits);
    }
    let hit = by_line.iter().filter(|(_, f)| f.hits > 0).count();
    let _ = writeln!(output, "FNF:{}", by_line.len());
    let _ = writeln!(output, "FNH:{hit}");
}

fn write_branches(output: &mut String, file: &FileCoverage) {
    if file.branches.is_empty() {
        return;
    }
    let mut hit = 0;
    for (id, taken) in &file.branches {
        match taken {
            Some(count) => {
                let _ = writeln!(output, "BRDA:{},{},{},{count}", id.line, id.block, id.branch);
                if *count > 0 {
                    hit += 1;
                }
            }
            None => {
                let _ = writeln!(output, "BRDA:{},{},{},-", id.line, id.block, id.branch);
            }
        }
    }
    let _ = writeln!(output, "BRF:{}", file.branches.len());
    let _ = writeln!(output, "BRH:{hit}");
}

fn write_lines(output: &mut String, file: &FileCoverage) {
    for (line, count) in &file.lines {
        let _ = writeln!(output, "DA:{line},{count}");
    }
    let _ = writeln!(output, "LF:{}", file.lines.len());
    let _ = writeln!(output, "LH:{}", file.lines_hit());
}

/// Parse LCOV text; `origin` only labels error messages
///
/// Summary lines (`LF`, `LH`, `FNF`, ...) are recomputed on output and
/// ignored here. A file that appears in several sections is summed.
/// lcov 2 function records (`FNL`/`FNA`) read into the same function map
/// as `FN`/`FNDA`.
pub fn parse_lcov(text: &str, origin: &Path) -> PipelineResult<CoverageRecord> {
    let mut record = CoverageRecord::new();
    let mut test_name: Option<String> = None;
    let mut current: Option<(String, FileCoverage)> = None;
    // FNL index to start line, per SF section
    let mut function_lines: HashMap<u32, u32> = HashMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }
        let err = |message: String| PipelineError::InvalidRecord {
            path: origin.to_path_buf(),
            line: line_no,
            message,
        };

        if line == "end_of_record" {
            let (path, file) = current
                .take()
                .ok_or_else(|| err("end_of_record without SF".to_string()))?;
            record.insert_file(path, file);
            continue;
        }

        let (tag, value) = line
            .split_once(':')
            .ok_or_else(|| err(format!("expected `TAG:value`, got `{line}`")))?;

        if tag == "TN" {
            if !value.is_empty() {
                test_name = Some(value.to_string());
            }
            continue;
        }
        if tag == "SF" {
            if current.is_some() {
                return Err(err("SF before end_of_record".to_string()));
            }
            current = Some((value.to_string(), FileCoverage::new()));
            function_lines.clear();
            continue;
        }

        let Some((_, file)) = current.as_mut() else {
            return Err(err(format!("{tag} outside of a SF section")));
        };

        match tag {
            "DA" => {
                let mut parts = value.split(',');
                let line = parse_num::<u32>(parts.next(), "line").map_err(&err)?;
                let count = parse_num::<u64>(parts.next(), "count").map_err(&err)?;
                file.record_line(line, count);
            }
            "FN" => {
                // FN:<line>,<name> or FN:<start>,<end>,<name>
                let (start, rest) = value
                    .split_once(',')
                    .ok_or_else(|| err(format!("malformed FN `{value}`")))?;
                let start = parse_num::<u32>(Some(start), "line").map_err(&err)?;
                let name = match rest.split_once(',') {
                    Some((end, name)) if end.parse::<u32>().is_ok() => name,
                    _ => rest,
                };
                file.record_function(name, start);
            }
            "FNDA" => {
                let (count, name) = value
                    .split_once(',')
                    .ok_or_else(|| err(format!("malformed FNDA `{value}`")))?;
                let count = parse_num::<u64>(Some(count), "count").map_err(&err)?;
                file.record_function_hits(name, count);
            }
            "BRDA" => {
                let parts: Vec<&str> = value.split(',').collect();
                if parts.len() != 4 {
                    return Err(err(format!("malformed BRDA `{value}`")));
                }
                let id = BranchId::new(
                    parse_num(Some(parts[0]), "line").map_err(&err)?,
                    parse_num(Some(parts[1]), "block").map_err(&err)?,
                    parse_num(Some(parts[2]), "branch").map_err(&err)?,
                );
                let taken = match parts[3] {
                    "-" => None,
                    n => Some(parse_num::<u64>(Some(n), "taken").map_err(&err)?),
                };
                file.record_branch(id, taken);
            }
            "FNL" => {
                let mut parts = value.split(',');
                let index = parse_num::<u32>(parts.next(), "function index").map_err(&err)?;
                let start = parse_num::<u32>(parts.next(), "line").map_err(&err)?;
                let _ = function_lines.insert(index, start);
            }
            "FNA" => {
                let mut parts = value.splitn(3, ',');
                let index = parse_num::<u32>(parts.next(), "function index").map_err(&err)?;
                let count = parse_num::<u64>(parts.next(), "count").map_err(&err)?;
                let name = parts
                    .next()
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| err(format!("malformed FNA `{value}`")))?;
                let start = function_lines
                    .get(&index)
                    .copied()
                    .ok_or_else(|| err(format!("FNA index {index} without FNL")))?;
                file.record_function(name, start);
                file.record_function_hits(name, count);
            }
            "LF" | "LH" | "FNF" | "FNH" | "BRF" | "BRH" | "VER" => {}
            other => {
                tracing::debug!(tag = other, line = line_no, "ignoring unknown tracefile tag");
            }
        }
    }

    if current.is_some() {
        return Err(PipelineError::InvalidRecord {
            path: origin.to_path_buf(),
            line: text.lines().count(),
            message: "missing end_of_record".to_string(),
        });
    }

    record.test_name = test_name;
    Ok(record)
}

fn parse_num<T: std::str::FromStr>(field: Option<&str>, what: &str) -> Result<T, String> {
    let field = field.ok_or_else(|| format!("missing {what}"))?;
    field
        .trim()
        .parse()
        .map_err(|_| format!("invalid {what} `{field}`"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
TN:
SF:/proj/src/lib.rs
FN:3,lib::add
FN:9,lib::sub
FNDA:4,lib::add
FNDA:0,lib::sub
FNF:2
FNH:1
BRDA:5,0,0,2
BRDA:5,0,1,-
BRF:2
BRH:1
DA:3,4
DA:4,4
DA:9,0
LF:3
LH:2
end_of_record
";

    fn sample() -> CoverageRecord {
        parse_lcov(SAMPLE, Path::new("sample.info")).unwrap()
    }

    #[test]
    fn test_parse_lines() {
        let record = sample();
        let file = record.file("/proj/src/lib.rs").unwrap();
        assert_eq!(file.line_count(3), Some(4));
        assert_eq!(file.line_count(9), Some(0));
        assert_eq!(file.line_count(5), None);
        assert_eq!(file.lines_hit(), 2);
    }

    #[test]
    fn test_parse_functions() {
        let record = sample();
        let file = record.file("/proj/src/lib.rs").unwrap();
        assert_eq!(file.functions["lib::add"].hits, 4);
        assert_eq!(file.functions["lib::add"].start_line, Some(3));
        assert_eq!(file.functions["lib::sub"].hits, 0);
    }

    #[test]
    fn test_parse_branches() {
        let record = sample();
        let file = record.file("/proj/src/lib.rs").unwrap();
        assert_eq!(file.branches[&BranchId::new(5, 0, 0)], Some(2));
        assert_eq!(file.branches[&BranchId::new(5, 0, 1)], None);
    }

    #[test]
    fn test_empty_tn_is_no_test_name() {
        assert_eq!(sample().test_name(), None);
        let named = parse_lcov("TN:unit\nSF:a.rs\nDA:1,1\nend_of_record\n", Path::new("x")).unwrap();
        assert_eq!(named.test_name(), Some("unit"));
    }

    #[test]
    fn test_generate_is_canonical() {
        assert_eq!(sample().to_lcov(), SAMPLE);
    }

    #[test]
    fn test_generate_sorted_and_stable() {
        let mut record = CoverageRecord::new();
        record.file_mut("b.rs").record_line(2, 1);
        record.file_mut("a.rs").record_line(9, 0);
        record.file_mut("a.rs").record_line(1, 3);
        let text = record.to_lcov();
        let a = text.find("SF:a.rs").unwrap();
        let b = text.find("SF:b.rs").unwrap();
        assert!(a < b);
        assert!(text.find("DA:1,3").unwrap() < text.find("DA:9,0").unwrap());
        assert_eq!(text, record.clone().to_lcov());
    }

    #[test]
    fn test_duplicate_sections_are_summed() {
        let text = "SF:a.rs\nDA:1,2\nend_of_record\nSF:a.rs\nDA:1,3\nDA:2,0\nend_of_record\n";
        let record = parse_lcov(text, Path::new("x")).unwrap();
        let file = record.file("a.rs").unwrap();
        assert_eq!(file.line_count(1), Some(5));
        assert_eq!(file.line_count(2), Some(0));
    }

    #[test]
    fn test_da_with_checksum() {
        let record = parse_lcov("SF:a.rs\nDA:7,1,abcdef\nend_of_record\n", Path::new("x")).unwrap();
        assert_eq!(record.file("a.rs").unwrap().line_count(7), Some(1));
    }

    #[test]
    fn test_fn_with_end_line() {
        let record =
            parse_lcov("SF:a.rs\nFN:3,8,main\nFNDA:1,main\nend_of_record\n", Path::new("x")).unwrap();
        let main = record.file("a.rs").unwrap().functions["main"];
        assert_eq!(main.start_line, Some(3));
        assert_eq!(main.hits, 1);
    }

    #[test]
    fn test_parse_lcov2_function_records() {
        let text = "SF:a.rs\nFNL:0,3,8\nFNA:0,5,main\nFNL:1,12\nFNA:1,0,helper\nend_of_record\n\
                    SF:b.rs\nFNL:0,20,24\nFNA:0,1,run\nend_of_record\n";
        let record = parse_lcov(text, Path::new("x")).unwrap();
        let a = &record.file("a.rs").unwrap().functions;
        assert_eq!(a["main"].start_line, Some(3));
        assert_eq!(a["main"].hits, 5);
        assert_eq!(a["helper"].start_line, Some(12));
        assert_eq!(a["helper"].hits, 0);
        assert_eq!(record.file("b.rs").unwrap().functions["run"].start_line, Some(20));

        let written = record.to_lcov();
        assert!(written.contains("FN:3,main\nFN:12,helper\nFNDA:5,main\nFNDA:0,helper\nFNF:2\nFNH:1\n"));
    }

    #[test]
    fn test_fna_index_is_scoped_to_section() {
        let text = "SF:a.rs\nFNL:0,3\nFNA:0,1,main\nend_of_record\nSF:b.rs\nFNA:0,1,run\nend_of_record\n";
        let err = parse_lcov(text, Path::new("x.info")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRecord { line: 6, .. }));
    }

    #[test]
    fn test_fnda_before_fn_keeps_start_line() {
        let record =
            parse_lcov("SF:a.rs\nFNDA:2,main\nFN:9,main\nend_of_record\n", Path::new("x")).unwrap();
        let main = record.file("a.rs").unwrap().functions["main"];
        assert_eq!(main.start_line, Some(9));
        assert_eq!(main.hits, 2);
        assert!(record.to_lcov().contains("FN:9,main\n"));
    }

    #[test]
    fn test_undeclared_function_writes_no_fn_line() {
        let record = parse_lcov("SF:a.rs\nFNDA:2,main\nend_of_record\n", Path::new("x")).unwrap();
        let text = record.to_lcov();
        assert!(!text.contains("FN:"));
        assert!(text.contains("FNDA:2,main\n"));
    }

    #[test]
    fn test_negative_count_rejected() {
        let err = parse_lcov("SF:a.rs\nDA:1,-1\nend_of_record\n", Path::new("bad.info")).unwrap_err();
        match err {
            PipelineError::InvalidRecord { path, line, .. } => {
                assert_eq!(path, Path::new("bad.info"));
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_data_outside_section_rejected() {
        assert!(parse_lcov("DA:1,1\n", Path::new("x")).is_err());
    }

    #[test]
    fn test_missing_end_of_record_rejected() {
        assert!(parse_lcov("SF:a.rs\nDA:1,1\n", Path::new("x")).is_err());
    }

    #[test]
    fn test_unknown_tags_ignored() {
        let record = parse_lcov("SF:a.rs\nXYZ:1\nDA:1,1\nend_of_record\n", Path::new("x")).unwrap();
        assert!(record.observes("a.rs"));
    }

    #[test]
    fn test_empty_text_is_empty_record() {
        let record = parse_lcov("", Path::new("x")).unwrap();
        assert!(record.is_empty());
        assert_eq!(record.to_lcov(), "");
    }

    #[test]
    fn test_formatter_test_name_override() {
        let record = sample();
        let text = LcovFormatter::new(&record).with_test_name("final").generate();
        assert!(text.starts_with("TN:final\n"));
    }
}
