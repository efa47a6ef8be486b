//! Property-based tests for coverage records.
//!
//! Merging must behave like pointwise addition over the union of observed
//! locations, and filtering must be a projection.

use covpipe::{filter_record, BranchId, CoverageRecord, OwnedRoots};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

const FILES: &[&str] = &[
    "/proj/src/lib.rs",
    "/proj/src/util/mod.rs",
    "/proj/src-other/x.rs",
    "/proj/vendor/../src/shim.rs",
    "/proj/vendor/dep.rs",
    "/usr/lib/rustlib/src/core.rs",
];

fn arb_record() -> impl Strategy<Value = CoverageRecord> {
    let line = (1u32..40, 0u64..1_000);
    let branch = (1u32..40, 0u32..3, 0u32..3, prop::option::of(0u64..50));
    let file = (
        0..FILES.len(),
        prop::collection::vec(line, 0..12),
        prop::collection::vec(branch, 0..6),
    );
    prop::collection::vec(file, 0..6).prop_map(|files| {
        let mut record = CoverageRecord::new();
        for (idx, lines, branches) in files {
            let cov = record.file_mut(FILES[idx]);
            for (line, count) in lines {
                cov.record_line(line, count);
            }
            for (line, block, branch, taken) in branches {
                cov.record_branch(BranchId::new(line, block, branch), taken);
            }
        }
        record
    })
}

fn line_totals(record: &CoverageRecord) -> BTreeMap<(String, u32), u64> {
    let mut totals = BTreeMap::new();
    for (path, file) in record.files() {
        for (line, count) in &file.lines {
            let _ = totals.insert((path.clone(), *line), *count);
        }
    }
    totals
}

// === Merge Property Tests ===

proptest! {
    /// Merge order does not matter.
    #[test]
    fn prop_merge_commutative(a in arb_record(), b in arb_record()) {
        prop_assert_eq!(a.merge(&b), b.merge(&a));
    }

    /// Grouping does not matter.
    #[test]
    fn prop_merge_associative(a in arb_record(), b in arb_record(), c in arb_record()) {
        prop_assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
    }

    /// Every line count is the sum of the inputs' counts; lines seen on one
    /// side only carry through.
    #[test]
    fn prop_merge_is_pointwise_sum(a in arb_record(), b in arb_record()) {
        let merged = line_totals(&a.merge(&b));
        let left = line_totals(&a);
        let right = line_totals(&b);

        for (key, count) in &merged {
            let expected = left.get(key).copied().unwrap_or(0) + right.get(key).copied().unwrap_or(0);
            prop_assert_eq!(*count, expected);
        }
        for key in left.keys().chain(right.keys()) {
            prop_assert!(merged.contains_key(key));
        }
    }

    /// The empty record is the identity.
    #[test]
    fn prop_merge_empty_identity(a in arb_record()) {
        prop_assert_eq!(a.merge(&CoverageRecord::new()), a.clone());
    }

    /// A record survives the tracefile writer and parser unchanged.
    #[test]
    fn prop_lcov_text_preserves_record(a in arb_record()) {
        let parsed = CoverageRecord::from_lcov(&a.to_lcov()).unwrap();
        prop_assert_eq!(parsed, a);
    }
}

// === Filter Property Tests ===

proptest! {
    /// Filtering twice equals filtering once.
    #[test]
    fn prop_filter_idempotent(a in arb_record()) {
        let roots = OwnedRoots::from_resolved(["/proj/src"]);
        let base = Path::new("/proj");
        let once = filter_record(&a, &roots, base);
        prop_assert_eq!(filter_record(&once, &roots, base), once);
    }

    /// Kept files are untouched; only unowned files disappear.
    #[test]
    fn prop_filter_keeps_owned_files_intact(a in arb_record()) {
        let roots = OwnedRoots::from_resolved(["/proj/src"]);
        let filtered = filter_record(&a, &roots, Path::new("/proj"));

        for (path, coverage) in filtered.files() {
            prop_assert_eq!(Some(coverage), a.file(path));
        }
        prop_assert!(!filtered.observes("/proj/src-other/x.rs"));
        prop_assert!(!filtered.observes("/proj/vendor/dep.rs"));
        prop_assert_eq!(filtered.observes("/proj/vendor/../src/shim.rs"), a.observes("/proj/vendor/../src/shim.rs"));
    }

    /// Filtering commutes with merging.
    #[test]
    fn prop_filter_distributes_over_merge(a in arb_record(), b in arb_record()) {
        let roots = OwnedRoots::from_resolved(["/proj/src"]);
        let base = Path::new("/proj");
        prop_assert_eq!(
            filter_record(&a.merge(&b), &roots, base),
            filter_record(&a, &roots, base).merge(&filter_record(&b, &roots, base))
        );
    }
}
