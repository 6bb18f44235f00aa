//! Dataset and snapshot loaders must reject malformed JSON with an error,
//! never a panic, and evaluation over whatever parses stays in range.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::fs;
use tempfile::TempDir;

use listing_search::evaluation::{evaluate_dataset, try_load_eval_dataset};
use listing_search::sources::{load_enrichments, load_snapshot};

#[derive(Arbitrary, Debug)]
struct DatasetInput {
    json_content: String,
    k: u8,
}

fuzz_target!(|input: DatasetInput| {
    let temp_dir = match TempDir::new() {
        Ok(dir) => dir,
        Err(_) => return,
    };
    let path = temp_dir.path().join("input.json");
    if fs::write(&path, &input.json_content).is_err() {
        return;
    }

    let _ = load_snapshot(&path);
    let _ = load_enrichments(&path);

    if let Ok(cases) = try_load_eval_dataset(&path) {
        let k = usize::from(input.k).max(1);
        if let Ok(report) = evaluate_dataset(&cases, k) {
            for case in &report.cases {
                let m = &case.metrics;
                for value in [m.precision_at_k, m.recall_at_k, m.f1_at_k, m.mrr_at_k, m.ndcg_at_k] {
                    assert!((0.0..=1.0).contains(&value));
                }
            }
        }
    }
});
