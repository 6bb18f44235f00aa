//! Ranking-quality metrics at a cutoff `k`.
//!
//! Every metric looks only at the first `k` retrieved ids. Repeated ids keep
//! their rank positions (so they count against precision), but a relevant id
//! earns recall and DCG credit only the first time it appears; this keeps all
//! five metrics inside `[0, 1]`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::ListingId;

/// Metrics for one evaluated case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub case_id: String,
    pub precision_at_k: f64,
    pub recall_at_k: f64,
    pub f1_at_k: f64,
    pub mrr_at_k: f64,
    pub ndcg_at_k: f64,
}

/// Arithmetic means across cases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub cases: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub mrr: f64,
    pub ndcg: f64,
}

fn cutoff(retrieved: &[ListingId], k: usize) -> &[ListingId] {
    &retrieved[..k.min(retrieved.len())]
}

/// Hits over what was actually returned (not over `k`), so a short list is
/// not penalised for its length.
pub fn precision_at_k(retrieved: &[ListingId], relevant: &HashSet<ListingId>, k: usize) -> f64 {
    let top = cutoff(retrieved, k);
    if top.is_empty() {
        return 0.0;
    }
    let hits = top.iter().filter(|id| relevant.contains(*id)).count();
    hits as f64 / top.len() as f64
}

pub fn recall_at_k(retrieved: &[ListingId], relevant: &HashSet<ListingId>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let found: HashSet<&ListingId> = cutoff(retrieved, k)
        .iter()
        .filter(|id| relevant.contains(*id))
        .collect();
    found.len() as f64 / relevant.len() as f64
}

pub fn f1_at_k(retrieved: &[ListingId], relevant: &HashSet<ListingId>, k: usize) -> f64 {
    harmonic_mean(
        precision_at_k(retrieved, relevant, k),
        recall_at_k(retrieved, relevant, k),
    )
}

fn harmonic_mean(p: f64, r: f64) -> f64 {
    if p + r == 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

/// Reciprocal of the 1-based rank of the first relevant id.
pub fn mrr_at_k(retrieved: &[ListingId], relevant: &HashSet<ListingId>, k: usize) -> f64 {
    cutoff(retrieved, k)
        .iter()
        .position(|id| relevant.contains(id))
        .map_or(0.0, |idx| 1.0 / (idx as f64 + 1.0))
}

/// Binary-gain NDCG. The ideal ranking places `min(|relevant|, k)` relevant
/// ids at the top.
pub fn ndcg_at_k(retrieved: &[ListingId], relevant: &HashSet<ListingId>, k: usize) -> f64 {
    let top = cutoff(retrieved, k);
    if relevant.is_empty() || top.is_empty() {
        return 0.0;
    }

    let mut credited = HashSet::with_capacity(top.len());
    let dcg: f64 = top
        .iter()
        .enumerate()
        .filter(|(_, id)| relevant.contains(*id) && credited.insert(**id))
        .map(|(idx, _)| discount(idx))
        .sum();

    let idcg: f64 = (0..relevant.len().min(k)).map(discount).sum();
    if idcg == 0.0 { 0.0 } else { dcg / idcg }
}

fn discount(idx: usize) -> f64 {
    1.0 / (idx as f64 + 2.0).log2()
}

/// All five metrics for one case.
pub fn compute_metrics(
    case_id: impl Into<String>,
    retrieved: &[ListingId],
    relevant: &HashSet<ListingId>,
    k: usize,
) -> MetricResult {
    let precision = precision_at_k(retrieved, relevant, k);
    let recall = recall_at_k(retrieved, relevant, k);
    MetricResult {
        case_id: case_id.into(),
        precision_at_k: precision,
        recall_at_k: recall,
        f1_at_k: harmonic_mean(precision, recall),
        mrr_at_k: mrr_at_k(retrieved, relevant, k),
        ndcg_at_k: ndcg_at_k(retrieved, relevant, k),
    }
}

pub fn aggregate(results: &[MetricResult]) -> AggregateMetrics {
    if results.is_empty() {
        return AggregateMetrics::default();
    }
    let n = results.len() as f64;
    let mean = |f: fn(&MetricResult) -> f64| results.iter().map(f).sum::<f64>() / n;
    AggregateMetrics {
        cases: results.len(),
        precision: mean(|r| r.precision_at_k),
        recall: mean(|r| r.recall_at_k),
        f1: mean(|r| r.f1_at_k),
        mrr: mean(|r| r.mrr_at_k),
        ndcg: mean(|r| r.ndcg_at_k),
    }
}
