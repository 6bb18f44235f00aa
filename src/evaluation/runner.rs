//! Evaluation drivers.
//!
//! Two modes share the same metrics and report:
//!
//! - **static**: score each case's own `retrieved_ids`;
//! - **pipeline**: run every query through hybrid search and the rerank gate
//!   over a listing snapshot, then score what comes out.

use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::dataset::EvalCase;
use super::metrics::{MetricResult, aggregate, compute_metrics};
use super::report::{CaseReport, EvaluationReport};
use crate::model::ListingId;
use crate::search::SearchError;
use crate::search::rerank_gate::{RerankCandidate, RerankGate};
use crate::search::session::SearchSession;

pub const DEFAULT_TOP_K_RETRIEVAL: usize = 50;
pub const DEFAULT_TOP_K_RERANK: usize = 5;
pub const DEFAULT_EVAL_RERANK_THRESHOLD: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    pub top_k_retrieval: usize,
    pub top_k_rerank: usize,
    pub rerank_threshold: f32,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            top_k_retrieval: DEFAULT_TOP_K_RETRIEVAL,
            top_k_rerank: DEFAULT_TOP_K_RERANK,
            rerank_threshold: DEFAULT_EVAL_RERANK_THRESHOLD,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("metric cutoff k must be at least 1")]
    InvalidK,

    #[error("search failed for case {case_id}: {source}")]
    Search {
        case_id: String,
        #[source]
        source: SearchError,
    },
}

/// Metrics for one case against its own `retrieved_ids`.
pub fn evaluate_case(case: &EvalCase, k: usize) -> Result<MetricResult, EvaluationError> {
    if k == 0 {
        return Err(EvaluationError::InvalidK);
    }
    Ok(compute_metrics(
        case.id.clone(),
        &case.retrieved_ids,
        &case.relevant_ids,
        k,
    ))
}

/// Static mode: score stored rankings at cutoff `k`.
pub fn evaluate_dataset(cases: &[EvalCase], k: usize) -> Result<EvaluationReport, EvaluationError> {
    let mut reports = Vec::with_capacity(cases.len());
    for case in cases {
        let metrics = evaluate_case(case, k)?;
        reports.push(CaseReport {
            query: case.query.clone(),
            found: case.retrieved_ids.iter().take(k).copied().collect(),
            target: case.sorted_relevant(),
            metrics,
            rerank: None,
        });
    }
    Ok(build_report(k, None, reports))
}

/// Pipeline mode: search, rerank, then score at `k = top_k_rerank`.
///
/// The gate's threshold is replaced by `settings.rerank_threshold`.
pub fn run_pipeline_evaluation(
    cases: &[EvalCase],
    session: &SearchSession,
    gate: &RerankGate,
    settings: &EvaluationSettings,
) -> Result<EvaluationReport, EvaluationError> {
    if settings.top_k_rerank == 0 || settings.top_k_retrieval == 0 {
        return Err(EvaluationError::InvalidK);
    }
    let gate = gate.clone().with_threshold(settings.rerank_threshold);
    let k = settings.top_k_rerank;
    let start = Instant::now();

    info!(
        cases = cases.len(),
        listings = session.len(),
        top_k_retrieval = settings.top_k_retrieval,
        top_k_rerank = k,
        "Starting pipeline evaluation"
    );

    let mut reports = Vec::with_capacity(cases.len());
    for case in cases {
        let search_err = |source| EvaluationError::Search {
            case_id: case.id.clone(),
            source,
        };

        let candidates = session
            .search(&case.query, settings.top_k_retrieval)
            .map_err(search_err)?;
        let rerank_input: Vec<RerankCandidate<'_>> = candidates
            .iter()
            .filter_map(|hit| {
                let listing = session.listing(hit.id)?;
                Some(RerankCandidate {
                    hit: *hit,
                    text: &listing.full_text_content,
                })
            })
            .collect();

        let gated = gate.apply(&case.query, &rerank_input, k).map_err(search_err)?;
        let found: Vec<ListingId> = gated.results.iter().map(|r| r.id).collect();
        if found.is_empty() {
            warn!(case_id = %case.id, "No results survived the rerank gate");
        }

        let metrics = compute_metrics(case.id.clone(), &found, &case.relevant_ids, k);
        reports.push(CaseReport {
            query: case.query.clone(),
            found,
            target: case.sorted_relevant(),
            metrics,
            rerank: Some(gated.mode),
        });
    }

    let report = build_report(k, Some(settings), reports);
    info!(
        cases = report.aggregate.cases,
        ndcg = report.aggregate.ndcg,
        elapsed_ms = start.elapsed().as_millis(),
        "Pipeline evaluation finished"
    );
    Ok(report)
}

fn build_report(
    k: usize,
    settings: Option<&EvaluationSettings>,
    cases: Vec<CaseReport>,
) -> EvaluationReport {
    let metrics: Vec<MetricResult> = cases.iter().map(|c| c.metrics.clone()).collect();
    EvaluationReport {
        generated_at: Utc::now(),
        k,
        top_k_retrieval: settings.map(|s| s.top_k_retrieval),
        top_k_rerank: settings.map(|s| s.top_k_rerank),
        aggregate: aggregate(&metrics),
        cases,
    }
}
