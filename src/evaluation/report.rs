//! Evaluation report structure and text rendering.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::{AggregateMetrics, MetricResult};
use crate::model::ListingId;
use crate::search::rerank_gate::GateMode;

const CASE_RULE: &str = "--------------------------------------------------";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    pub query: String,
    /// Ids the system returned, in rank order.
    pub found: Vec<ListingId>,
    /// Ground-truth ids, ascending.
    pub target: Vec<ListingId>,
    pub metrics: MetricResult,
    /// Set only in pipeline mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank: Option<GateMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    /// Cutoff used for every metric.
    pub k: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k_retrieval: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k_rerank: Option<usize>,
    pub cases: Vec<CaseReport>,
    pub aggregate: AggregateMetrics,
}

/// Per-case blocks followed by the aggregate block.
pub fn format_report(report: &EvaluationReport) -> String {
    let mut out = String::new();

    for case in &report.cases {
        let m = &case.metrics;
        let _ = writeln!(out, "ID: {}", m.case_id);
        let _ = writeln!(out, "  Query: '{}'", case.query);
        let _ = writeln!(out, "  Found ({}): {:?}", case.found.len(), case.found);
        let _ = writeln!(out, "  Target: {:?}", case.target);
        let _ = writeln!(
            out,
            "  P: {:.2} | R: {:.2} | NDCG: {:.2}",
            m.precision_at_k, m.recall_at_k, m.ndcg_at_k
        );
        if let Some(mode) = case.rerank.filter(|mode| *mode != GateMode::Reranked) {
            let _ = writeln!(out, "  Rerank: {mode:?}");
        }
        let _ = writeln!(out, "{CASE_RULE}");
    }

    if report.cases.is_empty() {
        out.push_str("No evaluation cases.\n");
        return out;
    }

    let agg = &report.aggregate;
    out.push_str("\n=== Final Aggregate Metrics ===\n");
    let _ = writeln!(out, "Total Cases:       {}", agg.cases);
    let _ = writeln!(out, "Cutoff K:          {}", report.k);
    if let Some(k) = report.top_k_retrieval {
        let _ = writeln!(out, "Top-K Retrieval:   {k}");
    }
    if let Some(k) = report.top_k_rerank {
        let _ = writeln!(out, "Top-K Rerank:      {k}");
    }
    let _ = writeln!(out, "Average Precision: {:.4}", agg.precision);
    let _ = writeln!(out, "Average Recall:    {:.4}", agg.recall);
    let _ = writeln!(out, "Average F1 Score:  {:.4}", agg.f1);
    let _ = writeln!(out, "Average MRR:       {:.4}", agg.mrr);
    let _ = writeln!(out, "Average NDCG:      {:.4}", agg.ndcg);
    out.push_str("===============================\n");
    out
}
