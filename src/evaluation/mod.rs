//! Ranking evaluation against labeled ground truth.

pub mod dataset;
pub mod metrics;
pub mod report;
pub mod runner;

pub use dataset::{EvalCase, load_eval_dataset, try_load_eval_dataset};
pub use metrics::{AggregateMetrics, MetricResult, aggregate, compute_metrics};
pub use report::{CaseReport, EvaluationReport, format_report};
pub use runner::{
    EvaluationError, EvaluationSettings, evaluate_case, evaluate_dataset, run_pipeline_evaluation,
};
