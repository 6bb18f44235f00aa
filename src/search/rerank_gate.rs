//! Relevance gate around an optional [`Reranker`].
//!
//! The gate keeps candidates the provider scores at or above the threshold,
//! in the provider's order, with the relevance score replacing the fusion
//! score. If the provider errors (or none is configured), the first `top_k`
//! candidates pass through untouched.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::SearchError;
use super::reranker::{Reranker, RerankerInfo};
use crate::model::ScoredListing;

/// Minimum relevance score kept by the gate.
pub const DEFAULT_RERANK_THRESHOLD: f32 = 0.3;

/// A fused result plus the text the provider should score.
#[derive(Debug, Clone, Copy)]
pub struct RerankCandidate<'a> {
    pub hit: ScoredListing,
    pub text: &'a str,
}

/// How the gate produced its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    Reranked,
    Fallback,
    Passthrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateOutput {
    pub results: Vec<ScoredListing>,
    pub mode: GateMode,
}

#[derive(Clone)]
pub struct RerankGate {
    reranker: Option<Arc<dyn Reranker>>,
    threshold: f32,
}

impl RerankGate {
    pub fn new(reranker: Arc<dyn Reranker>, threshold: f32) -> Self {
        Self {
            reranker: Some(reranker),
            threshold,
        }
    }

    /// A gate that only truncates.
    pub fn passthrough() -> Self {
        Self {
            reranker: None,
            threshold: DEFAULT_RERANK_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn reranker_info(&self) -> Option<RerankerInfo> {
        self.reranker
            .as_ref()
            .map(|reranker| RerankerInfo::from_reranker(reranker.as_ref()))
    }

    /// Rerank `candidates` and keep at most `top_k` of them.
    ///
    /// Only `top_k == 0` is an error; provider failures fall back.
    pub fn apply(
        &self,
        query: &str,
        candidates: &[RerankCandidate<'_>],
        top_k: usize,
    ) -> Result<GateOutput, SearchError> {
        if top_k == 0 {
            return Err(SearchError::InvalidK(top_k));
        }
        let Some(reranker) = self.reranker.as_deref() else {
            return Ok(passthrough(candidates, top_k, GateMode::Passthrough));
        };
        if candidates.is_empty() {
            return Ok(GateOutput {
                results: Vec::new(),
                mode: GateMode::Reranked,
            });
        }

        let start = Instant::now();
        let documents: Vec<&str> = candidates.iter().map(|c| c.text).collect();
        let hits = match reranker.rerank(query, &documents, top_k) {
            Ok(hits) => hits,
            Err(err) => {
                warn!(
                    reranker = reranker.id(),
                    candidates = candidates.len(),
                    error = %err,
                    "Rerank failed; keeping fusion order"
                );
                return Ok(passthrough(candidates, top_k, GateMode::Fallback));
            }
        };

        let mut seen = HashSet::with_capacity(hits.len());
        let mut results = Vec::with_capacity(top_k.min(hits.len()));
        for hit in hits {
            let Some(candidate) = candidates.get(hit.index) else {
                warn!(
                    reranker = reranker.id(),
                    index = hit.index,
                    candidates = candidates.len(),
                    "Rerank hit index out of range; skipping"
                );
                continue;
            };
            // NaN scores fail this comparison and are dropped.
            let relevant = hit.relevance_score >= self.threshold;
            if !relevant || !seen.insert(hit.index) {
                continue;
            }
            results.push(ScoredListing::new(candidate.hit.id, hit.relevance_score));
            if results.len() == top_k {
                break;
            }
        }

        debug!(
            reranker = reranker.id(),
            candidates = candidates.len(),
            kept = results.len(),
            threshold = self.threshold,
            elapsed_ms = start.elapsed().as_millis(),
            "Rerank gate applied"
        );
        Ok(GateOutput {
            results,
            mode: GateMode::Reranked,
        })
    }
}

fn passthrough(candidates: &[RerankCandidate<'_>], top_k: usize, mode: GateMode) -> GateOutput {
    GateOutput {
        results: candidates.iter().take(top_k).map(|c| c.hit).collect(),
        mode,
    }
}
