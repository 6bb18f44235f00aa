//! Weighted fusion of dense similarity and BM25 scores.
//!
//! Only dense candidates take part: a document outside the dense top-N is
//! never surfaced, however strong its lexical match. Sparse scores are
//! max-scaled over the candidate set before blending.

use serde::{Deserialize, Serialize};

use super::vector_index::DenseHit;

/// Weight of the dense signal in the blend.
pub const DEFAULT_ALPHA: f32 = 0.7;

/// Upper bound on dense candidates fed into fusion.
pub const DEFAULT_DENSE_CANDIDATES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub alpha: f32,
    pub dense_candidates: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            dense_candidates: DEFAULT_DENSE_CANDIDATES,
        }
    }
}

/// A fused candidate with both component signals kept for inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedHit {
    pub position: usize,
    pub score: f32,
    pub dense: f32,
    pub sparse: f32,
}

/// Blend `alpha * dense + (1 - alpha) * sparse_norm` for every dense hit.
///
/// `sparse_scores` is indexed by row position (as returned by
/// [`Bm25Index::score_all`](super::bm25::Bm25Index::score_all)); a position
/// past its end counts as 0. The result is sorted by fused score, descending,
/// with ties left in dense order.
pub fn fuse(dense_hits: &[DenseHit], sparse_scores: &[f32], alpha: f32) -> Vec<FusedHit> {
    let candidate_sparse: Vec<f32> = dense_hits
        .iter()
        .map(|hit| sparse_scores.get(hit.position).copied().unwrap_or(0.0))
        .collect();
    let normalized = max_scale(&candidate_sparse);

    let mut fused: Vec<FusedHit> = dense_hits
        .iter()
        .zip(normalized)
        .map(|(hit, sparse)| FusedHit {
            position: hit.position,
            score: alpha * hit.similarity + (1.0 - alpha) * sparse,
            dense: hit.similarity,
            sparse,
        })
        .collect();

    // `sort_by` is stable, so equal scores keep dense-candidate order.
    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused
}

/// Divide by the maximum when it is positive; otherwise return as-is.
fn max_scale(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max > 0.0 {
        scores.iter().map(|s| s / max).collect()
    } else {
        scores.to_vec()
    }
}
