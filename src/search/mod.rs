//! Search layer facade.
//!
//! - **[`canonicalize`]**: Text normalisation shared by indexing and querying.
//! - **[`embedder`]**: Embedder trait and the never-failing corpus embedding helper.
//! - **[`hash_embedder`]**: FNV-1a feature hashing embedder (deterministic, offline).
//! - **[`openai_embedder`]**: OpenAI-compatible HTTP embedder.
//! - **[`vector_index`]**: Flat exact inner-product index.
//! - **[`bm25`]**: Okapi BM25 lexical scoring.
//! - **[`fusion`]**: Dense + sparse score fusion.
//! - **[`session`]**: Per-batch hybrid search session.
//! - **[`reranker`]**: Reranker trait for second-stage relevance scoring.
//! - **[`jina_reranker`]**: Jina rerank API client.
//! - **[`rerank_gate`]**: Threshold gate with fallback around any reranker.

pub mod bm25;
pub mod canonicalize;
pub mod embedder;
pub mod fusion;
pub mod hash_embedder;
pub mod jina_reranker;
pub mod openai_embedder;
pub mod rerank_gate;
pub mod reranker;
pub mod session;
pub mod vector_index;

use crate::model::ListingId;

/// Contract violations in the search layer. These indicate a broken caller
/// and are never degraded.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("k must be at least 1 (got {0})")]
    InvalidK(usize),

    #[error("listing id {0} appears more than once in the batch")]
    DuplicateId(ListingId),
}

pub use embedder::{Embedder, EmbedderError, EmbedderInfo, embed_corpus};
pub use fusion::{FusionConfig, fuse};
pub use rerank_gate::RerankGate;
pub use reranker::{RerankHit, Reranker, RerankerError};
pub use session::SearchSession;
