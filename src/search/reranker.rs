//! Reranker trait and types for second-stage relevance scoring.
//!
//! A reranker takes a query and a shortlist of documents and returns relevance
//! scores for the documents it considers worth keeping, best first. The
//! pipeline never calls a reranker directly; it goes through
//! [`RerankGate`](super::rerank_gate::RerankGate), which applies the relevance
//! threshold and swallows provider failures.
//!
//! # Implementations
//!
//! - **Jina Reranker**: `jina-reranker-v2-base-multilingual` over the Jina HTTP API.
//!
//! # Example
//!
//! ```ignore
//! use crate::search::reranker::{Reranker, RerankerError};
//!
//! fn best(reranker: &dyn Reranker, query: &str, docs: &[&str]) -> Result<Option<usize>, RerankerError> {
//!     let hits = reranker.rerank(query, docs, 1)?;
//!     Ok(hits.first().map(|hit| hit.index))
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error type for reranker operations.
#[derive(Debug)]
pub enum RerankerError {
    /// The reranker is not usable (e.g., API key missing).
    Unavailable(String),
    /// The request never produced a response (connect error, timeout).
    Transport(String),
    /// The provider answered with a non-success HTTP status.
    Status { status: u16, body: String },
    /// The response body could not be interpreted.
    InvalidResponse(String),
    /// Input is empty or invalid.
    InvalidInput(String),
}

impl fmt::Display for RerankerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RerankerError::Unavailable(msg) => write!(f, "reranker unavailable: {msg}"),
            RerankerError::Transport(msg) => write!(f, "rerank request failed: {msg}"),
            RerankerError::Status { status, body } => {
                write!(f, "rerank provider returned HTTP {status}: {body}")
            }
            RerankerError::InvalidResponse(msg) => write!(f, "invalid rerank response: {msg}"),
            RerankerError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for RerankerError {}

/// Result type for reranker operations.
pub type RerankerResult<T> = Result<T, RerankerError>;

/// One scored document, referring back to its position in the request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankHit {
    pub index: usize,
    pub relevance_score: f32,
}

/// Trait for relevance-scoring providers.
///
/// # Thread Safety
///
/// Implementations should be `Send + Sync` to allow use across threads.
pub trait Reranker: Send + Sync {
    /// Score `documents` against `query`.
    ///
    /// Returns at most `top_n` hits ordered by the provider's own ranking;
    /// `index` points into `documents`. Scores are expected in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// - [`RerankerError::Unavailable`] if the reranker is not configured.
    /// - [`RerankerError::Transport`] / [`RerankerError::Status`] on HTTP failure.
    /// - [`RerankerError::InvalidResponse`] if the payload cannot be parsed.
    fn rerank(&self, query: &str, documents: &[&str], top_n: usize) -> RerankerResult<Vec<RerankHit>>;

    /// Unique identifier for this reranker, usually the model name.
    fn id(&self) -> &str;

    /// Whether this reranker is configured and ready to use.
    fn is_available(&self) -> bool;
}

/// Metadata about a reranker for display and logging.
#[derive(Debug, Clone)]
pub struct RerankerInfo {
    /// The reranker's unique identifier.
    pub id: String,
    /// Whether the reranker is available.
    pub is_available: bool,
}

impl RerankerInfo {
    /// Create info from a reranker instance.
    pub fn from_reranker(reranker: &dyn Reranker) -> Self {
        Self {
            id: reranker.id().to_string(),
            is_available: reranker.is_available(),
        }
    }
}

impl fmt::Display for RerankerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_available {
            "available"
        } else {
            "unavailable"
        };
        write!(f, "{} ({})", self.id, status)
    }
}
