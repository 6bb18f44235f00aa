//! Embedder trait and types for semantic search.
//!
//! All embedding implementations satisfy [`Embedder`], a synchronous batch
//! interface. Providers may fail; callers that must not fail go through
//! [`embed_corpus`], which degrades failed rows to zero vectors.
//!
//! # Implementations
//!
//! - **Hash embedder**: FNV-1a feature hashing (always available, offline)
//! - **OpenAI embedder**: OpenAI-compatible HTTP embeddings endpoint

use std::fmt;
use std::time::Instant;

use tracing::{debug, warn};

/// Maximum texts per provider request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Errors from embedding providers.
#[derive(Debug, thiserror::Error)]
pub enum EmbedderError {
    #[error("embedder {model} unavailable: {reason}")]
    Unavailable { model: String, reason: String },

    #[error("embedding failed for {model}: {source}")]
    EmbeddingFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("embedder {model} returned HTTP {status}: {body}")]
    Http {
        model: String,
        status: u16,
        body: String,
    },

    #[error("embedder {model} returned {actual} vectors for {expected} inputs")]
    CountMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for embedder operations.
pub type EmbedderResult<T> = Result<T, EmbedderError>;

/// Capability interface for converting text into fixed-dimension vectors.
///
/// # Thread Safety
///
/// Implementations should be `Send + Sync` so one provider can serve
/// concurrent search sessions.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    fn embed_batch(&self, texts: &[&str]) -> EmbedderResult<Vec<Vec<f32>>>;

    /// Embed a single text.
    fn embed(&self, text: &str) -> EmbedderResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text])?;
        match vectors.pop() {
            Some(vector) if vectors.is_empty() => Ok(vector),
            _ => Err(EmbedderError::CountMismatch {
                model: self.id().to_string(),
                expected: 1,
                actual: vectors.len() + 1,
            }),
        }
    }

    /// Output dimension. Fixed for the lifetime of the embedder.
    fn dimension(&self) -> usize;

    /// Unique identifier, e.g. `"fnv1a-384"` or `"text-embedding-3-small"`.
    fn id(&self) -> &str;

    /// Whether this is a learned (semantic) model rather than a lexical hash.
    fn is_semantic(&self) -> bool;
}

/// Metadata about an embedder for display and logging.
#[derive(Debug, Clone)]
pub struct EmbedderInfo {
    /// The embedder's unique identifier.
    pub id: String,
    /// The output dimension.
    pub dimension: usize,
    /// Whether it's a semantic (ML) embedder.
    pub is_semantic: bool,
}

impl EmbedderInfo {
    /// Create info from an embedder instance.
    pub fn from_embedder(embedder: &dyn Embedder) -> Self {
        Self {
            id: embedder.id().to_string(),
            dimension: embedder.dimension(),
            is_semantic: embedder.is_semantic(),
        }
    }
}

impl fmt::Display for EmbedderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_semantic {
            "semantic"
        } else {
            "lexical"
        };
        write!(f, "{} ({}, {} dims)", self.id, kind, self.dimension)
    }
}

/// Embed every text, never failing.
///
/// Texts are sent in chunks of at most `batch_size`. A chunk whose request
/// fails, or that comes back with the wrong number of vectors, contributes one
/// zero vector per input. A single vector of the wrong dimension is replaced by
/// a zero vector. Zero rows score ~0 against every query.
pub fn embed_corpus(embedder: &dyn Embedder, texts: &[String], batch_size: usize) -> Vec<Vec<f32>> {
    let dimension = embedder.dimension();
    let batch_size = batch_size.max(1);
    let start = Instant::now();
    let mut out = Vec::with_capacity(texts.len());
    let mut degraded_rows = 0usize;

    for (batch_idx, chunk) in texts.chunks(batch_size).enumerate() {
        let flattened: Vec<String> = chunk.iter().map(|t| t.replace(['\n', '\r'], " ")).collect();
        let refs: Vec<&str> = flattened.iter().map(String::as_str).collect();

        match embedder.embed_batch(&refs) {
            Ok(vectors) if vectors.len() == chunk.len() => {
                for (row, vector) in vectors.into_iter().enumerate() {
                    if vector.len() == dimension {
                        out.push(vector);
                    } else {
                        warn!(
                            embedder = embedder.id(),
                            batch = batch_idx,
                            row = row,
                            expected = dimension,
                            actual = vector.len(),
                            "Embedding has wrong dimension; using zero vector"
                        );
                        degraded_rows += 1;
                        out.push(vec![0.0; dimension]);
                    }
                }
            }
            Ok(vectors) => {
                warn!(
                    embedder = embedder.id(),
                    batch = batch_idx,
                    expected = chunk.len(),
                    actual = vectors.len(),
                    "Embedding batch returned wrong row count; using zero vectors"
                );
                degraded_rows += chunk.len();
                out.extend(std::iter::repeat_n(vec![0.0; dimension], chunk.len()));
            }
            Err(e) => {
                warn!(
                    embedder = embedder.id(),
                    batch = batch_idx,
                    rows = chunk.len(),
                    error = %e,
                    "Embedding batch failed; using zero vectors"
                );
                degraded_rows += chunk.len();
                out.extend(std::iter::repeat_n(vec![0.0; dimension], chunk.len()));
            }
        }
    }

    debug!(
        embedder = embedder.id(),
        texts = texts.len(),
        degraded_rows = degraded_rows,
        latency_ms = start.elapsed().as_millis(),
        "Corpus embedding completed"
    );
    out
}

/// Embed one query text, degrading to a zero vector on failure.
pub fn embed_query(embedder: &dyn Embedder, query: &str) -> Vec<f32> {
    embed_corpus(embedder, &[query.to_string()], 1)
        .pop()
        .unwrap_or_else(|| vec![0.0; embedder.dimension()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::hash_embedder::HashEmbedder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails any batch that contains the text `"boom"`.
    struct FlakyEmbedder {
        dim: usize,
        calls: AtomicUsize,
    }

    impl Embedder for FlakyEmbedder {
        fn embed_batch(&self, texts: &[&str]) -> EmbedderResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if texts.contains(&"boom") {
                return Err(EmbedderError::EmbeddingFailed {
                    model: "flaky".to_string(),
                    source: Box::new(std::io::Error::other("synthetic failure")),
                });
            }
            Ok(texts.iter().map(|_| vec![1.0; self.dim]).collect())
        }

        fn dimension(&self) -> usize {
            self.dim
        }

        fn id(&self) -> &str {
            "flaky"
        }

        fn is_semantic(&self) -> bool {
            false
        }
    }

    /// Returns vectors of the wrong dimension for texts starting with `"short"`.
    struct ShortRowEmbedder;

    impl Embedder for ShortRowEmbedder {
        fn embed_batch(&self, texts: &[&str]) -> EmbedderResult<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.starts_with("short") {
                        vec![1.0; 2]
                    } else {
                        vec![1.0; 4]
                    }
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            4
        }

        fn id(&self) -> &str {
            "short-row"
        }

        fn is_semantic(&self) -> bool {
            false
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_failed_batch_degrades_only_its_rows() {
        let embedder = FlakyEmbedder {
            dim: 3,
            calls: AtomicUsize::new(0),
        };
        let corpus = texts(&["a", "b", "boom", "c", "d"]);
        let vectors = embed_corpus(&embedder, &corpus, 2);

        assert_eq!(vectors.len(), 5);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(vectors[0], vec![1.0; 3]);
        assert_eq!(vectors[1], vec![1.0; 3]);
        assert_eq!(vectors[2], vec![0.0; 3]);
        assert_eq!(vectors[3], vec![0.0; 3]);
        assert_eq!(vectors[4], vec![1.0; 3]);
    }

    #[test]
    fn test_wrong_dimension_row_is_zeroed() {
        let corpus = texts(&["ok", "short row", "fine"]);
        let vectors = embed_corpus(&ShortRowEmbedder, &corpus, 10);
        assert_eq!(vectors[0], vec![1.0; 4]);
        assert_eq!(vectors[1], vec![0.0; 4]);
        assert_eq!(vectors[2], vec![1.0; 4]);
    }

    #[test]
    fn test_newlines_flattened_before_embedding() {
        let embedder = HashEmbedder::new(32);
        let with_newline = embed_corpus(&embedder, &texts(&["two\nwords"]), 1);
        let with_space = embed_corpus(&embedder, &texts(&["two words"]), 1);
        assert_eq!(with_newline, with_space);
    }

    #[test]
    fn test_embed_query_degrades_to_zero() {
        let embedder = FlakyEmbedder {
            dim: 5,
            calls: AtomicUsize::new(0),
        };
        assert_eq!(embed_query(&embedder, "boom"), vec![0.0; 5]);
        assert_eq!(embed_query(&embedder, "fine"), vec![1.0; 5]);
    }

    #[test]
    fn test_empty_corpus_makes_no_calls() {
        let embedder = FlakyEmbedder {
            dim: 3,
            calls: AtomicUsize::new(0),
        };
        assert!(embed_corpus(&embedder, &[], 100).is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_embedder_info() {
        let embedder = HashEmbedder::new(64);
        let info = EmbedderInfo::from_embedder(&embedder);
        assert_eq!(info.dimension, 64);
        assert!(!info.is_semantic);
        let display = format!("{info}");
        assert!(display.contains("fnv1a-64"));
        assert!(display.contains("lexical"));
    }

    #[test]
    fn test_embedder_error_display() {
        let err = EmbedderError::Unavailable {
            model: "test".to_string(),
            reason: "no api key".to_string(),
        };
        assert!(err.to_string().contains("no api key"));

        let err = EmbedderError::EmbeddingFailed {
            model: "test".to_string(),
            source: Box::new(std::io::Error::other("quota exceeded")),
        };
        assert!(err.to_string().contains("quota exceeded"));
    }
}
