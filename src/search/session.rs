//! One-shot hybrid search session over a fixed listing batch.
//!
//! `build` normalises, embeds and indexes every listing once; both indices share
//! the same row order and an explicit row→id table resolves hits back to
//! listings. A new batch means a new session.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use super::SearchError;
use super::bm25::Bm25Index;
use super::canonicalize::{canonicalize, tokenize};
use super::embedder::{DEFAULT_BATCH_SIZE, Embedder, EmbedderInfo, embed_corpus, embed_query};
use super::fusion::{FusedHit, FusionConfig, fuse};
use super::vector_index::DenseIndex;
use crate::model::{Listing, ListingId, ScoredListing};

pub struct SearchSession {
    listings: Vec<Listing>,
    row_ids: Vec<ListingId>,
    rows_by_id: HashMap<ListingId, usize>,
    dense: DenseIndex,
    sparse: Bm25Index,
    embedder: Arc<dyn Embedder>,
    config: FusionConfig,
}

impl SearchSession {
    pub fn build(
        listings: Vec<Listing>,
        embedder: Arc<dyn Embedder>,
        config: FusionConfig,
    ) -> Result<Self, SearchError> {
        Self::build_with_batch_size(listings, embedder, config, DEFAULT_BATCH_SIZE)
    }

    /// Build both indices, embedding in chunks of `batch_size`.
    ///
    /// # Errors
    ///
    /// [`SearchError::DuplicateId`] if two listings share an id, or a
    /// dimension error if the embedder breaks its own dimension contract.
    pub fn build_with_batch_size(
        listings: Vec<Listing>,
        embedder: Arc<dyn Embedder>,
        config: FusionConfig,
        batch_size: usize,
    ) -> Result<Self, SearchError> {
        let start = Instant::now();

        let mut rows_by_id = HashMap::with_capacity(listings.len());
        let mut row_ids = Vec::with_capacity(listings.len());
        for (row, listing) in listings.iter().enumerate() {
            if rows_by_id.insert(listing.id, row).is_some() {
                return Err(SearchError::DuplicateId(listing.id));
            }
            row_ids.push(listing.id);
        }

        let corpus: Vec<String> = listings.iter().map(|l| canonicalize(&indexed_text(l))).collect();
        let vectors = embed_corpus(embedder.as_ref(), &corpus, batch_size);
        let dense = DenseIndex::build(embedder.dimension(), vectors)?;

        let tokens: Vec<Vec<String>> = corpus.iter().map(|text| tokenize(text)).collect();
        let sparse = Bm25Index::build(&tokens);

        info!(
            listings = listings.len(),
            embedder = %EmbedderInfo::from_embedder(embedder.as_ref()),
            elapsed_ms = start.elapsed().as_millis(),
            "Search session built"
        );

        Ok(Self {
            listings,
            row_ids,
            rows_by_id,
            dense,
            sparse,
            embedder,
            config,
        })
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn embedder_info(&self) -> EmbedderInfo {
        EmbedderInfo::from_embedder(self.embedder.as_ref())
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn listing(&self, id: ListingId) -> Option<&Listing> {
        self.rows_by_id.get(&id).map(|&row| &self.listings[row])
    }

    /// Hybrid search returning at most `top_k` `(id, score)` pairs.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredListing>, SearchError> {
        let hits = self.search_hits(query, top_k)?;
        Ok(hits
            .into_iter()
            .map(|hit| ScoredListing::new(self.row_ids[hit.position], hit.score))
            .collect())
    }

    /// Like [`search`](Self::search) but keeps row positions and the component
    /// scores.
    pub fn search_hits(&self, query: &str, top_k: usize) -> Result<Vec<FusedHit>, SearchError> {
        if top_k == 0 {
            return Err(SearchError::InvalidK(top_k));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();

        let canonical = canonicalize(query);
        let query_vector = embed_query(self.embedder.as_ref(), &canonical);
        let candidates = self.config.dense_candidates.min(self.len());
        let dense_hits = self.dense.search(&query_vector, candidates)?;

        let sparse_scores = self.sparse.score_all(&tokenize(&canonical));
        let mut fused = fuse(&dense_hits, &sparse_scores, self.config.alpha);
        fused.truncate(top_k);

        debug!(
            query = %canonical,
            candidates = dense_hits.len(),
            returned = fused.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Hybrid search completed"
        );
        Ok(fused)
    }

    pub fn id_at(&self, position: usize) -> Option<ListingId> {
        self.row_ids.get(position).copied()
    }
}

/// The text a listing is indexed under. Falls back to title and description
/// when no assembled full text is present.
fn indexed_text(listing: &Listing) -> Cow<'_, str> {
    if listing.full_text_content.trim().is_empty() {
        Cow::Owned(format!("{} {}", listing.title, listing.description))
    } else {
        Cow::Borrowed(&listing.full_text_content)
    }
}
