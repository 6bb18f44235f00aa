//! Flat exact vector index over L2-normalised embeddings.
//!
//! Vectors are stored row-major in one contiguous buffer; cosine similarity is
//! the inner product of normalised rows, computed with `wide::f32x8`.

use wide::f32x8;

use super::SearchError;
use super::hash_embedder::l2_normalize;

/// One dense retrieval result: a row position and its cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenseHit {
    pub position: usize,
    pub similarity: f32,
}

#[derive(Debug, Clone)]
pub struct DenseIndex {
    dimension: usize,
    rows: usize,
    data: Vec<f32>,
}

impl DenseIndex {
    /// Normalise and store `vectors`. Every row must have `dimension` entries.
    ///
    /// Zero rows stay zero and score 0 against every query.
    pub fn build(dimension: usize, vectors: Vec<Vec<f32>>) -> Result<Self, SearchError> {
        let rows = vectors.len();
        let mut data = Vec::with_capacity(rows * dimension);
        for mut vector in vectors {
            if vector.len() != dimension {
                return Err(SearchError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            l2_normalize(&mut vector);
            data.extend_from_slice(&vector);
        }
        Ok(Self {
            dimension,
            rows,
            data,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Top `k` rows by descending cosine similarity; `k` is clamped to the
    /// corpus size. Equal similarities keep row order.
    ///
    /// # Errors
    ///
    /// [`SearchError::InvalidK`] when `k == 0`, and
    /// [`SearchError::DimensionMismatch`] when the query has the wrong length.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<DenseHit>, SearchError> {
        if k == 0 {
            return Err(SearchError::InvalidK(k));
        }
        if query.len() != self.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let mut normalized = query.to_vec();
        l2_normalize(&mut normalized);

        let mut hits: Vec<DenseHit> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| DenseHit {
                position,
                similarity: dot_product(row, &normalized),
            })
            .collect();

        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(k.min(self.rows));
        Ok(hits)
    }
}

/// Inner product of two equal-length slices.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    let mut acc = f32x8::ZERO;
    let a_chunks = a.chunks_exact(8);
    let b_chunks = b.chunks_exact(8);
    let tail: f32 = a_chunks
        .remainder()
        .iter()
        .zip(b_chunks.remainder())
        .map(|(x, y)| x * y)
        .sum();

    for (ca, cb) in a_chunks.zip(b_chunks) {
        let mut lanes_a = [0.0f32; 8];
        let mut lanes_b = [0.0f32; 8];
        lanes_a.copy_from_slice(ca);
        lanes_b.copy_from_slice(cb);
        acc += f32x8::from(lanes_a) * f32x8::from(lanes_b);
    }

    acc.to_array().iter().sum::<f32>() + tail
}
