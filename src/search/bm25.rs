//! Okapi BM25 over whitespace tokens.
//!
//! Scoring follows the common Okapi variant: `idf = ln((N - n + 0.5) / (n + 0.5))`,
//! and terms whose idf comes out negative (present in more than half of the
//! documents) are floored to `epsilon * mean_idf` instead of penalising matches.

use std::collections::HashMap;

pub const DEFAULT_K1: f32 = 1.5;
pub const DEFAULT_B: f32 = 0.75;
pub const DEFAULT_EPSILON: f32 = 0.25;

#[derive(Debug, Clone)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
    pub epsilon: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: DEFAULT_K1,
            b: DEFAULT_B,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bm25Index {
    params: Bm25Params,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    avg_doc_len: f32,
    idf: HashMap<String, f32>,
}

impl Bm25Index {
    pub fn build(corpus: &[Vec<String>]) -> Self {
        Self::with_params(corpus, Bm25Params::default())
    }

    pub fn with_params(corpus: &[Vec<String>], params: Bm25Params) -> Self {
        let mut term_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lens = Vec::with_capacity(corpus.len());
        let mut doc_freq: HashMap<String, u32> = HashMap::new();
        let mut total_tokens = 0usize;

        for doc in corpus {
            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in doc {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            total_tokens += doc.len();
            doc_lens.push(doc.len());
            term_freqs.push(freqs);
        }

        let n_docs = corpus.len() as f32;
        let avg_doc_len = if corpus.is_empty() {
            0.0
        } else {
            total_tokens as f32 / n_docs
        };

        let mut idf = HashMap::with_capacity(doc_freq.len());
        let mut idf_sum = 0.0f32;
        let mut negative = Vec::new();
        for (term, df) in doc_freq {
            let df = df as f32;
            let value = ((n_docs - df + 0.5) / (df + 0.5)).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }
        if !idf.is_empty() {
            let floor = params.epsilon * idf_sum / idf.len() as f32;
            for term in negative {
                idf.insert(term, floor);
            }
        }

        Self {
            params,
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lens.is_empty()
    }

    /// Inverse document frequency of `term`, 0 for unseen terms.
    pub fn idf(&self, term: &str) -> f32 {
        self.idf.get(term).copied().unwrap_or(0.0)
    }

    /// One score per indexed document, in indexing order.
    ///
    /// A token repeated in the query contributes once per occurrence.
    pub fn score_all(&self, query: &[String]) -> Vec<f32> {
        let Bm25Params { k1, b, .. } = self.params;
        let mut scores = vec![0.0f32; self.len()];

        for token in query {
            let idf = self.idf(token);
            if idf == 0.0 {
                continue;
            }
            for (doc, score) in scores.iter_mut().enumerate() {
                let tf = self.term_freqs[doc].get(token).copied().unwrap_or(0) as f32;
                if tf == 0.0 {
                    continue;
                }
                let len_ratio = if self.avg_doc_len > 0.0 {
                    self.doc_lens[doc] as f32 / self.avg_doc_len
                } else {
                    0.0
                };
                *score += idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * len_ratio));
            }
        }
        scores
    }
}
