//! OpenAI-compatible embeddings client.
//!
//! Posts `{"input": [...], "model": "..."}` to the configured endpoint and
//! reads `data[].embedding`, reordered by `data[].index`. Works against any
//! server that speaks the same shape.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::embedder::{Embedder, EmbedderError, EmbedderResult};

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_DIMENSION: usize = 1536;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [&'a str],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

pub struct OpenAiEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        dimension: usize,
        timeout_secs: u64,
    ) -> EmbedderResult<Self> {
        let model = model.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|err| EmbedderError::Unavailable {
                model: model.clone(),
                reason: format!("http client: {err}"),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            dimension,
        })
    }

    fn failed(&self, err: impl std::error::Error + Send + Sync + 'static) -> EmbedderError {
        EmbedderError::EmbeddingFailed {
            model: self.model.clone(),
            source: Box::new(err),
        }
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> EmbedderResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(EmbedderError::Unavailable {
                model: self.model.clone(),
                reason: "API key not set".to_string(),
            });
        };

        let request = EmbeddingRequest {
            input: texts,
            model: &self.model,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .map_err(|err| self.failed(err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbedderError::Http {
                model: self.model.clone(),
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let mut parsed: EmbeddingResponse = response.json().map_err(|err| self.failed(err))?;
        if parsed.data.len() != texts.len() {
            return Err(EmbedderError::CountMismatch {
                model: self.model.clone(),
                expected: texts.len(),
                actual: parsed.data.len(),
            });
        }
        if parsed.data.iter().all(|row| row.index.is_some()) {
            parsed.data.sort_by_key(|row| row.index);
        }

        debug!(model = %self.model, rows = parsed.data.len(), "Embedding batch received");
        Ok(parsed.data.into_iter().map(|row| row.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn id(&self) -> &str {
        &self.model
    }

    fn is_semantic(&self) -> bool {
        true
    }
}
