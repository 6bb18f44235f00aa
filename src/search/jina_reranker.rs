//! Jina rerank API client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::reranker::{RerankHit, Reranker, RerankerError, RerankerResult};

pub const DEFAULT_JINA_ENDPOINT: &str = "https://api.jina.ai/v1/rerank";
pub const DEFAULT_JINA_MODEL: &str = "jina-reranker-v2-base-multilingual";

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [&'a str],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    #[serde(default)]
    results: Option<Vec<RerankHit>>,
}

pub struct JinaReranker {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl JinaReranker {
    /// Build a client with a bounded per-request timeout (at least one second).
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> RerankerResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|err| RerankerError::Unavailable(format!("rerank http client: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }
}

impl Reranker for JinaReranker {
    fn rerank(&self, query: &str, documents: &[&str], top_n: usize) -> RerankerResult<Vec<RerankHit>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(RerankerError::Unavailable("API key not set".to_string()));
        };

        let request = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .map_err(|err| RerankerError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RerankerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RerankResponse = response
            .json()
            .map_err(|err| RerankerError::InvalidResponse(err.to_string()))?;
        let hits = parsed
            .results
            .ok_or_else(|| RerankerError::InvalidResponse("missing `results`".to_string()))?;

        debug!(
            model = %self.model,
            documents = documents.len(),
            hits = hits.len(),
            "Rerank response received"
        );
        Ok(hits)
    }

    fn id(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}
