//! HTTP provider tests against a local mock server.

use std::sync::Arc;

use httpmock::prelude::*;
use listing_search::search::embedder::{Embedder, EmbedderError, embed_corpus};
use listing_search::search::jina_reranker::JinaReranker;
use listing_search::search::openai_embedder::OpenAiEmbedder;
use listing_search::search::rerank_gate::{GateMode, RerankCandidate, RerankGate};
use listing_search::search::reranker::{Reranker, RerankerError};
use listing_search::model::ScoredListing;
use serde_json::json;

mod util;

fn embedder(server: &MockServer, key: Option<&str>) -> OpenAiEmbedder {
    OpenAiEmbedder::new(
        server.url("/v1/embeddings"),
        "text-embedding-3-small",
        key.map(str::to_string),
        3,
        5,
    )
    .unwrap()
}

fn reranker(server: &MockServer) -> JinaReranker {
    JinaReranker::new(
        server.url("/v1/rerank"),
        "jina-reranker-v2-base-multilingual",
        Some("jina-key".to_string()),
        5,
    )
    .unwrap()
}

// =============================================================================
// Embeddings
// =============================================================================

#[test]
fn openai_rows_are_reordered_by_index() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/embeddings")
            .header("authorization", "Bearer sk-test");
        then.status(200).json_body(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0, 0.0]},
                {"index": 0, "embedding": [1.0, 0.0, 0.0]}
            ]
        }));
    });

    let vectors = embedder(&server, Some("sk-test"))
        .embed_batch(&["first", "second"])
        .unwrap();
    mock.assert();
    assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
}

#[test]
fn openai_error_status_is_reported() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(429).body("rate limited");
    });

    let err = embedder(&server, Some("sk-test"))
        .embed_batch(&["x"])
        .unwrap_err();
    match err {
        EmbedderError::Http { status, body, .. } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn openai_short_response_is_count_mismatch() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200)
            .json_body(json!({"data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]}));
    });

    let err = embedder(&server, Some("sk-test"))
        .embed_batch(&["a", "b"])
        .unwrap_err();
    assert!(matches!(
        err,
        EmbedderError::CountMismatch {
            expected: 2,
            actual: 1,
            ..
        }
    ));
}

#[test]
fn missing_api_key_never_hits_the_network() {
    // No mock registered: any request would come back 404 and surface as
    // `Http`, not `Unavailable`.
    let server = MockServer::start();
    let err = embedder(&server, None).embed_batch(&["x"]).unwrap_err();
    assert!(matches!(err, EmbedderError::Unavailable { .. }));
}

#[test]
fn corpus_embedding_survives_server_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(500).body("upstream down");
    });

    let texts = vec!["один".to_string(), "два\nтри".to_string()];
    let vectors = embed_corpus(&embedder(&server, Some("sk-test")), &texts, 100);
    assert_eq!(vectors, vec![vec![0.0; 3], vec![0.0; 3]]);
}

// =============================================================================
// Reranking
// =============================================================================

#[test]
fn jina_results_are_parsed_in_provider_order() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/rerank")
            .header("authorization", "Bearer jina-key");
        then.status(200).json_body(json!({
            "model": "jina-reranker-v2-base-multilingual",
            "results": [
                {"index": 2, "relevance_score": 0.91, "document": {"text": "c"}},
                {"index": 0, "relevance_score": 0.40}
            ]
        }));
    });

    let hits = reranker(&server).rerank("query", &["a", "b", "c"], 2).unwrap();
    mock.assert();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].index, 2);
    assert!((hits[0].relevance_score - 0.91).abs() < 1e-6);
    assert_eq!(hits[1].index, 0);
}

#[test]
fn jina_missing_results_is_invalid_response() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/rerank");
        then.status(200).json_body(json!({"detail": "quota"}));
    });

    let err = reranker(&server).rerank("q", &["a"], 1).unwrap_err();
    assert!(matches!(err, RerankerError::InvalidResponse(_)));
}

#[test]
fn gate_falls_back_on_server_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/rerank");
        then.status(503).body("busy");
    });

    let gate = RerankGate::new(Arc::new(reranker(&server)), 0.3);
    let candidates = [
        RerankCandidate {
            hit: ScoredListing::new(10, 0.8),
            text: "first",
        },
        RerankCandidate {
            hit: ScoredListing::new(11, 0.7),
            text: "second",
        },
    ];

    let tracing = util::TestTracing::new();
    let _guard = tracing.install();
    let out = gate.apply("q", &candidates, 1).unwrap();
    assert_eq!(out.mode, GateMode::Fallback);
    assert_eq!(out.results, vec![ScoredListing::new(10, 0.8)]);
    tracing.assert_contains("Rerank failed");
}
