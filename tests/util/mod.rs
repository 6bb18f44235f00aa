use listing_search::model::{Enrichment, Listing, ListingId, Place, RawListing};
use listing_search::search::embedder::{Embedder, EmbedderError, EmbedderResult};
use listing_search::search::reranker::{RerankHit, Reranker, RerankerError, RerankerResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }
}

struct TestWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[allow(dead_code)]
pub struct EnvGuard {
    key: String,
    prev: Option<String>,
}

#[allow(dead_code)]
impl EnvGuard {
    pub fn set(key: &str, val: impl AsRef<str>) -> Self {
        let prev = std::env::var(key).ok();
        unsafe { std::env::set_var(key, val.as_ref()) };
        Self {
            key: key.to_string(),
            prev,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => unsafe { std::env::set_var(&self.key, v) },
            None => unsafe { std::env::remove_var(&self.key) },
        }
    }
}

// =============================================================================
// Listing fixtures
// =============================================================================

#[allow(dead_code)]
pub fn listing(id: ListingId, title: &str, description: &str) -> Listing {
    Listing {
        id,
        title: title.to_string(),
        price: 100_000 + id * 1_000,
        address: format!("ул. Абая {id}"),
        description: description.to_string(),
        full_text_content: format!("Description: {description}\nTitle: {title}"),
    }
}

/// Small mixed-language apartment batch.
#[allow(dead_code)]
pub fn sample_listings() -> Vec<Listing> {
    vec![
        listing(1, "2-комн квартира", "уютная квартира рядом со школой и парком"),
        listing(2, "Студия у метро", "студия в пяти минутах от метро, новый ремонт"),
        listing(3, "Дом с гаражом", "частный дом, гараж на две машины, сад"),
        listing(4, "3-комн квартира", "просторная квартира, школа во дворе"),
        listing(5, "Office space", "open plan office near the metro station"),
    ]
}

#[allow(dead_code)]
pub fn raw_listing(id: ListingId, title: &str) -> RawListing {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "title": title,
        "price": 150000 + id,
        "geoLocation": { "addressTitle": format!("ул. Абая {id}") },
    }))
    .expect("raw listing fixture")
}

#[allow(dead_code)]
pub fn enrichment(id: ListingId, text: &str, places: Vec<Place>) -> Enrichment {
    Enrichment {
        id,
        original_text: text.to_string(),
        places,
    }
}

/// Write `value` as JSON into a fresh temp dir.
#[allow(dead_code)]
pub fn write_json<T: Serialize>(dir: &TempDir, name: &str, value: &T) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(value).expect("serialize fixture"))
        .expect("write fixture");
    path
}

#[allow(dead_code)]
pub fn write_text(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

// =============================================================================
// Deterministic providers
// =============================================================================

/// One dimension per keyword; a text scores 1 on each keyword it contains.
#[allow(dead_code)]
pub struct KeywordEmbedder {
    keywords: Vec<&'static str>,
}

#[allow(dead_code)]
impl KeywordEmbedder {
    pub fn new(keywords: Vec<&'static str>) -> Self {
        Self { keywords }
    }
}

impl Embedder for KeywordEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> EmbedderResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                self.keywords
                    .iter()
                    .map(|kw| if text.contains(kw) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.keywords.len()
    }

    fn id(&self) -> &str {
        "keyword-test"
    }

    fn is_semantic(&self) -> bool {
        true
    }
}

/// Fails every call.
#[allow(dead_code)]
pub struct FailingEmbedder {
    pub dimension: usize,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl FailingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Embedder for FailingEmbedder {
    fn embed_batch(&self, _texts: &[&str]) -> EmbedderResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EmbedderError::Unavailable {
            model: "failing".into(),
            reason: "offline".into(),
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn id(&self) -> &str {
        "failing-test"
    }

    fn is_semantic(&self) -> bool {
        true
    }
}

/// Returns a fixed response and records the documents it was shown.
#[allow(dead_code)]
pub struct ScriptedReranker {
    response: Result<Vec<RerankHit>, String>,
    pub seen: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedReranker {
    pub fn hits(hits: &[(usize, f32)]) -> Self {
        Self {
            response: Ok(hits
                .iter()
                .map(|&(index, relevance_score)| RerankHit {
                    index,
                    relevance_score,
                })
                .collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl Reranker for ScriptedReranker {
    fn rerank(&self, _query: &str, documents: &[&str], _top_n: usize) -> RerankerResult<Vec<RerankHit>> {
        self.seen
            .lock()
            .unwrap()
            .extend(documents.iter().map(|d| d.to_string()));
        match &self.response {
            Ok(hits) => Ok(hits.clone()),
            Err(reason) => Err(RerankerError::Transport(reason.clone())),
        }
    }

    fn id(&self) -> &str {
        "scripted-test"
    }

    fn is_available(&self) -> bool {
        self.response.is_ok()
    }
}
