// tests/classifier_selection.rs
//
// Source selection: deterministic keyword strategy and the AI-backed strategy
// with its fallback.

use std::sync::{Arc, Mutex};

use multisearch::ai::{
    AiBackend, AiError, AiFuture, DisabledBackend, MockBackend, RawClassification,
};
use multisearch::classifier::{build_classifier, AiClassifier, Classifier, KeywordClassifier};
use multisearch::types::SourceId;

#[tokio::test]
async fn weather_in_paris_selects_weather_with_location() {
    let c = KeywordClassifier::default().classify("weather in Paris").await;
    assert!(c.sources.contains(&SourceId::Weather));
    assert_eq!(c.location.as_deref(), Some("Paris"));
    assert_eq!(c.search_terms, "weather in Paris");
}

#[test]
fn keyword_strategy_is_idempotent() {
    let k = KeywordClassifier::default();
    for q in [
        "weather in Paris",
        "latest research on cancer treatment",
        "who wrote the novel Dune",
        "air quality at Beijing today",
        "",
        "where is the Eiffel tower",
    ] {
        assert_eq!(k.classify_query(q), k.classify_query(q), "query {q:?}");
    }
}

#[test]
fn keyword_strategy_never_exceeds_its_cap() {
    let q = "weather research medical book map pollution";
    assert_eq!(KeywordClassifier::new(4).classify_query(q).sources.len(), 4);
    assert_eq!(KeywordClassifier::new(2).classify_query(q).sources.len(), 2);
}

/// Replays one scripted reply and records what it was asked.
struct Scripted {
    reply: Mutex<Option<Result<RawClassification, AiError>>>,
    asked: Mutex<Vec<String>>,
    cap_seen: Mutex<Option<usize>>,
}

impl Scripted {
    fn new(reply: Result<RawClassification, AiError>) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Some(reply)),
            asked: Mutex::new(Vec::new()),
            cap_seen: Mutex::new(None),
        })
    }
}

impl AiBackend for Scripted {
    fn classify_query<'a>(
        &'a self,
        query: &'a str,
        max_sources: usize,
    ) -> AiFuture<'a, RawClassification> {
        self.asked.lock().unwrap().push(query.to_string());
        *self.cap_seen.lock().unwrap() = Some(max_sources);
        let reply = self
            .reply
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(AiError::Unconfigured));
        Box::pin(async move { reply })
    }
    fn synthesize<'a>(&'a self, _query: &'a str, _data: &'a str) -> AiFuture<'a, String> {
        Box::pin(async { Err(AiError::Unconfigured) })
    }
    fn is_configured(&self) -> bool {
        true
    }
    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

#[tokio::test]
async fn backend_error_falls_back_to_keywords() {
    let backend = Scripted::new(Err(AiError::Status(500)));
    let ai = AiClassifier::new(backend.clone(), 4);
    let c = ai.classify("weather in Paris").await;
    assert_eq!(c, KeywordClassifier::default().classify_query("weather in Paris"));
    assert_eq!(backend.asked.lock().unwrap().as_slice(), ["weather in Paris"]);
}

#[tokio::test]
async fn unknown_sources_are_dropped_and_capped() {
    let backend = Scripted::new(Ok(RawClassification {
        sources: vec![
            "myspace".into(),
            "arxiv".into(),
            "pubmed".into(),
            "arxiv".into(),
            "books".into(),
            "wikipedia".into(),
            "github".into(),
        ],
        location: Some("  ".into()),
        search_terms: "  crispr gene editing ".into(),
    }));
    let c = AiClassifier::new(backend, 4)
        .classify("tell me about crispr gene editing")
        .await;
    assert_eq!(
        c.sources,
        vec![SourceId::Arxiv, SourceId::Pubmed, SourceId::Books, SourceId::Wikipedia]
    );
    assert_eq!(c.location, None);
    assert_eq!(c.search_terms, "crispr gene editing");
}

#[tokio::test]
async fn reply_with_no_known_sources_falls_back() {
    let backend = Scripted::new(Ok(RawClassification {
        sources: vec!["friendster".into()],
        location: None,
        search_terms: String::new(),
    }));
    let c = AiClassifier::new(backend, 4).classify("pollution in Delhi").await;
    assert!(c.sources.contains(&SourceId::AirQuality));
    assert_eq!(c.location.as_deref(), Some("Delhi"));
}

#[tokio::test]
async fn strategy_is_chosen_by_backend_capability() {
    assert_eq!(build_classifier(Arc::new(DisabledBackend), 4).name(), "keyword");
    assert_eq!(build_classifier(Arc::new(MockBackend), 4).name(), "ai");
}

#[tokio::test]
async fn configured_cap_reaches_the_backend() {
    let backend = Scripted::new(Err(AiError::Status(500)));
    AiClassifier::new(backend.clone(), 2).classify("anything").await;
    assert_eq!(*backend.cap_seen.lock().unwrap(), Some(2));
}
