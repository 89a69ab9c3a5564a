// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets, via
// tower::ServiceExt::oneshot. Adapters are scripted so no network is used.
//
// Covered:
// - GET /health
// - GET /sources
// - POST /search (structured answer, empty query rejection, all_sources)

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use multisearch::classifier::KeywordClassifier;
use multisearch::config::AggregatorConfig;
use multisearch::sources::{SourceAdapter, SourceError, SourceRegistry};
use multisearch::synthesis::TemplateSynthesizer;
use multisearch::types::{CallParams, SourceId};
use multisearch::{create_router, Aggregator, AppState};

const BODY_LIMIT: usize = 1024 * 1024;

struct Echo(SourceId);

#[async_trait]
impl SourceAdapter for Echo {
    fn id(&self) -> SourceId {
        self.0
    }
    async fn fetch(&self, params: &CallParams) -> Result<Json, SourceError> {
        Ok(json!({"title": format!("{} result", self.0), "summary": params.query, "url": "https://example.org"}))
    }
}

fn test_router() -> Router {
    let mut reg = SourceRegistry::new();
    for id in SourceId::ALL {
        reg.register(Arc::new(Echo(id)));
    }
    let agg = Aggregator::new(
        reg,
        Arc::new(KeywordClassifier::default()),
        Arc::new(TemplateSynthesizer),
        &AggregatorConfig::default(),
    );
    create_router(AppState::new(agg))
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn post_search(payload: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/search")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /search")
}

#[tokio::test]
async fn health_returns_ok() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = test_router().oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.expect("read body");
    assert_eq!(String::from_utf8_lossy(&bytes).trim(), "OK");
}

#[tokio::test]
async fn sources_lists_every_registered_source() {
    let req = Request::builder()
        .uri("/sources")
        .body(Body::empty())
        .expect("build GET /sources");
    let resp = test_router().oneshot(req).await.expect("oneshot /sources");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    let ids: Vec<&str> = v["sources"]
        .as_array()
        .expect("sources array")
        .iter()
        .filter_map(|s| s["id"].as_str())
        .collect();
    assert_eq!(ids.len(), SourceId::ALL.len());
    assert_eq!(ids[0], "weather");
    assert_eq!(v["classifier"], "keyword");
    assert_eq!(v["synthesizer"], "template");
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let resp = test_router()
        .oneshot(post_search(json!({"query": "   "})))
        .await
        .expect("oneshot /search");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = read_json(resp).await;
    assert!(v["error"].as_str().is_some());
}

#[tokio::test]
async fn search_returns_structured_answer_with_raw_results() {
    let resp = test_router()
        .oneshot(post_search(json!({"query": "weather in Paris"})))
        .await
        .expect("oneshot /search");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;

    assert_eq!(v["classification"]["location"], "Paris");
    assert_eq!(v["results"]["weather"]["status"], "success");
    assert_eq!(v["rendered"]["mode"], "structured");
    assert!(v["rendered"]["text"].as_str().unwrap_or_default().contains("**WEATHER**"));
    assert_eq!(v["results"].as_object().map(|m| m.len()), Some(3));
}

#[tokio::test]
async fn all_sources_flag_fans_out_to_everything() {
    let resp = test_router()
        .oneshot(post_search(json!({"query": "paris", "all_sources": true})))
        .await
        .expect("oneshot /search");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(
        v["results"].as_object().map(|m| m.len()),
        Some(SourceId::ALL.len())
    );
}
