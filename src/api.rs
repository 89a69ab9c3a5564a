// src/api.rs
//! HTTP surface: health, source listing, and the search endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::aggregator::{Aggregator, Answer, AnswerOptions};
use crate::config::aggregator::SelectionMode;
use crate::synthesis::RenderMode;
use crate::types::query_id;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/sources", get(list_sources))
        .route("/search", post(search))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SearchReq {
    query: String,
    #[serde(default)]
    mode: Option<RenderMode>,
    #[serde(default)]
    all_sources: Option<bool>,
}

#[derive(Debug, Serialize)]
struct SourceInfo {
    id: &'static str,
    label: &'static str,
    domain: &'static str,
}

#[derive(Debug, Serialize)]
struct SourcesResp {
    sources: Vec<SourceInfo>,
    classifier: &'static str,
    synthesizer: &'static str,
}

async fn list_sources(State(state): State<AppState>) -> Json<SourcesResp> {
    let agg = &state.aggregator;
    let sources = agg
        .registry()
        .ids()
        .into_iter()
        .map(|id| SourceInfo {
            id: id.as_str(),
            label: id.label(),
            domain: id.domain(),
        })
        .collect();
    Json(SourcesResp {
        sources,
        classifier: agg.classifier_name(),
        synthesizer: agg.synthesizer_name(),
    })
}

async fn search(
    State(state): State<AppState>,
    Json(body): Json<SearchReq>,
) -> Result<Json<Answer>, (StatusCode, Json<Value>)> {
    let query = body.query.trim();
    if query.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "query must not be empty" })),
        ));
    }

    let options = AnswerOptions {
        mode: body.mode.unwrap_or_default(),
        selection: body.all_sources.map(|all| {
            if all {
                SelectionMode::All
            } else {
                SelectionMode::Classified
            }
        }),
    };
    let answer = state.aggregator.answer(query, options).await;
    tracing::info!(
        target: "api",
        id = %query_id(query),
        sources = answer.results.len(),
        elapsed_ms = answer.elapsed_ms,
        mode = ?answer.rendered.mode,
        "search answered"
    );
    Ok(Json(answer))
}
