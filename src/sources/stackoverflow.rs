// src/sources/stackoverflow.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_json, Endpoint};
use super::{clean_text, no_results, SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://api.stackexchange.com";

/// Stack Overflow question search. StackExchange always gzips its responses,
/// which the shared client decodes transparently.
pub struct StackOverflowAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct Question {
    #[serde(default)]
    title: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    answer_count: u64,
    #[serde(default)]
    is_answered: bool,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    link: String,
    #[serde(default)]
    view_count: u64,
}

impl StackOverflowAdapter {
    pub fn new(client: Client) -> Self {
        Self {
            endpoint: Endpoint::new(client, DEFAULT_BASE),
        }
    }

    pub fn with_base_url(mut self, base: &str) -> Self {
        self.endpoint = self.endpoint.with_base(base);
        self
    }
}

#[async_trait]
impl SourceAdapter for StackOverflowAdapter {
    fn id(&self) -> SourceId {
        SourceId::Stackoverflow
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        let pagesize = params.limit.to_string();
        let req = self
            .endpoint
            .get(self.endpoint.url("/2.3/search/advanced"))
            .query(&[
                ("q", params.query.as_str()),
                ("order", "desc"),
                ("sort", "relevance"),
                ("site", "stackoverflow"),
                ("pagesize", pagesize.as_str()),
            ]);
        let resp: SearchResponse = fetch_json(req).await?;

        if resp.items.is_empty() {
            return Ok(no_results(format!(
                "No Stack Overflow questions found for '{}'",
                params.query
            )));
        }

        let questions: Vec<Value> = resp
            .items
            .into_iter()
            .take(params.limit)
            .map(|q| {
                json!({
                    "title": clean_text(&q.title),
                    "score": q.score,
                    "answer_count": q.answer_count,
                    "is_answered": q.is_answered,
                    "tags": q.tags.into_iter().take(5).collect::<Vec<_>>(),
                    "url": q.link,
                    "view_count": q.view_count,
                })
            })
            .collect();
        Ok(Value::Array(questions))
    }
}
