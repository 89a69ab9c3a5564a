// src/sources/quotes.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_json, Endpoint};
use super::{no_results, SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://api.quotable.io";

const RANDOM_FALLBACK: usize = 3;

/// Quotable search. When the search finds nothing or fails, a few random
/// quotes are returned instead; only a failure of that fallback is a Failure.
pub struct QuotesAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    content: String,
    author: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl QuotesAdapter {
    pub fn new(client: Client) -> Self {
        Self {
            endpoint: Endpoint::new(client, DEFAULT_BASE),
        }
    }

    pub fn with_base_url(mut self, base: &str) -> Self {
        self.endpoint = self.endpoint.with_base(base);
        self
    }

    async fn search(&self, params: &CallParams) -> Result<Vec<Quote>, SourceError> {
        let limit = params.limit.to_string();
        let req = self
            .endpoint
            .get(self.endpoint.url("/search/quotes"))
            .query(&[("query", params.query.as_str()), ("limit", limit.as_str())]);
        let resp: SearchResponse = fetch_json(req).await?;
        Ok(resp.results)
    }

    async fn random(&self, limit: usize) -> Result<Vec<Quote>, SourceError> {
        let limit = limit.to_string();
        let req = self
            .endpoint
            .get(self.endpoint.url("/quotes/random"))
            .query(&[("limit", limit.as_str())]);
        fetch_json(req).await
    }
}

fn shape(quotes: Vec<Quote>, limit: usize) -> Vec<Value> {
    quotes
        .into_iter()
        .filter(|q| !q.content.is_empty())
        .take(limit)
        .map(|q| {
            json!({
                "content": q.content,
                "author": q.author.unwrap_or_else(|| "Unknown".into()),
                "tags": q.tags,
            })
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for QuotesAdapter {
    fn id(&self) -> SourceId {
        SourceId::Quotes
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        match self.search(params).await {
            Ok(found) if !found.is_empty() => {
                let items = shape(found, params.limit);
                if !items.is_empty() {
                    return Ok(Value::Array(items));
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(target: "sources", error = %e, "quote search failed; trying random quotes");
            }
        }

        let items = shape(self.random(RANDOM_FALLBACK).await?, RANDOM_FALLBACK);
        if items.is_empty() {
            return Ok(no_results("No quotes available"));
        }
        Ok(Value::Array(items))
    }
}
