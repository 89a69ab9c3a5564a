// src/sources/wikidata.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_json, Endpoint};
use super::{no_results, SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://www.wikidata.org";

/// Entity search over Wikidata (`wbsearchentities`).
pub struct WikidataAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    #[serde(default)]
    id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    concepturi: String,
}

impl WikidataAdapter {
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
impl SourceAdapter for WikidataAdapter {
    fn id(&self) -> SourceId {
        SourceId::Wikidata
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        let limit = params.limit.to_string();
        let req = self.endpoint.get(self.endpoint.url("/w/api.php")).query(&[
            ("action", "wbsearchentities"),
            ("search", params.query.as_str()),
            ("language", "en"),
            ("limit", limit.as_str()),
            ("format", "json"),
        ]);
        let resp: SearchResponse = fetch_json(req).await?;

        if resp.search.is_empty() {
            return Ok(no_results(format!(
                "No Wikidata entities found for '{}'",
                params.query
            )));
        }

        let items: Vec<Value> = resp
            .search
            .into_iter()
            .take(params.limit)
            .map(|e| {
                json!({
                    "id": e.id,
                    "label": e.label,
                    "description": e.description,
                    "url": e.concepturi,
                })
            })
            .collect();
        Ok(Value::Array(items))
    }
}
