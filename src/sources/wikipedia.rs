// src/sources/wikipedia.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_json, Endpoint};
use super::{cap_text, clean_text, SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://en.wikipedia.org";

/// Page summary from the Wikipedia REST API.
pub struct WikipediaAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct Summary {
    title: Option<String>,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    content_urls: ContentUrls,
}

#[derive(Debug, Default, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: Option<String>,
}

impl WikipediaAdapter {
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

fn missing(query: &str) -> Value {
    json!({
        "exists": false,
        "message": format!("No Wikipedia article found for '{query}'"),
    })
}

#[async_trait]
impl SourceAdapter for WikipediaAdapter {
    fn id(&self) -> SourceId {
        SourceId::Wikipedia
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        let title = params.query.trim();
        let url = self
            .endpoint
            .url_with_segment("/api/rest_v1/page/summary", title)?;
        let page: Summary = match fetch_json(self.endpoint.get(url).query(&[("redirect", "true")]))
            .await
        {
            Ok(p) => p,
            Err(SourceError::NotFound) => return Ok(missing(title)),
            Err(e) => return Err(e),
        };

        let summary = clean_text(&page.extract);
        if summary.is_empty() {
            return Ok(missing(title));
        }

        Ok(json!({
            "title": page.title.unwrap_or_else(|| title.to_string()),
            "summary": cap_text(&summary, params.text_cap),
            "url": page.content_urls.desktop.and_then(|d| d.page),
            "exists": true,
        }))
    }
}
