// src/sources/arxiv.rs
use async_trait::async_trait;
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_text, Endpoint};
use super::{cap_text, clean_text, no_results, SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://export.arxiv.org";

/// Paper search over the arXiv Atom API.
pub struct ArxivAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    published: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "category", default)]
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "@term")]
    term: String,
}

impl ArxivAdapter {
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

fn day_of(ts: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(ts.trim())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| ts.chars().take(10).collect())
}

/// Parse an Atom feed into item payloads.
pub fn parse_feed(xml: &str, text_cap: usize) -> Result<Vec<Value>, SourceError> {
    let feed: Feed = from_str(xml).map_err(|e| SourceError::Decode(format!("arxiv atom: {e}")))?;
    let items = feed
        .entries
        .into_iter()
        .filter(|e| !e.id.is_empty())
        .map(|e| {
            let authors: Vec<String> = e
                .authors
                .into_iter()
                .take(3)
                .map(|a| clean_text(&a.name))
                .collect();
            let categories: Vec<String> =
                e.categories.into_iter().take(3).map(|c| c.term).collect();
            json!({
                "title": clean_text(&e.title),
                "authors": authors,
                "summary": cap_text(&clean_text(&e.summary), text_cap),
                "published": e.published.as_deref().map(day_of).unwrap_or_else(|| "N/A".into()),
                "url": e.id.trim(),
                "categories": categories,
            })
        })
        .collect();
    Ok(items)
}

#[async_trait]
impl SourceAdapter for ArxivAdapter {
    fn id(&self) -> SourceId {
        SourceId::Arxiv
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        let search = format!("all:{}", params.query.trim());
        let max = params.limit.to_string();
        let req = self.endpoint.get(self.endpoint.url("/api/query")).query(&[
            ("search_query", search.as_str()),
            ("start", "0"),
            ("max_results", max.as_str()),
            ("sortBy", "relevance"),
        ]);
        let body = fetch_text(req).await?;
        let items = parse_feed(&body, params.text_cap)?;
        if items.is_empty() {
            return Ok(no_results(format!(
                "No arXiv papers found for '{}'",
                params.query
            )));
        }
        Ok(Value::Array(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_feed() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>query</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <summary>The dominant sequence transduction models...</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;
        let items = parse_feed(xml, 500).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Attention Is All You Need");
        assert_eq!(items[0]["published"], "2017-06-12");
        assert_eq!(items[0]["authors"][1], "Noam Shazeer");
        assert_eq!(items[0]["categories"][0], "cs.CL");
    }

    #[test]
    fn empty_feed_yields_no_items() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>q</title></feed>"#;
        assert!(parse_feed(xml, 500).unwrap().is_empty());
    }
}
