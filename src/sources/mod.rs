// src/sources/mod.rs
//! Provider adapters: one thin translator per external API, plus the registry
//! that maps a `SourceId` to its adapter.

pub mod air_quality;
pub mod arxiv;
pub mod books;
pub mod countries;
pub mod dictionary;
pub mod duckduckgo;
pub mod geocoding;
pub mod github;
pub mod http;
pub mod pubmed;
pub mod quotes;
pub mod stackoverflow;
pub mod weather;
pub mod wikidata;
pub mod wikipedia;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::dispatcher::SourceCall;
use crate::types::{CallParams, SourceId};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    #[error("upstream returned 404 not found")]
    NotFound,
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    Request(String),
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("adapter panicked: {0}")]
    Panicked(String),
    #[error("timed out: abandoned at the global deadline")]
    Abandoned,
}

/// Uniform call contract for one external provider.
///
/// Implementations return the raw payload using the structural conventions the
/// normalizer understands (`"message"` for no data, items otherwise). Transport
/// and decoding faults are returned as `SourceError`, never panicked.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> SourceId;
    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError>;
}

/// Payload for "the provider has nothing for this query".
pub fn no_results(message: impl Into<String>) -> Value {
    json!({ "message": message.into() })
}

/// Clean upstream text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

    let decoded = html_escape::decode_html_entities(s);
    let stripped = RE_TAGS.replace_all(&decoded, "");
    let quoted = stripped
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    RE_WS.replace_all(&quoted, " ").trim().to_string()
}

/// Cap `s` at `max` chars, appending "..." when cut.
pub fn cap_text(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}

/// Shared adapters keyed by source.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    adapters: BTreeMap<SourceId, Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All 14 public providers sharing one pooled HTTP client.
    pub fn with_defaults(client: reqwest::Client) -> Self {
        let mut reg = Self::new();
        reg.register(Arc::new(weather::WeatherAdapter::new(client.clone())));
        reg.register(Arc::new(air_quality::AirQualityAdapter::new(client.clone())));
        reg.register(Arc::new(geocoding::GeocodingAdapter::new(client.clone())));
        reg.register(Arc::new(countries::CountriesAdapter::new(client.clone())));
        reg.register(Arc::new(wikipedia::WikipediaAdapter::new(client.clone())));
        reg.register(Arc::new(duckduckgo::DuckDuckGoAdapter::new(client.clone())));
        reg.register(Arc::new(wikidata::WikidataAdapter::new(client.clone())));
        reg.register(Arc::new(dictionary::DictionaryAdapter::new(client.clone())));
        reg.register(Arc::new(arxiv::ArxivAdapter::new(client.clone())));
        reg.register(Arc::new(pubmed::PubmedAdapter::new(client.clone())));
        reg.register(Arc::new(books::BooksAdapter::new(client.clone())));
        reg.register(Arc::new(github::GithubAdapter::new(client.clone())));
        reg.register(Arc::new(stackoverflow::StackOverflowAdapter::new(client.clone())));
        reg.register(Arc::new(quotes::QuotesAdapter::new(client)));
        reg
    }

    /// Register (or replace) the adapter for its source.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) -> &mut Self {
        self.adapters.insert(adapter.id(), adapter);
        self
    }

    pub fn get(&self, id: SourceId) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.get(&id)
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.adapters.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<SourceId> {
        self.adapters.keys().copied().collect()
    }

    /// Build a self-contained unit of work for `id`, or None if unregistered.
    pub fn call(&self, id: SourceId, params: CallParams) -> Option<SourceCall> {
        let adapter = Arc::clone(self.adapters.get(&id)?);
        Some(SourceCall::new(id, async move {
            adapter.fetch(&params).await
        }))
    }
}
