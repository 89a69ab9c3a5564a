// src/ai/mod.rs
//! Optional language-model backend: query classification and narrative synthesis.
//!
//! Callers only see `AiBackend`. An unconfigured backend answers every call with
//! `AiError::Unconfigured`; it never panics and never blocks.

pub mod openai;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::types::SourceId;

pub use openai::OpenAiBackend;

pub type AiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AiError>> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("ai backend is not configured")]
    Unconfigured,
    #[error("ai request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ai backend returned HTTP {0}")]
    Status(u16),
    #[error("malformed ai reply: {0}")]
    Malformed(String),
}

/// Classification exactly as the model returned it; source names are unchecked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawClassification {
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub search_terms: String,
}

pub trait AiBackend: Send + Sync {
    /// `max_sources` bounds how many sources the reply may name.
    fn classify_query<'a>(
        &'a self,
        query: &'a str,
        max_sources: usize,
    ) -> AiFuture<'a, RawClassification>;
    /// `data` is the already-capped serialized result bag.
    fn synthesize<'a>(&'a self, query: &'a str, data: &'a str) -> AiFuture<'a, String>;
    fn is_configured(&self) -> bool;
    fn provider_name(&self) -> &'static str;
}

pub type DynAiBackend = Arc<dyn AiBackend>;

/// Pick the backend once at startup.
///
/// * `AI_TEST_MODE=mock` → deterministic mock
/// * no config, disabled, or no key → disabled
/// * otherwise the OpenAI-compatible client
pub fn build_backend(config: Option<&AiConfig>) -> anyhow::Result<DynAiBackend> {
    if std::env::var("AI_TEST_MODE").is_ok_and(|v| v == "mock") {
        return Ok(Arc::new(MockBackend));
    }
    match config {
        Some(cfg) if cfg.is_usable() => Ok(Arc::new(OpenAiBackend::new(cfg)?)),
        Some(cfg) if cfg.enabled => {
            tracing::warn!("ai enabled but no api key resolved; running without ai");
            Ok(Arc::new(DisabledBackend))
        }
        _ => Ok(Arc::new(DisabledBackend)),
    }
}

/// System instruction for source selection, listing every source and its domain.
pub fn classification_instructions(max_sources: usize) -> String {
    let mut s = String::from("You route search queries to data sources. Available sources:\n");
    for id in SourceId::ALL {
        s.push_str(&format!("- {}: {}\n", id.as_str(), id.domain()));
    }
    s.push_str(&format!(
        "\nReply with a JSON object only: \
         {{\"sources\": [source ids, most relevant first, at most {max_sources}], \
         \"location\": place name or null, \
         \"search_terms\": refined keywords for the APIs}}"
    ));
    s
}

pub const SYNTHESIS_INSTRUCTIONS: &str = "You answer a user's question using only the JSON \
data gathered from several sources. Cite the source name for each fact. When sources \
disagree, say so. If the data does not answer the question, say that plainly. \
Do not invent facts.";

/// Parse a model reply into a classification, tolerating a fenced code block.
pub fn parse_classification(reply: &str) -> Result<RawClassification, AiError> {
    let body = reply.trim();
    let body = body
        .strip_prefix("```json")
        .or_else(|| body.strip_prefix("```"))
        .map(|b| b.trim_end().trim_end_matches("```").trim())
        .unwrap_or(body);
    serde_json::from_str(body).map_err(|e| AiError::Malformed(e.to_string()))
}

/// Reports "unconfigured" for everything.
pub struct DisabledBackend;

impl AiBackend for DisabledBackend {
    fn classify_query<'a>(
        &'a self,
        _query: &'a str,
        _max_sources: usize,
    ) -> AiFuture<'a, RawClassification> {
        Box::pin(async { Err(AiError::Unconfigured) })
    }
    fn synthesize<'a>(&'a self, _query: &'a str, _data: &'a str) -> AiFuture<'a, String> {
        Box::pin(async { Err(AiError::Unconfigured) })
    }
    fn is_configured(&self) -> bool {
        false
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic stand-in for local runs and tests.
pub struct MockBackend;

impl AiBackend for MockBackend {
    fn classify_query<'a>(
        &'a self,
        query: &'a str,
        max_sources: usize,
    ) -> AiFuture<'a, RawClassification> {
        let mut sources: Vec<String> = vec!["wikipedia".into(), "duckduckgo".into()];
        sources.truncate(max_sources);
        let out = RawClassification {
            sources,
            location: None,
            search_terms: query.trim().to_string(),
        };
        Box::pin(async move { Ok(out) })
    }
    fn synthesize<'a>(&'a self, query: &'a str, data: &'a str) -> AiFuture<'a, String> {
        let out = format!(
            "Answer to '{}' (mock), based on {} chars of source data.",
            query.trim(),
            data.chars().count()
        );
        Box::pin(async move { Ok(out) })
    }
    fn is_configured(&self) -> bool {
        true
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_name_every_source() {
        let s = classification_instructions(4);
        for id in SourceId::ALL {
            assert!(s.contains(id.as_str()), "missing {id}");
        }
    }

    #[test]
    fn instructions_carry_the_configured_cap() {
        assert!(classification_instructions(2).contains("at most 2]"));
        assert!(classification_instructions(6).contains("at most 6]"));
        assert!(!classification_instructions(6).contains("at most 4"));
    }

    #[tokio::test]
    async fn mock_reply_respects_the_cap() {
        let raw = MockBackend.classify_query("q", 1).await.unwrap();
        assert_eq!(raw.sources, vec!["wikipedia"]);
    }

    #[test]
    fn parses_fenced_and_bare_replies() {
        let bare = r#"{"sources": ["weather"], "location": "Paris", "search_terms": "weather"}"#;
        let fenced = format!("```json\n{bare}\n```");
        let a = parse_classification(bare).unwrap();
        let b = parse_classification(&fenced).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.location.as_deref(), Some("Paris"));
    }

    #[test]
    fn prose_reply_is_malformed() {
        assert!(matches!(
            parse_classification("I think weather is best."),
            Err(AiError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn disabled_backend_reports_unconfigured() {
        let b = DisabledBackend;
        assert!(!b.is_configured());
        assert!(matches!(b.classify_query("x", 4).await, Err(AiError::Unconfigured)));
        assert!(matches!(b.synthesize("x", "{}").await, Err(AiError::Unconfigured)));
    }
}
