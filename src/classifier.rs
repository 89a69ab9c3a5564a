// src/classifier.rs
//! Source selection. Two strategies behind one trait, picked once at startup:
//! a deterministic keyword scan, and an AI-backed one that falls back to the
//! keyword scan on any backend problem.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::ai::{DynAiBackend, RawClassification};
use crate::types::{query_id, Classification, SourceId};

pub const DEFAULT_MAX_SOURCES: usize = 4;

const WEATHER_TERMS: &[&str] = &[
    "weather", "temperature", "forecast", "rain", "snow", "sunny", "cloudy", "climate",
];
const SCIENCE_TERMS: &[&str] = &[
    "research", "study", "paper", "scientific", "experiment", "theory", "physics", "chemistry",
    "biology", "math",
];
const MEDICAL_TERMS: &[&str] = &[
    "health", "medical", "disease", "treatment", "medicine", "doctor", "hospital", "symptom",
    "drug", "therapy",
];
const BOOK_TERMS: &[&str] = &["book", "author", "novel", "literature", "read", "publish", "isbn"];
const PLACE_TERMS: &[&str] = &[
    "where is", "location", "address", "map", "coordinates", "find place",
];
const AIR_TERMS: &[&str] = &["air quality", "pollution", "aqi", "smog", "pm2.5"];

/// Domain rules in result order.
const DOMAIN_RULES: &[(SourceId, &[&str])] = &[
    (SourceId::Weather, WEATHER_TERMS),
    (SourceId::Arxiv, SCIENCE_TERMS),
    (SourceId::Pubmed, MEDICAL_TERMS),
    (SourceId::Books, BOOK_TERMS),
    (SourceId::Geocoding, PLACE_TERMS),
    (SourceId::AirQuality, AIR_TERMS),
];

/// Always appended after the domain matches.
const GENERAL_SOURCES: [SourceId; 2] = [SourceId::Wikipedia, SourceId::Duckduckgo];

const LOCATION_PREPOSITIONS: &[&str] = &["in", "at", "for"];

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "classifier_fallback_total",
            "AI classifications replaced by the keyword classifier."
        );
    });
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Never fails; the result is advisory.
    async fn classify(&self, query: &str) -> Classification;
    fn name(&self) -> &'static str;
}

pub type DynClassifier = Arc<dyn Classifier>;

/// Keyword scan over the lower-cased query. Pure function of the query text.
#[derive(Debug, Clone, Copy)]
pub struct KeywordClassifier {
    max_sources: usize,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SOURCES)
    }
}

impl KeywordClassifier {
    pub fn new(max_sources: usize) -> Self {
        Self {
            max_sources: max_sources.max(1),
        }
    }

    pub fn classify_query(&self, query: &str) -> Classification {
        let lower = query.to_lowercase();
        let mut sources: Vec<SourceId> = DOMAIN_RULES
            .iter()
            .filter(|(_, terms)| terms.iter().any(|t| lower.contains(t)))
            .map(|(id, _)| *id)
            .collect();

        let location = if sources.iter().any(|id| id.wants_location()) {
            extract_location(query)
        } else {
            None
        };

        sources.extend(GENERAL_SOURCES);
        sources.truncate(self.max_sources);

        Classification {
            sources,
            location,
            search_terms: query.trim().to_string(),
        }
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, query: &str) -> Classification {
        self.classify_query(query)
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// Everything after the first "in"/"at"/"for" token, trimmed of `?.,!`.
pub fn extract_location(query: &str) -> Option<String> {
    let words: Vec<&str> = query.split_whitespace().collect();
    let pos = words.iter().position(|w| {
        LOCATION_PREPOSITIONS
            .iter()
            .any(|p| w.eq_ignore_ascii_case(p))
    })?;
    let rest = words.get(pos + 1..)?.join(" ");
    let place = rest.trim_matches(|c| matches!(c, '?' | '.' | ',' | '!')).trim();
    (!place.is_empty()).then(|| place.to_string())
}

/// Asks the AI backend; any error or unusable reply falls back to keywords.
pub struct AiClassifier {
    backend: DynAiBackend,
    fallback: KeywordClassifier,
}

impl AiClassifier {
    pub fn new(backend: DynAiBackend, max_sources: usize) -> Self {
        Self {
            backend,
            fallback: KeywordClassifier::new(max_sources),
        }
    }

    /// Keep known source ids only (first occurrence wins), capped.
    fn accept(&self, raw: RawClassification, query: &str) -> Option<Classification> {
        let mut sources: Vec<SourceId> = Vec::new();
        for name in &raw.sources {
            match name.parse::<SourceId>() {
                Ok(id) if !sources.contains(&id) => sources.push(id),
                Ok(_) => {}
                Err(e) => tracing::debug!(target: "classifier", error = %e, "dropping unknown source"),
            }
        }
        sources.truncate(self.fallback.max_sources);
        if sources.is_empty() {
            return None;
        }
        let location = raw
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("null"));
        let terms = raw.search_terms.trim();
        Some(Classification {
            sources,
            location,
            search_terms: if terms.is_empty() {
                query.trim().to_string()
            } else {
                terms.to_string()
            },
        })
    }

    fn fall_back(&self, query: &str, reason: &str) -> Classification {
        ensure_metrics_described();
        counter!("classifier_fallback_total").increment(1);
        tracing::warn!(target: "classifier", id = %query_id(query), reason, "ai classification unusable; using keywords");
        self.fallback.classify_query(query)
    }
}

#[async_trait]
impl Classifier for AiClassifier {
    async fn classify(&self, query: &str) -> Classification {
        match self
            .backend
            .classify_query(query, self.fallback.max_sources)
            .await {
            Ok(raw) => match self.accept(raw, query) {
                Some(c) => c,
                None => self.fall_back(query, "no known sources in reply"),
            },
            Err(e) => self.fall_back(query, &e.to_string()),
        }
    }

    fn name(&self) -> &'static str {
        "ai"
    }
}

/// AI-backed when the backend is configured, keyword-only otherwise.
pub fn build_classifier(backend: DynAiBackend, max_sources: usize) -> DynClassifier {
    if backend.is_configured() {
        tracing::info!(target: "classifier", provider = backend.provider_name(), "ai classifier enabled");
        Arc::new(AiClassifier::new(backend, max_sources))
    } else {
        Arc::new(KeywordClassifier::new(max_sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_follows_first_preposition() {
        assert_eq!(extract_location("weather in Paris?").as_deref(), Some("Paris"));
        assert_eq!(
            extract_location("Forecast for New York City!").as_deref(),
            Some("New York City")
        );
        assert_eq!(extract_location("weather in"), None);
        assert_eq!(extract_location("rainy days"), None);
    }

    #[test]
    fn general_sources_always_appended() {
        let c = KeywordClassifier::default().classify_query("who was Ada Lovelace");
        assert_eq!(c.sources, vec![SourceId::Wikipedia, SourceId::Duckduckgo]);
        assert_eq!(c.location, None);
    }

    #[test]
    fn selection_is_capped() {
        // weather, arxiv, pubmed, books all match before the general sources.
        let c = KeywordClassifier::default()
            .classify_query("weather research on drug treatment in a book");
        assert_eq!(
            c.sources,
            vec![SourceId::Weather, SourceId::Arxiv, SourceId::Pubmed, SourceId::Books]
        );
    }

    #[test]
    fn location_only_for_place_domains() {
        let c = KeywordClassifier::default().classify_query("research papers in physics");
        assert_eq!(c.location, None);
        let c = KeywordClassifier::default().classify_query("pollution in Delhi");
        assert_eq!(c.location.as_deref(), Some("Delhi"));
        assert!(c.sources.contains(&SourceId::AirQuality));
    }
}
