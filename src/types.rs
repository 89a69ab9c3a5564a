// src/types.rs
//! Per-query data model: source identifiers, items, outcomes and the result bag.
//!
//! Everything here is created fresh for one query and dropped after rendering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One external data provider. Declaration order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Weather,
    AirQuality,
    Geocoding,
    Countries,
    Wikipedia,
    Duckduckgo,
    Wikidata,
    Dictionary,
    Arxiv,
    Pubmed,
    Books,
    Github,
    Stackoverflow,
    Quotes,
}

impl SourceId {
    pub const ALL: [SourceId; 14] = [
        SourceId::Weather,
        SourceId::AirQuality,
        SourceId::Geocoding,
        SourceId::Countries,
        SourceId::Wikipedia,
        SourceId::Duckduckgo,
        SourceId::Wikidata,
        SourceId::Dictionary,
        SourceId::Arxiv,
        SourceId::Pubmed,
        SourceId::Books,
        SourceId::Github,
        SourceId::Stackoverflow,
        SourceId::Quotes,
    ];

    /// Stable wire name, also used as a metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Weather => "weather",
            SourceId::AirQuality => "air_quality",
            SourceId::Geocoding => "geocoding",
            SourceId::Countries => "countries",
            SourceId::Wikipedia => "wikipedia",
            SourceId::Duckduckgo => "duckduckgo",
            SourceId::Wikidata => "wikidata",
            SourceId::Dictionary => "dictionary",
            SourceId::Arxiv => "arxiv",
            SourceId::Pubmed => "pubmed",
            SourceId::Books => "books",
            SourceId::Github => "github",
            SourceId::Stackoverflow => "stackoverflow",
            SourceId::Quotes => "quotes",
        }
    }

    /// Human heading used by the structured renderer.
    pub fn label(&self) -> &'static str {
        match self {
            SourceId::Weather => "Weather",
            SourceId::AirQuality => "Air Quality",
            SourceId::Geocoding => "Location",
            SourceId::Countries => "Country",
            SourceId::Wikipedia => "Wikipedia",
            SourceId::Duckduckgo => "Web (DuckDuckGo)",
            SourceId::Wikidata => "Wikidata",
            SourceId::Dictionary => "Dictionary",
            SourceId::Arxiv => "arXiv",
            SourceId::Pubmed => "PubMed",
            SourceId::Books => "Books (OpenLibrary)",
            SourceId::Github => "GitHub",
            SourceId::Stackoverflow => "Stack Overflow",
            SourceId::Quotes => "Quotes",
        }
    }

    /// Domain description, shared by the AI classification prompt and `/sources`.
    pub fn domain(&self) -> &'static str {
        match self {
            SourceId::Weather => "Weather conditions, forecasts, climate data",
            SourceId::AirQuality => "Air pollution, environmental data",
            SourceId::Geocoding => "Location information, addresses, maps",
            SourceId::Countries => "Country facts: capital, population, currencies, languages",
            SourceId::Wikipedia => "Encyclopedia knowledge, definitions, historical facts",
            SourceId::Duckduckgo => "General web search, current events, general information",
            SourceId::Wikidata => "Structured facts, entity data",
            SourceId::Dictionary => "Word definitions, pronunciation, usage examples",
            SourceId::Arxiv => "Scientific papers, research, academic studies",
            SourceId::Pubmed => "Medical research, health studies, biology",
            SourceId::Books => "Book information, literature, authors",
            SourceId::Github => "Open-source software repositories",
            SourceId::Stackoverflow => "Programming questions and answers",
            SourceId::Quotes => "Famous quotations and their authors",
        }
    }

    /// Sources whose adapter prefers `CallParams::location` over the search terms.
    pub fn wants_location(&self) -> bool {
        matches!(
            self,
            SourceId::Weather | SourceId::AirQuality | SourceId::Geocoding | SourceId::Countries
        )
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source id '{0}'")]
pub struct UnknownSource(pub String);

impl FromStr for SourceId {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let id = match key.as_str() {
            "weather" => SourceId::Weather,
            "air_quality" | "airquality" | "openaq" => SourceId::AirQuality,
            "geocoding" | "nominatim" => SourceId::Geocoding,
            "countries" | "country" => SourceId::Countries,
            "wikipedia" => SourceId::Wikipedia,
            "duckduckgo" | "web" => SourceId::Duckduckgo,
            "wikidata" => SourceId::Wikidata,
            "dictionary" => SourceId::Dictionary,
            "arxiv" => SourceId::Arxiv,
            "pubmed" => SourceId::Pubmed,
            "books" | "openlibrary" => SourceId::Books,
            "github" => SourceId::Github,
            "stackoverflow" | "stackexchange" => SourceId::Stackoverflow,
            "quotes" => SourceId::Quotes,
            _ => return Err(UnknownSource(s.to_string())),
        };
        Ok(id)
    }
}

/// Loosely-typed record; keys vary per source.
pub type Item = serde_json::Map<String, serde_json::Value>;

/// Exactly one per dispatched source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Success { items: Vec<Item> },
    Empty { reason: String },
    Failure { error: String },
}

impl SourceOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceOutcome::Success { .. } => "success",
            SourceOutcome::Empty { .. } => "empty",
            SourceOutcome::Failure { .. } => "failure",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SourceOutcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SourceOutcome::Failure { .. })
    }
}

/// SourceId → outcome, ordered by SourceId (never by arrival time).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultBag {
    outcomes: BTreeMap<SourceId, SourceOutcome>,
}

impl ResultBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome for `id` unless one is already present.
    /// Returns false when the slot was taken.
    pub fn insert_once(&mut self, id: SourceId, outcome: SourceOutcome) -> bool {
        use std::collections::btree_map::Entry;
        match self.outcomes.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(outcome);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceOutcome> {
        self.outcomes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &SourceOutcome)> {
        self.outcomes.iter().map(|(k, v)| (*k, v))
    }

    pub fn has_usable_data(&self) -> bool {
        self.outcomes.values().any(SourceOutcome::is_success)
    }

    /// (success, empty, failure) counts.
    pub fn tally(&self) -> (usize, usize, usize) {
        self.outcomes
            .values()
            .fold((0, 0, 0), |(s, e, f), o| match o {
                SourceOutcome::Success { .. } => (s + 1, e, f),
                SourceOutcome::Empty { .. } => (s, e + 1, f),
                SourceOutcome::Failure { .. } => (s, e, f + 1),
            })
    }
}

/// Advisory source selection for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub sources: Vec<SourceId>,
    pub location: Option<String>,
    pub search_terms: String,
}

/// Per-source parameters captured by a `SourceCall`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallParams {
    pub query: String,
    pub location: Option<String>,
    /// Max items the adapter should return.
    pub limit: usize,
    /// Max chars for long free-text fields (abstracts, summaries).
    pub text_cap: usize,
}

impl CallParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: None,
            limit: 5,
            text_cap: 500,
        }
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn with_text_cap(mut self, text_cap: usize) -> Self {
        self.text_cap = text_cap;
        self
    }

    /// Location when present and non-blank, otherwise the query.
    pub fn place(&self) -> &str {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.query.trim())
    }
}

/// Short anonymized id for a query, so logs never carry the raw text.
pub fn query_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_id_is_stable_and_short() {
        assert_eq!(query_id("weather in Paris"), query_id("weather in Paris"));
        assert_ne!(query_id("weather in Paris"), query_id("weather in Oslo"));
        assert_eq!(query_id("x").len(), 12);
    }

    #[test]
    fn source_ids_round_trip_through_names() {
        for id in SourceId::ALL {
            assert_eq!(id.as_str().parse::<SourceId>().unwrap(), id);
        }
        assert_eq!("Air Quality".parse::<SourceId>().unwrap(), SourceId::AirQuality);
        assert!("myspace".parse::<SourceId>().is_err());
    }

    #[test]
    fn bag_keeps_first_outcome_per_source() {
        let mut bag = ResultBag::new();
        assert!(bag.insert_once(
            SourceId::Arxiv,
            SourceOutcome::Empty {
                reason: "none".into()
            }
        ));
        assert!(!bag.insert_once(
            SourceId::Arxiv,
            SourceOutcome::Failure {
                error: "late".into()
            }
        ));
        assert_eq!(bag.get(SourceId::Arxiv).map(|o| o.kind()), Some("empty"));
        assert_eq!(bag.tally(), (0, 1, 0));
    }

    #[test]
    fn bag_iterates_in_declaration_order() {
        let mut bag = ResultBag::new();
        for id in [SourceId::Quotes, SourceId::Weather, SourceId::Arxiv] {
            bag.insert_once(id, SourceOutcome::Success { items: vec![] });
        }
        let order: Vec<_> = bag.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![SourceId::Weather, SourceId::Arxiv, SourceId::Quotes]);
    }

    #[test]
    fn place_prefers_location() {
        let p = CallParams::new("weather in Paris").with_location(Some("Paris".into()));
        assert_eq!(p.place(), "Paris");
        let p = CallParams::new(" Oslo ").with_location(Some("  ".into()));
        assert_eq!(p.place(), "Oslo");
    }
}
