// src/sources/dictionary.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_json, Endpoint};
use super::{no_results, SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://api.dictionaryapi.dev";

const MAX_MEANINGS: usize = 3;
const MAX_DEFINITIONS: usize = 2;

/// English definitions from the Free Dictionary API.
pub struct DictionaryAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct Entry {
    word: Option<String>,
    #[serde(default)]
    phonetics: Vec<Phonetic>,
    #[serde(default)]
    meanings: Vec<Meaning>,
}

#[derive(Debug, Deserialize)]
struct Phonetic {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Meaning {
    #[serde(rename = "partOfSpeech", default)]
    part_of_speech: String,
    #[serde(default)]
    definitions: Vec<Definition>,
}

#[derive(Debug, Deserialize)]
struct Definition {
    #[serde(default)]
    definition: String,
    #[serde(default)]
    example: String,
}

impl DictionaryAdapter {
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

/// The word to look up: the last alphabetic token, so "define serendipity"
/// and "what does ephemeral mean?" resolve to the interesting word where possible.
pub fn headword(query: &str) -> Option<String> {
    const FILLER: &[&str] = &["mean", "means", "meaning", "definition", "define", "of"];
    let words: Vec<String> = query
        .split(|c: char| !c.is_alphabetic() && c != '-' && c != '\'')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    words
        .iter()
        .rev()
        .find(|w| !FILLER.contains(&w.as_str()))
        .or_else(|| words.last())
        .cloned()
}

#[async_trait]
impl SourceAdapter for DictionaryAdapter {
    fn id(&self) -> SourceId {
        SourceId::Dictionary
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        let Some(word) = headword(&params.query) else {
            return Ok(no_results("No word to define"));
        };
        let not_found = || no_results(format!("No definition found for '{word}'"));

        let url = self.endpoint.url_with_segment("/api/v2/entries/en", &word)?;
        let entries: Vec<Entry> = match fetch_json(self.endpoint.get(url)).await {
            Ok(v) => v,
            Err(SourceError::NotFound) => return Ok(not_found()),
            Err(e) => return Err(e),
        };
        let Some(entry) = entries.into_iter().next() else {
            return Ok(not_found());
        };

        let meanings: Vec<Value> = entry
            .meanings
            .into_iter()
            .take(MAX_MEANINGS)
            .map(|m| {
                let defs: Vec<Value> = m
                    .definitions
                    .into_iter()
                    .take(MAX_DEFINITIONS)
                    .map(|d| json!({"definition": d.definition, "example": d.example}))
                    .collect();
                json!({"part_of_speech": m.part_of_speech, "definitions": defs})
            })
            .collect();
        let phonetics: Vec<String> = entry
            .phonetics
            .into_iter()
            .filter_map(|p| p.text.filter(|t| !t.is_empty()))
            .take(2)
            .collect();

        Ok(json!({
            "word": entry.word.unwrap_or_else(|| word.clone()),
            "phonetics": phonetics,
            "meanings": meanings,
            "source": "Free Dictionary API",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::headword;

    #[test]
    fn picks_the_interesting_word() {
        assert_eq!(headword("define serendipity").as_deref(), Some("serendipity"));
        assert_eq!(
            headword("what does ephemeral mean?").as_deref(),
            Some("ephemeral")
        );
        assert_eq!(headword("Definition").as_deref(), Some("definition"));
        assert_eq!(headword("  ?? "), None);
    }
}
