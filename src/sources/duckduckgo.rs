// src/sources/duckduckgo.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_json, Endpoint};
use super::{cap_text, clean_text, no_results, SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://api.duckduckgo.com";

/// Web results from the DuckDuckGo Instant Answer API: the abstract (if any)
/// followed by related topics.
pub struct DuckDuckGoAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<Topic>,
}

/// Either a plain topic or a named group of topics.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Topic {
    Entry {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL", default)]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics", default)]
        topics: Vec<Topic>,
    },
}

impl DuckDuckGoAdapter {
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

fn flatten(topics: Vec<Topic>, out: &mut Vec<(String, String)>) {
    for t in topics {
        match t {
            Topic::Entry { text, first_url } => out.push((text, first_url)),
            Topic::Group { topics } => flatten(topics, out),
        }
    }
}

/// Related-topic text reads "Title - description"; split it when possible.
fn split_title(text: &str) -> (String, String) {
    match text.split_once(" - ") {
        Some((title, _)) if !title.is_empty() => (title.to_string(), text.to_string()),
        _ => (cap_text(text, 80), text.to_string()),
    }
}

#[async_trait]
impl SourceAdapter for DuckDuckGoAdapter {
    fn id(&self) -> SourceId {
        SourceId::Duckduckgo
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        let req = self.endpoint.get(self.endpoint.url("/")).query(&[
            ("q", params.query.as_str()),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ]);
        let answer: InstantAnswer = fetch_json(req).await?;

        let mut results = Vec::new();
        let abstract_text = clean_text(&answer.abstract_text);
        if !abstract_text.is_empty() {
            results.push(json!({
                "title": clean_text(&answer.heading),
                "body": cap_text(&abstract_text, params.text_cap),
                "url": answer.abstract_url,
            }));
        }

        let mut topics = Vec::new();
        flatten(answer.related_topics, &mut topics);
        for (text, url) in topics {
            if results.len() >= params.limit {
                break;
            }
            let text = clean_text(&text);
            if text.is_empty() {
                continue;
            }
            let (title, body) = split_title(&text);
            results.push(json!({
                "title": title,
                "body": cap_text(&body, params.text_cap),
                "url": url,
            }));
        }

        if results.is_empty() {
            return Ok(no_results("No web results found"));
        }
        Ok(Value::Array(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_topic_groups_are_flattened() {
        let raw = serde_json::json!({
            "Heading": "",
            "AbstractText": "",
            "RelatedTopics": [
                {"Text": "Rust - a language", "FirstURL": "https://duckduckgo.com/Rust"},
                {"Name": "Games", "Topics": [
                    {"Text": "Rust (video game) - survival game", "FirstURL": "https://duckduckgo.com/Rust_game"}
                ]}
            ]
        });
        let answer: InstantAnswer = serde_json::from_value(raw).unwrap();
        let mut out = Vec::new();
        flatten(answer.related_topics, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(split_title(&out[1].0).0, "Rust (video game)");
    }
}
