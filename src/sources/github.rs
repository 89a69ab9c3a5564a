// src/sources/github.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_json, Endpoint};
use super::{cap_text, no_results, SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://api.github.com";

/// Repository search, most-starred first. Unauthenticated (rate limited upstream).
pub struct GithubAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Repo>,
}

#[derive(Debug, Deserialize)]
struct Repo {
    full_name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    language: Option<String>,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    topics: Vec<String>,
}

impl GithubAdapter {
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
impl SourceAdapter for GithubAdapter {
    fn id(&self) -> SourceId {
        SourceId::Github
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        let per_page = params.limit.to_string();
        let req = self
            .endpoint
            .get(self.endpoint.url("/search/repositories"))
            .header("Accept", "application/vnd.github.v3+json")
            .query(&[
                ("q", params.query.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ]);
        let resp: SearchResponse = fetch_json(req).await?;

        if resp.items.is_empty() {
            return Ok(no_results(format!(
                "No GitHub repositories found for '{}'",
                params.query
            )));
        }

        let repos: Vec<Value> = resp
            .items
            .into_iter()
            .take(params.limit)
            .map(|r| {
                let description = r
                    .description
                    .filter(|d| !d.is_empty())
                    .map(|d| cap_text(&d, params.text_cap))
                    .unwrap_or_else(|| "No description".into());
                json!({
                    "name": r.full_name.unwrap_or_else(|| "Unknown".into()),
                    "description": description,
                    "stars": r.stargazers_count,
                    "forks": r.forks_count,
                    "language": r.language.unwrap_or_else(|| "N/A".into()),
                    "url": r.html_url,
                    "topics": r.topics.into_iter().take(5).collect::<Vec<_>>(),
                })
            })
            .collect();
        Ok(Value::Array(repos))
    }
}
