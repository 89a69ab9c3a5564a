// src/sources/http.rs
//! Shared HTTP plumbing for adapters: one pooled client, base-URL endpoints,
//! and status-aware JSON/text fetch helpers.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use super::SourceError;
use crate::config::aggregator::SourcesConfig;

/// Build the client shared by every adapter. reqwest's pool is safe for
/// concurrent use, so no locking happens on the call path.
pub fn build_client(cfg: &SourcesConfig) -> Result<Client> {
    Client::builder()
        .user_agent(cfg.user_agent.as_str())
        .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
        .timeout(Duration::from_millis(cfg.request_timeout_ms))
        .build()
        .context("building shared provider http client")
}

/// A provider base URL bound to the shared client. Tests swap the base for a
/// local mock server.
#[derive(Clone, Debug)]
pub struct Endpoint {
    client: Client,
    base: String,
}

impl Endpoint {
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// `base + prefix + "/" + segment`, with `segment` percent-encoded.
    pub fn url_with_segment(&self, prefix: &str, segment: &str) -> Result<Url, SourceError> {
        let mut url =
            Url::parse(&self.url(prefix)).map_err(|e| SourceError::Request(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Request(format!("cannot append to {}", self.base)))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    pub fn get(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.client.get(url)
    }
}

/// Send and decode JSON. 404 → `NotFound`, other non-2xx → `Status`.
pub async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, SourceError> {
    let bytes = send_checked(req).await?.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| SourceError::Decode(e.to_string()))
}

pub async fn fetch_text(req: RequestBuilder) -> Result<String, SourceError> {
    Ok(send_checked(req).await?.text().await?)
}

async fn send_checked(req: RequestBuilder) -> Result<reqwest::Response, SourceError> {
    let resp = req.send().await?;
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound);
    }
    if !status.is_success() {
        return Err(SourceError::Status(status.as_u16()));
    }
    Ok(resp)
}
