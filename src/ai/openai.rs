// src/ai/openai.rs
//! OpenAI-compatible Chat Completions client.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::{
    classification_instructions, parse_classification, AiBackend, AiError, AiFuture,
    RawClassification, SYNTHESIS_INSTRUCTIONS,
};
use crate::config::AiConfig;

pub struct OpenAiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiBackend {
    pub fn new(cfg: &AiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .context("building ai http client")?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
        })
    }

    async fn chat(
        &self,
        system: &str,
        user: &str,
        json_reply: bool,
        max_tokens: u32,
    ) -> Result<String, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::Unconfigured);
        }
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.2,
            max_tokens,
            response_format: json_reply.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AiError::Status(resp.status().as_u16()));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| AiError::Malformed(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(AiError::Malformed("empty completion".into()));
        }
        Ok(content)
    }
}

impl AiBackend for OpenAiBackend {
    fn classify_query<'a>(
        &'a self,
        query: &'a str,
        max_sources: usize,
    ) -> AiFuture<'a, RawClassification> {
        Box::pin(async move {
            let system = classification_instructions(max_sources);
            let reply = self.chat(&system, query, true, 200).await?;
            parse_classification(&reply)
        })
    }

    fn synthesize<'a>(&'a self, query: &'a str, data: &'a str) -> AiFuture<'a, String> {
        Box::pin(async move {
            let user = format!("Question: {query}\n\nSource data (JSON):\n{data}");
            self.chat(SYNTHESIS_INSTRUCTIONS, &user, false, 800).await
        })
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
