// src/sources/weather.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_json, Endpoint};
use super::{no_results, SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://wttr.in";

/// Current conditions from wttr.in (`format=j1`, no API key).
pub struct WeatherAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct WttrResponse {
    #[serde(default)]
    current_condition: Vec<Current>,
}

#[derive(Debug, Deserialize)]
struct Current {
    #[serde(rename = "temp_C")]
    temp_c: Option<String>,
    #[serde(rename = "temp_F")]
    temp_f: Option<String>,
    #[serde(rename = "weatherDesc", default)]
    weather_desc: Vec<TextValue>,
    humidity: Option<String>,
    #[serde(rename = "windspeedKmph")]
    wind_kmph: Option<String>,
    #[serde(rename = "FeelsLikeC")]
    feels_like_c: Option<String>,
    visibility: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

impl WeatherAdapter {
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

fn or_na(v: Option<String>) -> String {
    v.filter(|s| !s.is_empty()).unwrap_or_else(|| "N/A".to_string())
}

#[async_trait]
impl SourceAdapter for WeatherAdapter {
    fn id(&self) -> SourceId {
        SourceId::Weather
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        let location = params.place();
        let url = self.endpoint.url_with_segment("", location)?;
        let resp: WttrResponse =
            fetch_json(self.endpoint.get(url).query(&[("format", "j1")])).await?;

        let Some(cur) = resp.current_condition.into_iter().next() else {
            return Ok(no_results(format!("No weather data for '{location}'")));
        };

        let condition = cur
            .weather_desc
            .into_iter()
            .next()
            .map(|d| d.value)
            .filter(|s| !s.is_empty());

        Ok(json!({
            "location": location,
            "temperature_c": or_na(cur.temp_c),
            "temperature_f": or_na(cur.temp_f),
            "condition": or_na(condition),
            "humidity": or_na(cur.humidity),
            "wind_speed_kmph": or_na(cur.wind_kmph),
            "feels_like_c": or_na(cur.feels_like_c),
            "visibility": or_na(cur.visibility),
            "source": "wttr.in",
        }))
    }
}
