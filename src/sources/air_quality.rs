// src/sources/air_quality.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_json, Endpoint};
use super::{SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://api.openaq.org";

/// Latest measurements per monitoring location from OpenAQ.
pub struct AirQualityAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    results: Vec<LocationResult>,
}

#[derive(Debug, Deserialize)]
struct LocationResult {
    location: Option<String>,
    city: Option<String>,
    country: Option<String>,
    #[serde(default)]
    measurements: Vec<Measurement>,
}

#[derive(Debug, Deserialize)]
struct Measurement {
    parameter: Option<String>,
    value: Option<f64>,
    unit: Option<String>,
    #[serde(rename = "lastUpdated")]
    last_updated: Option<String>,
}

impl AirQualityAdapter {
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
impl SourceAdapter for AirQualityAdapter {
    fn id(&self) -> SourceId {
        SourceId::AirQuality
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        let city = params.place();
        let req = self
            .endpoint
            .get(self.endpoint.url("/v2/latest"))
            .header("Accept", "application/json")
            .query(&[("city", city), ("limit", "10"), ("order_by", "lastUpdated")]);
        let resp: LatestResponse = fetch_json(req).await?;

        if resp.results.is_empty() {
            return Ok(json!({
                "city": city,
                "message": format!("No air quality data found for '{city}'"),
                "data": [],
            }));
        }

        let data: Vec<Value> = resp
            .results
            .into_iter()
            .take(params.limit)
            .map(|r| {
                let measurements: Vec<Value> = r
                    .measurements
                    .into_iter()
                    .map(|m| {
                        json!({
                            "parameter": m.parameter.unwrap_or_else(|| "N/A".into()),
                            "value": m.value,
                            "unit": m.unit.unwrap_or_else(|| "N/A".into()),
                            "last_updated": m.last_updated.unwrap_or_else(|| "N/A".into()),
                        })
                    })
                    .collect();
                json!({
                    "location": r.location.unwrap_or_else(|| "Unknown".into()),
                    "city": r.city.unwrap_or_else(|| city.to_string()),
                    "country": r.country.unwrap_or_else(|| "N/A".into()),
                    "measurements": measurements,
                })
            })
            .collect();

        Ok(json!({
            "city": city,
            "data": data,
            "source": "OpenAQ",
        }))
    }
}
