// src/sources/countries.rs
use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_json, Endpoint};
use super::{no_results, SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://restcountries.com";

/// Country facts from REST Countries v3.1.
pub struct CountriesAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct Country {
    #[serde(default)]
    name: Names,
    #[serde(default)]
    capital: Vec<String>,
    region: Option<String>,
    subregion: Option<String>,
    population: Option<u64>,
    area: Option<f64>,
    #[serde(default)]
    currencies: BTreeMap<String, Currency>,
    #[serde(default)]
    languages: BTreeMap<String, String>,
    flag: Option<String>,
    #[serde(default)]
    maps: Maps,
}

#[derive(Debug, Default, Deserialize)]
struct Names {
    common: Option<String>,
    official: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Currency {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Maps {
    #[serde(rename = "googleMaps")]
    google_maps: Option<String>,
}

impl CountriesAdapter {
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
impl SourceAdapter for CountriesAdapter {
    fn id(&self) -> SourceId {
        SourceId::Countries
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        let name = params.place();
        let not_found = || no_results(format!("No country found matching '{name}'"));

        let url = self.endpoint.url_with_segment("/v3.1/name", name)?;
        let countries: Vec<Country> = match fetch_json(self.endpoint.get(url)).await {
            Ok(v) => v,
            Err(SourceError::NotFound) => return Ok(not_found()),
            Err(e) => return Err(e),
        };
        let Some(c) = countries.into_iter().next() else {
            return Ok(not_found());
        };

        let currencies: Vec<String> = c
            .currencies
            .into_iter()
            .map(|(code, cur)| format!("{} ({code})", cur.name.unwrap_or_default()))
            .collect();
        let languages: Vec<String> = c.languages.into_values().take(5).collect();

        Ok(json!({
            "name": c.name.common.unwrap_or_else(|| "Unknown".into()),
            "official_name": c.name.official.unwrap_or_else(|| "Unknown".into()),
            "capital": c.capital.into_iter().next().unwrap_or_else(|| "N/A".into()),
            "region": c.region.unwrap_or_else(|| "N/A".into()),
            "subregion": c.subregion.unwrap_or_else(|| "N/A".into()),
            "population": c.population,
            "area_km2": c.area,
            "currencies": currencies,
            "languages": languages,
            "flag_emoji": c.flag.unwrap_or_default(),
            "map_url": c.maps.google_maps.unwrap_or_default(),
            "source": "REST Countries API",
        }))
    }
}
