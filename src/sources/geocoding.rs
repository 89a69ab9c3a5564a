// src/sources/geocoding.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_json, Endpoint};
use super::{no_results, SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://nominatim.openstreetmap.org";

/// Forward geocoding via OSM Nominatim. Nominatim's usage policy requires a
/// descriptive User-Agent, which the shared client sets.
pub struct GeocodingAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct Place {
    display_name: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    address: Address,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    country: Option<String>,
    state: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
}

impl GeocodingAdapter {
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

fn coord(raw: &Option<String>) -> Result<f64, SourceError> {
    raw.as_deref()
        .unwrap_or("0")
        .parse::<f64>()
        .map_err(|e| SourceError::Decode(format!("bad coordinate: {e}")))
}

#[async_trait]
impl SourceAdapter for GeocodingAdapter {
    fn id(&self) -> SourceId {
        SourceId::Geocoding
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        let place = params.place();
        let req = self.endpoint.get(self.endpoint.url("/search")).query(&[
            ("q", place),
            ("format", "json"),
            ("limit", "1"),
            ("addressdetails", "1"),
        ]);
        let places: Vec<Place> = fetch_json(req).await?;

        let Some(p) = places.into_iter().next() else {
            return Ok(no_results(format!("Location '{place}' not found")));
        };

        let lat = coord(&p.lat)?;
        let lon = coord(&p.lon)?;
        let city = p
            .address
            .city
            .or(p.address.town)
            .or(p.address.village)
            .unwrap_or_else(|| "N/A".into());

        Ok(json!({
            "display_name": p.display_name.unwrap_or_else(|| "Unknown".into()),
            "latitude": lat,
            "longitude": lon,
            "type": p.kind.unwrap_or_else(|| "Unknown".into()),
            "country": p.address.country.unwrap_or_else(|| "N/A".into()),
            "state": p.address.state.unwrap_or_else(|| "N/A".into()),
            "city": city,
            "osm_url": format!("https://www.openstreetmap.org/?mlat={lat}&mlon={lon}&zoom=15"),
        }))
    }
}
