//! Imagery-statistics client for spectral indices and point NDVI.
//!
//! The endpoint is a narrow stand-in for a full imagery platform: it samples
//! recent cloud-free Sentinel-2 surface reflectance at a point and returns
//! the requested band ratios. Index semantics: NDSSI tracks soil salinity,
//! NDRE and NDNI are nitrogen proxies.
use super::VegetationIndexProvider;
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// HTTP client for the imagery-statistics endpoint.
pub struct ImageryClient {
    agent: ureq::Agent,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    #[serde(rename = "NDSSI")]
    ndssi: Option<f64>,
    #[serde(rename = "NDRE")]
    ndre: Option<f64>,
    #[serde(rename = "NDNI")]
    ndni: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NdviResponse {
    ndvi: Option<f64>,
}

impl ImageryClient {
    pub fn new(agent: ureq::Agent, base_url: &str) -> Self {
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Sample NDSSI/NDRE/NDNI at a point.
    pub fn indices(&self, lat: f64, lon: f64) -> Result<Value> {
        let url = format!("{}/indices", self.base_url);
        let mut response = self
            .agent
            .get(&url)
            .query("lat", &lat.to_string())
            .query("lon", &lon.to_string())
            .call()
            .context("fetch spectral indices")?;
        let parsed: IndexResponse = response
            .body_mut()
            .read_json()
            .context("parse spectral index response")?;
        Ok(indices_value(lat, lon, parsed))
    }

    /// Sample mean NDVI at a point. `None` means no recent cloud-free
    /// imagery covered the location.
    pub fn ndvi(&self, lat: f64, lon: f64) -> Result<Option<f64>> {
        let url = format!("{}/ndvi", self.base_url);
        let mut response = self
            .agent
            .get(&url)
            .query("lat", &lat.to_string())
            .query("lon", &lon.to_string())
            .call()
            .context("fetch point ndvi")?;
        let parsed: NdviResponse = response
            .body_mut()
            .read_json()
            .context("parse ndvi response")?;
        Ok(parsed.ndvi)
    }
}

fn indices_value(lat: f64, lon: f64, parsed: IndexResponse) -> Value {
    if let Some(error) = parsed.error {
        return json!({"error": error});
    }
    if parsed.ndssi.is_none() && parsed.ndre.is_none() && parsed.ndni.is_none() {
        return json!({"error": "No satellite data found for this location"});
    }
    json!({
        "lat": lat,
        "lon": lon,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        "NDSSI": parsed.ndssi,
        "NDRE": parsed.ndre,
        "NDNI": parsed.ndni,
    })
}

/// Vegetation-index provider backed by the imagery endpoint.
pub struct SatelliteIndexProvider {
    imagery: Arc<ImageryClient>,
}

impl SatelliteIndexProvider {
    pub fn new(imagery: Arc<ImageryClient>) -> Self {
        Self { imagery }
    }
}

impl VegetationIndexProvider for SatelliteIndexProvider {
    fn indices(&self, lat: f64, lon: f64) -> Result<Value> {
        self.imagery.indices(lat, lon)
    }
}
