//! Carbon-sequestration estimates derived from point NDVI.
//!
//! Two simplified models are computed side by side and persisted as
//! parallel advisory numbers; nothing reconciles them into a single figure.
use super::{CarbonEstimator, ImageryClient};
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Market rate used by both models, USD per tonne of carbon.
const CARBON_PRICE_USD: f64 = 15.0;

/// Viewport method: scale NDVI linearly into carbon per hectare.
#[derive(Debug, Clone, Serialize)]
pub struct ViewportEstimate {
    pub area_ha: f64,
    #[serde(rename = "carbonPerHa")]
    pub carbon_per_ha: f64,
    #[serde(rename = "totalCarbon")]
    pub total_carbon: f64,
    pub revenue: f64,
}

/// Point-rating method: bucket NDVI into a qualitative potential.
#[derive(Debug, Clone, Serialize)]
pub struct PointEstimate {
    pub rating: &'static str,
    #[serde(rename = "potentialPerHa")]
    pub potential_per_ha: f64,
    pub revenue: f64,
}

pub(crate) fn viewport_estimate(ndvi: f64, area_ha: f64) -> ViewportEstimate {
    let carbon_per_ha = ndvi * 2.0;
    let total_carbon = carbon_per_ha * area_ha;
    ViewportEstimate {
        area_ha,
        carbon_per_ha,
        total_carbon,
        revenue: total_carbon * CARBON_PRICE_USD,
    }
}

pub(crate) fn point_estimate(ndvi: f64) -> PointEstimate {
    let (rating, potential_per_ha) = if ndvi > 0.4 {
        ("High", 1.5)
    } else if ndvi >= 0.2 {
        ("Moderate", 0.8)
    } else {
        ("Low", 0.2)
    };
    PointEstimate {
        rating,
        potential_per_ha,
        revenue: potential_per_ha * CARBON_PRICE_USD,
    }
}

pub(crate) fn estimate_value(lat: f64, lon: f64, ndvi: f64, area_ha: f64) -> Value {
    json!({
        "lat": lat,
        "lon": lon,
        "ndvi": ndvi,
        "viewport_method": viewport_estimate(ndvi, area_ha),
        "point_method": point_estimate(ndvi),
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    })
}

/// Carbon estimator that samples NDVI from the imagery endpoint.
pub struct NdviCarbonEstimator {
    imagery: Arc<ImageryClient>,
}

impl NdviCarbonEstimator {
    pub fn new(imagery: Arc<ImageryClient>) -> Self {
        Self { imagery }
    }
}

impl CarbonEstimator for NdviCarbonEstimator {
    fn estimate(&self, lat: f64, lon: f64, area_ha: f64) -> Result<Option<Value>> {
        let Some(ndvi) = self.imagery.ndvi(lat, lon)? else {
            tracing::debug!(lat, lon, "ndvi unavailable, no carbon estimate");
            return Ok(None);
        };
        Ok(Some(estimate_value(lat, lon, ndvi, area_ha)))
    }
}
