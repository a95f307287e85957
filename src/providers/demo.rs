//! Canned offline providers for demo mode.
//!
//! These return fixed data for a representative rice field so the whole
//! pipeline can run end-to-end with no network access and no credentials.
use super::{
    carbon, CarbonEstimator, FieldDirectory, FloodRiskPredictor, IotReadingStore,
    VegetationIndexProvider,
};
use crate::state::{FieldConfig, Location};
use anyhow::Result;
use chrono::{Datelike, Utc};
use serde_json::{json, Value};

const DEMO_LAT: f64 = 23.50;
const DEMO_LON: f64 = 90.30;
const DEMO_NDVI: f64 = 0.35;

pub struct DemoDirectory;

impl FieldDirectory for DemoDirectory {
    fn field_config(&self, farmer_id: &str, field_id: &str) -> Result<FieldConfig> {
        Ok(FieldConfig {
            farmer_id: Some(farmer_id.to_string()),
            field_id: Some(field_id.to_string()),
            farmer_name: Some("Rahim".to_string()),
            crop_type: Some("Rice".to_string()),
            location: Some(Location {
                lat: Some(DEMO_LAT),
                lon: Some(DEMO_LON),
            }),
            ..FieldConfig::default()
        })
    }
}

pub struct DemoIotStore;

impl IotReadingStore for DemoIotStore {
    fn readings(&self, _farmer_id: &str, _field_id: &str) -> Result<Value> {
        Ok(json!({
            "has_data": true,
            "latest": {"soilTemp": 30, "soilMoisture": 18},
            "recent": [],
        }))
    }
}

pub struct DemoImagery;

impl VegetationIndexProvider for DemoImagery {
    fn indices(&self, lat: f64, lon: f64) -> Result<Value> {
        Ok(json!({
            "lat": lat,
            "lon": lon,
            "NDSSI": -0.12,
            "NDRE": 0.31,
            "NDNI": 0.18,
            "note": "demo mode",
        }))
    }
}

pub struct DemoCarbonEstimator;

impl CarbonEstimator for DemoCarbonEstimator {
    fn estimate(&self, lat: f64, lon: f64, area_ha: f64) -> Result<Option<Value>> {
        Ok(Some(json!({
            "lat": lat,
            "lon": lon,
            "ndvi": DEMO_NDVI,
            "viewport_method": carbon::viewport_estimate(DEMO_NDVI, area_ha),
            "point_method": carbon::point_estimate(DEMO_NDVI),
            "note": "demo mode",
        })))
    }
}

pub struct DemoFloodPredictor;

impl FloodRiskPredictor for DemoFloodPredictor {
    fn predict(&self, lat: f64, lon: f64) -> Result<Value> {
        Ok(json!({
            "mode": "demo",
            "lat": lat,
            "lon": lon,
            "features": {
                "month_1_avg_temp": 27.5,
                "month_2_avg_temp": 28.1,
                "month_3_avg_temp": 29.0,
                "current_month": Utc::now().month(),
            },
            "predicted_rainfall_mm": 320.0,
            "flood_risk": "high",
        }))
    }
}
