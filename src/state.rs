//! Per-consultation run state threaded through the pipeline.
//!
//! One `ConsultationState` is created per request and mutated in place by
//! each step. Fields are write-once: every collector owns exactly one slot,
//! and downstream readers treat `None` as "no data available", never as an
//! error.
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Field coordinates as stored in the directory record.
///
/// Either component may be missing; location-dependent collectors only run
/// when both are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Latest agronomic prediction attached to a field record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestPrediction {
    #[serde(rename = "nitrogenStatus")]
    pub nitrogen_status: Option<String>,
    #[serde(rename = "salinityRisk")]
    pub salinity_risk: Option<String>,
}

/// Farmer identity and field attributes from the directory.
///
/// Every field is optional: a directory miss yields a config carrying only
/// the identifiers and an `error` descriptor, and downstream steps operate
/// on whatever subset is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldConfig {
    pub farmer_id: Option<String>,
    pub field_id: Option<String>,
    pub farmer_name: Option<String>,
    pub phone: Option<String>,
    pub region: Option<String>,
    pub district: Option<String>,
    pub upazila: Option<String>,
    pub village: Option<String>,
    #[serde(rename = "fieldSize")]
    pub field_size: Option<f64>,
    #[serde(rename = "cropType")]
    pub crop_type: Option<String>,
    #[serde(rename = "soilType")]
    pub soil_type: Option<String>,
    pub location: Option<Location>,
    #[serde(rename = "currentCrop")]
    pub current_crop: Option<String>,
    #[serde(rename = "latestPrediction")]
    pub latest_prediction: Option<LatestPrediction>,
    /// Set when the directory lookup failed (e.g. `farmer_not_found`).
    pub error: Option<String>,
}

impl FieldConfig {
    /// Resolved coordinates, present only when both components exist.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let location = self.location.as_ref()?;
        match (location.lat, location.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Mutable record for one pipeline execution.
#[derive(Debug, Clone, Serialize)]
pub struct ConsultationState {
    pub farmer_id: String,
    pub field_id: String,

    pub field_config: Option<FieldConfig>,
    pub iot_data: Option<Value>,
    pub satellite_data: Option<Value>,
    pub flood_risk: Option<Value>,
    pub carbon_data: Option<Value>,

    pub problems: Vec<String>,
    pub solutions: Vec<String>,
}

impl ConsultationState {
    pub fn new(farmer_id: impl Into<String>, field_id: impl Into<String>) -> Self {
        Self {
            farmer_id: farmer_id.into(),
            field_id: field_id.into(),
            field_config: None,
            iot_data: None,
            satellite_data: None,
            flood_risk: None,
            carbon_data: None,
            problems: Vec::new(),
            solutions: Vec::new(),
        }
    }

    /// Coordinates derived from the fetched field config, if any.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.field_config.as_ref().and_then(FieldConfig::coordinates)
    }

    /// Payload for the problem-detection prompt.
    ///
    /// Absent fields serialize as `null` so the model sees which inputs were
    /// unavailable. Carbon data is deliberately not part of either payload.
    pub fn problem_payload(&self) -> Value {
        json!({
            "field_config": self.field_config,
            "iot_data": self.iot_data,
            "satellite_data": self.satellite_data,
            "flood_risk": self.flood_risk,
        })
    }

    /// Payload for the solution-planning prompt: the problem payload plus
    /// the detected problems.
    pub fn solution_payload(&self) -> Value {
        json!({
            "problems": self.problems,
            "field_config": self.field_config,
            "iot_data": self.iot_data,
            "satellite_data": self.satellite_data,
            "flood_risk": self.flood_risk,
        })
    }
}
