//! Realtime-database REST client and the providers built on it.
//!
//! The directory, IoT store, and consultation store all share one database;
//! each provider owns its path layout and response shaping, the client only
//! speaks the REST protocol (`GET`/`POST {base}/{path}.json`).
use super::{ConsultationRecord, ConsultationStore, FieldDirectory, IotReadingStore};
use crate::state::FieldConfig;
use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::sync::Arc;

/// Minimal Realtime Database REST client.
pub struct RtdbClient {
    agent: ureq::Agent,
    base_url: String,
    auth_token: Option<String>,
}

impl RtdbClient {
    pub fn new(agent: ureq::Agent, base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    /// Read a node. A JSON `null` body means the node does not exist.
    pub fn get(&self, path: &str) -> Result<Option<Value>> {
        let url = self.node_url(path);
        let mut request = self.agent.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.query("auth", token);
        }
        let mut response = request
            .call()
            .with_context(|| format!("fetch rtdb node {path}"))?;
        let value: Value = response
            .body_mut()
            .read_json()
            .with_context(|| format!("parse rtdb node {path}"))?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    /// Append a value under a node, returning the generated child key.
    pub fn push(&self, path: &str, value: &impl serde::Serialize) -> Result<String> {
        let url = self.node_url(path);
        let mut request = self.agent.post(&url);
        if let Some(token) = &self.auth_token {
            request = request.query("auth", token);
        }
        let mut response = request
            .send_json(value)
            .with_context(|| format!("push rtdb node {path}"))?;
        let body: Value = response
            .body_mut()
            .read_json()
            .with_context(|| format!("parse rtdb push response for {path}"))?;
        body.get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("rtdb push response missing generated key for {path}"))
    }
}

/// Farmer/field directory backed by the database.
pub struct RtdbDirectory {
    client: Arc<RtdbClient>,
}

impl RtdbDirectory {
    pub fn new(client: Arc<RtdbClient>) -> Self {
        Self { client }
    }
}

impl FieldDirectory for RtdbDirectory {
    fn field_config(&self, farmer_id: &str, field_id: &str) -> Result<FieldConfig> {
        let farmer_path = format!("Farmers/{farmer_id}");
        let Some(farmer) = self.client.get(&farmer_path)? else {
            tracing::debug!(%farmer_id, "farmer record not found");
            return Ok(not_found_config(farmer_id, field_id, "farmer_not_found"));
        };

        let field_path = format!("Farmers/{farmer_id}/Fields/{field_id}");
        let Some(field) = self.client.get(&field_path)? else {
            tracing::debug!(%farmer_id, %field_id, "field record not found");
            return Ok(not_found_config(farmer_id, field_id, "field_not_found"));
        };

        Ok(merge_field_config(farmer_id, field_id, &farmer, field))
    }
}

fn not_found_config(farmer_id: &str, field_id: &str, kind: &str) -> FieldConfig {
    FieldConfig {
        farmer_id: Some(farmer_id.to_string()),
        field_id: Some(field_id.to_string()),
        error: Some(kind.to_string()),
        ..FieldConfig::default()
    }
}

/// Combine the farmer identity record with the field record. A field record
/// that fails typed deserialization is treated as absent data, not an error.
fn merge_field_config(
    farmer_id: &str,
    field_id: &str,
    farmer: &Value,
    field: Value,
) -> FieldConfig {
    let mut config: FieldConfig = serde_json::from_value(field).unwrap_or_default();
    config.farmer_id = Some(farmer_id.to_string());
    config.field_id = Some(field_id.to_string());
    config.farmer_name = string_field(farmer, "name");
    config.phone = string_field(farmer, "phone");
    config.region = string_field(farmer, "region");
    config.district = string_field(farmer, "district");
    config.upazila = string_field(farmer, "upazila");
    config.village = string_field(farmer, "village");
    config
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// IoT sensor store backed by the database.
pub struct RtdbIotStore {
    client: Arc<RtdbClient>,
}

impl RtdbIotStore {
    pub fn new(client: Arc<RtdbClient>) -> Self {
        Self { client }
    }
}

impl IotReadingStore for RtdbIotStore {
    fn readings(&self, farmer_id: &str, field_id: &str) -> Result<Value> {
        let path = format!("Farmers/{farmer_id}/Fields/{field_id}/IoT/SensorReadings");
        let Some(raw) = self.client.get(&path)? else {
            return Ok(no_readings());
        };
        Ok(shape_readings(raw))
    }
}

fn no_readings() -> Value {
    json!({"has_data": false, "message": "No IoT readings found"})
}

/// Shape a raw readings node into `{has_data, latest, recent}` with the
/// readings in reverse chronological order.
pub(crate) fn shape_readings(raw: Value) -> Value {
    let mut readings: Vec<Value> = match raw {
        Value::Object(map) => map.into_iter().map(|(_, reading)| reading).collect(),
        Value::Array(items) => items.into_iter().filter(|item| !item.is_null()).collect(),
        _ => Vec::new(),
    };
    if readings.is_empty() {
        return no_readings();
    }
    readings.sort_by(|a, b| reading_timestamp(b).cmp(reading_timestamp(a)));
    let latest = readings[0].clone();
    let recent: Vec<Value> = readings.into_iter().take(5).collect();
    json!({
        "has_data": true,
        "latest": latest,
        "recent": recent,
    })
}

fn reading_timestamp(reading: &Value) -> &str {
    reading
        .get("timestamp")
        .and_then(Value::as_str)
        .unwrap_or("")
}

/// Consultation history backed by the database.
pub struct RtdbConsultationStore {
    client: Arc<RtdbClient>,
}

impl RtdbConsultationStore {
    pub fn new(client: Arc<RtdbClient>) -> Self {
        Self { client }
    }
}

impl ConsultationStore for RtdbConsultationStore {
    fn append(
        &self,
        farmer_id: &str,
        field_id: &str,
        record: &ConsultationRecord,
    ) -> Result<String> {
        let path = format!("Farmers/{farmer_id}/Fields/{field_id}/AIConsultations");
        self.client.push(&path, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_readings_sorts_most_recent_first() {
        let raw = json!({
            "-Na1": {"timestamp": "2026-07-01T00:00:00Z", "soilMoisture": 22},
            "-Na2": {"timestamp": "2026-07-03T00:00:00Z", "soilMoisture": 18},
            "-Na3": {"timestamp": "2026-07-02T00:00:00Z", "soilMoisture": 20},
        });
        let shaped = shape_readings(raw);
        assert_eq!(shaped["has_data"], true);
        assert_eq!(shaped["latest"]["soilMoisture"], 18);
        assert_eq!(shaped["recent"].as_array().unwrap().len(), 3);
        assert_eq!(shaped["recent"][2]["soilMoisture"], 22);
    }

    #[test]
    fn shape_readings_caps_recent_at_five() {
        let mut map = serde_json::Map::new();
        for day in 1..=8 {
            map.insert(
                format!("-K{day}"),
                json!({"timestamp": format!("2026-07-{day:02}T00:00:00Z")}),
            );
        }
        let shaped = shape_readings(Value::Object(map));
        assert_eq!(shaped["recent"].as_array().unwrap().len(), 5);
        assert_eq!(shaped["latest"]["timestamp"], "2026-07-08T00:00:00Z");
    }

    #[test]
    fn empty_readings_report_no_data() {
        let shaped = shape_readings(json!({}));
        assert_eq!(shaped["has_data"], false);
        assert!(shaped.get("latest").is_none());
    }

    #[test]
    fn merge_keeps_field_attributes_and_farmer_identity() {
        let farmer = json!({"name": "Rahim", "region": "Dhaka"});
        let field = json!({
            "cropType": "Rice",
            "location": {"lat": 23.5, "lon": 90.3},
        });
        let config = merge_field_config("F1", "A1", &farmer, field);
        assert_eq!(config.farmer_name.as_deref(), Some("Rahim"));
        assert_eq!(config.crop_type.as_deref(), Some("Rice"));
        assert_eq!(config.coordinates(), Some((23.5, 90.3)));
        assert!(config.error.is_none());
    }

    #[test]
    fn malformed_field_record_degrades_to_identity_only() {
        let farmer = json!({"name": "Rahim"});
        let field = json!({"location": {"lat": "not-a-number"}});
        let config = merge_field_config("F1", "A1", &farmer, field);
        assert_eq!(config.farmer_id.as_deref(), Some("F1"));
        assert!(config.coordinates().is_none());
    }
}
