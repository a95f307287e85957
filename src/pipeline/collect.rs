//! Collector steps: each reads the run state, calls one collaborator, and
//! writes exactly one state field.
//!
//! Collectors never fail the pipeline. A collaborator error becomes an
//! error descriptor in the collector's own slot, and a missing location
//! skips the downstream call entirely.
use crate::providers::{error_value, Services};
use crate::state::{ConsultationState, FieldConfig};
use serde_json::json;

/// Field area assumed for the carbon estimate, in hectares.
const CARBON_AREA_HA: f64 = 1.0;

pub fn collect_field_config(services: &Services, state: &mut ConsultationState) {
    match services
        .directory
        .field_config(&state.farmer_id, &state.field_id)
    {
        Ok(config) => state.field_config = Some(config),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "directory lookup failed");
            state.field_config = Some(FieldConfig {
                farmer_id: Some(state.farmer_id.clone()),
                field_id: Some(state.field_id.clone()),
                error: Some("directory_unavailable".to_string()),
                ..FieldConfig::default()
            });
        }
    }
}

pub fn collect_iot(services: &Services, state: &mut ConsultationState) {
    state.iot_data = Some(
        match services.iot.readings(&state.farmer_id, &state.field_id) {
            Ok(readings) => readings,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "iot fetch failed");
                error_value("iot_unavailable", &err)
            }
        },
    );
}

pub fn collect_satellite(services: &Services, state: &mut ConsultationState) {
    let Some((lat, lon)) = state.coordinates() else {
        state.satellite_data = Some(json!({"error": "location_unavailable"}));
        return;
    };
    state.satellite_data = Some(match services.satellite.indices(lat, lon) {
        Ok(indices) => indices,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "satellite fetch failed");
            error_value("satellite_unavailable", &err)
        }
    });
}

pub fn collect_carbon(services: &Services, state: &mut ConsultationState) {
    let Some((lat, lon)) = state.coordinates() else {
        // No location means no estimate at all, not an error descriptor.
        state.carbon_data = None;
        return;
    };
    state.carbon_data = match services.carbon.estimate(lat, lon, CARBON_AREA_HA) {
        Ok(estimate) => estimate,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "carbon estimate failed");
            Some(error_value("carbon_unavailable", &err))
        }
    };
}

pub fn collect_flood(services: &Services, state: &mut ConsultationState) {
    let Some((lat, lon)) = state.coordinates() else {
        state.flood_risk = Some(json!({"error": "location_unavailable"}));
        return;
    };
    state.flood_risk = Some(match services.flood.predict(lat, lon) {
        Ok(prediction) => prediction,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "flood prediction failed");
            error_value("flood_unavailable", &err)
        }
    });
}
