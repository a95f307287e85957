//! Persistence step: append the consultation outcome to durable history.
//!
//! Best-effort by design: a store failure is reported and the run still
//! returns its problems/solutions. Callers must not treat a returned
//! consultation as durably recorded.
use crate::providers::{ConsultationRecord, Services};
use crate::state::ConsultationState;
use serde_json::json;

pub fn persist_consultation(services: &Services, state: &ConsultationState) {
    let record = ConsultationRecord::from_parts(
        json!(state.problems),
        json!(state.solutions),
        state.carbon_data.clone(),
    );
    match services
        .store
        .append(&state.farmer_id, &state.field_id, &record)
    {
        Ok(id) => {
            tracing::info!(
                farmer_id = %state.farmer_id,
                field_id = %state.field_id,
                record_id = %id,
                "consultation persisted"
            );
        }
        Err(err) => {
            tracing::warn!(
                farmer_id = %state.farmer_id,
                field_id = %state.field_id,
                error = %format!("{err:#}"),
                "failed to persist consultation"
            );
        }
    }
}
