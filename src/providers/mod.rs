//! Collaborator contracts and service wiring.
//!
//! Every external dependency of the pipeline sits behind one of these traits
//! so the pipeline can be exercised against in-memory fakes. The real
//! implementations are wired once per process in [`build_services`] and
//! passed down explicitly; nothing reaches for ambient globals.
mod carbon;
mod demo;
mod filestore;
mod flood;
mod imagery;
mod llm;
mod rtdb;

pub use carbon::NdviCarbonEstimator;
pub use filestore::{FileStore, StoredConsultation};
pub use flood::{categorize_risk, load_flood_model, FloodModel, OpenMeteoFloodPredictor};
pub use imagery::{ImageryClient, SatelliteIndexProvider};
pub use llm::{CommandModel, HttpChatModel};
pub use rtdb::{RtdbClient, RtdbConsultationStore, RtdbDirectory, RtdbIotStore};

use crate::settings::{LlmSettings, Settings};
use crate::state::FieldConfig;
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Farmer and field metadata lookup.
pub trait FieldDirectory {
    /// Fetch the combined farmer + field record. A missing farmer or field
    /// is not an error: it yields a config carrying an `error` descriptor.
    fn field_config(&self, farmer_id: &str, field_id: &str) -> Result<FieldConfig>;
}

/// IoT sensor reading store.
pub trait IotReadingStore {
    /// Fetch readings as `{has_data, latest, recent}`, most recent first.
    fn readings(&self, farmer_id: &str, field_id: &str) -> Result<Value>;
}

/// Satellite vegetation-index provider.
pub trait VegetationIndexProvider {
    /// Sample spectral indices (NDSSI, NDRE, NDNI) at a point.
    fn indices(&self, lat: f64, lon: f64) -> Result<Value>;
}

/// Carbon-sequestration estimator.
pub trait CarbonEstimator {
    /// Estimate sequestration for a field area. `None` means vegetation
    /// data was unavailable.
    fn estimate(&self, lat: f64, lon: f64, area_ha: f64) -> Result<Option<Value>>;
}

/// Flood-risk predictor.
pub trait FloodRiskPredictor {
    /// Predict flood risk from recent temperature history.
    fn predict(&self, lat: f64, lon: f64) -> Result<Value>;
}

/// Language-model invoker. No structural guarantee on the response text;
/// callers must defensively parse it.
pub trait LanguageModel {
    fn complete(&self, system: &str, payload: &str) -> Result<String>;
}

/// Append-only consultation history.
pub trait ConsultationStore {
    /// Append one record under the field's history, returning the generated
    /// record id.
    fn append(&self, farmer_id: &str, field_id: &str, record: &ConsultationRecord)
        -> Result<String>;
}

/// Persisted outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub timestamp: String,
    pub problems: Vec<String>,
    pub solutions: Vec<String>,
    pub carbon_data: Option<Value>,
}

impl ConsultationRecord {
    /// Build a record with a fresh UTC timestamp, normalizing scalar
    /// problems/solutions into single-element lists.
    pub fn from_parts(problems: Value, solutions: Value, carbon_data: Option<Value>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            problems: coerce_list(problems),
            solutions: coerce_list(solutions),
            carbon_data,
        }
    }
}

/// Normalize a JSON value into a list of strings: lists coerce per element,
/// null becomes empty, anything else becomes a one-element list.
pub fn coerce_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.into_iter().map(value_to_string).collect(),
        Value::Null => Vec::new(),
        other => vec![value_to_string(other)],
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Error descriptor written into a run-state slot when a collaborator call
/// fails.
pub fn error_value(kind: &str, err: &anyhow::Error) -> Value {
    json!({"error": kind, "detail": format!("{err:#}")})
}

/// The collaborator bundle injected into the pipeline.
pub struct Services {
    pub directory: Box<dyn FieldDirectory>,
    pub iot: Box<dyn IotReadingStore>,
    pub satellite: Box<dyn VegetationIndexProvider>,
    pub carbon: Box<dyn CarbonEstimator>,
    pub flood: Box<dyn FloodRiskPredictor>,
    pub llm: Box<dyn LanguageModel>,
    pub store: Box<dyn ConsultationStore>,
}

/// Wire real (or demo) collaborators from settings.
pub fn build_services(settings: &Settings) -> Result<Services> {
    let llm = build_language_model(&settings.llm)?;

    if settings.demo_mode {
        let store = FileStore::new(settings.resolve_data_dir()?);
        return Ok(Services {
            directory: Box::new(demo::DemoDirectory),
            iot: Box::new(demo::DemoIotStore),
            satellite: Box::new(demo::DemoImagery),
            carbon: Box::new(demo::DemoCarbonEstimator),
            flood: Box::new(demo::DemoFloodPredictor),
            llm,
            store: Box::new(store),
        });
    }

    let agent = http_agent();
    let rtdb = Arc::new(RtdbClient::new(
        agent.clone(),
        &settings.rtdb.base_url,
        settings.rtdb.auth_token.clone(),
    ));
    let imagery = Arc::new(ImageryClient::new(agent.clone(), &settings.imagery.base_url));

    let flood_model = match &settings.flood_model {
        None => {
            tracing::warn!("flood model not configured; predictor will report features only");
            None
        }
        Some(path) => match load_flood_model(path) {
            Ok(model) => Some(model),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "failed to load flood model"
                );
                None
            }
        },
    };

    Ok(Services {
        directory: Box::new(RtdbDirectory::new(rtdb.clone())),
        iot: Box::new(RtdbIotStore::new(rtdb.clone())),
        satellite: Box::new(SatelliteIndexProvider::new(imagery.clone())),
        carbon: Box::new(NdviCarbonEstimator::new(imagery)),
        flood: Box::new(OpenMeteoFloodPredictor::new(
            agent,
            &settings.weather.base_url,
            flood_model,
        )),
        llm,
        store: Box::new(RtdbConsultationStore::new(rtdb)),
    })
}

fn build_language_model(settings: &LlmSettings) -> Result<Box<dyn LanguageModel>> {
    if let Some(command) = &settings.command {
        return Ok(Box::new(CommandModel::new(command)?));
    }
    Ok(Box::new(HttpChatModel::new(settings)))
}

fn http_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(30)))
        .build()
        .into()
}
