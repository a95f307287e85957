//! Shared test infrastructure for pipeline integration tests.
//!
//! In-memory fakes for every collaborator, with call counters on the
//! location-dependent providers so tests can assert which services a run
//! actually touched.

use anyhow::{anyhow, Result};
use field_guardian::providers::{
    CarbonEstimator, ConsultationRecord, ConsultationStore, FieldDirectory, FloodRiskPredictor,
    IotReadingStore, LanguageModel, Services, VegetationIndexProvider,
};
use field_guardian::state::FieldConfig;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A directory record with resolvable coordinates and a prediction.
pub fn located_config() -> FieldConfig {
    serde_json::from_value(json!({
        "farmer_id": "F1",
        "field_id": "A1",
        "farmer_name": "Rahim",
        "cropType": "Rice",
        "location": {"lat": 23.5, "lon": 90.3},
        "latestPrediction": {"nitrogenStatus": "adequate", "salinityRisk": "low"},
    }))
    .expect("located config")
}

/// A directory miss: identifiers plus an error descriptor, nothing else.
pub fn missing_config() -> FieldConfig {
    FieldConfig {
        farmer_id: Some("F1".to_string()),
        field_id: Some("A1".to_string()),
        error: Some("farmer_not_found".to_string()),
        ..FieldConfig::default()
    }
}

struct FakeDirectory {
    config: FieldConfig,
}

impl FieldDirectory for FakeDirectory {
    fn field_config(&self, _farmer_id: &str, _field_id: &str) -> Result<FieldConfig> {
        Ok(self.config.clone())
    }
}

struct FakeIotStore {
    readings: Value,
}

impl IotReadingStore for FakeIotStore {
    fn readings(&self, _farmer_id: &str, _field_id: &str) -> Result<Value> {
        Ok(self.readings.clone())
    }
}

struct CountingSatellite {
    response: Value,
    calls: Rc<Cell<u32>>,
}

impl VegetationIndexProvider for CountingSatellite {
    fn indices(&self, _lat: f64, _lon: f64) -> Result<Value> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.response.clone())
    }
}

struct CountingCarbon {
    response: Option<Value>,
    calls: Rc<Cell<u32>>,
}

impl CarbonEstimator for CountingCarbon {
    fn estimate(&self, _lat: f64, _lon: f64, _area_ha: f64) -> Result<Option<Value>> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.response.clone())
    }
}

struct CountingFlood {
    response: Value,
    calls: Rc<Cell<u32>>,
}

impl FloodRiskPredictor for CountingFlood {
    fn predict(&self, _lat: f64, _lon: f64) -> Result<Value> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.response.clone())
    }
}

struct ScriptedLlm {
    responses: RefCell<Vec<Result<String>>>,
    calls: Rc<Cell<u32>>,
}

impl LanguageModel for ScriptedLlm {
    fn complete(&self, _system: &str, _payload: &str) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        let mut responses = self.responses.borrow_mut();
        if responses.is_empty() {
            return Err(anyhow!("script exhausted"));
        }
        responses.remove(0)
    }
}

struct RecordingStore {
    records: Rc<RefCell<Vec<ConsultationRecord>>>,
    fail: bool,
}

impl ConsultationStore for RecordingStore {
    fn append(
        &self,
        _farmer_id: &str,
        _field_id: &str,
        record: &ConsultationRecord,
    ) -> Result<String> {
        if self.fail {
            return Err(anyhow!("store unavailable"));
        }
        self.records.borrow_mut().push(record.clone());
        Ok(format!("r{}", self.records.borrow().len()))
    }
}

/// Inputs for a fake service bundle. Defaults model a healthy located
/// field; override per test.
pub struct HarnessOptions {
    pub config: FieldConfig,
    pub iot: Value,
    pub satellite: Value,
    pub carbon: Option<Value>,
    pub flood: Value,
    pub llm: Vec<Result<String>>,
    pub store_fails: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            config: located_config(),
            iot: json!({
                "has_data": true,
                "latest": {"soilMoisture": 25, "soilTemp": 30},
                "recent": [],
            }),
            satellite: json!({"NDSSI": -0.1, "NDRE": 0.3, "NDNI": 0.2}),
            carbon: Some(json!({"ndvi": 0.35})),
            flood: json!({"flood_risk": "medium"}),
            llm: Vec::new(),
            store_fails: false,
        }
    }
}

/// A wired fake bundle plus the probes the tests assert on.
pub struct Harness {
    pub services: Services,
    pub llm_calls: Rc<Cell<u32>>,
    pub satellite_calls: Rc<Cell<u32>>,
    pub carbon_calls: Rc<Cell<u32>>,
    pub flood_calls: Rc<Cell<u32>>,
    pub records: Rc<RefCell<Vec<ConsultationRecord>>>,
}

pub fn harness(options: HarnessOptions) -> Harness {
    let llm_calls = Rc::new(Cell::new(0));
    let satellite_calls = Rc::new(Cell::new(0));
    let carbon_calls = Rc::new(Cell::new(0));
    let flood_calls = Rc::new(Cell::new(0));
    let records = Rc::new(RefCell::new(Vec::new()));

    let services = Services {
        directory: Box::new(FakeDirectory {
            config: options.config,
        }),
        iot: Box::new(FakeIotStore {
            readings: options.iot,
        }),
        satellite: Box::new(CountingSatellite {
            response: options.satellite,
            calls: satellite_calls.clone(),
        }),
        carbon: Box::new(CountingCarbon {
            response: options.carbon,
            calls: carbon_calls.clone(),
        }),
        flood: Box::new(CountingFlood {
            response: options.flood,
            calls: flood_calls.clone(),
        }),
        llm: Box::new(ScriptedLlm {
            responses: RefCell::new(options.llm),
            calls: llm_calls.clone(),
        }),
        store: Box::new(RecordingStore {
            records: records.clone(),
            fail: options.store_fails,
        }),
    };

    Harness {
        services,
        llm_calls,
        satellite_calls,
        carbon_calls,
        flood_calls,
        records,
    }
}

/// Convenience: a location-free field (coordinates never resolve).
pub fn unlocated_options() -> HarnessOptions {
    HarnessOptions {
        config: missing_config(),
        ..HarnessOptions::default()
    }
}
