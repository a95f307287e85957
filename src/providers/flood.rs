//! Flood-risk prediction from recent temperature history.
//!
//! The predictor averages daily mean temperatures for the last three full
//! calendar months (historical-weather archive, UTC), feeds them with the
//! current month number into a trained linear regression, and buckets the
//! predicted monthly rainfall into a categorical risk.
use super::FloodRiskPredictor;
use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Days, Months, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Trained regression artifact: rainfall over
/// `[month_1_avg_temp, month_2_avg_temp, month_3_avg_temp, current_month]`.
#[derive(Debug, Clone, Deserialize)]
pub struct FloodModel {
    pub intercept: f64,
    pub coefficients: [f64; 4],
}

impl FloodModel {
    /// Predicted monthly rainfall in millimetres.
    pub fn predict(&self, features: [f64; 4]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features.iter())
                .map(|(coefficient, feature)| coefficient * feature)
                .sum::<f64>()
    }
}

/// Load the regression artifact from a JSON file.
pub fn load_flood_model(path: &Path) -> Result<FloodModel> {
    let bytes =
        fs::read(path).with_context(|| format!("read flood model {}", path.display()))?;
    let model: FloodModel =
        serde_json::from_slice(&bytes).context("parse flood model JSON")?;
    Ok(model)
}

/// Bucket predicted rainfall into a categorical risk.
pub fn categorize_risk(predicted_rainfall_mm: f64) -> &'static str {
    if predicted_rainfall_mm < 100.0 {
        "low"
    } else if predicted_rainfall_mm < 250.0 {
        "medium"
    } else {
        "high"
    }
}

/// First and last day of a calendar month.
fn month_window(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| anyhow!("invalid month {year}-{month:02}"))?;
    let end = start + Months::new(1) - Days::new(1);
    Ok((start, end))
}

/// The last `n` fully elapsed calendar months, oldest first.
fn last_full_months(today: NaiveDate, n: u32) -> Vec<(i32, u32)> {
    let first_of_current = today.with_day(1).unwrap_or(today);
    let mut months: Vec<(i32, u32)> = (1..=n)
        .map(|back| {
            let month = first_of_current - Months::new(back);
            (month.year(), month.month())
        })
        .collect();
    months.reverse();
    months
}

/// Flood predictor backed by the historical-weather archive.
pub struct OpenMeteoFloodPredictor {
    agent: ureq::Agent,
    base_url: String,
    model: Option<FloodModel>,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    daily: ArchiveDaily,
}

#[derive(Debug, Default, Deserialize)]
struct ArchiveDaily {
    #[serde(default)]
    temperature_2m_mean: Vec<Option<f64>>,
}

impl OpenMeteoFloodPredictor {
    pub fn new(agent: ureq::Agent, base_url: &str, model: Option<FloodModel>) -> Self {
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    /// Mean daily temperature for one month, or `None` when the archive has
    /// no usable data for the window.
    fn monthly_avg_temp(&self, lat: f64, lon: f64, year: i32, month: u32) -> Result<Option<f64>> {
        let (start, end) = month_window(year, month)?;
        let result = self
            .agent
            .get(&self.base_url)
            .query("latitude", &lat.to_string())
            .query("longitude", &lon.to_string())
            .query("start_date", &start.to_string())
            .query("end_date", &end.to_string())
            .query("daily", "temperature_2m_mean")
            .query("timezone", "UTC")
            .call();
        let mut response = match result {
            Ok(response) => response,
            // A rejected window (e.g. outside archive coverage) is missing
            // data, not a transport fault.
            Err(ureq::Error::StatusCode(code)) => {
                tracing::warn!(code, year, month, "weather archive rejected request");
                return Ok(None);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("fetch temps for {year}-{month:02}"))
            }
        };
        let parsed: ArchiveResponse = response
            .body_mut()
            .read_json()
            .context("parse weather archive response")?;
        let temps: Vec<f64> = parsed
            .daily
            .temperature_2m_mean
            .into_iter()
            .flatten()
            .collect();
        if temps.is_empty() {
            return Ok(None);
        }
        Ok(Some(temps.iter().sum::<f64>() / temps.len() as f64))
    }
}

impl FloodRiskPredictor for OpenMeteoFloodPredictor {
    fn predict(&self, lat: f64, lon: f64) -> Result<Value> {
        let today = Utc::now().date_naive();
        let months = last_full_months(today, 3);
        let mut temps = Vec::with_capacity(months.len());
        for (year, month) in &months {
            temps.push(self.monthly_avg_temp(lat, lon, *year, *month)?);
        }

        let month_report: Vec<Value> = months
            .iter()
            .zip(temps.iter())
            .map(|((year, month), temp)| {
                json!({"year": year, "month": month, "avg_temp": temp})
            })
            .collect();

        let resolved: Vec<f64> = temps.iter().copied().flatten().collect();
        if resolved.len() < months.len() {
            return Ok(json!({
                "mode": "real",
                "error": "Could not retrieve temperature data.",
                "months": month_report,
            }));
        }

        let current_month = Utc::now().month();
        let features = [
            resolved[0],
            resolved[1],
            resolved[2],
            f64::from(current_month),
        ];
        let feature_report = json!({
            "month_1_avg_temp": features[0],
            "month_2_avg_temp": features[1],
            "month_3_avg_temp": features[2],
            "current_month": current_month,
        });

        let Some(model) = &self.model else {
            return Ok(json!({
                "mode": "real",
                "warning": "Flood model not loaded.",
                "features": feature_report,
            }));
        };

        let predicted = model.predict(features);
        Ok(json!({
            "mode": "real",
            "lat": lat,
            "lon": lon,
            "months": month_report,
            "features": feature_report,
            "predicted_rainfall_mm": predicted,
            "flood_risk": categorize_risk(predicted),
        }))
    }
}
