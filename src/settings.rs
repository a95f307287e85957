//! Runtime settings for the consultation pipeline.
//!
//! Settings live in a JSON file owned by the operator; secrets (the LLM API
//! key) are taken from the environment and never written to disk. Loading
//! and validation are split so the CLI can report a bad file before any
//! service is wired.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an alternate settings file.
pub const CONFIG_PATH_ENV: &str = "FIELDGUARD_CONFIG";

/// Environment variable holding the chat-completions API key.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Environment variable overriding the configured model name.
pub const MODEL_NAME_ENV: &str = "MODEL_NAME";

/// Language-model invocation settings.
///
/// When `command` is set the model is invoked as a subprocess (prompt on
/// stdin, response on stdout); otherwise the HTTP chat-completions client is
/// used with `base_url`/`model`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde(default)]
    pub command: Option<String>,
    /// Populated from the environment at load time, never serialized.
    #[serde(skip)]
    pub api_key: Option<String>,
}

/// Realtime-database settings for the directory, IoT store, and
/// consultation store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtdbSettings {
    pub base_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Imagery-statistics endpoint serving spectral indices and point NDVI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagerySettings {
    pub base_url: String,
}

/// Historical-weather endpoint used by the flood predictor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSettings {
    pub base_url: String,
}

/// Top-level settings record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub demo_mode: bool,
    pub llm: LlmSettings,
    pub rtdb: RtdbSettings,
    pub imagery: ImagerySettings,
    pub weather: WeatherSettings,
    /// Trained flood-model artifact (JSON coefficients). Optional; the
    /// predictor degrades to a features-only result without it.
    #[serde(default)]
    pub flood_model: Option<PathBuf>,
    /// Root for locally persisted consultations (demo mode). Defaults to
    /// the platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Build the defaults used when no settings file exists yet.
pub fn default_settings() -> Settings {
    Settings {
        demo_mode: false,
        llm: LlmSettings {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.2,
            max_tokens: 2048,
            command: None,
            api_key: None,
        },
        rtdb: RtdbSettings {
            base_url: "https://shonali-desh-19ead-default-rtdb.firebaseio.com".to_string(),
            auth_token: None,
        },
        imagery: ImagerySettings {
            base_url: String::new(),
        },
        weather: WeatherSettings {
            base_url: "https://archive-api.open-meteo.com/v1/archive".to_string(),
        },
        flood_model: None,
        data_dir: None,
    }
}

/// Resolve the settings path: explicit flag, then `FIELDGUARD_CONFIG`, then
/// the platform config dir.
pub fn resolve_settings_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    let config_dir = dirs::config_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("cannot determine config directory"))?;
    Ok(config_dir.join("fieldguard").join("config.json"))
}

/// Load settings from disk and apply environment overrides.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let bytes = fs::read(path).with_context(|| format!("read settings {}", path.display()))?;
    let mut settings: Settings =
        serde_json::from_slice(&bytes).context("parse settings JSON")?;
    settings.apply_env(|key| std::env::var(key).ok());
    Ok(settings)
}

/// Persist settings to disk in a stable JSON format.
pub fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(settings).context("serialize settings")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Validate user-provided settings before wiring services.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if !(0.0..=2.0).contains(&settings.llm.temperature) {
        return Err(anyhow!(
            "llm.temperature must be within 0.0..=2.0 (got {})",
            settings.llm.temperature
        ));
    }
    if settings.llm.max_tokens == 0 {
        return Err(anyhow!("llm.max_tokens must be positive"));
    }
    if settings.llm.command.is_none() && settings.llm.base_url.trim().is_empty() {
        return Err(anyhow!("llm.base_url must be set when llm.command is not"));
    }
    if !settings.demo_mode {
        if settings.rtdb.base_url.trim().is_empty() {
            return Err(anyhow!("rtdb.base_url must be non-empty"));
        }
        if settings.imagery.base_url.trim().is_empty() {
            return Err(anyhow!(
                "imagery.base_url must be non-empty (or enable demo_mode)"
            ));
        }
        if settings.weather.base_url.trim().is_empty() {
            return Err(anyhow!("weather.base_url must be non-empty"));
        }
    }
    Ok(())
}

impl Settings {
    /// Apply environment overrides through a lookup so tests can inject
    /// their own environment.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(key) = get(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.llm.api_key = Some(key);
            }
        }
        if let Some(model) = get(MODEL_NAME_ENV) {
            if !model.trim().is_empty() {
                self.llm.model = model;
            }
        }
    }

    /// Root directory for locally persisted consultations.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| anyhow!("cannot determine data directory"))?;
        Ok(data_dir.join("fieldguard"))
    }
}
