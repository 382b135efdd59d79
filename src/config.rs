use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils;

pub const DEFAULT_WEATHER_ENDPOINT: &str = "http://api.weatherapi.com/v1";
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4";
pub const DEFAULT_TEMPERATURE: f32 = 0.4;
pub const DEFAULT_MAX_TOKENS: u32 = 800;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub weather_api_key: Option<String>,
    pub weather_endpoint: String,
    pub llm_api_key: Option<String>,
    pub llm_endpoint: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            weather_api_key: None,
            weather_endpoint: DEFAULT_WEATHER_ENDPOINT.to_string(),
            llm_api_key: None,
            llm_endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_temperature: DEFAULT_TEMPERATURE,
            llm_max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

pub const KEYS: [&str; 7] = [
    "weather_api_key",
    "weather_endpoint",
    "llm_api_key",
    "llm_endpoint",
    "llm_model",
    "llm_temperature",
    "llm_max_tokens",
];

impl AppConfig {
    /// Overlays environment variables on top of the stored values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty("WEATHER_API_KEY") {
            self.weather_api_key = Some(key);
        }
        if let Some(endpoint) = non_empty("WEATHER_ENDPOINT") {
            self.weather_endpoint = endpoint;
        }
        if let Some(key) = non_empty("LLM_API_KEY").or_else(|| non_empty("OPENAI_API_KEY")) {
            self.llm_api_key = Some(key);
        }
        if let Some(endpoint) = non_empty("LLM_ENDPOINT") {
            self.llm_endpoint = endpoint;
        }
        if let Some(model) = non_empty("LLM_MODEL") {
            self.llm_model = model;
        }
        if let Some(temperature) = non_empty("LLM_TEMPERATURE").and_then(|s| s.parse().ok()) {
            self.llm_temperature = temperature;
        }
        if let Some(max_tokens) = non_empty("LLM_MAX_TOKENS").and_then(|s| s.parse().ok()) {
            self.llm_max_tokens = max_tokens;
        }
        self
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let optional = |value: &str| (!value.is_empty()).then(|| value.to_string());

        match key {
            "weather_api_key" => self.weather_api_key = optional(value),
            "weather_endpoint" => self.weather_endpoint = value.to_string(),
            "llm_api_key" => self.llm_api_key = optional(value),
            "llm_endpoint" => self.llm_endpoint = value.to_string(),
            "llm_model" => self.llm_model = value.to_string(),
            "llm_temperature" => self.llm_temperature = value.parse().map_err(|_| invalid())?,
            "llm_max_tokens" => self.llm_max_tokens = value.parse().map_err(|_| invalid())?,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Pretty JSON with secrets masked, for display.
    pub fn to_display_json(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        shown.weather_api_key = shown.weather_api_key.as_deref().map(utils::mask_secret);
        shown.llm_api_key = shown.llm_api_key.as_deref().map(utils::mask_secret);
        Ok(serde_json::to_string_pretty(&shown)?)
    }
}

pub struct ConfigStore {
    path: PathBuf,
    data: AppConfig,
}

impl ConfigStore {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(utils::config_path())
    }

    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        let data = read_config(&path)?;
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> AppConfig {
        self.data.clone()
    }

    pub fn update<F>(&mut self, transform: F) -> Result<AppConfig, ConfigError>
    where
        F: FnOnce(&mut AppConfig) -> Result<(), ConfigError>,
    {
        let mut next = self.data.clone();
        transform(&mut next)?;
        write_config(&self.path, &next)?;
        self.data = next;
        Ok(self.data.clone())
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    utils::ensure_parent(path);
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents)?;
    Ok(())
}
