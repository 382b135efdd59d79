use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;

use crate::config::AppConfig;
use crate::recommend::WeatherProvider;

const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("missing weather api key")]
    MissingApiKey,
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub temp_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
    pub humidity: Option<f64>,
    pub wind_kph: Option<f64>,
}

impl CurrentConditions {
    pub fn is_wet(&self) -> bool {
        contains_any(
            &self.condition,
            &["rain", "drizzle", "shower", "storm", "thunder"],
        )
    }
}

/// Conditions are `None` when the provider answered without current data.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub location: String,
    pub current: Option<CurrentConditions>,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: Option<CurrentDoc>,
}

#[derive(Debug, Deserialize)]
struct CurrentDoc {
    temp_c: f64,
    feelslike_c: Option<f64>,
    condition: ConditionDoc,
    humidity: Option<f64>,
    wind_kph: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ConditionDoc {
    text: String,
}

pub struct WeatherClient {
    api_key: String,
    endpoint: String,
    client: Client,
}

impl WeatherClient {
    pub fn from_config(config: &AppConfig) -> Result<Self, WeatherError> {
        let api_key = config
            .weather_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(WeatherError::MissingApiKey)?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| WeatherError::Http(err.to_string()))?;

        Ok(Self {
            api_key,
            endpoint: config.weather_endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn fetch_current(&self, location: &str) -> Result<WeatherSnapshot, WeatherError> {
        let mut url = Url::parse(&format!("{}/current.json", self.endpoint))
            .map_err(|err| WeatherError::Http(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("q", location)
            .append_pair("aqi", "no");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| WeatherError::Http(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| WeatherError::Http(err.to_string()))?;

        if !status.is_success() {
            return Err(WeatherError::Http(format!("status {}: {}", status, body)));
        }

        let payload: CurrentResponse =
            serde_json::from_str(&body).map_err(|err| WeatherError::Parse(err.to_string()))?;

        Ok(WeatherSnapshot {
            location: location.to_string(),
            current: payload.current.map(|doc| CurrentConditions {
                feels_like_c: doc.feelslike_c.unwrap_or(doc.temp_c),
                temp_c: doc.temp_c,
                condition: doc.condition.text,
                humidity: doc.humidity,
                wind_kph: doc.wind_kph,
            }),
        })
    }
}

#[async_trait]
impl WeatherProvider for WeatherClient {
    async fn current(&self, location: &str) -> Result<WeatherSnapshot, WeatherError> {
        self.fetch_current(location).await
    }
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    let lower = text.to_lowercase();
    words.iter().any(|word| lower.contains(word))
}

pub fn clothing_suggestions(temp_c: f64, condition: &str) -> Vec<String> {
    let mut out: Vec<&str> = match temp_c {
        t if t < 10.0 => vec!["heavy jacket or coat", "warm layers", "scarf and gloves"],
        t if t < 15.0 => vec!["light jacket or sweater", "long sleeves"],
        t if t < 25.0 => vec!["light clothing", "comfortable shirt or t-shirt"],
        _ => vec!["light, breathable clothing", "sunscreen and hat"],
    };

    if contains_any(condition, &["rain", "drizzle", "shower"]) {
        out.push("umbrella or raincoat");
        out.push("waterproof shoes");
    } else if contains_any(condition, &["sun", "clear"]) {
        out.push("sunglasses");
    }

    out.into_iter().map(str::to_string).collect()
}

pub fn transport_suggestion(temp_c: f64, condition: &str) -> &'static str {
    if contains_any(condition, &["rain", "storm", "heavy"]) {
        "Use covered transport (taxi, car, or covered walkways). Avoid motorcycles and long walks."
    } else if contains_any(condition, &["hot", "sun"]) && temp_c > 30.0 {
        "Use air-conditioned transport when possible. Stay hydrated if walking."
    } else if temp_c < 15.0 {
        "Dress warmly if walking or using public transport. Consider warmer transport options."
    } else {
        "Weather is pleasant for walking or any form of transport."
    }
}
