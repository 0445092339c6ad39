//! Weather and geocoding collaborator.
//!
//! The service never talks to a weather vendor directly. Routes and the AI
//! handlers go through [`Weather`], which wraps a [`WeatherProvider`] and
//! turns every provider failure into the neutral values below.

use crate::error::AppResult;
use crate::models::WeatherSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub condition: String,
    pub windspeed: Option<f64>,
    pub precipitation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timezone: Option<String>,
    pub is_raining: bool,
    pub is_humid: bool,
    pub unit: String,
}

impl WeatherReport {
    pub fn neutral() -> Self {
        Self {
            temperature: None,
            humidity: None,
            condition: "Unknown".to_string(),
            windspeed: None,
            precipitation: None,
            timezone: None,
            is_raining: false,
            is_humid: false,
            unit: "metric".to_string(),
        }
    }

    /// The subset stored on a post.
    pub fn snapshot(&self) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature: self.temperature,
            humidity: self.humidity,
            condition: self.condition.clone(),
            windspeed: self.windspeed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub display_name: String,
}

impl GeoLocation {
    pub fn unknown() -> Self {
        Self {
            city: "Unknown City".to_string(),
            country: "Unknown".to_string(),
            country_code: String::new(),
            display_name: "Unknown Location".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitySuggestion {
    pub name: String,
    pub country: String,
    pub country_code: String,
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
    #[serde(default)]
    pub admin1: String,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, lat: f64, lon: f64) -> AppResult<WeatherReport>;

    async fn reverse_geocode(&self, lat: f64, lon: f64) -> AppResult<GeoLocation>;

    async fn search_city(&self, query: &str) -> AppResult<Vec<CitySuggestion>>;
}

/// Provider used when no weather backend is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredWeather;

#[async_trait]
impl WeatherProvider for UnconfiguredWeather {
    async fn current(&self, _lat: f64, _lon: f64) -> AppResult<WeatherReport> {
        Ok(WeatherReport::neutral())
    }

    async fn reverse_geocode(&self, _lat: f64, _lon: f64) -> AppResult<GeoLocation> {
        Ok(GeoLocation::unknown())
    }

    async fn search_city(&self, _query: &str) -> AppResult<Vec<CitySuggestion>> {
        Ok(Vec::new())
    }
}

/// Failure-absorbing front for a [`WeatherProvider`].
#[derive(Clone)]
pub struct Weather {
    provider: Arc<dyn WeatherProvider>,
}

impl Weather {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    pub fn unconfigured() -> Self {
        Self::new(Arc::new(UnconfiguredWeather))
    }

    pub async fn current(&self, lat: f64, lon: f64) -> WeatherReport {
        self.provider.current(lat, lon).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, lat, lon, "weather lookup failed");
            WeatherReport::neutral()
        })
    }

    pub async fn reverse_geocode(&self, lat: f64, lon: f64) -> GeoLocation {
        self.provider.reverse_geocode(lat, lon).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, lat, lon, "reverse geocode failed");
            GeoLocation::unknown()
        })
    }

    pub async fn search_city(&self, query: &str) -> Vec<CitySuggestion> {
        self.provider.search_city(query).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, query, "city search failed");
            Vec::new()
        })
    }

    /// Weather for optional coordinates; `None` when either is missing.
    pub async fn maybe_current(&self, lat: Option<f64>, lon: Option<f64>) -> Option<WeatherReport> {
        match (lat, lon) {
            (Some(lat), Some(lon)) => Some(self.current(lat, lon).await),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Weather {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Weather").finish_non_exhaustive()
    }
}
