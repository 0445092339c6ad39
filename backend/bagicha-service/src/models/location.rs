/// Location data models
///
/// Coordinates are WGS84. The JSON form mirrors GeoJSON points so map
/// clients can consume it directly.
use serde::{Deserialize, Serialize};

/// Earth radius used for great-circle distance in metres.
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// GeoJSON point, serialized as `{"type":"Point","coordinates":[lon,lat]}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Point")]
pub struct GeoPoint {
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            coordinates: [longitude, latitude],
        }
    }
}

impl Default for GeoPoint {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub city: String,
    pub country: String,
    pub country_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub coordinates: GeoPoint,
}

/// Location as sent by clients (`lat`/`lon` rather than GeoJSON).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    pub city: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl LocationInput {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if valid_coordinates(lat, lon) => Some((lat, lon)),
            _ => None,
        }
    }
}

pub fn valid_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// "city, country" | city | country | "Unknown"
pub fn display_name(city: &str, country: &str) -> String {
    match (city.trim(), country.trim()) {
        ("", "") => "Unknown".to_string(),
        (city, "") => city.to_string(),
        ("", country) => country.to_string(),
        (city, country) => format!("{city}, {country}"),
    }
}
