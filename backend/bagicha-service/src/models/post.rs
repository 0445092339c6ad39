use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::types::Json;
use std::str::FromStr;
use uuid::Uuid;

use super::location::{GeoPoint, Location};
use super::user::{SummaryLocation, UserSummary};

/// A post younger than this is flagged `isNew`.
pub const NEW_POST_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Available,
    Wanted,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Available => "available",
            PostType::Wanted => "wanted",
        }
    }
}

impl FromStr for PostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(PostType::Available),
            "wanted" => Ok(PostType::Wanted),
            other => Err(format!("unknown post type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    AttentionNeeded,
    Critical,
    #[default]
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::AttentionNeeded => "attention_needed",
            HealthStatus::Critical => "critical",
            HealthStatus::Unknown => "unknown",
        }
    }

    /// Unrecognised values become `Unknown`.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim() {
            "healthy" => HealthStatus::Healthy,
            "attention_needed" => HealthStatus::AttentionNeeded,
            "critical" => HealthStatus::Critical,
            _ => HealthStatus::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for HealthStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| Self::parse_lossy(&s)).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CareLevel {
    Easy,
    #[default]
    Moderate,
    Expert,
}

impl<'de> Deserialize<'de> for CareLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref().map(str::trim) {
            Some("easy") => CareLevel::Easy,
            Some("expert") => CareLevel::Expert,
            _ => CareLevel::Moderate,
        })
    }
}

/// Plant identification and diagnosis, stored as JSONB on the post.
///
/// The same shape is produced by the AI chain; fields the providers omit
/// fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlantAnalysis {
    pub species: String,
    pub common_name: String,
    pub local_names: Vec<String>,
    pub diagnosis: String,
    pub health_status: HealthStatus,
    pub tips: Vec<String>,
    pub emoji: String,
    pub care_level: CareLevel,
    pub watering_frequency: String,
    pub sunlight: String,
    pub best_for: String,
    pub fun_fact: String,
    pub tags: Vec<String>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl Default for PlantAnalysis {
    fn default() -> Self {
        Self {
            species: String::new(),
            common_name: String::new(),
            local_names: Vec::new(),
            diagnosis: String::new(),
            health_status: HealthStatus::Unknown,
            tips: Vec::new(),
            emoji: "🌿".to_string(),
            care_level: CareLevel::Moderate,
            watering_frequency: String::new(),
            sunlight: String::new(),
            best_for: String::new(),
            fun_fact: String::new(),
            tags: Vec::new(),
            analyzed_at: None,
        }
    }
}

impl PlantAnalysis {
    /// Name used in notifications: common name, else `fallback`.
    pub fn plant_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        if !self.common_name.trim().is_empty() {
            &self.common_name
        } else {
            fallback
        }
    }
}

/// Weather at posting time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherSnapshot {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub condition: String,
    pub windspeed: Option<f64>,
}

/// Post joined with its author. Every post query selects [`POST_SELECT`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_type: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub ai_analysis: Json<PlantAnalysis>,
    pub weather_snapshot: Json<WeatherSnapshot>,
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub interested_users: Vec<Uuid>,
    pub interested_count: i32,
    pub is_active: bool,
    pub is_swapped: bool,
    pub swapped_at: Option<DateTime<Utc>>,
    pub swapped_with: Option<Uuid>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub author_city: Option<String>,
    pub author_country: Option<String>,
    pub author_country_code: Option<String>,
    #[sqlx(default)]
    pub distance_m: Option<f64>,
}

/// Columns for [`PostRow`]; callers append `WHERE`/`ORDER BY`.
pub const POST_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.post_type, p.title, p.description, p.image_url,
           p.ai_analysis, p.weather_snapshot, p.city, p.country, p.country_code,
           p.display_name, p.latitude, p.longitude, p.interested_users,
           p.interested_count, p.is_active, p.is_swapped, p.swapped_at,
           p.swapped_with, p.tags, p.created_at, p.updated_at,
           u.name AS author_name, u.avatar AS author_avatar, u.city AS author_city,
           u.country AS author_country, u.country_code AS author_country_code"#;

pub const POST_FROM: &str = " FROM posts p LEFT JOIN users u ON u.id = p.user_id";

impl PostRow {
    pub fn post_type(&self) -> PostType {
        self.post_type.parse().unwrap_or(PostType::Available)
    }

    pub fn is_new(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at < Duration::hours(NEW_POST_WINDOW_HOURS)
    }

    pub fn author(&self) -> UserSummary {
        UserSummary {
            id: self.user_id,
            name: self.author_name.clone().unwrap_or_default(),
            avatar: self.author_avatar.clone(),
            location: Some(SummaryLocation {
                city: self.author_city.clone().unwrap_or_default(),
                country: self.author_country.clone().unwrap_or_default(),
                country_code: self.author_country_code.clone().unwrap_or_default(),
            }),
        }
    }

    pub fn into_view(self) -> PostView {
        self.view_at(Utc::now())
    }

    pub fn view_at(self, now: DateTime<Utc>) -> PostView {
        let user = self.author();
        let is_new = self.is_new(now);
        let post_type = self.post_type();
        PostView {
            id: self.id,
            legacy_id: self.id,
            user,
            post_type,
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            ai_analysis: self.ai_analysis.0,
            weather_snapshot: self.weather_snapshot.0,
            location: Location {
                city: self.city,
                country: self.country,
                country_code: self.country_code,
                display_name: Some(self.display_name),
                coordinates: GeoPoint::new(self.latitude, self.longitude),
            },
            interested_users: self.interested_users,
            interested_count: self.interested_count,
            is_active: self.is_active,
            is_swapped: self.is_swapped,
            swapped_at: self.swapped_at,
            swapped_with: self.swapped_with,
            tags: self.tags,
            is_new,
            distance: self.distance_m,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Post as returned over REST and pushed over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    #[serde(rename = "_id")]
    pub legacy_id: Uuid,
    pub user: UserSummary,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub ai_analysis: PlantAnalysis,
    pub weather_snapshot: WeatherSnapshot,
    pub location: Location,
    pub interested_users: Vec<Uuid>,
    pub interested_count: i32,
    pub is_active: bool,
    pub is_swapped: bool,
    pub swapped_at: Option<DateTime<Utc>>,
    pub swapped_with: Option<Uuid>,
    pub tags: Vec<String>,
    pub is_new: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub distance: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub ai_analysis: Option<PlantAnalysis>,
    pub tags: Option<Vec<String>>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl CreatePostRequest {
    /// title → commonName → species → "My Plant"
    pub fn resolved_title(&self) -> String {
        let analysis = self.ai_analysis.as_ref();
        [
            self.title.as_deref(),
            analysis.map(|a| a.common_name.as_str()),
            analysis.map(|a| a.species.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("My Plant")
        .chars()
        .take(100)
        .collect()
    }

    /// Explicit tags, else the AI's tags.
    pub fn resolved_tags(&self) -> Vec<String> {
        let explicit = normalize_tags(self.tags.clone().unwrap_or_default());
        if !explicit.is_empty() {
            return explicit;
        }
        normalize_tags(
            self.ai_analysis
                .as_ref()
                .map(|a| a.tags.clone())
                .unwrap_or_default(),
        )
    }
}

pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    pub is_active: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSwappedRequest {
    pub swapped_with_user_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(created_at: DateTime<Utc>) -> PostRow {
        PostRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            post_type: "wanted".into(),
            title: "Tulsi".into(),
            description: String::new(),
            image_url: None,
            ai_analysis: Json(PlantAnalysis::default()),
            weather_snapshot: Json(WeatherSnapshot::default()),
            city: "Pune".into(),
            country: "India".into(),
            country_code: "IN".into(),
            display_name: "Pune, India".into(),
            latitude: 18.5,
            longitude: 73.8,
            interested_users: vec![],
            interested_count: 0,
            is_active: true,
            is_swapped: false,
            swapped_at: None,
            swapped_with: None,
            tags: vec!["herb".into()],
            created_at,
            updated_at: created_at,
            author_name: Some("Asha".into()),
            author_avatar: None,
            author_city: Some("Pune".into()),
            author_country: None,
            author_country_code: None,
            distance_m: None,
        }
    }

    #[test]
    fn test_is_new_window() {
        let now = Utc::now();
        assert!(row(now - Duration::hours(23)).is_new(now));
        assert!(!row(now - Duration::hours(25)).is_new(now));
    }

    #[test]
    fn test_view_json_shape() {
        let post = row(Utc::now());
        let id = post.id;
        let json = serde_json::to_value(post.into_view()).unwrap();

        assert_eq!(json["_id"], id.to_string());
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["type"], "wanted");
        assert_eq!(json["isNew"], true);
        assert_eq!(json["user"]["name"], "Asha");
        assert_eq!(json["location"]["displayName"], "Pune, India");
        assert_eq!(json["aiAnalysis"]["emoji"], "🌿");
        assert_eq!(json["aiAnalysis"]["healthStatus"], "unknown");
        assert!(json.get("distance").is_none());
    }

    #[test]
    fn test_unknown_health_status_parses() {
        let analysis: PlantAnalysis =
            serde_json::from_str(r#"{"healthStatus":"wilting","careLevel":"hard"}"#).unwrap();
        assert_eq!(analysis.health_status, HealthStatus::Unknown);
        assert_eq!(analysis.care_level, CareLevel::Moderate);
        assert_eq!(analysis.emoji, "🌿");
    }

    #[test]
    fn test_resolved_title_fallbacks() {
        let mut req = CreatePostRequest {
            post_type: Some("available".into()),
            title: Some("  ".into()),
            description: None,
            image_url: None,
            ai_analysis: Some(PlantAnalysis {
                species: "Ocimum tenuiflorum".into(),
                ..Default::default()
            }),
            tags: None,
            city: None,
            country: None,
            country_code: None,
            lat: None,
            lon: None,
        };
        assert_eq!(req.resolved_title(), "Ocimum tenuiflorum");

        req.ai_analysis = None;
        assert_eq!(req.resolved_title(), "My Plant");

        req.title = Some("Holy basil".into());
        assert_eq!(req.resolved_title(), "Holy basil");
    }

    #[test]
    fn test_resolved_tags_prefers_explicit() {
        let req = CreatePostRequest {
            post_type: None,
            title: None,
            description: None,
            image_url: None,
            ai_analysis: Some(PlantAnalysis {
                tags: vec!["herb".into(), "indoor".into()],
                ..Default::default()
            }),
            tags: Some(vec![" ".into()]),
            city: None,
            country: None,
            country_code: None,
            lat: None,
            lon: None,
        };
        assert_eq!(req.resolved_tags(), vec!["herb", "indoor"]);
        assert_eq!(
            normalize_tags(vec!["a".into(), " a ".into(), "b".into()]),
            vec!["a", "b"]
        );
    }
}
